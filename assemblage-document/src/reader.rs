//! The JSON blueprint reader.
//!
//! Syntax findings (malformed JSON) and schema findings (cross-field rule
//! violations, invalid URIs) are appended to the caller's
//! [ErrorSink] at error severity; the reader keeps going and returns every
//! blueprint and part it could translate, so one read reports every defect
//! in the document.

use crate::schema::{
    BlueprintDoc, ConcretePartDoc, ExternalPartDoc, PartDictionaryDoc, PartDoc, PartListDoc,
    PropertyDoc, ReferenceDoc, RootDoc, TypeRefDoc, UndefinedPartDoc,
};
use assemblage::document::BlueprintReader;
use assemblage::error::{DocumentError, ErrorSink};
use assemblage::model::{
    Blueprint, CollectionKind, CollectionPart, ConcretePart, ExternalPart, Part, PartId, PartKey,
    PropertyValue, Reference, RuntimeType, TypeRef, UndefinedPart, Uri,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// Reads the JSON rendition of the blueprint document grammar.
#[derive(Copy, Clone, Default, Debug)]
pub struct JsonBlueprintReader;

impl JsonBlueprintReader {
    pub fn new() -> Self {
        Self
    }
}

impl BlueprintReader for JsonBlueprintReader {
    fn read(&self, source: &str, sink: &mut ErrorSink) -> Vec<Blueprint> {
        let root: RootDoc = match serde_json::from_str(source) {
            Ok(root) => root,
            Err(error) => {
                sink.error(DocumentError::Syntax {
                    detail: error.to_string(),
                });
                return Vec::new();
            }
        };

        debug!(
            blueprints = root.blueprint_list.len(),
            "Read blueprint document."
        );

        root.blueprint_list
            .into_iter()
            .map(|blueprint| convert_blueprint(blueprint, sink))
            .collect()
    }
}

fn convert_blueprint(doc: BlueprintDoc, sink: &mut ErrorSink) -> Blueprint {
    let mut blueprint = Blueprint::new(doc.namespace);

    blueprint.aliases = doc
        .type_aliases
        .into_iter()
        .map(|(alias, target)| (alias, convert_type_ref(target)))
        .collect();

    blueprint.parts = doc
        .parts
        .into_iter()
        .filter_map(|part| convert_part(part, sink))
        .collect();

    blueprint
}

fn convert_part(doc: PartDoc, sink: &mut ErrorSink) -> Option<Part> {
    match doc {
        PartDoc::Part(concrete) => convert_concrete(concrete, sink).map(Part::Concrete),
        PartDoc::ExternalPart(external) => convert_external(external, sink).map(Part::External),
        PartDoc::UndefinedPart(undefined) => convert_undefined(undefined, sink).map(Part::Undefined),
        PartDoc::PartList(list) => convert_list(list, sink).map(Part::Collection),
        PartDoc::PartDictionary(dictionary) => {
            convert_dictionary(dictionary, sink).map(Part::Collection)
        }
    }
}

fn convert_concrete(doc: ConcretePartDoc, sink: &mut ErrorSink) -> Option<ConcretePart> {
    let runtime_type = convert_runtime_type(doc.runtime_type, doc.runtime_type_alias, sink)?;

    let mut features = BTreeMap::new();
    for feature in doc.features {
        if let Some(reference) = convert_reference(feature.reference, sink) {
            features.insert(feature.key, reference);
        }
    }

    let mut properties = BTreeMap::new();
    for property in doc.properties {
        if let Some((key, value)) = convert_property(property, sink) {
            properties.insert(key, value);
        }
    }

    Some(ConcretePart {
        id: doc.id.map(PartId::from),
        name: doc.name,
        runtime_type,
        constructor: doc.constructor.map(|constructor| constructor.name),
        features,
        properties,
        scheme: doc.scheme,
        metadata: doc.metadata,
    })
}

fn convert_external(doc: ExternalPartDoc, sink: &mut ErrorSink) -> Option<ExternalPart> {
    let key = match (doc.id, doc.name) {
        (Some(id), None) => PartKey::Id(PartId::from(id)),
        (None, Some(name)) => PartKey::Name(name),
        _ => {
            sink.error(DocumentError::Schema {
                detail: "an external-part carries exactly one of 'id' and 'name'".to_string(),
            });
            return None;
        }
    };

    Some(ExternalPart {
        key,
        scheme: doc.scheme,
        metadata: doc.metadata,
    })
}

fn convert_undefined(doc: UndefinedPartDoc, sink: &mut ErrorSink) -> Option<UndefinedPart> {
    if doc.id.is_none() && doc.name.is_none() {
        sink.error(DocumentError::Schema {
            detail: "an undefined-part carries an 'id', a 'name' or both".to_string(),
        });
        return None;
    }

    Some(UndefinedPart {
        id: doc.id.map(PartId::from),
        name: doc.name,
        metadata: doc.metadata,
    })
}

fn convert_list(doc: PartListDoc, sink: &mut ErrorSink) -> Option<CollectionPart> {
    let runtime_type = convert_runtime_type(doc.runtime_type, doc.runtime_type_alias, sink)?;

    let elements = doc
        .elements
        .into_iter()
        .filter_map(|element| convert_reference(element, sink))
        .collect();

    Some(CollectionPart {
        id: doc.id.map(PartId::from),
        name: doc.name,
        runtime_type,
        kind: CollectionKind::List(elements),
        metadata: doc.metadata,
    })
}

fn convert_dictionary(doc: PartDictionaryDoc, sink: &mut ErrorSink) -> Option<CollectionPart> {
    let runtime_type = convert_runtime_type(doc.runtime_type, doc.runtime_type_alias, sink)?;

    let entries = doc
        .entries
        .into_iter()
        .filter_map(|entry| {
            convert_reference(entry.reference, sink).map(|reference| (entry.key, reference))
        })
        .collect();

    Some(CollectionPart {
        id: doc.id.map(PartId::from),
        name: doc.name,
        runtime_type,
        kind: CollectionKind::Dictionary(entries),
        metadata: doc.metadata,
    })
}

fn convert_runtime_type(
    runtime_type: Option<TypeRefDoc>,
    alias: Option<String>,
    sink: &mut ErrorSink,
) -> Option<RuntimeType> {
    match (runtime_type, alias) {
        (Some(type_ref), None) => Some(RuntimeType::Type(convert_type_ref(type_ref))),
        (None, Some(alias)) => Some(RuntimeType::Alias(alias)),
        _ => {
            sink.error(DocumentError::Schema {
                detail: "a part carries exactly one of 'runtime-type' and 'runtime-type-alias'"
                    .to_string(),
            });
            None
        }
    }
}

fn convert_type_ref(doc: TypeRefDoc) -> TypeRef {
    TypeRef {
        name: doc.name,
        parameters: doc
            .parameters
            .into_iter()
            .map(|(name, value)| (name, convert_type_ref(value)))
            .collect(),
    }
}

fn convert_reference(doc: ReferenceDoc, sink: &mut ErrorSink) -> Option<Reference> {
    match doc {
        ReferenceDoc::IdRef(id) => Some(Reference::ById(PartId::from(id))),
        ReferenceDoc::NameRef(name) => Some(Reference::ByName(name)),
        ReferenceDoc::UriRef(uri) => convert_uri(&uri, sink).map(Reference::ByUri),
        ReferenceDoc::Constant(text) => Some(Reference::Constant(text)),
        ReferenceDoc::Part(part) => {
            convert_concrete(*part, sink).map(|part| Reference::Inline(Box::new(part.into())))
        }
        ReferenceDoc::PartList(list) => {
            convert_list(*list, sink).map(|part| Reference::Inline(Box::new(part.into())))
        }
        ReferenceDoc::PartDictionary(dictionary) => convert_dictionary(*dictionary, sink)
            .map(|part| Reference::Inline(Box::new(part.into()))),
    }
}

fn convert_property(doc: PropertyDoc, sink: &mut ErrorSink) -> Option<(String, PropertyValue)> {
    match (doc.value, doc.uri) {
        (Some(value), None) => Some((doc.key, PropertyValue::Value(value))),
        (None, Some(uri)) => {
            convert_uri(&uri, sink).map(|uri| (doc.key, PropertyValue::ValueUri(uri)))
        }
        _ => {
            sink.error(DocumentError::Schema {
                detail: format!(
                    "property '{}' carries exactly one of 'value' and 'uri'",
                    doc.key
                ),
            });
            None
        }
    }
}

fn convert_uri(text: &str, sink: &mut ErrorSink) -> Option<Uri> {
    match Uri::from_str(text) {
        Ok(uri) => Some(uri),
        Err(error) => {
            sink.error(DocumentError::Schema {
                detail: error.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::reader::JsonBlueprintReader;
    use assemblage::document::BlueprintReader;
    use assemblage::error::ErrorSink;
    use assemblage::model::{Part, PartKey, Reference};

    #[test]
    fn should_report_syntax_errors() {
        let mut sink = ErrorSink::new();
        let blueprints = JsonBlueprintReader::new().read("{ not json", &mut sink);

        assert!(blueprints.is_empty());
        assert!(sink.has_blocking());
    }

    #[test]
    fn should_read_a_minimal_document() {
        let source = r#"{
            "blueprint-list": [{
                "namespace": "demo",
                "parts": [
                    {"part": {
                        "name": "greeter",
                        "runtime-type": {"name": "Greeter"},
                        "features": [{"key": "peer", "name-ref": "other"}]
                    }},
                    {"external-part": {"name": "other"}}
                ]
            }]
        }"#;

        let mut sink = ErrorSink::new();
        let blueprints = JsonBlueprintReader::new().read(source, &mut sink);

        assert!(sink.is_empty());
        assert_eq!(blueprints.len(), 1);
        assert_eq!(blueprints[0].namespace, "demo");
        assert_eq!(blueprints[0].parts.len(), 2);

        let Part::Concrete(part) = &blueprints[0].parts[0] else {
            panic!("expected a concrete part");
        };
        assert_eq!(part.name.as_deref(), Some("greeter"));
        assert!(matches!(
            part.features.get("peer").unwrap(),
            Reference::ByName(name) if name == "other"
        ));

        let Part::External(external) = &blueprints[0].parts[1] else {
            panic!("expected an external part");
        };
        assert_eq!(external.key, PartKey::Name("other".to_string()));
    }

    #[test]
    fn should_reject_ambiguous_external_keys() {
        let source = r#"{
            "blueprint-list": [{
                "namespace": "demo",
                "parts": [
                    {"external-part": {
                        "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                        "name": "both"
                    }}
                ]
            }]
        }"#;

        let mut sink = ErrorSink::new();
        let blueprints = JsonBlueprintReader::new().read(source, &mut sink);

        assert!(sink.has_blocking());
        assert!(blueprints[0].parts.is_empty());
    }

    #[test]
    fn should_reject_properties_with_value_and_uri() {
        let source = r#"{
            "blueprint-list": [{
                "namespace": "demo",
                "parts": [
                    {"part": {
                        "runtime-type": {"name": "Widget"},
                        "properties": [{"key": "width", "value": "12", "uri": "test://width"}]
                    }}
                ]
            }]
        }"#;

        let mut sink = ErrorSink::new();
        JsonBlueprintReader::new().read(source, &mut sink);

        assert!(sink.has_blocking());
    }

    #[test]
    fn should_reject_malformed_uris() {
        let source = r#"{
            "blueprint-list": [{
                "namespace": "demo",
                "parts": [
                    {"part": {
                        "runtime-type": {"name": "Widget"},
                        "features": [{"key": "value", "uri-ref": "no-scheme"}]
                    }}
                ]
            }]
        }"#;

        let mut sink = ErrorSink::new();
        JsonBlueprintReader::new().read(source, &mut sink);

        assert!(sink.has_blocking());
    }
}
