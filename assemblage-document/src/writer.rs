//! The JSON blueprint writer.
//!
//! Writing round-trips every non-temporary field of the model: identifiers
//! synthesised during resolution never appear in the model, so a
//! read-write-read cycle reproduces the document modulo formatting.

use crate::schema::{
    BlueprintDoc, ConcretePartDoc, ConstructorDoc, DictionaryEntryDoc, ExternalPartDoc,
    FeatureDoc, PartDictionaryDoc, PartDoc, PartListDoc, PropertyDoc, ReferenceDoc, RootDoc,
    TypeRefDoc, UndefinedPartDoc,
};
use assemblage::document::BlueprintWriter;
use assemblage::error::DocumentError;
use assemblage::model::{
    Blueprint, CollectionKind, CollectionPart, ConcretePart, Part, PartKey, PropertyValue,
    Reference, RuntimeType, TypeRef,
};
use itertools::Itertools;
use tracing::debug;
use uuid::Uuid;

/// Writes blueprint models as JSON documents.
#[derive(Copy, Clone, Default, Debug)]
pub struct JsonBlueprintWriter;

impl JsonBlueprintWriter {
    pub fn new() -> Self {
        Self
    }
}

impl BlueprintWriter for JsonBlueprintWriter {
    fn write(&self, blueprints: &[Blueprint]) -> Result<String, DocumentError> {
        let root = RootDoc {
            blueprint_list: blueprints.iter().map(blueprint_doc).try_collect()?,
        };

        debug!(
            blueprints = root.blueprint_list.len(),
            "Writing blueprint document."
        );

        serde_json::to_string_pretty(&root).map_err(|error| DocumentError::Syntax {
            detail: error.to_string(),
        })
    }
}

fn blueprint_doc(blueprint: &Blueprint) -> Result<BlueprintDoc, DocumentError> {
    Ok(BlueprintDoc {
        namespace: blueprint.namespace.clone(),
        type_aliases: blueprint
            .aliases
            .iter()
            .map(|(alias, target)| (alias.clone(), type_ref_doc(target)))
            .collect(),
        parts: blueprint.parts.iter().map(part_doc).try_collect()?,
    })
}

fn part_doc(part: &Part) -> Result<PartDoc, DocumentError> {
    match part {
        Part::Concrete(concrete) => concrete_doc(concrete).map(PartDoc::Part),
        Part::External(external) => {
            let (id, name) = match &external.key {
                PartKey::Id(id) => (Some(Uuid::from(*id)), None),
                PartKey::Name(name) => (None, Some(name.clone())),
            };

            Ok(PartDoc::ExternalPart(ExternalPartDoc {
                id,
                name,
                scheme: external.scheme.clone(),
                metadata: external.metadata.clone(),
            }))
        }
        Part::Undefined(undefined) => Ok(PartDoc::UndefinedPart(UndefinedPartDoc {
            id: undefined.id.map(Uuid::from),
            name: undefined.name.clone(),
            metadata: undefined.metadata.clone(),
        })),
        Part::Collection(collection) => collection_doc(collection),
    }
}

fn concrete_doc(part: &ConcretePart) -> Result<ConcretePartDoc, DocumentError> {
    let (runtime_type, runtime_type_alias) = runtime_type_doc(&part.runtime_type);

    Ok(ConcretePartDoc {
        id: part.id.map(Uuid::from),
        name: part.name.clone(),
        runtime_type,
        runtime_type_alias,
        constructor: part
            .constructor
            .clone()
            .map(|name| ConstructorDoc { name }),
        features: part
            .features
            .iter()
            .map(|(key, reference)| {
                Ok(FeatureDoc {
                    key: key.clone(),
                    reference: reference_doc(reference)?,
                })
            })
            .try_collect()?,
        properties: part
            .properties
            .iter()
            .map(|(key, value)| property_doc(key, value))
            .collect(),
        scheme: part.scheme.clone(),
        metadata: part.metadata.clone(),
    })
}

fn collection_doc(part: &CollectionPart) -> Result<PartDoc, DocumentError> {
    let (runtime_type, runtime_type_alias) = runtime_type_doc(&part.runtime_type);

    match &part.kind {
        CollectionKind::List(elements) => Ok(PartDoc::PartList(PartListDoc {
            id: part.id.map(Uuid::from),
            name: part.name.clone(),
            runtime_type,
            runtime_type_alias,
            elements: elements.iter().map(reference_doc).try_collect()?,
            metadata: part.metadata.clone(),
        })),
        CollectionKind::Dictionary(entries) => Ok(PartDoc::PartDictionary(PartDictionaryDoc {
            id: part.id.map(Uuid::from),
            name: part.name.clone(),
            runtime_type,
            runtime_type_alias,
            entries: entries
                .iter()
                .map(|(key, reference)| {
                    Ok(DictionaryEntryDoc {
                        key: key.clone(),
                        reference: reference_doc(reference)?,
                    })
                })
                .try_collect()?,
            metadata: part.metadata.clone(),
        })),
    }
}

fn runtime_type_doc(runtime_type: &RuntimeType) -> (Option<TypeRefDoc>, Option<String>) {
    match runtime_type {
        RuntimeType::Type(type_ref) => (Some(type_ref_doc(type_ref)), None),
        RuntimeType::Alias(alias) => (None, Some(alias.clone())),
    }
}

fn type_ref_doc(type_ref: &TypeRef) -> TypeRefDoc {
    TypeRefDoc {
        name: type_ref.name.clone(),
        parameters: type_ref
            .parameters
            .iter()
            .map(|(name, value)| (name.clone(), type_ref_doc(value)))
            .collect(),
    }
}

fn reference_doc(reference: &Reference) -> Result<ReferenceDoc, DocumentError> {
    match reference {
        Reference::ById(id) => Ok(ReferenceDoc::IdRef(Uuid::from(*id))),
        Reference::ByName(name) => Ok(ReferenceDoc::NameRef(name.clone())),
        Reference::ByUri(uri) => Ok(ReferenceDoc::UriRef(uri.to_string())),
        Reference::Constant(text) => Ok(ReferenceDoc::Constant(text.clone())),
        Reference::Inline(part) => match part.as_ref() {
            Part::Concrete(concrete) => {
                Ok(ReferenceDoc::Part(Box::new(concrete_doc(concrete)?)))
            }
            Part::Collection(collection) => match collection_doc(collection)? {
                PartDoc::PartList(list) => Ok(ReferenceDoc::PartList(Box::new(list))),
                PartDoc::PartDictionary(dictionary) => {
                    Ok(ReferenceDoc::PartDictionary(Box::new(dictionary)))
                }
                _ => Err(DocumentError::Schema {
                    detail: "collection parts render as part-list or part-dictionary".to_string(),
                }),
            },
            Part::External(_) | Part::Undefined(_) => Err(DocumentError::Schema {
                detail: "external and undefined parts may only appear at top level".to_string(),
            }),
        },
    }
}

fn property_doc(key: &str, value: &PropertyValue) -> PropertyDoc {
    match value {
        PropertyValue::Value(text) => PropertyDoc {
            key: key.to_string(),
            value: Some(text.clone()),
            uri: None,
        },
        PropertyValue::ValueUri(uri) => PropertyDoc {
            key: key.to_string(),
            value: None,
            uri: Some(uri.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::writer::JsonBlueprintWriter;
    use assemblage::document::BlueprintWriter;
    use assemblage::error::DocumentError;
    use assemblage::model::{
        Blueprint, ConcretePart, ExternalPart, PartKey, Reference, TypeRef,
    };

    #[test]
    fn should_reject_inline_external_parts() {
        let blueprint = Blueprint::new("demo").with_part(
            ConcretePart::of_type(TypeRef::named("Widget")).with_feature(
                "peer",
                Reference::Inline(Box::new(
                    ExternalPart::new(PartKey::Name("nested".to_string())).into(),
                )),
            ),
        );

        assert!(matches!(
            JsonBlueprintWriter::new().write(&[blueprint]).unwrap_err(),
            DocumentError::Schema { .. }
        ));
    }

    #[test]
    fn should_write_stable_documents() {
        let blueprint = Blueprint::new("demo")
            .with_alias("widget", TypeRef::named("Widget"))
            .with_part(
                ConcretePart::of_type(TypeRef::named("Widget"))
                    .with_name("first")
                    .with_feature("peer", Reference::ByName("second".to_string())),
            )
            .with_part(ExternalPart::new(PartKey::Name("second".to_string())));

        let writer = JsonBlueprintWriter::new();
        let first = writer.write(&[blueprint.clone()]).unwrap();
        let second = writer.write(&[blueprint]).unwrap();

        assert_eq!(first, second);
    }
}
