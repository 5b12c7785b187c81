use assemblage::document::{BlueprintReader, BlueprintWriter};
use assemblage::error::ErrorSink;
use assemblage::model::{
    Blueprint, CollectionPart, ConcretePart, ExternalPart, PartId, PartKey, PropertyValue,
    Reference, RuntimeType, TypeRef, UndefinedPart, Uri,
};
use assemblage_document::{JsonBlueprintReader, JsonBlueprintWriter};
use std::str::FromStr;

fn uri(text: &str) -> Uri {
    Uri::from_str(text).unwrap()
}

/// A blueprint exercising every element kind of the document grammar.
fn exhaustive_blueprint() -> Blueprint {
    let widget = TypeRef::named("widgets::Widget");
    let list_type = TypeRef::named("sequence");
    let dict_type = TypeRef::named("dictionary");

    let anchor = PartId::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();

    Blueprint::new("demo")
        .with_alias("widget", widget.clone())
        .with_alias(
            "widget-list",
            TypeRef::named("widgets::List").with_parameter("item", widget.clone()),
        )
        .with_part(
            ConcretePart::of_type(widget.clone())
                .with_id(anchor)
                .with_name("anchor")
                .with_constructor("alternate")
                .with_feature("peer", Reference::ByName("sibling".to_string()))
                .with_feature("value", Reference::Constant("54".to_string()))
                .with_feature("made", Reference::ByUri(uri("test://thing")))
                .with_feature(
                    "nested",
                    Reference::Inline(Box::new(
                        ConcretePart::new(RuntimeType::Alias("widget".to_string())).into(),
                    )),
                )
                .with_property("width", PropertyValue::Value("12".to_string()))
                .with_property("height", PropertyValue::ValueUri(uri("test://height")))
                .with_scheme("widget")
                .with_metadata("origin", "unit-test"),
        )
        .with_part(
            ConcretePart::of_type(widget.clone())
                .with_name("sibling"),
        )
        .with_part(ExternalPart::new(PartKey::Id(anchor_peer())).with_scheme("ext"))
        .with_part(ExternalPart::new(PartKey::Name("supplied".to_string())))
        .with_part(UndefinedPart::default().with_name("someday"))
        .with_part(
            CollectionPart::list(
                RuntimeType::Type(list_type),
                vec![
                    Reference::ByName("anchor".to_string()),
                    Reference::ByUri(uri("test://extra")),
                    Reference::Constant("tail".to_string()),
                ],
            )
            .with_name("ordered"),
        )
        .with_part(
            CollectionPart::dictionary(
                RuntimeType::Type(dict_type),
                vec![
                    ("first".to_string(), Reference::ByName("anchor".to_string())),
                    ("second".to_string(), Reference::ById(anchor)),
                ],
            )
            .with_name("keyed"),
        )
}

fn anchor_peer() -> PartId {
    PartId::from_str("1a0f5e2c-9f6b-4d3a-8e21-0c9d4f7b6a55").unwrap()
}

#[test]
fn should_round_trip_documents() {
    let writer = JsonBlueprintWriter::new();
    let reader = JsonBlueprintReader::new();

    let original = writer.write(&[exhaustive_blueprint()]).unwrap();

    let mut sink = ErrorSink::new();
    let reread = reader.read(&original, &mut sink);
    assert!(sink.is_empty(), "unexpected findings: {:?}", sink.entries());

    let rewritten = writer.write(&reread).unwrap();
    assert_eq!(original, rewritten);
}

#[test]
fn should_round_trip_the_model() {
    let writer = JsonBlueprintWriter::new();
    let reader = JsonBlueprintReader::new();

    let document = writer.write(&[exhaustive_blueprint()]).unwrap();

    let mut sink = ErrorSink::new();
    let blueprints = reader.read(&document, &mut sink);

    assert_eq!(blueprints.len(), 1);
    let blueprint = &blueprints[0];

    assert_eq!(blueprint.namespace, "demo");
    assert_eq!(blueprint.aliases.len(), 2);
    assert_eq!(blueprint.parts.len(), 7);

    let concrete = match &blueprint.parts[0] {
        assemblage::model::Part::Concrete(part) => part,
        other => panic!("expected a concrete part, got {other:?}"),
    };
    assert_eq!(concrete.name.as_deref(), Some("anchor"));
    assert_eq!(concrete.constructor.as_deref(), Some("alternate"));
    assert_eq!(concrete.features.len(), 4);
    assert_eq!(concrete.properties.len(), 2);
    assert_eq!(concrete.scheme.as_deref(), Some("widget"));
    assert_eq!(
        concrete.metadata.get("origin").map(String::as_str),
        Some("unit-test")
    );

    assert!(matches!(
        concrete.features.get("nested").unwrap(),
        Reference::Inline(part)
            if matches!(part.as_ref(), assemblage::model::Part::Concrete(inner)
                if inner.runtime_type == RuntimeType::Alias("widget".to_string()))
    ));
}

#[test]
fn should_preserve_collection_declaration_order() {
    let writer = JsonBlueprintWriter::new();
    let reader = JsonBlueprintReader::new();

    let document = writer.write(&[exhaustive_blueprint()]).unwrap();

    let mut sink = ErrorSink::new();
    let blueprints = reader.read(&document, &mut sink);

    let list = blueprints[0]
        .parts
        .iter()
        .find_map(|part| match part {
            assemblage::model::Part::Collection(collection)
                if collection.name.as_deref() == Some("ordered") =>
            {
                Some(collection)
            }
            _ => None,
        })
        .unwrap();

    let assemblage::model::CollectionKind::List(elements) = &list.kind else {
        panic!("expected a part list");
    };

    assert!(matches!(&elements[0], Reference::ByName(name) if name == "anchor"));
    assert!(matches!(&elements[1], Reference::ByUri(uri) if uri.as_str() == "test://extra"));
    assert!(matches!(&elements[2], Reference::Constant(text) if text == "tail"));
}
