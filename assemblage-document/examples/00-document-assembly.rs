use assemblage::descriptor::{ComponentDescriptor, ConstructorDescriptor, FeatureDescriptor};
use assemblage::engine::Engine;
use assemblage::instance::scalar_feature;
use assemblage::model::TypeRef;
use assemblage::registry::StaticTypeRegistry;
use assemblage_document::JsonBlueprintReader;

struct Banner {
    text: String,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut registry = StaticTypeRegistry::new();
    registry
        .register(
            TypeRef::named("Banner"),
            ComponentDescriptor::builder("Banner")
                .with_default_constructor(ConstructorDescriptor::new(
                    vec![FeatureDescriptor::required::<String>("text")],
                    |values| {
                        Ok(Box::new(Banner {
                            text: scalar_feature::<String>(values, 0)?,
                        }))
                    },
                ))
                .build()
                .expect("error describing Banner"),
        )
        .expect("error registering Banner");

    let source = r#"{
        "blueprint-list": [{
            "namespace": "demo",
            "parts": [
                {"part": {
                    "name": "banner",
                    "runtime-type": {"name": "Banner"},
                    "features": [{"key": "text", "constant": "assembled from a document"}]
                }}
            ]
        }]
    }"#;

    let engine = Engine::builder().with_registry(Box::new(registry)).build();
    let (container, report) = engine
        .assemble_from(&JsonBlueprintReader::new(), source)
        .expect("the document failed to read");
    assert!(report.is_none(), "assembly reported errors");

    let banner = container
        .get_by_name_as::<Banner>("banner")
        .expect("banner missing from the container");

    // prints "assembled from a document"
    println!("{}", banner.text);
}
