use assemblage::descriptor::{ComponentDescriptor, ConstructorDescriptor, FeatureDescriptor};
use assemblage::engine::Engine;
use assemblage::instance::{feature, scalar_feature};
use assemblage::model::{Blueprint, ConcretePart, PropertyValue, Reference, TypeRef};
use assemblage::registry::StaticTypeRegistry;
use std::sync::Arc;

// a plain host type the engine should construct
struct Console;

impl Console {
    fn say(&self, message: &str) {
        println!("{message}");
    }
}

// another host type, depending on the first one
struct Greeter {
    console: Arc<Console>,
    greeting: String,
    punctuation: String,
}

impl Greeter {
    fn greet(&self, whom: &str) {
        self.console
            .say(&format!("{}, {whom}{}", self.greeting, self.punctuation));
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // the host describes its types instead of the engine reflecting over them
    let mut registry = StaticTypeRegistry::new();
    registry
        .register(
            TypeRef::named("Console"),
            ComponentDescriptor::builder("Console")
                .with_default_constructor(ConstructorDescriptor::new(vec![], |_| {
                    Ok(Box::new(Console))
                }))
                .build()
                .expect("error describing Console"),
        )
        .expect("error registering Console");

    registry
        .register(
            TypeRef::named("Greeter"),
            ComponentDescriptor::builder("Greeter")
                .with_default_constructor(ConstructorDescriptor::new(
                    vec![
                        FeatureDescriptor::required::<Console>("console"),
                        FeatureDescriptor::required::<String>("greeting"),
                    ],
                    |values| {
                        Ok(Box::new(Greeter {
                            console: feature::<Console>(values, 0)?,
                            greeting: scalar_feature::<String>(values, 1)?,
                            punctuation: "!".to_string(),
                        }))
                    },
                ))
                .with_property(
                    "punctuation",
                    assemblage::descriptor::PropertyDescriptor::scalar::<Greeter, String>(
                        false,
                        |greeter, punctuation| greeter.punctuation = punctuation,
                    ),
                )
                .build()
                .expect("error describing Greeter"),
        )
        .expect("error registering Greeter");

    // a blueprint wires one greeter to one console, declaratively
    let blueprint = Blueprint::new("demo")
        .with_part(ConcretePart::of_type(TypeRef::named("Console")).with_name("console"))
        .with_part(
            ConcretePart::of_type(TypeRef::named("Greeter"))
                .with_name("greeter")
                .with_feature("console", Reference::ByName("console".to_string()))
                .with_feature("greeting", Reference::Constant("Hello".to_string()))
                .with_property("punctuation", PropertyValue::Value("?".to_string())),
        );

    let engine = Engine::builder().with_registry(Box::new(registry)).build();
    let (container, report) = engine.assemble(&[blueprint]);
    assert!(report.is_none(), "assembly reported errors");

    // prints "Hello, world?"
    container
        .get_by_name_as::<Greeter>("greeter")
        .expect("greeter missing from the container")
        .greet("world");
}
