//noinspection DuplicatedCode
use assemblage::descriptor::{
    factory_cast, ComponentDescriptor, ConstructorDescriptor, FeatureDescriptor,
    PropertyDescriptor,
};
use assemblage::engine::Engine;
use assemblage::error::{AssemblyError, EngineError, ErrorPtr, ResolutionError};
use assemblage::factory::{FactoryPtr, ObjectFactory};
use assemblage::instance::{error_message, feature, instance_of, scalar_feature, InstancePtr};
use assemblage::model::{
    Blueprint, ConcretePart, ExternalPart, PartId, PartKey, PropertyValue, Reference, TypeRef, Uri,
};
use assemblage::document::ExternalObject;
use assemblage::registry::StaticTypeRegistry;
use std::str::FromStr;
use std::sync::Arc;

struct Trivial;

struct Holder {
    other: Arc<Trivial>,
}

struct DecimalHolder {
    value: i64,
}

#[derive(Default)]
struct Panel {
    width: i64,
}

struct TestFactory;

impl ObjectFactory for TestFactory {
    fn produce(&self, uri: &Uri) -> Result<Option<InstancePtr>, ErrorPtr> {
        match uri.as_str() {
            "test://decimal" => Ok(Some(instance_of("54".to_string()))),
            "test://fail" => Err(error_message("factory exploded")),
            _ => Ok(None),
        }
    }
}

fn uri(text: &str) -> Uri {
    Uri::from_str(text).unwrap()
}

fn registry() -> StaticTypeRegistry {
    let mut registry = StaticTypeRegistry::new();

    registry
        .register(
            TypeRef::named("Trivial"),
            ComponentDescriptor::builder("Trivial")
                .with_default_constructor(ConstructorDescriptor::new(vec![], |_| {
                    Ok(Box::new(Trivial))
                }))
                .build()
                .unwrap(),
        )
        .unwrap();

    registry
        .register(
            TypeRef::named("Holder"),
            ComponentDescriptor::builder("Holder")
                .with_default_constructor(ConstructorDescriptor::new(
                    vec![FeatureDescriptor::required::<Trivial>("other")],
                    |values| {
                        Ok(Box::new(Holder {
                            other: feature::<Trivial>(values, 0)?,
                        }))
                    },
                ))
                .build()
                .unwrap(),
        )
        .unwrap();

    registry
        .register(
            TypeRef::named("DecimalHolder"),
            ComponentDescriptor::builder("DecimalHolder")
                .with_default_constructor(ConstructorDescriptor::new(
                    vec![FeatureDescriptor::required::<i64>("v")],
                    |values| {
                        Ok(Box::new(DecimalHolder {
                            value: scalar_feature::<i64>(values, 0)?,
                        }))
                    },
                ))
                .build()
                .unwrap(),
        )
        .unwrap();

    registry
        .register(
            TypeRef::named("Panel"),
            ComponentDescriptor::builder("Panel")
                .with_default_constructor(ConstructorDescriptor::new(vec![], |_| {
                    Ok(Box::<Panel>::default())
                }))
                .with_property(
                    "width",
                    PropertyDescriptor::scalar::<Panel, i64>(true, |panel, width| {
                        panel.width = width;
                    }),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

    registry
        .register(
            TypeRef::named("TestFactory"),
            ComponentDescriptor::builder("TestFactory")
                .with_default_constructor(ConstructorDescriptor::new(vec![], |_| {
                    Ok(Box::new(TestFactory))
                }))
                .with_factory_scheme("test", factory_cast::<TestFactory>)
                .build()
                .unwrap(),
        )
        .unwrap();

    registry
}

#[test]
fn should_place_external_objects() {
    let id = PartId::random();
    let object = instance_of(Trivial);

    let engine = Engine::builder()
        .with_registry(Box::new(registry()))
        .with_external(ExternalObject::new(PartKey::Id(id), object.clone()))
        .with_external(ExternalObject::new(
            PartKey::Name("named".to_string()),
            instance_of(7i32),
        ))
        .build();

    let blueprint = Blueprint::new("test")
        .with_part(ExternalPart::new(PartKey::Id(id)))
        .with_part(ExternalPart::new(PartKey::Name("named".to_string())));

    let (container, report) = engine.assemble(&[blueprint]);

    assert!(report.is_none());
    assert!(Arc::ptr_eq(container.get(id).unwrap(), &object));
    assert_eq!(*container.get_by_name_as::<i32>("named").unwrap(), 7);
}

#[test]
fn should_register_external_factories_under_their_scheme() {
    let consumer = PartId::random();
    let factory = Arc::new(TestFactory) as FactoryPtr;

    let engine = Engine::builder()
        .with_registry(Box::new(registry()))
        .with_external(
            ExternalObject::new(PartKey::Name("maker".to_string()), instance_of(Trivial))
                .with_scheme("test")
                .with_factory(factory),
        )
        .build();

    let blueprint = Blueprint::new("test")
        .with_part(ExternalPart::new(PartKey::Name("maker".to_string())).with_scheme("test"))
        .with_part(
            ConcretePart::of_type(TypeRef::named("DecimalHolder"))
                .with_id(consumer)
                .with_feature("v", Reference::ByUri(uri("test://decimal"))),
        );

    let (container, report) = engine.assemble(&[blueprint]);

    assert!(report.is_none());
    assert!(container.factory("test").is_some());
    assert_eq!(container.get_as::<DecimalHolder>(consumer).unwrap().value, 54);
}

#[test]
fn should_report_missing_externals_and_skip_their_dependents() {
    let dependent = PartId::random();

    let engine = Engine::builder().with_registry(Box::new(registry())).build();

    let blueprint = Blueprint::new("test")
        .with_part(ExternalPart::new(PartKey::Name("absent".to_string())))
        .with_part(
            ConcretePart::of_type(TypeRef::named("Holder"))
                .with_id(dependent)
                .with_feature("other", Reference::ByName("absent".to_string())),
        );

    let (container, report) = engine.assemble(&[blueprint]);

    assert!(container.is_empty());

    let report = report.unwrap();
    assert_eq!(report.len(), 1);
    assert!(matches!(
        report.iter().next().unwrap(),
        EngineError::Resolution(ResolutionError::MissingExternal { .. })
    ));
    assert!(!container.contains(dependent));
}

#[test]
fn should_satisfy_references_against_undeclared_supplied_externals() {
    let holder = PartId::random();
    let dependency = instance_of(Trivial);

    let engine = Engine::builder()
        .with_registry(Box::new(registry()))
        .with_external(ExternalObject::new(
            PartKey::Name("ambient".to_string()),
            dependency.clone(),
        ))
        .build();

    let blueprint = Blueprint::new("test").with_part(
        ConcretePart::of_type(TypeRef::named("Holder"))
            .with_id(holder)
            .with_feature("other", Reference::ByName("ambient".to_string())),
    );

    let (container, report) = engine.assemble(&[blueprint]);

    assert!(report.is_none());
    assert!(Arc::ptr_eq(
        container.get_by_name("ambient").unwrap(),
        &dependency
    ));

    let holder = container.get_as::<Holder>(holder).unwrap();
    let ambient = container.get_by_name_as::<Trivial>("ambient").unwrap();
    assert!(Arc::ptr_eq(&holder.other, &ambient));
}

#[test]
fn should_record_factory_failures_per_slot() {
    let consumer = PartId::random();

    let engine = Engine::builder().with_registry(Box::new(registry())).build();

    let blueprint = Blueprint::new("test")
        .with_part(ConcretePart::of_type(TypeRef::named("TestFactory")))
        .with_part(
            ConcretePart::of_type(TypeRef::named("DecimalHolder"))
                .with_id(consumer)
                .with_feature("v", Reference::ByUri(uri("test://fail"))),
        );

    let (container, report) = engine.assemble(&[blueprint]);

    assert!(!container.contains(consumer));
    assert!(report.unwrap().iter().any(|error| {
        matches!(
            error,
            EngineError::Assembly(AssemblyError::FactoryFailure { part, .. }) if *part == consumer
        )
    }));
}

#[test]
fn should_apply_uri_valued_properties() {
    let part = PartId::random();

    let engine = Engine::builder().with_registry(Box::new(registry())).build();

    let blueprint = Blueprint::new("test")
        .with_part(ConcretePart::of_type(TypeRef::named("TestFactory")))
        .with_part(
            ConcretePart::of_type(TypeRef::named("Panel"))
                .with_id(part)
                .with_property("width", PropertyValue::ValueUri(uri("test://decimal"))),
        );

    let (container, report) = engine.assemble(&[blueprint]);

    assert!(report.is_none());
    assert_eq!(container.get_as::<Panel>(part).unwrap().width, 54);
}
