//! A configuration-driven object composition engine.
//!
//! The host application registers a catalogue of
//! [component descriptors](descriptor::ComponentDescriptor) — structural
//! summaries of its own types — and hands the engine one or more declarative
//! [blueprints](model::Blueprint) describing instances, their dependencies
//! and their scalar settings. The engine validates the union, orders
//! construction along the dependency graph, wires each instance to its peers
//! and exposes the result through a read-only [container](container::Container)
//! indexed by identifier, by symbolic name and by URI-scheme factory.
//!
//! Errors are collected, not short-circuited: one pass reports every defect
//! in the union, and callers receive a possibly partial container next to the
//! aggregate report.
//!
//! ### Simple usage example
//!
//! ```
//! use assemblage::descriptor::{ComponentDescriptor, ConstructorDescriptor, FeatureDescriptor};
//! use assemblage::engine::Engine;
//! use assemblage::instance::scalar_feature;
//! use assemblage::model::{Blueprint, ConcretePart, Reference, TypeRef};
//! use assemblage::registry::StaticTypeRegistry;
//!
//! // a host type the engine should construct
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! // the host describes the type instead of the engine reflecting over it
//! let mut registry = StaticTypeRegistry::new();
//! registry
//!     .register(
//!         TypeRef::named("Greeter"),
//!         ComponentDescriptor::builder("Greeter")
//!             .with_default_constructor(ConstructorDescriptor::new(
//!                 vec![FeatureDescriptor::required::<String>("greeting")],
//!                 |values| {
//!                     Ok(Box::new(Greeter {
//!                         greeting: scalar_feature::<String>(values, 0)?,
//!                     }))
//!                 },
//!             ))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! // a blueprint declares one part of that type
//! let blueprint = Blueprint::new("demo").with_part(
//!     ConcretePart::of_type(TypeRef::named("Greeter"))
//!         .with_name("greeter")
//!         .with_feature("greeting", Reference::Constant("hello".to_string())),
//! );
//!
//! let engine = Engine::builder().with_registry(Box::new(registry)).build();
//! let (container, report) = engine.assemble(&[blueprint]);
//!
//! assert!(report.is_none());
//! let greeter = container.get_by_name_as::<Greeter>("greeter").unwrap();
//! assert_eq!(greeter.greeting, "hello");
//! ```

pub mod assembler;
pub mod coercion;
pub mod container;
pub mod descriptor;
pub mod document;
pub mod engine;
pub mod error;
pub mod factory;
pub mod graph;
pub mod instance;
pub mod model;
pub mod registry;
pub mod resolver;
