//! JSON blueprint documents for the [assemblage] composition engine.
//!
//! This crate implements the engine's
//! [BlueprintReader](assemblage::document::BlueprintReader) and
//! [BlueprintWriter](assemblage::document::BlueprintWriter) interfaces over a
//! JSON rendition of the blueprint document grammar. Readers append their
//! findings to the engine's error sink instead of failing fast, and writers
//! round-trip every non-temporary field of the model.
//!
//! ```
//! use assemblage::document::BlueprintReader;
//! use assemblage::error::ErrorSink;
//! use assemblage_document::JsonBlueprintReader;
//!
//! let source = r#"{
//!     "blueprint-list": [{
//!         "namespace": "demo",
//!         "parts": [
//!             {"part": {"name": "greeter", "runtime-type": {"name": "Greeter"}}}
//!         ]
//!     }]
//! }"#;
//!
//! let mut sink = ErrorSink::new();
//! let blueprints = JsonBlueprintReader::new().read(source, &mut sink);
//!
//! assert!(sink.is_empty());
//! assert_eq!(blueprints[0].parts.len(), 1);
//! ```

mod schema;

pub mod reader;
pub mod writer;

pub use reader::JsonBlueprintReader;
pub use writer::JsonBlueprintWriter;
