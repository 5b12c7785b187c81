//! Interfaces to the outside of the engine: blueprint document readers and
//! writers, and the handoff of caller-supplied external objects.
//!
//! The engine does not parse documents itself. Concrete readers (such as the
//! JSON one in the `assemblage-document` crate) translate a source into
//! [Blueprint]s and append their findings to an
//! [ErrorSink](crate::error::ErrorSink); the facade starts assembly only when
//! no finding at `Error` severity or above was reported.

use crate::error::{DocumentError, ErrorSink};
use crate::factory::FactoryPtr;
use crate::instance::InstancePtr;
use crate::model::{Blueprint, PartKey};
#[cfg(test)]
use mockall::automock;

/// Reads blueprint documents from a textual source.
#[cfg_attr(test, automock)]
pub trait BlueprintReader {
    /// Translates `source` into blueprints, appending warnings and errors to
    /// `sink`. Implementations return the blueprints they could read even
    /// when findings were reported.
    fn read(&self, source: &str, sink: &mut ErrorSink) -> Vec<Blueprint>;
}

/// Writes blueprint models back into a textual document, round-tripping all
/// non-temporary fields.
#[cfg_attr(test, automock)]
pub trait BlueprintWriter {
    fn write(&self, blueprints: &[Blueprint]) -> Result<String, DocumentError>;
}

/// A caller-supplied object satisfying an external part declaration, keyed by
/// identifier or name.
#[derive(Clone)]
pub struct ExternalObject {
    pub key: PartKey,
    pub scheme: Option<String>,
    pub instance: InstancePtr,
    /// Present when the object is itself a factory; it is then registered
    /// under its scheme.
    pub factory: Option<FactoryPtr>,
}

impl ExternalObject {
    pub fn new(key: PartKey, instance: InstancePtr) -> Self {
        Self {
            key,
            scheme: None,
            instance,
            factory: None,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_factory(mut self, factory: FactoryPtr) -> Self {
        self.factory = Some(factory);
        self
    }

    pub(crate) fn matches(&self, key: &PartKey) -> bool {
        self.key == *key
    }
}
