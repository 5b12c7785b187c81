//! Error taxonomy of the assembly pipeline.
//!
//! Errors are grouped by the stage that discovers them: descriptor
//! registration, document reading, reference resolution and assembly proper.
//! Apart from cycles, assembly-stage errors are collected into an
//! [AssemblyReport] rather than aborting the pass, so callers observe partial
//! success: a container holding every part that did assemble, next to the
//! report describing every part that did not.

use crate::model::{PartId, Uri};
use itertools::Itertools;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Shared pointer to an error raised by host code (constructors, setters,
/// factories, notifications).
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Host-type contract violations discovered when building or registering
/// component descriptors, before any blueprint work.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum DescriptorError {
    #[error("component type '{type_name}' declares no constructor")]
    NoConstructor { type_name: String },
    #[error("component type '{type_name}' declares more than one default constructor")]
    MultipleDefaultConstructors { type_name: String },
    #[error("component type '{type_name}' declares named constructor '{constructor}' twice")]
    DuplicateNamedConstructor {
        type_name: String,
        constructor: String,
    },
    #[error("constructor '{constructor}' of component type '{type_name}' declares feature '{feature}' twice")]
    DuplicateFeature {
        type_name: String,
        constructor: String,
        feature: String,
    },
    #[error("component type '{type_name}' declares property '{property}' twice")]
    DuplicateProperty { type_name: String, property: String },
    #[error("factory component type '{type_name}' declares an empty scheme")]
    EmptyFactoryScheme { type_name: String },
    #[error("type '{type_name}' still carries unbound type parameters")]
    UnboundTypeParameters { type_name: String },
    #[error("a descriptor for type '{type_name}' is already registered")]
    DuplicateRegistration { type_name: String },
    #[error("type handle does not belong to this registry")]
    StaleHandle,
}

/// Syntax and schema findings reported by blueprint readers and writers.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum DocumentError {
    #[error("document syntax error: {detail}")]
    Syntax { detail: String },
    #[error("document schema error: {detail}")]
    Schema { detail: String },
}

/// Reference and uniqueness violations discovered while resolving the
/// blueprint union, before any part is constructed.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ResolutionError {
    #[error("duplicate part identifier '{id}'; the later occurrence is dropped")]
    DuplicateId { id: PartId },
    #[error("duplicate part name '{name}'; the later occurrence is dropped")]
    DuplicateName { name: String },
    #[error("part '{part}' refers to unknown type alias '{alias}'")]
    UnknownAlias { part: PartId, alias: String },
    #[error("part '{part}' refers to unknown part name '{name}'")]
    UnresolvedName { part: PartId, name: String },
    #[error("part '{part}' refers to unknown part identifier '{id}'")]
    UnresolvedId { part: PartId, id: PartId },
    #[error("part '{part}' has runtime type '{type_name}' which no registry can resolve")]
    UnresolvedType { part: PartId, type_name: String },
    #[error("descriptor for part '{part}' of type '{type_name}' was rejected: {source}")]
    DescriptorRejected {
        part: PartId,
        type_name: String,
        source: DescriptorError,
    },
    #[error("scheme '{scheme}' is declared by factory '{factory}' but already belongs to '{previous}'")]
    DuplicateScheme {
        scheme: String,
        factory: PartId,
        previous: PartId,
    },
    #[error("part '{part}' refers to URI scheme '{scheme}' for which no factory is declared")]
    UnknownScheme { part: PartId, scheme: String },
    #[error("no external object was supplied for external part '{key}'")]
    MissingExternal { key: String },
    #[error("collection part '{part}' has runtime type '{type_name}' which is neither a recognised shape nor a registered collection binding")]
    InvalidCollectionType { part: PartId, type_name: String },
}

/// Per-part defects discovered while walking the assembly order, plus the one
/// fatal condition (a dependency cycle) that prevents the walk entirely.
#[derive(Error, Clone, Debug)]
pub enum AssemblyError {
    #[error("dependency cycle between parts: {}", participants.iter().map(|id| id.to_string()).join(", "))]
    Cycle { participants: Vec<PartId> },
    #[error("part '{part}' selects unknown constructor '{constructor}'")]
    UnknownConstructor { part: PartId, constructor: String },
    #[error("part '{part}' has no default constructor and selects none by name")]
    NoDefaultConstructor { part: PartId },
    #[error("part '{part}' is missing required feature '{feature}'")]
    MissingFeature { part: PartId, feature: String },
    #[error("part '{part}' is missing required property '{property}'")]
    MissingProperty { part: PartId, property: String },
    #[error("part '{part}' declares property '{property}' which its type does not have")]
    UnknownProperty { part: PartId, property: String },
    #[error("value for slot '{slot}' of part '{part}' cannot be coerced: {detail}")]
    Coercion {
        part: PartId,
        slot: String,
        detail: String,
    },
    #[error("value for slot '{slot}' of part '{part}' is not assignable to '{expected}'")]
    IncompatibleValue {
        part: PartId,
        slot: String,
        expected: String,
    },
    #[error("dependency '{dependency}' of part '{part}' (slot '{slot}') is absent from the container")]
    MissingDependency {
        part: PartId,
        slot: String,
        dependency: PartId,
    },
    #[error("factory produced no value for required slot '{slot}' of part '{part}' (uri '{uri}')")]
    FactoryProducedNothing {
        part: PartId,
        slot: String,
        uri: Uri,
    },
    #[error("factory failed producing slot '{slot}' of part '{part}': {source}")]
    FactoryFailure {
        part: PartId,
        slot: String,
        source: ErrorPtr,
    },
    #[error("constructed factory part '{part}' cannot be cast to a factory handle for scheme '{scheme}'")]
    FactoryCastFailure { part: PartId, scheme: String },
    #[error("constructor of part '{part}' failed: {source}")]
    ConstructionFailure { part: PartId, source: ErrorPtr },
    #[error("setter for property '{property}' of part '{part}' failed: {source}")]
    PropertyApplicationFailure {
        part: PartId,
        property: String,
        source: ErrorPtr,
    },
    #[error("properties-set notification of part '{part}' failed: {source}")]
    NotificationFailure { part: PartId, source: ErrorPtr },
}

/// Umbrella over the per-stage error kinds, as collected in reports and sinks.
#[derive(Error, Clone, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Aggregate of every error collected across a resolution + assembly pass.
/// Pipeline entry points return `(Container, Option<AssemblyReport>)`; `None`
/// means a clean pass.
#[derive(Clone, Default, Debug)]
pub struct AssemblyReport {
    errors: Vec<EngineError>,
}

impl AssemblyReport {
    pub(crate) fn push(&mut self, error: impl Into<EngineError>) {
        self.errors.push(error.into());
    }

    pub(crate) fn extend(&mut self, errors: impl IntoIterator<Item = EngineError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineError> {
        self.errors.iter()
    }

    /// Consumes the report, yielding `None` when no error was collected.
    pub fn into_option(self) -> Option<Self> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl std::fmt::Display for AssemblyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} error(s) collected:", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "  {error}")?;
        }

        Ok(())
    }
}

/// Severity of an [ErrorSink] entry. Warnings never abort; anything above
/// aborts the stage that reported it.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// A single finding appended to an [ErrorSink].
#[derive(Clone, Debug)]
pub struct SinkEntry {
    pub severity: Severity,
    pub error: EngineError,
}

/// Accumulator handed to blueprint readers. Read-stage findings at
/// [Severity::Error] or above prevent assembly from starting.
#[derive(Clone, Default, Debug)]
pub struct ErrorSink {
    entries: Vec<SinkEntry>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, error: impl Into<EngineError>) {
        self.entries.push(SinkEntry {
            severity,
            error: error.into(),
        });
    }

    pub fn warning(&mut self, error: impl Into<EngineError>) {
        self.push(Severity::Warning, error);
    }

    pub fn error(&mut self, error: impl Into<EngineError>) {
        self.push(Severity::Error, error);
    }

    pub fn fatal(&mut self, error: impl Into<EngineError>) {
        self.push(Severity::Fatal, error);
    }

    /// True when any entry is at [Severity::Error] or above.
    pub fn has_blocking(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity >= Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SinkEntry] {
        &self.entries
    }

    /// Moves every blocking entry into an [AssemblyReport], leaving warnings
    /// behind.
    pub fn into_report(self) -> AssemblyReport {
        let mut report = AssemblyReport::default();
        report.extend(
            self.entries
                .into_iter()
                .filter(|entry| entry.severity >= Severity::Error)
                .map(|entry| entry.error),
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{AssemblyReport, DocumentError, ErrorSink, ResolutionError, Severity};

    #[test]
    fn should_collect_report_errors() {
        let mut report = AssemblyReport::default();
        assert!(report.clone().into_option().is_none());

        report.push(ResolutionError::DuplicateName {
            name: "part".to_string(),
        });

        assert_eq!(report.len(), 1);
        assert!(report.into_option().is_some());
    }

    #[test]
    fn should_distinguish_blocking_sink_entries() {
        let mut sink = ErrorSink::new();
        sink.warning(DocumentError::Schema {
            detail: "deprecated element".to_string(),
        });
        assert!(!sink.has_blocking());

        sink.error(DocumentError::Syntax {
            detail: "unexpected end of input".to_string(),
        });
        assert!(sink.has_blocking());
        assert_eq!(sink.entries().len(), 2);

        let report = sink.into_report();
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn should_order_severities() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }
}
