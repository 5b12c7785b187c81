//! The facade tying the pipeline together: documents are read, the blueprint
//! union resolved, the dependency order computed and the parts assembled into
//! a [Container].
//!
//! [Engine] is configured through [EngineBuilder] and is reusable: each
//! [Engine::assemble] call runs one complete pass over the given blueprints.

use crate::assembler::Assembler;
use crate::coercion::CoercionRegistry;
use crate::container::Container;
use crate::document::{BlueprintReader, ExternalObject};
use crate::error::{AssemblyReport, ErrorSink};
use crate::model::Blueprint;
use crate::registry::{StaticTypeRegistry, TypeRegistryPtr};
use crate::resolver::Resolver;
use derive_more::Constructor;
use tracing::{error, info};

/// Builder for [Engine] with sensible defaults, for easy construction.
pub struct EngineBuilder {
    registry: TypeRegistryPtr,
    coercion: CoercionRegistry,
    externals: Vec<ExternalObject>,
}

impl EngineBuilder {
    /// Creates a builder with an empty type registry and the standard scalar
    /// parsers.
    pub fn new() -> Self {
        Self {
            registry: Box::new(StaticTypeRegistry::new()),
            coercion: CoercionRegistry::default(),
            externals: Vec::new(),
        }
    }

    /// Sets the type registry consulted during resolution.
    pub fn with_registry(mut self, registry: TypeRegistryPtr) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the coercion registry used for constants and factory-produced
    /// strings.
    pub fn with_coercion(mut self, coercion: CoercionRegistry) -> Self {
        self.coercion = coercion;
        self
    }

    /// Supplies an external object satisfying an external part declaration.
    pub fn with_external(mut self, external: ExternalObject) -> Self {
        self.externals.push(external);
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.registry, self.coercion, self.externals)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembly pipeline facade.
#[derive(Constructor)]
pub struct Engine {
    registry: TypeRegistryPtr,
    coercion: CoercionRegistry,
    externals: Vec<ExternalObject>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Resolves and assembles already loaded blueprints. The returned report
    /// is `None` on a clean pass; otherwise the container holds every part
    /// that did assemble and the report describes the rest.
    pub fn assemble(&self, blueprints: &[Blueprint]) -> (Container, Option<AssemblyReport>) {
        info!(blueprints = blueprints.len(), "Resolving blueprint union.");

        let resolver = Resolver::new(self.registry.as_ref(), &self.externals);
        let (set, resolution_errors) = resolver.resolve(blueprints);

        let mut report = AssemblyReport::default();
        report.extend(resolution_errors);

        info!(parts = set.len(), "Assembling parts.");

        let assembler = Assembler::new(
            &set,
            self.registry.as_ref(),
            &self.coercion,
            &self.externals,
        );
        let (container, assembly_errors) = assembler.assemble();
        report.extend(assembly_errors);

        info!(
            assembled = container.len(),
            errors = report.len(),
            "Assembly pass finished."
        );

        (container, report.into_option())
    }

    /// Reads blueprints from `source` and assembles them. Read-stage findings
    /// at error severity or above abort before assembly and come back as
    /// `Err`; warnings are tolerated.
    pub fn assemble_from(
        &self,
        reader: &dyn BlueprintReader,
        source: &str,
    ) -> Result<(Container, Option<AssemblyReport>), AssemblyReport> {
        let mut sink = ErrorSink::new();
        let blueprints = reader.read(source, &mut sink);

        if sink.has_blocking() {
            error!("Blueprint reading reported blocking findings; assembly aborted.");
            return Err(sink.into_report());
        }

        Ok(self.assemble(&blueprints))
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::{ComponentDescriptor, ConstructorDescriptor};
    use crate::document::MockBlueprintReader;
    use crate::engine::Engine;
    use crate::error::{DocumentError, Severity};
    use crate::model::{Blueprint, ConcretePart, PartId, TypeRef};
    use crate::registry::StaticTypeRegistry;
    use mockall::predicate::*;

    struct Widget;

    fn widget_engine() -> Engine {
        let mut registry = StaticTypeRegistry::new();
        registry
            .register(
                TypeRef::named("Widget"),
                ComponentDescriptor::builder("Widget")
                    .with_default_constructor(ConstructorDescriptor::new(vec![], |_| {
                        Ok(Box::new(Widget))
                    }))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        Engine::builder().with_registry(Box::new(registry)).build()
    }

    #[test]
    fn should_assemble_from_a_reader() {
        let id = PartId::random();

        let mut reader = MockBlueprintReader::new();
        reader
            .expect_read()
            .with(eq("source"), always())
            .times(1)
            .returning(move |_, _| {
                vec![Blueprint::new("test")
                    .with_part(ConcretePart::of_type(TypeRef::named("Widget")).with_id(id))]
            });

        let engine = widget_engine();
        let (container, report) = engine.assemble_from(&reader, "source").unwrap();

        assert!(report.is_none());
        assert!(container.contains(id));
    }

    #[test]
    fn should_tolerate_reader_warnings() {
        let mut reader = MockBlueprintReader::new();
        reader.expect_read().times(1).returning(|_, sink| {
            sink.push(
                Severity::Warning,
                DocumentError::Schema {
                    detail: "deprecated element".to_string(),
                },
            );
            vec![Blueprint::new("test")]
        });

        let engine = widget_engine();
        assert!(engine.assemble_from(&reader, "source").is_ok());
    }

    #[test]
    fn should_abort_on_blocking_reader_findings() {
        let mut reader = MockBlueprintReader::new();
        reader.expect_read().times(1).returning(|_, sink| {
            sink.error(DocumentError::Syntax {
                detail: "unexpected end of input".to_string(),
            });
            Vec::new()
        });

        let engine = widget_engine();
        let report = engine.assemble_from(&reader, "source").unwrap_err();
        assert_eq!(report.len(), 1);
    }
}
