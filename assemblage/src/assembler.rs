//! Construction of the object graph in dependency order.
//!
//! The assembler walks the topological order produced by the
//! [DependencyGraph], so every dependency of a part is observable in the
//! [Container] before the part itself is constructed. Defects are recorded
//! per part and the walk continues; parts depending on a failed part are
//! skipped silently, like parts disabled by an undefined dependency. The one
//! fatal condition is a dependency cycle, which leaves the container empty.

use crate::coercion::CoercionRegistry;
use crate::container::Container;
use crate::descriptor::{dynamic_type_id, ComponentRole, FeatureDescriptor, PropertyDescriptor};
use crate::document::ExternalObject;
use crate::error::{AssemblyError, EngineError};
use crate::graph::DependencyGraph;
use crate::instance::{instance_of, BoxedInstance, InstancePtr};
use crate::model::{PartId, PartKey, Uri};
use crate::registry::TypeRegistry;
use crate::resolver::{
    ResolvedCollection, ResolvedCollectionKind, ResolvedConcrete, ResolvedExternal, ResolvedPart,
    ResolvedReference, ResolvedSet, ResolvedValue,
};
use fxhash::FxHashSet;
use itertools::Itertools;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

/// Walks the assembly order and populates a [Container], collecting per-part
/// errors without aborting the pass.
pub struct Assembler<'a> {
    set: &'a ResolvedSet,
    registry: &'a dyn TypeRegistry,
    coercion: &'a CoercionRegistry,
    externals: &'a [ExternalObject],
}

impl<'a> Assembler<'a> {
    pub fn new(
        set: &'a ResolvedSet,
        registry: &'a dyn TypeRegistry,
        coercion: &'a CoercionRegistry,
        externals: &'a [ExternalObject],
    ) -> Self {
        Self {
            set,
            registry,
            coercion,
            externals,
        }
    }

    /// Runs the assembly pass. With a cyclic dependency graph the container
    /// comes back empty, with one cycle error per cycle; otherwise every part
    /// that assembled is indexed and every part that did not has its defects
    /// in the error list.
    pub fn assemble(&self) -> (Container, Vec<EngineError>) {
        let graph = DependencyGraph::build(self.set);

        let cycles = graph.cycles();
        if !cycles.is_empty() {
            return (
                Container::default(),
                cycles
                    .into_iter()
                    .map(|participants| AssemblyError::Cycle { participants }.into())
                    .collect(),
            );
        }

        let order = graph.assembly_order(self.set);

        let mut container = Container::default();
        let mut errors: Vec<EngineError> = Vec::new();
        let mut failed: FxHashSet<PartId> = FxHashSet::default();

        for id in order {
            let Some(part) = self.set.part(id) else {
                continue;
            };

            if self.set.is_unassemblable(id) {
                failed.insert(id);
                continue;
            }

            if part
                .dependencies()
                .iter()
                .any(|dependency| failed.contains(dependency))
            {
                debug!(part = %id, "Skipping part with a failed dependency.");
                failed.insert(id);
                continue;
            }

            let result = match part {
                ResolvedPart::External(external) => self.place_external(external, &mut container),
                ResolvedPart::Concrete(concrete) => {
                    self.assemble_concrete(concrete, &mut container)
                }
                ResolvedPart::Collection(collection) => {
                    self.assemble_collection(collection, &mut container)
                }
                ResolvedPart::Undefined(_) => continue,
            };

            if let Err(part_errors) = result {
                failed.insert(id);
                errors.extend(part_errors.into_iter().map(EngineError::Assembly));
            }
        }

        (container, errors)
    }

    fn place_external(
        &self,
        external: &ResolvedExternal,
        container: &mut Container,
    ) -> Result<(), Vec<AssemblyError>> {
        let Some(supplied) = external.supplied.map(|index| &self.externals[index]) else {
            return Err(Vec::new());
        };

        debug!(part = %external.id, "Placing external object.");

        let name = match &external.key {
            PartKey::Name(name) => Some(name.as_str()),
            PartKey::Id(_) => None,
        };

        if let Some(scheme) = &external.scheme {
            match &supplied.factory {
                Some(factory) => container.insert_factory(scheme, factory.clone()),
                None => {
                    return Err(vec![AssemblyError::FactoryCastFailure {
                        part: external.id,
                        scheme: scheme.clone(),
                    }])
                }
            }
        }

        container.insert(external.id, name, supplied.instance.clone());

        Ok(())
    }

    fn assemble_concrete(
        &self,
        part: &ResolvedConcrete,
        container: &mut Container,
    ) -> Result<(), Vec<AssemblyError>> {
        let Some(descriptor) = part.descriptor.as_ref() else {
            return Err(Vec::new());
        };

        let mut part_errors = Vec::new();

        let constructor = match &part.constructor {
            Some(name) => {
                let constructor = descriptor.named_constructors.get(name);
                if constructor.is_none() {
                    part_errors.push(AssemblyError::UnknownConstructor {
                        part: part.id,
                        constructor: name.clone(),
                    });
                }
                constructor
            }
            None => {
                let constructor = descriptor.default_constructor.as_ref();
                if constructor.is_none() {
                    part_errors.push(AssemblyError::NoDefaultConstructor { part: part.id });
                }
                constructor
            }
        };

        let mut values: Vec<Option<InstancePtr>> = Vec::new();
        if let Some(constructor) = constructor {
            for feature in &constructor.features {
                let value = match part.features.get(&feature.name) {
                    None if feature.required => {
                        part_errors.push(AssemblyError::MissingFeature {
                            part: part.id,
                            feature: feature.name.clone(),
                        });
                        None
                    }
                    None => None,
                    Some(reference) => {
                        match self.resolve_feature(part.id, feature, reference, container) {
                            Ok(value) => value,
                            Err(error) => {
                                part_errors.push(error);
                                None
                            }
                        }
                    }
                };

                values.push(value);
            }
        }

        // Properties are validated and coerced before construction, so a part
        // with several distinct defects reports all of them in one pass.
        for (name, property) in descriptor
            .properties
            .iter()
            .sorted_by_key(|(name, _)| name.as_str())
        {
            if property.required && !part.properties.contains_key(name) {
                part_errors.push(AssemblyError::MissingProperty {
                    part: part.id,
                    property: name.clone(),
                });
            }
        }

        let mut pending_properties = Vec::new();
        for (name, value) in &part.properties {
            let Some(property) = descriptor.properties.get(name) else {
                part_errors.push(AssemblyError::UnknownProperty {
                    part: part.id,
                    property: name.clone(),
                });
                continue;
            };

            match self.resolve_property_value(part.id, name, property, value, container) {
                Ok(Some(resolved)) => pending_properties.push((name, property, resolved)),
                Ok(None) => {}
                Err(error) => part_errors.push(error),
            }
        }

        if !part_errors.is_empty() {
            return Err(part_errors);
        }

        let Some(constructor) = constructor else {
            return Err(part_errors);
        };

        debug!(part = %part.id, component_type = %descriptor.type_name, "Constructing part.");

        let mut instance =
            (constructor.invoke)(&values).map_err(|source| {
                vec![AssemblyError::ConstructionFailure {
                    part: part.id,
                    source,
                }]
            })?;

        for (name, property, value) in pending_properties {
            if let Err(source) = (property.setter)(instance.as_mut(), value) {
                part_errors.push(AssemblyError::PropertyApplicationFailure {
                    part: part.id,
                    property: name.clone(),
                    source,
                });
            }
        }

        if !part_errors.is_empty() {
            return Err(part_errors);
        }

        if let Some(notify) = &descriptor.on_properties_set {
            notify(instance.as_mut()).map_err(|source| {
                vec![AssemblyError::NotificationFailure {
                    part: part.id,
                    source,
                }]
            })?;
        }

        let instance: InstancePtr = Arc::from(instance);

        if let Some(scheme) = &part.scheme {
            let factory = match &descriptor.role {
                ComponentRole::Factory { cast, .. } => cast(instance.clone()),
                ComponentRole::Ordinary => None,
            };

            match factory {
                Some(factory) => container.insert_factory(scheme, factory),
                None => {
                    return Err(vec![AssemblyError::FactoryCastFailure {
                        part: part.id,
                        scheme: scheme.clone(),
                    }])
                }
            }
        }

        container.insert(part.id, part.name.as_deref(), instance);

        Ok(())
    }

    fn assemble_collection(
        &self,
        part: &ResolvedCollection,
        container: &mut Container,
    ) -> Result<(), Vec<AssemblyError>> {
        let binding = part
            .runtime_type
            .as_ref()
            .and_then(|type_ref| self.registry.collection_binding(type_ref));
        let Some(binding) = binding else {
            return Err(Vec::new());
        };

        debug!(part = %part.id, "Populating collection part.");

        let mut instance: BoxedInstance = binding.instantiate();
        let mut part_errors = Vec::new();

        let elements: Vec<(Option<&str>, &ResolvedReference)> = match &part.kind {
            ResolvedCollectionKind::List(elements) => {
                elements.iter().map(|element| (None, element)).collect()
            }
            ResolvedCollectionKind::Dictionary(entries) => entries
                .iter()
                .map(|(key, element)| (Some(key.as_str()), element))
                .collect(),
        };

        for (key, element) in elements {
            let value = match self.resolve_element(part.id, element, container) {
                Ok(value) => value,
                Err(error) => {
                    part_errors.push(error);
                    continue;
                }
            };

            if let Err(source) = binding.insert(instance.as_mut(), key, value) {
                part_errors.push(AssemblyError::ConstructionFailure {
                    part: part.id,
                    source,
                });
            }
        }

        if !part_errors.is_empty() {
            return Err(part_errors);
        }

        container.insert(part.id, part.name.as_deref(), Arc::from(instance));

        Ok(())
    }

    fn resolve_feature(
        &self,
        part: PartId,
        feature: &FeatureDescriptor,
        reference: &ResolvedReference,
        container: &Container,
    ) -> Result<Option<InstancePtr>, AssemblyError> {
        match reference {
            ResolvedReference::Constant(text) => self
                .coercion
                .coerce_str(text, feature.declared_type, &feature.type_name)
                .map(Some)
                .map_err(|error| AssemblyError::Coercion {
                    part,
                    slot: feature.name.clone(),
                    detail: error.to_string(),
                }),
            ResolvedReference::Part(dependency) => {
                let instance =
                    container
                        .get(*dependency)
                        .ok_or(AssemblyError::MissingDependency {
                            part,
                            slot: feature.name.clone(),
                            dependency: *dependency,
                        })?;

                if feature.declared_type == dynamic_type_id()
                    || (**instance).type_id() == feature.declared_type
                {
                    Ok(Some(instance.clone()))
                } else {
                    Err(AssemblyError::IncompatibleValue {
                        part,
                        slot: feature.name.clone(),
                        expected: feature.type_name.clone(),
                    })
                }
            }
            ResolvedReference::Factory { uri, factory } => {
                let produced = self.produce(part, &feature.name, uri, *factory, container)?;

                match produced {
                    None if feature.required => Err(AssemblyError::FactoryProducedNothing {
                        part,
                        slot: feature.name.clone(),
                        uri: uri.clone(),
                    }),
                    None => Ok(None),
                    Some(value) => self
                        .coerce_produced(
                            part,
                            &feature.name,
                            feature.declared_type,
                            &feature.type_name,
                            value,
                        )
                        .map(Some),
                }
            }
        }
    }

    fn resolve_property_value(
        &self,
        part: PartId,
        property_name: &str,
        property: &PropertyDescriptor,
        value: &ResolvedValue,
        container: &Container,
    ) -> Result<Option<InstancePtr>, AssemblyError> {
        match value {
            ResolvedValue::Scalar(text) => self
                .coercion
                .coerce_str(text, property.declared_type, &property.type_name)
                .map(Some)
                .map_err(|error| AssemblyError::Coercion {
                    part,
                    slot: property_name.to_string(),
                    detail: error.to_string(),
                }),
            ResolvedValue::Factory { uri, factory } => {
                let produced = self.produce(part, property_name, uri, *factory, container)?;

                match produced {
                    None if property.required => Err(AssemblyError::FactoryProducedNothing {
                        part,
                        slot: property_name.to_string(),
                        uri: uri.clone(),
                    }),
                    None => Ok(None),
                    Some(value) => self
                        .coerce_produced(
                            part,
                            property_name,
                            property.declared_type,
                            &property.type_name,
                            value,
                        )
                        .map(Some),
                }
            }
        }
    }

    fn resolve_element(
        &self,
        part: PartId,
        element: &ResolvedReference,
        container: &Container,
    ) -> Result<InstancePtr, AssemblyError> {
        match element {
            // Elements are untyped; constants are delivered as strings.
            ResolvedReference::Constant(text) => Ok(instance_of(text.clone())),
            ResolvedReference::Part(dependency) => container
                .get(*dependency)
                .cloned()
                .ok_or(AssemblyError::MissingDependency {
                    part,
                    slot: "element".to_string(),
                    dependency: *dependency,
                }),
            ResolvedReference::Factory { uri, factory } => self
                .produce(part, "element", uri, *factory, container)?
                .ok_or_else(|| AssemblyError::FactoryProducedNothing {
                    part,
                    slot: "element".to_string(),
                    uri: uri.clone(),
                }),
        }
    }

    fn produce(
        &self,
        part: PartId,
        slot: &str,
        uri: &Uri,
        factory: PartId,
        container: &Container,
    ) -> Result<Option<InstancePtr>, AssemblyError> {
        let handle = container
            .factory(uri.scheme())
            .ok_or(AssemblyError::MissingDependency {
                part,
                slot: slot.to_string(),
                dependency: factory,
            })?;

        handle
            .produce(uri)
            .map_err(|source| AssemblyError::FactoryFailure {
                part,
                slot: slot.to_string(),
                source,
            })
    }

    /// Factory products that are strings are coerced into the declared type;
    /// anything else must be directly assignable.
    fn coerce_produced(
        &self,
        part: PartId,
        slot: &str,
        declared_type: TypeId,
        type_name: &str,
        value: InstancePtr,
    ) -> Result<InstancePtr, AssemblyError> {
        if declared_type == dynamic_type_id() || (*value).type_id() == declared_type {
            return Ok(value);
        }

        if value.downcast_ref::<String>().is_some() {
            return self
                .coercion
                .coerce_value(&value, declared_type, type_name)
                .map_err(|error| AssemblyError::Coercion {
                    part,
                    slot: slot.to_string(),
                    detail: error.to_string(),
                });
        }

        Err(AssemblyError::IncompatibleValue {
            part,
            slot: slot.to_string(),
            expected: type_name.to_string(),
        })
    }
}
