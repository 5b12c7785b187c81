//! Resolution of textual type references to component descriptors.
//!
//! A [TypeRegistry] answers two questions: does a
//! [TypeRef](crate::model::TypeRef) denote a known component type, and what
//! is that type's [ComponentDescriptor]. The bundled [StaticTypeRegistry] is
//! populated explicitly by the host; registration is best-effort, so one
//! rejected descriptor never poisons the others.
//!
//! The registry also carries [CollectionBinding]s: recipes for materialising
//! collection parts into concrete containers. The two abstract collection
//! shapes, [SEQUENCE] and [DICTIONARY], are always available and materialise
//! the canonical containers (`Vec<InstancePtr>` and
//! `BTreeMap<String, InstancePtr>`).

use crate::descriptor::ComponentDescriptor;
use crate::error::{DescriptorError, ErrorPtr};
use crate::instance::{error_message, BoxedInstance, InstancePtr, InstanceTypeError};
use crate::model::TypeRef;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Runtime type name of the abstract ordered-sequence collection shape.
pub const SEQUENCE: &str = "sequence";

/// Runtime type name of the abstract keyed-map collection shape.
pub const DICTIONARY: &str = "dictionary";

pub type TypeRegistryPtr = Box<dyn TypeRegistry + Send + Sync>;

/// Opaque handle to a type known to a registry; only meaningful for the
/// registry that produced it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeHandle(usize);

/// Resolves type references and provides descriptors. Implementations are
/// pluggable; the engine ships [StaticTypeRegistry] and stays agnostic of how
/// descriptors come to exist.
#[cfg_attr(test, automock)]
pub trait TypeRegistry {
    /// Resolves a type reference to a handle, or `None` when the reference
    /// denotes no known type.
    fn resolve(&self, reference: &TypeRef) -> Option<TypeHandle>;

    /// Produces the descriptor for a previously resolved handle.
    fn describe(&self, handle: TypeHandle) -> Result<Arc<ComponentDescriptor>, DescriptorError>;

    /// Returns the collection binding for a collection runtime type, if one
    /// is known.
    fn collection_binding(&self, reference: &TypeRef) -> Option<CollectionBinding>;
}

/// Recipe for materialising and populating one concrete collection container
/// type.
#[derive(Clone)]
pub struct CollectionBinding {
    new: Arc<dyn Fn() -> BoxedInstance + Send + Sync>,
    insert: Arc<
        dyn Fn(&mut (dyn Any + Send + Sync), Option<&str>, InstancePtr) -> Result<(), ErrorPtr>
            + Send
            + Sync,
    >,
}

impl CollectionBinding {
    /// Binding for an ordered container with an append operation.
    pub fn sequence<C: Send + Sync + 'static>(
        new: impl Fn() -> C + Send + Sync + 'static,
        push: impl Fn(&mut C, InstancePtr) + Send + Sync + 'static,
    ) -> Self {
        Self {
            new: Arc::new(move || Box::new(new())),
            insert: Arc::new(move |target, _key, value| {
                let target = target
                    .downcast_mut::<C>()
                    .ok_or_else(|| bad_container::<C>())?;
                push(target, value);
                Ok(())
            }),
        }
    }

    /// Binding for a keyed container with an insert operation. Elements
    /// delivered without a key are rejected.
    pub fn dictionary<C: Send + Sync + 'static>(
        new: impl Fn() -> C + Send + Sync + 'static,
        insert: impl Fn(&mut C, String, InstancePtr) + Send + Sync + 'static,
    ) -> Self {
        Self {
            new: Arc::new(move || Box::new(new())),
            insert: Arc::new(move |target, key, value| {
                let target = target
                    .downcast_mut::<C>()
                    .ok_or_else(|| bad_container::<C>())?;
                let key = key.ok_or_else(|| {
                    error_message("keyed container received an element without a key")
                })?;
                insert(target, key.to_string(), value);
                Ok(())
            }),
        }
    }

    /// The canonical container for the [SEQUENCE] shape.
    pub fn builtin_sequence() -> Self {
        Self::sequence(Vec::<InstancePtr>::new, Vec::push)
    }

    /// The canonical container for the [DICTIONARY] shape.
    pub fn builtin_dictionary() -> Self {
        Self::dictionary(
            BTreeMap::<String, InstancePtr>::new,
            |map, key, value| {
                map.insert(key, value);
            },
        )
    }

    pub(crate) fn instantiate(&self) -> BoxedInstance {
        (self.new)()
    }

    pub(crate) fn insert(
        &self,
        target: &mut (dyn Any + Send + Sync),
        key: Option<&str>,
        value: InstancePtr,
    ) -> Result<(), ErrorPtr> {
        (self.insert)(target, key, value)
    }
}

fn bad_container<C>() -> ErrorPtr {
    Arc::new(InstanceTypeError {
        expected: std::any::type_name::<C>(),
    }) as ErrorPtr
}

/// The result of building one descriptor for registration; carries the
/// builder outcome so failures aggregate instead of aborting registration of
/// the remaining types.
pub struct DescriptorRegistration {
    pub type_ref: TypeRef,
    pub descriptor: Result<ComponentDescriptor, DescriptorError>,
}

impl DescriptorRegistration {
    pub fn new(
        type_ref: TypeRef,
        descriptor: Result<ComponentDescriptor, DescriptorError>,
    ) -> Self {
        Self {
            type_ref,
            descriptor,
        }
    }
}

/// Registry populated explicitly from host-supplied registrations.
#[derive(Clone, Default)]
pub struct StaticTypeRegistry {
    descriptors: Vec<Arc<ComponentDescriptor>>,
    by_key: FxHashMap<String, usize>,
    collections: FxHashMap<String, CollectionBinding>,
}

impl StaticTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a batch of registrations, best-effort: each
    /// failed registration lands in the returned aggregate and the remaining
    /// ones are registered regardless.
    pub fn from_registrations(
        registrations: impl IntoIterator<Item = DescriptorRegistration>,
    ) -> (Self, Vec<DescriptorError>) {
        let mut registry = Self::new();
        let mut failures = Vec::new();

        for registration in registrations {
            let result = registration
                .descriptor
                .and_then(|descriptor| registry.register(registration.type_ref, descriptor));

            if let Err(error) = result {
                failures.push(error);
            }
        }

        (registry, failures)
    }

    /// Registers one descriptor under the canonical key of `type_ref`.
    pub fn register(
        &mut self,
        type_ref: TypeRef,
        descriptor: ComponentDescriptor,
    ) -> Result<(), DescriptorError> {
        let key = self.registration_key(&type_ref)?;

        debug!(type_key = %key, "Registering component descriptor.");

        self.descriptors.push(Arc::new(descriptor));
        self.by_key.insert(key, self.descriptors.len() - 1);

        Ok(())
    }

    /// Registers a collection binding for a concrete container type.
    pub fn register_collection(
        &mut self,
        type_ref: TypeRef,
        binding: CollectionBinding,
    ) -> Result<(), DescriptorError> {
        let key = type_ref.key();
        if !type_ref.is_concrete() {
            return Err(DescriptorError::UnboundTypeParameters { type_name: key });
        }

        if self.collections.contains_key(&key) {
            return Err(DescriptorError::DuplicateRegistration { type_name: key });
        }

        self.collections.insert(key, binding);
        Ok(())
    }

    fn registration_key(&self, type_ref: &TypeRef) -> Result<String, DescriptorError> {
        let key = type_ref.key();

        if !type_ref.is_concrete() {
            return Err(DescriptorError::UnboundTypeParameters { type_name: key });
        }

        if self.by_key.contains_key(&key) {
            return Err(DescriptorError::DuplicateRegistration { type_name: key });
        }

        Ok(key)
    }
}

impl TypeRegistry for StaticTypeRegistry {
    fn resolve(&self, reference: &TypeRef) -> Option<TypeHandle> {
        if !reference.is_concrete() {
            return None;
        }

        self.by_key.get(&reference.key()).copied().map(TypeHandle)
    }

    fn describe(&self, handle: TypeHandle) -> Result<Arc<ComponentDescriptor>, DescriptorError> {
        self.descriptors
            .get(handle.0)
            .cloned()
            .ok_or(DescriptorError::StaleHandle)
    }

    fn collection_binding(&self, reference: &TypeRef) -> Option<CollectionBinding> {
        match reference.name.as_str() {
            SEQUENCE if reference.parameters.is_empty() => {
                Some(CollectionBinding::builtin_sequence())
            }
            DICTIONARY if reference.parameters.is_empty() => {
                Some(CollectionBinding::builtin_dictionary())
            }
            _ => self.collections.get(&reference.key()).cloned(),
        }
    }
}
