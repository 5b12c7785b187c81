//! The finalised index of constructed instances.
//!
//! A [Container] is mutated exclusively by the assembler during the assembly
//! pass and is read-only afterwards: lookups by identifier, by symbolic name
//! and by URI scheme, plus enumeration in assembly order. Lookups return
//! type-erased handles; callers discriminate with the typed getters or their
//! own downcasts.

use crate::factory::FactoryPtr;
use crate::instance::{downcast_instance, InstancePtr};
use crate::model::PartId;
use fxhash::FxHashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Container {
    instances: FxHashMap<PartId, InstancePtr>,
    order: Vec<PartId>,
    names: FxHashMap<String, PartId>,
    factories: FxHashMap<String, FactoryPtr>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("order", &self.order)
            .field("names", &self.names)
            .field("instance_count", &self.instances.len())
            .field("factory_count", &self.factories.len())
            .finish()
    }
}

impl Container {
    pub(crate) fn insert(&mut self, id: PartId, name: Option<&str>, instance: InstancePtr) {
        debug_assert!(!self.instances.contains_key(&id));

        self.instances.insert(id, instance);
        self.order.push(id);

        if let Some(name) = name {
            self.names.insert(name.to_string(), id);
        }
    }

    pub(crate) fn insert_factory(&mut self, scheme: &str, factory: FactoryPtr) {
        self.factories.insert(scheme.to_string(), factory);
    }

    pub fn get(&self, id: PartId) -> Option<&InstancePtr> {
        self.instances.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&InstancePtr> {
        self.names.get(name).and_then(|id| self.instances.get(id))
    }

    /// Typed lookup by identifier; `None` when the part is absent or of
    /// another type.
    pub fn get_as<T: Send + Sync + 'static>(&self, id: PartId) -> Option<Arc<T>> {
        self.get(id).and_then(downcast_instance::<T>)
    }

    /// Typed lookup by symbolic name.
    pub fn get_by_name_as<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.get_by_name(name).and_then(downcast_instance::<T>)
    }

    /// The factory registered for a URI scheme.
    pub fn factory(&self, scheme: &str) -> Option<&FactoryPtr> {
        self.factories.get(scheme)
    }

    pub fn contains(&self, id: PartId) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Identifiers and instances in assembly order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, &InstancePtr)> {
        self.order.iter().map(|id| (*id, &self.instances[id]))
    }

    pub fn ids(&self) -> impl Iterator<Item = PartId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::container::Container;
    use crate::error::ErrorPtr;
    use crate::factory::{FactoryPtr, ObjectFactory};
    use crate::instance::{instance_of, InstancePtr};
    use crate::model::{PartId, Uri};
    use std::sync::Arc;

    #[test]
    fn should_index_by_id_and_name() {
        let mut container = Container::default();
        let id = PartId::random();
        container.insert(id, Some("answer"), instance_of(42i32));

        assert!(container.contains(id));
        assert_eq!(*container.get_as::<i32>(id).unwrap(), 42);
        assert_eq!(*container.get_by_name_as::<i32>("answer").unwrap(), 42);
        assert!(container.get_as::<String>(id).is_none());
        assert!(container.get_by_name("other").is_none());
    }

    #[test]
    fn should_enumerate_in_assembly_order() {
        let mut container = Container::default();
        let first = PartId::random();
        let second = PartId::random();
        container.insert(first, None, instance_of(1i32));
        container.insert(second, None, instance_of(2i32));

        let ids: Vec<PartId> = container.ids().collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn should_index_factories_by_scheme() {
        struct NullFactory;

        impl ObjectFactory for NullFactory {
            fn produce(&self, _uri: &Uri) -> Result<Option<InstancePtr>, ErrorPtr> {
                Ok(None)
            }
        }

        let mut container = Container::default();
        container.insert_factory("test", Arc::new(NullFactory) as FactoryPtr);

        assert!(container.factory("test").is_some());
        assert!(container.factory("other").is_none());
    }
}
