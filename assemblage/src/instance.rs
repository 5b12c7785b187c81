//! Type-erased instance plumbing shared by descriptors, the assembler and the
//! [Container](crate::container::Container).
//!
//! Constructed parts are stored behind [InstancePtr], which hides the concrete
//! host type from the engine. Hosts get their types back through the typed
//! accessors on the container or by downcasting inside their own constructor
//! closures with the helpers below.

use crate::error::ErrorPtr;
use std::any::Any;
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Shared pointer to a constructed, type-erased part instance.
pub type InstancePtr = Arc<dyn Any + Send + Sync>;

/// A freshly constructed instance which has not yet been shared. Property
/// setters and the properties-set notification run against this form, before
/// the instance is frozen into an [InstancePtr].
pub type BoxedInstance = Box<dyn Any + Send + Sync>;

/// Error raised when a value stored behind an [InstancePtr] is not of the
/// requested type.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("instance is not of the requested type: {expected}")]
pub struct InstanceTypeError {
    /// Name of the type the caller asked for.
    pub expected: &'static str,
}

/// Wraps a host value into the engine's shared instance representation.
pub fn instance_of<T: Send + Sync + 'static>(value: T) -> InstancePtr {
    Arc::new(value) as InstancePtr
}

/// Downcasts a shared instance to a concrete host type, cloning the pointer.
pub fn downcast_instance<T: Send + Sync + 'static>(instance: &InstancePtr) -> Option<Arc<T>> {
    instance.clone().downcast::<T>().ok()
}

/// Extracts the feature value at `index` from the slice a constructor closure
/// receives, downcast to the host type. Intended for required features, where
/// the assembler guarantees the slot is filled.
pub fn feature<T: Send + Sync + 'static>(
    values: &[Option<InstancePtr>],
    index: usize,
) -> Result<Arc<T>, ErrorPtr> {
    optional_feature(values, index)?.ok_or_else(|| {
        convert_error(InstanceTypeError {
            expected: std::any::type_name::<T>(),
        })
    })
}

/// Extracts an optional feature value at `index`, downcast to the host type.
/// An unfilled slot yields `Ok(None)`; a filled slot of the wrong type is an
/// error.
pub fn optional_feature<T: Send + Sync + 'static>(
    values: &[Option<InstancePtr>],
    index: usize,
) -> Result<Option<Arc<T>>, ErrorPtr> {
    match values.get(index).and_then(|value| value.as_ref()) {
        Some(value) => downcast_instance::<T>(value).map(Some).ok_or_else(|| {
            convert_error(InstanceTypeError {
                expected: std::any::type_name::<T>(),
            })
        }),
        None => Ok(None),
    }
}

/// Like [feature], but clones the value out of the shared pointer. Convenient
/// for scalar features produced by constants or factories.
pub fn scalar_feature<T: Clone + Send + Sync + 'static>(
    values: &[Option<InstancePtr>],
    index: usize,
) -> Result<T, ErrorPtr> {
    feature::<T>(values, index).map(|value| (*value).clone())
}

/// Converts any host error into the engine's shared error pointer.
pub fn convert_error<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

/// Creates an [ErrorPtr] from a plain message, for hosts without a dedicated
/// error type.
pub fn error_message<M: Display>(message: M) -> ErrorPtr {
    #[derive(Error, Debug)]
    #[error("{0}")]
    struct Message(String);

    Arc::new(Message(message.to_string())) as ErrorPtr
}

#[cfg(test)]
mod tests {
    use crate::instance::{
        downcast_instance, feature, instance_of, optional_feature, scalar_feature, InstancePtr,
    };

    #[test]
    fn should_downcast_instance() {
        let instance = instance_of(42i32);

        assert_eq!(*downcast_instance::<i32>(&instance).unwrap(), 42);
        assert!(downcast_instance::<u32>(&instance).is_none());
    }

    #[test]
    fn should_extract_features() {
        let values: Vec<Option<InstancePtr>> = vec![Some(instance_of("text".to_string())), None];

        assert_eq!(*feature::<String>(&values, 0).unwrap(), "text");
        assert_eq!(scalar_feature::<String>(&values, 0).unwrap(), "text");
        assert!(optional_feature::<String>(&values, 1).unwrap().is_none());
        assert!(feature::<String>(&values, 1).is_err());
        assert!(feature::<i32>(&values, 0).is_err());
    }
}
