//! The consumed factory interface: parts with a factory role produce objects
//! on demand for URIs under their declared scheme.

use crate::error::ErrorPtr;
use crate::instance::InstancePtr;
use crate::model::Uri;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// Produces objects for URIs under one scheme.
///
/// The engine treats factories as synchronous black boxes. The same URI must
/// produce functionally equivalent objects across calls. Returning `Ok(None)`
/// means "no value for this URI": permissible for optional slots, an error
/// for required ones.
#[cfg_attr(test, automock)]
pub trait ObjectFactory {
    fn produce(&self, uri: &Uri) -> Result<Option<InstancePtr>, ErrorPtr>;
}

/// Shared handle to a factory, as stored in the container's scheme index.
pub type FactoryPtr = Arc<dyn ObjectFactory + Send + Sync>;
