//! Fallback resolution through a foreign container.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// Object-safe bridge to another IoC container.
///
/// When a [`Container`](crate::Container) has an adapter installed, unnamed
/// zero-argument lookups that the hierarchy cannot satisfy are offered to the
/// adapter (or offered to it first, see
/// [`Container::set_check_adapter_first`](crate::Container::set_check_adapter_first)).
///
/// The returned value must hold exactly the requested service type `T`
/// (`Arc::new(value) as Arc<dyn Any + Send + Sync>`); anything else is treated
/// as "not found". Adapter-supplied values are not cached, tracked for disposal
/// or initialized by the container.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Container, ContainerAdapter};
/// use std::any::{Any, TypeId};
/// use std::sync::Arc;
///
/// struct Fallback;
///
/// impl ContainerAdapter for Fallback {
///     fn try_resolve(&self, service: TypeId, _type_name: &'static str) -> Option<Arc<dyn Any + Send + Sync>> {
///         if service == TypeId::of::<u16>() {
///             Some(Arc::new(8080u16))
///         } else {
///             None
///         }
///     }
/// }
///
/// let container = Container::new();
/// container.set_adapter(Arc::new(Fallback));
/// assert_eq!(container.resolve::<u16>().unwrap(), 8080);
/// ```
pub trait ContainerAdapter: Send + Sync {
    /// Returns the service for `service`, or `None` if the adapter cannot supply it.
    fn try_resolve(&self, service: TypeId, type_name: &'static str) -> Option<Arc<dyn Any + Send + Sync>>;
}
