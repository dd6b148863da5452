//! Disposal traits for resource cleanup.

use std::sync::Arc;

use crate::error::DisposeError;

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g., flushing caches,
/// closing connections). A registration opts in with
/// [`Registration::disposable`](crate::Registration::disposable); container-owned instances
/// of such registrations are disposed in LIFO order by [`Container::dispose`](crate::Container::dispose).
///
/// Errors are not swallowed: the first failing hook aborts `dispose()` and is
/// returned to its caller.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Container, Dispose, DisposeError};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), DisposeError> {
///         self.flushed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container
///     .register(|_| Arc::new(Cache { flushed: AtomicBool::new(false) }))
///     .unwrap()
///     .disposable();
///
/// let cache = container.resolve::<Arc<Cache>>().unwrap();
/// container.dispose().unwrap();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> Result<(), DisposeError>;
}

impl<T: Dispose + ?Sized> Dispose for Arc<T> {
    fn dispose(&self) -> Result<(), DisposeError> {
        (**self).dispose()
    }
}

impl<T: Dispose + ?Sized> Dispose for Box<T> {
    fn dispose(&self) -> Result<(), DisposeError> {
        (**self).dispose()
    }
}
