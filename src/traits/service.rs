/// Marker for values the container can hand out.
///
/// A service is a cheap-to-clone handle: resolutions return clones of the cached
/// value, so shared services are registered as `Arc<T>` or `Arc<dyn Trait>` and
/// "the same instance" means `Arc::ptr_eq` holds between two resolutions.
///
/// Implemented automatically for every `Clone + Send + Sync + 'static` type.
pub trait Service: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Service for T {}
