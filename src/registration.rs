//! Service registration types.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::container::request;
use crate::container::{Container, ContainerInner};
use crate::error::{DiError, DiResult, DisposeError};
use crate::key::ServiceKey;
use crate::lifetime::{Owner, ReuseScope};
use crate::traits::{Dispose, Service};

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Typed factory stored (erased) on an entry.
pub(crate) type Factory<T, A> = Arc<dyn Fn(&Container, A) -> DiResult<T> + Send + Sync>;
pub(crate) type Initializer<T> = Arc<dyn Fn(&Container, &T) + Send + Sync>;
pub(crate) type Disposer<T> = Arc<dyn Fn(&T) -> Result<(), DisposeError> + Send + Sync>;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Mutable policy of an entry, adjusted through [`Registration`].
#[derive(Clone)]
pub(crate) struct EntryPolicy {
    pub(crate) reuse: ReuseScope,
    pub(crate) owner: Owner,
    /// `Initializer<T>`
    pub(crate) initializer: Option<AnyArc>,
    /// `Disposer<T>`
    pub(crate) disposer: Option<AnyArc>,
}

/// One registration in one container.
pub(crate) struct ServiceEntry {
    pub(crate) id: u64,
    pub(crate) key: ServiceKey,
    /// `Factory<T, A>`
    factory: AnyArc,
    pub(crate) policy: RwLock<EntryPolicy>,
    container: Weak<ContainerInner>,
    instance: RwLock<Option<AnyArc>>,
}

impl ServiceEntry {
    pub(crate) fn new<T: Service, A: 'static>(
        key: ServiceKey,
        factory: Factory<T, A>,
        reuse: ReuseScope,
        owner: Owner,
        container: &Arc<ContainerInner>,
    ) -> Self {
        Self {
            id: NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed),
            key,
            factory: Arc::new(factory),
            policy: RwLock::new(EntryPolicy { reuse, owner, initializer: None, disposer: None }),
            container: Arc::downgrade(container),
            instance: RwLock::new(None),
        }
    }

    /// Same factory and policy, fresh instance slot, owned by `container`.
    pub(crate) fn clone_for(&self, container: &Arc<ContainerInner>) -> Self {
        Self {
            id: NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed),
            key: self.key.clone(),
            factory: self.factory.clone(),
            policy: RwLock::new(self.policy.read().clone()),
            container: Arc::downgrade(container),
            instance: RwLock::new(None),
        }
    }

    pub(crate) fn reuse(&self) -> ReuseScope {
        self.policy.read().reuse
    }

    pub(crate) fn is_owned_by(&self, container: &Arc<ContainerInner>) -> bool {
        std::ptr::eq(self.container.as_ptr(), Arc::as_ptr(container))
    }

    pub(crate) fn container(&self) -> DiResult<Container> {
        self.container
            .upgrade()
            .map(Container::from_inner)
            .ok_or(DiError::ContainerDropped(self.key.display_name()))
    }

    pub(crate) fn factory<T: Service, A: 'static>(&self) -> DiResult<Factory<T, A>> {
        self.factory
            .downcast_ref::<Factory<T, A>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Cached instance, looked up where the reuse scope keeps it.
    pub(crate) fn instance<T: Service>(&self) -> Option<T> {
        let stored = match self.reuse() {
            ReuseScope::None => None,
            ReuseScope::Request => request::get(self.id),
            ReuseScope::Hierarchy | ReuseScope::Container => self.instance.read().clone(),
        };
        stored.and_then(|any| any.downcast_ref::<T>().cloned())
    }

    /// Stores `value` unless another resolution got there first.
    ///
    /// Returns the instance to hand out and whether it is `value` itself.
    pub(crate) fn store_instance<T: Service>(&self, value: T) -> (T, bool) {
        let reuse = self.reuse();
        if reuse == ReuseScope::None {
            return (value, true);
        }
        let stored: AnyArc = Arc::new(value.clone());
        let winner = match reuse {
            ReuseScope::Request => request::get_or_insert(self.id, stored.clone()),
            _ => self.instance.write().get_or_insert_with(|| stored.clone()).clone(),
        };
        if Arc::ptr_eq(&winner, &stored) {
            return (value, true);
        }
        match winner.downcast_ref::<T>() {
            Some(existing) => (existing.clone(), false),
            None => (value, true),
        }
    }

    pub(crate) fn seed_instance<T: Service>(&self, value: T) {
        *self.instance.write() = Some(Arc::new(value));
    }

    pub(crate) fn initializer<T: Service>(&self) -> Option<Initializer<T>> {
        let policy = self.policy.read();
        policy.initializer.as_ref()?.downcast_ref::<Initializer<T>>().cloned()
    }

    pub(crate) fn disposer<T: Service>(&self) -> Option<Disposer<T>> {
        let policy = self.policy.read();
        policy.disposer.as_ref()?.downcast_ref::<Disposer<T>>().cloned()
    }
}

#[cfg(feature = "ahash")]
type ServiceMap = HashMap<ServiceKey, Arc<ServiceEntry>, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
type ServiceMap = HashMap<ServiceKey, Arc<ServiceEntry>>;

/// Service registry holding the registrations of one container
#[derive(Default)]
pub(crate) struct Registry {
    entries: ServiceMap,
}

impl Registry {
    /// Inserts a registration, replacing any previous one for the key
    pub(crate) fn insert(&mut self, entry: Arc<ServiceEntry>) -> Option<Arc<ServiceEntry>> {
        self.entries.insert(entry.key.clone(), entry)
    }

    #[inline]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&Arc<ServiceEntry>> {
        self.entries.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Fluent handle returned by the `register*` family.
///
/// Every method adjusts the stored entry in place, so the handle can be
/// dropped immediately or kept around; later resolutions see the change.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Container, Owner, ReuseScope};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Connection { id: usize }
///
/// let opened = Arc::new(AtomicUsize::new(0));
/// let counter = opened.clone();
///
/// let container = Container::new();
/// container
///     .register(|_| Arc::new(Connection { id: 1 }))
///     .unwrap()
///     .reused_within(ReuseScope::None)
///     .owned_by(Owner::External)
///     .initialized_by(move |_, _conn| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
///
/// container.resolve::<Arc<Connection>>().unwrap();
/// container.resolve::<Arc<Connection>>().unwrap();
/// assert_eq!(opened.load(Ordering::SeqCst), 2);
/// ```
pub struct Registration<T> {
    entry: Arc<ServiceEntry>,
    _service: PhantomData<fn() -> T>,
}

impl<T: Service> Registration<T> {
    pub(crate) fn new(entry: Arc<ServiceEntry>) -> Self {
        Self { entry, _service: PhantomData }
    }

    pub(crate) fn entry(&self) -> &Arc<ServiceEntry> {
        &self.entry
    }

    /// Sets how instances are cached.
    pub fn reused_within(self, scope: ReuseScope) -> Self {
        self.entry.policy.write().reuse = scope;
        self
    }

    /// Sets who is responsible for disposing instances.
    pub fn owned_by(self, owner: Owner) -> Self {
        self.entry.policy.write().owner = owner;
        self
    }

    /// Runs `init` with the owning container right after each new instance is built.
    pub fn initialized_by<F>(self, init: F) -> Self
    where
        F: Fn(&Container, &T) + Send + Sync + 'static,
    {
        let init: Initializer<T> = Arc::new(init);
        self.entry.policy.write().initializer = Some(Arc::new(init));
        self
    }

    /// Makes container-owned instances disposable through `dispose`.
    pub fn disposed_with<F>(self, dispose: F) -> Self
    where
        F: Fn(&T) -> Result<(), DisposeError> + Send + Sync + 'static,
    {
        let dispose: Disposer<T> = Arc::new(dispose);
        self.entry.policy.write().disposer = Some(Arc::new(dispose));
        self
    }

    /// Key the registration is stored under.
    pub fn key(&self) -> &ServiceKey {
        &self.entry.key
    }

    /// Current reuse scope of the registration.
    pub fn reuse(&self) -> ReuseScope {
        self.entry.reuse()
    }

    /// Current owner of the registration.
    pub fn owner(&self) -> Owner {
        self.entry.policy.read().owner
    }
}

impl<T: Service + Dispose> Registration<T> {
    /// Makes container-owned instances disposable through their [`Dispose`] impl.
    pub fn disposable(self) -> Self {
        self.disposed_with(|service: &T| service.dispose())
    }
}

impl<T> std::fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let policy = self.entry.policy.read();
        f.debug_struct("Registration")
            .field("key", &self.entry.key)
            .field("reuse", &policy.reuse)
            .field("owner", &policy.owner)
            .finish()
    }
}
