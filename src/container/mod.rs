//! Hierarchical service container.
//!
//! This module contains the [`Container`] type: registration, resolution,
//! child containers and disposal all go through it.

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::ContainerConfig;
use crate::error::{DiError, DiResult};
use crate::internal::{DisposeBag, DisposeHook, ResolutionGuard};
use crate::key::ServiceKey;
use crate::lifetime::{Owner, ReuseScope};
use crate::registration::{Disposer, Factory, Registration, Registry, ServiceEntry};
use crate::traits::{ContainerAdapter, Service};

pub(crate) mod request;
pub use request::RequestScope;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Hierarchical dependency injection container.
///
/// A container maps service keys (type, factory argument shape, optional
/// name) to factories plus a reuse policy. Lookups that miss walk up to the
/// parent container; child containers are created with
/// [`create_child_container`](Container::create_child_container).
///
/// `Container` is a cheap handle: clones refer to the same container.
/// A child keeps its parent alive, so a child handle can outlive every handle
/// to the root and still see inherited registrations. Parents also hold their
/// children until [`dispose`](Container::dispose) releases them; dispose the
/// root once the tree is no longer needed.
///
/// # Thread Safety
///
/// Every operation is memory safe from any thread. The intended usage is
/// still to register everything up front, then share the container for
/// resolution: a registration that races with a resolution of the same key
/// may or may not be observed by it. When two threads materialize the same
/// shared instance at once, both factories run; the first stored instance
/// wins and is the only one initialized and tracked for disposal.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Container, ReuseScope};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container.register(|_| Arc::new(Database { url: "postgres://localhost".to_string() })).unwrap();
/// container
///     .register_fallible(|c| Ok(Arc::new(UserService { db: c.resolve()? })))
///     .unwrap()
///     .reused_within(ReuseScope::None);
///
/// let users = container.resolve::<Arc<UserService>>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    id: u64,
    services: RwLock<Registry>,
    disposables: Mutex<DisposeBag>,
    children: Mutex<Vec<Container>>,
    parent: Option<Arc<ContainerInner>>,
    settings: RwLock<ContainerConfig>,
    adapter: RwLock<Option<Arc<dyn ContainerAdapter>>>,
}

impl ContainerInner {
    fn new(
        settings: ContainerConfig,
        parent: Option<Arc<ContainerInner>>,
        adapter: Option<Arc<dyn ContainerAdapter>>,
    ) -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            services: RwLock::new(Registry::default()),
            disposables: Mutex::new(DisposeBag::default()),
            children: Mutex::new(Vec::new()),
            parent,
            settings: RwLock::new(settings),
            adapter: RwLock::new(adapter),
        }
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let bag = self.disposables.get_mut();
        if !bag.is_empty() {
            tracing::warn!(
                container = self.id,
                pending = bag.len(),
                "container dropped with undisposed instances; call dispose() first"
            );
        }
    }
}

impl Container {
    /// Creates a root container with default settings.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Creates a root container with the given defaults.
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::from_inner(Arc::new(ContainerInner::new(config, None, None)))
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    /// Process-unique id of this container.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Parent container, `None` for a root.
    pub fn parent(&self) -> Option<Container> {
        self.inner.parent.clone().map(Self::from_inner)
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current settings of this container.
    pub fn config(&self) -> ContainerConfig {
        *self.inner.settings.read()
    }

    /// Reuse scope new registrations get when none is set.
    pub fn default_reuse(&self) -> ReuseScope {
        self.inner.settings.read().default_reuse
    }

    /// Reuse scope given to registrations made after this call.
    pub fn set_default_reuse(&self, reuse: ReuseScope) {
        self.inner.settings.write().default_reuse = reuse;
    }

    /// Owner new registrations get when none is set.
    pub fn default_owner(&self) -> Owner {
        self.inner.settings.read().default_owner
    }

    /// Owner given to registrations made after this call.
    pub fn set_default_owner(&self, owner: Owner) {
        self.inner.settings.write().default_owner = owner;
    }

    /// Installs a fallback container consulted for unnamed, zero-argument lookups.
    ///
    /// Child containers created afterwards inherit the adapter.
    pub fn set_adapter(&self, adapter: Arc<dyn ContainerAdapter>) {
        *self.inner.adapter.write() = Some(adapter);
    }

    /// Removes the fallback adapter from this container.
    pub fn clear_adapter(&self) {
        *self.inner.adapter.write() = None;
    }

    /// When set, the adapter is asked before the container hierarchy.
    pub fn set_check_adapter_first(&self, first: bool) {
        self.inner.settings.write().check_adapter_first = first;
    }

    /// Number of registrations held directly by this container.
    pub fn registration_count(&self) -> usize {
        self.inner.services.read().len()
    }

    /// Number of instances waiting to be disposed by this container.
    pub fn pending_disposals(&self) -> usize {
        self.inner.disposables.lock().len()
    }

    /// Number of child containers not yet released by `dispose`.
    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    // ----- Registration -----

    /// Registers a factory for `T`.
    ///
    /// Re-registering the same key replaces the previous registration.
    pub fn register<T, F>(&self, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.register_impl::<T, ()>(None, Arc::new(move |c: &Container, _: ()| Ok(factory(c))))
    }

    /// Registers a factory for `T` under `name`.
    pub fn register_named<T, F>(&self, name: &str, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.register_impl::<T, ()>(
            Some(name),
            Arc::new(move |c: &Container, _: ()| Ok(factory(c))),
        )
    }

    /// Registers a factory that may fail, typically because it resolves dependencies.
    pub fn register_fallible<T, F>(&self, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
    {
        self.register_impl::<T, ()>(None, Arc::new(move |c: &Container, _: ()| factory(c)))
    }

    /// Registers a fallible factory for `T` under `name`.
    pub fn register_named_fallible<T, F>(&self, name: &str, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
    {
        self.register_impl::<T, ()>(Some(name), Arc::new(move |c: &Container, _: ()| factory(c)))
    }

    /// Registers a factory taking caller-supplied arguments.
    ///
    /// `A` is the argument shape: a single value, or a tuple for several.
    /// Lookups must use the same shape through
    /// [`resolve_with`](Container::resolve_with).
    ///
    /// ```
    /// use ferrous_container::{Container, ReuseScope};
    ///
    /// let container = Container::new();
    /// container
    ///     .register_with(|_, (host, port): (String, u16)| Ok(format!("{}:{}", host, port)))
    ///     .unwrap()
    ///     .reused_within(ReuseScope::None);
    ///
    /// let addr: String = container.resolve_with(("localhost".to_string(), 80u16)).unwrap();
    /// assert_eq!(addr, "localhost:80");
    /// ```
    pub fn register_with<T, A, F>(&self, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        A: 'static,
        F: Fn(&Container, A) -> DiResult<T> + Send + Sync + 'static,
    {
        self.register_impl::<T, A>(None, Arc::new(factory))
    }

    /// Registers an argument-taking factory for `T` under `name`.
    pub fn register_named_with<T, A, F>(&self, name: &str, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        A: 'static,
        F: Fn(&Container, A) -> DiResult<T> + Send + Sync + 'static,
    {
        self.register_impl::<T, A>(Some(name), Arc::new(factory))
    }

    /// Registers an existing value.
    ///
    /// The value is shared across the hierarchy and never disposed by the container.
    pub fn register_instance<T: Service>(&self, instance: T) -> DiResult<()> {
        self.register_instance_impl(None, instance)
    }

    /// Registers an existing value under `name`.
    pub fn register_named_instance<T: Service>(&self, name: &str, instance: T) -> DiResult<()> {
        self.register_instance_impl(Some(name), instance)
    }

    /// Registers `factory` as a hierarchy-wide singleton.
    pub fn add_singleton<T, F>(&self, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Ok(self.register(factory)?.reused_within(ReuseScope::Hierarchy))
    }

    /// Registers `factory` so every resolution builds a new instance.
    pub fn add_transient<T, F>(&self, factory: F) -> DiResult<Registration<T>>
    where
        T: Service,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Ok(self.register(factory)?.reused_within(ReuseScope::None))
    }

    fn register_instance_impl<T: Service>(&self, name: Option<&str>, instance: T) -> DiResult<()> {
        let seed = instance.clone();
        let registration = self
            .register_impl::<T, ()>(name, Arc::new(move |_: &Container, _: ()| Ok(instance.clone())))?
            .reused_within(ReuseScope::Hierarchy)
            .owned_by(Owner::External);
        registration.entry().seed_instance(seed);
        Ok(())
    }

    pub(crate) fn register_impl<T: Service, A: 'static>(
        &self,
        name: Option<&str>,
        factory: Factory<T, A>,
    ) -> DiResult<Registration<T>> {
        if TypeId::of::<T>() == TypeId::of::<Container>() {
            return Err(DiError::Configuration(format!(
                "{} cannot be registered as a service",
                type_name::<Container>()
            )));
        }

        let settings = self.config();
        let key = ServiceKey::of::<T, A>(name);
        let entry = Arc::new(ServiceEntry::new(
            key,
            factory,
            settings.default_reuse,
            settings.default_owner,
            &self.inner,
        ));
        let replaced = self.inner.services.write().insert(entry.clone()).is_some();

        tracing::debug!(
            container = self.id(),
            service = entry.key.display_name(),
            args = entry.key.args_name(),
            name,
            reuse = %settings.default_reuse,
            owner = %settings.default_owner,
            replaced,
            "registered service"
        );
        Ok(Registration::new(entry))
    }

    // ----- Resolution -----

    /// Resolves `T`, failing with [`DiError::MissingRegistration`] when nothing provides it.
    pub fn resolve<T: Service>(&self) -> DiResult<T> {
        self.resolve_impl::<T, ()>(None, ())
    }

    /// Resolves the registration for `T` named `name`.
    pub fn resolve_named<T: Service>(&self, name: &str) -> DiResult<T> {
        self.resolve_impl::<T, ()>(Some(name), ())
    }

    /// Resolves `T` from a factory registered with argument shape `A`.
    pub fn resolve_with<T: Service, A: 'static>(&self, args: A) -> DiResult<T> {
        self.resolve_impl::<T, A>(None, args)
    }

    /// Resolves the named registration for `T` taking arguments of shape `A`.
    pub fn resolve_named_with<T: Service, A: 'static>(&self, name: &str, args: A) -> DiResult<T> {
        self.resolve_impl::<T, A>(Some(name), args)
    }

    /// Resolves `T`, returning `None` instead of an error.
    ///
    /// Factory failures are logged and reported as `None`.
    pub fn try_resolve<T: Service>(&self) -> Option<T> {
        self.try_resolve_impl::<T, ()>(None, ())
    }

    /// Like [`resolve_named`](Container::resolve_named), returning `None` on failure.
    pub fn try_resolve_named<T: Service>(&self, name: &str) -> Option<T> {
        self.try_resolve_impl::<T, ()>(Some(name), ())
    }

    /// Like [`resolve_with`](Container::resolve_with), returning `None` on failure.
    pub fn try_resolve_with<T: Service, A: 'static>(&self, args: A) -> Option<T> {
        self.try_resolve_impl::<T, A>(None, args)
    }

    /// Like [`resolve_named_with`](Container::resolve_named_with), returning `None` on failure.
    pub fn try_resolve_named_with<T: Service, A: 'static>(&self, name: &str, args: A) -> Option<T> {
        self.try_resolve_impl::<T, A>(Some(name), args)
    }

    /// Returns a resolver for `T` to call later.
    ///
    /// The registration must already exist; the service itself is only built
    /// when the returned function is called.
    ///
    /// ```
    /// use ferrous_container::Container;
    /// use std::sync::Arc;
    ///
    /// let container = Container::new();
    /// assert!(container.lazy_resolve::<Arc<String>>().is_err());
    ///
    /// container.register(|_| Arc::new("ready".to_string())).unwrap();
    /// let later = container.lazy_resolve::<Arc<String>>().unwrap();
    /// assert_eq!(later().unwrap().as_str(), "ready");
    /// ```
    pub fn lazy_resolve<T: Service>(
        &self,
    ) -> DiResult<impl Fn() -> DiResult<T> + Send + Sync + 'static> {
        self.ensure_registered::<T, ()>(None)?;
        let container = self.clone();
        Ok(move || container.resolve::<T>())
    }

    /// Returns a resolver for the registration of `T` named `name`.
    pub fn lazy_resolve_named<T: Service>(
        &self,
        name: &str,
    ) -> DiResult<impl Fn() -> DiResult<T> + Send + Sync + 'static> {
        self.ensure_registered::<T, ()>(Some(name))?;
        let container = self.clone();
        let name = name.to_owned();
        Ok(move || container.resolve_named::<T>(&name))
    }

    /// Returns a resolver for `T` that takes the factory arguments when called.
    pub fn lazy_resolve_with<T: Service, A: 'static>(
        &self,
    ) -> DiResult<impl Fn(A) -> DiResult<T> + Send + Sync + 'static> {
        self.ensure_registered::<T, A>(None)?;
        let container = self.clone();
        Ok(move |args: A| container.resolve_with::<T, A>(args))
    }

    /// Returns a resolver for the named argument-taking registration of `T`.
    pub fn lazy_resolve_named_with<T: Service, A: 'static>(
        &self,
        name: &str,
    ) -> DiResult<impl Fn(A) -> DiResult<T> + Send + Sync + 'static> {
        self.ensure_registered::<T, A>(Some(name))?;
        let container = self.clone();
        let name = name.to_owned();
        Ok(move |args: A| container.resolve_named_with::<T, A>(&name, args))
    }

    /// Whether a plain registration for `T` is visible from this container.
    pub fn exists<T: 'static>(&self) -> bool {
        self.find_entry(&ServiceKey::of::<T, ()>(None)).is_some()
    }

    /// Whether a plain registration for `T` named `name` is visible.
    pub fn exists_named<T: 'static>(&self, name: &str) -> bool {
        self.find_entry(&ServiceKey::of::<T, ()>(Some(name))).is_some()
    }

    /// Whether a registration for `T` with argument shape `A` is visible.
    pub fn exists_with<T: 'static, A: 'static>(&self) -> bool {
        self.find_entry(&ServiceKey::of::<T, A>(None)).is_some()
    }

    fn ensure_registered<T: 'static, A: 'static>(&self, name: Option<&str>) -> DiResult<()> {
        match self.find_entry(&ServiceKey::of::<T, A>(name)) {
            Some(_) => Ok(()),
            None => Err(DiError::missing::<T>(name)),
        }
    }

    fn resolve_impl<T: Service, A: 'static>(&self, name: Option<&str>, args: A) -> DiResult<T> {
        tracing::trace!(container = self.id(), service = type_name::<T>(), name, "resolving service");
        if let Some(found) = self.adapter_first::<T, A>(name) {
            return Ok(found);
        }
        match self.entry_for::<T, A>(name) {
            Some(entry) => self.materialize(&entry, args),
            None => self
                .from_adapter::<T, A>(name)
                .ok_or_else(|| DiError::missing::<T>(name)),
        }
    }

    fn try_resolve_impl<T: Service, A: 'static>(&self, name: Option<&str>, args: A) -> Option<T> {
        if let Some(found) = self.adapter_first::<T, A>(name) {
            return Some(found);
        }
        let Some(entry) = self.entry_for::<T, A>(name) else {
            return self.from_adapter::<T, A>(name);
        };
        match self.materialize(&entry, args) {
            Ok(instance) => Some(instance),
            Err(error) => {
                tracing::warn!(
                    service = type_name::<T>(),
                    name,
                    %error,
                    "try_resolve ignoring failed resolution"
                );
                None
            }
        }
    }

    /// Finds the entry for `key` here or in the nearest ancestor.
    pub(crate) fn find_entry(&self, key: &ServiceKey) -> Option<Arc<ServiceEntry>> {
        if let Some(entry) = self.inner.services.read().get(key) {
            return Some(entry.clone());
        }
        let mut current = self.parent();
        while let Some(container) = current {
            if let Some(entry) = container.inner.services.read().get(key) {
                return Some(entry.clone());
            }
            current = container.parent();
        }
        None
    }

    /// Entry to materialize from this container.
    ///
    /// A `Container`-scoped entry found in an ancestor is copied into this
    /// container first, so this container gets its own instance.
    fn entry_for<T: Service, A: 'static>(&self, name: Option<&str>) -> Option<Arc<ServiceEntry>> {
        let key = ServiceKey::of::<T, A>(name);
        let entry = self.find_entry(&key)?;
        if entry.reuse() != ReuseScope::Container || entry.is_owned_by(&self.inner) {
            return Some(entry);
        }

        let local = Arc::new(entry.clone_for(&self.inner));
        let mut services = self.inner.services.write();
        // Another thread may have copied it in the meantime
        if let Some(existing) = services.get(&key) {
            return Some(existing.clone());
        }
        services.insert(local.clone());
        tracing::trace!(
            container = self.id(),
            service = key.display_name(),
            "copied container-scoped registration"
        );
        Some(local)
    }

    fn materialize<T: Service, A: 'static>(&self, entry: &Arc<ServiceEntry>, args: A) -> DiResult<T> {
        if let Some(instance) = entry.instance::<T>() {
            return Ok(instance);
        }

        let owner = entry.container()?;
        let factory = entry.factory::<T, A>()?;
        let instance = {
            let _guard = ResolutionGuard::enter(owner.id(), &entry.key)?;
            tracing::trace!(
                container = owner.id(),
                service = entry.key.display_name(),
                "invoking factory"
            );
            factory(&owner, args)?
        };

        let (instance, created) = entry.store_instance(instance);
        if !created {
            return Ok(instance);
        }

        let tracked = entry.policy.read().owner == Owner::Container;
        if tracked {
            if let Some(disposer) = entry.disposer::<T>() {
                let hook = dispose_hook(entry.key.display_name(), instance.clone(), disposer);
                if entry.reuse() == ReuseScope::Request {
                    request::track(hook);
                } else {
                    owner.inner.disposables.lock().push(hook);
                }
            }
        }
        if let Some(init) = entry.initializer::<T>() {
            init(&owner, &instance);
        }
        Ok(instance)
    }

    fn adapter_first<T: Service, A: 'static>(&self, name: Option<&str>) -> Option<T> {
        if self.inner.settings.read().check_adapter_first {
            self.from_adapter::<T, A>(name)
        } else {
            None
        }
    }

    fn from_adapter<T: Service, A: 'static>(&self, name: Option<&str>) -> Option<T> {
        if name.is_some() || TypeId::of::<A>() != TypeId::of::<()>() {
            return None;
        }
        let adapter = self.inner.adapter.read().clone()?;
        let value = adapter.try_resolve(TypeId::of::<T>(), type_name::<T>())?;
        let found = value.downcast_ref::<T>().cloned();
        if found.is_some() {
            tracing::trace!(service = type_name::<T>(), "resolved through adapter");
        }
        found
    }

    // ----- Hierarchy -----

    /// Creates a child container.
    ///
    /// The child sees every registration of its ancestors, inherits this
    /// container's defaults and adapter, and is disposed along with it.
    ///
    /// ```
    /// use ferrous_container::{Container, ReuseScope};
    /// use std::sync::Arc;
    ///
    /// struct Session;
    ///
    /// let root = Container::new();
    /// root.register(|_| Arc::new(Session)).unwrap().reused_within(ReuseScope::Container);
    ///
    /// let child = root.create_child_container();
    /// let a = root.resolve::<Arc<Session>>().unwrap();
    /// let b = child.resolve::<Arc<Session>>().unwrap();
    /// assert!(!Arc::ptr_eq(&a, &b));
    /// assert!(Arc::ptr_eq(&b, &child.resolve::<Arc<Session>>().unwrap()));
    /// ```
    pub fn create_child_container(&self) -> Container {
        let settings = self.config();
        let adapter = self.inner.adapter.read().clone();
        let child = Container::from_inner(Arc::new(ContainerInner::new(
            settings,
            Some(self.inner.clone()),
            adapter,
        )));
        self.inner.children.lock().push(child.clone());
        tracing::debug!(parent = self.id(), child = child.id(), "created child container");
        child
    }

    /// Disposes tracked instances in reverse creation order, then child containers.
    ///
    /// Stops at the first failure and returns it; anything not yet disposed
    /// stays tracked, so calling `dispose` again continues where it stopped.
    /// Disposing an already disposed container does nothing.
    pub fn dispose(&self) -> DiResult<()> {
        tracing::debug!(
            container = self.id(),
            pending = self.pending_disposals(),
            children = self.child_count(),
            "disposing container"
        );

        loop {
            let hook = self.inner.disposables.lock().pop();
            match hook {
                Some(hook) => hook()?,
                None => break,
            }
        }

        loop {
            let child = self.inner.children.lock().pop();
            let Some(child) = child else { break };
            if let Err(error) = child.dispose() {
                self.inner.children.lock().push(child);
                return Err(error);
            }
        }

        tracing::debug!(container = self.id(), "container disposed");
        Ok(())
    }
}

fn dispose_hook<T: Service>(service: &'static str, instance: T, disposer: Disposer<T>) -> DisposeHook {
    Box::new(move || disposer(&instance).map_err(|source| DiError::Dispose { service, source }))
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("registrations", &self.registration_count())
            .field("children", &self.child_count())
            .field("pending_disposals", &self.pending_disposals())
            .finish()
    }
}
