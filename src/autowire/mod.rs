//! Constructor and property autowiring.
//!
//! A type opts in by implementing [`AutoWire`], describing its constructors
//! and its optional dependencies. The description is compiled once per type
//! into a plan (cached in [`PlanCache`]) that registered factories reuse.

use std::any::{type_name, Any, TypeId};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::registration::Registration;
use crate::traits::Service;

pub mod cache;
pub use cache::PlanCache;

/// Describes how the container builds and fills in a type.
///
/// # Examples
///
/// ```
/// use ferrous_container::{AutoWire, Constructor, Container, Property};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Metrics;
///
/// struct Scheduler {
///     clock: Arc<Clock>,
///     metrics: Option<Arc<Metrics>>,
/// }
///
/// impl AutoWire for Scheduler {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(|args| {
///             Ok(Scheduler { clock: args.next()?, metrics: None })
///         })
///         .param::<Arc<Clock>>()]
///     }
///
///     fn properties() -> Vec<Property<Self>> {
///         vec![Property::new("metrics", |s: &mut Scheduler| &mut s.metrics)]
///     }
/// }
///
/// let container = Container::new();
/// container.register(|_| Arc::new(Clock)).unwrap();
/// container.register_auto_wired::<Scheduler>().unwrap();
///
/// let scheduler = container.resolve::<Arc<Scheduler>>().unwrap();
/// assert!(scheduler.metrics.is_none());
/// ```
pub trait AutoWire: Sized + Send + Sync + 'static {
    /// Public constructors, in declaration order.
    fn constructors() -> Vec<Constructor<Self>>;

    /// Optional dependencies assigned after construction.
    fn properties() -> Vec<Property<Self>> {
        Vec::new()
    }
}

type BoxedArg = Box<dyn Any + Send>;
type Build<T> = Arc<dyn Fn(&mut Arguments) -> DiResult<T> + Send + Sync>;

#[derive(Clone, Copy)]
struct Param {
    type_name: &'static str,
    resolve: fn(&Container) -> DiResult<BoxedArg>,
}

fn resolve_param<D: Service>(container: &Container) -> DiResult<BoxedArg> {
    Ok(Box::new(container.resolve::<D>()?))
}

/// One constructor of an autowired type.
///
/// Parameters are declared with [`param`](Constructor::param) and resolved
/// from the container, in order, before `build` runs.
pub struct Constructor<T> {
    params: SmallVec<[Param; 4]>,
    build: Build<T>,
}

impl<T: 'static> Constructor<T> {
    /// Constructor built by `build` from its resolved parameters, in declaration order.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&mut Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        Self { params: SmallVec::new(), build: Arc::new(build) }
    }

    /// Appends a parameter resolved as `D`.
    pub fn param<D: Service>(mut self) -> Self {
        self.params.push(Param { type_name: type_name::<D>(), resolve: resolve_param::<D> });
        self
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Type names of the parameters, in order.
    pub fn parameter_types(&self) -> Vec<&'static str> {
        self.params.iter().map(|p| p.type_name).collect()
    }

    fn invoke(&self, container: &Container) -> DiResult<T> {
        let mut values = VecDeque::with_capacity(self.params.len());
        for param in &self.params {
            values.push_back((param.resolve)(container)?);
        }
        (self.build)(&mut Arguments { values })
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<_> = self.params.iter().map(|p| p.type_name).collect();
        f.debug_struct("Constructor").field("params", &params).finish()
    }
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    values: VecDeque<BoxedArg>,
}

impl Arguments {
    /// Takes the next argument.
    ///
    /// Fails with [`DiError::TypeMismatch`] when the arguments run out or the
    /// next one is not a `D`.
    #[allow(clippy::should_implement_trait)]
    pub fn next<D: 'static>(&mut self) -> DiResult<D> {
        let value = self
            .values
            .pop_front()
            .ok_or(DiError::TypeMismatch(type_name::<D>()))?;
        value
            .downcast::<D>()
            .map(|value| *value)
            .map_err(|_| DiError::TypeMismatch(type_name::<D>()))
    }

    /// Arguments not yet taken.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

type Inject<T> = Arc<dyn Fn(&mut T, &Container, bool) -> bool + Send + Sync>;

/// An optional dependency assigned after construction.
pub struct Property<T> {
    name: &'static str,
    type_name: &'static str,
    skipped: bool,
    inject: Inject<T>,
}

impl<T: 'static> Property<T> {
    /// Describes the `Option<D>` field reached through `access`.
    ///
    /// Properties of string types are never injected.
    pub fn new<D: Service>(name: &'static str, access: fn(&mut T) -> &mut Option<D>) -> Self {
        let inject: Inject<T> = Arc::new(move |target: &mut T, container: &Container, only_if_absent: bool| {
            let slot = access(target);
            if only_if_absent && slot.is_some() {
                return false;
            }
            match container.try_resolve::<D>() {
                Some(value) => {
                    *slot = Some(value);
                    true
                }
                None => false,
            }
        });
        Self {
            name,
            type_name: type_name::<D>(),
            skipped: is_string_type::<D>(),
            inject,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the property is ignored because it holds a string.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("skipped", &self.skipped)
            .finish()
    }
}

fn is_string_type<D: 'static>() -> bool {
    let id = TypeId::of::<D>();
    id == TypeId::of::<String>()
        || id == TypeId::of::<&'static str>()
        || id == TypeId::of::<Arc<str>>()
        || id == TypeId::of::<Box<str>>()
}

/// Compiled construction recipe for one type.
pub(crate) struct Plan<T> {
    constructor: Constructor<T>,
    properties: Vec<Property<T>>,
}

impl<T: AutoWire> Plan<T> {
    pub(crate) fn compile() -> DiResult<Self> {
        // Strictly greater keeps the first declared on ties
        let mut selected: Option<Constructor<T>> = None;
        for candidate in T::constructors() {
            if selected.as_ref().map_or(true, |best| candidate.arity() > best.arity()) {
                selected = Some(candidate);
            }
        }
        let constructor = selected.ok_or(DiError::Construction(type_name::<T>()))?;
        let properties: Vec<_> = T::properties().into_iter().filter(|p| !p.skipped).collect();

        tracing::debug!(
            target_type = type_name::<T>(),
            params = ?constructor.parameter_types(),
            properties = properties.len(),
            "compiled autowire plan"
        );
        Ok(Self { constructor, properties })
    }

    pub(crate) fn build(&self, container: &Container) -> DiResult<T> {
        let mut instance = self.constructor.invoke(container)?;
        self.inject(&mut instance, container, false);
        Ok(instance)
    }

    /// Returns how many properties were assigned.
    pub(crate) fn inject(&self, target: &mut T, container: &Container, only_if_absent: bool) -> usize {
        self.properties
            .iter()
            .filter(|property| (property.inject)(target, container, only_if_absent))
            .count()
    }
}

impl Container {
    /// Registers `Arc<T>`, built through its widest constructor.
    ///
    /// Fails with [`DiError::Construction`] when `T` describes no constructor.
    pub fn register_auto_wired<T: AutoWire>(&self) -> DiResult<Registration<Arc<T>>> {
        let plan = PlanCache::global().get_or_compile::<T>()?;
        self.register_fallible(move |c| plan.build(c).map(Arc::new))
    }

    /// Registers an autowired `T` under the service type `TAs`.
    ///
    /// `cast` converts the built instance, typically `|t| t as Arc<dyn Trait>`.
    ///
    /// ```
    /// use ferrous_container::{AutoWire, Constructor, Container};
    /// use std::sync::Arc;
    ///
    /// trait Greeter: Send + Sync {
    ///     fn greet(&self) -> String;
    /// }
    ///
    /// struct English;
    ///
    /// impl Greeter for English {
    ///     fn greet(&self) -> String {
    ///         "hello".to_string()
    ///     }
    /// }
    ///
    /// impl AutoWire for English {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new(|_| Ok(English))]
    ///     }
    /// }
    ///
    /// let container = Container::new();
    /// container
    ///     .register_auto_wired_as::<English, Arc<dyn Greeter>>(|t| t as Arc<dyn Greeter>)
    ///     .unwrap();
    /// assert_eq!(container.resolve::<Arc<dyn Greeter>>().unwrap().greet(), "hello");
    /// ```
    pub fn register_auto_wired_as<T: AutoWire, TAs: Service>(
        &self,
        cast: fn(Arc<T>) -> TAs,
    ) -> DiResult<Registration<TAs>> {
        let plan = PlanCache::global().get_or_compile::<T>()?;
        self.register_fallible(move |c| plan.build(c).map(|built| cast(Arc::new(built))))
    }

    /// Fills in the unset properties of an existing instance.
    ///
    /// Properties that already hold a value are left alone, so calling this
    /// repeatedly is harmless. Returns how many properties were assigned.
    pub fn auto_wire<T: AutoWire>(&self, instance: &mut T) -> DiResult<usize> {
        let plan = PlanCache::global().get_or_compile::<T>()?;
        Ok(plan.inject(instance, self, true))
    }
}
