use ferrous_container::{AutoWire, Constructor, Container, DiError, PlanCache, Property, ReuseScope};
use std::sync::Arc;

struct Clock {
    now: u64,
}

struct Metrics;

struct Repository {
    clock: Arc<Clock>,
}

impl AutoWire for Repository {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|args| Ok(Repository { clock: args.next()? })).param::<Arc<Clock>>()]
    }
}

struct Handler {
    repository: Arc<Repository>,
    clock: Option<Arc<Clock>>,
    metrics: Option<Arc<Metrics>>,
    label: Option<String>,
    built_with: usize,
}

impl AutoWire for Handler {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new(|args| {
                Ok(Handler {
                    repository: args.next()?,
                    clock: None,
                    metrics: None,
                    label: None,
                    built_with: 1,
                })
            })
            .param::<Arc<Repository>>(),
            Constructor::new(|args| {
                Ok(Handler {
                    repository: args.next()?,
                    clock: Some(args.next()?),
                    metrics: None,
                    label: None,
                    built_with: 2,
                })
            })
            .param::<Arc<Repository>>()
            .param::<Arc<Clock>>(),
        ]
    }

    fn properties() -> Vec<Property<Self>> {
        vec![
            Property::new("metrics", |h: &mut Handler| &mut h.metrics),
            Property::new("label", |h: &mut Handler| &mut h.label),
        ]
    }
}

#[test]
fn test_autowire_uses_widest_constructor() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 7 })).unwrap();
    container.register_auto_wired::<Repository>().unwrap();
    container.register_auto_wired::<Handler>().unwrap();

    let handler = container.resolve::<Arc<Handler>>().unwrap();
    assert_eq!(handler.built_with, 2);
    assert_eq!(handler.repository.clock.now, 7);
    assert!(Arc::ptr_eq(handler.clock.as_ref().unwrap(), &handler.repository.clock));
}

#[test]
fn test_autowire_injects_resolvable_properties() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 1 })).unwrap();
    container.register(|_| Arc::new(Metrics)).unwrap();
    container.register(|_| "ignored".to_string()).unwrap();
    container.register_auto_wired::<Repository>().unwrap();
    container.register_auto_wired::<Handler>().unwrap();

    let handler = container.resolve::<Arc<Handler>>().unwrap();
    assert!(handler.metrics.is_some());
    // String properties are never injected
    assert!(handler.label.is_none());
}

#[test]
fn test_autowire_leaves_unresolved_properties_alone() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 1 })).unwrap();
    container.register_auto_wired::<Repository>().unwrap();
    container.register_auto_wired::<Handler>().unwrap();

    let handler = container.resolve::<Arc<Handler>>().unwrap();
    assert!(handler.metrics.is_none());
}

#[test]
fn test_autowire_missing_constructor_dependency_fails() {
    let container = Container::new();
    container.register_auto_wired::<Repository>().unwrap();

    match container.resolve::<Arc<Repository>>() {
        Err(DiError::MissingRegistration { service, .. }) => {
            assert_eq!(service, std::any::type_name::<Arc<Clock>>());
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_autowired_registration_honours_reuse() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 1 })).unwrap();
    container
        .register_auto_wired::<Repository>()
        .unwrap()
        .reused_within(ReuseScope::None);

    let a = container.resolve::<Arc<Repository>>().unwrap();
    let b = container.resolve::<Arc<Repository>>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.clock, &b.clock));
}

struct NoConstructors;

impl AutoWire for NoConstructors {
    fn constructors() -> Vec<Constructor<Self>> {
        Vec::new()
    }
}

#[test]
fn test_type_without_constructors_fails_at_registration() {
    let container = Container::new();
    match container.register_auto_wired::<NoConstructors>() {
        Err(DiError::Construction(name)) => assert!(name.ends_with("NoConstructors")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!container.exists::<Arc<NoConstructors>>());
}

trait Store: Send + Sync {
    fn now(&self) -> u64;
}

impl Store for Repository {
    fn now(&self) -> u64 {
        self.clock.now
    }
}

#[test]
fn test_register_auto_wired_as_trait_object() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 99 })).unwrap();
    container
        .register_auto_wired_as::<Repository, Arc<dyn Store>>(|r| r as Arc<dyn Store>)
        .unwrap();

    let store = container.resolve::<Arc<dyn Store>>().unwrap();
    assert_eq!(store.now(), 99);
    assert!(!container.exists::<Arc<Repository>>());
}

#[test]
fn test_auto_wire_fills_only_unset_properties() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 3 })).unwrap();
    container.register(|_| Arc::new(Metrics)).unwrap();

    let explicit = Arc::new(Metrics);
    let mut preset = Handler {
        repository: Arc::new(Repository { clock: Arc::new(Clock { now: 0 }) }),
        clock: None,
        metrics: Some(explicit.clone()),
        label: None,
        built_with: 0,
    };
    assert_eq!(container.auto_wire(&mut preset).unwrap(), 0);
    assert!(Arc::ptr_eq(preset.metrics.as_ref().unwrap(), &explicit));

    let mut empty = Handler { metrics: None, ..preset };
    assert_eq!(container.auto_wire(&mut empty).unwrap(), 1);
    let injected = empty.metrics.clone().unwrap();

    // Idempotent: a second pass assigns nothing
    assert_eq!(container.auto_wire(&mut empty).unwrap(), 0);
    assert!(Arc::ptr_eq(empty.metrics.as_ref().unwrap(), &injected));
}

#[test]
fn test_plans_are_cached_globally() {
    let container = Container::new();
    container.register(|_| Arc::new(Clock { now: 1 })).unwrap();
    container.register_auto_wired::<Repository>().unwrap();
    assert_eq!(container.resolve::<Arc<Repository>>().unwrap().clock.now, 1);

    let other = Container::new();
    other.register(|_| Arc::new(Clock { now: 2 })).unwrap();
    other.register_auto_wired::<Repository>().unwrap();
    assert_eq!(other.resolve::<Arc<Repository>>().unwrap().clock.now, 2);
    assert!(!PlanCache::global().is_empty());
}
