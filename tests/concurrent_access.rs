/// Concurrent access integration tests
///
/// The container is built up front and then shared; these tests hammer
/// resolution, child creation and the autowire plan cache from many threads.

use crossbeam_utils::thread;
use ferrous_container::{AutoWire, Constructor, Container, PlanCache, ReuseScope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

const THREADS: usize = 8;

struct Counter {
    hits: AtomicUsize,
}

#[test]
fn test_hierarchy_singleton_is_consistent_across_threads() {
    let container = Container::new();
    container
        .register(|_| Arc::new(Counter { hits: AtomicUsize::new(0) }))
        .unwrap();
    let expected = container.resolve::<Arc<Counter>>().unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                for _ in 0..100 {
                    let counter = container.resolve::<Arc<Counter>>().unwrap();
                    assert!(Arc::ptr_eq(&counter, &expected));
                    counter.hits.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(expected.hits.load(Ordering::Relaxed), THREADS * 100);
}

#[test]
fn test_racing_first_resolution_agrees_on_one_instance() {
    let built = Arc::new(AtomicUsize::new(0));
    let initialized = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let init_counter = initialized.clone();

    let container = Container::new();
    container
        .register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Counter { hits: AtomicUsize::new(0) })
        })
        .unwrap()
        .initialized_by(move |_, _| {
            init_counter.fetch_add(1, Ordering::SeqCst);
        });

    let barrier = Barrier::new(THREADS);
    let resolved: Vec<Arc<Counter>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    container.resolve::<Arc<Counter>>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    for counter in &resolved {
        assert!(Arc::ptr_eq(counter, &resolved[0]));
    }
    assert!(built.load(Ordering::SeqCst) >= 1);
    // Only the stored instance is initialized
    assert_eq!(initialized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_children_created_concurrently_get_own_container_instances() {
    let root = Container::new();
    root.register(|_| Arc::new(Counter { hits: AtomicUsize::new(0) }))
        .unwrap()
        .reused_within(ReuseScope::Container);

    let pairs: Vec<(Container, Arc<Counter>)> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    let child = root.create_child_container();
                    let counter = child.resolve::<Arc<Counter>>().unwrap();
                    assert!(Arc::ptr_eq(&counter, &child.resolve::<Arc<Counter>>().unwrap()));
                    (child, counter)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(root.child_count(), THREADS);
    for (i, (_, a)) in pairs.iter().enumerate() {
        for (_, b) in pairs.iter().skip(i + 1) {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

#[test]
fn test_request_scope_isolated_per_thread() {
    let container = Container::new();
    container
        .register(|_| Arc::new(Counter { hits: AtomicUsize::new(0) }))
        .unwrap()
        .reused_within(ReuseScope::Request);

    let resolved: Vec<Arc<Counter>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    let _request = ferrous_container::RequestScope::begin();
                    let a = container.resolve::<Arc<Counter>>().unwrap();
                    let b = container.resolve::<Arc<Counter>>().unwrap();
                    assert!(Arc::ptr_eq(&a, &b));
                    a
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    for (i, a) in resolved.iter().enumerate() {
        for b in resolved.iter().skip(i + 1) {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

struct Wired {
    counter: Arc<Counter>,
}

impl AutoWire for Wired {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(|args| Ok(Wired { counter: args.next()? })).param::<Arc<Counter>>()]
    }
}

#[test]
fn test_autowire_registration_races() {
    let container = Container::new();
    container
        .register(|_| Arc::new(Counter { hits: AtomicUsize::new(0) }))
        .unwrap();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                barrier.wait();
                let child = container.create_child_container();
                child
                    .register_auto_wired::<Wired>()
                    .unwrap()
                    .reused_within(ReuseScope::None);
                let wired = child.resolve::<Arc<Wired>>().unwrap();
                wired.counter.hits.fetch_add(1, Ordering::Relaxed);
            });
        }
    })
    .unwrap();

    let counter = container.resolve::<Arc<Counter>>().unwrap();
    assert_eq!(counter.hits.load(Ordering::Relaxed), THREADS);
    assert!(!PlanCache::global().is_empty());
}

#[test]
fn test_auto_wire_from_many_threads() {
    let container = Container::new();
    container
        .register(|_| Arc::new(Counter { hits: AtomicUsize::new(0) }))
        .unwrap();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                barrier.wait();
                let mut wired = Wired {
                    counter: Arc::new(Counter { hits: AtomicUsize::new(0) }),
                };
                // No properties to assign; the plan is compiled or loaded
                assert_eq!(container.auto_wire(&mut wired).unwrap(), 0);
            });
        }
    })
    .unwrap();

    assert!(PlanCache::global().compiled_count() >= 1);
}
