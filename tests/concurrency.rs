//! Concurrent access tests
//!
//! Singletons are built exactly once no matter how many threads race for
//! them, and a failed build does not poison the name for later callers.

use crossbeam_utils::thread;
use ferrous_beans::{AnyArc, BeanDefinition, BeanFactory, BeanPostProcessor, BeanResult, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const THREADS: usize = 8;

#[derive(Debug)]
struct Expensive {
    serial: usize,
}

fn slow_singleton(factory: &BeanFactory, name: &str, built: &Arc<AtomicUsize>) {
    let built = built.clone();
    factory
        .register_definition(
            name,
            BeanDefinition::of(move |_| {
                std::thread::sleep(Duration::from_millis(20));
                Ok(Expensive {
                    serial: built.fetch_add(1, Ordering::SeqCst),
                })
            }),
        )
        .unwrap();
}

#[test]
fn racing_threads_share_one_singleton() {
    let built = Arc::new(AtomicUsize::new(0));
    let factory = BeanFactory::new();
    slow_singleton(&factory, "expensive", &built);
    let barrier = Barrier::new(THREADS);

    let results: Vec<Arc<Expensive>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    factory.get::<Expensive>("expensive").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(results[0].serial, 0);
}

#[test]
fn racing_threads_share_dependencies_too() {
    let built = Arc::new(AtomicUsize::new(0));
    let factory = BeanFactory::new();
    slow_singleton(&factory, "pool", &built);
    for i in 0..THREADS {
        factory
            .register_definition(
                &format!("worker{i}"),
                BeanDefinition::of(|ctx| ctx.get::<Expensive>("pool").map(|pool| pool.serial).map_err(Into::into)),
            )
            .unwrap();
    }
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for i in 0..THREADS {
            let (factory, barrier) = (&factory, &barrier);
            s.spawn(move |_| {
                barrier.wait();
                assert_eq!(*factory.get::<usize>(&format!("worker{i}")).unwrap(), 0);
            });
        }
    })
    .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    for i in 0..THREADS {
        assert_eq!(factory.dependencies_for_bean(&format!("worker{i}")), vec!["pool"]);
    }
    assert_eq!(factory.dependent_beans("pool").len(), THREADS);
    assert_eq!(factory.singleton_count(), THREADS + 1);
}

#[test]
fn waiting_threads_retry_after_a_failed_build() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let factory = BeanFactory::new();
    let counter = attempts.clone();
    factory
        .register_definition(
            "flaky",
            BeanDefinition::of(move |_| {
                std::thread::sleep(Duration::from_millis(10));
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("first build fails".into())
                } else {
                    Ok(42u32)
                }
            }),
        )
        .unwrap();
    let barrier = Barrier::new(THREADS);

    let outcomes: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    factory.get::<u32>("flaky").is_ok()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    // Exactly one caller saw the failure; everyone else got the rebuilt bean
    assert_eq!(outcomes.iter().filter(|ok| !**ok).count(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(*factory.get::<u32>("flaky").unwrap(), 42);
}

#[test]
fn concurrent_prototypes_are_independent() {
    let factory = BeanFactory::new();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    factory
        .register_definition(
            "request",
            BeanDefinition::of(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))).with_scope("prototype"),
        )
        .unwrap();

    let ids: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|_| (0..10).map(|_| *factory.get::<usize>("request").unwrap()).collect::<Vec<_>>()))
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), THREADS * 10);
    assert_eq!(built.load(Ordering::SeqCst), THREADS * 10);
}

#[test]
fn setter_cycle_resolves_under_contention() {
    struct Node {
        peer: std::sync::OnceLock<AnyArc>,
    }

    let factory = BeanFactory::new();
    for (name, peer) in [("ping", "pong"), ("pong", "ping")] {
        factory
            .register_definition(
                name,
                BeanDefinition::of(|_| {
                    Ok(Node {
                        peer: std::sync::OnceLock::new(),
                    })
                })
                .with_early_reference(true)
                .with_property("peer", Value::reference(peer))
                .bind_with::<Node, _>(|node, prop| {
                    let object = prop.value().as_object().cloned().ok_or("peer is not a bean")?;
                    let _ = node.peer.set(object);
                    Ok(())
                }),
            )
            .unwrap();
    }

    // Only one thread starts the cycle; the others wait on its singletons
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                let ping = factory.get::<Node>("ping").unwrap();
                assert!(ping.peer.get().is_some());
            });
        }
    })
    .unwrap();

    let ping = factory.get_bean("ping").unwrap();
    let pong = factory.get::<Node>("pong").unwrap();
    assert!(Arc::ptr_eq(pong.peer.get().unwrap(), &ping));
}

/// Holds the first `parties` instantiations until all of them arrived.
struct InstantiationBarrier {
    barrier: Barrier,
    parties: usize,
    seen: AtomicUsize,
}

impl BeanPostProcessor for InstantiationBarrier {
    fn after_instantiation(&self, _bean: &AnyArc, _name: &str) -> BeanResult<bool> {
        if self.seen.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait();
        }
        Ok(true)
    }
}

#[test]
fn setter_cycle_entered_from_both_ends_resolves() {
    struct Node {
        peer: std::sync::OnceLock<AnyArc>,
    }

    let factory = BeanFactory::new();
    factory.add_post_processor(Arc::new(InstantiationBarrier {
        barrier: Barrier::new(2),
        parties: 2,
        seen: AtomicUsize::new(0),
    }));
    for (name, peer) in [("ping", "pong"), ("pong", "ping")] {
        factory
            .register_definition(
                name,
                BeanDefinition::of(|_| {
                    Ok(Node {
                        peer: std::sync::OnceLock::new(),
                    })
                })
                .with_early_reference(true)
                .with_property("peer", Value::reference(peer))
                .bind_with::<Node, _>(|node, prop| {
                    let object = prop.value().as_object().cloned().ok_or("peer is not a bean")?;
                    let _ = node.peer.set(object);
                    Ok(())
                }),
            )
            .unwrap();
    }

    // Each thread owns one half of the cycle before either resolves its peer
    let results = thread::scope(|s| {
        let handles: Vec<_> = ["ping", "pong"]
            .into_iter()
            .map(|name| {
                let factory = &factory;
                s.spawn(move |_| factory.get_bean(name).map(|_| ()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap();

    for result in &results {
        assert!(result.is_ok(), "{results:?}");
    }
    let ping = factory.get::<Node>("ping").unwrap();
    let pong = factory.get::<Node>("pong").unwrap();
    let ping_any: AnyArc = ping.clone();
    let pong_any: AnyArc = pong.clone();
    assert!(Arc::ptr_eq(ping.peer.get().unwrap(), &pong_any));
    assert!(Arc::ptr_eq(pong.peer.get().unwrap(), &ping_any));
    assert_eq!(factory.singleton_count(), 2);
}
