use ferrous_beans::{
    AnyArc, BeanDefinition, BeanError, BeanFactory, BeanPostProcessor, BeanResult, FactoryConfig, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, OnceLock};
use std::thread;

#[derive(Default)]
struct Left {
    right: OnceLock<Arc<Right>>,
}

#[derive(Default)]
struct Right {
    left: OnceLock<Arc<Left>>,
}

/// Registers `left` and `right` wired to each other through properties.
fn register_setter_cycle(factory: &BeanFactory, early: bool) {
    factory
        .register_definition(
            "left",
            BeanDefinition::of(|_| Ok(Left::default()))
                .with_early_reference(early)
                .with_property("right", Value::reference("right"))
                .bind_with::<Left, _>(|left, prop| {
                    let _ = left.right.set(prop.bean()?);
                    Ok(())
                }),
        )
        .unwrap();
    factory
        .register_definition(
            "right",
            BeanDefinition::of(|_| Ok(Right::default()))
                .with_early_reference(early)
                .with_property("left", Value::reference("left"))
                .bind_with::<Right, _>(|right, prop| {
                    let _ = right.left.set(prop.bean()?);
                    Ok(())
                }),
        )
        .unwrap();
}

fn assert_circular(result: BeanResult<AnyArc>, expected_path: &[&str]) {
    match result {
        Err(BeanError::CircularReference { path, .. }) => assert_eq!(path, expected_path),
        Err(other) => panic!("expected CircularReference, got {other}"),
        Ok(_) => panic!("expected CircularReference, got a bean"),
    }
}

#[test]
fn setter_cycle_between_opted_in_singletons_resolves() {
    let factory = BeanFactory::new();
    register_setter_cycle(&factory, true);

    let left = factory.get::<Left>("left").unwrap();
    let right = factory.get::<Right>("right").unwrap();

    assert!(Arc::ptr_eq(left.right.get().unwrap(), &right));
    assert!(Arc::ptr_eq(right.left.get().unwrap(), &left));
    assert_eq!(factory.dependent_beans("left"), vec!["right"]);
    assert_eq!(factory.dependent_beans("right"), vec!["left"]);
}

#[test]
fn setter_cycle_without_opt_in_fails() {
    let factory = BeanFactory::new();
    register_setter_cycle(&factory, false);

    assert_circular(factory.get_bean("left"), &["left", "right", "left"]);
    assert!(!factory.contains_singleton("left"));
    assert!(!factory.contains_singleton("right"));
}

#[test]
fn setter_cycle_fails_when_circular_references_are_disabled() {
    let factory = BeanFactory::with_config(FactoryConfig::default().allow_circular_references(false));
    register_setter_cycle(&factory, true);

    assert_circular(factory.get_bean("left"), &["left", "right", "left"]);
}

#[test]
fn constructor_cycle_fails_with_full_path() {
    struct A(#[allow(dead_code)] Arc<B>);
    struct B(#[allow(dead_code)] Arc<C>);
    struct C(#[allow(dead_code)] Arc<A>);

    let factory = BeanFactory::new();
    factory
        .register_definition("a", BeanDefinition::of(|ctx| Ok(A(ctx.get("b")?))).with_early_reference(true))
        .unwrap();
    factory
        .register_definition("b", BeanDefinition::of(|ctx| Ok(B(ctx.get("c")?))))
        .unwrap();
    factory
        .register_definition("c", BeanDefinition::of(|ctx| Ok(C(ctx.get("a")?))))
        .unwrap();

    // No partially built object exists yet, so opting in does not help
    assert_circular(factory.get_bean("a"), &["a", "b", "c", "a"]);
    assert_eq!(factory.singleton_count(), 0);
}

#[test]
fn prototype_self_reference_fails() {
    let factory = BeanFactory::new();
    factory
        .register_definition(
            "proto",
            BeanDefinition::of(|ctx| {
                ctx.get_bean("proto")?;
                Ok(())
            })
            .with_scope("prototype"),
        )
        .unwrap();

    assert_circular(factory.get_bean("proto"), &["proto", "proto"]);
}

#[test]
fn depends_on_cycle_fails_fast() {
    let factory = BeanFactory::new();
    factory
        .register_definition("a", BeanDefinition::of(|_| Ok(1u8)).with_depends_on(["b"]))
        .unwrap();
    factory
        .register_definition("b", BeanDefinition::of(|_| Ok(2u8)).with_depends_on(["a"]))
        .unwrap();

    let err = factory.get_bean("a").unwrap_err();
    assert!(matches!(err, BeanError::CircularReference { .. }), "{err}");
}

struct Wrapping;

struct Wrapped(#[allow(dead_code)] AnyArc);

impl BeanPostProcessor for Wrapping {
    fn after_initialization(&self, bean: AnyArc, name: &str) -> BeanResult<AnyArc> {
        if name == "left" {
            return Ok(Arc::new(Wrapped(bean)));
        }
        Ok(bean)
    }
}

#[test]
fn wrapping_an_early_referenced_bean_is_rejected() {
    let factory = BeanFactory::new();
    factory.add_post_processor(Arc::new(Wrapping));
    register_setter_cycle(&factory, true);

    let err = factory.get_bean("left").unwrap_err();
    assert!(matches!(err, BeanError::RawReferenceWrapped { ref name } if name == "left"), "{err}");
    assert!(!factory.contains_singleton("left"));
}

#[test]
fn wrapping_can_be_allowed_explicitly() {
    let factory = BeanFactory::with_config(FactoryConfig::default().allow_raw_injection_despite_wrapping(true));
    factory.add_post_processor(Arc::new(Wrapping));
    register_setter_cycle(&factory, true);

    assert!(factory.get::<Wrapped>("left").is_ok());
    // The dependent kept the raw object it was wired with
    let right = factory.get::<Right>("right").unwrap();
    assert!(right.left.get().is_some());
}

#[derive(Default)]
struct EarlyCounter(AtomicUsize);

impl BeanPostProcessor for EarlyCounter {
    fn early_reference(&self, bean: AnyArc, _name: &str) -> AnyArc {
        self.0.fetch_add(1, Ordering::SeqCst);
        bean
    }
}

#[test]
fn early_reference_hook_runs_once_per_bean() {
    #[derive(Default)]
    struct Hub {
        spokes: OnceLock<Vec<Arc<Spoke>>>,
    }
    #[derive(Default)]
    struct Spoke {
        hub: OnceLock<Arc<Hub>>,
    }

    let counter = Arc::new(EarlyCounter::default());
    let factory = BeanFactory::new();
    factory.add_post_processor(counter.clone());
    factory
        .register_definition(
            "hub",
            BeanDefinition::of(|_| Ok(Hub::default()))
                .with_early_reference(true)
                .with_property(
                    "spokes",
                    Value::List(vec![Value::reference("spoke1"), Value::reference("spoke2")]),
                )
                .bind_with::<Hub, _>(|hub, prop| {
                    let spokes = prop.items().iter().map(|p| p.bean::<Spoke>()).collect::<Result<Vec<_>, _>>()?;
                    let _ = hub.spokes.set(spokes);
                    Ok(())
                }),
        )
        .unwrap();
    for name in ["spoke1", "spoke2"] {
        factory
            .register_definition(
                name,
                BeanDefinition::of(|_| Ok(Spoke::default()))
                    .with_property("hub", Value::reference("hub"))
                    .bind_with::<Spoke, _>(|spoke, prop| {
                        let _ = spoke.hub.set(prop.bean()?);
                        Ok(())
                    }),
            )
            .unwrap();
    }

    let hub = factory.get::<Hub>("hub").unwrap();
    let spokes = hub.spokes.get().unwrap();
    assert_eq!(spokes.len(), 2);
    for spoke in spokes {
        assert!(Arc::ptr_eq(spoke.hub.get().unwrap(), &hub));
    }
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn cross_thread_cycle_fails_instead_of_deadlocking() {
    struct A(#[allow(dead_code)] AnyArc);
    struct B(#[allow(dead_code)] AnyArc);

    let barrier = Arc::new(Barrier::new(2));
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = BeanFactory::new();

    let (b1, c1) = (barrier.clone(), calls.clone());
    factory
        .register_definition(
            "a",
            BeanDefinition::of(move |ctx| {
                if c1.fetch_add(1, Ordering::SeqCst) < 2 {
                    b1.wait();
                }
                Ok(A(ctx.get_bean("b")?))
            }),
        )
        .unwrap();
    let (b2, c2) = (barrier.clone(), calls.clone());
    factory
        .register_definition(
            "b",
            BeanDefinition::of(move |ctx| {
                if c2.fetch_add(1, Ordering::SeqCst) < 2 {
                    b2.wait();
                }
                Ok(B(ctx.get_bean("a")?))
            }),
        )
        .unwrap();

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|name| {
            let factory = factory.clone();
            thread::spawn(move || factory.get_bean(name).map(|_| ()))
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(BeanError::CircularReference { .. })), "{result:?}");
    }
    assert_eq!(factory.singleton_count(), 0);
}

#[test]
fn failed_build_takes_down_beans_wired_to_its_early_reference() {
    use std::sync::atomic::AtomicBool;

    let healthy = Arc::new(AtomicBool::new(false));
    let factory = BeanFactory::new();
    let check = healthy.clone();
    factory
        .register_definition(
            "left",
            BeanDefinition::of(|_| Ok(Left::default()))
                .with_early_reference(true)
                .with_property("right", Value::reference("right"))
                .bind_with::<Left, _>(|left, prop| {
                    let _ = left.right.set(prop.bean()?);
                    Ok(())
                })
                .init_with::<Left, _>(move |_| {
                    if check.load(Ordering::SeqCst) {
                        Ok(())
                    } else {
                        Err("left cannot start".into())
                    }
                }),
        )
        .unwrap();
    factory
        .register_definition(
            "right",
            BeanDefinition::of(|_| Ok(Right::default()))
                .with_property("left", Value::reference("left"))
                .bind_with::<Right, _>(|right, prop| {
                    let _ = right.left.set(prop.bean()?);
                    Ok(())
                }),
        )
        .unwrap();

    let result = factory.get_bean("left");
    assert!(matches!(result, Err(BeanError::InstantiationFailure { .. })), "{result:?}");

    // `right` was wired to the half-built `left`, so it must not survive
    assert!(!factory.contains_singleton("left"));
    assert!(!factory.contains_singleton("right"));
    assert_eq!(factory.singleton_count(), 0);
    assert!(factory.dependencies_for_bean("right").is_empty());
    assert!(factory.dependencies_for_bean("left").is_empty());
    assert!(factory.dependent_beans("left").is_empty());

    // A later successful build wires a fresh `right` to the real `left`
    healthy.store(true, Ordering::SeqCst);
    let left = factory.get::<Left>("left").unwrap();
    let right = factory.get::<Right>("right").unwrap();
    assert!(Arc::ptr_eq(left.right.get().unwrap(), &right));
    assert!(Arc::ptr_eq(right.left.get().unwrap(), &left));
}
