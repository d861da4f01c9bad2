#![no_main]

use ferrous_beans::{BeanDefinition, BeanFactory, Value};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "&e", ""];

fn name(byte: u8) -> &'static str {
    NAMES[byte as usize % NAMES.len()]
}

// Drives registration, aliasing, parent links and lookups with arbitrary
// operation sequences. Every lookup must return a result, never panic or hang.
fuzz_target!(|data: &[u8]| {
    let factory = BeanFactory::new();

    for op in data.chunks_exact(3) {
        let (target, other) = (name(op[1]), name(op[2]));
        match op[0] % 8 {
            0 => {
                let value = op[2];
                let _ = factory.register_definition(target, BeanDefinition::of(move |_| Ok(value)));
            }
            1 => {
                let _ = factory.register_definition(target, BeanDefinition::new().with_parent(other));
            }
            2 => {
                let dependency = other.to_owned();
                let _ = factory.register_definition(
                    target,
                    BeanDefinition::of(move |ctx| {
                        ctx.get_bean(&dependency)?;
                        Ok(())
                    })
                    .with_scope(if op[2] % 2 == 0 { "singleton" } else { "prototype" }),
                );
            }
            3 => {
                let _ = factory.register_definition(
                    target,
                    BeanDefinition::of(|_| Ok(()))
                        .with_early_reference(true)
                        .with_property("peer", Value::reference(other))
                        .bind_with::<(), _>(|_, _| Ok(())),
                );
            }
            4 => {
                let _ = factory.register_alias(target, other);
            }
            5 => {
                let _ = factory.remove_definition(target);
            }
            6 => {
                if factory.get_bean(target).is_ok() {
                    assert!(factory.contains_bean(target));
                }
            }
            _ => factory.destroy_singleton(target),
        }
    }

    let _ = factory.pre_instantiate_singletons();
    let _ = factory.dependency_graph().to_dot();
    factory.destroy_singletons();
    assert_eq!(factory.singleton_count(), 0);
});
