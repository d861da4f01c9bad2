use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ferrous_beans::*;
use std::sync::Arc;

// ===== Lookup Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let factory = BeanFactory::new();
    factory.register_definition("answer", BeanDefinition::of(|_| Ok(42u64))).unwrap();

    // Prime the singleton
    let _ = factory.get::<u64>("answer").unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = factory.get::<u64>(black_box("answer")).unwrap();
            black_box(v);
        })
    });
}

fn bench_alias_hit(c: &mut Criterion) {
    let factory = BeanFactory::new();
    factory.register_definition("answer", BeanDefinition::of(|_| Ok(42u64))).unwrap();
    factory.register_alias("answer", "a1").unwrap();
    factory.register_alias("a1", "a2").unwrap();
    factory.register_alias("a2", "a3").unwrap();
    let _ = factory.get_bean("answer").unwrap();

    c.bench_function("singleton_hit_via_alias_chain", |b| {
        b.iter(|| {
            let v = factory.get_bean(black_box("a3")).unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let factory = BeanFactory::new();
                factory
                    .register_definition(
                        "expensive",
                        BeanDefinition::of(|_| {
                            Ok(ExpensiveToCreate {
                                data: (0..1000).collect(),
                            })
                        }),
                    )
                    .unwrap();
                factory
            },
            |factory| {
                let v = factory.get::<ExpensiveToCreate>("expensive").unwrap();
                black_box(v.data.len());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_prototype(c: &mut Criterion) {
    struct Request {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("prototype");

    let plain = BeanFactory::new();
    plain
        .register_definition(
            "request",
            BeanDefinition::of(|_| Ok(Request { data: [0; 64] })).with_scope(SCOPE_PROTOTYPE),
        )
        .unwrap();
    group.bench_function("plain", |b| {
        b.iter(|| {
            let v = plain.get::<Request>("request").unwrap();
            black_box(&v.data);
        })
    });

    let populated = BeanFactory::new();
    populated.add_embedded_value_resolver(Arc::new(PlaceholderResolver::new().with_property("size", "64")));
    populated
        .register_definition(
            "request",
            BeanDefinition::of(|ctx| {
                let _size: usize = ctx.arg(0)?;
                Ok(Request { data: [0; 64] })
            })
            .with_scope(SCOPE_PROTOTYPE)
            .with_constructor_arg(0, "${size}"),
        )
        .unwrap();
    group.bench_function("with_placeholder_arg", |b| {
        b.iter(|| {
            let v = populated.get::<Request>("request").unwrap();
            black_box(&v.data);
        })
    });

    group.finish();
}

// ===== Graph Benchmarks =====

/// A chain `bean0 -> bean1 -> ... -> bean{depth-1}` of prototypes.
fn chain_factory(depth: usize) -> BeanFactory {
    let factory = BeanFactory::new();
    for i in 0..depth {
        let next = (i + 1 < depth).then(|| format!("bean{}", i + 1));
        factory
            .register_definition(
                &format!("bean{i}"),
                BeanDefinition::of(move |ctx| {
                    if let Some(next) = &next {
                        ctx.get_bean(next)?;
                    }
                    Ok(i)
                })
                .with_scope(SCOPE_PROTOTYPE),
            )
            .unwrap();
    }
    factory
}

fn bench_dependency_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("prototype_chain");
    for depth in [1usize, 8, 32] {
        let factory = chain_factory(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(factory.get_bean("bean0").unwrap()))
        });
    }
    group.finish();
}

fn bench_pre_instantiate_and_destroy(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");
    for count in [10usize, 100] {
        group.bench_with_input(BenchmarkId::new("pre_instantiate_destroy", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let factory = BeanFactory::new();
                    for i in 0..count {
                        let dependency = i.checked_sub(1).map(|d| format!("bean{d}"));
                        factory
                            .register_definition(
                                &format!("bean{i}"),
                                BeanDefinition::of(move |ctx| {
                                    if let Some(dependency) = &dependency {
                                        ctx.get_bean(dependency)?;
                                    }
                                    Ok(i)
                                })
                                .destroy_with::<usize, _>(|_| Ok(())),
                            )
                            .unwrap();
                    }
                    factory
                },
                |factory| {
                    factory.pre_instantiate_singletons().unwrap();
                    factory.destroy_singletons();
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// ===== Concurrency Benchmarks =====

fn bench_contended_singleton(c: &mut Criterion) {
    let factory = BeanFactory::new();
    factory.register_definition("shared", BeanDefinition::of(|_| Ok(7u32))).unwrap();
    let _ = factory.get_bean("shared").unwrap();

    c.bench_function("contended_singleton_4_threads", |b| {
        b.iter(|| {
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..100 {
                            black_box(factory.get::<u32>("shared").unwrap());
                        }
                    });
                }
            });
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_alias_hit,
    bench_singleton_cold,
    bench_prototype,
    bench_dependency_chain,
    bench_pre_instantiate_and_destroy,
    bench_contended_singleton
);
criterion_main!(benches);
