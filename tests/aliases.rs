use ferrous_beans::{BeanDefinition, BeanError, BeanFactory, FactoryConfig, PlaceholderResolver};
use proptest::prelude::*;
use std::sync::Arc;

fn factory_with(names: &[&str]) -> BeanFactory {
    let factory = BeanFactory::new();
    for name in names {
        let owned = name.to_string();
        factory
            .register_definition(name, BeanDefinition::of(move |_| Ok(owned.clone())))
            .unwrap();
    }
    factory
}

#[test]
fn alias_resolves_to_the_same_instance() {
    let factory = factory_with(&["x"]);
    factory.register_alias("x", "x2").unwrap();

    let by_alias = factory.get_bean("x2").unwrap();
    let by_name = factory.get_bean("x").unwrap();
    assert!(Arc::ptr_eq(&by_alias, &by_name));
    assert!(factory.contains_bean("x2"));
    assert!(factory.is_alias("x2"));
    assert_eq!(factory.canonical_name("x2"), "x");
}

#[test]
fn alias_for_a_different_name_is_a_conflict() {
    let factory = factory_with(&["x", "y"]);
    factory.register_alias("x", "x2").unwrap();

    // Same pair again is fine
    factory.register_alias("x", "x2").unwrap();

    let err = factory.register_alias("y", "x2").unwrap_err();
    assert!(matches!(err, BeanError::DefinitionConflict { ref name, .. } if name == "x2"));
    assert_eq!(*factory.get::<String>("x2").unwrap(), "x");
}

#[test]
fn alias_cycles_are_rejected() {
    let factory = factory_with(&[]);
    factory.register_alias("a", "b").unwrap();
    factory.register_alias("b", "c").unwrap();

    let err = factory.register_alias("c", "a").unwrap_err();
    assert!(matches!(err, BeanError::DefinitionConflict { .. }));
}

#[test]
fn alias_may_not_shadow_a_definition() {
    let factory = factory_with(&["x", "y"]);
    let err = factory.register_alias("x", "y").unwrap_err();
    assert!(matches!(err, BeanError::DefinitionConflict { .. }));
}

#[test]
fn registering_a_definition_under_an_alias_name() {
    let factory = factory_with(&["x"]);
    factory.register_alias("x", "other").unwrap();

    factory
        .register_definition("other", BeanDefinition::of(|_| Ok("own".to_string())))
        .unwrap();
    assert!(!factory.is_alias("other"));
    assert_eq!(*factory.get::<String>("other").unwrap(), "own");

    let strict = BeanFactory::with_config(FactoryConfig::default().allow_definition_overriding(false));
    strict.register_definition("x", BeanDefinition::of(|_| Ok(1u8))).unwrap();
    strict.register_alias("x", "other").unwrap();
    let err = strict
        .register_definition("other", BeanDefinition::of(|_| Ok(2u8)))
        .unwrap_err();
    assert!(matches!(err, BeanError::DefinitionConflict { .. }));
}

#[test]
fn aliases_are_listed_transitively() {
    let factory = factory_with(&["x"]);
    factory.register_alias("x", "b").unwrap();
    factory.register_alias("b", "a").unwrap();
    factory.register_alias("x", "c").unwrap();

    assert_eq!(factory.get_aliases("x"), vec!["a", "b", "c"]);
    // From an alias: the other aliases plus the canonical name
    assert_eq!(factory.get_aliases("a"), vec!["b", "c", "x"]);
}

#[test]
fn removing_an_alias() {
    let factory = factory_with(&["x"]);
    factory.register_alias("x", "x2").unwrap();
    factory.remove_alias("x2").unwrap();

    assert!(matches!(factory.get_bean("x2"), Err(BeanError::NotFound { .. })));
    assert!(matches!(factory.remove_alias("x2"), Err(BeanError::NotFound { .. })));
}

#[test]
fn aliases_can_be_resolved_through_placeholders() {
    let factory = factory_with(&["datasource"]);
    factory.register_alias("datasource", "${env}-db").unwrap();

    let resolver = PlaceholderResolver::new().with_property("env", "prod");
    factory.resolve_aliases(&resolver).unwrap();

    assert!(factory.is_alias("prod-db"));
    assert!(!factory.is_alias("${env}-db"));
    assert_eq!(*factory.get::<String>("prod-db").unwrap(), "datasource");
}

proptest! {
    #[test]
    fn alias_chains_resolve_to_the_canonical_name(len in 1usize..12) {
        let factory = factory_with(&["root"]);
        let mut previous = "root".to_string();
        for i in 0..len {
            let alias = format!("alias{i}");
            factory.register_alias(&previous, &alias).unwrap();
            previous = alias;
        }

        prop_assert_eq!(factory.canonical_name(&previous), "root");
        prop_assert_eq!(factory.get_aliases("root").len(), len);
        let by_alias = factory.get_bean(&previous).unwrap();
        prop_assert!(Arc::ptr_eq(&by_alias, &factory.get_bean("root").unwrap()));
    }

    #[test]
    fn closing_a_chain_into_a_loop_is_always_rejected(len in 2usize..8) {
        let factory = factory_with(&[]);
        for i in 0..len - 1 {
            factory.register_alias(&format!("n{i}"), &format!("n{}", i + 1)).unwrap();
        }
        let closing = factory.register_alias(&format!("n{}", len - 1), "n0");
        prop_assert!(
            matches!(closing, Err(BeanError::DefinitionConflict { .. })),
            "closing alias was accepted"
        );
    }
}
