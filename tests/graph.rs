use ferrous_beans::{BeanDefinition, BeanFactory, GraphEdge, Value};
use std::sync::Arc;

fn wired_factory() -> BeanFactory {
    let factory = BeanFactory::new();
    factory.register_definition("config", BeanDefinition::of(|_| Ok(1u8))).unwrap();
    factory
        .register_definition(
            "service",
            BeanDefinition::of(|ctx| Ok(*ctx.get::<u8>("config")? + 1)).with_scope("prototype"),
        )
        .unwrap();
    factory
        .register_definition("template", BeanDefinition::of(|_| Ok(0u8)).as_abstract())
        .unwrap();
    factory.register_singleton("external", Arc::new("manual")).unwrap();
    factory.register_alias("config", "settings").unwrap();
    factory
}

#[test]
fn snapshot_covers_definitions_singletons_and_edges() {
    let factory = wired_factory();
    factory.get_bean("service").unwrap();

    let graph = factory.dependency_graph();
    let names: Vec<&str> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["config", "external", "service", "template"]);
    assert_eq!(
        graph.edges,
        vec![GraphEdge {
            dependent: "service".into(),
            dependency: "config".into(),
        }]
    );

    let config = graph.node("config").unwrap();
    assert!(config.instantiated);
    assert_eq!(config.aliases, vec!["settings"]);
    assert_eq!(config.scope.as_deref(), Some("singleton"));

    let service = graph.node("service").unwrap();
    assert!(!service.instantiated);
    assert_eq!(service.scope.as_deref(), Some("prototype"));
    assert_eq!(service.type_name.as_deref(), Some(std::any::type_name::<u8>()));

    assert!(graph.node("template").unwrap().is_abstract);
    assert_eq!(graph.node("external").unwrap().scope, None);
    assert!(!graph.has_cycle());
}

#[test]
fn renderings_include_every_edge() {
    let factory = wired_factory();
    factory.get_bean("service").unwrap();
    let graph = factory.dependency_graph();

    let dot = graph.to_dot();
    assert!(dot.starts_with("digraph beans {"));
    assert!(dot.contains("\"service\" -> \"config\";"));
    assert!(dot.contains("style=dashed"));

    let mermaid = graph.to_mermaid();
    assert!(mermaid.starts_with("graph LR"));
    assert_eq!(mermaid.matches("-->").count(), 1);
}

#[test]
fn resolved_setter_cycle_shows_up_as_a_cycle() {
    let factory = BeanFactory::new();
    for (name, peer) in [("left", "right"), ("right", "left")] {
        factory
            .register_definition(
                name,
                BeanDefinition::of(|_| Ok(()))
                    .with_early_reference(true)
                    .with_property("peer", Value::reference(peer))
                    .bind_with::<(), _>(|_, _| Ok(())),
            )
            .unwrap();
    }
    factory.get_bean("left").unwrap();

    assert!(factory.dependency_graph().has_cycle());
}

#[cfg(feature = "graph-export")]
#[test]
fn json_export_reads_back() {
    use ferrous_beans::GraphSnapshot;

    let factory = wired_factory();
    factory.get_bean("service").unwrap();
    let graph = factory.dependency_graph();

    let json = graph.to_json().unwrap();
    let parsed: GraphSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, graph);
}
