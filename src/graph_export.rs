//! Dependency graph export for visualization and debugging.
//!
//! [`BeanFactory::dependency_graph`](crate::BeanFactory::dependency_graph)
//! captures the definitions, live singletons and recorded dependency edges
//! of a factory. The snapshot renders as Graphviz DOT or Mermaid, and as
//! JSON with the `graph-export` feature.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

#[cfg(feature = "graph-export")]
use serde::{Deserialize, Serialize};

use crate::factory::BeanFactory;

/// One bean in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphNode {
    /// Canonical bean name
    pub name: String,
    /// Scope id, `None` for singletons registered without a definition
    pub scope: Option<String>,
    /// Declared bean type
    pub type_name: Option<String>,
    pub aliases: Vec<String>,
    /// Whether a singleton object currently exists
    pub instantiated: bool,
    pub is_abstract: bool,
    pub is_producer: bool,
}

/// `dependent` depends on `dependency`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphEdge {
    pub dependent: String,
    pub dependency: String,
}

/// Point-in-time view of a factory's beans and their dependencies.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory};
///
/// let factory = BeanFactory::new();
/// factory.register_definition("db", BeanDefinition::of(|_| Ok(1u8))).unwrap();
/// factory
///     .register_definition("repo", BeanDefinition::of(|ctx| Ok(*ctx.get::<u8>("db")? + 1)))
///     .unwrap();
/// factory.get_bean("repo").unwrap();
///
/// let graph = factory.dependency_graph();
/// assert_eq!(graph.nodes.len(), 2);
/// assert!(graph.to_dot().contains("\"repo\" -> \"db\""));
/// assert!(!graph.has_cycle());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphSnapshot {
    /// Nodes sorted by name
    pub nodes: Vec<GraphNode>,
    /// Edges sorted by dependent, then dependency
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    pub(crate) fn capture(factory: &BeanFactory) -> Self {
        let edges: Vec<GraphEdge> = factory
            .dependency_edges()
            .into_iter()
            .map(|(dependent, dependency)| GraphEdge { dependent, dependency })
            .collect();

        let mut names: BTreeSet<String> = factory.definition_names().into_iter().collect();
        names.extend(factory.singleton_names());
        for edge in &edges {
            names.insert(edge.dependent.clone());
            names.insert(edge.dependency.clone());
        }

        let nodes = names
            .into_iter()
            .map(|name| {
                let merged = if factory.contains_definition(&name) {
                    factory.get_merged_definition(&name).ok()
                } else {
                    None
                };
                GraphNode {
                    scope: merged.as_ref().map(|m| m.scope().to_owned()),
                    type_name: merged
                        .as_ref()
                        .and_then(|m| m.bean_type())
                        .map(|t| t.name().to_owned()),
                    aliases: factory.get_aliases(&name),
                    instantiated: factory.contains_singleton(&name),
                    is_abstract: merged.as_ref().is_some_and(|m| m.is_abstract()),
                    is_producer: merged.as_ref().is_some_and(|m| m.is_producer()),
                    name,
                }
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Returns `true` if the recorded dependencies contain a cycle.
    pub fn has_cycle(&self) -> bool {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            adjacency
                .entry(edge.dependent.as_str())
                .or_default()
                .push(edge.dependency.as_str());
        }

        // 0 = unvisited, 1 = on the current path, 2 = done
        let mut state: BTreeMap<&str, u8> = BTreeMap::new();
        fn visit<'a>(
            node: &'a str,
            adjacency: &HashMap<&'a str, Vec<&'a str>>,
            state: &mut BTreeMap<&'a str, u8>,
        ) -> bool {
            match state.get(node) {
                Some(1) => return true,
                Some(2) => return false,
                _ => {}
            }
            state.insert(node, 1);
            let found = adjacency
                .get(node)
                .is_some_and(|next| next.iter().any(|n| visit(n, adjacency, state)));
            state.insert(node, 2);
            found
        }

        adjacency
            .keys()
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .any(|node| visit(node, &adjacency, &mut state))
    }

    /// Graphviz DOT rendering. Instantiated singletons are filled.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph beans {\n  rankdir=LR;\n  node [shape=box];\n\n");
        for node in &self.nodes {
            let mut label = node.name.clone();
            if let Some(scope) = &node.scope {
                let _ = write!(label, "\\n({scope})");
            }
            let style = match (node.instantiated, node.is_abstract) {
                (_, true) => ", style=dashed",
                (true, false) => ", style=filled, fillcolor=lightblue",
                (false, false) => "",
            };
            let _ = writeln!(out, "  \"{}\" [label=\"{}\"{}];", escape(&node.name), escape(&label), style);
        }
        out.push('\n');
        for edge in &self.edges {
            let _ = writeln!(out, "  \"{}\" -> \"{}\";", escape(&edge.dependent), escape(&edge.dependency));
        }
        out.push_str("}\n");
        out
    }

    /// Mermaid flowchart rendering.
    pub fn to_mermaid(&self) -> String {
        let mut ids = HashMap::new();
        let mut out = String::from("graph LR\n");
        for (i, node) in self.nodes.iter().enumerate() {
            let id = format!("n{i}");
            let _ = writeln!(out, "  {id}[\"{}\"]", node.name.replace('"', "#quot;"));
            ids.insert(node.name.as_str(), id);
        }
        for edge in &self.edges {
            if let (Some(from), Some(to)) = (ids.get(edge.dependent.as_str()), ids.get(edge.dependency.as_str())) {
                let _ = writeln!(out, "  {from} --> {to}");
            }
        }
        out
    }

    #[cfg(feature = "graph-export")]
    pub fn to_json(&self) -> crate::error::BeanResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::BeanError::IllegalState(format!("cannot serialize dependency graph: {e}")))
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(dependent: &str, dependency: &str) -> GraphEdge {
        GraphEdge {
            dependent: dependent.into(),
            dependency: dependency.into(),
        }
    }

    #[test]
    fn detects_cycles() {
        let mut graph = GraphSnapshot {
            nodes: Vec::new(),
            edges: vec![edge("a", "b"), edge("b", "c")],
        };
        assert!(!graph.has_cycle());
        graph.edges.push(edge("c", "a"));
        assert!(graph.has_cycle());
    }

    #[test]
    fn mermaid_skips_edges_to_unknown_nodes() {
        let graph = GraphSnapshot {
            nodes: vec![GraphNode {
                name: "a".into(),
                scope: Some("singleton".into()),
                type_name: None,
                aliases: Vec::new(),
                instantiated: false,
                is_abstract: false,
                is_producer: false,
            }],
            edges: vec![edge("a", "ghost")],
        };
        let rendered = graph.to_mermaid();
        assert!(rendered.contains("n0[\"a\"]"));
        assert!(!rendered.contains("-->"));
    }
}
