//! Dependency edges between beans.
//!
//! An edge `dependent -> dependency` says that `dependent` needs
//! `dependency`. Edges accumulate while beans are wired and drive the
//! destruction order: a bean is only destroyed once everything depending on
//! it is gone.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

#[derive(Default)]
struct Edges {
    /// name -> beans that depend on it
    dependents: HashMap<String, BTreeSet<String>>,
    /// name -> beans it depends on
    dependencies: HashMap<String, BTreeSet<String>>,
}

#[derive(Default)]
pub(crate) struct DependencyGraph {
    edges: Mutex<Edges>,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` depends on `name`.
    pub(crate) fn register_dependent(&self, name: &str, dependent: &str) {
        if name == dependent {
            return;
        }
        let mut edges = self.edges.lock();
        let added = edges
            .dependents
            .entry(name.to_owned())
            .or_default()
            .insert(dependent.to_owned());
        if added {
            edges
                .dependencies
                .entry(dependent.to_owned())
                .or_default()
                .insert(name.to_owned());
            tracing::trace!(target: "ferrous_beans", %dependent, dependency = %name, "registered dependency");
        }
    }

    /// `true` if `dependent` depends on `name`, directly or transitively.
    pub(crate) fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        let edges = self.edges.lock();
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_owned()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(direct) = edges.dependents.get(&current) {
                if direct.contains(dependent) {
                    return true;
                }
                stack.extend(direct.iter().cloned());
            }
        }
        false
    }

    pub(crate) fn dependents(&self, name: &str) -> Vec<String> {
        self.edges
            .lock()
            .dependents
            .get(name)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn dependencies(&self, name: &str) -> Vec<String> {
        self.edges
            .lock()
            .dependencies
            .get(name)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns the dependents of `name`.
    pub(crate) fn take_dependents(&self, name: &str) -> BTreeSet<String> {
        self.edges.lock().dependents.remove(name).unwrap_or_default()
    }

    /// Drops every edge touching `name` as a dependent.
    pub(crate) fn forget(&self, name: &str) {
        let mut edges = self.edges.lock();
        edges.dependents.retain(|_, set| {
            set.remove(name);
            !set.is_empty()
        });
        edges.dependencies.remove(name);
    }

    /// All edges as `(dependent, dependency)` pairs, sorted.
    pub(crate) fn snapshot(&self) -> Vec<(String, String)> {
        let edges = self.edges.lock();
        let mut pairs: Vec<(String, String)> = edges
            .dependencies
            .iter()
            .flat_map(|(dependent, deps)| deps.iter().map(move |d| (dependent.clone(), d.clone())))
            .collect();
        pairs.sort();
        pairs
    }

    pub(crate) fn clear(&self) {
        let mut edges = self.edges.lock();
        edges.dependents.clear();
        edges.dependencies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitive_dependents_are_found() {
        let graph = DependencyGraph::new();
        graph.register_dependent("a", "b");
        graph.register_dependent("b", "c");

        assert!(graph.is_dependent("a", "c"));
        assert!(!graph.is_dependent("c", "a"));
        assert_eq!(graph.dependencies("c"), vec!["b"]);
        assert_eq!(graph.dependents("a"), vec!["b"]);
    }

    #[test]
    fn diamond_and_cycle_terminate() {
        let graph = DependencyGraph::new();
        graph.register_dependent("d", "b");
        graph.register_dependent("d", "c");
        graph.register_dependent("b", "a");
        graph.register_dependent("c", "a");
        graph.register_dependent("a", "d");

        assert!(graph.is_dependent("d", "a"));
        assert!(graph.is_dependent("a", "b"));
        assert!(!graph.is_dependent("d", "x"));
    }

    #[test]
    fn forget_removes_edges() {
        let graph = DependencyGraph::new();
        graph.register_dependent("a", "b");
        graph.forget("b");
        assert!(graph.dependents("a").is_empty());
        assert!(graph.snapshot().is_empty());
    }
}
