//! Singleton cache, early references and dependency-ordered teardown.
//!
//! Finished singletons live in a read-mostly map so cache hits never block.
//! Construction of a missing singleton is serialized per name through the
//! [`CreationGuard`]; unrelated names build in parallel.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::dependency::DependencyGraph;
use crate::error::{BeanError, BeanResult};
use crate::internal::{creation_stack, Acquire, CreationGuard};
use crate::producer::ProductCache;
use crate::scope::DestructionCallback;
use crate::AnyArc;

/// Produces the early reference of a singleton still in creation.
pub(crate) type EarlyReferenceFn = Box<dyn FnOnce() -> AnyArc + Send>;

pub(crate) struct SingletonRegistry {
    factory_id: u64,
    objects: RwLock<HashMap<String, AnyArc>>,
    early_objects: Mutex<HashMap<String, AnyArc>>,
    early_factories: Mutex<HashMap<String, EarlyReferenceFn>>,
    /// Names of finished singletons in creation order
    order: Mutex<Vec<String>>,
    guard: CreationGuard,
    in_creation_exclusions: Mutex<HashSet<String>>,
    disposables: Mutex<HashMap<String, DestructionCallback>>,
    destroying: AtomicBool,
    products: ProductCache,
    graph: DependencyGraph,
}

impl SingletonRegistry {
    pub(crate) fn new(factory_id: u64) -> Self {
        Self {
            factory_id,
            objects: RwLock::new(HashMap::new()),
            early_objects: Mutex::new(HashMap::new()),
            early_factories: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            guard: CreationGuard::new(),
            in_creation_exclusions: Mutex::new(HashSet::new()),
            disposables: Mutex::new(HashMap::new()),
            destroying: AtomicBool::new(false),
            products: ProductCache::default(),
            graph: DependencyGraph::new(),
        }
    }

    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub(crate) fn products(&self) -> &ProductCache {
        &self.products
    }

    /// The finished singleton, or, when `allow_early` and the calling thread
    /// is building `name`, its early reference.
    pub(crate) fn get(&self, name: &str, allow_early: bool) -> Option<AnyArc> {
        if let Some(object) = self.objects.read().get(name) {
            return Some(object.clone());
        }
        if !allow_early || !self.guard.is_owned_by_current_thread(name) {
            return None;
        }
        self.early_reference(name)
    }

    /// The early reference of `name`, produced from its early factory on
    /// first request.
    fn early_reference(&self, name: &str) -> Option<AnyArc> {
        if let Some(early) = self.early_objects.lock().get(name) {
            return Some(early.clone());
        }
        let Some(factory) = self.early_factories.lock().remove(name) else {
            // Another thread may have just produced it
            return self.early_objects.lock().get(name).cloned();
        };
        let early = factory();
        tracing::debug!(target: "ferrous_beans", bean = %name, "handing out early reference to singleton in creation");
        Some(
            self.early_objects
                .lock()
                .entry(name.to_owned())
                .or_insert(early)
                .clone(),
        )
    }

    /// The early reference of `name`, if one was handed out.
    pub(crate) fn early_reference_taken(&self, name: &str) -> Option<AnyArc> {
        self.early_objects.lock().get(name).cloned()
    }

    pub(crate) fn add_early_factory(&self, name: &str, factory: EarlyReferenceFn) {
        if !self.objects.read().contains_key(name) {
            self.early_factories.lock().insert(name.to_owned(), factory);
        }
    }

    /// Returns the singleton for `name`, building it with `create` if needed.
    ///
    /// At most one thread builds a given name; others wait for it. A
    /// re-entrant request from the building thread fails with
    /// `CircularReference`. So does a wait that would deadlock with another
    /// builder, unless that builder already exposed an early reference.
    ///
    /// A failed build leaves nothing behind: singletons that were wired to
    /// its early reference are destroyed and its dependency edges dropped.
    pub(crate) fn get_or_create<F>(&self, name: &str, create: F) -> BeanResult<AnyArc>
    where
        F: FnOnce() -> BeanResult<AnyArc>,
    {
        if let Some(object) = self.objects.read().get(name) {
            return Ok(object.clone());
        }

        let _ticket = match self.guard.acquire(name) {
            Acquire::Owned(ticket) => ticket,
            Acquire::AlreadyInCreation => {
                return Err(BeanError::CircularReference {
                    name: name.to_owned(),
                    path: creation_stack::cycle_path(self.factory_id, name),
                });
            }
            Acquire::WouldDeadlock => {
                // The owner is blocked on this thread, so its half-built
                // object is stable
                if let Some(early) = self.early_reference(name) {
                    tracing::debug!(target: "ferrous_beans", bean = %name, "resolving cross-thread cycle through early reference");
                    return Ok(early);
                }
                // The other half of the cycle is on another thread's stack
                let mut path = creation_stack::current_chain(self.factory_id);
                path.push(name.to_owned());
                return Err(BeanError::CircularReference {
                    name: name.to_owned(),
                    path,
                });
            }
        };

        if let Some(object) = self.objects.read().get(name) {
            return Ok(object.clone());
        }
        if self.destroying.load(Ordering::Acquire) {
            return Err(BeanError::CreationNotAllowed { name: name.to_owned() });
        }

        match create() {
            Ok(object) => {
                self.add(name, object.clone());
                Ok(object)
            }
            Err(err) => {
                let handed_out = self.early_objects.lock().remove(name).is_some();
                self.early_factories.lock().remove(name);
                self.disposables.lock().remove(name);
                if handed_out {
                    let dependents = self.graph.take_dependents(name);
                    if !dependents.is_empty() {
                        tracing::debug!(
                            target: "ferrous_beans",
                            bean = %name,
                            dependents = ?dependents,
                            "destroying singletons holding the early reference of a failed bean"
                        );
                    }
                    for dependent in &dependents {
                        self.destroy_singleton(dependent);
                    }
                }
                self.graph.forget(name);
                Err(err)
            }
        }
    }

    /// Registers an externally created singleton.
    pub(crate) fn register(&self, name: &str, object: AnyArc) -> BeanResult<()> {
        {
            let objects = self.objects.read();
            if objects.contains_key(name) {
                return Err(BeanError::conflict(name, "a singleton is already registered under this name"));
            }
        }
        if self.guard.is_in_creation(name) {
            return Err(BeanError::conflict(name, "the singleton is currently in creation"));
        }
        self.add(name, object);
        Ok(())
    }

    fn add(&self, name: &str, object: AnyArc) {
        self.objects.write().insert(name.to_owned(), object);
        self.early_objects.lock().remove(name);
        self.early_factories.lock().remove(name);
        let mut order = self.order.lock();
        if !order.iter().any(|n| n == name) {
            order.push(name.to_owned());
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.objects.read().contains_key(name)
    }

    /// Singleton names in creation order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.objects.read().len()
    }

    pub(crate) fn register_disposable(&self, name: &str, callback: DestructionCallback) {
        self.disposables.lock().insert(name.to_owned(), callback);
    }

    pub(crate) fn is_owned_by_current_thread(&self, name: &str) -> bool {
        self.guard.is_owned_by_current_thread(name)
    }

    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        !self.in_creation_exclusions.lock().contains(name) && self.guard.is_in_creation(name)
    }

    pub(crate) fn is_excluded_from_creation_check(&self, name: &str) -> bool {
        self.in_creation_exclusions.lock().contains(name)
    }

    pub(crate) fn set_in_creation_exclusion(&self, name: &str, excluded: bool) {
        let mut exclusions = self.in_creation_exclusions.lock();
        if excluded {
            exclusions.insert(name.to_owned());
        } else {
            exclusions.remove(name);
        }
    }

    /// Destroys `name` after destroying everything that depends on it.
    pub(crate) fn destroy_singleton(&self, name: &str) {
        self.objects.write().remove(name);
        self.early_objects.lock().remove(name);
        self.early_factories.lock().remove(name);
        self.order.lock().retain(|n| n != name);
        self.products.remove(name);
        let disposable = self.disposables.lock().remove(name);
        self.destroy_with_dependents(name, disposable);
    }

    fn destroy_with_dependents(&self, name: &str, disposable: Option<DestructionCallback>) {
        let dependents = self.graph.take_dependents(name);
        if !dependents.is_empty() {
            tracing::debug!(
                target: "ferrous_beans",
                bean = %name,
                dependents = ?dependents,
                "destroying dependents first"
            );
        }
        for dependent in &dependents {
            self.destroy_singleton(dependent);
        }
        if let Some(callback) = disposable {
            run_guarded(name, callback);
        }
        self.graph.forget(name);
    }

    /// Destroys every singleton, dependents before their dependencies.
    ///
    /// Repeatedly picks the most recently created singleton that no live
    /// singleton depends on. Singletons stranded by a cycle fall back to
    /// reverse creation order.
    pub(crate) fn destroy_all(&self) {
        self.destroying.store(true, Ordering::Release);
        tracing::info!(target: "ferrous_beans", count = self.count(), "destroying singletons");

        loop {
            let live = self.order.lock().clone();
            let Some(last) = live.last() else {
                break;
            };
            let unconstrained = live
                .iter()
                .rev()
                .find(|n| !self.graph.dependents(n).iter().any(|d| live.contains(d)));
            let next = match unconstrained {
                Some(name) => name.clone(),
                None => {
                    tracing::warn!(
                        target: "ferrous_beans",
                        bean = %last,
                        "singletons depend on each other in a cycle, destroying in reverse creation order"
                    );
                    last.clone()
                }
            };
            self.destroy_singleton(&next);
        }

        let leftovers: Vec<(String, DestructionCallback)> = self.disposables.lock().drain().collect();
        for (name, callback) in leftovers {
            run_guarded(&name, callback);
        }

        self.objects.write().clear();
        self.early_objects.lock().clear();
        self.early_factories.lock().clear();
        self.products.clear();
        self.graph.clear();
        self.destroying.store(false, Ordering::Release);
    }
}

fn run_guarded(name: &str, callback: DestructionCallback) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::warn!(target: "ferrous_beans", bean = %name, "destruction of bean panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn obj<T: Send + Sync + 'static>(v: T) -> AnyArc {
        Arc::new(v)
    }

    #[test]
    fn failed_creation_is_not_cached() {
        let reg = SingletonRegistry::new(100);
        let err = reg.get_or_create("a", || Err(BeanError::invalid("a", "boom")));
        assert!(err.is_err());
        assert!(!reg.contains("a"));

        let ok = reg.get_or_create("a", || Ok(obj(1u8))).unwrap();
        assert!(Arc::ptr_eq(&ok, &reg.get("a", false).unwrap()));
    }

    #[test]
    fn reentrant_creation_without_early_reference_is_circular() {
        let reg = SingletonRegistry::new(101);
        let result = reg.get_or_create("a", || reg.get_or_create("a", || Ok(obj(()))));
        assert!(matches!(result, Err(BeanError::CircularReference { .. })));
    }

    #[test]
    fn early_reference_is_served_to_the_building_thread_only() {
        let reg = SingletonRegistry::new(102);
        let raw = obj(7u32);
        let result = reg.get_or_create("a", || {
            let r = raw.clone();
            reg.add_early_factory("a", Box::new(move || r));
            let early = reg.get("a", true).unwrap();
            assert!(Arc::ptr_eq(&early, &raw));
            assert!(reg.early_reference_taken("a").is_some());
            Ok(raw.clone())
        });
        assert!(result.is_ok());
        assert!(reg.early_reference_taken("a").is_none());
    }

    #[test]
    fn destroy_all_respects_dependents() {
        let reg = SingletonRegistry::new(103);
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["a", "b", "c"] {
            reg.register(name, obj(())).unwrap();
            let log = log.clone();
            reg.register_disposable(name, Box::new(move || log.lock().push(name)));
        }
        // b depends on c, a depends on b
        reg.graph().register_dependent("c", "b");
        reg.graph().register_dependent("b", "a");

        reg.destroy_all();

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(reg.count(), 0);
    }
}
