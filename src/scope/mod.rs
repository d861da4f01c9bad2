//! Scope strategies and the scope registry.
//!
//! `"singleton"` and `"prototype"` are built into the factory. Every other
//! scope id maps to a user-registered [`Scope`] implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{BeanError, BeanResult};
use crate::AnyArc;

mod thread;

pub use thread::ThreadScope;

/// Scope id of beans shared for the factory's lifetime.
pub const SCOPE_SINGLETON: &str = "singleton";

/// Scope id of beans created anew on every lookup.
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// Cleanup to run when a scoped bean's unit of work ends.
pub type DestructionCallback = Box<dyn FnOnce() + Send>;

/// A custom scope: decides how many instances of a bean exist per unit of
/// work (a session, a request, a thread).
///
/// # Examples
///
/// ```
/// use ferrous_beans::{AnyArc, BeanDefinition, BeanFactory, BeanResult, DestructionCallback, Scope};
/// use std::collections::HashMap;
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct MapScope {
///     objects: Mutex<HashMap<String, AnyArc>>,
/// }
///
/// impl Scope for MapScope {
///     fn get(&self, name: &str, create: &mut dyn FnMut() -> BeanResult<AnyArc>) -> BeanResult<AnyArc> {
///         if let Some(existing) = self.objects.lock().unwrap().get(name) {
///             return Ok(existing.clone());
///         }
///         let created = create()?;
///         Ok(self.objects.lock().unwrap().entry(name.to_owned()).or_insert(created).clone())
///     }
///
///     fn remove(&self, name: &str) -> Option<AnyArc> {
///         self.objects.lock().unwrap().remove(name)
///     }
///
///     fn register_destruction_callback(&self, _name: &str, _callback: DestructionCallback) {}
/// }
///
/// let factory = BeanFactory::new();
/// factory.register_scope("session", Arc::new(MapScope::default())).unwrap();
/// factory
///     .register_definition("cart", BeanDefinition::of(|_| Ok(Vec::<u32>::new())).with_scope("session"))
///     .unwrap();
///
/// let a = factory.get_bean("cart").unwrap();
/// let b = factory.get_bean("cart").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub trait Scope: Send + Sync {
    /// Returns the object for `name` in the current unit, calling `create`
    /// when the unit has none yet.
    fn get(&self, name: &str, create: &mut dyn FnMut() -> BeanResult<AnyArc>) -> BeanResult<AnyArc>;

    /// Removes `name` from the current unit, dropping (not running) its
    /// destruction callback.
    fn remove(&self, name: &str) -> Option<AnyArc>;

    /// Registers cleanup to run when the current unit ends.
    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback);

    /// Resolves a contextual object by key, e.g. the current request.
    fn resolve_contextual_object(&self, _key: &str) -> Option<AnyArc> {
        None
    }

    /// Identifier of the current unit, if the scope has one.
    fn conversation_id(&self) -> Option<String> {
        None
    }
}

/// How a scope id dispatches.
pub(crate) enum ScopeKind {
    Singleton,
    Prototype,
    Custom(Arc<dyn Scope>),
}

#[derive(Default)]
pub(crate) struct ScopeRegistry {
    scopes: RwLock<HashMap<String, Arc<dyn Scope>>>,
}

impl ScopeRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: &str, scope: Arc<dyn Scope>) -> BeanResult<()> {
        if id == SCOPE_SINGLETON || id == SCOPE_PROTOTYPE {
            return Err(BeanError::conflict(id, "cannot replace a built-in scope"));
        }
        if id.is_empty() {
            return Err(BeanError::invalid(id, "scope id must not be empty"));
        }
        let mut scopes = self.scopes.write();
        if let Some(existing) = scopes.get(id) {
            if Arc::ptr_eq(existing, &scope) {
                return Ok(());
            }
            return Err(BeanError::conflict(id, "a different scope is already registered under this id"));
        }
        scopes.insert(id.to_owned(), scope);
        tracing::debug!(target: "ferrous_beans", scope = %id, "registered scope");
        Ok(())
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<dyn Scope>> {
        self.scopes.read().get(id).cloned()
    }

    /// Registered custom scope ids, sorted. Built-ins are not listed.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn resolve(&self, bean: &str, id: &str) -> BeanResult<ScopeKind> {
        match id {
            SCOPE_SINGLETON | "" => Ok(ScopeKind::Singleton),
            SCOPE_PROTOTYPE => Ok(ScopeKind::Prototype),
            other => self
                .get(other)
                .map(ScopeKind::Custom)
                .ok_or_else(|| BeanError::UnknownScope {
                    name: bean.to_owned(),
                    scope: other.to_owned(),
                }),
        }
    }

    /// Copies every scope of `other`, replacing same-named entries.
    pub(crate) fn copy_from(&self, other: &ScopeRegistry) {
        let copied: Vec<_> = other
            .scopes
            .read()
            .iter()
            .map(|(id, scope)| (id.clone(), scope.clone()))
            .collect();
        self.scopes.write().extend(copied);
    }
}
