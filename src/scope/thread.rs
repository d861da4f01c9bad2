//! A scope with one unit of work per thread.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::{DestructionCallback, Scope};
use crate::error::BeanResult;
use crate::internal::DisposeBag;
use crate::AnyArc;

#[derive(Default)]
struct Unit {
    objects: HashMap<String, AnyArc>,
    callbacks: DisposeBag,
}

/// Custom scope keeping one instance per bean per thread.
///
/// Objects live until [`end_current_unit`](ThreadScope::end_current_unit) is
/// called on their thread, which runs the registered destruction callbacks in
/// reverse registration order.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, ThreadScope};
/// use std::sync::Arc;
///
/// let scope = Arc::new(ThreadScope::new());
/// let factory = BeanFactory::new();
/// factory.register_scope("thread", scope.clone()).unwrap();
/// factory
///     .register_definition("buffer", BeanDefinition::of(|_| Ok(String::new())).with_scope("thread"))
///     .unwrap();
///
/// let here = factory.get_bean("buffer").unwrap();
/// assert!(Arc::ptr_eq(&here, &factory.get_bean("buffer").unwrap()));
///
/// let f = factory.clone();
/// let there = std::thread::spawn(move || f.get_bean("buffer").unwrap()).join().unwrap();
/// assert!(!Arc::ptr_eq(&here, &there));
///
/// scope.end_current_unit();
/// ```
#[derive(Default)]
pub struct ThreadScope {
    units: Mutex<HashMap<ThreadId, Unit>>,
}

impl ThreadScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the calling thread's unit: drops its objects and runs their
    /// destruction callbacks, last registered first.
    pub fn end_current_unit(&self) {
        let unit = self.units.lock().remove(&thread::current().id());
        if let Some(mut unit) = unit {
            tracing::debug!(
                target: "ferrous_beans",
                objects = unit.objects.len(),
                "ending thread scope unit"
            );
            unit.callbacks.run_all_reverse();
        }
    }

    /// Number of objects held for the calling thread.
    pub fn len(&self) -> usize {
        self.units
            .lock()
            .get(&thread::current().id())
            .map_or(0, |u| u.objects.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scope for ThreadScope {
    fn get(&self, name: &str, create: &mut dyn FnMut() -> BeanResult<AnyArc>) -> BeanResult<AnyArc> {
        let me = thread::current().id();
        if let Some(existing) = self.units.lock().get(&me).and_then(|u| u.objects.get(name)) {
            return Ok(existing.clone());
        }
        // Not holding the lock: creation may look up other thread-scoped beans
        let created = create()?;
        let mut units = self.units.lock();
        let unit = units.entry(me).or_default();
        Ok(unit.objects.entry(name.to_owned()).or_insert(created).clone())
    }

    fn remove(&self, name: &str) -> Option<AnyArc> {
        let mut units = self.units.lock();
        let unit = units.get_mut(&thread::current().id())?;
        drop(unit.callbacks.take(name));
        unit.objects.remove(name)
    }

    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback) {
        self.units
            .lock()
            .entry(thread::current().id())
            .or_default()
            .callbacks
            .push(name, callback);
    }

    fn conversation_id(&self) -> Option<String> {
        Some(format!("{:?}", thread::current().id()))
    }
}
