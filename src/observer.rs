//! Lifecycle observers for bean creation and destruction.
//!
//! Observers are notified synchronously from the creating thread. They see
//! every bean the factory builds, whatever its scope.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::BeanError;

/// Observer trait for bean lifecycle events.
///
/// Observer calls happen inside bean creation, so keep implementations
/// lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanError, BeanFactory, LifecycleObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl LifecycleObserver for Counter {
///     fn creating(&self, _name: &str) {}
///
///     fn created(&self, _name: &str, _elapsed: Duration) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
///
///     fn creation_failed(&self, _name: &str, _error: &BeanError) {}
/// }
///
/// let counter = Arc::new(Counter::default());
/// let factory = BeanFactory::new();
/// factory.add_observer(counter.clone());
/// factory
///     .register_definition("n", BeanDefinition::of(|_| Ok(0u8)).with_scope("prototype"))
///     .unwrap();
///
/// factory.get_bean("n").unwrap();
/// factory.get_bean("n").unwrap();
/// assert_eq!(counter.0.load(Ordering::SeqCst), 2);
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// A bean is about to be built.
    fn creating(&self, name: &str);

    /// A bean was built, `elapsed` after [`creating`](LifecycleObserver::creating).
    fn created(&self, name: &str, elapsed: Duration);

    /// Building a bean failed; the error propagates to the caller afterwards.
    fn creation_failed(&self, name: &str, error: &BeanError);

    /// A bean was destroyed.
    fn destroyed(&self, _name: &str) {}
}

/// Registered observers.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.write().push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        self.observers.read().clone()
    }

    pub(crate) fn creating(&self, name: &str) {
        for observer in self.observers.read().iter() {
            observer.creating(name);
        }
    }

    pub(crate) fn created(&self, name: &str, elapsed: Duration) {
        for observer in self.observers.read().iter() {
            observer.created(name, elapsed);
        }
    }

    pub(crate) fn creation_failed(&self, name: &str, error: &BeanError) {
        for observer in self.observers.read().iter() {
            observer.creation_failed(name, error);
        }
    }
}

/// Built-in observer that emits `tracing` events.
///
/// Creation goes out at `debug`, failures at `warn`.
///
/// ```
/// use ferrous_beans::{BeanFactory, TracingObserver};
/// use std::sync::Arc;
///
/// let factory = BeanFactory::new();
/// factory.add_observer(Arc::new(TracingObserver::new()));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleObserver for TracingObserver {
    fn creating(&self, name: &str) {
        tracing::debug!(target: "ferrous_beans", bean = %name, "creating bean");
    }

    fn created(&self, name: &str, elapsed: Duration) {
        tracing::debug!(target: "ferrous_beans", bean = %name, ?elapsed, "created bean");
    }

    fn creation_failed(&self, name: &str, error: &BeanError) {
        tracing::warn!(target: "ferrous_beans", bean = %name, %error, "bean creation failed");
    }

    fn destroyed(&self, name: &str) {
        tracing::debug!(target: "ferrous_beans", bean = %name, "destroyed bean");
    }
}
