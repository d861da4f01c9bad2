//! Initialization and disposal traits.

use crate::error::BoxError;

/// Trait for objects that validate or finish setup once all properties are set.
///
/// Register it on a definition with
/// [`BeanDefinition::initializing`](crate::BeanDefinition::initializing).
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BoxError, Initialize};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Pool {
///     ready: AtomicBool,
/// }
///
/// impl Initialize for Pool {
///     fn after_properties_set(&self) -> Result<(), BoxError> {
///         self.ready.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let factory = BeanFactory::new();
/// factory
///     .register_definition("pool", BeanDefinition::of(|_| Ok(Pool::default())).initializing::<Pool>())
///     .unwrap();
/// let pool = factory.get::<Pool>("pool").unwrap();
/// assert!(pool.ready.load(Ordering::SeqCst));
/// ```
pub trait Initialize: Send + Sync + 'static {
    /// Called after property population, before the after-initialization
    /// post-processors. An error aborts the creation.
    fn after_properties_set(&self) -> Result<(), BoxError>;
}

/// Trait for synchronous resource disposal.
///
/// Implement this trait for objects that need structured teardown (flushing
/// caches, closing connections). Singletons are disposed in dependency order
/// by [`BeanFactory::destroy_singletons`](crate::BeanFactory::destroy_singletons).
/// A failing `dispose` is logged and does not stop the teardown.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BoxError, Dispose};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), BoxError> {
///         println!("Flushing cache: {}", self.name);
///         Ok(())
///     }
/// }
///
/// let factory = BeanFactory::new();
/// factory
///     .register_definition(
///         "cache",
///         BeanDefinition::of(|_| Ok(Cache { name: "user_cache".into() })).disposable::<Cache>(),
///     )
///     .unwrap();
/// factory.get_bean("cache").unwrap();
/// factory.destroy_singletons();
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> Result<(), BoxError>;
}
