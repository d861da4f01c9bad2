//! The bean factory.
//!
//! [`BeanFactory`] owns the definition store, alias table, scopes, singleton
//! cache, dependency graph and post-processor chain, and drives bean
//! creation and destruction through them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::alias::AliasRegistry;
use crate::config::FactoryConfig;
use crate::definition::store::{DefinitionStore, MergeEnv};
use crate::definition::{BeanDefinition, MergedDefinition};
use crate::error::{BeanError, BeanResult};
use crate::graph_export::GraphSnapshot;
use crate::internal::creation_stack;
use crate::observer::{LifecycleObserver, Observers};
use crate::post_processor::{BeanPostProcessor, PostProcessorPipeline};
use crate::resolver::{ConverterChain, ExpressionResolver, TypeConverter, ValueResolver};
use crate::scope::{Scope, ScopeRegistry};
use crate::singleton::SingletonRegistry;
use crate::type_hint::TypeHint;
use crate::AnyArc;

mod context;
mod create;
mod destroy;

pub use context::CreationContext;
use destroy::DisposableAdapter;

/// Prefix that dereferences a producer: `&name` is the producer itself,
/// `name` is its product.
pub const PRODUCER_PREFIX: &str = "&";

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

/// Name-based bean container.
///
/// Cloning is cheap and yields a handle to the same container.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory};
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// let factory = BeanFactory::new();
/// factory
///     .register_definition("db", BeanDefinition::of(|_| Ok(Database { url: "postgres://localhost".into() })))
///     .unwrap();
/// factory
///     .register_definition("users", BeanDefinition::of(|ctx| Ok(UserService { db: ctx.get("db")? })))
///     .unwrap();
/// factory.register_alias("users", "userService").unwrap();
///
/// let users = factory.get::<UserService>("userService").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// assert!(Arc::ptr_eq(&users, &factory.get::<UserService>("users").unwrap()));
///
/// factory.destroy_singletons();
/// ```
#[derive(Clone)]
pub struct BeanFactory {
    inner: Arc<FactoryInner>,
}

pub(crate) struct FactoryInner {
    id: u64,
    config: RwLock<FactoryConfig>,
    definitions: DefinitionStore,
    aliases: AliasRegistry,
    scopes: ScopeRegistry,
    singletons: SingletonRegistry,
    post_processors: PostProcessorPipeline,
    value_resolvers: RwLock<Vec<Arc<dyn ValueResolver>>>,
    expression_resolver: RwLock<Option<Arc<dyn ExpressionResolver>>>,
    type_converter: RwLock<Option<Arc<dyn TypeConverter>>>,
    parent: RwLock<Option<BeanFactory>>,
    observers: Observers,
}

impl BeanFactory {
    pub fn new() -> Self {
        Self::with_config(FactoryConfig::default())
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        let id = NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(FactoryInner {
                id,
                config: RwLock::new(config),
                definitions: DefinitionStore::new(),
                aliases: AliasRegistry::new(),
                scopes: ScopeRegistry::new(),
                singletons: SingletonRegistry::new(id),
                post_processors: PostProcessorPipeline::new(),
                value_resolvers: RwLock::new(Vec::new()),
                expression_resolver: RwLock::new(None),
                type_converter: RwLock::new(None),
                parent: RwLock::new(None),
                observers: Observers::new(),
            }),
        }
    }

    // ----- configuration -----

    /// A copy of the current configuration.
    pub fn config(&self) -> FactoryConfig {
        self.inner.config.read().clone()
    }

    /// Replaces the configuration. Affects beans created afterwards.
    pub fn set_config(&self, config: FactoryConfig) {
        *self.inner.config.write() = config;
    }

    /// Sets the parent factory consulted for names this factory does not
    /// define. The parent can only be set once.
    pub fn set_parent(&self, parent: BeanFactory) -> BeanResult<()> {
        let mut ancestor = Some(parent.clone());
        while let Some(current) = ancestor {
            if Arc::ptr_eq(&current.inner, &self.inner) {
                return Err(BeanError::IllegalState(
                    "a factory cannot be its own ancestor".to_owned(),
                ));
            }
            ancestor = current.parent();
        }
        let mut slot = self.inner.parent.write();
        if slot.is_some() {
            return Err(BeanError::IllegalState("parent factory already set".to_owned()));
        }
        *slot = Some(parent);
        Ok(())
    }

    pub fn parent(&self) -> Option<BeanFactory> {
        self.inner.parent.read().clone()
    }

    /// Copies configuration, scopes, post-processors, value resolvers, the
    /// expression resolver and the type converter from `other`. Definitions
    /// and singletons are not copied.
    pub fn copy_configuration_from(&self, other: &BeanFactory) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        self.set_config(other.config());
        self.inner.scopes.copy_from(&other.inner.scopes);
        self.inner.post_processors.copy_from(&other.inner.post_processors);
        let resolvers = other.inner.value_resolvers.read().clone();
        self.inner.value_resolvers.write().extend(resolvers);
        if let Some(expr) = other.expression_resolver() {
            self.set_expression_resolver(expr);
        }
        if let Some(converter) = other.inner.type_converter.read().clone() {
            self.set_type_converter(converter);
        }
    }

    // ----- definitions -----

    /// Registers `definition` under `name`.
    ///
    /// Replacing an existing definition requires
    /// [`allow_definition_overriding`](FactoryConfig::allow_definition_overriding),
    /// is rejected once the configuration is frozen, and destroys the live
    /// singleton of that name and of every child definition.
    pub fn register_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        if name.is_empty() || name.starts_with(PRODUCER_PREFIX) {
            return Err(BeanError::invalid(name, "bean names must be non-empty and must not start with '&'"));
        }
        if !definition.has_recipe() && definition.parent().is_none() && !definition.is_abstract() {
            return Err(BeanError::invalid(name, "definition has neither a supplier nor a parent"));
        }

        let allow_overriding = self.inner.config.read().allow_definition_overriding;
        if self.inner.aliases.is_alias(name) {
            if !allow_overriding {
                return Err(BeanError::conflict(name, "the name is already used as an alias"));
            }
            self.inner.aliases.remove(name)?;
        }

        let canonical = |n: &str| self.inner.aliases.canonical_name(n);
        let registered = self
            .inner
            .definitions
            .register(name, definition, allow_overriding, &canonical)?;

        if registered.replaced || self.inner.singletons.contains(name) {
            tracing::debug!(target: "ferrous_beans", bean = %name, "overriding bean definition");
            for reset in &registered.reset {
                self.inner.singletons.destroy_singleton(reset);
            }
        } else {
            tracing::debug!(target: "ferrous_beans", bean = %name, "registered bean definition");
        }
        Ok(())
    }

    /// Removes the definition of `name` and destroys its singleton and those
    /// of its child definitions.
    pub fn remove_definition(&self, name: &str) -> BeanResult<()> {
        let canonical = |n: &str| self.inner.aliases.canonical_name(n);
        let reset = self.inner.definitions.remove(name, &canonical)?;
        for name in &reset {
            self.inner.singletons.destroy_singleton(name);
        }
        Ok(())
    }

    /// The raw definition registered under `name` (or an alias of it).
    pub fn get_definition(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        self.inner.definitions.get(&self.canonical_name(name))
    }

    /// `true` if this factory (not its parent) defines `name`.
    pub fn contains_definition(&self, name: &str) -> bool {
        self.inner.definitions.contains(&self.canonical_name(name))
    }

    /// Definition names in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.definitions.names()
    }

    pub fn definition_count(&self) -> usize {
        self.inner.definitions.count()
    }

    /// The definition of `name` merged with its parent chain, falling back
    /// to the parent factory for names not defined here.
    pub fn get_merged_definition(&self, name: &str) -> BeanResult<Arc<MergedDefinition>> {
        let name = self.canonical_name(name);
        if !self.inner.definitions.contains(&name) {
            if let Some(parent) = self.parent() {
                return parent.get_merged_definition(&name);
            }
            return Err(BeanError::not_found(name));
        }
        self.local_merged(&name)
    }

    pub(crate) fn local_merged(&self, name: &str) -> BeanResult<Arc<MergedDefinition>> {
        let canonical = |n: &str| self.inner.aliases.canonical_name(n);
        let external = |n: &str| match self.parent() {
            Some(parent) => parent.get_merged_definition(n),
            None => Err(BeanError::not_found(n)),
        };
        let env = MergeEnv {
            canonical: &canonical,
            external: &external,
            cache: self.inner.config.read().cache_bean_metadata,
        };
        self.inner.definitions.merged(name, &env)
    }

    /// Drops cached merged definitions of beans not created yet. A no-op
    /// once the configuration is frozen.
    pub fn clear_metadata_cache(&self) {
        self.inner.definitions.clear_merged_cache();
    }

    /// Seals the definitions: existing ones can no longer be overridden or
    /// removed and merged definitions stay cached.
    pub fn freeze_configuration(&self) {
        self.inner.definitions.freeze();
        tracing::debug!(target: "ferrous_beans", "configuration frozen");
    }

    pub fn is_configuration_frozen(&self) -> bool {
        self.inner.definitions.is_frozen()
    }

    // ----- aliases -----

    /// Registers `alias` as another name for `name`.
    pub fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        if alias != name && self.inner.definitions.contains(alias) {
            return Err(BeanError::conflict(alias, "a bean definition is registered under this name"));
        }
        self.inner.aliases.register(name, alias)
    }

    pub fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.inner.aliases.remove(alias)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.inner.aliases.is_alias(name)
    }

    /// Every other name `name` is known by: its aliases and, if `name` is
    /// itself an alias, the canonical name.
    pub fn get_aliases(&self, name: &str) -> Vec<String> {
        let bare = strip_prefix(name).1;
        let canonical = self.inner.aliases.canonical_name(bare);
        let mut names = self.inner.aliases.aliases_of(&canonical);
        if canonical != bare {
            names.push(canonical);
        }
        names.retain(|n| n != bare);
        names
    }

    /// Rewrites alias names and targets through `resolver`, e.g. to expand
    /// placeholders in them.
    pub fn resolve_aliases(&self, resolver: &dyn ValueResolver) -> BeanResult<()> {
        self.inner.aliases.resolve_all(resolver)
    }

    /// `name` with any `&` prefix removed and aliases resolved.
    pub fn canonical_name(&self, name: &str) -> String {
        self.inner.aliases.canonical_name(strip_prefix(name).1)
    }

    /// Whether `name` dereferences a producer, plus its canonical name.
    pub(crate) fn transformed(&self, name: &str) -> (bool, String) {
        let (deref, bare) = strip_prefix(name);
        (deref, self.inner.aliases.canonical_name(bare))
    }

    // ----- scopes, hooks, resolvers -----

    /// Registers a custom scope. `"singleton"` and `"prototype"` are reserved.
    pub fn register_scope(&self, id: &str, scope: Arc<dyn Scope>) -> BeanResult<()> {
        self.inner.scopes.register(id, scope)
    }

    pub fn registered_scope(&self, id: &str) -> Option<Arc<dyn Scope>> {
        self.inner.scopes.get(id)
    }

    /// Custom scope ids, sorted; built-ins are not listed.
    pub fn registered_scope_names(&self) -> Vec<String> {
        self.inner.scopes.names()
    }

    /// Appends a post-processor. Adding the same processor again moves it
    /// to the end.
    pub fn add_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.inner.post_processors.add(processor);
    }

    /// Adds a processor found by surrounding infrastructure. Discovered
    /// processors always run after programmatically added ones.
    pub fn register_discovered_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.inner.post_processors.add_discovered(processor);
    }

    pub fn post_processor_count(&self) -> usize {
        self.inner.post_processors.len()
    }

    pub fn add_embedded_value_resolver(&self, resolver: Arc<dyn ValueResolver>) {
        self.inner.value_resolvers.write().push(resolver);
    }

    pub fn has_embedded_value_resolver(&self) -> bool {
        !self.inner.value_resolvers.read().is_empty()
    }

    /// Runs `value` through the embedded value resolvers in order. `None`
    /// if a resolver drops the value.
    pub fn resolve_embedded_value(&self, value: &str) -> Option<String> {
        let resolvers = self.inner.value_resolvers.read().clone();
        let mut result = value.to_owned();
        for resolver in resolvers {
            result = resolver.resolve_value(&result)?;
        }
        Some(result)
    }

    pub fn set_expression_resolver(&self, resolver: Arc<dyn ExpressionResolver>) {
        *self.inner.expression_resolver.write() = Some(resolver);
    }

    pub fn expression_resolver(&self) -> Option<Arc<dyn ExpressionResolver>> {
        self.inner.expression_resolver.read().clone()
    }

    /// Installs a converter tried before the built-in conversions.
    pub fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.inner.type_converter.write() = Some(converter);
    }

    pub(crate) fn converter_chain(&self) -> ConverterChain {
        ConverterChain {
            custom: self.inner.type_converter.read().clone(),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        self.inner.observers.add(observer);
    }

    // ----- singletons -----

    /// Registers an already built object as a singleton.
    pub fn register_singleton(&self, name: &str, object: AnyArc) -> BeanResult<()> {
        self.inner.singletons.register(&self.canonical_name(name), object)
    }

    /// Typed [`register_singleton`](BeanFactory::register_singleton).
    pub fn register_singleton_typed<T: Send + Sync + 'static>(&self, name: &str, object: Arc<T>) -> BeanResult<()> {
        self.register_singleton(name, object)
    }

    /// The cached singleton object of `name`, without creating it.
    pub fn get_singleton(&self, name: &str) -> Option<AnyArc> {
        self.inner.singletons.get(&self.canonical_name(name), true)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.inner.singletons.contains(&self.canonical_name(name))
    }

    /// Names of live singletons in creation order.
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.singletons.names()
    }

    pub fn singleton_count(&self) -> usize {
        self.inner.singletons.count()
    }

    /// `true` while `name` is being built, on any thread for singletons and
    /// on the calling thread for other scopes.
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        let name = self.canonical_name(name);
        if self.inner.singletons.is_excluded_from_creation_check(&name) {
            return false;
        }
        self.inner.singletons.is_in_creation(&name)
            || creation_stack::is_independent_in_creation(self.inner.id, &name)
    }

    /// Passing `false` excludes `name` from in-creation reporting; `true`
    /// lifts the exclusion.
    pub fn set_currently_in_creation(&self, name: &str, in_creation: bool) {
        self.inner
            .singletons
            .set_in_creation_exclusion(&self.canonical_name(name), !in_creation);
    }

    // ----- dependencies -----

    /// Records that `dependent` depends on `name`.
    pub fn register_dependent_bean(&self, name: &str, dependent: &str) {
        let name = self.canonical_name(name);
        let dependent = self.canonical_name(dependent);
        self.inner.singletons.graph().register_dependent(&name, &dependent);
    }

    /// Beans depending on `name`.
    pub fn dependent_beans(&self, name: &str) -> Vec<String> {
        self.inner.singletons.graph().dependents(&self.canonical_name(name))
    }

    /// Beans `name` depends on.
    pub fn dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.inner.singletons.graph().dependencies(&self.canonical_name(name))
    }

    /// Snapshot of definitions, live singletons and dependency edges.
    pub fn dependency_graph(&self) -> GraphSnapshot {
        GraphSnapshot::capture(self)
    }

    pub(crate) fn dependency_edges(&self) -> Vec<(String, String)> {
        self.inner.singletons.graph().snapshot()
    }

    // ----- lookups -----

    /// `true` if `name` resolves to a definition or singleton here or in an
    /// ancestor factory.
    pub fn contains_bean(&self, name: &str) -> bool {
        let (deref, canonical) = self.transformed(name);
        if self.inner.singletons.contains(&canonical) || self.inner.definitions.contains(&canonical) {
            return !deref || self.is_producer(name).unwrap_or(false);
        }
        self.parent().is_some_and(|p| p.contains_bean(&original_name(deref, &canonical)))
    }

    /// `true` if `name` is defined or registered in this factory itself.
    pub fn contains_local_bean(&self, name: &str) -> bool {
        let (deref, canonical) = self.transformed(name);
        (self.inner.singletons.contains(&canonical) || self.inner.definitions.contains(&canonical))
            && (!deref || self.is_producer(name).unwrap_or(false))
    }

    /// Returns `true` if lookups of `name` always yield the same object.
    ///
    /// For producer-backed names this is the producer's own answer, which may
    /// require building the producer. For `&name` it is the definition scope.
    pub fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        let (deref, canonical) = self.transformed(name);
        if let Some(object) = self.inner.singletons.get(&canonical, false) {
            return Ok(match self.producer_of(&canonical, &object) {
                Some(producer) => deref || producer.is_singleton(),
                None => !deref,
            });
        }
        if !self.inner.definitions.contains(&canonical) {
            return match self.parent() {
                Some(parent) => parent.is_singleton(&original_name(deref, &canonical)),
                None => Err(BeanError::not_found(canonical)),
            };
        }
        let merged = self.local_merged(&canonical)?;
        if !merged.is_singleton() {
            return Ok(false);
        }
        if !merged.is_producer() {
            return Ok(!deref);
        }
        if deref {
            return Ok(true);
        }
        let producer_object = self.get_bean(&original_name(true, &canonical))?;
        Ok(self
            .producer_of(&canonical, &producer_object)
            .is_some_and(|p| p.is_singleton()))
    }

    /// Returns `true` if every lookup of `name` yields a fresh object.
    pub fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        let (deref, canonical) = self.transformed(name);
        if !self.inner.definitions.contains(&canonical) {
            if self.inner.singletons.contains(&canonical) {
                return Ok(false);
            }
            return match self.parent() {
                Some(parent) => parent.is_prototype(&original_name(deref, &canonical)),
                None => Err(BeanError::not_found(canonical)),
            };
        }
        let merged = self.local_merged(&canonical)?;
        if merged.is_prototype() {
            return Ok(!deref || merged.is_producer());
        }
        if deref || !merged.is_producer() || !merged.is_singleton() {
            return Ok(false);
        }
        let producer_object = self.get_bean(&original_name(true, &canonical))?;
        Ok(self
            .producer_of(&canonical, &producer_object)
            .is_some_and(|p| !p.is_singleton()))
    }

    /// `true` if the bean object of `name` is a producer.
    pub fn is_producer(&self, name: &str) -> BeanResult<bool> {
        let canonical = self.canonical_name(name);
        if let Some(object) = self.inner.singletons.get(&canonical, false) {
            return Ok(self.producer_of(&canonical, &object).is_some());
        }
        if !self.inner.definitions.contains(&canonical) {
            return match self.parent() {
                Some(parent) => parent.is_producer(&canonical),
                None => Err(BeanError::not_found(canonical)),
            };
        }
        Ok(self.local_merged(&canonical)?.is_producer())
    }

    /// The type `get_bean(name)` would return, if it can be determined.
    ///
    /// For producers this tries, in order: the
    /// [`PRODUCER_TYPE_ATTRIBUTE`](crate::PRODUCER_TYPE_ATTRIBUTE) of the
    /// definition, an existing producer instance, and, if
    /// [`allow_eager_type_init`](FactoryConfig::allow_eager_type_init) is set,
    /// building the producer.
    pub fn get_type(&self, name: &str) -> BeanResult<Option<TypeHint>> {
        let (deref, canonical) = self.transformed(name);
        let has_definition = self.inner.definitions.contains(&canonical);

        if let Some(object) = self.inner.singletons.get(&canonical, false) {
            let producer = self.producer_of(&canonical, &object);
            if !deref {
                if let Some(producer) = producer {
                    return Ok(producer.object_type());
                }
            } else if producer.is_none() {
                return Ok(None);
            }
            if !has_definition {
                return Ok(None);
            }
            return Ok(self.local_merged(&canonical)?.bean_type());
        }

        if !has_definition {
            return match self.parent() {
                Some(parent) => parent.get_type(&original_name(deref, &canonical)),
                None => Err(BeanError::not_found(canonical)),
            };
        }

        let merged = self.local_merged(&canonical)?;
        if !merged.is_producer() {
            return Ok(if deref { None } else { merged.bean_type() });
        }
        if deref {
            return Ok(merged.bean_type());
        }
        if let Some(hint) = merged.product_type_hint() {
            return Ok(Some(hint));
        }
        if !self.inner.config.read().allow_eager_type_init {
            return Ok(None);
        }
        let producer_object = self.get_bean(&original_name(true, &canonical))?;
        Ok(self
            .producer_of(&canonical, &producer_object)
            .and_then(|p| p.object_type()))
    }

    /// Looks up `name`, creating the bean as its scope requires.
    ///
    /// Accepts canonical names, aliases and `&name` for producers.
    pub fn get_bean(&self, name: &str) -> BeanResult<AnyArc> {
        self.do_get_bean(name)
    }

    /// Typed [`get_bean`](BeanFactory::get_bean).
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<T>> {
        let object = self.get_bean(name)?;
        object.downcast::<T>().map_err(|_| BeanError::TypeMismatch {
            name: name.to_owned(),
            expected: std::any::type_name::<T>(),
        })
    }

    // ----- lifecycle -----

    /// Creates every non-lazy, non-abstract singleton, in registration order.
    ///
    /// Producers are built too, and their products as well when the
    /// producer asks for eager initialization. The first failure stops the
    /// sweep; singletons created before it stay live.
    pub fn pre_instantiate_singletons(&self) -> BeanResult<()> {
        let names = self.inner.definitions.names();
        tracing::info!(target: "ferrous_beans", definitions = names.len(), "pre-instantiating singletons");
        for name in names {
            let merged = self.local_merged(&name)?;
            if merged.is_abstract() || !merged.is_singleton() || merged.is_lazy_init() {
                continue;
            }
            if merged.is_producer() {
                let producer_object = self.get_bean(&original_name(true, &name))?;
                let eager = self
                    .producer_of(&name, &producer_object)
                    .is_some_and(|p| p.is_eager_init());
                if eager {
                    self.get_bean(&name)?;
                }
            } else {
                self.get_bean(&name)?;
            }
        }
        Ok(())
    }

    /// Runs the destruction callbacks of `name`'s definition on `instance`,
    /// typically a prototype the caller is done with. Failures are logged.
    pub fn destroy_bean(&self, name: &str, instance: AnyArc) {
        let canonical = self.canonical_name(name);
        let merged = if self.inner.definitions.contains(&canonical) {
            self.local_merged(&canonical).ok()
        } else {
            None
        };
        self.destroy_instance(&canonical, instance, merged.as_deref());
    }

    fn destroy_instance(&self, name: &str, instance: AnyArc, merged: Option<&MergedDefinition>) {
        let processors = self.inner.post_processors.snapshot();
        let adapter = DisposableAdapter::new(name, instance, merged, &processors, self.inner.observers.snapshot());
        if let Some(adapter) = adapter {
            if panic::catch_unwind(AssertUnwindSafe(|| adapter.destroy())).is_err() {
                tracing::warn!(target: "ferrous_beans", bean = %name, "destruction of bean panicked");
            }
        }
    }

    /// Removes `name` from its custom scope and destroys it.
    pub fn destroy_scoped_bean(&self, name: &str) -> BeanResult<()> {
        let canonical = self.canonical_name(name);
        let merged = self.local_merged(&canonical)?;
        if merged.is_singleton() || merged.is_prototype() {
            return Err(BeanError::IllegalState(format!(
                "bean '{canonical}' is not in a custom scope"
            )));
        }
        let scope = self
            .inner
            .scopes
            .get(merged.scope())
            .ok_or_else(|| BeanError::UnknownScope {
                name: canonical.clone(),
                scope: merged.scope().to_owned(),
            })?;
        if let Some(object) = scope.remove(&canonical) {
            self.destroy_instance(&canonical, object, Some(&merged));
        }
        Ok(())
    }

    /// Destroys one singleton, destroying the beans that depend on it first.
    pub fn destroy_singleton(&self, name: &str) {
        self.inner.singletons.destroy_singleton(&self.canonical_name(name));
    }

    /// Destroys every singleton in dependency order and clears the cache.
    /// Individual failures are logged and do not stop the sweep.
    pub fn destroy_singletons(&self) {
        self.inner.singletons.destroy_all();
    }
}

impl Default for BeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BeanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanFactory")
            .field("id", &self.inner.id)
            .field("definitions", &self.inner.definitions.count())
            .field("singletons", &self.inner.singletons.count())
            .field("frozen", &self.inner.definitions.is_frozen())
            .field("has_parent", &self.inner.parent.read().is_some())
            .finish()
    }
}

/// Splits off any `&` prefixes.
fn strip_prefix(name: &str) -> (bool, &str) {
    let bare = name.trim_start_matches(PRODUCER_PREFIX);
    (bare.len() != name.len(), bare)
}

fn original_name(deref: bool, canonical: &str) -> String {
    if deref {
        format!("{PRODUCER_PREFIX}{canonical}")
    } else {
        canonical.to_owned()
    }
}
