//! Bean definitions: the declarative recipe for building a named object.
//!
//! A [`BeanDefinition`] is built with a consuming builder and registered on a
//! [`BeanFactory`](crate::BeanFactory). Definitions may name a parent
//! definition; the factory resolves the parent chain into a
//! [`MergedDefinition`] before creating the bean.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BeanError, BoxError};
use crate::factory::CreationContext;
use crate::producer::Producer;
use crate::scope::{SCOPE_PROTOTYPE, SCOPE_SINGLETON};
use crate::traits::{Dispose, Initialize};
use crate::type_hint::TypeHint;
use crate::AnyArc;

mod merge;
pub(crate) mod store;
mod value;

pub use value::{PropertyArg, PropertyValues, ResolvedValue, Value};

/// Attribute carrying the product type of a producer definition, so that
/// type lookups do not need to instantiate the producer.
pub const PRODUCER_TYPE_ATTRIBUTE: &str = "factoryBeanObjectType";

pub(crate) type SupplierFn =
    Arc<dyn Fn(&CreationContext<'_>) -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type ProducerAdapter = Arc<dyn Fn(&AnyArc) -> Option<Arc<dyn Producer>> + Send + Sync>;
pub(crate) type BinderFn =
    Arc<dyn Fn(&AnyArc, &PropertyArg<'_>) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type CallbackFn = Arc<dyn Fn(&str, &AnyArc) -> Result<(), BoxError> + Send + Sync>;

/// How to instantiate the bean. Supplier, producer adapter and type travel
/// together so a child definition overrides all three at once.
#[derive(Clone)]
pub(crate) struct Recipe {
    pub(crate) supplier: SupplierFn,
    pub(crate) producer: Option<ProducerAdapter>,
    pub(crate) bean_type: TypeHint,
}

/// Value of a definition attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Type(TypeHint),
    Flag(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<TypeHint> for AttributeValue {
    fn from(value: TypeHint) -> Self {
        AttributeValue::Type(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Flag(value)
    }
}

/// Declarative description of how to build a bean.
///
/// Scalar settings left unset inherit from the parent definition when the
/// definition is merged. Collections merge key by key, child entries winning.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, Value};
/// use std::sync::{Arc, OnceLock};
///
/// struct Repository;
///
/// #[derive(Default)]
/// struct Service {
///     repo: OnceLock<Arc<Repository>>,
///     name: OnceLock<String>,
/// }
///
/// let factory = BeanFactory::new();
/// factory.register_definition("repo", BeanDefinition::of(|_| Ok(Repository))).unwrap();
/// factory
///     .register_definition(
///         "service",
///         BeanDefinition::of(|_| Ok(Service::default()))
///             .with_property("repo", Value::reference("repo"))
///             .with_property("name", "orders")
///             .bind_with::<Service, _>(|service, prop| {
///                 match prop.name() {
///                     "repo" => { let _ = service.repo.set(prop.bean()?); }
///                     "name" => { let _ = service.name.set(prop.get()?); }
///                     _ => {}
///                 }
///                 Ok(())
///             }),
///     )
///     .unwrap();
///
/// let service = factory.get::<Service>("service").unwrap();
/// assert_eq!(service.name.get().map(String::as_str), Some("orders"));
/// assert!(service.repo.get().is_some());
/// ```
#[derive(Clone, Default)]
pub struct BeanDefinition {
    parent: Option<String>,
    bean_type: Option<TypeHint>,
    scope: Option<String>,
    lazy_init: Option<bool>,
    early_reference: Option<bool>,
    is_abstract: bool,
    description: Option<String>,
    depends_on: Vec<String>,
    properties: PropertyValues,
    constructor_args: BTreeMap<usize, Value>,
    attributes: BTreeMap<String, AttributeValue>,
    recipe: Option<Recipe>,
    binder: Option<BinderFn>,
    init: Option<CallbackFn>,
    destroy: Option<CallbackFn>,
}

impl BeanDefinition {
    /// An empty definition, typically a child that inherits its recipe from
    /// a parent or an abstract template.
    pub fn new() -> Self {
        Self::default()
    }

    /// A definition built by `supplier`.
    pub fn of<T, F>(supplier: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&CreationContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let supplier: SupplierFn = Arc::new(move |ctx: &CreationContext<'_>| {
            supplier(ctx).map(|t| Arc::new(t) as AnyArc)
        });
        Self {
            bean_type: Some(TypeHint::of::<T>()),
            recipe: Some(Recipe {
                supplier,
                producer: None,
                bean_type: TypeHint::of::<T>(),
            }),
            ..Self::default()
        }
    }

    /// A definition whose object is a [`Producer`]. Looking the bean up by
    /// name yields the producer's product; `&name` yields the producer.
    pub fn producer<P, F>(supplier: F) -> Self
    where
        P: Producer,
        F: Fn(&CreationContext<'_>) -> Result<P, BoxError> + Send + Sync + 'static,
    {
        let supplier: SupplierFn = Arc::new(move |ctx: &CreationContext<'_>| {
            supplier(ctx).map(|p| Arc::new(p) as AnyArc)
        });
        let producer: ProducerAdapter = Arc::new(|object: &AnyArc| {
            object
                .clone()
                .downcast::<P>()
                .ok()
                .map(|p| p as Arc<dyn Producer>)
        });
        Self {
            bean_type: Some(TypeHint::of::<P>()),
            recipe: Some(Recipe {
                supplier,
                producer: Some(producer),
                bean_type: TypeHint::of::<P>(),
            }),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Scope id: `"singleton"`, `"prototype"`, or a registered custom scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_lazy_init(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    /// Opts a singleton into handing out an early reference to itself while
    /// it is still being populated, which lets setter-level cycles resolve.
    pub fn with_early_reference(mut self, allow: bool) -> Self {
        self.early_reference = Some(allow);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Beans that must be created (and destroyed after) this one.
    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.depends_on.contains(&name) {
                self.depends_on.push(name);
            }
        }
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.add(name, value);
        self
    }

    pub fn with_constructor_arg(mut self, index: usize, value: impl Into<Value>) -> Self {
        self.constructor_args.insert(index, value.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Declares the bean type without a recipe, e.g. on an abstract template.
    pub fn with_type<T: ?Sized + 'static>(mut self) -> Self {
        self.bean_type = Some(TypeHint::of::<T>());
        self
    }

    /// Declares the product type of a producer definition.
    pub fn with_product_type<T: ?Sized + 'static>(self) -> Self {
        self.with_attribute(PRODUCER_TYPE_ATTRIBUTE, TypeHint::of::<T>())
    }

    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Sets the property binder, called once per property value after
    /// instantiation. The bean must be a `T`.
    pub fn bind_with<T, F>(mut self, binder: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &PropertyArg<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.binder = Some(Arc::new(move |object: &AnyArc, prop: &PropertyArg<'_>| {
            let target = object
                .downcast_ref::<T>()
                .ok_or_else(|| mismatch::<T>(prop.bean_name()))?;
            binder(target, prop)
        }));
        self
    }

    /// Sets a custom init callback, run after property population.
    pub fn init_with<T, F>(mut self, init: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.init = Some(typed_callback(init));
        self
    }

    /// Sets a custom destroy callback, run when the bean is destroyed.
    pub fn destroy_with<T, F>(mut self, destroy: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.destroy = Some(typed_callback(destroy));
        self
    }

    /// Uses [`Initialize::after_properties_set`] as the init callback.
    pub fn initializing<T: Initialize>(self) -> Self {
        self.init_with::<T, _>(|bean| bean.after_properties_set())
    }

    /// Uses [`Dispose::dispose`] as the destroy callback.
    pub fn disposable<T: Dispose>(self) -> Self {
        self.destroy_with::<T, _>(|bean| bean.dispose())
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn bean_type(&self) -> Option<TypeHint> {
        self.bean_type
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn is_lazy_init(&self) -> Option<bool> {
        self.lazy_init
    }

    pub fn allows_early_reference(&self) -> Option<bool> {
        self.early_reference
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn properties(&self) -> &PropertyValues {
        &self.properties
    }

    pub fn constructor_args(&self) -> &BTreeMap<usize, Value> {
        &self.constructor_args
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Returns `true` if the definition carries its own instantiation recipe.
    pub fn has_recipe(&self) -> bool {
        self.recipe.is_some()
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("parent", &self.parent)
            .field("bean_type", &self.bean_type)
            .field("scope", &self.scope)
            .field("lazy_init", &self.lazy_init)
            .field("abstract", &self.is_abstract)
            .field("depends_on", &self.depends_on)
            .field("properties", &self.properties)
            .field("constructor_args", &self.constructor_args)
            .field("attributes", &self.attributes)
            .field("has_recipe", &self.recipe.is_some())
            .finish_non_exhaustive()
    }
}

fn mismatch<T>(bean: &str) -> BoxError {
    Box::new(BeanError::TypeMismatch {
        name: bean.to_owned(),
        expected: std::any::type_name::<T>(),
    })
}

fn typed_callback<T, F>(callback: F) -> CallbackFn
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(move |name: &str, object: &AnyArc| {
        let target = object.downcast_ref::<T>().ok_or_else(|| mismatch::<T>(name))?;
        callback(target)
    })
}

/// A definition resolved against its whole parent chain.
///
/// Every setting is concrete here. Merged definitions are shared as
/// `Arc<MergedDefinition>` and never change once built.
#[derive(Clone)]
pub struct MergedDefinition {
    pub(crate) name: String,
    pub(crate) bean_type: Option<TypeHint>,
    pub(crate) scope: String,
    pub(crate) lazy_init: bool,
    pub(crate) early_reference: bool,
    pub(crate) is_abstract: bool,
    pub(crate) description: Option<String>,
    pub(crate) depends_on: Vec<String>,
    pub(crate) properties: PropertyValues,
    pub(crate) constructor_args: BTreeMap<usize, Value>,
    pub(crate) attributes: BTreeMap<String, AttributeValue>,
    pub(crate) recipe: Option<Recipe>,
    pub(crate) binder: Option<BinderFn>,
    pub(crate) init: Option<CallbackFn>,
    pub(crate) destroy: Option<CallbackFn>,
}

impl MergedDefinition {
    /// The bean name this definition was merged for.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bean_type(&self) -> Option<TypeHint> {
        self.bean_type
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == SCOPE_SINGLETON
    }

    pub fn is_prototype(&self) -> bool {
        self.scope == SCOPE_PROTOTYPE
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn allows_early_reference(&self) -> bool {
        self.early_reference
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn properties(&self) -> &PropertyValues {
        &self.properties
    }

    pub fn constructor_args(&self) -> &BTreeMap<usize, Value> {
        &self.constructor_args
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Returns `true` if the bean object is a producer of another object.
    pub fn is_producer(&self) -> bool {
        self.recipe.as_ref().is_some_and(|r| r.producer.is_some())
    }

    /// The product type declared through [`PRODUCER_TYPE_ATTRIBUTE`].
    pub fn product_type_hint(&self) -> Option<TypeHint> {
        match self.attributes.get(PRODUCER_TYPE_ATTRIBUTE) {
            Some(AttributeValue::Type(hint)) => Some(*hint),
            _ => None,
        }
    }

    pub(crate) fn producer_of(&self, object: &AnyArc) -> Option<Arc<dyn Producer>> {
        self.recipe
            .as_ref()
            .and_then(|r| r.producer.as_ref())
            .and_then(|adapter| adapter(object))
    }
}

impl fmt::Debug for MergedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedDefinition")
            .field("name", &self.name)
            .field("bean_type", &self.bean_type)
            .field("scope", &self.scope)
            .field("lazy_init", &self.lazy_init)
            .field("early_reference", &self.early_reference)
            .field("abstract", &self.is_abstract)
            .field("depends_on", &self.depends_on)
            .field("properties", &self.properties)
            .field("producer", &self.is_producer())
            .finish_non_exhaustive()
    }
}
