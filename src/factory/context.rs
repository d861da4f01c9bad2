//! Context handed to bean suppliers.

use std::sync::Arc;

use super::BeanFactory;
use crate::definition::{MergedDefinition, PropertyArg, ResolvedValue};
use crate::error::{BeanError, BeanResult};
use crate::resolver::ConverterChain;
use crate::AnyArc;

/// What a supplier sees while its bean is being instantiated.
///
/// Lookups through the context record the looked-up bean as a dependency of
/// the bean being built, so teardown destroys this bean first. A lookup that
/// leads back to the bean being built is a constructor-level cycle and fails
/// with `CircularReference`.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory};
/// use std::sync::Arc;
///
/// struct Config {
///     url: String,
/// }
///
/// struct Client {
///     config: Arc<Config>,
///     retries: u32,
/// }
///
/// let factory = BeanFactory::new();
/// factory
///     .register_definition("config", BeanDefinition::of(|_| Ok(Config { url: "http://api".into() })))
///     .unwrap();
/// factory
///     .register_definition(
///         "client",
///         BeanDefinition::of(|ctx| {
///             Ok(Client {
///                 config: ctx.get::<Config>("config")?,
///                 retries: ctx.arg(0)?,
///             })
///         })
///         .with_constructor_arg(0, "3"),
///     )
///     .unwrap();
///
/// let client = factory.get::<Client>("client").unwrap();
/// assert_eq!(client.config.url, "http://api");
/// assert_eq!(client.retries, 3);
/// assert_eq!(factory.dependencies_for_bean("client"), vec!["config"]);
/// ```
pub struct CreationContext<'a> {
    factory: &'a BeanFactory,
    name: &'a str,
    definition: &'a MergedDefinition,
    converter: ConverterChain,
}

impl<'a> CreationContext<'a> {
    pub(crate) fn new(factory: &'a BeanFactory, name: &'a str, definition: &'a MergedDefinition) -> Self {
        Self {
            factory,
            name,
            definition,
            converter: factory.converter_chain(),
        }
    }

    /// Name of the bean being built.
    pub fn bean_name(&self) -> &str {
        self.name
    }

    /// The merged definition of the bean being built.
    pub fn definition(&self) -> &MergedDefinition {
        self.definition
    }

    /// The owning factory.
    pub fn factory(&self) -> &BeanFactory {
        self.factory
    }

    /// Looks up another bean and records it as a dependency.
    pub fn get_bean(&self, name: &str) -> BeanResult<AnyArc> {
        let object = self.factory.get_bean(name)?;
        self.factory.register_dependent_bean(name, self.name);
        Ok(object)
    }

    /// Typed [`get_bean`](CreationContext::get_bean).
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<T>> {
        let object = self.get_bean(name)?;
        object.downcast::<T>().map_err(|_| BeanError::TypeMismatch {
            name: name.to_owned(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Constructor argument `index`, resolved.
    pub fn arg_value(&self, index: usize) -> BeanResult<ResolvedValue> {
        let value = self.definition.constructor_args().get(&index).ok_or_else(|| {
            BeanError::invalid(self.name, format!("no constructor argument at index {index}"))
        })?;
        self.factory.resolve_value(self.name, value)
    }

    /// Constructor argument `index`, converted to `T`.
    pub fn arg<T: Clone + Send + Sync + 'static>(&self, index: usize) -> BeanResult<T> {
        let value = self.arg_value(index)?;
        let label = format!("#{index}");
        PropertyArg::new(self.name, &label, &value, &self.converter).get()
    }

    /// Constructor argument `index` referencing another bean, as `Arc<T>`.
    pub fn arg_bean<T: Send + Sync + 'static>(&self, index: usize) -> BeanResult<Arc<T>> {
        let value = self.arg_value(index)?;
        let label = format!("#{index}");
        PropertyArg::new(self.name, &label, &value, &self.converter).bean()
    }

    /// Number of declared constructor arguments.
    pub fn arg_count(&self) -> usize {
        self.definition.constructor_args().len()
    }
}
