//! Producer indirection: beans that stand in for the object they produce.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::error::{BeanError, BoxError};
use crate::type_hint::TypeHint;
use crate::AnyArc;

/// Failure reported by a producer.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The producer has not finished its own setup yet; retrying later may succeed
    #[error("not ready: {0}")]
    NotReady(String),
    /// Producing the object failed
    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl ProducerError {
    pub(crate) fn into_bean_error(self, name: &str) -> BeanError {
        match self {
            ProducerError::NotReady(reason) => BeanError::ProducerNotReady {
                name: name.to_owned(),
                reason,
            },
            ProducerError::Failed(source) => BeanError::from_callback(name, source),
        }
    }
}

/// A bean whose exposed object is something it produces.
///
/// Register one with [`BeanDefinition::producer`](crate::BeanDefinition::producer).
/// `get_bean(name)` returns the product; `get_bean("&name")` returns the
/// producer itself.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{AnyArc, BeanDefinition, BeanFactory, Producer, ProducerError, TypeHint};
/// use std::sync::Arc;
///
/// struct Connection {
///     url: String,
/// }
///
/// struct ConnectionProducer {
///     url: String,
/// }
///
/// impl Producer for ConnectionProducer {
///     fn get_object(&self) -> Result<AnyArc, ProducerError> {
///         Ok(Arc::new(Connection { url: self.url.clone() }))
///     }
///
///     fn object_type(&self) -> Option<TypeHint> {
///         Some(TypeHint::of::<Connection>())
///     }
/// }
///
/// let factory = BeanFactory::new();
/// factory
///     .register_definition(
///         "connection",
///         BeanDefinition::producer(|_| Ok(ConnectionProducer { url: "postgres://db".into() })),
///     )
///     .unwrap();
///
/// let conn = factory.get::<Connection>("connection").unwrap();
/// assert_eq!(conn.url, "postgres://db");
/// assert!(factory.get::<ConnectionProducer>("&connection").is_ok());
/// ```
pub trait Producer: Send + Sync + 'static {
    /// The produced object.
    fn get_object(&self) -> Result<AnyArc, ProducerError>;

    /// The product type, if known before producing.
    fn object_type(&self) -> Option<TypeHint>;

    /// `true` if every call to [`get_object`](Producer::get_object) yields
    /// the same object, which the factory then caches.
    fn is_singleton(&self) -> bool {
        true
    }

    /// `true` if the product should be created during pre-instantiation
    /// rather than on first lookup.
    fn is_eager_init(&self) -> bool {
        false
    }
}

/// Cache of products of singleton producers.
#[derive(Default)]
pub(crate) struct ProductCache {
    products: RwLock<HashMap<String, AnyArc>>,
}

impl ProductCache {
    pub(crate) fn get(&self, name: &str) -> Option<AnyArc> {
        self.products.read().get(name).cloned()
    }

    /// Inserts `product` unless another thread cached one first; returns the
    /// cached product either way.
    pub(crate) fn insert_if_absent(&self, name: &str, product: AnyArc) -> AnyArc {
        self.products
            .write()
            .entry(name.to_owned())
            .or_insert(product)
            .clone()
    }

    pub(crate) fn remove(&self, name: &str) {
        self.products.write().remove(name);
    }

    pub(crate) fn clear(&self) {
        self.products.write().clear();
    }
}
