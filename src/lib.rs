//! # ferrous-beans
//!
//! Name-based inversion-of-control container: bean definitions with
//! inheritance, scopes, producers, post-processing hooks and
//! dependency-ordered teardown.
//!
//! ## Features
//!
//! - **Definitions with inheritance**: child definitions override what they set and inherit the rest
//! - **Scopes**: singleton, prototype, and pluggable custom scopes
//! - **Aliases**: any number of extra names per bean, resolved transitively
//! - **Producers**: beans that stand in for the object they produce (`&name` reaches the producer)
//! - **Circular references**: setter-level cycles between opted-in singletons resolve through early references; constructor-level cycles fail with the full path
//! - **Thread-safe**: concurrent lookups of one singleton build it exactly once
//! - **Ordered teardown**: a bean is always destroyed before the beans it depends on
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_beans::{BeanDefinition, BeanFactory, Value};
//! use std::sync::{Arc, OnceLock};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Default)]
//! struct UserService {
//!     db: OnceLock<Arc<Database>>,
//! }
//!
//! let factory = BeanFactory::new();
//! factory
//!     .register_definition(
//!         "database",
//!         BeanDefinition::of(|ctx| Ok(Database { url: ctx.arg(0)? }))
//!             .with_constructor_arg(0, "postgres://localhost"),
//!     )
//!     .unwrap();
//! factory
//!     .register_definition(
//!         "users",
//!         BeanDefinition::of(|_| Ok(UserService::default()))
//!             .with_property("db", Value::reference("database"))
//!             .bind_with::<UserService, _>(|users, prop| {
//!                 let _ = users.db.set(prop.bean()?);
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! let users = factory.get::<UserService>("users").unwrap();
//! assert_eq!(users.db.get().unwrap().url, "postgres://localhost");
//!
//! // "users" depends on "database", so it is destroyed first
//! assert_eq!(factory.dependent_beans("database"), vec!["users"]);
//! factory.destroy_singletons();
//! ```
//!
//! ## Scopes
//!
//! - **singleton**: one object per factory, created on first lookup (or by
//!   [`BeanFactory::pre_instantiate_singletons`])
//! - **prototype**: a fresh object on every lookup; the caller owns its teardown
//! - **custom**: anything implementing [`Scope`], e.g. the bundled [`ThreadScope`]
//!
//! ## Placeholders
//!
//! ```rust
//! use ferrous_beans::{BeanDefinition, BeanFactory, PlaceholderResolver};
//! use std::sync::Arc;
//!
//! struct Server {
//!     port: u16,
//! }
//!
//! let factory = BeanFactory::new();
//! factory.add_embedded_value_resolver(Arc::new(PlaceholderResolver::new().with_property("port", "8080")));
//! factory
//!     .register_definition(
//!         "server",
//!         BeanDefinition::of(|ctx| Ok(Server { port: ctx.arg(0)? })).with_constructor_arg(0, "${port:80}"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(factory.get::<Server>("server").unwrap().port, 8080);
//! ```

use std::any::Any;
use std::sync::Arc;

pub mod config;
pub mod definition;
pub mod error;
pub mod factory;
pub mod graph_export;
pub mod observer;
pub mod post_processor;
pub mod producer;
pub mod resolver;
pub mod scope;
pub mod traits;
pub mod type_hint;

mod alias;
mod dependency;
mod internal;
mod singleton;

/// A type-erased, shareable bean object.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub use config::{FactoryConfig, DEFAULT_MAX_CREATION_DEPTH};
pub use definition::{
    AttributeValue, BeanDefinition, MergedDefinition, PropertyArg, PropertyValues, ResolvedValue, Value,
    PRODUCER_TYPE_ATTRIBUTE,
};
pub use error::{BeanError, BeanResult, BoxError};
pub use factory::{BeanFactory, CreationContext, PRODUCER_PREFIX};
pub use graph_export::{GraphEdge, GraphNode, GraphSnapshot};
pub use observer::{LifecycleObserver, TracingObserver};
pub use post_processor::BeanPostProcessor;
pub use producer::{Producer, ProducerError};
pub use resolver::{DefaultTypeConverter, ExpressionResolver, PlaceholderResolver, TypeConverter, ValueResolver};
pub use scope::{DestructionCallback, Scope, ThreadScope, SCOPE_PROTOTYPE, SCOPE_SINGLETON};
pub use traits::{Dispose, Initialize};
pub use type_hint::TypeHint;
