//! Error types for the bean container.

use thiserror::Error;

/// Boxed foreign error, as returned by user-supplied suppliers, binders and
/// lifecycle callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Bean container errors
///
/// Represents the failure conditions of definition registration, bean
/// creation and container configuration.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanError, BeanFactory};
///
/// let factory = BeanFactory::new();
/// match factory.get_bean("missing") {
///     Err(BeanError::NotFound { name }) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum BeanError {
    /// No definition or instance under that name, including ancestor lookups
    #[error("no bean named '{name}' is defined")]
    NotFound { name: String },

    /// An unsafe cycle: independent-scope re-entry, constructor-level cycle,
    /// a `depends_on` loop, or two threads each waiting on the other's bean
    #[error("circular reference while creating '{name}': {}", path.join(" -> "))]
    CircularReference { name: String, path: Vec<String> },

    /// Alias collision or duplicate scope registration
    #[error("definition conflict for '{name}': {reason}")]
    DefinitionConflict { name: String, reason: String },

    /// The definition cannot be merged or instantiated as declared
    #[error("invalid bean definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// Instantiation, property population or initialization failed
    #[error("error creating bean '{name}': {source}")]
    InstantiationFailure {
        name: String,
        #[source]
        source: BoxError,
    },

    /// A producer's product was requested before the producer finished its own setup
    #[error("producer '{name}' is not ready: {reason}")]
    ProducerNotReady { name: String, reason: String },

    /// Mutation attempted after the configuration was frozen
    #[error("configuration is frozen, cannot {action} '{name}'")]
    ConfigurationFrozen { name: String, action: &'static str },

    /// The bean exists but is not of the requested type
    #[error("bean '{name}' is not of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// `&name` dereference on a bean that is not a producer
    #[error("bean '{name}' is not a producer")]
    NotAProducer { name: String },

    /// The definition names a scope that was never registered
    #[error("no scope registered for id '{scope}' (bean '{name}')")]
    UnknownScope { name: String, scope: String },

    /// Singleton creation requested while singletons are being destroyed
    #[error("singleton '{name}' cannot be created while singletons of this factory are in destruction")]
    CreationNotAllowed { name: String },

    /// An early reference was handed out but the final object was wrapped
    #[error("bean '{name}' was injected into other beans in its raw version as part of a circular reference, but has eventually been wrapped")]
    RawReferenceWrapped { name: String },

    /// Maximum creation depth exceeded
    #[error("max creation depth {0} exceeded")]
    DepthExceeded(usize),

    /// Operation not valid in the container's current state
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl BeanError {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        BeanError::NotFound { name: name.into() }
    }

    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BeanError::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BeanError::DefinitionConflict {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Converts an error coming back from user code into a container error.
    ///
    /// Container errors raised by nested lookups pass through unchanged so that
    /// e.g. a `CircularReference` from a dependency reaches the caller as such.
    /// Anything else is attributed to `name` as an `InstantiationFailure`.
    pub(crate) fn from_callback(name: &str, err: BoxError) -> Self {
        match err.downcast::<BeanError>() {
            Ok(bean_err) => *bean_err,
            Err(source) => BeanError::InstantiationFailure {
                name: name.to_owned(),
                source,
            },
        }
    }

    /// Returns `true` for errors a caller may retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BeanError::ProducerNotReady { .. })
    }
}

/// Result type for container operations
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanError, BeanResult};
///
/// fn lookup() -> BeanResult<u32> {
///     Err(BeanError::NotFound { name: "port".into() })
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type BeanResult<T> = Result<T, BeanError>;
