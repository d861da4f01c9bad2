//! Factory configuration.
//!
//! Settings come from code (`FactoryConfig { .. }` / builder methods), from
//! `FERROUS_BEANS_*` environment variables, or, with the `config` feature,
//! from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{BeanError, BeanResult};

/// Default bound on nested bean creation per thread.
pub const DEFAULT_MAX_CREATION_DEPTH: usize = 1024;

const ENV_PREFIX: &str = "FERROUS_BEANS_";

/// Behavior switches of a [`BeanFactory`](crate::BeanFactory).
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanFactory, FactoryConfig};
///
/// let config = FactoryConfig::default()
///     .allow_circular_references(false)
///     .allow_definition_overriding(false);
/// let factory = BeanFactory::with_config(config);
/// assert!(!factory.config().allow_circular_references);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct FactoryConfig {
    /// Let opted-in singletons hand out early references to resolve cycles
    pub allow_circular_references: bool,
    /// Accept a final object that differs from an early reference already handed out
    pub allow_raw_injection_despite_wrapping: bool,
    /// Allow registering a definition under an existing name
    pub allow_definition_overriding: bool,
    /// Cache merged definitions
    pub cache_bean_metadata: bool,
    /// May build a producer just to learn its product type
    pub allow_eager_type_init: bool,
    /// Maximum nesting of bean creation on one thread
    pub max_creation_depth: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            allow_raw_injection_despite_wrapping: false,
            allow_definition_overriding: true,
            cache_bean_metadata: true,
            allow_eager_type_init: true,
            max_creation_depth: DEFAULT_MAX_CREATION_DEPTH,
        }
    }
}

impl FactoryConfig {
    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn allow_raw_injection_despite_wrapping(mut self, allow: bool) -> Self {
        self.allow_raw_injection_despite_wrapping = allow;
        self
    }

    pub fn allow_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn cache_bean_metadata(mut self, cache: bool) -> Self {
        self.cache_bean_metadata = cache;
        self
    }

    pub fn allow_eager_type_init(mut self, allow: bool) -> Self {
        self.allow_eager_type_init = allow;
        self
    }

    pub fn max_creation_depth(mut self, depth: usize) -> Self {
        self.max_creation_depth = depth;
        self
    }

    /// Defaults overridden by `FERROUS_BEANS_*` environment variables, e.g.
    /// `FERROUS_BEANS_ALLOW_CIRCULAR_REFERENCES=false` or
    /// `FERROUS_BEANS_MAX_CREATION_DEPTH=64`.
    ///
    /// Unset variables keep their defaults; unparsable values are an error.
    pub fn from_env() -> BeanResult<Self> {
        let mut config = Self::default();
        read_flag("ALLOW_CIRCULAR_REFERENCES", &mut config.allow_circular_references)?;
        read_flag(
            "ALLOW_RAW_INJECTION_DESPITE_WRAPPING",
            &mut config.allow_raw_injection_despite_wrapping,
        )?;
        read_flag("ALLOW_DEFINITION_OVERRIDING", &mut config.allow_definition_overriding)?;
        read_flag("CACHE_BEAN_METADATA", &mut config.cache_bean_metadata)?;
        read_flag("ALLOW_EAGER_TYPE_INIT", &mut config.allow_eager_type_init)?;
        if let Some(raw) = read_var("MAX_CREATION_DEPTH") {
            config.max_creation_depth = raw
                .trim()
                .parse()
                .map_err(|_| invalid_setting("MAX_CREATION_DEPTH", &raw))?;
        }
        Ok(config)
    }

    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> BeanResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| BeanError::IllegalState(format!("invalid factory configuration: {e}")))
    }

    #[cfg(feature = "config")]
    pub fn to_json(&self) -> BeanResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BeanError::IllegalState(format!("cannot serialize factory configuration: {e}")))
    }
}

fn read_var(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{key}")).ok()
}

fn read_flag(key: &str, target: &mut bool) -> BeanResult<()> {
    let Some(raw) = read_var(key) else {
        return Ok(());
    };
    *target = match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => return Err(invalid_setting(key, &raw)),
    };
    Ok(())
}

fn invalid_setting(key: &str, raw: &str) -> BeanError {
    BeanError::IllegalState(format!("invalid value '{raw}' for {ENV_PREFIX}{key}"))
}
