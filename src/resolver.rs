//! Value resolution collaborators: embedded value resolvers, the optional
//! expression resolver and type conversion.

use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::ResolvedValue;
use crate::error::{BeanResult, BoxError};
use crate::type_hint::TypeHint;
use crate::AnyArc;

/// Resolves placeholder text embedded in definition values.
///
/// Resolvers run in registration order, each seeing the previous one's
/// output. Returning `None` stops the chain and the value resolves to `None`.
///
/// Any `Fn(&str) -> Option<String>` closure is a resolver:
///
/// ```
/// use ferrous_beans::BeanFactory;
/// use std::sync::Arc;
///
/// let factory = BeanFactory::new();
/// factory.add_embedded_value_resolver(Arc::new(|v: &str| Some(v.to_uppercase())));
/// assert_eq!(factory.resolve_embedded_value("abc").as_deref(), Some("ABC"));
/// ```
pub trait ValueResolver: Send + Sync {
    fn resolve_value(&self, value: &str) -> Option<String>;
}

impl<F> ValueResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve_value(&self, value: &str) -> Option<String> {
        self(value)
    }
}

/// `${key}` / `${key:default}` placeholder resolver backed by a property map.
///
/// Unknown keys without a default are left untouched. Nested placeholders
/// in resolved values are expanded up to a fixed depth.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{PlaceholderResolver, ValueResolver};
///
/// let resolver = PlaceholderResolver::new()
///     .with_property("db.host", "localhost")
///     .with_property("db.url", "postgres://${db.host}:${db.port:5432}");
///
/// assert_eq!(
///     resolver.resolve_value("${db.url}").as_deref(),
///     Some("postgres://localhost:5432")
/// );
/// assert_eq!(resolver.resolve_value("${missing}").as_deref(), Some("${missing}"));
/// ```
#[derive(Debug, Clone)]
pub struct PlaceholderResolver {
    properties: HashMap<String, String>,
    ignore_unresolvable: bool,
}

const MAX_PLACEHOLDER_DEPTH: usize = 32;

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
            ignore_unresolvable: true,
        }
    }

    /// Resolver over the process environment.
    pub fn from_env() -> Self {
        Self {
            properties: std::env::vars().collect(),
            ignore_unresolvable: true,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// When `false`, an unresolvable placeholder makes the whole value resolve to `None`.
    pub fn ignore_unresolvable(mut self, ignore: bool) -> Self {
        self.ignore_unresolvable = ignore;
        self
    }

    fn expand(&self, value: &str, depth: usize) -> Option<String> {
        if depth > MAX_PLACEHOLDER_DEPTH {
            return Some(value.to_owned());
        }
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return Some(out);
            };
            let placeholder = &after[..end];
            let (key, default) = match placeholder.split_once(':') {
                Some((k, d)) => (k, Some(d)),
                None => (placeholder, None),
            };
            match self.properties.get(key).map(String::as_str).or(default) {
                Some(found) => out.push_str(&self.expand(found, depth + 1)?),
                None if self.ignore_unresolvable => {
                    out.push_str(&rest[start..start + 2 + end + 1]);
                }
                None => return None,
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Some(out)
    }
}

impl ValueResolver for PlaceholderResolver {
    fn resolve_value(&self, value: &str) -> Option<String> {
        self.expand(value, 0)
    }
}

/// Evaluates expression text in definition values.
///
/// Called only when registered, after the embedded value resolvers. Without
/// one, text values pass through unresolved.
pub trait ExpressionResolver: Send + Sync {
    fn evaluate(&self, text: &str, bean_name: &str) -> BeanResult<ResolvedValue>;
}

/// Converts resolved values into a requested target type.
///
/// Returns `None` when the converter does not handle the value/target pair,
/// so converters can be chained.
pub trait TypeConverter: Send + Sync {
    fn convert(&self, value: &ResolvedValue, target: TypeHint) -> Option<Result<AnyArc, BoxError>>;
}

/// Built-in conversions between text, numbers and booleans.
///
/// Bean references convert to their own type only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeConverter;

macro_rules! integer_targets {
    ($value:expr, $target:expr, $($ty:ty),*) => {
        $(
            if $target.is::<$ty>() {
                return Some(match $value {
                    ResolvedValue::Integer(i) => <$ty>::try_from(*i)
                        .map(|v| Arc::new(v) as AnyArc)
                        .map_err(|e| Box::new(e) as BoxError),
                    ResolvedValue::Text(s) => s
                        .trim()
                        .parse::<$ty>()
                        .map(|v| Arc::new(v) as AnyArc)
                        .map_err(|e| Box::new(e) as BoxError),
                    _ => return None,
                });
            }
        )*
    };
}

impl TypeConverter for DefaultTypeConverter {
    fn convert(&self, value: &ResolvedValue, target: TypeHint) -> Option<Result<AnyArc, BoxError>> {
        if let Some(object) = value.as_object() {
            return ((**object).type_id() == target.id()).then(|| Ok(object.clone()));
        }

        if target.is::<String>() {
            let text = match value {
                ResolvedValue::Text(s) => s.clone(),
                ResolvedValue::Integer(i) => i.to_string(),
                ResolvedValue::Float(x) => x.to_string(),
                ResolvedValue::Bool(b) => b.to_string(),
                _ => return None,
            };
            return Some(Ok(Arc::new(text)));
        }

        integer_targets!(value, target, i64, i32, i16, i8, u64, u32, u16, u8, usize, isize);

        if target.is::<f64>() {
            return Some(match value {
                ResolvedValue::Float(x) => Ok(Arc::new(*x) as AnyArc),
                ResolvedValue::Integer(i) => Ok(Arc::new(*i as f64) as AnyArc),
                ResolvedValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(|v| Arc::new(v) as AnyArc)
                    .map_err(|e| Box::new(e) as BoxError),
                _ => return None,
            });
        }

        if target.is::<bool>() {
            return Some(match value {
                ResolvedValue::Bool(b) => Ok(Arc::new(*b) as AnyArc),
                ResolvedValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(Arc::new(true) as AnyArc),
                    "false" | "no" | "off" | "0" => Ok(Arc::new(false) as AnyArc),
                    other => Err(format!("cannot convert '{other}' to bool").into()),
                },
                _ => return None,
            });
        }

        None
    }
}

/// A user converter tried before the built-in conversions.
pub(crate) struct ConverterChain {
    pub(crate) custom: Option<Arc<dyn TypeConverter>>,
}

impl TypeConverter for ConverterChain {
    fn convert(&self, value: &ResolvedValue, target: TypeHint) -> Option<Result<AnyArc, BoxError>> {
        self.custom
            .as_ref()
            .and_then(|c| c.convert(value, target))
            .or_else(|| DefaultTypeConverter.convert(value, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_defaults_and_nesting() {
        let r = PlaceholderResolver::new()
            .with_property("a", "${b}")
            .with_property("b", "value");
        assert_eq!(r.resolve_value("x-${a}-${c:def}").as_deref(), Some("x-value-def"));
    }

    #[test]
    fn strict_placeholder_fails_on_unknown_key() {
        let r = PlaceholderResolver::new().ignore_unresolvable(false);
        assert_eq!(r.resolve_value("${nope}"), None);
        assert_eq!(r.resolve_value("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn default_converter_handles_numbers_and_bools() {
        let c = DefaultTypeConverter;
        let port = c
            .convert(&ResolvedValue::Text("8080".into()), TypeHint::of::<u16>())
            .unwrap()
            .unwrap();
        assert_eq!(port.downcast_ref::<u16>(), Some(&8080));

        let overflow = c.convert(&ResolvedValue::Integer(70_000), TypeHint::of::<u16>()).unwrap();
        assert!(overflow.is_err());

        let flag = c
            .convert(&ResolvedValue::Text("on".into()), TypeHint::of::<bool>())
            .unwrap()
            .unwrap();
        assert_eq!(flag.downcast_ref::<bool>(), Some(&true));

        assert!(c.convert(&ResolvedValue::Bool(true), TypeHint::of::<Vec<u8>>()).is_none());
    }
}
