//! Definition-level values and their resolved forms.

use std::fmt;
use std::sync::Arc;

use crate::error::{BeanError, BeanResult};
use crate::resolver::TypeConverter;
use crate::type_hint::TypeHint;
use crate::AnyArc;

/// A value as written in a definition, before resolution.
///
/// `Text` may contain placeholders (`${key}`) that the factory's embedded
/// value resolvers expand. `Ref` names another bean (canonical name or alias).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Ref(String),
    List(Vec<Value>),
}

impl Value {
    /// Reference to another bean by name.
    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    /// Plain text value.
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// A value after placeholder/expression resolution and bean lookup.
#[derive(Clone)]
pub enum ResolvedValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// A referenced bean, resolved to its exposed object
    Bean { name: String, object: AnyArc },
    /// An object produced by the expression resolver
    Object(AnyArc),
    List(Vec<ResolvedValue>),
}

impl ResolvedValue {
    /// The text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResolvedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The live object, for bean references and expression results.
    pub fn as_object(&self) -> Option<&AnyArc> {
        match self {
            ResolvedValue::Bean { object, .. } | ResolvedValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ResolvedValue::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            ResolvedValue::Float(x) => f.debug_tuple("Float").field(x).finish(),
            ResolvedValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ResolvedValue::Bean { name, .. } => f.debug_struct("Bean").field("name", name).finish(),
            ResolvedValue::Object(_) => f.write_str("Object(..)"),
            ResolvedValue::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

/// Ordered property values keyed by property name.
///
/// Adding a value under an existing name replaces it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValues {
    entries: Vec<(String, Value)>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing an existing entry in place.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parent entries first, each overridden by a same-named child entry,
    /// followed by the child's own new entries.
    pub(crate) fn merged_with_parent(parent: &PropertyValues, child: &PropertyValues) -> Self {
        let mut merged = parent.clone();
        for (name, value) in &child.entries {
            merged.add(name.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = PropertyValues::new();
        for (k, v) in iter {
            values.add(k, v);
        }
        values
    }
}

/// One resolved property or constructor argument, handed to binders and
/// suppliers together with the factory's type converter.
pub struct PropertyArg<'a> {
    bean: &'a str,
    name: &'a str,
    value: &'a ResolvedValue,
    converter: &'a dyn TypeConverter,
}

impl<'a> PropertyArg<'a> {
    pub(crate) fn new(
        bean: &'a str,
        name: &'a str,
        value: &'a ResolvedValue,
        converter: &'a dyn TypeConverter,
    ) -> Self {
        Self {
            bean,
            name,
            value,
            converter,
        }
    }

    /// The property name (or `"#<index>"` for constructor arguments).
    pub fn name(&self) -> &str {
        self.name
    }

    /// The bean being populated.
    pub fn bean_name(&self) -> &str {
        self.bean
    }

    pub fn value(&self) -> &ResolvedValue {
        self.value
    }

    /// The referenced bean (or expression object) as `Arc<T>`.
    pub fn bean<T: Send + Sync + 'static>(&self) -> BeanResult<Arc<T>> {
        self.value
            .as_object()
            .and_then(|o| o.clone().downcast::<T>().ok())
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Converts the value to `T` through the factory's type converter.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> BeanResult<T> {
        let converted = self
            .converter
            .convert(self.value, TypeHint::of::<T>())
            .ok_or_else(|| self.mismatch::<T>())?
            .map_err(|source| BeanError::InstantiationFailure {
                name: self.bean.to_owned(),
                source,
            })?;
        converted
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Element views for list values; a scalar yields itself.
    pub fn items(&self) -> Vec<PropertyArg<'a>> {
        match self.value {
            ResolvedValue::List(items) => items
                .iter()
                .map(|v| PropertyArg::new(self.bean, self.name, v, self.converter))
                .collect(),
            other => vec![PropertyArg::new(self.bean, self.name, other, self.converter)],
        }
    }

    fn mismatch<T: 'static>(&self) -> BeanError {
        BeanError::TypeMismatch {
            name: format!("{}.{}", self.bean, self.name),
            expected: std::any::type_name::<T>(),
        }
    }
}
