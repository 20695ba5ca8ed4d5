use std::collections::BTreeMap;
use std::fmt;

use crate::error::{EvalError, EvalResult};

/// A boxed, owned sequence of values produced for a `for` loop.
///
/// The iterator must not borrow the context, because the loop rebinds its
/// variable in that context between items.
pub type ValueIter = Box<dyn Iterator<Item = Value>>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A lazily iterated integer range, `start..end` stepping by `step`.
    #[cfg_attr(feature = "serde", serde(skip))]
    Range { start: i64, end: i64, step: i64 },
}

impl Value {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Range { .. } => "range",
        }
    }

    /// Boolean coercion used by `if` and `elif`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
            Self::Map(m) => !m.is_empty(),
            Self::Range { .. } => self.range_len() != Some(0),
        }
    }

    /// Number of elements, for values that have one.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::Array(a) => Some(a.len()),
            Self::Map(m) => Some(m.len()),
            Self::Range { .. } => self.range_len(),
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    fn range_len(&self) -> Option<usize> {
        let Self::Range { start, end, step } = *self else {
            return None;
        };
        let (span, stride) = match step {
            0 => return Some(0),
            s if s > 0 => (end as i128 - start as i128, s as i128),
            s => (start as i128 - end as i128, -(s as i128)),
        };
        if span <= 0 {
            return Some(0);
        }
        usize::try_from((span + stride - 1) / stride).ok()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Turns the value into the sequence a `for` loop walks over.
    ///
    /// Maps yield their keys; strings yield one-character strings; ranges
    /// are produced lazily.
    pub fn into_items(self) -> EvalResult<ValueIter> {
        match self {
            Self::Array(items) => Ok(Box::new(items.into_iter())),
            Self::Map(map) => Ok(Box::new(map.into_keys().map(Value::String))),
            Self::String(s) => Ok(Box::new(
                s.chars()
                    .map(|ch| Value::String(ch.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )),
            Self::Range { start, end, step } => {
                let mut next = start;
                Ok(Box::new(std::iter::from_fn(move || {
                    let more = (step > 0 && next < end) || (step < 0 && next > end);
                    if !more {
                        return None;
                    }
                    let current = next;
                    next = next.checked_add(step).unwrap_or(end);
                    Some(Value::Int(current))
                })))
            }
            other => Err(EvalError::NotIterable {
                ty: other.type_name().to_string(),
            }),
        }
    }
}

/// Renders a nested value the way it would appear inside a collection.
struct Nested<'a>(&'a Value);

impl fmt::Display for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Null => f.write_str("null"),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            // Integral floats keep a trailing `.0` so they read as floats.
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Nested(item))?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, item)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", key, Nested(item))?;
                }
                f.write_str("}")
            }
            Self::Range { start, end, step: 1 } => write!(f, "range({}, {})", start, end),
            Self::Range { start, end, step } => write!(f, "range({}, {}, {})", start, end, step),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(value: BTreeMap<String, T>) -> Self {
        Self::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Array(iter.into_iter().map(Into::into).collect())
    }
}

/// The variables a template is rendered against.
///
/// A `for` loop binds its variable here while the loop runs and restores
/// the previous binding (or its absence) once the loop is done.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    data: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<N: AsRef<str>, V: Into<Value>>(&mut self, name: N, value: V) -> &mut Self {
        self.data.insert(name.as_ref().to_string(), value.into());
        self
    }

    /// Builder-style [`Context::insert`].
    pub fn with<N: AsRef<str>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get<N: AsRef<str>>(&self, name: N) -> Option<&Value> {
        self.data.get(name.as_ref())
    }

    pub fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.data.contains_key(name.as_ref())
    }

    pub fn remove<N: AsRef<str>>(&mut self, name: N) -> Option<Value> {
        self.data.remove(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Binds `name` to `value`, returning whatever was bound before.
    pub(crate) fn bind(&mut self, name: &str, value: Value) -> Option<Value> {
        self.data.insert(name.to_string(), value)
    }

    /// Restores a binding saved by [`Context::bind`].
    pub(crate) fn restore(&mut self, name: &str, prior: Option<Value>) {
        match prior {
            Some(value) => {
                self.data.insert(name.to_string(), value);
            }
            None => {
                self.data.remove(name);
            }
        }
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
