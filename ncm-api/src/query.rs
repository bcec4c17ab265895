//! Loosely-typed caller queries.
//!
//! Callers describe a request as string keys mapped to scalar [`Param`]
//! values. Endpoint rules read from a [`Query`]; they never write to it.

use crate::error::{NeteaseError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar query or body value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Explicitly absent; lookups skip it.
    Null,
    /// Rendered as `true`/`false` in discriminant comparisons.
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Raw text. Numeric strings still satisfy [`Param::as_i64`].
    Str(String),
}

impl Param {
    /// Borrow the string payload, if this is a [`Param::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view: `Int` directly, `Str` when it parses as a base-10 integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `true` for the empty string (and `Null`).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<Param> for Value {
    fn from(p: Param) -> Self {
        match p {
            Param::Null => Self::Null,
            Param::Bool(b) => Self::Bool(b),
            Param::Int(n) => Self::from(n),
            Param::Float(x) => Self::from(x),
            Param::Str(s) => Self::String(s),
        }
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Param {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Param {
    fn from(n: u32) -> Self {
        Self::Int(n.into())
    }
}

impl From<f64> for Param {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Caller-supplied key/value query.
///
/// A key mapped to [`Param::Null`] is treated as absent by every lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query(BTreeMap<String, Param>);

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, returning the previous value (including a stored `Null`).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Param>) -> Option<Param> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up `key`; `Null` values count as absent.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// `true` when `key` holds a non-`Null` value.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up `key`, failing with [`NeteaseError::MissingParameter`].
    pub fn require(&self, key: &str) -> Result<&Param> {
        self.get(key)
            .ok_or_else(|| NeteaseError::MissingParameter(key.to_owned()))
    }

    /// Look up `key`, falling back to `default` when absent.
    pub fn get_or(&self, key: &str, default: impl Into<Param>) -> Param {
        self.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Render `key` as text for discriminant comparisons; absent renders empty.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(ToString::to_string).unwrap_or_default()
    }

    /// Entries in key order, `Null` values included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored keys, `Null` values included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Param>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
