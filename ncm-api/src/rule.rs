//! Parameter rules and the resolution engine.
//!
//! Each endpoint declares an ordered list of [`ParamRule`]s. [`resolve`] walks
//! the list once and builds the request body:
//!
//! | Kind       | Query lookup        | Absent key                    |
//! |------------|---------------------|-------------------------------|
//! | `Required` | `source_key`        | `MissingParameter(name)`      |
//! | `Optional` | `source_key`        | rule default                  |
//! | `Constant` | none                | constant, caller input ignored|
//! | `Custom`   | resolver(whole query) | resolver decides            |
//!
//! The transformer (if any) runs on whatever value the kind produced.
//! Custom resolvers always receive the caller's original [`Query`], never the
//! partially-built body.

use crate::error::{NeteaseError, Result};
use crate::query::{Param, Query};
use serde_json::{Map, Value};

/// Resolved request body, in rule order.
pub type Body = Map<String, Value>;

/// Computes a value from the entire caller query.
pub type Resolver = fn(&Query) -> Result<Param>;

/// Post-processes a resolved value. `None` means the value has no mapping and
/// is reported as [`NeteaseError::InvalidParameter`].
pub type Transformer = fn(&Param) -> Option<Param>;

/// How a single body field obtains its value.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Copied from the query; absence is [`NeteaseError::MissingParameter`].
    Required,
    /// Copied from the query, or this default when absent.
    Optional(Param),
    /// Always this value; the query is not consulted.
    Constant(Param),
    /// Computed from the whole query.
    Custom(Resolver),
}

/// Resolution policy for one body field.
#[derive(Debug, Clone)]
pub struct ParamRule {
    name: String,
    source_key: Option<String>,
    kind: RuleKind,
    transformer: Option<Transformer>,
    empty_as_absent: bool,
}

impl ParamRule {
    fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            source_key: None,
            kind,
            transformer: None,
            empty_as_absent: false,
        }
    }

    /// Field that must be present in the query.
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, RuleKind::Required)
    }

    /// Field with a fallback value.
    pub fn optional(name: impl Into<String>, default: impl Into<Param>) -> Self {
        Self::new(name, RuleKind::Optional(default.into()))
    }

    /// Fixed field; caller input under the same key is ignored.
    pub fn constant(name: impl Into<String>, value: impl Into<Param>) -> Self {
        Self::new(name, RuleKind::Constant(value.into()))
    }

    /// Field computed by `resolver` from the whole query.
    pub fn custom(name: impl Into<String>, resolver: Resolver) -> Self {
        Self::new(name, RuleKind::Custom(resolver))
    }

    /// Read the value from query key `key` instead of the body name.
    #[must_use]
    pub fn from(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    /// Map the resolved value through `transformer`.
    #[must_use]
    pub fn transform(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Treat an empty string in the query as if the key were absent.
    #[must_use]
    pub fn empty_as_absent(mut self) -> Self {
        self.empty_as_absent = true;
        self
    }

    /// Body field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query key read by this rule: the `from` key, else the body name.
    pub fn source_key(&self) -> &str {
        self.source_key.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    fn lookup<'q>(&self, query: &'q Query) -> Option<&'q Param> {
        query
            .get(self.source_key())
            .filter(|v| !(self.empty_as_absent && v.is_empty()))
    }

    /// Resolve this rule's value against `query`.
    pub fn resolve(&self, query: &Query) -> Result<Param> {
        let raw = match &self.kind {
            RuleKind::Required => self
                .lookup(query)
                .cloned()
                .ok_or_else(|| NeteaseError::MissingParameter(self.name.clone()))?,
            RuleKind::Optional(default) => {
                self.lookup(query).unwrap_or(default).clone()
            }
            RuleKind::Constant(value) => value.clone(),
            RuleKind::Custom(resolver) => resolver(query)?,
        };
        match self.transformer {
            Some(f) => f(&raw).ok_or_else(|| NeteaseError::invalid(&self.name, &raw)),
            None => Ok(raw),
        }
    }
}

/// Resolve every rule against `query` into a fresh body map.
pub fn resolve(rules: &[ParamRule], query: &Query) -> Result<Body> {
    let mut body = Body::new();
    for rule in rules {
        let value = rule.resolve(query)?;
        body.insert(rule.name.clone(), value.into());
    }
    Ok(body)
}
