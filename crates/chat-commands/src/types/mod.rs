//! Argument types: validation and parsing of raw argument text.

mod builtin;

pub use builtin::{BooleanType, FloatType, IntegerType, StringType};

use crate::argument::ArgumentSpec;
use crate::error::ConfigError;
use crate::invocation::CommandInvocation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result of validating raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Invalid; the user gets the generic "invalid value" message.
    Invalid,
    /// Invalid with a message explaining why.
    InvalidWith(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl From<bool> for Validation {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

/// Parsed argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An argument type.
#[async_trait]
pub trait ArgumentType: Send + Sync {
    /// Registry id (e.g. "integer").
    fn id(&self) -> &str;

    /// Check whether `value` is acceptable for `arg`. `value` is already
    /// trimmed.
    async fn validate(
        &self,
        value: &str,
        invocation: &CommandInvocation,
        arg: &ArgumentSpec,
    ) -> Validation;

    /// Convert a validated value.
    async fn parse(
        &self,
        value: &str,
        invocation: &CommandInvocation,
        arg: &ArgumentSpec,
    ) -> Result<ArgValue, String>;

    /// Whether `value` counts as not provided.
    fn is_empty(
        &self,
        value: Option<&str>,
        _invocation: &CommandInvocation,
        _arg: &ArgumentSpec,
    ) -> bool {
        value.map_or(true, |v| v.trim().is_empty())
    }
}

/// Registry of argument types by id.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn ArgumentType>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `string`, `integer`, `float` and `boolean` types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn ArgumentType>; 4] = [
            Arc::new(StringType),
            Arc::new(IntegerType),
            Arc::new(FloatType),
            Arc::new(BooleanType),
        ];
        for kind in builtins {
            registry.types.insert(kind.id().to_string(), kind);
        }
        registry
    }

    /// Register a type.
    pub fn register(&mut self, kind: Arc<dyn ArgumentType>) -> Result<(), ConfigError> {
        let id = kind.id().to_string();
        if self.types.contains_key(&id) {
            return Err(ConfigError::DuplicateType(id));
        }
        self.types.insert(id, kind);
        Ok(())
    }

    pub fn has(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ArgumentType>> {
        self.types.get(id).cloned()
    }

    /// Registered type ids.
    pub fn ids(&self) -> Vec<&str> {
        self.types.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = TypeRegistry::with_defaults();
        for id in ["string", "integer", "float", "boolean"] {
            assert!(registry.has(id), "missing {id}");
        }
        assert!(!registry.has("user"));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut registry = TypeRegistry::with_defaults();
        let err = registry.register(Arc::new(IntegerType)).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateType("integer".into()));
    }

    #[test]
    fn test_arg_value_serialization() {
        let value = ArgValue::List(vec![ArgValue::Integer(5), "x".into()]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[5,"x"]"#);
        assert_eq!(value.to_string(), "5 x");
    }
}
