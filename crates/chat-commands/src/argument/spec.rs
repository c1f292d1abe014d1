//! Argument declarations.

use super::ProvidedValue;
use crate::error::{ArgumentError, ConfigError};
use crate::invocation::CommandInvocation;
use crate::message::ChatMessage;
use crate::types::{ArgValue, ArgumentType, TypeRegistry, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default seconds to wait for a reply to a prompt.
pub const DEFAULT_WAIT_SECS: u64 = 30;

pub type ValidateHook = Arc<dyn Fn(&str, &ChatMessage, &ArgumentSpec) -> Validation + Send + Sync>;
pub type ParseHook =
    Arc<dyn Fn(&str, &ChatMessage, &ArgumentSpec) -> Result<ArgValue, String> + Send + Sync>;
pub type EmptyHook = Arc<dyn Fn(Option<&str>, &ChatMessage, &ArgumentSpec) -> bool + Send + Sync>;

/// Declaration of one command argument.
///
/// Built with chained setters and turned into an [`ArgumentSpec`] by
/// [`ArgumentSpec::new`], which checks it against a [`TypeRegistry`].
#[derive(Clone)]
pub struct ArgumentInfo {
    pub key: String,
    pub label: Option<String>,
    pub prompt: String,
    pub type_id: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<ArgValue>,
    pub infinite: bool,
    pub wait: u64,
    pub validate: Option<ValidateHook>,
    pub parse: Option<ParseHook>,
    pub empty: Option<EmptyHook>,
}

impl ArgumentInfo {
    pub fn new(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
            prompt: prompt.into(),
            type_id: None,
            min: None,
            max: None,
            default: None,
            infinite: false,
            wait: DEFAULT_WAIT_SECS,
            validate: None,
            parse: None,
            empty: None,
        }
    }

    pub fn of_type(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = Some(type_id.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Value used when the argument is left empty.
    pub fn default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn infinite(mut self) -> Self {
        self.infinite = true;
        self
    }

    /// Seconds to wait for each reply.
    pub fn wait(mut self, secs: u64) -> Self {
        self.wait = secs;
        self
    }

    /// Custom validation. The hook sees the value with surrounding
    /// whitespace trimmed.
    pub fn validate_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &ChatMessage, &ArgumentSpec) -> Validation + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(hook));
        self
    }

    pub fn parse_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &ChatMessage, &ArgumentSpec) -> Result<ArgValue, String> + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(hook));
        self
    }

    pub fn empty_when<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&str>, &ChatMessage, &ArgumentSpec) -> bool + Send + Sync + 'static,
    {
        self.empty = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ArgumentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentInfo")
            .field("key", &self.key)
            .field("type_id", &self.type_id)
            .field("infinite", &self.infinite)
            .field("default", &self.default)
            .field("wait", &self.wait)
            .field("validate", &self.validate.is_some())
            .field("parse", &self.parse.is_some())
            .field("empty", &self.empty.is_some())
            .finish()
    }
}

/// Data-only form of an [`ArgumentSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentSnapshot {
    pub key: String,
    pub label: String,
    pub prompt: String,
    pub type_id: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<ArgValue>,
    pub infinite: bool,
    pub wait: u64,
}

/// A checked, immutable argument declaration.
#[derive(Clone)]
pub struct ArgumentSpec {
    key: String,
    label: String,
    prompt: String,
    type_id: Option<String>,
    kind: Option<Arc<dyn ArgumentType>>,
    min: Option<f64>,
    max: Option<f64>,
    default: Option<ArgValue>,
    infinite: bool,
    wait: u64,
    validate: Option<ValidateHook>,
    parse: Option<ParseHook>,
    empty: Option<EmptyHook>,
}

impl ArgumentSpec {
    pub fn new(info: ArgumentInfo, types: &TypeRegistry) -> Result<Self, ConfigError> {
        if info.key.trim().is_empty() {
            return Err(ConfigError::MissingKey);
        }
        if info.prompt.trim().is_empty() {
            return Err(ConfigError::MissingPrompt(info.key));
        }
        if info.type_id.is_none() && (info.validate.is_none() || info.parse.is_none()) {
            return Err(ConfigError::MissingType(info.key));
        }
        if info.wait < 1 {
            return Err(ConfigError::InvalidWait(info.key));
        }

        let kind = match &info.type_id {
            Some(type_id) => Some(types.get(type_id).ok_or_else(|| ConfigError::UnknownType {
                key: info.key.clone(),
                type_id: type_id.clone(),
            })?),
            None => None,
        };

        Ok(Self {
            label: info.label.unwrap_or_else(|| info.key.clone()),
            key: info.key,
            prompt: info.prompt,
            type_id: info.type_id,
            kind,
            min: info.min,
            max: info.max,
            default: info.default,
            infinite: info.infinite,
            wait: info.wait,
            validate: info.validate,
            parse: info.parse,
            empty: info.empty,
        })
    }

    /// Rebuild a spec from a snapshot, re-attaching its type by id.
    pub fn from_snapshot(
        snapshot: ArgumentSnapshot,
        types: &TypeRegistry,
    ) -> Result<Self, ConfigError> {
        if snapshot.type_id.is_none() {
            return Err(ConfigError::HooksNotRestorable(snapshot.key));
        }
        let info = ArgumentInfo {
            key: snapshot.key,
            label: Some(snapshot.label),
            prompt: snapshot.prompt,
            type_id: snapshot.type_id,
            min: snapshot.min,
            max: snapshot.max,
            default: snapshot.default,
            infinite: snapshot.infinite,
            wait: snapshot.wait,
            validate: None,
            parse: None,
            empty: None,
        };
        Self::new(info, types)
    }

    /// Data-only copy of this spec. Hooks are not included.
    pub fn snapshot(&self) -> ArgumentSnapshot {
        ArgumentSnapshot {
            key: self.key.clone(),
            label: self.label.clone(),
            prompt: self.prompt.clone(),
            type_id: self.type_id.clone(),
            min: self.min,
            max: self.max,
            default: self.default.clone(),
            infinite: self.infinite,
            wait: self.wait,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn type_id(&self) -> Option<&str> {
        self.type_id.as_deref()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn default_value(&self) -> Option<&ArgValue> {
        self.default.as_ref()
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite
    }

    /// Seconds to wait for each reply.
    pub fn wait(&self) -> u64 {
        self.wait
    }

    pub(crate) async fn validate_value(
        &self,
        value: &str,
        invocation: &CommandInvocation,
    ) -> Validation {
        if let Some(hook) = &self.validate {
            return hook(value, invocation.message(), self);
        }
        match &self.kind {
            Some(kind) => kind.validate(value, invocation, self).await,
            None => Validation::Invalid,
        }
    }

    pub(crate) async fn parse_value(
        &self,
        value: &str,
        invocation: &CommandInvocation,
    ) -> Result<ArgValue, ArgumentError> {
        let parsed = if let Some(hook) = &self.parse {
            hook(value, invocation.message(), self)
        } else if let Some(kind) = &self.kind {
            kind.parse(value, invocation, self).await
        } else {
            Err("no parser".to_string())
        };
        parsed.map_err(|message| ArgumentError::Parse {
            key: self.key.clone(),
            message,
        })
    }

    pub(crate) fn is_empty_value(
        &self,
        provided: Option<&ProvidedValue>,
        invocation: &CommandInvocation,
    ) -> bool {
        match provided {
            None => self.check_empty(None, invocation),
            Some(ProvidedValue::Single(value)) => self.check_empty(Some(value), invocation),
            Some(ProvidedValue::Many(values)) => {
                values.is_empty()
                    || values
                        .iter()
                        .all(|value| self.check_empty(Some(value), invocation))
            }
        }
    }

    fn check_empty(&self, value: Option<&str>, invocation: &CommandInvocation) -> bool {
        if let Some(hook) = &self.empty {
            return hook(value, invocation.message(), self);
        }
        match &self.kind {
            Some(kind) => kind.is_empty(value, invocation, self),
            None => value.is_none(),
        }
    }
}

impl fmt::Debug for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentSpec")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("type_id", &self.type_id)
            .field("infinite", &self.infinite)
            .field("default", &self.default)
            .field("wait", &self.wait)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> TypeRegistry {
        TypeRegistry::with_defaults()
    }

    #[test]
    fn test_missing_prompt_rejected() {
        let err = ArgumentSpec::new(ArgumentInfo::new("amount", " ").of_type("integer"), &types())
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingPrompt("amount".into()));
    }

    #[test]
    fn test_type_or_hooks_required() {
        let err = ArgumentSpec::new(ArgumentInfo::new("amount", "How much?"), &types()).unwrap_err();
        assert_eq!(err, ConfigError::MissingType("amount".into()));

        let only_validate = ArgumentInfo::new("amount", "How much?")
            .validate_with(|_, _, _| Validation::Valid);
        assert!(ArgumentSpec::new(only_validate, &types()).is_err());

        let both = ArgumentInfo::new("amount", "How much?")
            .validate_with(|_, _, _| Validation::Valid)
            .parse_with(|v, _, _| Ok(ArgValue::from(v)));
        assert!(ArgumentSpec::new(both, &types()).is_ok());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = ArgumentSpec::new(ArgumentInfo::new("who", "Who?").of_type("member"), &types())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownType {
                key: "who".into(),
                type_id: "member".into()
            }
        );
    }

    #[test]
    fn test_zero_wait_rejected() {
        let info = ArgumentInfo::new("n", "Number?").of_type("integer").wait(0);
        assert_eq!(
            ArgumentSpec::new(info, &types()).unwrap_err(),
            ConfigError::InvalidWait("n".into())
        );
    }

    #[test]
    fn test_label_defaults_to_key() {
        let spec = ArgumentSpec::new(ArgumentInfo::new("amount", "How much?").of_type("integer"), &types())
            .unwrap();
        assert_eq!(spec.label(), "amount");
        assert_eq!(spec.wait(), DEFAULT_WAIT_SECS);
    }

    #[test]
    fn test_snapshot_restores_type_by_id() {
        let spec = ArgumentSpec::new(
            ArgumentInfo::new("amount", "How much?")
                .of_type("integer")
                .min(1.0)
                .default(5i64),
            &types(),
        )
        .unwrap();

        let json = serde_json::to_string(&spec.snapshot()).unwrap();
        assert!(json.contains("\"typeId\":\"integer\""));

        let snapshot: ArgumentSnapshot = serde_json::from_str(&json).unwrap();
        let restored = ArgumentSpec::from_snapshot(snapshot, &types()).unwrap();
        assert_eq!(restored.min(), Some(1.0));
        assert_eq!(restored.default_value(), Some(&ArgValue::Integer(5)));
    }

    #[test]
    fn test_hook_only_snapshot_not_restorable() {
        let spec = ArgumentSpec::new(
            ArgumentInfo::new("word", "Word?")
                .validate_with(|_, _, _| Validation::Valid)
                .parse_with(|v, _, _| Ok(ArgValue::from(v))),
            &types(),
        )
        .unwrap();

        let err = ArgumentSpec::from_snapshot(spec.snapshot(), &types()).unwrap_err();
        assert_eq!(err, ConfigError::HooksNotRestorable("word".into()));
    }
}
