//! Built-in argument types.

use super::{ArgValue, ArgumentType, Validation};
use crate::argument::ArgumentSpec;
use crate::invocation::CommandInvocation;
use async_trait::async_trait;

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "enable", "enabled", "1", "+"];
const FALSY: &[&str] = &["false", "f", "no", "n", "off", "disable", "disabled", "0", "-"];

/// Free text; `min`/`max` bound the length in characters.
pub struct StringType;

#[async_trait]
impl ArgumentType for StringType {
    fn id(&self) -> &str {
        "string"
    }

    async fn validate(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        arg: &ArgumentSpec,
    ) -> Validation {
        let len = value.chars().count() as f64;
        if let Some(min) = arg.min() {
            if len < min {
                return Validation::InvalidWith(format!(
                    "Please keep the {} above or exactly {} characters.",
                    arg.label(),
                    min
                ));
            }
        }
        if let Some(max) = arg.max() {
            if len > max {
                return Validation::InvalidWith(format!(
                    "Please keep the {} below or exactly {} characters.",
                    arg.label(),
                    max
                ));
            }
        }
        Validation::Valid
    }

    async fn parse(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        _arg: &ArgumentSpec,
    ) -> Result<ArgValue, String> {
        Ok(ArgValue::Text(value.to_string()))
    }
}

/// Whole number; `min`/`max` bound the value.
pub struct IntegerType;

#[async_trait]
impl ArgumentType for IntegerType {
    fn id(&self) -> &str {
        "integer"
    }

    async fn validate(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        arg: &ArgumentSpec,
    ) -> Validation {
        match value.parse::<i64>() {
            Ok(number) => check_bounds(number as f64, arg),
            Err(_) => Validation::Invalid,
        }
    }

    async fn parse(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        _arg: &ArgumentSpec,
    ) -> Result<ArgValue, String> {
        value
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|e| e.to_string())
    }
}

/// Decimal number; `min`/`max` bound the value.
pub struct FloatType;

#[async_trait]
impl ArgumentType for FloatType {
    fn id(&self) -> &str {
        "float"
    }

    async fn validate(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        arg: &ArgumentSpec,
    ) -> Validation {
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => check_bounds(number, arg),
            _ => Validation::Invalid,
        }
    }

    async fn parse(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        _arg: &ArgumentSpec,
    ) -> Result<ArgValue, String> {
        value
            .parse::<f64>()
            .map(ArgValue::Float)
            .map_err(|e| e.to_string())
    }
}

/// Yes/no style flag.
pub struct BooleanType;

#[async_trait]
impl ArgumentType for BooleanType {
    fn id(&self) -> &str {
        "boolean"
    }

    async fn validate(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        _arg: &ArgumentSpec,
    ) -> Validation {
        parse_bool(value).is_some().into()
    }

    async fn parse(
        &self,
        value: &str,
        _invocation: &CommandInvocation,
        _arg: &ArgumentSpec,
    ) -> Result<ArgValue, String> {
        parse_bool(value)
            .map(ArgValue::Bool)
            .ok_or_else(|| "Unknown boolean value.".to_string())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let lower = value.to_lowercase();
    if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn check_bounds(number: f64, arg: &ArgumentSpec) -> Validation {
    if let Some(min) = arg.min() {
        if number < min {
            return Validation::InvalidWith(format!(
                "Please enter a number above or exactly {min}."
            ));
        }
    }
    if let Some(max) = arg.max() {
        if number > max {
            return Validation::InvalidWith(format!(
                "Please enter a number below or exactly {max}."
            ));
        }
    }
    Validation::Valid
}
