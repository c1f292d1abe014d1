//! Sequential acquisition of a command's arguments.

use super::{
    AcquisitionOutcome, ArgumentInfo, ArgumentSpec, ArgumentValues, CollectionOutcome,
    CollectionResult, ProvidedValue,
};
use crate::error::{ArgumentError, ConfigError};
use crate::invocation::CommandInvocation;
use crate::types::{ArgValue, TypeRegistry};
use std::collections::HashSet;
use tracing::debug;

/// Obtains every argument of a command, in declaration order.
#[derive(Debug, Clone)]
pub struct ArgumentCollector {
    args: Vec<ArgumentSpec>,
    prompt_limit: Option<usize>,
}

impl ArgumentCollector {
    /// Check the declarations and build their specs.
    ///
    /// An infinite argument must be last, and no required argument may follow
    /// one with a default.
    pub fn new(
        args: Vec<ArgumentInfo>,
        types: &TypeRegistry,
        prompt_limit: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let mut has_infinite = false;
        let mut has_optional = false;
        let mut keys = HashSet::new();
        let mut specs = Vec::with_capacity(args.len());

        for info in args {
            if has_infinite {
                return Err(ConfigError::ArgumentAfterInfinite(info.key));
            }
            has_infinite = info.infinite;

            if info.default.is_some() {
                has_optional = true;
            } else if has_optional {
                return Err(ConfigError::RequiredAfterOptional(info.key));
            }

            if !keys.insert(info.key.clone()) {
                return Err(ConfigError::DuplicateKey(info.key));
            }

            specs.push(ArgumentSpec::new(info, types)?);
        }

        Ok(Self {
            args: specs,
            prompt_limit,
        })
    }

    pub fn args(&self) -> &[ArgumentSpec] {
        &self.args
    }

    pub fn has_infinite(&self) -> bool {
        self.args.last().is_some_and(|arg| arg.is_infinite())
    }

    pub fn prompt_limit(&self) -> Option<usize> {
        self.prompt_limit
    }

    /// Obtain all values using the collector's prompt limit.
    pub async fn obtain(
        &self,
        invocation: &CommandInvocation,
        provided: Vec<String>,
    ) -> Result<CollectionResult, ArgumentError> {
        self.obtain_with_limit(invocation, provided, self.prompt_limit)
            .await
    }

    /// Obtain all values, stopping at the first cancelled argument.
    ///
    /// The invoking author is marked as awaiting input in the channel for
    /// the whole run.
    pub async fn obtain_with_limit(
        &self,
        invocation: &CommandInvocation,
        provided: Vec<String>,
        prompt_limit: Option<usize>,
    ) -> Result<CollectionResult, ArgumentError> {
        let _lease = invocation.awaiting().acquire(invocation.message());

        let mut values = ArgumentValues::new();
        let mut prompts = Vec::new();
        let mut answers = Vec::new();

        for (index, arg) in self.args.iter().enumerate() {
            let result = arg
                .obtain(invocation, self.provided_for(index, &provided), prompt_limit)
                .await?;
            prompts.extend(result.prompts);
            answers.extend(result.answers);

            match result.outcome {
                AcquisitionOutcome::Value(value) => values.insert(arg.key(), value),
                AcquisitionOutcome::Values(list) => values.insert(arg.key(), ArgValue::List(list)),
                AcquisitionOutcome::Cancelled(reason) => {
                    debug!(key = %arg.key(), %reason, "Argument collection cancelled");
                    return Ok(CollectionResult {
                        outcome: CollectionOutcome::Cancelled(reason),
                        prompts,
                        answers,
                    });
                }
            }
        }

        Ok(CollectionResult {
            outcome: CollectionOutcome::Complete(values),
            prompts,
            answers,
        })
    }

    fn provided_for(&self, index: usize, provided: &[String]) -> Option<ProvidedValue> {
        if index >= provided.len() {
            return None;
        }
        let arg = &self.args[index];
        if arg.is_infinite() {
            return Some(ProvidedValue::Many(provided[index..].to_vec()));
        }
        if index + 1 == self.args.len() && provided.len() > self.args.len() {
            return Some(ProvidedValue::Single(provided[index..].join(" ")));
        }
        Some(ProvidedValue::Single(provided[index].clone()))
    }
}
