//! Interactive acquisition of a single argument value.

use super::{AcquisitionOutcome, AcquisitionResult, ArgumentSpec, CancelReason};
use crate::error::ArgumentError;
use crate::invocation::CommandInvocation;
use crate::message::{ChatMessage, SentMessage};
use crate::sanitize::{defuse_mentions, escape_markdown, truncate_chars};
use crate::transport::ReplyFilter;
use crate::types::{ArgValue, Validation};
use std::time::Duration;
use tracing::debug;

/// Longest invalid value echoed back to the user.
const MAX_ECHO_CHARS: usize = 1850;

/// Raw value supplied with the command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvidedValue {
    Single(String),
    /// Remaining tokens, for infinite arguments.
    Many(Vec<String>),
}

/// What to send before waiting for the next reply.
#[derive(Debug)]
enum Prompt {
    Initial,
    /// Wait without sending anything.
    Silent,
    Invalid { value: String, validation: Validation },
}

enum Reply {
    Text(String),
    Cancel,
    Finish,
    Timeout,
    LimitReached,
}

/// Prompts and answers of one running acquisition.
struct Session {
    limit: Option<usize>,
    prompts: Vec<SentMessage>,
    answers: Vec<ChatMessage>,
}

impl Session {
    fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            prompts: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// A limit of zero never prompts; otherwise the limit is reached once the
    /// prompts sent exceed it.
    fn limit_reached(&self) -> bool {
        self.limit
            .is_some_and(|limit| limit == 0 || self.prompts.len() > limit)
    }

    fn finish(self, outcome: AcquisitionOutcome) -> AcquisitionResult {
        AcquisitionResult {
            outcome,
            prompts: self.prompts,
            answers: self.answers,
        }
    }
}

impl ArgumentSpec {
    /// Obtain a value for this argument, prompting the invoking user when the
    /// provided value is missing or invalid.
    ///
    /// `prompt_limit` caps how many prompts may be sent; `None` is unlimited
    /// and `Some(0)` cancels instead of prompting.
    ///
    /// Values are trimmed before validation, both when provided with the
    /// command and when given in reply to a prompt.
    pub async fn obtain(
        &self,
        invocation: &CommandInvocation,
        provided: Option<ProvidedValue>,
        prompt_limit: Option<usize>,
    ) -> Result<AcquisitionResult, ArgumentError> {
        let mut session = Session::new(prompt_limit);
        let empty = self.is_empty_value(provided.as_ref(), invocation);

        if empty {
            if let Some(default) = self.default_value() {
                return Ok(session.finish(AcquisitionOutcome::Value(default.clone())));
            }
        }

        let outcome = if self.is_infinite() {
            let provided = match provided {
                Some(_) if empty => Vec::new(),
                Some(ProvidedValue::Many(values)) => values,
                Some(ProvidedValue::Single(value)) => vec![value],
                None => Vec::new(),
            };
            self.obtain_infinite(invocation, provided, &mut session).await?
        } else {
            let provided = match provided {
                Some(_) if empty => None,
                Some(ProvidedValue::Single(value)) => Some(value),
                Some(ProvidedValue::Many(values)) => Some(values.join(" ")),
                None => None,
            };
            self.obtain_single(invocation, provided, &mut session).await?
        };

        Ok(session.finish(outcome))
    }

    async fn obtain_single(
        &self,
        invocation: &CommandInvocation,
        provided: Option<String>,
        session: &mut Session,
    ) -> Result<AcquisitionOutcome, ArgumentError> {
        let mut candidate = provided;
        let mut prompt = Prompt::Initial;

        loop {
            if let Some(value) = candidate.take() {
                let value = value.trim().to_string();
                let validation = self.validate_value(&value, invocation).await;
                if validation.is_valid() {
                    let parsed = self.parse_value(&value, invocation).await?;
                    return Ok(AcquisitionOutcome::Value(parsed));
                }
                debug!(key = %self.key(), "Invalid argument value");
                prompt = Prompt::Invalid { value, validation };
            }

            match self.turn(invocation, &prompt, session, false).await? {
                Reply::Text(text) => candidate = Some(text),
                Reply::Cancel | Reply::Finish => {
                    return Ok(AcquisitionOutcome::Cancelled(CancelReason::User))
                }
                Reply::Timeout => return Ok(AcquisitionOutcome::Cancelled(CancelReason::Time)),
                Reply::LimitReached => {
                    return Ok(AcquisitionOutcome::Cancelled(CancelReason::PromptLimit))
                }
            }
        }
    }

    async fn obtain_infinite(
        &self,
        invocation: &CommandInvocation,
        provided: Vec<String>,
        session: &mut Session,
    ) -> Result<AcquisitionOutcome, ArgumentError> {
        let mut accepted = Vec::new();

        if !provided.is_empty() {
            for value in provided {
                let value = value.trim().to_string();
                let validation = self.validate_value(&value, invocation).await;
                if validation.is_valid() {
                    accepted.push(self.parse_value(&value, invocation).await?);
                    continue;
                }

                let mut prompt = Prompt::Invalid { value, validation };
                loop {
                    match self.turn(invocation, &prompt, session, true).await? {
                        Reply::Text(text) => {
                            let validation = self.validate_value(&text, invocation).await;
                            if validation.is_valid() {
                                accepted.push(self.parse_value(&text, invocation).await?);
                                break;
                            }
                            prompt = Prompt::Invalid {
                                value: text,
                                validation,
                            };
                        }
                        other => return Ok(stop_infinite(other, accepted)),
                    }
                }
            }
            return Ok(AcquisitionOutcome::Values(accepted));
        }

        let mut prompt = Prompt::Initial;
        loop {
            match self.turn(invocation, &prompt, session, true).await? {
                Reply::Text(text) => {
                    let validation = self.validate_value(&text, invocation).await;
                    if validation.is_valid() {
                        accepted.push(self.parse_value(&text, invocation).await?);
                        prompt = Prompt::Silent;
                    } else {
                        prompt = Prompt::Invalid {
                            value: text,
                            validation,
                        };
                    }
                }
                other => return Ok(stop_infinite(other, accepted)),
            }
        }
    }

    /// Send `prompt` (unless silent) and wait for one reply.
    async fn turn(
        &self,
        invocation: &CommandInvocation,
        prompt: &Prompt,
        session: &mut Session,
        infinite: bool,
    ) -> Result<Reply, ArgumentError> {
        if session.limit_reached() {
            return Ok(Reply::LimitReached);
        }

        if let Some(text) = self.prompt_text(prompt, infinite) {
            let sent = invocation.reply(&text).await?;
            session.prompts.push(sent);
        }

        let filter = ReplyFilter::for_message(invocation.message());
        let wait = Duration::from_secs(self.wait());
        let Some(answer) = invocation.transport().collect_one(&filter, wait).await? else {
            debug!(key = %self.key(), "Argument prompt timed out");
            return Ok(Reply::Timeout);
        };

        let text = answer.content.trim().to_string();
        session.answers.push(answer);

        if text.eq_ignore_ascii_case("cancel") {
            Ok(Reply::Cancel)
        } else if infinite && text.eq_ignore_ascii_case("finish") {
            Ok(Reply::Finish)
        } else {
            Ok(Reply::Text(text))
        }
    }

    fn prompt_text(&self, prompt: &Prompt, infinite: bool) -> Option<String> {
        let instructions = if infinite {
            format!(
                "Respond with `cancel` to cancel the command, or `finish` to finish entry up to this point.\n\
                 The command will automatically be cancelled in {} seconds.",
                self.wait()
            )
        } else {
            format!(
                "Respond with `cancel` to cancel the command. The command will automatically be cancelled in {} seconds.",
                self.wait()
            )
        };

        match prompt {
            Prompt::Silent => None,
            Prompt::Initial => Some(format!("{}\n{}", self.prompt(), instructions)),
            Prompt::Invalid {
                validation: Validation::InvalidWith(message),
                ..
            } => Some(if infinite {
                format!("{message}\n{instructions}")
            } else {
                format!("{message}\nPlease try again. {instructions}")
            }),
            Prompt::Invalid { value, .. } => Some(if infinite {
                let escaped = defuse_mentions(&escape_markdown(value));
                format!(
                    "You provided an invalid {}, \"{}\". Please try again.",
                    self.label(),
                    truncate_chars(&escaped, MAX_ECHO_CHARS)
                )
            } else {
                format!(
                    "You provided an invalid {}.\nPlease try again. {}",
                    self.label(),
                    instructions
                )
            }),
        }
    }
}

fn stop_infinite(reply: Reply, accepted: Vec<ArgValue>) -> AcquisitionOutcome {
    match reply {
        Reply::Finish if !accepted.is_empty() => AcquisitionOutcome::Values(accepted),
        Reply::Timeout => AcquisitionOutcome::Cancelled(CancelReason::Time),
        Reply::LimitReached => AcquisitionOutcome::Cancelled(CancelReason::PromptLimit),
        _ => AcquisitionOutcome::Cancelled(CancelReason::User),
    }
}
