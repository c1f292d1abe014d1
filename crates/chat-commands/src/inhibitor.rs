//! Inhibitors veto commands before they run.

use crate::invocation::CommandInvocation;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A block decision from an inhibitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inhibition {
    pub reason: String,
    /// Sent to the channel when present.
    pub response: Option<String>,
}

impl Inhibition {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

#[async_trait]
pub trait Inhibitor: Send + Sync {
    /// `Some` blocks the invocation.
    async fn inhibit(&self, invocation: &CommandInvocation) -> Option<Inhibition>;
}

struct FnInhibitor<F>(F);

#[async_trait]
impl<F> Inhibitor for FnInhibitor<F>
where
    F: for<'a> Fn(&'a CommandInvocation) -> BoxFuture<'a, Option<Inhibition>> + Send + Sync,
{
    async fn inhibit(&self, invocation: &CommandInvocation) -> Option<Inhibition> {
        (self.0)(invocation).await
    }
}

/// Wrap a closure as an inhibitor.
///
/// ```
/// use chat_commands::{inhibitor_fn, Inhibition};
/// use futures::FutureExt;
///
/// let no_bob = inhibitor_fn(|invocation| {
///     let blocked = invocation.message().author.id == "bob";
///     async move { blocked.then(|| Inhibition::new("banned")) }.boxed()
/// });
/// # let _ = no_bob;
/// ```
pub fn inhibitor_fn<F>(f: F) -> Arc<dyn Inhibitor>
where
    F: for<'a> Fn(&'a CommandInvocation) -> BoxFuture<'a, Option<Inhibition>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnInhibitor(f))
}
