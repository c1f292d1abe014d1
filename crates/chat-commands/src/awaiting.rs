//! Registry of users currently answering argument prompts.

use crate::message::ChatMessage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AwaitingKey {
    author_id: String,
    channel_id: String,
}

/// Tracks (author, channel) pairs inside an argument collection.
///
/// Messages from a pair in this registry are answers to prompts and are not
/// dispatched as commands.
#[derive(Debug, Default)]
pub struct AwaitingRegistry {
    entries: Mutex<HashMap<AwaitingKey, usize>>,
}

impl AwaitingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the author of `message` as awaited in its channel until the
    /// returned lease is dropped.
    pub fn acquire(self: &Arc<Self>, message: &ChatMessage) -> AwaitingLease {
        let key = AwaitingKey {
            author_id: message.author.id.clone(),
            channel_id: message.channel.id.clone(),
        };
        *self.lock().entry(key.clone()).or_insert(0) += 1;
        AwaitingLease {
            registry: Arc::clone(self),
            key,
        }
    }

    pub fn is_awaiting(&self, author_id: &str, channel_id: &str) -> bool {
        let key = AwaitingKey {
            author_id: author_id.to_string(),
            channel_id: channel_id.to_string(),
        };
        self.lock().contains_key(&key)
    }

    /// Number of awaited pairs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, key: &AwaitingKey) {
        let mut entries = self.lock();
        if let Some(count) = entries.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                entries.remove(key);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AwaitingKey, usize>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its (author, channel) pair when dropped.
#[derive(Debug)]
pub struct AwaitingLease {
    registry: Arc<AwaitingRegistry>,
    key: AwaitingKey,
}

impl Drop for AwaitingLease {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Author, Channel};

    fn message(author: &str, channel: &str) -> ChatMessage {
        ChatMessage::new("1", Author::new(author), Channel::guild(channel, "g"), "hi")
    }

    #[test]
    fn test_lease_released_on_drop() {
        let registry = Arc::new(AwaitingRegistry::new());
        let lease = registry.acquire(&message("alice", "general"));

        assert!(registry.is_awaiting("alice", "general"));
        assert!(!registry.is_awaiting("alice", "random"));
        assert!(!registry.is_awaiting("bob", "general"));

        drop(lease);
        assert!(!registry.is_awaiting("alice", "general"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_overlapping_leases_are_counted() {
        let registry = Arc::new(AwaitingRegistry::new());
        let first = registry.acquire(&message("alice", "general"));
        let second = registry.acquire(&message("alice", "general"));

        drop(first);
        assert!(registry.is_awaiting("alice", "general"));
        drop(second);
        assert!(!registry.is_awaiting("alice", "general"));
    }

    #[tokio::test]
    async fn test_lease_released_when_future_dropped() {
        let registry = Arc::new(AwaitingRegistry::new());
        let held = Arc::clone(&registry);
        let task = tokio::spawn(async move {
            let _lease = held.acquire(&message("alice", "general"));
            std::future::pending::<()>().await;
        });

        tokio::task::yield_now().await;
        assert!(registry.is_awaiting("alice", "general"));

        task.abort();
        let _ = task.await;
        assert!(!registry.is_awaiting("alice", "general"));
    }
}
