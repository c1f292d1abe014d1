//! Per-user command throttling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Usage limit for a command: at most `usages` runs per `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throttling {
    pub usages: u32,
    pub duration: u64,
}

impl Throttling {
    pub fn new(usages: u32, duration: u64) -> Self {
        Self { usages, duration }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    /// Blocked; `remaining` whole seconds until the window resets.
    Throttled { remaining: u64 },
}

#[derive(Debug, Clone, Copy)]
struct ThrottleState {
    start: Instant,
    usages: u32,
}

/// Usage windows keyed by (command, user).
#[derive(Debug, Default)]
pub struct Throttler {
    windows: Mutex<HashMap<(String, String), ThrottleState>>,
}

impl Throttler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one use of `command` by `user_id`, unless it would exceed the limit.
    pub fn hit(&self, command: &str, user_id: &str, limit: &Throttling) -> ThrottleDecision {
        let window = Duration::from_secs(limit.duration);
        let now = Instant::now();
        let mut windows = self.lock();

        let state = windows
            .entry((command.to_string(), user_id.to_string()))
            .or_insert(ThrottleState {
                start: now,
                usages: 0,
            });

        if now.duration_since(state.start) >= window {
            state.start = now;
            state.usages = 0;
        }
        let elapsed = now.duration_since(state.start);

        if state.usages + 1 > limit.usages {
            let left = window.saturating_sub(elapsed);
            let remaining = left.as_secs() + u64::from(left.subsec_nanos() > 0);
            debug!(command, user_id, remaining, "Command throttled");
            return ThrottleDecision::Throttled {
                remaining: remaining.max(1),
            };
        }

        state.usages += 1;
        ThrottleDecision::Allowed
    }

    /// Uses recorded in the current window, if one is open.
    pub fn usage(&self, command: &str, user_id: &str) -> Option<u32> {
        self.lock()
            .get(&(command.to_string(), user_id.to_string()))
            .map(|state| state.usages)
    }

    /// Drop windows older than `max_age`.
    pub fn prune(&self, max_age: Duration) {
        let now = Instant::now();
        self.lock()
            .retain(|_, state| now.duration_since(state.start) < max_age);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), ThrottleState>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_third_use_in_window_is_throttled() {
        let throttler = Throttler::new();
        let limit = Throttling::new(2, 3);

        assert_eq!(throttler.hit("roll", "alice", &limit), ThrottleDecision::Allowed);
        assert_eq!(throttler.hit("roll", "alice", &limit), ThrottleDecision::Allowed);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(
            throttler.hit("roll", "alice", &limit),
            ThrottleDecision::Throttled { remaining: 3 }
        );

        // Other users and commands have their own windows.
        assert_eq!(throttler.hit("roll", "bob", &limit), ThrottleDecision::Allowed);
        assert_eq!(throttler.hit("flip", "alice", &limit), ThrottleDecision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_duration() {
        let throttler = Throttler::new();
        let limit = Throttling::new(2, 3);

        throttler.hit("roll", "alice", &limit);
        throttler.hit("roll", "alice", &limit);
        assert!(matches!(
            throttler.hit("roll", "alice", &limit),
            ThrottleDecision::Throttled { .. }
        ));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(throttler.hit("roll", "alice", &limit), ThrottleDecision::Allowed);
        assert_eq!(throttler.usage("roll", "alice"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_drops_old_windows() {
        let throttler = Throttler::new();
        throttler.hit("roll", "alice", &Throttling::new(1, 5));

        tokio::time::advance(Duration::from_secs(10)).await;
        throttler.prune(Duration::from_secs(5));
        assert_eq!(throttler.usage("roll", "alice"), None);
    }
}
