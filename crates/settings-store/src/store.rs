//! In-memory settings storage keyed by scope.

use async_trait::async_trait;
use chat_commands::{SettingsError, SettingsProvider, SettingsScope};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

type ScopeSettings = HashMap<String, Value>;

/// In-memory settings store.
///
/// Settings live for the lifetime of the process. Guild lookups do not fall
/// back to global values here; [`chat_commands::resolve_prefix`] does that for
/// the prefix.
#[derive(Clone, Default)]
pub struct MemorySettings {
    scopes: Arc<RwLock<HashMap<SettingsScope, ScopeSettings>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        info!("In-memory settings store initialized");
        Self::default()
    }

    /// Seed the global scope, e.g. from configuration.
    pub async fn with_global(self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.scopes
            .write()
            .await
            .entry(SettingsScope::Global)
            .or_default()
            .extend(values);
        self
    }

    /// Number of scopes holding at least one setting.
    pub async fn scope_count(&self) -> usize {
        self.scopes
            .read()
            .await
            .values()
            .filter(|settings| !settings.is_empty())
            .count()
    }
}

#[async_trait]
impl SettingsProvider for MemorySettings {
    #[instrument(skip(self))]
    async fn get(&self, scope: &SettingsScope, key: &str) -> Result<Option<Value>, SettingsError> {
        let scopes = self.scopes.read().await;
        Ok(scopes.get(scope).and_then(|settings| settings.get(key)).cloned())
    }

    #[instrument(skip(self, value))]
    async fn set(&self, scope: &SettingsScope, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(scope.clone())
            .or_default()
            .insert(key.to_string(), value);
        debug!("Stored setting");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, scope: &SettingsScope, key: &str) -> Result<Option<Value>, SettingsError> {
        let mut scopes = self.scopes.write().await;
        let Some(settings) = scopes.get_mut(scope) else {
            return Ok(None);
        };
        let removed = settings.remove(key);
        if settings.is_empty() {
            scopes.remove(scope);
        }
        if removed.is_some() {
            debug!("Removed setting");
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self, scope: &SettingsScope) -> Result<(), SettingsError> {
        let removed = self.scopes.write().await.remove(scope);
        if let Some(settings) = removed {
            info!(count = settings.len(), "Cleared settings");
        }
        Ok(())
    }
}
