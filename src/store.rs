//! Settings persistence
//!
//! A generic async key/value store holding two records: the global settings
//! (`rewordSettings`) and the override map (`rewordDomainOverrides`). Loading
//! never fails: any read or parse error is logged and the defaults are used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::storage;
use crate::settings::{DomainOverrides, GlobalSettings};

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Volatile store, used by tests and hosts without persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        records.insert(key.to_string(), value);
        Ok(())
    }
}

/// All records in one JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `<config dir>/reword/storage.json`
    pub fn new() -> Self {
        Self::at(Self::default_path())
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(storage::APP_DIR);
        path.push(storage::FILENAME);
        path
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Map::new());
        }
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read storage from {:?}", self.path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse storage JSON from {:?}", self.path))
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut records = self.read_all().await?;
        records.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create storage directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize storage to JSON")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write storage to {:?}", self.path))?;
        debug!(key = %key, path = ?self.path, "Saved storage record");
        Ok(())
    }
}

// ==============================================================================
// Typed record access
// ==============================================================================

async fn read_record<T: serde::de::DeserializeOwned>(
    store: &dyn SettingsStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(
            serde_json::from_value(value).with_context(|| format!("Invalid '{}' record", key))?,
        )),
        None => Ok(None),
    }
}

/// Global settings, or defaults when absent or unreadable
pub async fn load_global_settings(store: &dyn SettingsStore) -> GlobalSettings {
    match read_record::<GlobalSettings>(store, storage::SETTINGS_KEY).await {
        Ok(Some(settings)) => {
            info!("Loaded global settings");
            settings.clamped()
        }
        Ok(None) => {
            info!("No stored settings, using defaults");
            GlobalSettings::default()
        }
        Err(e) => {
            warn!(error = ?e, "Failed to load settings, using defaults");
            GlobalSettings::default()
        }
    }
}

/// Override map, or empty when absent or unreadable
pub async fn load_overrides(store: &dyn SettingsStore) -> DomainOverrides {
    match read_record::<DomainOverrides>(store, storage::OVERRIDES_KEY).await {
        Ok(Some(overrides)) => {
            info!(count = overrides.len(), "Loaded site overrides");
            overrides
        }
        Ok(None) => DomainOverrides::new(),
        Err(e) => {
            warn!(error = ?e, "Failed to load site overrides, using none");
            DomainOverrides::new()
        }
    }
}

pub async fn save_global_settings(store: &dyn SettingsStore, settings: &GlobalSettings) -> Result<()> {
    let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
    store.set(storage::SETTINGS_KEY, value).await
}

pub async fn save_overrides(store: &dyn SettingsStore, overrides: &DomainOverrides) -> Result<()> {
    let value = serde_json::to_value(overrides).context("Failed to serialize site overrides")?;
    store.set(storage::OVERRIDES_KEY, value).await
}
