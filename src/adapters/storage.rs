use crate::domain::ports::SettingsStore;
use crate::utils::error::{ConverterError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.values.lock().await.clone()
    }
}

impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set_many(&self, entries: Vec<(&'static str, Value)>) -> Result<()> {
        let mut values = self.values.lock().await;
        for (key, value) in entries {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Settings persisted as one JSON object in a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(ConverterError::StorageError {
                message: format!("{} does not contain a JSON object", self.path.display()),
            }),
        }
    }
}

impl SettingsStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let map = self.load().await?;
        Ok(map.get(key).cloned())
    }

    async fn set_many(&self, entries: Vec<(&'static str, Value)>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(&Value::Object(map))?;
        tokio::fs::write(&self.path, data).await?;
        tracing::debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}
