//! Implements KeyValueStore using a JSON file.
//!
//! The whole map lives in one file (`preferences.json`), cached in memory and
//! rewritten on every `set`.

use crate::domain::DomainError;
use crate::ports::KeyValueStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub struct JsonKvStore {
    path: PathBuf,
    cache: tokio::sync::RwLock<BTreeMap<String, String>>,
}

impl JsonKvStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: tokio::sync::RwLock::new(BTreeMap::new()),
        }
    }

    /// Load the map from disk. A missing or unreadable file starts empty.
    pub async fn load(&self) -> Result<(), DomainError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "preference file unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        *self.cache.write().await = data;
        Ok(())
    }

    /// Write-replace: temp file, fsync, rename over the target.
    async fn save(&self, data: &BTreeMap<String, String>) -> Result<(), DomainError> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| DomainError::Preference(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Preference(format!("create dir: {}", e)))?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::Preference(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::Preference(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::Preference(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::Preference(format!("atomic rename failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.cache.read().await.get(key).cloned())
    }

    /// The cache only changes once the file has been replaced.
    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.insert(key.to_string(), value.to_string());
        self.save(&next).await?;
        *cache = next;
        Ok(())
    }
}
