//! SQLite-backed KeyValueStore via libsql.
//!
//! One `preferences` table keyed by name; writes are upserts. The database file
//! is `preferences.db` in the given directory.

use crate::domain::DomainError;
use crate::ports::KeyValueStore;
use libsql::{Database, params};
use std::path::{Path, PathBuf};
use tracing::info;

const PREFERENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)"#;

pub struct SqliteKvStore {
    db: Database,
    db_path: PathBuf,
}

impl SqliteKvStore {
    /// Open (or create) the database and ensure the schema exists.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Preference(e.to_string()))?;
        let db_path = base.join("preferences.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(|e| DomainError::Preference(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| DomainError::Preference(e.to_string()))?;
        conn.execute(PREFERENCES_TABLE, ())
            .await
            .map_err(|e| DomainError::Preference(e.to_string()))?;

        info!(path = %db_path.display(), "preference database ready");
        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DomainError::Preference(e.to_string()))?;
        let mut rows = conn
            .query(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| DomainError::Preference(e.to_string()))?;
        match rows
            .next()
            .await
            .map_err(|e| DomainError::Preference(e.to_string()))?
        {
            Some(row) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| DomainError::Preference(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DomainError::Preference(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .await
        .map_err(|e| DomainError::Preference(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteKvStore::connect(dir.path()).await.unwrap();
        assert_eq!(store.path(), dir.path().join("preferences.db"));
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "one").await.unwrap();
        store.set("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));

        let reopened = SqliteKvStore::connect(dir.path()).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("two"));
    }
}
