use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use kaas_core::{ModelConfig, NewModelConfig, Provider};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod embedded {
    refinery::embed_migrations!("migrations");
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
    #[error("Model not found: {0}")]
    NotFound(String),
    #[error("Lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Provider-specific part of a row, stored as JSON in `models.config`
#[derive(Debug, Serialize, Deserialize)]
struct StoredConfig {
    endpoint: String,
    model: String,
}

struct Row {
    id: String,
    provider: String,
    name: String,
    config: String,
}

impl Row {
    /// `None` for rows this build cannot represent; they are logged and skipped.
    fn into_model(self) -> Option<ModelConfig> {
        let Ok(provider) = self.provider.parse::<Provider>() else {
            tracing::warn!(
                id = %self.id,
                provider = %self.provider,
                "Skipping model with unsupported provider"
            );
            return None;
        };
        let config: StoredConfig = match serde_json::from_str(&self.config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "Skipping model with malformed config");
                return None;
            }
        };
        Some(ModelConfig {
            id: self.id,
            provider,
            alias: self.name,
            endpoint: config.endpoint,
            model: config.model,
        })
    }
}

/// Configured models backed by SQLite
#[derive(Clone)]
pub struct ModelStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl ModelStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self::migrate(conn, Some(path.to_path_buf()))?;
        tracing::info!("Model database initialized at {:?}", path);
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        Self::migrate(Connection::open_in_memory()?, None)
    }

    fn migrate(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn create(&self, model: NewModelConfig) -> Result<ModelConfig> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let id = uuid::Uuid::new_v4().to_string();
        let config = stored_config(&model.endpoint, &model.model)?;
        conn.execute(
            "INSERT INTO models (id, provider, name, config) VALUES (?1, ?2, ?3, ?4)",
            params![id, model.provider.as_str(), model.alias, config],
        )?;

        tracing::debug!("Created model config: {}", id);
        Ok(model.with_id(id))
    }

    pub fn update(&self, model: &ModelConfig) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let config = stored_config(&model.endpoint, &model.model)?;
        let changed = conn.execute(
            "UPDATE models SET provider = ?2, name = ?3, config = ?4 WHERE id = ?1",
            params![model.id, model.provider.as_str(), model.alias, config],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(model.id.clone()));
        }

        tracing::debug!("Updated model config: {}", model.id);
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let changed = conn.execute("DELETE FROM models WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        tracing::debug!("Deleted model config: {}", id);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<ModelConfig>> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let row = conn
            .query_row(
                "SELECT id, provider, name, config FROM models WHERE id = ?1",
                params![id],
                read_row,
            )
            .optional()?;

        Ok(row.and_then(Row::into_model))
    }

    pub fn list(&self) -> Result<Vec<ModelConfig>> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let mut stmt = conn.prepare(
            "SELECT id, provider, name, config FROM models ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], read_row)?;

        let mut results = Vec::new();
        for row in rows {
            if let Some(model) = row?.into_model() {
                results.push(model);
            }
        }
        Ok(results)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok(Row {
        id: row.get(0)?,
        provider: row.get(1)?,
        name: row.get(2)?,
        config: row.get(3)?,
    })
}

fn stored_config(endpoint: &str, model: &str) -> Result<String> {
    Ok(serde_json::to_string(&StoredConfig {
        endpoint: endpoint.to_string(),
        model: model.to_string(),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> NewModelConfig {
        NewModelConfig {
            provider: Provider::Ollama,
            alias: "Local".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
        }
    }

    #[test]
    fn test_create_assigns_id() {
        let store = ModelStore::in_memory().unwrap();
        let created = store.create(local()).unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.fields(), local());
        assert_eq!(store.get(&created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_update_and_delete() {
        let store = ModelStore::in_memory().unwrap();
        let mut created = store.create(local()).unwrap();

        created.model = "qwen2:7b".to_string();
        store.update(&created).unwrap();
        assert_eq!(store.list().unwrap(), vec![created.clone()]);

        store.delete(&created.id).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.delete(&created.id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.update(&created), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_skips_unknown_providers() {
        let store = ModelStore::in_memory().unwrap();
        let kept = store.create(local()).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO models (id, provider, name, config) VALUES (?1, ?2, ?3, ?4)",
                params!["legacy", "CUSTOM", "Old", "{}"],
            )
            .unwrap();
        }

        assert_eq!(store.list().unwrap(), vec![kept]);
        assert_eq!(store.get("legacy").unwrap(), None);
    }

    #[test]
    fn test_list_skips_malformed_config() {
        let store = ModelStore::in_memory().unwrap();
        let kept = store.create(local()).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO models (id, provider, name, config) VALUES (?1, ?2, ?3, ?4)",
                params!["broken", "Ollama", "Broken", "not json"],
            )
            .unwrap();
        }

        assert_eq!(store.list().unwrap(), vec![kept]);
        assert_eq!(store.get("broken").unwrap(), None);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("kaas-store-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("kaas.db");

        let store = ModelStore::open(&path).unwrap();
        store.create(local()).unwrap();
        drop(store);

        let reopened = ModelStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 1);
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
