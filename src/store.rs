use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use std::path::Path;

/// Durable string key-value storage.
pub trait KeyValueStore: Send + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read key {key}")]
    Get {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to write key {key}")]
    Set {
        key: String,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreCreationError {
    #[error("failed to open sqlite db")]
    OpenDb(#[source] rusqlite::Error),
    #[error("failed to get current version")]
    GetVersion(#[source] rusqlite::Error),
    #[error("failed to start transaction")]
    StartTransaction(#[source] rusqlite::Error),
    #[error("failed to commit transaction")]
    CommitTransaction(#[source] rusqlite::Error),
    #[error("failed to create key value table")]
    CreateKvTable(#[source] rusqlite::Error),
    #[error("db has unexpected version {0}")]
    UnexpectedVersion(usize),
}

const DB_VERSION: usize = 1;

pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> Result<SqliteStore, StoreCreationError> {
        let mut connection = Connection::open(path).map_err(StoreCreationError::OpenDb)?;

        initialize_connection(&mut connection)?;

        Ok(SqliteStore { connection })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<SqliteStore, StoreCreationError> {
        let mut connection = Connection::open_in_memory().map_err(StoreCreationError::OpenDb)?;

        initialize_connection(&mut connection)?;

        Ok(SqliteStore { connection })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.connection
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(|source| StoreError::Get {
                key: key.to_string(),
                source,
            })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.connection
            .execute(
                "
            INSERT INTO kv(key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
                params![key, value],
            )
            .map_err(|source| StoreError::Set {
                key: key.to_string(),
                source,
            })?;

        Ok(())
    }
}

/// Store that forgets everything on drop
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn initialize_v1_db(connection: &mut Connection) -> Result<(), StoreCreationError> {
    let transaction = connection
        .transaction()
        .map_err(StoreCreationError::StartTransaction)?;

    transaction
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );
            PRAGMA user_version = 1;
            ",
        )
        .map_err(StoreCreationError::CreateKvTable)?;

    transaction
        .commit()
        .map_err(StoreCreationError::CommitTransaction)?;

    Ok(())
}

fn initialize_connection(connection: &mut Connection) -> Result<(), StoreCreationError> {
    let version: usize = connection
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(StoreCreationError::GetVersion)?;

    let upgrade_functions = [initialize_v1_db];

    for f in upgrade_functions.iter().skip(version) {
        f(connection)?;
    }

    let version: usize = connection
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(StoreCreationError::GetVersion)?;

    if version != DB_VERSION {
        return Err(StoreCreationError::UnexpectedVersion(version));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_key() {
        let store = SqliteStore::new_in_memory().expect("Failed to create db");
        assert_eq!(store.get("watched").expect("Failed to get key"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = SqliteStore::new_in_memory().expect("Failed to create db");
        store.set("watched", "[]").expect("Failed to set key");
        store.set("watched", "[1]").expect("Failed to set key");
        store.set("other", "x").expect("Failed to set key");

        assert_eq!(
            store.get("watched").expect("Failed to get key"),
            Some("[1]".to_string())
        );
        assert_eq!(
            store.get("other").expect("Failed to get key"),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_reopen_keeps_values() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("popcorn.db");

        let mut store = SqliteStore::new(&path).expect("Failed to create db");
        store.set("watched", "[]").expect("Failed to set key");
        drop(store);

        let store = SqliteStore::new(&path).expect("Failed to reopen db");
        assert_eq!(
            store.get("watched").expect("Failed to get key"),
            Some("[]".to_string())
        );
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        assert_eq!(store.get("watched").expect("Failed to get key"), None);
        store.set("watched", "[]").expect("Failed to set key");
        assert_eq!(
            store.get("watched").expect("Failed to get key"),
            Some("[]".to_string())
        );
    }
}
