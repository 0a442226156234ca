use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Named records holding whole serialized values. Writes replace the record.
pub trait StateRepository: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn write(&self, key: &str, value: &str) -> Result<(), InfraError>;
}

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SqliteStateRepository {
    db_path: PathBuf,
}

impl SqliteStateRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl StateRepository for SqliteStateRepository {
    fn read(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_state WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_state (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    records: Mutex<HashMap<String, String>>,
}

impl InMemoryStateRepository {
    pub fn with_record(key: &str, value: &str) -> Self {
        Self {
            records: Mutex::new(HashMap::from([(key.to_string(), value.to_string())])),
        }
    }
}

impl StateRepository for InMemoryStateRepository {
    fn read(&self, key: &str) -> Result<Option<String>, InfraError> {
        let records = self
            .records
            .lock()
            .map_err(|error| InfraError::Persistence(format!("state lock poisoned: {error}")))?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut records = self
            .records
            .lock()
            .map_err(|error| InfraError::Persistence(format!("state lock poisoned: {error}")))?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
