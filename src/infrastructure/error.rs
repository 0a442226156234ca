use crate::domain::error::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Suggestion service error: {0}")]
    Collaborator(String),
    #[error("Suggestion service timed out after {seconds}s")]
    CollaboratorTimeout { seconds: u64 },
    #[error("Administrator login required")]
    Unauthorized,
    #[error("No pending import batch with id '{0}'")]
    NoPendingBatch(String),
}

