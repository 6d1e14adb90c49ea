/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input rejected before touching the database
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Migration error
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<StorageError> for cadence_core::CadenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput(msg) => Self::invalid_input(msg),
            StorageError::NotFound { entity, id } => Self::not_found(entity, id),
            other => Self::storage(other.to_string()),
        }
    }
}
