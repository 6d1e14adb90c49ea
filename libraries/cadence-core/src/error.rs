/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type for Cadence
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = CadenceError::not_found("Playlist", "p-1");
        assert_eq!(err.to_string(), "Playlist not found: p-1");
    }
}
