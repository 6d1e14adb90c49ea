/// CLI error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Unknown playlist: {0}")]
    UnknownPlaylist(String),

    #[error("Storage error: {0}")]
    Storage(#[from] cadence_storage::StorageError),

    #[error(transparent)]
    Core(#[from] cadence_core::CadenceError),

    #[error(transparent)]
    Playback(#[from] cadence_playback::PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
