//! Error types for playback management

use crate::engine::EngineError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Track has no playable url
    #[error("Track has no playable url: {0}")]
    MissingUrl(String),

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Audio engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Liked-set or playlist store error
    #[error("Store error: {0}")]
    Store(#[from] cadence_core::CadenceError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
