//! Platform-agnostic audio engine boundary
//!
//! Abstracts the platform audio player (native media player on mobile, a
//! simulated player in the CLI, a mock in tests). The session never talks to
//! an engine directly; [`crate::AudioResource`] owns the only handle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Engine error messages that mean "there was nothing to unload"
const NOT_LOADED_PATTERNS: &[&str] = &["sound is not loaded", "PLAYER_ERR_NO_SRC_SET"];

/// Errors reported by an audio engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Operation needs loaded content but none is loaded
    #[error("sound is not loaded")]
    NotLoaded,

    /// Source could not be loaded (malformed source, fetch failure)
    #[error("Load failed: {0}")]
    Load(String),

    /// Any other engine failure
    #[error("Engine error: {0}")]
    Playback(String),
}

impl EngineError {
    /// Whether the error only says nothing was loaded
    ///
    /// Platform players report this with free-form messages, so those are
    /// matched by pattern as well.
    pub fn is_not_loaded(&self) -> bool {
        match self {
            Self::NotLoaded => true,
            Self::Load(msg) | Self::Playback(msg) => {
                NOT_LOADED_PATTERNS.iter().any(|p| msg.contains(p))
            }
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Status snapshot pushed by (or queried from) an engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Content is loaded
    pub is_loaded: bool,

    /// Content is playing
    pub is_playing: bool,

    /// Current position
    pub position_millis: u64,

    /// Duration, once the engine knows it
    pub duration_millis: Option<u64>,

    /// Playback reached the end since the previous status
    pub did_just_finish: bool,

    /// Single-track looping is enabled
    pub is_looping: bool,

    /// Error description, if the engine hit one
    pub error: Option<String>,
}

/// Options passed to [`AudioEngine::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Start playing as soon as the source is loaded
    pub autoplay_on_load: bool,

    /// How often the engine pushes status updates
    pub status_update_interval: Duration,
}

/// Identifies one status subscription on the engine handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// A status update tagged with the subscription that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Subscription the engine delivered this update through
    pub subscription: SubscriptionId,

    /// The status payload
    pub status: EngineStatus,
}

/// Where an engine pushes status updates
///
/// Handed to the engine by `subscribe_status`. Updates emitted through a sink
/// whose subscription has since been replaced are discarded by the receiver.
#[derive(Debug, Clone)]
pub struct StatusSink {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSink {
    pub(crate) fn new(id: SubscriptionId, tx: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { id, tx }
    }

    /// Subscription this sink belongs to
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Push a status update
    ///
    /// Returns false when the receiving side has been dropped.
    pub fn emit(&self, status: EngineStatus) -> bool {
        self.tx
            .send(StatusUpdate {
                subscription: self.id,
                status,
            })
            .is_ok()
    }
}

/// Platform audio player
///
/// Implementors load one source at a time and push status updates through the
/// sink they were given. All methods may suspend on an engine round-trip.
#[async_trait]
pub trait AudioEngine: Send {
    /// Load `uri`, replacing nothing (callers unload first)
    async fn load(&mut self, uri: &str, options: LoadOptions) -> EngineResult<EngineStatus>;

    /// Start or resume playback
    async fn play(&mut self) -> EngineResult<()>;

    /// Pause playback
    async fn pause(&mut self) -> EngineResult<()>;

    /// Stop playback and rewind to the start
    async fn stop(&mut self) -> EngineResult<()>;

    /// Release the loaded source
    async fn unload(&mut self) -> EngineResult<()>;

    /// Seek, keeping or dropping the playing state
    async fn seek_to(&mut self, position: Duration, keep_playing: bool) -> EngineResult<()>;

    /// Enable or disable single-track looping
    async fn set_looping(&mut self, looping: bool) -> EngineResult<()>;

    /// Restart the loaded source from the beginning and play
    async fn replay(&mut self) -> EngineResult<()>;

    /// Query the current status
    async fn status(&mut self) -> EngineResult<EngineStatus>;

    /// Start pushing status updates into `sink`, replacing any previous sink
    fn subscribe_status(&mut self, sink: StatusSink);

    /// Stop pushing status updates
    fn unsubscribe_status(&mut self);
}

/// Creates engine handles
///
/// Called at most once per session; the handle is reused for every track.
pub trait EngineFactory: Send {
    /// Engine type produced by this factory
    type Engine: AudioEngine;

    /// Create a new engine handle
    fn create(&mut self) -> EngineResult<Self::Engine>;
}

impl<E, F> EngineFactory for F
where
    E: AudioEngine,
    F: FnMut() -> EngineResult<E> + Send,
{
    type Engine = E;

    fn create(&mut self) -> EngineResult<E> {
        self()
    }
}
