//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track loaded
    Idle,

    /// Handing a track to the audio engine
    Loading,

    /// Track loaded, not playing
    ReadyPaused,

    /// Track loaded and playing
    ReadyPlaying,

    /// Playlist and queue ran out; last track kept for display, position reset
    Ended,
}

impl PlaybackState {
    /// Whether position and duration are meaningful in this state
    pub fn is_ready(self) -> bool {
        matches!(self, Self::ReadyPaused | Self::ReadyPlaying)
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when playlist and queue end
    #[default]
    Off,

    /// Loop entire playlist
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the Off -> All -> One -> Off cycle
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Which ordered source the current track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveSource {
    /// The primary playlist; `current_index` points at the current track
    Playlist,

    /// The ad-hoc queue; `current_index` keeps its previous value
    Queue,
}

/// Configuration for the playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How often the engine should push status updates (default: 500ms)
    pub status_update_interval_ms: u64,

    /// How long a seek may wait for engine confirmation (default: 250ms)
    pub seek_settle_ms: u64,

    /// Position past which "previous" restarts the track (default: 3000ms)
    pub restart_threshold_ms: u64,

    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Initial shuffle state (default: false)
    pub shuffle: bool,

    /// Fixed seed for shuffle picks; random when unset
    pub shuffle_seed: Option<u64>,
}

impl PlaybackConfig {
    /// Status update interval as a `Duration`
    pub fn status_update_interval(&self) -> Duration {
        Duration::from_millis(self.status_update_interval_ms)
    }

    /// Seek settle window as a `Duration`
    pub fn seek_settle(&self) -> Duration {
        Duration::from_millis(self.seek_settle_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            status_update_interval_ms: 500,
            seek_settle_ms: 250,
            restart_threshold_ms: 3000,
            repeat: RepeatMode::Off,
            shuffle: false,
            shuffle_seed: None,
        }
    }
}
