//! Session events and snapshots
//!
//! Actions record events as they change observable state; consumers pull them
//! with [`crate::PlaybackSession::drain_events`] and re-render. A
//! [`SessionSnapshot`] carries every observable field at once.

use crate::types::{ActiveSource, PlaybackState, RepeatMode};
use cadence_core::Track;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Playback state changed
    StateChanged {
        /// The new state
        state: PlaybackState,
    },

    /// Current track changed
    TrackChanged {
        /// New current track id, if any
        track_id: Option<String>,
        /// Previous track id, if any
        previous_track_id: Option<String>,
    },

    /// Position or duration moved
    PositionUpdate {
        position_ms: u64,
        duration_ms: Option<u64>,
    },

    /// Queue contents changed
    QueueChanged {
        /// Number of queued tracks
        length: usize,
    },

    /// Liked flag of the current track changed
    LikeChanged {
        track_id: String,
        liked: bool,
    },

    /// Repeat mode changed
    RepeatChanged {
        mode: RepeatMode,
    },

    /// Shuffle toggled
    ShuffleChanged {
        enabled: bool,
    },

    /// Something failed and the session recovered
    Error {
        message: String,
    },
}

/// Every observable session field at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub current_track: Option<Track>,
    pub current_index: usize,
    pub active_source: Option<ActiveSource>,
    pub playlist_len: usize,
    pub queue: Vec<Track>,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub is_seeking: bool,
    pub is_liked: bool,
    pub repeat: RepeatMode,
    pub shuffle: bool,
}

impl SessionSnapshot {
    /// Playback progress in `[0, 1]`, 0 while duration is unknown
    pub fn progress(&self) -> f64 {
        progress(self.position_ms, self.duration_ms)
    }
}

pub(crate) fn progress(position_ms: u64, duration_ms: Option<u64>) -> f64 {
    match duration_ms {
        Some(d) if d > 0 => (position_ms as f64 / d as f64).clamp(0.0, 1.0),
        _ => 0.0,
    }
}
