//! Ad-hoc play queue
//!
//! FIFO of tracks the user inserted with "add to queue" / "play next". It is
//! independent of the primary playlist and is consumed only after the playlist
//! can no longer advance.

use cadence_core::Track;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// FIFO of playable tracks
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: VecDeque<Track>,
}

impl PlayQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track
    ///
    /// Tracks without a playable url are dropped; returns whether it was queued.
    pub fn push_back(&mut self, track: Track) -> bool {
        if !track.is_playable() {
            warn!(track_id = %track.id, "Dropping unplayable track from queue");
            return false;
        }
        debug!(track_id = %track.id, title = %track.title, len = self.tracks.len() + 1, "Added to queue");
        self.tracks.push_back(track);
        true
    }

    /// Prepend a track so it plays before everything already queued
    ///
    /// Tracks without a playable url are dropped; returns whether it was queued.
    pub fn push_front(&mut self, track: Track) -> bool {
        if !track.is_playable() {
            warn!(track_id = %track.id, "Dropping unplayable track from queue");
            return false;
        }
        debug!(track_id = %track.id, title = %track.title, len = self.tracks.len() + 1, "Added to start of queue");
        self.tracks.push_front(track);
        true
    }

    /// Take the next track
    pub fn pop_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Peek at the next track without consuming it
    pub fn peek(&self) -> Option<&Track> {
        self.tracks.front()
    }

    /// Remove the entry at `index`
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        self.tracks.remove(index)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Number of queued tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterate in play order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
