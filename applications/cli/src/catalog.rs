//! Track catalog read from a JSON file
//!
//! The file holds an array of tracks:
//!
//! ```json
//! [{ "id": "t1", "title": "Intro", "artist": "Band", "url": "https://example.com/t1.mp3", "duration": 185.0 }]
//! ```

use crate::error::{CliError, Result};
use cadence_core::{Track, TrackCatalog, TrackId};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// In-memory catalog keyed by track id
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, usize>,
}

impl JsonCatalog {
    /// Build a catalog; later duplicates of an id are dropped
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut unique = Vec::with_capacity(tracks.len());
        let mut by_id = HashMap::with_capacity(tracks.len());
        for track in tracks {
            if by_id.contains_key(&track.id) {
                warn!(track_id = %track.id, "Duplicate track id in catalog");
                continue;
            }
            by_id.insert(track.id.clone(), unique.len());
            unique.push(track);
        }
        Self {
            tracks: unique,
            by_id,
        }
    }

    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let tracks: Vec<Track> = serde_json::from_str(json)?;
        Ok(Self::from_tracks(tracks))
    }

    /// Read a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CliError::Catalog(format!("cannot read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), tracks = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Look up a track or fail with `UnknownTrack`
    pub fn require(&self, id: &str) -> Result<Track> {
        self.track(&TrackId::new(id))
            .ok_or_else(|| CliError::UnknownTrack(id.to_string()))
    }

    /// Position of a track in catalog order
    pub fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Advisory lengths by url, for the simulated engine
    pub fn lengths_by_url(&self) -> HashMap<String, Duration> {
        self.tracks
            .iter()
            .filter_map(|t| Some((t.playable_url()?.to_string(), t.duration?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl TrackCatalog for JsonCatalog {
    fn track(&self, id: &TrackId) -> Option<Track> {
        self.by_id.get(id).map(|&i| self.tracks[i].clone())
    }

    fn tracks(&self) -> Vec<Track> {
        self.tracks.clone()
    }
}
