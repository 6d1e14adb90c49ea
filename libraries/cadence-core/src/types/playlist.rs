/// Playlist domain types
use crate::types::{PlaylistId, TrackId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user playlist
///
/// Holds track ids only; tracks are resolved through a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Unique playlist identifier
    pub id: PlaylistId,

    /// Playlist name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Artwork image reference
    #[serde(default)]
    pub artwork: Option<String>,

    /// Ordered track ids
    #[serde(default)]
    pub track_ids: Vec<TrackId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Create a new empty playlist
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PlaylistId::generate(),
            name: name.into(),
            description: description.into(),
            artwork: None,
            track_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the playlist already references `track_id`
    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.track_ids.contains(track_id)
    }
}
