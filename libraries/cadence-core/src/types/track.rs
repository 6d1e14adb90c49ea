/// Track domain type
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A catalog track
///
/// Immutable once constructed. The playback engine never mutates it; the
/// authoritative duration comes from the loaded audio resource and `duration`
/// is only a hint used until the engine reports one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Playable source location; `None` for unplayable entries
    #[serde(default)]
    pub url: Option<String>,

    /// Track title
    pub title: String,

    /// Artist name
    #[serde(default)]
    pub artist: String,

    /// Album name
    #[serde(default)]
    pub album: String,

    /// Artwork image reference
    #[serde(default)]
    pub artwork: Option<String>,

    /// Advisory duration, serialized as seconds
    #[serde(default, with = "duration_secs")]
    pub duration: Option<Duration>,
}

impl Track {
    /// Create a track with only an id and a title
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            artwork: None,
            duration: None,
        }
    }

    /// Set the playable url
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the artist
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// Set the album
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    /// Set the advisory duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Playable source location, ignoring empty strings
    pub fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Whether the track can be handed to an audio engine
    pub fn is_playable(&self) -> bool {
        self.playable_url().is_some()
    }

    /// Advisory duration in milliseconds
    pub fn duration_millis(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64))
    }
}
