//! Collaborator traits consumed by the playback engine
//!
//! Implementations live outside the core (see `cadence-storage`); the
//! playback engine only depends on these shapes.

use crate::error::Result;
use crate::types::{Playlist, PlaylistId, Track, TrackId};
use async_trait::async_trait;

/// Persisted set of liked track ids
#[async_trait]
pub trait LikedStore: Send + Sync {
    /// Whether `track_id` is in the liked set
    async fn is_liked(&self, track_id: &TrackId) -> Result<bool>;

    /// Add `track_id` to the liked set (idempotent)
    async fn like(&self, track_id: &TrackId) -> Result<()>;

    /// Remove `track_id` from the liked set (idempotent)
    async fn unlike(&self, track_id: &TrackId) -> Result<()>;

    /// All liked ids, in the order they were liked
    async fn liked_ids(&self) -> Result<Vec<TrackId>>;
}

/// User playlists, read-mostly from the engine's point of view
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// List every playlist
    async fn list_playlists(&self) -> Result<Vec<Playlist>>;

    /// Append a track to a playlist
    ///
    /// Returns the updated playlist, or `None` when the playlist does not exist.
    async fn add_track(&self, playlist_id: &PlaylistId, track_id: &TrackId)
        -> Result<Option<Playlist>>;

    /// Remove a track from a playlist
    ///
    /// Returns the updated playlist, or `None` when the playlist does not exist.
    async fn remove_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Option<Playlist>>;
}

/// Resolves track ids into full track records
pub trait TrackCatalog: Send + Sync {
    /// Look up a single track
    fn track(&self, id: &TrackId) -> Option<Track>;

    /// Every track in catalog order
    fn tracks(&self) -> Vec<Track>;
}

/// Resolve playlist track ids into tracks, skipping ids the catalog doesn't know
pub fn hydrate_tracks<C: TrackCatalog + ?Sized>(catalog: &C, ids: &[TrackId]) -> Vec<Track> {
    ids.iter().filter_map(|id| catalog.track(id)).collect()
}
