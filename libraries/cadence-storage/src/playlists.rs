//! User playlists
//!
//! All playlists are stored together as one JSON array under
//! [`USER_PLAYLISTS_KEY`]. Each mutation rewrites the array.

use crate::error::{Result, StorageError};
use crate::kv;
use async_trait::async_trait;
use cadence_core::{Playlist, PlaylistId, PlaylistStore, TrackId};
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key holding the playlist array
pub const USER_PLAYLISTS_KEY: &str = "cadence.user_playlists";

/// Editable playlist details; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` removes the artwork
    pub artwork: Option<Option<String>>,
}

impl PlaylistUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.artwork.is_none()
    }
}

/// SQLite-backed user playlists
pub struct UserPlaylists {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl UserPlaylists {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Every playlist in creation order
    pub async fn list(&self) -> Result<Vec<Playlist>> {
        Ok(kv::get_json(&self.pool, USER_PLAYLISTS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Look up one playlist
    pub async fn get(&self, id: &PlaylistId) -> Result<Option<Playlist>> {
        Ok(self.list().await?.into_iter().find(|p| &p.id == id))
    }

    async fn save(&self, playlists: &[Playlist]) -> Result<()> {
        kv::set_json(&self.pool, USER_PLAYLISTS_KEY, playlists).await
    }

    /// Create an empty playlist
    ///
    /// The name and description are trimmed; an empty name is rejected.
    pub async fn create(&self, name: &str, description: &str) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            warn!("Rejected playlist with empty name");
            return Err(StorageError::InvalidInput(
                "playlist name cannot be empty".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut playlists = self.list().await?;
        let playlist = Playlist::new(name, description.trim());
        playlists.push(playlist.clone());
        self.save(&playlists).await?;

        debug!(playlist_id = %playlist.id, name = %playlist.name, "Playlist created");
        Ok(playlist)
    }

    /// Delete a playlist; returns whether it existed
    pub async fn delete(&self, id: &PlaylistId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.list().await?;
        let before = playlists.len();
        playlists.retain(|p| &p.id != id);
        if playlists.len() == before {
            warn!(playlist_id = %id, "Playlist not found for deletion");
            return Ok(false);
        }
        self.save(&playlists).await?;
        debug!(playlist_id = %id, "Playlist deleted");
        Ok(true)
    }

    /// Append a track; adding a track twice leaves the playlist unchanged
    pub async fn add_track(&self, id: &PlaylistId, track_id: &TrackId) -> Result<Option<Playlist>> {
        reject_blank(track_id)?;
        self.modify(id, |playlist| {
            if playlist.contains(track_id) {
                return false;
            }
            playlist.track_ids.push(track_id.clone());
            true
        })
        .await
    }

    /// Remove every occurrence of a track
    pub async fn remove_track(
        &self,
        id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Option<Playlist>> {
        reject_blank(track_id)?;
        self.modify(id, |playlist| {
            let before = playlist.track_ids.len();
            playlist.track_ids.retain(|t| t != track_id);
            playlist.track_ids.len() != before
        })
        .await
    }

    /// Change name, description or artwork
    pub async fn update(&self, id: &PlaylistId, update: PlaylistUpdate) -> Result<Option<Playlist>> {
        if update.is_empty() {
            return Err(StorageError::InvalidInput("no playlist changes given".to_string()));
        }
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(StorageError::InvalidInput(
                    "playlist name cannot be empty".to_string(),
                ));
            }
        }

        self.modify(id, |playlist| {
            if let Some(name) = &update.name {
                playlist.name = name.trim().to_string();
            }
            if let Some(description) = &update.description {
                playlist.description = description.trim().to_string();
            }
            if let Some(artwork) = &update.artwork {
                playlist.artwork.clone_from(artwork);
            }
            true
        })
        .await
    }

    /// Apply `change` to one playlist and persist when it reports a change
    ///
    /// Returns `None` when the playlist doesn't exist.
    async fn modify<F>(&self, id: &PlaylistId, change: F) -> Result<Option<Playlist>>
    where
        F: FnOnce(&mut Playlist) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.list().await?;
        let Some(playlist) = playlists.iter_mut().find(|p| &p.id == id) else {
            warn!(playlist_id = %id, "Playlist not found");
            return Ok(None);
        };

        if !change(playlist) {
            return Ok(Some(playlist.clone()));
        }
        playlist.updated_at = Utc::now();
        let updated = playlist.clone();
        self.save(&playlists).await?;

        debug!(playlist_id = %id, tracks = updated.track_ids.len(), "Playlist updated");
        Ok(Some(updated))
    }
}

fn reject_blank(id: &TrackId) -> Result<()> {
    if id.is_blank() {
        return Err(StorageError::InvalidInput("track id is blank".to_string()));
    }
    Ok(())
}

#[async_trait]
impl PlaylistStore for UserPlaylists {
    async fn list_playlists(&self) -> cadence_core::Result<Vec<Playlist>> {
        Ok(self.list().await?)
    }

    async fn add_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> cadence_core::Result<Option<Playlist>> {
        Ok(UserPlaylists::add_track(self, playlist_id, track_id).await?)
    }

    async fn remove_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> cadence_core::Result<Option<Playlist>> {
        Ok(UserPlaylists::remove_track(self, playlist_id, track_id).await?)
    }
}
