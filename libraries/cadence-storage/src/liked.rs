//! Liked tracks
//!
//! The liked set is one JSON array of track ids under [`LIKED_TRACKS_KEY`],
//! kept in the order tracks were liked.

use crate::error::{Result, StorageError};
use crate::kv;
use async_trait::async_trait;
use cadence_core::{LikedStore, TrackId};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key holding the liked track ids
pub const LIKED_TRACKS_KEY: &str = "cadence.liked_tracks";

/// SQLite-backed liked set
pub struct LikedTracks {
    pool: SqlitePool,
    /// Serializes read-modify-write cycles on the id array
    write_lock: Mutex<()>,
}

impl LikedTracks {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Every liked id, oldest first
    pub async fn ids(&self) -> Result<Vec<TrackId>> {
        Ok(kv::get_json(&self.pool, LIKED_TRACKS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Whether `id` is liked; blank ids never are
    pub async fn contains(&self, id: &TrackId) -> Result<bool> {
        if id.is_blank() {
            return Ok(false);
        }
        Ok(self.ids().await?.contains(id))
    }

    /// Add `id`; returns false when it was already liked
    pub async fn add(&self, id: &TrackId) -> Result<bool> {
        reject_blank(id)?;
        let _guard = self.write_lock.lock().await;

        let mut ids = self.ids().await?;
        if ids.contains(id) {
            return Ok(false);
        }
        ids.push(id.clone());
        kv::set_json(&self.pool, LIKED_TRACKS_KEY, &ids).await?;
        debug!(track_id = %id, "Track liked");
        Ok(true)
    }

    /// Remove `id`; returns false when it wasn't liked
    pub async fn remove(&self, id: &TrackId) -> Result<bool> {
        reject_blank(id)?;
        let _guard = self.write_lock.lock().await;

        let mut ids = self.ids().await?;
        let before = ids.len();
        ids.retain(|liked| liked != id);
        if ids.len() == before {
            return Ok(false);
        }
        kv::set_json(&self.pool, LIKED_TRACKS_KEY, &ids).await?;
        debug!(track_id = %id, "Track unliked");
        Ok(true)
    }

    /// Forget every liked track
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        kv::remove_item(&self.pool, LIKED_TRACKS_KEY).await?;
        debug!("Liked tracks cleared");
        Ok(())
    }
}

fn reject_blank(id: &TrackId) -> Result<()> {
    if id.is_blank() {
        warn!("Rejected blank track id");
        return Err(StorageError::InvalidInput("track id is blank".to_string()));
    }
    Ok(())
}

#[async_trait]
impl LikedStore for LikedTracks {
    async fn is_liked(&self, track_id: &TrackId) -> cadence_core::Result<bool> {
        Ok(self.contains(track_id).await?)
    }

    async fn like(&self, track_id: &TrackId) -> cadence_core::Result<()> {
        self.add(track_id).await?;
        Ok(())
    }

    async fn unlike(&self, track_id: &TrackId) -> cadence_core::Result<()> {
        self.remove(track_id).await?;
        Ok(())
    }

    async fn liked_ids(&self) -> cadence_core::Result<Vec<TrackId>> {
        Ok(self.ids().await?)
    }
}
