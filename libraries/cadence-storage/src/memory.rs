//! In-memory liked set for ephemeral sessions and tests

use async_trait::async_trait;
use cadence_core::{CadenceError, LikedStore, TrackId};
use std::sync::{Mutex, PoisonError};

/// Liked set kept in process memory
#[derive(Debug, Default)]
pub struct MemoryLikedStore {
    ids: Mutex<Vec<TrackId>>,
}

impl MemoryLikedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `ids` already liked
    pub fn with_ids(ids: impl IntoIterator<Item = TrackId>) -> Self {
        let mut unique = Vec::new();
        for id in ids {
            if !id.is_blank() && !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            ids: Mutex::new(unique),
        }
    }

    fn with_ids_mut<T>(&self, f: impl FnOnce(&mut Vec<TrackId>) -> T) -> T {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ids)
    }
}

fn reject_blank(id: &TrackId) -> cadence_core::Result<()> {
    if id.is_blank() {
        return Err(CadenceError::invalid_input("track id is blank"));
    }
    Ok(())
}

#[async_trait]
impl LikedStore for MemoryLikedStore {
    async fn is_liked(&self, track_id: &TrackId) -> cadence_core::Result<bool> {
        Ok(self.with_ids_mut(|ids| ids.contains(track_id)))
    }

    async fn like(&self, track_id: &TrackId) -> cadence_core::Result<()> {
        reject_blank(track_id)?;
        self.with_ids_mut(|ids| {
            if !ids.contains(track_id) {
                ids.push(track_id.clone());
            }
        });
        Ok(())
    }

    async fn unlike(&self, track_id: &TrackId) -> cadence_core::Result<()> {
        reject_blank(track_id)?;
        self.with_ids_mut(|ids| ids.retain(|id| id != track_id));
        Ok(())
    }

    async fn liked_ids(&self) -> cadence_core::Result<Vec<TrackId>> {
        Ok(self.with_ids_mut(|ids| ids.clone()))
    }
}
