//! Liked status of the current track
//!
//! Mirrors the persisted liked set for whichever track is current. Lookups
//! that fail are logged and read as "not liked".

use cadence_core::{LikedStore, TrackId};
use tracing::{debug, warn};

/// Cached liked flag for one track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeStatus {
    track: Option<TrackId>,
    liked: bool,
}

impl LikeStatus {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cached track is liked
    pub fn is_liked(&self) -> bool {
        self.liked
    }

    /// Track the cached flag belongs to
    pub fn track(&self) -> Option<&TrackId> {
        self.track.as_ref()
    }

    /// Re-read the flag for `track` (or clear it when there is no track)
    ///
    /// Returns true when the flag changed.
    pub async fn refresh<L>(&mut self, store: &L, track: Option<&TrackId>) -> bool
    where
        L: LikedStore + ?Sized,
    {
        let before = self.liked;
        self.track = track.cloned();
        self.liked = match track {
            None => false,
            Some(id) => match store.is_liked(id).await {
                Ok(liked) => liked,
                Err(e) => {
                    warn!(track_id = %id, error = %e, "Failed to read liked status");
                    false
                }
            },
        };
        before != self.liked
    }

    /// Flip the flag for `track`, then persist it
    ///
    /// The local flag flips before the store is called. If the store rejects
    /// the change the flip is reverted and the error returned.
    pub async fn toggle<L>(&mut self, store: &L, track: &TrackId) -> cadence_core::Result<bool>
    where
        L: LikedStore + ?Sized,
    {
        if self.track.as_ref() != Some(track) {
            self.track = Some(track.clone());
        }
        self.liked = !self.liked;

        let persisted = if self.liked {
            store.like(track).await
        } else {
            store.unlike(track).await
        };

        match persisted {
            Ok(()) => {
                debug!(track_id = %track, liked = self.liked, "Liked status persisted");
                Ok(self.liked)
            }
            Err(e) => {
                self.liked = !self.liked;
                Err(e)
            }
        }
    }
}
