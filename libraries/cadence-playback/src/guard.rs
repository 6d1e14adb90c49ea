//! Suppression of repeated "open this track" requests
//!
//! Screens re-send the same track request on every re-render. The guard
//! remembers the last id it let through so those repeats don't reload audio.

use cadence_core::TrackId;

/// Remembers the last track request that was acted on
#[derive(Debug, Clone, Default)]
pub struct TrackRequestGuard {
    last_processed: Option<TrackId>,
}

impl TrackRequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a request for `requested` should load it
    ///
    /// Loads when nothing is loading and either the id differs from the last
    /// one processed or it differs from what is currently playing.
    pub fn should_load(
        &self,
        requested: &TrackId,
        current: Option<&TrackId>,
        is_loading: bool,
    ) -> bool {
        if is_loading {
            return false;
        }
        let is_new_request = self.last_processed.as_ref() != Some(requested);
        let differs_from_current = current != Some(requested);
        is_new_request || differs_from_current
    }

    /// Record that `id` was acted on
    pub fn mark(&mut self, id: TrackId) {
        self.last_processed = Some(id);
    }

    pub fn last_processed(&self) -> Option<&TrackId> {
        self.last_processed.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_request_for_current_track_is_ignored() {
        let mut guard = TrackRequestGuard::new();
        let id = TrackId::new("t1");

        assert!(guard.should_load(&id, None, false));
        guard.mark(id.clone());

        assert!(!guard.should_load(&id, Some(&id), false));
    }

    #[test]
    fn same_request_reloads_after_track_moved_on() {
        let mut guard = TrackRequestGuard::new();
        let id = TrackId::new("t1");
        guard.mark(id.clone());

        let other = TrackId::new("t2");
        assert!(guard.should_load(&id, Some(&other), false));
    }

    #[test]
    fn nothing_loads_while_loading() {
        let guard = TrackRequestGuard::new();
        assert!(!guard.should_load(&TrackId::new("t1"), None, true));
    }
}
