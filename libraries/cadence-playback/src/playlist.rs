//! Primary playlist and its cursor

use cadence_core::Track;

/// The album/playlist/artist context being played, plus the current index
#[derive(Debug, Clone, Default)]
pub struct PlaylistCursor {
    tracks: Vec<Track>,
    index: usize,
}

impl PlaylistCursor {
    /// Create an empty cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the playlist and move the cursor
    pub fn replace(&mut self, tracks: Vec<Track>, index: usize) {
        self.tracks = tracks;
        self.index = index;
    }

    /// Current index (meaningful only when the playlist is the active source)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Move the cursor; returns the track now under it
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        let track = self.tracks.get(index)?;
        self.index = index;
        Some(track)
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    /// Track at `index`
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Every track in order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_moves_only_within_bounds() {
        let mut cursor = PlaylistCursor::new();
        cursor.replace(vec![Track::new("a", "A"), Track::new("b", "B")], 0);

        assert_eq!(cursor.select(1).unwrap().id.as_str(), "b");
        assert_eq!(cursor.index(), 1);

        assert!(cursor.select(2).is_none());
        assert_eq!(cursor.index(), 1);
        assert_eq!(cursor.current().unwrap().id.as_str(), "b");
    }
}
