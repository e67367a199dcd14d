//! The play queue: an ordered list of tracks plus a cursor.
//!
//! Pure and synchronous. Nothing in here touches the playback device; the
//! transport asks the queue which track comes next and starts it itself.

use crate::library::Track;

#[derive(Debug, Clone, Default)]
pub struct QueueManager {
    tracks: Vec<Track>,
    // `None` exactly when `tracks` is empty.
    cursor: Option<usize>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole queue.
    ///
    /// The cursor lands on the first track whose id equals `start_track_id`,
    /// on the first track when that id is absent or unknown, and on nothing
    /// when `tracks` is empty.
    pub fn load(&mut self, tracks: Vec<Track>, start_track_id: Option<&str>) {
        self.cursor = if tracks.is_empty() {
            None
        } else {
            let found = start_track_id.and_then(|id| tracks.iter().position(|t| t.id == id));
            Some(found.unwrap_or(0))
        };
        self.tracks = tracks;
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    /// Step forward. At the last track the cursor stays put and `None` comes
    /// back; the queue never wraps.
    pub fn advance(&mut self) -> Option<Track> {
        let next = self.cursor? + 1;
        if next >= self.tracks.len() {
            return None;
        }
        self.cursor = Some(next);
        self.tracks.get(next).cloned()
    }

    /// Step back. At the first track this is a no-op returning `None`.
    pub fn retreat(&mut self) -> Option<Track> {
        let prev = self.cursor?.checked_sub(1)?;
        self.cursor = Some(prev);
        self.tracks.get(prev).cloned()
    }

    /// Move the cursor to the first track with `track_id`.
    pub fn jump_to(&mut self, track_id: &str) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == track_id)?;
        self.cursor = Some(pos);
        self.tracks.get(pos).cloned()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}
