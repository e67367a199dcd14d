//! Application model: the library list, the selection, and the latest
//! player snapshot as seen by the UI.

use canto::PlayerSnapshot;
use canto::config::LibrarySettings;
use canto::history::HistoryEntry;
use canto::library::{Track, display_from_fields};

/// The main application model.
pub struct App {
    pub tracks: Vec<Track>,
    /// Display text per track, same order as `tracks`.
    pub labels: Vec<String>,
    pub selected: usize,
    /// Latest snapshot published by the engine.
    pub player: PlayerSnapshot,

    pub follow_playback: bool,
    pub pending_follow_id: Option<String>,

    /// Labels of the recently played tracks, newest first.
    pub recent: Vec<String>,
    pub recent_window: bool,
    /// One-line message shown in the status box until the next action.
    pub notice: Option<String>,
    pub current_dir: Option<String>,
}

impl App {
    /// Create a new `App` over `tracks`, labelled per the library settings.
    pub fn new(tracks: Vec<Track>, library: &LibrarySettings) -> Self {
        let labels = tracks
            .iter()
            .map(|t| display_from_fields(t, &library.display_fields, &library.display_separator))
            .collect();

        Self {
            tracks,
            labels,
            selected: 0,
            player: PlayerSnapshot::default(),

            follow_playback: true,
            pending_follow_id: None,

            recent: Vec::new(),
            recent_window: false,
            notice: None,
            current_dir: None,
        }
    }

    /// Return true if the library contains any tracks.
    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.tracks.get(self.selected)
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn set_selected(&mut self, idx: usize) {
        if idx < self.tracks.len() {
            self.selected = idx;
        }
    }

    /// Move selection down, wrapping to the top.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection up, wrapping to the bottom.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.tracks.len() - 1);
        }
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    /// Disable follow-playback and clear any pending follow target.
    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
        self.pending_follow_id = None;
    }

    /// Follow `track_id` once the player reports it as current.
    pub fn set_pending_follow(&mut self, track_id: &str) {
        self.pending_follow_id = Some(track_id.to_string());
    }

    /// Index in the list of the track the player is on.
    pub fn playing_index(&self) -> Option<usize> {
        let id = self.player.current_track_id()?;
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Whether `idx` is the track currently being played (not paused).
    pub fn is_playing_index(&self, idx: usize) -> bool {
        self.player.is_playing() && self.playing_index() == Some(idx)
    }

    /// Take in a new snapshot and move the cursor along with playback.
    pub fn sync_player(&mut self, snapshot: PlayerSnapshot) {
        self.player = snapshot;
        if !self.follow_playback {
            return;
        }
        let Some(idx) = self.playing_index() else {
            return;
        };

        match self.pending_follow_id.as_deref() {
            // Ignore the old track until the requested one shows up.
            Some(pending) if pending != self.tracks[idx].id => {}
            Some(_) => {
                self.pending_follow_id = None;
                self.selected = idx;
            }
            None => self.selected = idx,
        }
    }

    /// Replace the recently played list. Ids missing from the library are shown raw.
    pub fn set_recent(&mut self, entries: &[HistoryEntry], limit: usize) {
        self.recent = entries
            .iter()
            .take(limit)
            .map(|e| {
                self.tracks
                    .iter()
                    .position(|t| t.id == e.track_id)
                    .map(|i| self.labels[i].clone())
                    .unwrap_or_else(|| e.track_id.clone())
            })
            .collect();
    }

    pub fn toggle_recent_window(&mut self) {
        self.recent_window = !self.recent_window;
    }

    pub fn set_notice(&mut self, msg: impl Into<String>) {
        self.notice = Some(msg.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
