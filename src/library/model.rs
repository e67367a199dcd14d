use std::time::Duration;

/// An immutable description of something the engine can play.
///
/// Tracks are handed to the engine by whoever supplies them (the library
/// scanner, a playlist, ...). The engine never persists them.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Stable identity, unique within a queue.
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Locator of the playable media. A track without one cannot be started.
    pub audio_url: Option<String>,
    /// Display-only artwork locator.
    pub cover_url: Option<String>,
    /// Display-only estimate; the device reports the real duration once loaded.
    pub duration_hint: Option<Duration>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            audio_url: None,
            cover_url: None,
            duration_hint: None,
        }
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_duration_hint(mut self, hint: Duration) -> Self {
        self.duration_hint = Some(hint);
        self
    }

    /// Whether the track carries a non-empty media locator.
    pub fn is_playable(&self) -> bool {
        self.audio_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }
}
