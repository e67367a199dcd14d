use std::time::Duration;

use crate::library::Track;
use crate::transport::TransportState;

/// Read-only view of the player, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub current_track: Option<Track>,
    pub state: TransportState,
    /// Elapsed seconds in the current track.
    pub current_time: f64,
    /// Seconds; `0` until the device reports metadata.
    pub duration: f64,
    pub volume: f32,
    pub muted: bool,
    pub queue_length: usize,
    pub current_index: Option<usize>,
    /// Message of the last device failure, cleared by the next start.
    pub last_error: Option<String>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            current_track: None,
            state: TransportState::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            muted: false,
            queue_length: 0,
            current_index: None,
            last_error: None,
        }
    }
}

impl PlayerSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.current_time.max(0.0))
    }

    /// Duration reported by the device, falling back to the track's hint.
    pub fn total(&self) -> Option<Duration> {
        if self.duration > 0.0 {
            Some(Duration::from_secs_f64(self.duration))
        } else {
            self.current_track.as_ref().and_then(|t| t.duration_hint)
        }
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }
}
