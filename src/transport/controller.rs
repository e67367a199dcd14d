//! The transport: the only owner of the playback device.
//!
//! All transitions are synchronous method calls. The one asynchronous step,
//! the device's "begin output" request, is handed back to the caller as a
//! `PlayRequest` tagged with a generation number. Whoever drives the request
//! reports its outcome through `settle`; an outcome whose generation is no
//! longer the latest is dropped without touching state.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::error::{DeviceError, PlaybackError};
use crate::history::{HistoryRecorder, HistoryWrite};
use crate::library::Track;
use crate::queue::QueueManager;

use super::device::{DeviceEvent, PlayFuture, PlaybackDevice, SourceEvent};
use super::state::TransportState;

/// An in-flight start or resume.
pub struct PlayRequest {
    generation: u64,
    track_id: String,
    future: PlayFuture,
}

impl PlayRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn into_parts(self) -> (u64, PlayFuture) {
        (self.generation, self.future)
    }
}

impl fmt::Debug for PlayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayRequest")
            .field("generation", &self.generation)
            .field("track_id", &self.track_id)
            .finish_non_exhaustive()
    }
}

pub struct TransportController<D> {
    device: D,
    state: TransportState,
    current: Option<Track>,
    current_time: f64,
    duration: f64,
    volume: f32,
    muted: bool,
    // Bumped by every start/resume and by device errors.
    generation: u64,
    // Number of `set_source` calls made on the device.
    source_epoch: u64,
    // Latest seek requested before the duration was known.
    pending_seek: Option<f64>,
    last_error: Option<String>,
    user_id: Option<String>,
    history: HistoryRecorder,
    side_effects: Vec<HistoryWrite>,
}

impl<D: PlaybackDevice> TransportController<D> {
    pub fn new(mut device: D, history: HistoryRecorder, volume: f32, muted: bool) -> Self {
        let volume = if volume.is_nan() {
            1.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        device.set_volume(volume);
        device.set_muted(muted);

        Self {
            device,
            state: TransportState::Idle,
            current: None,
            current_time: 0.0,
            duration: 0.0,
            volume,
            muted,
            generation: 0,
            source_epoch: 0,
            pending_seek: None,
            last_error: None,
            user_id: None,
            history,
            side_effects: Vec::new(),
        }
    }

    /// Load `track` on the device and ask it to begin output.
    ///
    /// A track without a locator is rejected before anything changes.
    pub fn start(&mut self, track: Track) -> Result<PlayRequest, PlaybackError> {
        if !track.is_playable() {
            warn!(track_id = %track.id, "track has no audio locator");
            return Err(PlaybackError::InvalidTrack { track_id: track.id });
        }
        let url = track.audio_url.as_deref().unwrap_or_default();

        self.generation += 1;
        self.state = TransportState::Loading;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.pending_seek = None;
        self.last_error = None;

        self.history.track_changed(&track.id);
        self.device.set_source(url);
        self.source_epoch += 1;
        let future = self.device.play();

        info!(
            track_id = %track.id,
            title = %track.title,
            generation = self.generation,
            "starting track"
        );
        let track_id = track.id.clone();
        self.current = Some(track);

        Ok(PlayRequest {
            generation: self.generation,
            track_id,
            future,
        })
    }

    /// `Playing` -> `Paused`. Anything else is a no-op.
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.device.pause();
        self.state = TransportState::Paused;
        debug!("paused");
    }

    /// Restart output of the current track from `Paused`.
    pub fn resume(&mut self) -> Option<PlayRequest> {
        if self.state != TransportState::Paused {
            return None;
        }
        let track_id = self.current.as_ref()?.id.clone();

        self.generation += 1;
        let future = self.device.play();
        debug!(track_id = %track_id, generation = self.generation, "resuming");

        Some(PlayRequest {
            generation: self.generation,
            track_id,
            future,
        })
    }

    pub fn toggle_play_pause(&mut self) -> Option<PlayRequest> {
        match self.state {
            TransportState::Playing => {
                self.pause();
                None
            }
            TransportState::Paused => self.resume(),
            _ => None,
        }
    }

    /// Apply the outcome of the request tagged `generation`.
    pub fn settle(
        &mut self,
        generation: u64,
        result: Result<(), DeviceError>,
    ) -> Result<(), PlaybackError> {
        if generation != self.generation {
            debug!(
                generation,
                latest = self.generation,
                "discarding stale playback outcome"
            );
            return Err(PlaybackError::Superseded);
        }
        let Some(track_id) = self.current.as_ref().map(|t| t.id.clone()) else {
            return Err(PlaybackError::Superseded);
        };

        match result {
            Ok(()) => {
                self.state = TransportState::Playing;
                if let Some(write) = self.history.record(self.user_id.as_deref(), &track_id) {
                    self.side_effects.push(write);
                }
                Ok(())
            }
            Err(e) => {
                // A refused start is recoverable: look paused, not broken.
                warn!(track_id = %track_id, error = %e, "device refused to start output");
                self.state = TransportState::Paused;
                Err(PlaybackError::StartFailed {
                    track_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Seek to `secs`, clamped to the track. Deferred until the duration is known.
    pub fn seek(&mut self, secs: f64) {
        if !secs.is_finite() || !self.state.has_position() {
            return;
        }
        if self.duration <= 0.0 {
            self.pending_seek = Some(secs.max(0.0));
            return;
        }

        let t = secs.clamp(0.0, self.duration);
        self.device.set_current_time(t);
        self.current_time = t;
    }

    /// Seek relative to the current (or pending) position.
    pub fn seek_by(&mut self, delta: f64) {
        let base = self.pending_seek.unwrap_or(self.current_time);
        self.seek(base + delta);
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.device.set_volume(self.volume);
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.device.set_muted(self.muted);
    }

    /// Advance the queue and start whatever comes next.
    pub fn next(
        &mut self,
        queue: &mut QueueManager,
    ) -> Result<Option<PlayRequest>, PlaybackError> {
        match queue.advance() {
            Some(track) => self.start(track).map(Some),
            None => Ok(None),
        }
    }

    /// Step the queue back and start that track.
    pub fn previous(
        &mut self,
        queue: &mut QueueManager,
    ) -> Result<Option<PlayRequest>, PlaybackError> {
        match queue.retreat() {
            Some(track) => self.start(track).map(Some),
            None => Ok(None),
        }
    }

    /// React to a tagged device notification, dropping it when it belongs to
    /// a source that has since been replaced.
    pub fn handle_source_event(
        &mut self,
        tagged: SourceEvent,
        queue: &mut QueueManager,
    ) -> Option<PlayRequest> {
        if tagged.source != self.source_epoch {
            debug!(
                source = tagged.source,
                current = self.source_epoch,
                event = ?tagged.event,
                "discarding event from a replaced source"
            );
            return None;
        }
        self.handle_event(tagged.event, queue)
    }

    /// React to a notification about the current source. May start the next
    /// queued track.
    pub fn handle_event(
        &mut self,
        event: DeviceEvent,
        queue: &mut QueueManager,
    ) -> Option<PlayRequest> {
        match event {
            DeviceEvent::TimeUpdate(t) => {
                if t.is_finite()
                    && matches!(self.state, TransportState::Playing | TransportState::Paused)
                {
                    self.current_time = if self.duration > 0.0 {
                        t.clamp(0.0, self.duration)
                    } else {
                        t.max(0.0)
                    };
                }
                None
            }
            DeviceEvent::MetadataLoaded { duration } => {
                if !self.state.has_position() {
                    return None;
                }
                self.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                if let Some(t) = self.pending_seek.take() {
                    self.seek(t);
                }
                None
            }
            DeviceEvent::Ended => {
                if self.state == TransportState::Playing {
                    self.auto_advance(queue)
                } else {
                    None
                }
            }
            DeviceEvent::Error(msg) => {
                if self.current.is_none() {
                    return None;
                }
                error!(error = %msg, "playback device error");
                self.state = TransportState::Error;
                // Nothing in flight may revive the failed track.
                self.generation += 1;
                self.pending_seek = None;
                self.last_error = Some(PlaybackError::Runtime(msg).to_string());
                None
            }
        }
    }

    fn auto_advance(&mut self, queue: &mut QueueManager) -> Option<PlayRequest> {
        while let Some(track) = queue.advance() {
            match self.start(track) {
                Ok(request) => return Some(request),
                Err(e) => warn!(error = %e, "skipping unplayable track"),
            }
        }
        info!("queue exhausted");
        self.state = TransportState::Ended;
        None
    }

    pub fn set_user(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    /// History writes produced since the last call, ready to be spawned.
    pub fn take_side_effects(&mut self) -> Vec<HistoryWrite> {
        std::mem::take(&mut self.side_effects)
    }

    /// Release the device. The controller stays usable only as a state holder.
    pub fn release(&mut self) {
        self.generation += 1;
        self.device.release();
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source_epoch(&self) -> u64 {
        self.source_epoch
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
