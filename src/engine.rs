//! Playback engine: the public handle over the queue and the transport.
//!
//! All state lives in a single tokio task (see `actor`). The handle only sends
//! commands and reads the latest published [`PlayerSnapshot`].

mod actor;
mod snapshot;

use std::sync::Mutex;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::Settings;
use crate::error::PlaybackError;
use crate::history::HistoryRecorder;
use crate::library::Track;
use crate::transport::{DeviceEventReceiver, PlaybackDevice, TransportController};

use actor::{EngineActor, EngineCmd};
pub use snapshot::PlayerSnapshot;

/// Completion of a command that may start the device.
///
/// The command is queued when the method is called; awaiting the reply is
/// optional. A start that is overtaken by a newer one resolves to
/// [`PlaybackError::Superseded`].
pub type Reply = BoxFuture<'static, Result<(), PlaybackError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub volume: f32,
    pub muted: bool,
    pub user_id: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            user_id: None,
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            volume: settings.audio.initial_volume,
            muted: settings.audio.start_muted,
            user_id: settings.session.user_id.clone(),
        }
    }
}

pub struct PlaybackEngine {
    commands: mpsc::UnboundedSender<EngineCmd>,
    snapshot: watch::Receiver<PlayerSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackEngine {
    /// Start the engine task. Must be called from within a tokio runtime.
    pub fn spawn<D: PlaybackDevice>(
        device: D,
        device_events: DeviceEventReceiver,
        history: HistoryRecorder,
        options: EngineOptions,
    ) -> Self {
        let mut transport =
            TransportController::new(device, history, options.volume, options.muted);
        transport.set_user(options.user_id);

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(PlayerSnapshot::default());
        let actor = EngineActor::new(transport, command_rx, device_events, snapshot_tx);
        let task = tokio::spawn(actor.run());

        Self {
            commands,
            snapshot,
            task: Mutex::new(Some(task)),
        }
    }

    /// Replace the queue without touching playback.
    pub fn load_queue(&self, tracks: Vec<Track>, start_track_id: Option<&str>) {
        self.send(EngineCmd::LoadQueue {
            tracks,
            start_track_id: start_track_id.map(str::to_string),
        });
    }

    /// Replace the queue and start the track under the cursor.
    pub fn play_queue(&self, tracks: Vec<Track>, start_track_id: Option<&str>) -> Reply {
        let start_track_id = start_track_id.map(str::to_string);
        self.request(|reply| EngineCmd::PlayQueue {
            tracks,
            start_track_id,
            reply,
        })
    }

    pub fn jump_to(&self, track_id: &str) -> Reply {
        let track_id = track_id.to_string();
        self.request(|reply| EngineCmd::JumpTo { track_id, reply })
    }

    /// Pause or resume; from a stopped or ended player, start the queue's
    /// current track.
    pub fn toggle_play_pause(&self) -> Reply {
        self.request(|reply| EngineCmd::TogglePlayPause { reply })
    }

    pub fn pause(&self) {
        self.send(EngineCmd::Pause);
    }

    pub fn resume(&self) -> Reply {
        self.request(|reply| EngineCmd::Resume { reply })
    }

    pub fn seek(&self, secs: f64) {
        self.send(EngineCmd::Seek(secs));
    }

    pub fn seek_by(&self, delta: f64) {
        self.send(EngineCmd::SeekBy(delta));
    }

    pub fn next(&self) -> Reply {
        self.request(|reply| EngineCmd::Next { reply })
    }

    pub fn previous(&self) -> Reply {
        self.request(|reply| EngineCmd::Previous { reply })
    }

    pub fn set_volume(&self, volume: f32) {
        self.send(EngineCmd::SetVolume(volume));
    }

    pub fn toggle_mute(&self) {
        self.send(EngineCmd::ToggleMute);
    }

    /// Switch the session user; `None` means anonymous (no history).
    pub fn set_user(&self, user_id: Option<String>) {
        self.send(EngineCmd::SetUser(user_id));
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the engine and release the device. Later commands fail with
    /// [`PlaybackError::EngineClosed`].
    pub async fn shutdown(&self) {
        let (done, done_rx) = oneshot::channel();
        if self.commands.send(EngineCmd::Shutdown { done }).is_ok() {
            let _ = done_rx.await;
        }

        let task = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "engine task ended abnormally");
            }
        }
    }

    fn send(&self, cmd: EngineCmd) {
        if self.commands.send(cmd).is_err() {
            warn!("command dropped: playback engine is closed");
        }
    }

    fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), PlaybackError>>) -> EngineCmd,
    ) -> Reply {
        let (reply, reply_rx) = oneshot::channel();
        let sent = self.commands.send(build(reply)).is_ok();
        async move {
            if !sent {
                return Err(PlaybackError::EngineClosed);
            }
            reply_rx.await.unwrap_or(Err(PlaybackError::EngineClosed))
        }
        .boxed()
    }
}
