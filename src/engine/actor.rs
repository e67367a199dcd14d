//! The engine task.
//!
//! Owns the queue and the transport and applies, one at a time, caller
//! commands, device events, and the outcomes of device start requests. Start
//! requests are awaited in detached tasks that only forward their result back
//! here, so no state is ever touched outside this loop.

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::error::{DeviceError, PlaybackError};
use crate::library::Track;
use crate::queue::QueueManager;
use crate::transport::{
    DeviceEventReceiver, PlayRequest, PlaybackDevice, SourceEvent, TransportController,
    TransportState,
};

use super::snapshot::PlayerSnapshot;

pub(super) type ReplyTx = oneshot::Sender<Result<(), PlaybackError>>;

#[derive(Debug)]
pub(super) enum EngineCmd {
    LoadQueue {
        tracks: Vec<Track>,
        start_track_id: Option<String>,
    },
    PlayQueue {
        tracks: Vec<Track>,
        start_track_id: Option<String>,
        reply: ReplyTx,
    },
    JumpTo {
        track_id: String,
        reply: ReplyTx,
    },
    TogglePlayPause {
        reply: ReplyTx,
    },
    Pause,
    Resume {
        reply: ReplyTx,
    },
    Seek(f64),
    SeekBy(f64),
    Next {
        reply: ReplyTx,
    },
    Previous {
        reply: ReplyTx,
    },
    SetVolume(f32),
    ToggleMute,
    SetUser(Option<String>),
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

struct Settlement {
    generation: u64,
    result: Result<(), DeviceError>,
    reply: Option<ReplyTx>,
}

pub(super) struct EngineActor<D> {
    transport: TransportController<D>,
    queue: QueueManager,
    commands: mpsc::UnboundedReceiver<EngineCmd>,
    device_events: DeviceEventReceiver,
    settle_tx: mpsc::UnboundedSender<Settlement>,
    settlements: mpsc::UnboundedReceiver<Settlement>,
    snapshot: watch::Sender<PlayerSnapshot>,
}

impl<D: PlaybackDevice> EngineActor<D> {
    pub(super) fn new(
        transport: TransportController<D>,
        commands: mpsc::UnboundedReceiver<EngineCmd>,
        device_events: DeviceEventReceiver,
        snapshot: watch::Sender<PlayerSnapshot>,
    ) -> Self {
        let (settle_tx, settlements) = mpsc::unbounded_channel();
        Self {
            transport,
            queue: QueueManager::new(),
            commands,
            device_events,
            settle_tx,
            settlements,
            snapshot,
        }
    }

    pub(super) async fn run(mut self) {
        self.publish();
        loop {
            // Device events are drained before anything that could replace
            // the source they describe.
            let running = tokio::select! {
                biased;
                Some(event) = self.device_events.recv() => {
                    self.handle_device_event(event);
                    true
                }
                Some(settled) = self.settlements.recv() => {
                    self.handle_settlement(settled);
                    true
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    // Every handle is gone.
                    None => {
                        self.shutdown();
                        false
                    }
                },
            };
            if !running {
                return;
            }
            self.flush_side_effects();
            self.publish();
        }
    }

    /// Apply one caller command. Returns false once the engine has shut down.
    fn handle_command(&mut self, cmd: EngineCmd) -> bool {
        match cmd {
            EngineCmd::LoadQueue {
                tracks,
                start_track_id,
            } => {
                debug!(len = tracks.len(), "loading queue");
                self.queue.load(tracks, start_track_id.as_deref());
            }
            EngineCmd::PlayQueue {
                tracks,
                start_track_id,
                reply,
            } => {
                debug!(len = tracks.len(), start = ?start_track_id, "playing queue");
                self.queue.load(tracks, start_track_id.as_deref());
                self.start_cursor_track(reply);
            }
            EngineCmd::JumpTo { track_id, reply } => match self.queue.jump_to(&track_id) {
                Some(track) => {
                    let request = self.transport.start(track);
                    self.dispatch(request.map(Some), Some(reply));
                }
                None => {
                    debug!(track_id = %track_id, "jump target not in queue");
                    respond(Some(reply), Ok(()));
                }
            },
            EngineCmd::TogglePlayPause { reply } => match self.transport.state() {
                TransportState::Playing | TransportState::Paused => {
                    let request = self.transport.toggle_play_pause();
                    self.dispatch(Ok(request), Some(reply));
                }
                TransportState::Idle | TransportState::Ended | TransportState::Error => {
                    self.start_cursor_track(reply);
                }
                TransportState::Loading => respond(Some(reply), Ok(())),
            },
            EngineCmd::Pause => self.transport.pause(),
            EngineCmd::Resume { reply } => {
                let request = self.transport.resume();
                self.dispatch(Ok(request), Some(reply));
            }
            EngineCmd::Seek(secs) => self.transport.seek(secs),
            EngineCmd::SeekBy(delta) => self.transport.seek_by(delta),
            EngineCmd::Next { reply } => {
                let request = self.transport.next(&mut self.queue);
                self.dispatch(request, Some(reply));
            }
            EngineCmd::Previous { reply } => {
                let request = self.transport.previous(&mut self.queue);
                self.dispatch(request, Some(reply));
            }
            EngineCmd::SetVolume(volume) => self.transport.set_volume(volume),
            EngineCmd::ToggleMute => self.transport.toggle_mute(),
            EngineCmd::SetUser(user_id) => {
                debug!(anonymous = user_id.is_none(), "session user changed");
                self.transport.set_user(user_id);
            }
            EngineCmd::Shutdown { done } => {
                self.shutdown();
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    fn start_cursor_track(&mut self, reply: ReplyTx) {
        match self.queue.current().cloned() {
            Some(track) => {
                let request = self.transport.start(track);
                self.dispatch(request.map(Some), Some(reply));
            }
            None => respond(Some(reply), Ok(())),
        }
    }

    fn handle_device_event(&mut self, event: SourceEvent) {
        if let Some(request) = self.transport.handle_source_event(event, &mut self.queue) {
            // Auto-advance: nobody waits on this one.
            self.spawn_request(request, None);
        }
    }

    fn handle_settlement(&mut self, settled: Settlement) {
        let outcome = self.transport.settle(settled.generation, settled.result);
        respond(settled.reply, outcome);
    }

    fn dispatch(
        &self,
        request: Result<Option<PlayRequest>, PlaybackError>,
        reply: Option<ReplyTx>,
    ) {
        match request {
            Ok(Some(request)) => self.spawn_request(request, reply),
            Ok(None) => respond(reply, Ok(())),
            Err(e) => respond(reply, Err(e)),
        }
    }

    fn spawn_request(&self, request: PlayRequest, reply: Option<ReplyTx>) {
        let (generation, future) = request.into_parts();
        let settle_tx = self.settle_tx.clone();
        tokio::spawn(async move {
            let result = future.await;
            let _ = settle_tx.send(Settlement {
                generation,
                result,
                reply,
            });
        });
    }

    fn flush_side_effects(&mut self) {
        for write in self.transport.take_side_effects() {
            tokio::spawn(write);
        }
    }

    fn publish(&self) {
        let next = PlayerSnapshot {
            current_track: self.transport.current_track().cloned(),
            state: self.transport.state(),
            current_time: self.transport.current_time(),
            duration: self.transport.duration(),
            volume: self.transport.volume(),
            muted: self.transport.muted(),
            queue_length: self.queue.len(),
            current_index: self.queue.current_index(),
            last_error: self.transport.last_error().map(str::to_string),
        };
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        debug!("playback engine shutting down");
        self.transport.release();
        self.flush_side_effects();
    }
}

fn respond(reply: Option<ReplyTx>, result: Result<(), PlaybackError>) {
    match (reply, result) {
        (Some(tx), result) => {
            let _ = tx.send(result);
        }
        (None, Err(PlaybackError::Superseded)) => {
            debug!("background playback request superseded");
        }
        (None, Err(e)) => warn!(error = %e, "background playback request failed"),
        (None, Ok(())) => {}
    }
}
