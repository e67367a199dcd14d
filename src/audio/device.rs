use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::DeviceError;
use crate::transport::{DeviceEventSender, PlayFuture, PlaybackDevice};

use super::thread::{AudioCmd, spawn_audio_thread};

/// Local-file output backed by `rodio`, running on its own thread.
pub struct RodioDevice {
    tx: Sender<AudioCmd>,
    join: Option<JoinHandle<()>>,
    fade_out: Duration,
}

impl RodioDevice {
    /// Spawn the audio thread. Progress and end-of-stream go to `events`.
    ///
    /// `fade_out` is applied when the device is released while playing.
    pub fn spawn(events: DeviceEventSender, fade_out: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let join = spawn_audio_thread(rx, events);
        Self {
            tx,
            join: Some(join),
            fade_out,
        }
    }

    fn send(&self, cmd: AudioCmd) {
        if self.tx.send(cmd).is_err() {
            warn!("audio thread is gone");
        }
    }
}

impl PlaybackDevice for RodioDevice {
    fn set_source(&mut self, url: &str) {
        self.send(AudioCmd::SetSource(url.to_string()));
    }

    fn play(&mut self) -> PlayFuture {
        let (reply, rx) = oneshot::channel();
        let sent = self.tx.send(AudioCmd::Play(reply)).is_ok();
        async move {
            if !sent {
                return Err(DeviceError::new("audio thread is gone"));
            }
            rx.await
                .unwrap_or_else(|_| Err(DeviceError::new("audio thread dropped the request")))
        }
        .boxed()
    }

    fn pause(&mut self) {
        self.send(AudioCmd::Pause);
    }

    fn set_current_time(&mut self, secs: f64) {
        self.send(AudioCmd::Seek(secs));
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCmd::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.send(AudioCmd::SetMuted(muted));
    }

    fn release(&mut self) {
        let _ = self.tx.send(AudioCmd::Quit {
            fade_out_ms: self.fade_out.as_millis() as u64,
        });
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.tx.send(AudioCmd::Quit { fade_out_ms: 0 });
        }
    }
}
