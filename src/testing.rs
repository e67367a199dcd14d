//! In-memory stand-ins for the device and the history sink.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::error::{DeviceError, HistoryWriteError};
use crate::history::HistorySink;
use crate::library::Track;
use crate::transport::{PlayFuture, PlaybackDevice};

pub(crate) fn track(id: &str) -> Track {
    Track::new(id, format!("Title {id}"), "Artist")
        .with_audio_url(format!("file:///music/{id}.mp3"))
}

pub(crate) fn silent_track(id: &str) -> Track {
    Track::new(id, format!("Title {id}"), "Artist")
}

/// A `play()` call waiting for the test to decide its outcome.
pub(crate) struct PendingPlay {
    pub source: Option<String>,
    resolve: oneshot::Sender<Result<(), DeviceError>>,
}

impl PendingPlay {
    pub fn succeed(self) {
        let _ = self.resolve.send(Ok(()));
    }

    pub fn fail(self, reason: &str) {
        let _ = self.resolve.send(Err(DeviceError::new(reason)));
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceLog {
    pub sources: Vec<String>,
    pub plays: usize,
    pub pauses: usize,
    pub seeks: Vec<f64>,
    pub volume: Option<f32>,
    pub muted: Option<bool>,
    pub released: bool,
}

pub(crate) struct FakeDevice {
    log: Arc<Mutex<DeviceLog>>,
    plays: mpsc::UnboundedSender<PendingPlay>,
    source: Option<String>,
}

pub(crate) struct FakeDeviceHandle {
    log: Arc<Mutex<DeviceLog>>,
    plays: mpsc::UnboundedReceiver<PendingPlay>,
}

pub(crate) fn fake_device() -> (FakeDevice, FakeDeviceHandle) {
    let log = Arc::new(Mutex::new(DeviceLog::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FakeDevice {
            log: log.clone(),
            plays: tx,
            source: None,
        },
        FakeDeviceHandle { log, plays: rx },
    )
}

impl FakeDeviceHandle {
    pub fn log(&self) -> DeviceLog {
        self.log.lock().unwrap().clone()
    }

    pub fn try_next_play(&mut self) -> Option<PendingPlay> {
        self.plays.try_recv().ok()
    }

    pub async fn next_play(&mut self) -> PendingPlay {
        tokio::time::timeout(Duration::from_secs(2), self.plays.recv())
            .await
            .expect("timed out waiting for a play() call")
            .expect("device dropped")
    }
}

impl PlaybackDevice for FakeDevice {
    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.log.lock().unwrap().sources.push(url.to_string());
    }

    fn play(&mut self) -> PlayFuture {
        self.log.lock().unwrap().plays += 1;
        let (tx, rx) = oneshot::channel();
        let _ = self.plays.send(PendingPlay {
            source: self.source.clone(),
            resolve: tx,
        });
        async move {
            rx.await
                .unwrap_or_else(|_| Err(DeviceError::new("play request dropped")))
        }
        .boxed()
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().pauses += 1;
    }

    fn set_current_time(&mut self, secs: f64) {
        self.log.lock().unwrap().seeks.push(secs);
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.lock().unwrap().volume = Some(volume);
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.lock().unwrap().muted = Some(muted);
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released = true;
    }
}

#[derive(Default)]
pub(crate) struct FakeSink {
    writes: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl FakeSink {
    pub fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

impl HistorySink for FakeSink {
    fn record(
        &self,
        user_id: &str,
        track_id: &str,
    ) -> BoxFuture<'static, Result<(), HistoryWriteError>> {
        self.writes
            .lock()
            .unwrap()
            .push((user_id.to_string(), track_id.to_string()));
        let fail = self.fail;
        async move {
            if fail {
                Err(HistoryWriteError::Rejected("offline".to_string()))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}
