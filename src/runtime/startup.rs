use std::sync::Arc;
use std::time::Duration;

use canto::audio::RodioDevice;
use canto::config::Settings;
use canto::history::{FileHistoryStore, HistoryRecorder};
use canto::transport::device_channel;
use canto::{EngineOptions, PlaybackEngine};
use tracing::{info, warn};

/// Open the history store, or `None` when history is off or unusable.
pub fn open_history(settings: &Settings) -> Option<FileHistoryStore> {
    if !settings.history.enabled {
        info!("history disabled by config");
        return None;
    }
    let Some(path) = settings.history_path() else {
        warn!("no location for the history store; history disabled");
        return None;
    };
    match FileHistoryStore::open(path.clone()) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "cannot open history store; history disabled"
            );
            None
        }
    }
}

/// Wire the rodio device and the history store into a running engine.
///
/// Must run inside the tokio runtime context.
pub fn spawn_engine(settings: &Settings, history: Option<&FileHistoryStore>) -> PlaybackEngine {
    let (events_tx, events_rx) = device_channel();
    let device = RodioDevice::spawn(
        events_tx,
        Duration::from_millis(settings.audio.quit_fade_out_ms),
    );
    let recorder = match history {
        Some(store) => HistoryRecorder::new(Arc::new(store.clone())),
        None => HistoryRecorder::disabled(),
    };
    PlaybackEngine::spawn(device, events_rx, recorder, EngineOptions::from_settings(settings))
}
