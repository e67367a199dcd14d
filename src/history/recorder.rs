use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::HistorySink;

/// A pending history write, already wrapped so that it cannot fail.
pub type HistoryWrite = BoxFuture<'static, ()>;

/// Dedupes "now playing" notifications and forwards them to a sink.
pub struct HistoryRecorder {
    sink: Option<Arc<dyn HistorySink>>,
    // Id of the last track a write was attempted for.
    last_recorded: Option<String>,
}

impl HistoryRecorder {
    pub fn new(sink: Arc<dyn HistorySink>) -> Self {
        Self {
            sink: Some(sink),
            last_recorded: None,
        }
    }

    /// A recorder that never writes anything.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            last_recorded: None,
        }
    }

    /// Produce the write for `track_id` becoming the current track.
    ///
    /// Returns `None` for anonymous sessions, for a disabled recorder, and when
    /// `track_id` is the track recorded last. The marker moves as soon as a
    /// write is attempted, so a failed write is not retried for the same track.
    pub fn record(&mut self, user_id: Option<&str>, track_id: &str) -> Option<HistoryWrite> {
        let sink = self.sink.as_ref()?;
        let user_id = user_id?;

        if self.last_recorded.as_deref() == Some(track_id) {
            debug!(track_id, "history already recorded for current track");
            return None;
        }
        self.last_recorded = Some(track_id.to_string());

        let write = sink.record(user_id, track_id);
        let track_id = track_id.to_string();
        Some(
            async move {
                match write.await {
                    Ok(()) => debug!(track_id = %track_id, "history recorded"),
                    Err(e) => warn!(track_id = %track_id, error = %e, "history write failed"),
                }
            }
            .boxed(),
        )
    }

    /// Forget the marker when playback moves to a different track, so that
    /// coming back to the marked track records it again.
    pub fn track_changed(&mut self, track_id: &str) {
        if self.last_recorded.as_deref().is_some_and(|last| last != track_id) {
            self.last_recorded = None;
        }
    }

    pub fn last_recorded(&self) -> Option<&str> {
        self.last_recorded.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }
}
