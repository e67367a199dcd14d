//! Listening history.
//!
//! The transport reports every "now playing" transition to a
//! `HistoryRecorder`, which dedupes and hands the write to a `HistorySink`.
//! Writes are best effort: a failed write is logged and forgotten, and
//! playback never waits on one.

use futures::future::BoxFuture;

use crate::error::HistoryWriteError;

mod recorder;
mod store;

pub use recorder::{HistoryRecorder, HistoryWrite};
pub use store::{FileHistoryStore, HistoryEntry};

/// External destination for history records.
pub trait HistorySink: Send + Sync {
    /// Note that `user_id` started listening to `track_id`.
    fn record(&self, user_id: &str, track_id: &str)
    -> BoxFuture<'static, Result<(), HistoryWriteError>>;
}
