//! Error types for the playback engine.
//!
//! Caller-visible failures travel back through the future returned by an
//! engine call. Failures raised by the device while nobody is waiting show up
//! in the published snapshot instead.

use thiserror::Error;

/// Errors surfaced to callers of the playback engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The requested track has no playable locator. Transport state is untouched.
    #[error("track {track_id} has no playable audio locator")]
    InvalidTrack { track_id: String },

    /// The device refused to begin output. The transport falls back to `Paused`.
    #[error("could not start {track_id}: {reason}")]
    StartFailed { track_id: String, reason: String },

    /// The device reported a failure mid-playback.
    #[error("playback failed: {0}")]
    Runtime(String),

    /// A newer start/resume request was issued before this one settled.
    #[error("request superseded by a newer playback request")]
    Superseded,

    /// The engine task is gone.
    #[error("playback engine is shut down")]
    EngineClosed,
}

/// Failure reported by a playback device backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DeviceError(pub String);

impl DeviceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Failure of a history write. Logged by the recorder, never propagated.
#[derive(Error, Debug)]
pub enum HistoryWriteError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("history decode error: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("history sink rejected the write: {0}")]
    Rejected(String),
}
