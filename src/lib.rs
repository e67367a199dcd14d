pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod library;
pub mod logging;
pub mod queue;
pub mod transport;

#[cfg(test)]
mod testing;

pub use engine::{EngineOptions, PlaybackEngine, PlayerSnapshot, Reply};
pub use error::{DeviceError, HistoryWriteError, PlaybackError};
pub use library::Track;
pub use transport::TransportState;
