//! The minimal surface the transport needs from an audio output.
//!
//! Anything that can take a locator, start and pause output, jump to a
//! position, and report progress back through a `SourceEvent` channel can
//! back the engine. `crate::audio::RodioDevice` is the local-file backend.
//!
//! Every event is tagged with the source it belongs to: the number of
//! `set_source` calls the device had received when it produced the event.
//! The transport counts the same calls, so events from a replaced source can
//! be told apart from events about the current one.

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::DeviceError;

/// Outcome of a "begin output" request.
pub type PlayFuture = BoxFuture<'static, Result<(), DeviceError>>;

pub type DeviceEventSender = mpsc::UnboundedSender<SourceEvent>;
pub type DeviceEventReceiver = mpsc::UnboundedReceiver<SourceEvent>;

/// Asynchronous notifications emitted by a device, in device order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Playback position in seconds.
    TimeUpdate(f64),
    /// The source finished loading; `duration` is in seconds.
    MetadataLoaded { duration: f64 },
    /// The source played to its end.
    Ended,
    /// The device failed mid-playback.
    Error(String),
}

/// A `DeviceEvent` together with the source epoch that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub source: u64,
    pub event: DeviceEvent,
}

impl SourceEvent {
    pub fn new(source: u64, event: DeviceEvent) -> Self {
        Self { source, event }
    }
}

pub trait PlaybackDevice: Send + 'static {
    /// Point the output at a new media locator. Any previous source stops
    /// and the source epoch advances by one.
    fn set_source(&mut self, url: &str);

    /// Ask the device to begin output. Resolves once the device has started
    /// (or refused to).
    fn play(&mut self) -> PlayFuture;

    fn pause(&mut self);

    /// Jump to `secs` within the current source.
    fn set_current_time(&mut self, secs: f64);

    fn set_volume(&mut self, volume: f32);

    fn set_muted(&mut self, muted: bool);

    /// Give the output resource back. Called once when the engine shuts down.
    fn release(&mut self) {}
}

/// Channel pair used to wire a device's events into the engine.
pub fn device_channel() -> (DeviceEventSender, DeviceEventReceiver) {
    mpsc::unbounded_channel()
}
