//! Transport: the playback state machine and the device it drives.

mod controller;
mod device;
mod state;

pub use controller::{PlayRequest, TransportController};
pub use device::{
    DeviceEvent, DeviceEventReceiver, DeviceEventSender, PlayFuture, PlaybackDevice,
    SourceEvent, device_channel,
};
pub use state::TransportState;

#[cfg(test)]
mod tests;
