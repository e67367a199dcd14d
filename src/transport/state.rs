use std::fmt;

/// The playback state machine value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    /// Nothing has been started yet.
    #[default]
    Idle,
    /// A start request is in flight.
    Loading,
    Playing,
    Paused,
    /// The queue ran out after the last track finished.
    Ended,
    /// The device failed mid-playback. Only a new start leaves this state.
    Error,
}

impl TransportState {
    /// States in which a track is loaded on the device and positions make sense.
    pub fn has_position(self) -> bool {
        matches!(self, Self::Loading | Self::Playing | Self::Paused)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "Stopped",
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}
