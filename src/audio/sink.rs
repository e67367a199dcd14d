//! Opening local sources as `rodio` sinks.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::DeviceError;

/// Map a media locator to a local file. Accepts `file://` URLs and plain paths.
pub(super) fn locator_path(url: &str) -> Result<PathBuf, DeviceError> {
    let url = url.trim();
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(DeviceError::new("empty file locator"));
        }
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = url.split_once("://") {
        return Err(DeviceError::new(format!("unsupported locator scheme `{scheme}`")));
    }
    if url.is_empty() {
        return Err(DeviceError::new("empty locator"));
    }
    Ok(PathBuf::from(url))
}

/// Duration from the file's properties, if it can be read and is non-zero.
pub(super) fn probe_duration(path: &Path) -> Option<Duration> {
    use lofty::file::AudioFile;

    lofty::read_from_path(path)
        .ok()
        .map(|f| f.properties().duration())
        .filter(|d| !d.is_zero())
}

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<Sink, DeviceError> {
    let file = File::open(path)
        .map_err(|e| DeviceError::new(format!("failed to open {}: {e}", path.display())))?;

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| DeviceError::new(format!("failed to decode {}: {e}", path.display())))?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}

/// Fade `sink` to silence over `fade_out_ms`, starting from `from`.
pub(super) fn fade_out_sink(sink: &Sink, from: f32, fade_out_ms: u64) {
    if fade_out_ms == 0 || from <= 0.0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(from * (1.0 - t));
        std::thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}

/// Wall-clock position of the current source.
#[derive(Debug, Default, Clone)]
pub(super) struct PlayClock {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl PlayClock {
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
    }

    /// Jump to `at`, keeping the running/paused state.
    pub fn reset_to(&mut self, at: Duration) {
        self.accumulated = at;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}
