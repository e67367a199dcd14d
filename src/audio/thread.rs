use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::error::DeviceError;
use crate::transport::{DeviceEvent, DeviceEventSender, SourceEvent};

use super::sink::{PlayClock, create_sink_at, fade_out_sink, locator_path, probe_duration};

const TICK: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub(super) enum AudioCmd {
    /// Replace the current source; stops whatever was playing.
    SetSource(String),
    /// Begin (or continue) output; the outcome goes back on the channel.
    Play(oneshot::Sender<Result<(), DeviceError>>),
    Pause,
    /// Absolute position in seconds.
    Seek(f64),
    SetVolume(f32),
    SetMuted(bool),
    /// Stop the thread, fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

struct AudioThread {
    stream: Option<OutputStream>,
    events: DeviceEventSender,
    // Count of `SetSource` commands seen; tags every emitted event.
    epoch: u64,
    source: Option<Result<PathBuf, DeviceError>>,
    sink: Option<Sink>,
    clock: PlayClock,
    volume: f32,
    muted: bool,
    ended: bool,
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    events: DeviceEventSender,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when the stream is dropped, which tears the TUI.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                error!(error = %e, "no audio output device; playback will be refused");
                None
            }
        };

        let mut audio = AudioThread {
            stream,
            events,
            epoch: 0,
            source: None,
            sink: None,
            clock: PlayClock::default(),
            volume: 1.0,
            muted: false,
            ended: false,
        };

        loop {
            match rx.recv_timeout(TICK) {
                Ok(AudioCmd::Quit { fade_out_ms }) => {
                    audio.quit(fade_out_ms);
                    break;
                }
                Ok(cmd) => audio.handle(cmd),
                Err(RecvTimeoutError::Timeout) => audio.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("audio thread stopped");
    })
}

impl AudioThread {
    fn handle(&mut self, cmd: AudioCmd) {
        match cmd {
            AudioCmd::SetSource(url) => self.set_source(&url),
            AudioCmd::Play(reply) => {
                let _ = reply.send(self.play());
            }
            AudioCmd::Pause => {
                if let Some(s) = self.sink.as_ref() {
                    s.pause();
                }
                self.clock.pause();
            }
            AudioCmd::Seek(secs) => self.seek(secs),
            AudioCmd::SetVolume(v) => {
                self.volume = v;
                self.apply_volume();
            }
            AudioCmd::SetMuted(m) => {
                self.muted = m;
                self.apply_volume();
            }
            AudioCmd::Quit { .. } => {}
        }
    }

    fn set_source(&mut self, url: &str) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.clock = PlayClock::default();
        self.ended = false;
        self.epoch += 1;

        let source = locator_path(url);
        match &source {
            Ok(path) => {
                debug!(path = %path.display(), "source set");
                if let Some(d) = probe_duration(path) {
                    self.emit(DeviceEvent::MetadataLoaded {
                        duration: d.as_secs_f64(),
                    });
                }
            }
            Err(e) => warn!(url, error = %e, "unusable locator"),
        }
        self.source = Some(source);
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        let path = match &self.source {
            Some(Ok(path)) => path.clone(),
            Some(Err(e)) => return Err(e.clone()),
            None => return Err(DeviceError::new("no source loaded")),
        };
        let Some(stream) = self.stream.as_ref() else {
            return Err(DeviceError::new("no audio output device"));
        };

        if self.sink.is_none() || self.ended {
            if self.ended {
                self.clock = PlayClock::default();
                self.ended = false;
            }
            self.sink = Some(create_sink_at(stream, &path, self.clock.elapsed())?);
        }

        self.apply_volume();
        if let Some(s) = self.sink.as_ref() {
            s.play();
        }
        self.clock.start();
        Ok(())
    }

    fn seek(&mut self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        let at = Duration::from_secs_f64(secs.max(0.0));
        self.clock.reset_to(at);
        self.ended = false;

        // Without a sink the next `play` opens the source at the new position.
        let Some(old) = self.sink.take() else {
            return;
        };
        old.stop();

        let (Some(stream), Some(Ok(path))) = (self.stream.as_ref(), self.source.as_ref()) else {
            return;
        };
        // Scrubbing: rebuild the sink and skip into the file.
        match create_sink_at(stream, path, at) {
            Ok(sink) => {
                if self.clock.is_running() {
                    sink.play();
                }
                self.sink = Some(sink);
                self.apply_volume();
            }
            Err(e) => {
                self.clock.pause();
                self.emit(DeviceEvent::Error(e.to_string()));
            }
        }
    }

    fn tick(&mut self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if !self.clock.is_running() || self.ended {
            return;
        }
        if sink.empty() {
            self.ended = true;
            self.clock.pause();
            self.emit(DeviceEvent::Ended);
        } else {
            self.emit(DeviceEvent::TimeUpdate(self.clock.elapsed().as_secs_f64()));
        }
    }

    fn quit(&mut self, fade_out_ms: u64) {
        if let Some(s) = self.sink.take() {
            if self.clock.is_running() && !self.ended {
                // Fade out gently before stopping.
                fade_out_sink(&s, self.effective_volume(), fade_out_ms);
            }
            s.stop();
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    fn apply_volume(&self) {
        if let Some(s) = self.sink.as_ref() {
            s.set_volume(self.effective_volume());
        }
    }

    fn emit(&self, event: DeviceEvent) {
        // The engine may already be gone during shutdown.
        let _ = self.events.send(SourceEvent::new(self.epoch, event));
    }
}
