use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use canto::config;
use canto::history::FileHistoryStore;
use canto::{PlaybackEngine, PlaybackError, Reply, TransportState};

use crate::app::App;
use crate::ui;

/// Everything a key press may act on besides the app model.
pub struct Context<'a> {
    pub engine: &'a PlaybackEngine,
    pub runtime: Handle,
    pub history: Option<&'a FileHistoryStore>,
    notices_tx: mpsc::Sender<String>,
    notices_rx: mpsc::Receiver<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        engine: &'a PlaybackEngine,
        runtime: Handle,
        history: Option<&'a FileHistoryStore>,
    ) -> Self {
        let (notices_tx, notices_rx) = mpsc::channel();
        Self {
            engine,
            runtime,
            history,
            notices_tx,
            notices_rx,
        }
    }

    /// Await `reply` in the background and surface a failure as a notice.
    fn watch(&self, reply: Reply) {
        let tx = self.notices_tx.clone();
        self.runtime.spawn(async move {
            match reply.await {
                Ok(()) | Err(PlaybackError::Superseded) => {}
                Err(e) => {
                    let _ = tx.send(e.to_string());
                }
            }
        });
    }
}

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Store revision the recent list was last read at.
    history_revision: Option<u64>,
}

/// Main terminal event loop: handles input, drawing and sync with the
/// engine snapshot. Returns `Ok(())` when quit is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    ctx: &Context<'_>,
    state: &mut EventLoopState,
) -> anyhow::Result<()> {
    loop {
        while let Ok(msg) = ctx.notices_rx.try_recv() {
            app.set_notice(msg);
        }

        app.sync_player(ctx.engine.snapshot());
        // History writes land in the background some time after a start.
        let revision = ctx.history.map(FileHistoryStore::revision);
        if revision != state.history_revision {
            state.history_revision = revision;
            refresh_recent(settings, app, ctx);
        }

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, ctx, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn session_user(settings: &config::Settings) -> Option<&str> {
    settings.session.user_id.as_deref()
}

fn refresh_recent(settings: &config::Settings, app: &mut App, ctx: &Context<'_>) {
    let (Some(store), Some(user)) = (ctx.history, session_user(settings)) else {
        return;
    };
    app.set_recent(&store.recent(user), settings.ui.recent_limit);
}

fn clear_history(settings: &config::Settings, app: &mut App, ctx: &Context<'_>) {
    let Some(store) = ctx.history else {
        app.set_notice("history is disabled");
        return;
    };
    let Some(user) = session_user(settings) else {
        app.set_notice("no session user; nothing to clear");
        return;
    };
    match store.clear(user) {
        Ok(()) => {
            app.recent.clear();
            app.set_notice("history cleared");
        }
        Err(e) => {
            warn!(error = %e, "clearing history failed");
            app.set_notice(format!("could not clear history: {e}"));
        }
    }
}

fn play_selected(app: &mut App, ctx: &Context<'_>) {
    let Some(id) = app.selected_track().map(|t| t.id.clone()) else {
        return;
    };
    app.follow_playback_on();
    app.set_pending_follow(&id);
    debug!(track_id = %id, "playing selection");
    ctx.watch(ctx.engine.play_queue(app.tracks.clone(), Some(&id)));
}

fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    ctx: &Context<'_>,
    state: &mut EventLoopState,
) -> bool {
    if !matches!(key.code, KeyCode::Char('g')) {
        state.pending_gg = false;
    }
    app.clear_notice();

    let engine = ctx.engine;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.set_selected(0);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.set_selected(app.tracks.len().saturating_sub(1));
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            if app.has_tracks() && !app.is_playing_index(app.selected) {
                play_selected(app, ctx);
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            app.follow_playback_on();
            if app.player.state == TransportState::Idle {
                play_selected(app, ctx);
            } else {
                ctx.watch(engine.toggle_play_pause());
            }
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            ctx.watch(engine.next());
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            ctx.watch(engine.previous());
        }
        KeyCode::Char('L') => engine.seek_by(settings.controls.scrub_seconds as f64),
        KeyCode::Char('H') => engine.seek_by(-(settings.controls.scrub_seconds as f64)),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            engine.set_volume(app.player.volume + settings.audio.volume_step);
        }
        KeyCode::Char('-') => {
            engine.set_volume(app.player.volume - settings.audio.volume_step);
        }
        KeyCode::Char('m') => engine.toggle_mute(),
        KeyCode::Char('r') => {
            app.toggle_recent_window();
            if app.recent_window {
                refresh_recent(settings, app, ctx);
            }
        }
        KeyCode::Char('C') => clear_history(settings, app, ctx),
        _ => {}
    }

    false
}
