use std::env;
use std::path::Path;

use anyhow::Context as _;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use canto::library::scan;
use canto::logging::init_logging;

use crate::app::App;

mod event_loop;
mod settings;
mod startup;

pub fn run() -> anyhow::Result<()> {
    let settings = settings::load_settings();
    let _log_guard = match init_logging(&settings.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("canto: logging disabled: {e}");
            None
        }
    };

    let dir = env::args().nth(1).unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let tracks = scan(Path::new(&dir), &settings.library);
    if tracks.is_empty() {
        warn!(dir = %dir, "no audio files found");
    }

    // The engine lives on the runtime's workers; the UI loop stays on this thread.
    let rt = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    let history = startup::open_history(&settings);
    let engine = {
        let _guard = rt.enter();
        startup::spawn_engine(&settings, history.as_ref())
    };

    let mut app = App::new(tracks, &settings.library);
    app.follow_playback = settings.ui.follow_playback;
    app.set_current_dir(dir.clone());
    engine.load_queue(app.tracks.clone(), None);
    info!(dir = %dir, tracks = app.tracks.len(), "canto started");

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = {
        let ctx = event_loop::Context::new(&engine, rt.handle().clone(), history.as_ref());
        let mut state = event_loop::EventLoopState::default();
        event_loop::run(&mut terminal, &settings, &mut app, &ctx, &mut state)
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Releases the device, fading out whatever is playing.
    rt.block_on(engine.shutdown());
    info!("canto stopped");

    run_result
}
