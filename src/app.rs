use std::{
    io,
    path::PathBuf,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::{cli, constants::TIME_SETTINGS, domain::Tracker, interpreter::Interpreter};

mod event_handlers;
mod render_views;
mod time_format;
mod view_style;

struct App {
    tracker: Tracker,
    interpreter: Interpreter,
    config_path: PathBuf,
    /// Free-text line being typed while the interpreter wants text.
    input_line: String,
}

impl App {
    fn new(tracker: Tracker, config_path: PathBuf) -> Self {
        Self {
            tracker,
            interpreter: Interpreter::new(),
            config_path,
            input_line: String::new(),
        }
    }

    fn persist(&mut self) {
        self.tracker.update_all(Instant::now());
        if let Err(e) = cli::save_tracker(&self.config_path, &self.tracker) {
            warn!(error = %e, "could not save tracker state");
        }
    }
}

fn poll_key(timeout: Duration) -> io::Result<Option<KeyEvent>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

pub fn run_ui(tracker: Tracker, config_path: PathBuf) -> Result<(), io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(tracker, config_path);
    info!(categories = app.tracker.len(), "tracker started");

    let tick_rate = Duration::from_millis(TIME_SETTINGS.tick_ms);
    let save_rate = Duration::from_secs(TIME_SETTINGS.autosave_secs);
    let mut last_tick = Instant::now();
    let mut last_save = Instant::now();

    loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        match poll_key(timeout) {
            Ok(Some(key)) => {
                if app.handle_key(key) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "input poll failed, skipping tick"),
        }

        let now = Instant::now();
        app.tracker.update_all(now);
        last_tick = now;

        if let Err(e) = terminal.draw(|f| app.draw_frame(f)) {
            warn!(error = %e, "draw failed, skipping tick");
        }

        if last_save.elapsed() >= save_rate {
            app.persist();
            last_save = Instant::now();
        }
    }

    app.persist();
    info!("tracker stopped");

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
