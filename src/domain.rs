use std::{
    fmt,
    time::{Duration, Instant},
};

mod error;
mod tracker;

pub use error::TrackerError;
pub use tracker::{Direction, ReportRow, Tracker};

/// Shortcut key of a category. Doubles as its identity in the tracker index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CategoryKey(pub char);

impl CategoryKey {
    /// Reserved key of the root category. Never alphabetic, so it can never
    /// collide with a user shortcut.
    pub const ROOT: CategoryKey = CategoryKey('\0');

    pub fn new(key: char) -> Self {
        CategoryKey(key)
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub fn is_valid_shortcut(key: char) -> bool {
        key.is_alphabetic()
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("root")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Paused,
    Running,
}

#[derive(Clone, Debug)]
pub struct Category {
    pub key: CategoryKey,
    pub name: String,
    /// Banked seconds. Excludes the interval since `run_started_at`.
    pub accumulated_seconds: u64,
    pub state: RunState,
    /// Set exactly while `state` is `Running`.
    pub run_started_at: Option<Instant>,
    pub parent: Option<CategoryKey>,
    pub children: Vec<CategoryKey>,
}

impl Category {
    pub fn new(key: CategoryKey, name: impl Into<String>, parent: Option<CategoryKey>) -> Self {
        Self {
            key,
            name: name.into(),
            accumulated_seconds: 0,
            state: RunState::Paused,
            run_started_at: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Starts the clock. Playing an already running category banks what it
    /// has so far and restarts the interval at `now`.
    pub fn play(&mut self, now: Instant) {
        self.update(now);
        self.state = RunState::Running;
        self.run_started_at = Some(now);
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(started) = self.run_started_at.take() {
            let elapsed = now.saturating_duration_since(started).as_secs();
            self.accumulated_seconds = self.accumulated_seconds.saturating_add(elapsed);
        }
        self.state = RunState::Paused;
    }

    pub fn toggle(&mut self, now: Instant) -> RunState {
        match self.state {
            RunState::Paused => self.play(now),
            RunState::Running => self.pause(now),
        }
        self.state
    }

    /// Folds whole elapsed seconds into the bank. The start mark only moves
    /// forward by the folded amount so sub-second remainders carry over.
    pub fn update(&mut self, now: Instant) {
        if self.state != RunState::Running {
            return;
        }
        let Some(started) = self.run_started_at else {
            return;
        };

        let seconds = now.saturating_duration_since(started).as_secs();
        if seconds == 0 {
            return;
        }
        self.accumulated_seconds = self.accumulated_seconds.saturating_add(seconds);
        self.run_started_at = Some(started + Duration::from_secs(seconds));
    }

    pub fn adjust_time(&mut self, delta_seconds: i64) -> u64 {
        self.accumulated_seconds = if delta_seconds >= 0 {
            self.accumulated_seconds
                .saturating_add(delta_seconds.unsigned_abs())
        } else {
            self.accumulated_seconds
                .saturating_sub(delta_seconds.unsigned_abs())
        };
        self.accumulated_seconds
    }
}

/// Trims a display name and rejects names the line-based category file
/// cannot hold.
pub fn clean_name(raw: &str) -> Result<String, TrackerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TrackerError::InvalidInput(
            "name cannot be empty".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(TrackerError::InvalidInput(
            "name must fit on one line".to_string(),
        ));
    }
    Ok(name.to_string())
}

pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
