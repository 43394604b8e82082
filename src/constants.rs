use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::style::Color;

use crate::interpreter::Command;

pub const COLORS: [Color; 12] = [
    Color::Rgb(0, 176, 80),
    Color::Rgb(128, 255, 0),
    Color::Rgb(255, 255, 0),
    Color::Rgb(255, 204, 0),
    Color::Rgb(255, 153, 0),
    Color::Rgb(255, 51, 0),
    Color::Rgb(255, 0, 0),
    Color::Rgb(153, 0, 255),
    Color::Rgb(102, 51, 255),
    Color::Rgb(0, 0, 255),
    Color::Rgb(0, 153, 255),
    Color::Rgb(0, 255, 255),
];

pub const TIME_SETTINGS: TimeSettings = TimeSettings {
    tick_ms: 250,
    autosave_secs: 60,
};

pub const FILE_NAMES: FileNames = FileNames {
    config: "tracktime.rc",
    snapshot: "times.json",
    log: "tracktime.log",
};

pub const HELP_TEXT: &str =
    "letter toggle  space freeze  tab move  ins/* add  del delete  +/- adjust  esc quit";

pub const INDENT_WIDTH: usize = 2;

pub const MAX_BACKUPS: usize = 10;

/// Global command bindings. Letters are never bound here; they belong to
/// category shortcuts.
pub const KEY_BINDINGS: &[KeyBinding] = &[
    KeyBinding::plain(KeyCode::Char(' '), Command::PauseAll),
    KeyBinding::plain(KeyCode::Tab, Command::Move),
    KeyBinding::plain(KeyCode::Delete, Command::Delete),
    KeyBinding::plain(KeyCode::Insert, Command::Insert),
    KeyBinding::plain(KeyCode::Char('*'), Command::Insert),
    KeyBinding::plain(KeyCode::Char('+'), Command::Increment),
    KeyBinding::plain(KeyCode::Char('-'), Command::Decrement),
    KeyBinding::plain(KeyCode::Enter, Command::Finish),
    KeyBinding::plain(KeyCode::Esc, Command::Cancel),
    KeyBinding::ctrl('c', Command::Quit),
    KeyBinding::ctrl('q', Command::Quit),
];

pub struct TimeSettings {
    pub tick_ms: u64,
    pub autosave_secs: u64,
}

pub struct FileNames {
    pub config: &'static str,
    pub snapshot: &'static str,
    pub log: &'static str,
}

pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub command: Command,
}

impl KeyBinding {
    const fn plain(code: KeyCode, command: Command) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
            command,
        }
    }

    const fn ctrl(c: char, command: Command) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            command,
        }
    }
}
