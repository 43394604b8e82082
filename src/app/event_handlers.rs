use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::{
    constants::KEY_BINDINGS,
    interpreter::{Command, Nav, Outcome, Token},
};

use super::App;

impl App {
    /// Feeds one key press to the interpreter. Returns true when the user
    /// confirmed quitting.
    pub(super) fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        let token = if self.interpreter.wants_text() {
            self.text_entry_token(key)
        } else {
            map_key(key)
        };
        let Some(token) = token else {
            return false;
        };

        let outcome = self
            .interpreter
            .handle(&mut self.tracker, token, Instant::now());
        if !self.interpreter.wants_text() {
            self.input_line.clear();
        }

        outcome == Outcome::Quit
    }

    fn text_entry_token(&mut self, key: KeyEvent) -> Option<Token> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Token::Command(Command::Cancel));
        }

        match key.code {
            KeyCode::Enter => Some(Token::Text(std::mem::take(&mut self.input_line))),
            KeyCode::Esc => Some(Token::Command(Command::Cancel)),
            KeyCode::Backspace => {
                self.input_line.pop();
                None
            }
            KeyCode::Char(c) => {
                self.input_line.push(c);
                None
            }
            _ => None,
        }
    }
}

pub(super) fn map_key(key: KeyEvent) -> Option<Token> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    let bound = KEY_BINDINGS.iter().find(|binding| {
        binding.code == key.code
            && if binding.modifiers.is_empty() {
                !ctrl
            } else {
                key.modifiers.contains(binding.modifiers)
            }
    });
    if let Some(binding) = bound {
        return Some(Token::Command(binding.command));
    }

    match key.code {
        KeyCode::Up => Some(Token::Nav(Nav::Up)),
        KeyCode::Down => Some(Token::Nav(Nav::Down)),
        KeyCode::Left => Some(Token::Nav(Nav::Left)),
        KeyCode::Right => Some(Token::Nav(Nav::Right)),
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            Some(Token::Key(c))
        }
        _ => None,
    }
}
