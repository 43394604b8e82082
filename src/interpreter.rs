//! Modal command interpreter.
//!
//! Turns one input token at a time into tracker operations. Multi-step
//! flows (move, delete, insert, adjust) are explicit modes rather than
//! nested reads, so the caller keeps ticking clocks and redrawing between
//! tokens. Every primitive commits as soon as it is applied; cancelling a
//! flow only abandons the steps not yet taken.

use std::time::Instant;

use tracing::debug;

use crate::domain::{CategoryKey, Direction, Tracker, TrackerError, clean_name};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    PauseAll,
    Move,
    Delete,
    Insert,
    Increment,
    Decrement,
    Finish,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Key(char),
    Nav(Nav),
    Command(Command),
    Text(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn apply(self, seconds: u64) -> i64 {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        match self {
            Sign::Plus => seconds,
            Sign::Minus => -seconds,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    ConfirmQuit,
    /// Every running clock is paused until the next token arrives.
    Frozen,
    MoveSelect,
    Moving(CategoryKey),
    DeleteSelect,
    DeleteConfirm(CategoryKey),
    InsertKey,
    InsertName(char),
    AdjustSelect(Sign),
    AdjustAmount(Sign, CategoryKey),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
pub struct Interpreter {
    mode: Mode,
    status: Option<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// True while the current mode expects a free-text line.
    pub fn wants_text(&self) -> bool {
        matches!(self.mode, Mode::InsertName(_) | Mode::AdjustAmount(..))
    }

    /// Category the current flow is operating on, if any.
    pub fn selection(&self) -> Option<CategoryKey> {
        match self.mode {
            Mode::Moving(key) | Mode::DeleteConfirm(key) | Mode::AdjustAmount(_, key) => Some(key),
            _ => None,
        }
    }

    /// Last recovered error or notice, cleared by the next token.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn prompt(&self) -> Option<String> {
        let prompt = match self.mode {
            Mode::Normal => return None,
            Mode::ConfirmQuit => "Quit? enter or esc to confirm, any other key to stay".to_string(),
            Mode::Frozen => "All clocks frozen, press any key to resume".to_string(),
            Mode::MoveSelect => "Move which category? (esc cancels)".to_string(),
            Mode::Moving(key) => format!(
                "Moving '{}': up/down reorder, left/right outdent/indent, enter finishes",
                key
            ),
            Mode::DeleteSelect => "Delete which category? (esc cancels)".to_string(),
            Mode::DeleteConfirm(key) => format!(
                "Delete '{}' and everything under it? press del again to confirm",
                key
            ),
            Mode::InsertKey => "Key for the new category? (an unused letter)".to_string(),
            Mode::InsertName(key) => format!("Name for '{}':", key),
            Mode::AdjustSelect(Sign::Plus) => "Add time to which category?".to_string(),
            Mode::AdjustSelect(Sign::Minus) => "Remove time from which category?".to_string(),
            Mode::AdjustAmount(Sign::Plus, key) => format!("Seconds to add to '{}':", key),
            Mode::AdjustAmount(Sign::Minus, key) => format!("Seconds to remove from '{}':", key),
        };
        Some(prompt)
    }

    pub fn handle(&mut self, tracker: &mut Tracker, token: Token, now: Instant) -> Outcome {
        self.status = None;

        let mode = self.mode;
        let (next, outcome) = match mode {
            Mode::Normal => self.handle_normal(tracker, token, now),
            Mode::ConfirmQuit => match token {
                Token::Command(Command::Quit | Command::Cancel | Command::Finish) => {
                    (Mode::Normal, Outcome::Quit)
                }
                _ => (Mode::Normal, Outcome::Continue),
            },
            Mode::Frozen => {
                tracker.resume_all_running(now);
                (Mode::Normal, Outcome::Continue)
            }
            Mode::MoveSelect => (self.select(tracker, token, Mode::Moving), Outcome::Continue),
            Mode::Moving(key) => (self.handle_moving(tracker, key, token), Outcome::Continue),
            Mode::DeleteSelect => (
                self.select(tracker, token, Mode::DeleteConfirm),
                Outcome::Continue,
            ),
            Mode::DeleteConfirm(key) => (
                self.handle_delete_confirm(tracker, key, token),
                Outcome::Continue,
            ),
            Mode::InsertKey => (self.handle_insert_key(tracker, token), Outcome::Continue),
            Mode::InsertName(key) => (
                self.handle_insert_name(tracker, key, token),
                Outcome::Continue,
            ),
            Mode::AdjustSelect(sign) => (
                self.select(tracker, token, |key| Mode::AdjustAmount(sign, key)),
                Outcome::Continue,
            ),
            Mode::AdjustAmount(sign, key) => (
                self.handle_adjust_amount(tracker, sign, key, token),
                Outcome::Continue,
            ),
        };

        if next != mode {
            debug!(from = ?mode, to = ?next, "interpreter mode change");
        }
        self.mode = next;
        outcome
    }

    fn handle_normal(&mut self, tracker: &mut Tracker, token: Token, now: Instant) -> (Mode, Outcome) {
        let next = match token {
            Token::Key(c) => {
                match tracker.toggle_running(CategoryKey::new(c), now) {
                    Ok(state) => debug!(key = %c, ?state, "toggled category"),
                    Err(e) => self.recover(e),
                }
                Mode::Normal
            }
            Token::Command(command) => match command {
                Command::Quit | Command::Cancel => Mode::ConfirmQuit,
                Command::PauseAll => {
                    tracker.pause_all_running(now);
                    debug!(frozen = tracker.running().count(), "froze running clocks");
                    Mode::Frozen
                }
                Command::Move => Mode::MoveSelect,
                Command::Delete => Mode::DeleteSelect,
                Command::Insert => Mode::InsertKey,
                Command::Increment => Mode::AdjustSelect(Sign::Plus),
                Command::Decrement => Mode::AdjustSelect(Sign::Minus),
                Command::Finish => Mode::Normal,
            },
            Token::Nav(_) | Token::Text(_) => Mode::Normal,
        };
        (next, Outcome::Continue)
    }

    /// Shared first step of move, delete and adjust: wait for an existing
    /// category key or a cancel.
    fn select(
        &mut self,
        tracker: &Tracker,
        token: Token,
        selected: impl FnOnce(CategoryKey) -> Mode,
    ) -> Mode {
        match token {
            Token::Key(c) => {
                let key = CategoryKey::new(c);
                if tracker.contains(key) && !key.is_root() {
                    selected(key)
                } else {
                    self.recover(TrackerError::UnknownKey(key));
                    self.mode
                }
            }
            Token::Command(Command::Cancel | Command::Finish) => Mode::Normal,
            _ => self.mode,
        }
    }

    fn handle_moving(&mut self, tracker: &mut Tracker, key: CategoryKey, token: Token) -> Mode {
        let result = match token {
            Token::Nav(Nav::Up) => tracker.move_sibling(key, Direction::Up),
            Token::Nav(Nav::Down) => tracker.move_sibling(key, Direction::Down),
            Token::Nav(Nav::Left) => tracker.outdent(key),
            Token::Nav(Nav::Right) => tracker.indent(key),
            Token::Command(Command::Finish | Command::Cancel) => return Mode::Normal,
            _ => return self.mode,
        };

        match result {
            Ok(true) => {}
            Ok(false) => self.status = Some(format!("'{}' cannot move that way", key)),
            Err(e) => self.recover(e),
        }
        self.mode
    }

    fn handle_delete_confirm(&mut self, tracker: &mut Tracker, key: CategoryKey, token: Token) -> Mode {
        if token != Token::Command(Command::Delete) {
            self.status = Some("Delete cancelled".to_string());
            return Mode::Normal;
        }

        match tracker.delete_subtree(key) {
            Ok(removed) => {
                debug!(key = %key, count = removed.len(), "deleted subtree");
                let noun = if removed.len() == 1 { "category" } else { "categories" };
                self.status = Some(format!("Deleted {} {}", removed.len(), noun));
            }
            Err(e) => self.recover(e),
        }
        Mode::Normal
    }

    fn handle_insert_key(&mut self, tracker: &Tracker, token: Token) -> Mode {
        match token {
            Token::Key(c) if !CategoryKey::is_valid_shortcut(c) => {
                self.recover(TrackerError::InvalidKey(c));
                self.mode
            }
            Token::Key(c) if tracker.contains(CategoryKey::new(c)) => {
                self.recover(TrackerError::DuplicateKey(c));
                self.mode
            }
            Token::Key(c) => Mode::InsertName(c),
            Token::Command(Command::Cancel) => Mode::Normal,
            _ => self.mode,
        }
    }

    fn handle_insert_name(&mut self, tracker: &mut Tracker, key: char, token: Token) -> Mode {
        match token {
            Token::Text(raw) => {
                let name = match clean_name(&raw) {
                    Ok(name) => name,
                    Err(e) => {
                        self.recover(e);
                        return self.mode;
                    }
                };
                match tracker.insert_category(key, name.as_str()) {
                    Ok(inserted) => debug!(key = %inserted, name = %name, "inserted category"),
                    Err(e) => self.recover(e),
                }
                Mode::Normal
            }
            Token::Command(Command::Cancel) => Mode::Normal,
            _ => self.mode,
        }
    }

    fn handle_adjust_amount(
        &mut self,
        tracker: &mut Tracker,
        sign: Sign,
        key: CategoryKey,
        token: Token,
    ) -> Mode {
        match token {
            Token::Text(amount) => {
                let seconds = match amount.trim().parse::<u64>() {
                    Ok(seconds) => seconds,
                    Err(_) => {
                        self.recover(TrackerError::InvalidInput(format!(
                            "'{}' is not a number of seconds",
                            amount.trim()
                        )));
                        return self.mode;
                    }
                };
                match tracker.adjust_time(key, sign.apply(seconds)) {
                    Ok(total) => debug!(key = %key, total, "adjusted time"),
                    Err(e) => self.recover(e),
                }
                Mode::Normal
            }
            Token::Command(Command::Cancel) => Mode::Normal,
            _ => self.mode,
        }
    }

    fn recover(&mut self, error: TrackerError) {
        debug!(%error, mode = ?self.mode, "recovered from tracker error");
        self.status = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::RunState;

    fn key(c: char) -> CategoryKey {
        CategoryKey::new(c)
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    fn cmd(command: Command) -> Token {
        Token::Command(command)
    }

    fn feed(interpreter: &mut Interpreter, tracker: &mut Tracker, tokens: Vec<Token>, now: Instant) {
        for token in tokens {
            assert_eq!(interpreter.handle(tracker, token, now), Outcome::Continue);
        }
    }

    fn setup() -> (Interpreter, Tracker) {
        let mut tracker = Tracker::new();
        tracker.insert_category('p', "Project").unwrap();
        tracker.insert_category('t', "Task").unwrap();
        (Interpreter::new(), tracker)
    }

    fn root_children(tracker: &Tracker) -> Vec<char> {
        tracker.root().children.iter().map(|child| child.0).collect()
    }

    #[test]
    fn test_letter_toggles_category() {
        let start = Instant::now();
        let (mut interpreter, mut tracker) = setup();

        feed(&mut interpreter, &mut tracker, vec![Token::Key('p')], start);
        assert_eq!(tracker.category(key('p')).unwrap().state, RunState::Running);

        tracker.update_all(start + Duration::from_secs(125));
        feed(
            &mut interpreter,
            &mut tracker,
            vec![Token::Key('p')],
            start + Duration::from_secs(125),
        );
        assert_eq!(tracker.category(key('p')).unwrap().accumulated_seconds, 125);
        assert!(!tracker.is_in_running_set(key('p')));
    }

    #[test]
    fn test_unknown_letter_is_swallowed() {
        let (mut interpreter, mut tracker) = setup();
        feed(&mut interpreter, &mut tracker, vec![Token::Key('z')], Instant::now());
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(interpreter.status(), Some("no category with key 'z'"));

        feed(&mut interpreter, &mut tracker, vec![Token::Nav(Nav::Up)], Instant::now());
        assert_eq!(interpreter.status(), None);
    }

    #[test]
    fn test_quit_requires_confirmation() {
        let now = Instant::now();
        let (mut interpreter, mut tracker) = setup();

        assert_eq!(interpreter.handle(&mut tracker, cmd(Command::Cancel), now), Outcome::Continue);
        assert_eq!(interpreter.mode(), Mode::ConfirmQuit);
        assert_eq!(interpreter.handle(&mut tracker, Token::Key('p'), now), Outcome::Continue);
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert!(!tracker.category(key('p')).unwrap().is_running());

        interpreter.handle(&mut tracker, cmd(Command::Quit), now);
        assert_eq!(interpreter.handle(&mut tracker, cmd(Command::Finish), now), Outcome::Quit);
    }

    #[test]
    fn test_freeze_bracket_pauses_and_resumes_same_clocks() {
        let start = Instant::now();
        let (mut interpreter, mut tracker) = setup();
        feed(&mut interpreter, &mut tracker, vec![Token::Key('p')], start);

        let frozen_at = start + Duration::from_secs(10);
        tracker.update_all(frozen_at);
        feed(&mut interpreter, &mut tracker, vec![cmd(Command::PauseAll)], frozen_at);
        assert_eq!(interpreter.mode(), Mode::Frozen);
        assert!(!tracker.category(key('p')).unwrap().is_running());
        assert!(tracker.is_in_running_set(key('p')));

        let resumed_at = frozen_at + Duration::from_secs(600);
        tracker.update_all(resumed_at);
        // The resuming token is consumed, not toggled.
        feed(&mut interpreter, &mut tracker, vec![Token::Key('t')], resumed_at);
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert!(tracker.category(key('p')).unwrap().is_running());
        assert!(!tracker.category(key('t')).unwrap().is_running());

        tracker.update_all(resumed_at + Duration::from_secs(5));
        assert_eq!(tracker.category(key('p')).unwrap().accumulated_seconds, 15);
    }

    #[test]
    fn test_move_flow_reorders_and_indents() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Move), Token::Key('t'), Token::Nav(Nav::Up)],
            now,
        );
        assert_eq!(interpreter.mode(), Mode::Moving(key('t')));
        assert_eq!(root_children(&tracker), vec!['t', 'p']);

        feed(&mut interpreter, &mut tracker, vec![Token::Nav(Nav::Right)], now);
        assert_eq!(interpreter.status(), Some("'t' cannot move that way"));

        feed(
            &mut interpreter,
            &mut tracker,
            vec![Token::Nav(Nav::Down), Token::Nav(Nav::Right)],
            now,
        );
        assert_eq!(tracker.category(key('t')).unwrap().parent, Some(key('p')));

        feed(&mut interpreter, &mut tracker, vec![Token::Nav(Nav::Left)], now);
        assert_eq!(tracker.category(key('t')).unwrap().parent, Some(CategoryKey::ROOT));

        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Finish)], now);
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(root_children(&tracker), vec!['p', 't']);
    }

    #[test]
    fn test_move_select_ignores_unknown_and_cancels() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Move), Token::Key('x')], now);
        assert_eq!(interpreter.mode(), Mode::MoveSelect);
        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Cancel)], now);
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(root_children(&tracker), vec!['p', 't']);
    }

    #[test]
    fn test_delete_requires_repeated_delete() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Delete), Token::Key('p'), cmd(Command::Finish)],
            now,
        );
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert!(tracker.contains(key('p')));
        assert_eq!(interpreter.status(), Some("Delete cancelled"));

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Delete), Token::Key('p')],
            now,
        );
        assert_eq!(interpreter.selection(), Some(key('p')));
        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Delete)], now);
        assert!(!tracker.contains(key('p')));
        assert_eq!(interpreter.status(), Some("Deleted 1 category"));
    }

    #[test]
    fn test_delete_running_subtree_clears_running_set() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();
        tracker.insert_category_under('s', "Sub", key('t')).unwrap();
        feed(&mut interpreter, &mut tracker, vec![Token::Key('s')], now);
        assert!(tracker.is_in_running_set(key('s')));

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Delete), Token::Key('t'), cmd(Command::Delete)],
            now,
        );
        assert!(!tracker.contains(key('s')));
        assert_eq!(tracker.running().count(), 0);
    }

    #[test]
    fn test_insert_flow_rejects_bad_keys_then_names() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Insert), Token::Key('p')], now);
        assert_eq!(interpreter.mode(), Mode::InsertKey);
        assert_eq!(interpreter.status(), Some("key 'p' is already in use"));

        feed(&mut interpreter, &mut tracker, vec![Token::Key('7')], now);
        assert_eq!(interpreter.mode(), Mode::InsertKey);

        feed(&mut interpreter, &mut tracker, vec![Token::Key('r')], now);
        assert_eq!(interpreter.mode(), Mode::InsertName('r'));
        assert!(interpreter.wants_text());

        feed(&mut interpreter, &mut tracker, vec![text("   ")], now);
        assert_eq!(interpreter.mode(), Mode::InsertName('r'));

        feed(&mut interpreter, &mut tracker, vec![text("Read\nMore")], now);
        assert_eq!(interpreter.mode(), Mode::InsertName('r'));
        assert_eq!(
            interpreter.status(),
            Some("invalid input: name must fit on one line")
        );

        feed(&mut interpreter, &mut tracker, vec![text(" Reading ")], now);
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(tracker.category(key('r')).unwrap().name, "Reading");
        assert_eq!(root_children(&tracker), vec!['p', 't', 'r']);
    }

    #[test]
    fn test_insert_cancel_leaves_tree_untouched() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();
        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Insert), Token::Key('r'), cmd(Command::Cancel)],
            now,
        );
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert!(!tracker.contains(key('r')));
    }

    #[test]
    fn test_delete_select_cancel_returns_to_normal() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Delete), cmd(Command::Cancel)],
            now,
        );
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(tracker.len(), 2);

        feed(&mut interpreter, &mut tracker, vec![Token::Key('p')], now);
        assert!(tracker.category(key('p')).unwrap().is_running());
        assert!(tracker.contains(key('p')));
    }

    #[test]
    fn test_adjust_select_cancel_returns_to_normal() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        for command in [Command::Increment, Command::Decrement] {
            feed(
                &mut interpreter,
                &mut tracker,
                vec![cmd(command), cmd(Command::Cancel)],
                now,
            );
            assert_eq!(interpreter.mode(), Mode::Normal);
        }

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Increment), Token::Key('t'), cmd(Command::Cancel)],
            now,
        );
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(tracker.category(key('t')).unwrap().accumulated_seconds, 0);
    }

    #[test]
    fn test_adjust_flows_apply_sign_and_clamp() {
        let (mut interpreter, mut tracker) = setup();
        let now = Instant::now();

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Increment), Token::Key('t'), text("90")],
            now,
        );
        assert_eq!(tracker.category(key('t')).unwrap().accumulated_seconds, 90);

        feed(
            &mut interpreter,
            &mut tracker,
            vec![cmd(Command::Decrement), Token::Key('t'), text("abc")],
            now,
        );
        assert_eq!(interpreter.mode(), Mode::AdjustAmount(Sign::Minus, key('t')));
        assert_eq!(
            interpreter.status(),
            Some("invalid input: 'abc' is not a number of seconds")
        );

        feed(&mut interpreter, &mut tracker, vec![text("100000")], now);
        assert_eq!(interpreter.mode(), Mode::Normal);
        assert_eq!(tracker.category(key('t')).unwrap().accumulated_seconds, 0);
    }

    #[test]
    fn test_sub_protocol_does_not_pause_running_clocks() {
        let start = Instant::now();
        let (mut interpreter, mut tracker) = setup();
        feed(&mut interpreter, &mut tracker, vec![Token::Key('p')], start);
        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Insert)], start);

        tracker.update_all(start + Duration::from_secs(30));
        assert_eq!(tracker.category(key('p')).unwrap().accumulated_seconds, 30);
        assert!(tracker.category(key('p')).unwrap().is_running());
    }

    #[test]
    fn test_prompt_follows_mode() {
        let (mut interpreter, mut tracker) = setup();
        assert_eq!(interpreter.prompt(), None);
        feed(&mut interpreter, &mut tracker, vec![cmd(Command::Decrement)], Instant::now());
        assert_eq!(
            interpreter.prompt().as_deref(),
            Some("Remove time from which category?")
        );
    }
}
