use thiserror::Error;

use super::CategoryKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("no category with key '{0}'")]
    UnknownKey(CategoryKey),

    #[error("key '{0}' is already in use")]
    DuplicateKey(char),

    /// Shortcuts must be a single alphabetic character.
    #[error("'{0}' is not a valid shortcut, use a letter")]
    InvalidKey(char),

    #[error("the root category cannot be changed")]
    RootProtected,

    #[error("cannot move '{key}' under its own descendant '{target}'")]
    CyclicReparent {
        key: CategoryKey,
        target: CategoryKey,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
