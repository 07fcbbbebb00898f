//! Error types shared across the crate.

use thiserror::Error;

/// Failures of the key-value persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("could not encode or decode stored value: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Invalid input handed to the game core from the host page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("unsupported grade {0}; expected 2 or 3")]
    UnsupportedGrade(u8),
    #[error("unknown direction '{0}'")]
    UnknownDirection(String),
    #[error("unknown mini-game '{0}'")]
    UnknownMiniGame(String),
    #[error("cell ({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },
    #[error("no kokugo questions match the selected filters")]
    NoQuestions,
    #[error("the current question was already answered")]
    AlreadyAnswered,
    #[error("the session has no more questions")]
    SessionFinished,
    #[error("speech synthesis unavailable")]
    SpeechUnavailable,
    #[error("action not allowed while the game is {0}")]
    WrongState(&'static str),
}
