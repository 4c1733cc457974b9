use thiserror::Error;

use crate::interpreter::RuntimeError;
use crate::source::PosId;

/// A language configuration the engine cannot work with.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("keyword `{0}` is not identifier-shaped")]
    KeywordNotIdentifier(String),

    #[error("keyword `{0}` has no meaning to the parser")]
    UnknownKeyword(String),

    #[error("symbol `{0}` has no meaning to the parser")]
    UnknownOperator(String),

    #[error("symbol `{0}` must be non-empty ASCII punctuation")]
    BadSymbol(String),

    #[error("symbol `{0}` is configured twice with different roles")]
    DuplicateSymbol(String),

    #[error("string delimiter `{0}` collides with another rule")]
    DuplicateDelimiter(char),

    #[error("too many {0} (ids are 16-bit)")]
    TooMany(&'static str),

    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    UnterminatedString,
    UnterminatedComment,
    BadEscape,
    BadNumber,
}

/// Lexical failure. Always fatal to the parse in progress.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub message: String,
    pub pos: PosId,
}

impl LexError {
    pub fn new(kind: LexErrorKind, message: impl Into<String>, pos: PosId) -> Self {
        Self {
            kind,
            message: message.into(),
            pos,
        }
    }
}

/// Errors surfaced by the embedding API.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("source unit `{0}` not found")]
    UnitNotFound(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
