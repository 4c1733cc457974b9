use thiserror::Error;

/// Why a thread stopped. `at` is the rendered source location of the node
/// that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{at}: type mismatch: '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
        at: String,
    },

    #[error("{at}: '{op}' cannot be applied to {operand}")]
    BadOperand {
        op: String,
        operand: String,
        at: String,
    },

    #[error("{at}: division by zero")]
    DivisionByZero { at: String },

    #[error("{at}: index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize, at: String },

    #[error("{at}: key {key} not found")]
    MissingKey { key: String, at: String },

    #[error("{at}: loop step is zero")]
    ZeroStep { at: String },

    #[error("{at}: stack overflow at call depth {depth}")]
    StackOverflow { depth: usize, at: String },

    /// The parser guarantees resolvable addresses; hitting this is a defect.
    #[error("{at}: variable '{name}' cannot be resolved")]
    Unresolved { name: String, at: String },

    #[error("{at}: assertion failed")]
    AssertionFailed { at: String },

    #[error("{at}: {what} is not implemented")]
    Unimplemented { what: String, at: String },

    #[error("{at}: cannot convert {value} to {to}")]
    ConversionFailed { value: String, to: String, at: String },

    #[error("cannot start a VM thread with a {bytes}-byte stack: {reason}")]
    NoStack { bytes: usize, reason: String },

    #[error("value stack underflow")]
    StackUnderflow,

    #[error("program has {0} error(s) and cannot run")]
    ProgramHasErrors(usize),

    #[error("module `{0}` not found in program")]
    ModuleNotFound(String),
}
