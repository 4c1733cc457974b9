//! `ember`: a small configurable language engine. Sources are cut into
//! tokens by a table-driven lexer, parsed into an arena AST with lexically
//! resolved names, checked, and interpreted by a stack VM.

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod token;
pub mod token_stream;
pub mod utils;

pub mod driver;

pub use config::{EngineConfig, LexerConfig, ParserOptions, VmOptions};
pub use diagnostic::{Diagnostic, Severity};
pub use driver::{Driver, Program};
pub use error::{ConfigError, Error};
pub use interpreter::{RuntimeError, TraceSink, Variant, WriteSink};
