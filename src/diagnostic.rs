use serde::Serialize;
use std::fmt;

use crate::config::ParserOptions;
use crate::error::{LexError, LexErrorKind};
use crate::source::{PosId, SourceMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// Numeric diagnostic codes: 1xx lexical, 2xx syntax, 3xx semantic.
pub mod codes {
    pub const UNEXPECTED_CHARACTER: u16 = 101;
    pub const UNTERMINATED_STRING: u16 = 102;
    pub const UNTERMINATED_COMMENT: u16 = 103;
    pub const BAD_ESCAPE: u16 = 104;
    pub const BAD_NUMBER: u16 = 105;

    pub const UNEXPECTED_TOKEN: u16 = 201;
    pub const EXPECTED: u16 = 202;
    pub const TOO_MANY_ERRORS: u16 = 203;
    pub const UNIT_NOT_FOUND: u16 = 204;
    pub const CIRCULAR_IMPORT: u16 = 205;
    pub const TOO_MANY_WARNINGS: u16 = 206;
    pub const NESTING_TOO_DEEP: u16 = 207;

    pub const UNDEFINED: u16 = 301;
    pub const TYPE_MISMATCH: u16 = 302;
    pub const DUPLICATE: u16 = 303;
    pub const NO_OVERLOAD: u16 = 304;
    pub const AMBIGUOUS_CALL: u16 = 305;
    pub const NOT_ASSIGNABLE: u16 = 306;
    pub const MISPLACED_RETURN: u16 = 307;
    pub const LOOP_DEPTH: u16 = 308;
    pub const UNIMPLEMENTED: u16 = 309;
    pub const MISSING_INITIALIZER: u16 = 311;
    pub const IGNORED_INITIALIZER: u16 = 313;
    pub const UNKNOWN_MEMBER: u16 = 315;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: u16,
    pub message: String,
    #[serde(skip)]
    pub pos: PosId,
    /// `unit:line:column`, filled in once the parse is finished.
    pub location: String,
    #[serde(skip)]
    pub related_pos: Option<PosId>,
    pub related: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: u16, message: impl Into<String>, pos: PosId) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            pos,
            location: String::new(),
            related_pos: None,
            related: None,
        }
    }

    pub fn error(code: u16, message: impl Into<String>, pos: PosId) -> Self {
        Self::new(Severity::Error, code, message, pos)
    }

    pub fn warning(code: u16, message: impl Into<String>, pos: PosId) -> Self {
        Self::new(Severity::Warning, code, message, pos)
    }

    pub fn with_related(mut self, pos: PosId) -> Self {
        self.related_pos = Some(pos);
        self
    }

    pub fn from_lex(err: &LexError) -> Self {
        let code = match err.kind {
            LexErrorKind::UnexpectedCharacter(_) => codes::UNEXPECTED_CHARACTER,
            LexErrorKind::UnterminatedString => codes::UNTERMINATED_STRING,
            LexErrorKind::UnterminatedComment => codes::UNTERMINATED_COMMENT,
            LexErrorKind::BadEscape => codes::BAD_ESCAPE,
            LexErrorKind::BadNumber => codes::BAD_NUMBER,
        };
        Self::error(code, err.message.clone(), err.pos)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Renders the positions against the map of the parse that produced them.
    pub fn locate(&mut self, map: &SourceMap) {
        self.location = map.describe(self.pos);
        self.related = self.related_pos.map(|p| map.location(p));
    }
}

/// ```text
/// error[E302]: cannot assign String to Integer
///   --> main:3:5
///   note: see main:1:1
/// ```
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[E{}]: {}", self.severity, self.code, self.message)?;
        if !self.location.is_empty() {
            write!(f, "\n  --> {}", self.location)?;
        }
        if let Some(related) = &self.related {
            write!(f, "\n  note: see {related}")?;
        }
        Ok(())
    }
}

/// Collects diagnostics and tells the caller when a ceiling is reached.
#[derive(Debug)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
    options: ParserOptions,
    stopped: bool,
}

impl Diagnostics {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            list: Vec::new(),
            errors: 0,
            warnings: 0,
            options,
            stopped: false,
        }
    }

    /// Records `diag`. Returns `false` once the error or warning ceiling is
    /// hit; the closing "too many" diagnostic is added exactly once.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if self.stopped {
            return false;
        }
        let pos = diag.pos;
        match diag.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        self.list.push(diag);
        if self.errors >= self.options.max_errors {
            self.stop(codes::TOO_MANY_ERRORS, "too many errors, parsing stopped", pos);
        } else if self.warnings >= self.options.max_warnings {
            self.stop(codes::TOO_MANY_WARNINGS, "too many warnings, parsing stopped", pos);
        }
        !self.stopped
    }

    fn stop(&mut self, code: u16, message: &str, pos: PosId) {
        log::debug!("{message}");
        self.list.push(Diagnostic::error(code, message, pos));
        self.errors += 1;
        self.stopped = true;
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.list
    }

    pub fn into_vec(self, map: &SourceMap) -> Vec<Diagnostic> {
        let mut list = self.list;
        for diag in &mut list {
            diag.locate(map);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_ceiling_stops_once() {
        let mut diags = Diagnostics::new(ParserOptions {
            max_errors: 2,
            max_warnings: 10,
            ..ParserOptions::default()
        });
        assert!(diags.push(Diagnostic::error(codes::EXPECTED, "a", PosId::NONE)));
        assert!(!diags.push(Diagnostic::error(codes::EXPECTED, "b", PosId::NONE)));
        assert!(!diags.push(Diagnostic::error(codes::EXPECTED, "c", PosId::NONE)));
        let seen: Vec<u16> = diags.as_slice().iter().map(|d| d.code).collect();
        assert_eq!(seen, [codes::EXPECTED, codes::EXPECTED, codes::TOO_MANY_ERRORS]);
        assert!(diags.stopped());
    }

    #[test]
    fn renders_like_a_compiler() {
        let mut diag = Diagnostic::error(codes::TYPE_MISMATCH, "cannot assign", PosId::NONE);
        diag.location = "main:3:5".into();
        diag.related = Some("main:1:1".into());
        assert_eq!(
            diag.to_string(),
            "error[E302]: cannot assign\n  --> main:3:5\n  note: see main:1:1"
        );
    }
}
