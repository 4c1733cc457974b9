//! Engine configuration. Everything here is plain data, deserializable from
//! JSON, and compiled once when a [`Driver`](crate::Driver) is built.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One priority class of binary operators. Lines are listed from the loosest
/// binding to the tightest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorLine {
    #[serde(default)]
    pub right_assoc: bool,
    pub ops: Vec<String>,
}

impl OperatorLine {
    fn left(ops: &[&str]) -> Self {
        Self {
            right_assoc: false,
            ops: ops.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn right(ops: &[&str]) -> Self {
        Self {
            right_assoc: true,
            ops: ops.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRule {
    pub delimiter: char,
    /// `\n`, `\t`, `\xHH`, ...
    #[serde(default)]
    pub escapes: bool,
    /// `''` inside `'...'` stands for one `'`.
    #[serde(default)]
    pub doubling: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockComment {
    pub open: String,
    pub close: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharClass {
    #[serde(default)]
    pub letters: bool,
    #[serde(default)]
    pub digits: bool,
    #[serde(default)]
    pub extra: String,
}

impl CharClass {
    pub fn accepts(&self, c: char) -> bool {
        (self.letters && c.is_alphabetic())
            || (self.digits && c.is_ascii_digit())
            || self.extra.contains(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormats {
    pub decimal: bool,
    pub hex: bool,
    pub octal: bool,
    pub float: bool,
}

impl Default for NumberFormats {
    fn default() -> Self {
        Self {
            decimal: true,
            hex: true,
            octal: true,
            float: true,
        }
    }
}

/// Everything the lexer needs to know about the language, supplied once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerConfig {
    pub keywords: Vec<String>,
    pub operators: Vec<OperatorLine>,
    pub prefix: Vec<String>,
    pub postfix: Vec<String>,
    pub punctuation: Vec<String>,
    pub line_comments: Vec<String>,
    pub block_comments: Vec<BlockComment>,
    pub strings: Vec<StringRule>,
    pub ident_start: CharClass,
    pub ident_rest: CharClass,
    pub numbers: NumberFormats,
    pub keep_comments: bool,
    pub keep_whitespace: bool,
    /// Longest piece of a line pulled from a reader at once.
    pub max_line_chunk: usize,
}

impl Default for LexerConfig {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            keywords: words(&[
                "if", "then", "elif", "else", "fi", "while", "do", "od", "repeat", "until", "for",
                "from", "to", "step", "in", "method", "class", "return", "leave", "continue",
                "import", "const", "lazy", "true", "false",
            ]),
            operators: vec![
                OperatorLine::right(&["=", "+=", "-=", "*=", "/=", "%="]),
                OperatorLine::left(&["||"]),
                OperatorLine::left(&["&&"]),
                OperatorLine::left(&["|"]),
                OperatorLine::left(&["^"]),
                OperatorLine::left(&["&"]),
                OperatorLine::left(&["==", "!="]),
                OperatorLine::left(&["<", "<=", ">", ">="]),
                OperatorLine::left(&["<<", ">>", ">>>"]),
                OperatorLine::left(&["+", "-"]),
                OperatorLine::left(&["*", "/", "%"]),
                OperatorLine::right(&["**"]),
            ],
            prefix: words(&["-", "+", "!", "~", "++", "--"]),
            postfix: words(&["++", "--"]),
            punctuation: words(&["(", ")", "[", "]", "{", "}", ",", ";", ".", ":"]),
            line_comments: words(&["//"]),
            block_comments: vec![BlockComment {
                open: "/*".into(),
                close: "*/".into(),
            }],
            strings: vec![
                StringRule {
                    delimiter: '"',
                    escapes: true,
                    doubling: false,
                },
                StringRule {
                    delimiter: '\'',
                    escapes: false,
                    doubling: true,
                },
            ],
            ident_start: CharClass {
                letters: true,
                digits: false,
                extra: "_".into(),
            },
            ident_rest: CharClass {
                letters: true,
                digits: true,
                extra: "_".into(),
            },
            numbers: NumberFormats::default(),
            keep_comments: false,
            keep_whitespace: false,
            max_line_chunk: 4096,
        }
    }
}

impl LexerConfig {
    /// Every operator-like symbol in id order: priority lines, prefix,
    /// postfix, punctuation, first occurrence wins.
    pub fn operator_symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let all = self
            .operators
            .iter()
            .flat_map(|line| line.ops.iter())
            .chain(self.prefix.iter())
            .chain(self.postfix.iter())
            .chain(self.punctuation.iter());
        for op in all {
            if !out.contains(&op.as_str()) {
                out.push(op.as_str());
            }
        }
        out
    }

    /// Id the lexer reports for operator `text`.
    pub fn operator_id(&self, text: &str) -> Option<u16> {
        self.operator_symbols()
            .iter()
            .position(|s| *s == text)
            .map(|i| i as u16)
    }

    /// Id the lexer reports for keyword `text`.
    pub fn keyword_id(&self, text: &str) -> Option<u16> {
        self.keywords.iter().position(|k| k == text).map(|i| i as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Parsing stops once this many errors have been reported.
    pub max_errors: usize,
    pub max_warnings: usize,
    /// Deepest nesting of parenthesized sub-expressions, operator chains
    /// and statement bodies. Bounds the depth of every tree walk.
    pub max_nesting: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_errors: 25,
            max_warnings: 100,
            max_nesting: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    /// One trace line per executed statement and applied operator.
    pub trace_statements: bool,
    /// Dump a method's locals when its frame is popped.
    pub trace_locals: bool,
    /// Trace loop counters on every iteration.
    pub trace_auto: bool,
    /// Deepest allowed method-call nesting.
    pub max_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            trace_statements: false,
            trace_locals: false,
            trace_auto: false,
            max_depth: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lexer: LexerConfig,
    pub parser: ParserOptions,
    pub vm: VmOptions,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_ids_are_stable_and_deduplicated() {
        let config = LexerConfig::default();
        let symbols = config.operator_symbols();
        assert_eq!(symbols[0], "=");
        // "-" is both binary and prefix but only listed once
        assert_eq!(symbols.iter().filter(|s| **s == "-").count(), 1);
        assert_eq!(config.operator_id("="), Some(0));
        assert_eq!(config.operator_id("=>"), None);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = EngineConfig::from_json(r#"{ "vm": { "max_depth": 12 } }"#).unwrap();
        assert_eq!(config.vm.max_depth, 12);
        assert!(!config.vm.trace_statements);
        assert_eq!(config.lexer, LexerConfig::default());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let text = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&text).unwrap(), config);
    }
}
