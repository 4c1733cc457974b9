//! Compiled form of a [`LexerConfig`]: a per-character classification table
//! plus sorted symbol and keyword lists for binary search.

use crate::config::{LexerConfig, StringRule};
use crate::error::ConfigError;

pub const ID_START: u16 = 1 << 0;
pub const ID_REST: u16 = 1 << 1;
pub const DIGIT: u16 = 1 << 2;
pub const SYMBOL_START: u16 = 1 << 3;
pub const SYMBOL_PART: u16 = 1 << 4;
/// A complete one-character symbol that no longer symbol starts with.
pub const UNIQUE_SYMBOL: u16 = 1 << 5;
pub const STRING_DELIM: u16 = 1 << 6;
pub const SPACE: u16 = 1 << 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolRole {
    Operator(u16),
    LineComment,
    /// Carries the closing delimiter.
    BlockComment(String),
}

#[derive(Debug, Clone)]
pub struct LexTable {
    classes: [u16; 128],
    symbols: Vec<(String, SymbolRole)>,
    max_symbol_len: usize,
    keywords: Vec<(String, u16)>,
    config: LexerConfig,
}

impl LexTable {
    pub fn compile(config: &LexerConfig) -> Result<Self, ConfigError> {
        let mut symbols: Vec<(String, SymbolRole)> = Vec::new();

        let ops = config.operator_symbols();
        if ops.len() > u16::MAX as usize {
            return Err(ConfigError::TooMany("operators"));
        }
        for (id, op) in ops.iter().enumerate() {
            add_symbol(&mut symbols, op, SymbolRole::Operator(id as u16))?;
        }
        for open in &config.line_comments {
            add_symbol(&mut symbols, open, SymbolRole::LineComment)?;
        }
        for block in &config.block_comments {
            if block.close.is_empty() {
                return Err(ConfigError::BadSymbol(block.close.clone()));
            }
            add_symbol(
                &mut symbols,
                &block.open,
                SymbolRole::BlockComment(block.close.clone()),
            )?;
        }
        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        let max_symbol_len = symbols.iter().map(|(s, _)| s.len()).max().unwrap_or(0);

        if config.keywords.len() > u16::MAX as usize {
            return Err(ConfigError::TooMany("keywords"));
        }
        let mut keywords = Vec::with_capacity(config.keywords.len());
        for (id, word) in config.keywords.iter().enumerate() {
            let mut chars = word.chars();
            let shaped = chars.next().is_some_and(|c| config.ident_start.accepts(c))
                && chars.all(|c| config.ident_rest.accepts(c));
            if !shaped {
                return Err(ConfigError::KeywordNotIdentifier(word.clone()));
            }
            keywords.push((word.clone(), id as u16));
        }
        keywords.sort_by(|a, b| a.0.cmp(&b.0));
        keywords.dedup_by(|a, b| a.0 == b.0);

        let mut classes = [0u16; 128];
        for (byte, class) in classes.iter_mut().enumerate() {
            let c = char::from(byte as u8);
            if config.ident_start.accepts(c) {
                *class |= ID_START;
            }
            if config.ident_rest.accepts(c) {
                *class |= ID_REST;
            }
            if c.is_ascii_digit() {
                *class |= DIGIT;
            }
            if c == ' ' || c == '\t' || c == '\r' || c == '\x0c' {
                *class |= SPACE;
            }
        }
        for (text, _) in &symbols {
            let bytes = text.as_bytes();
            classes[bytes[0] as usize] |= SYMBOL_START;
            for &b in bytes {
                classes[b as usize] |= SYMBOL_PART;
            }
        }
        for (text, _) in &symbols {
            let first = text.as_bytes()[0];
            let longer = symbols
                .iter()
                .any(|(other, _)| other.len() > 1 && other.as_bytes()[0] == first);
            if text.len() == 1 && !longer {
                classes[first as usize] |= UNIQUE_SYMBOL;
            }
        }
        for (i, rule) in config.strings.iter().enumerate() {
            let d = rule.delimiter;
            let clash = !d.is_ascii()
                || classes[d as usize] & (SYMBOL_PART | ID_START | STRING_DELIM) != 0
                || config.strings[..i].iter().any(|r| r.delimiter == d);
            if clash {
                return Err(ConfigError::DuplicateDelimiter(d));
            }
            classes[d as usize] |= STRING_DELIM;
        }

        Ok(Self {
            classes,
            symbols,
            max_symbol_len,
            keywords,
            config: config.clone(),
        })
    }

    pub fn class_of(&self, c: char) -> u16 {
        if c.is_ascii() {
            return self.classes[c as usize];
        }
        let mut class = 0;
        if self.config.ident_start.accepts(c) {
            class |= ID_START;
        }
        if self.config.ident_rest.accepts(c) {
            class |= ID_REST;
        }
        class
    }

    pub fn has(&self, c: char, flag: u16) -> bool {
        self.class_of(c) & flag != 0
    }

    pub fn find_symbol(&self, text: &str) -> Option<&SymbolRole> {
        self.symbols
            .binary_search_by(|(s, _)| s.as_str().cmp(text))
            .ok()
            .map(|i| &self.symbols[i].1)
    }

    pub fn max_symbol_len(&self) -> usize {
        self.max_symbol_len
    }

    pub fn keyword(&self, text: &str) -> Option<u16> {
        self.keywords
            .binary_search_by(|(k, _)| k.as_str().cmp(text))
            .ok()
            .map(|i| self.keywords[i].1)
    }

    pub fn string_rule(&self, c: char) -> Option<&StringRule> {
        self.config.strings.iter().find(|r| r.delimiter == c)
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }
}

fn add_symbol(
    symbols: &mut Vec<(String, SymbolRole)>,
    text: &str,
    role: SymbolRole,
) -> Result<(), ConfigError> {
    let valid = !text.is_empty() && text.chars().all(|c| c.is_ascii_punctuation());
    if !valid {
        return Err(ConfigError::BadSymbol(text.to_string()));
    }
    if let Some((_, existing)) = symbols.iter().find(|(s, _)| s == text) {
        if *existing != role {
            return Err(ConfigError::DuplicateSymbol(text.to_string()));
        }
        return Ok(());
    }
    symbols.push((text.to_string(), role));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorLine;

    #[test]
    fn classifies_unique_and_shared_prefixes() {
        let table = LexTable::compile(&LexerConfig::default()).unwrap();
        assert!(table.has(';', UNIQUE_SYMBOL));
        assert!(table.has('(', UNIQUE_SYMBOL));
        // '<' is a prefix of '<=' and '<<'
        assert!(table.has('<', SYMBOL_START));
        assert!(!table.has('<', UNIQUE_SYMBOL));
        assert!(table.has('a', ID_START));
        assert!(table.has('7', DIGIT));
        assert!(!table.has('7', ID_START));
        assert!(table.has('"', STRING_DELIM));
    }

    #[test]
    fn ascii_classes_follow_the_character() {
        let table = LexTable::compile(&LexerConfig::default()).unwrap();
        for byte in 0u8..128 {
            let c = char::from(byte);
            assert_eq!(table.has(c, DIGIT), c.is_ascii_digit(), "{c:?}");
            assert_eq!(table.has(c, ID_START), c.is_ascii_alphabetic() || c == '_', "{c:?}");
        }
        assert!(table.has(' ', SPACE));
        assert!(table.has('\t', SPACE));
        assert!(!table.has('x', SPACE));
    }

    #[test]
    fn symbol_lookup_uses_sorted_table() {
        let table = LexTable::compile(&LexerConfig::default()).unwrap();
        assert_eq!(table.find_symbol("//"), Some(&SymbolRole::LineComment));
        assert!(matches!(table.find_symbol(">>>"), Some(SymbolRole::Operator(_))));
        assert_eq!(table.find_symbol("=>"), None);
        assert_eq!(table.keyword("while"), LexerConfig::default().keyword_id("while"));
        assert_eq!(table.keyword("whilst"), None);
    }

    #[test]
    fn rejects_conflicting_roles() {
        let mut config = LexerConfig::default();
        config.line_comments.push("==".into());
        assert!(matches!(
            LexTable::compile(&config),
            Err(ConfigError::DuplicateSymbol(s)) if s == "=="
        ));

        let mut config = LexerConfig::default();
        config.keywords.push("fi-nal".into());
        assert!(matches!(
            LexTable::compile(&config),
            Err(ConfigError::KeywordNotIdentifier(_))
        ));

        let mut config = LexerConfig::default();
        config.operators.push(OperatorLine {
            right_assoc: false,
            ops: vec!["and".into()],
        });
        assert!(matches!(LexTable::compile(&config), Err(ConfigError::BadSymbol(_))));
    }
}
