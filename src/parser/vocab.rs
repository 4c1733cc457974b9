//! What the parser makes of the configured keyword and operator ids.

use crate::ast::{BinaryOp, Punct, UnaryOp};
use crate::config::LexerConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kw {
    If,
    Then,
    Elif,
    Else,
    Fi,
    While,
    Do,
    Od,
    Repeat,
    Until,
    For,
    From,
    To,
    Step,
    In,
    Method,
    Class,
    Return,
    Leave,
    Continue,
    Import,
    Const,
    Lazy,
    True,
    False,
}

const WORDS: &[(&str, Kw)] = &[
    ("if", Kw::If),
    ("then", Kw::Then),
    ("elif", Kw::Elif),
    ("else", Kw::Else),
    ("fi", Kw::Fi),
    ("while", Kw::While),
    ("do", Kw::Do),
    ("od", Kw::Od),
    ("repeat", Kw::Repeat),
    ("until", Kw::Until),
    ("for", Kw::For),
    ("from", Kw::From),
    ("to", Kw::To),
    ("step", Kw::Step),
    ("in", Kw::In),
    ("method", Kw::Method),
    ("class", Kw::Class),
    ("return", Kw::Return),
    ("leave", Kw::Leave),
    ("continue", Kw::Continue),
    ("import", Kw::Import),
    ("const", Kw::Const),
    ("lazy", Kw::Lazy),
    ("true", Kw::True),
    ("false", Kw::False),
];

impl Kw {
    pub fn from_word(word: &str) -> Option<Self> {
        WORDS.iter().find(|(w, _)| *w == word).map(|(_, kw)| *kw)
    }

    pub fn word(self) -> &'static str {
        WORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(w, _)| *w)
            .unwrap_or("?")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryInfo {
    pub op: BinaryOp,
    /// 1 for the loosest priority line.
    pub priority: u8,
    pub right_assoc: bool,
}

/// Roles of one operator id. A symbol such as `-` is both binary and prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorInfo {
    pub binary: Option<BinaryInfo>,
    pub prefix: Option<UnaryOp>,
    pub postfix: Option<UnaryOp>,
    pub punct: Option<Punct>,
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    keywords: Vec<Kw>,
    operators: Vec<OperatorInfo>,
}

impl Vocabulary {
    pub fn compile(config: &LexerConfig) -> Result<Self, ConfigError> {
        let keywords = config
            .keywords
            .iter()
            .map(|w| Kw::from_word(w).ok_or_else(|| ConfigError::UnknownKeyword(w.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        if config.operators.len() > u8::MAX as usize {
            return Err(ConfigError::TooMany("priority lines"));
        }
        let unknown = |s: &str| ConfigError::UnknownOperator(s.to_string());
        let mut operators = Vec::new();
        for symbol in config.operator_symbols() {
            let mut info = OperatorInfo::default();
            let line = config
                .operators
                .iter()
                .position(|line| line.ops.iter().any(|op| op == symbol));
            if let Some(index) = line {
                info.binary = Some(BinaryInfo {
                    op: BinaryOp::from_symbol(symbol).ok_or_else(|| unknown(symbol))?,
                    priority: index as u8 + 1,
                    right_assoc: config.operators[index].right_assoc,
                });
            }
            if config.prefix.iter().any(|p| p == symbol) {
                info.prefix = Some(UnaryOp::prefix_from_symbol(symbol).ok_or_else(|| unknown(symbol))?);
            }
            if config.postfix.iter().any(|p| p == symbol) {
                info.postfix =
                    Some(UnaryOp::postfix_from_symbol(symbol).ok_or_else(|| unknown(symbol))?);
            }
            if config.punctuation.iter().any(|p| p == symbol) {
                info.punct = Some(Punct::from_symbol(symbol).ok_or_else(|| unknown(symbol))?);
            }
            operators.push(info);
        }
        Ok(Self {
            keywords,
            operators,
        })
    }

    pub fn keyword(&self, id: u16) -> Option<Kw> {
        self.keywords.get(id as usize).copied()
    }

    pub fn operator(&self, id: u16) -> Option<&OperatorInfo> {
        self.operators.get(id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorLine;

    #[test]
    fn default_priorities() {
        let config = LexerConfig::default();
        let vocab = Vocabulary::compile(&config).unwrap();
        let info = |s| *vocab.operator(config.operator_id(s).unwrap()).unwrap();

        let assign = info("=").binary.unwrap();
        assert_eq!((assign.priority, assign.right_assoc), (1, true));
        let pow = info("**").binary.unwrap();
        assert!(pow.right_assoc);
        assert!(info("*").binary.unwrap().priority > info("+").binary.unwrap().priority);

        let minus = info("-");
        assert_eq!(minus.binary.map(|b| b.op), Some(BinaryOp::Sub));
        assert_eq!(minus.prefix, Some(UnaryOp::Neg));
        assert_eq!(info(";").punct, Some(Punct::Semi));
    }

    #[test]
    fn meaningless_words_are_config_errors() {
        let mut config = LexerConfig::default();
        config.keywords.push("unless".into());
        assert!(matches!(
            Vocabulary::compile(&config),
            Err(ConfigError::UnknownKeyword(w)) if w == "unless"
        ));

        let mut config = LexerConfig::default();
        config.operators.push(OperatorLine {
            right_assoc: false,
            ops: vec!["<>".into()],
        });
        assert!(matches!(
            Vocabulary::compile(&config),
            Err(ConfigError::UnknownOperator(s)) if s == "<>"
        ));
    }
}
