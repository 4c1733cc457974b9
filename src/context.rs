use crate::analyzer::builtins::Builtins;
use crate::config::{EngineConfig, LexerConfig};
use crate::error::ConfigError;
use crate::lexer::LexTable;
use crate::parser::Vocabulary;

/// The compiled lexer table plus the parser's reading of it.
#[derive(Debug)]
pub struct Language {
    pub table: LexTable,
    pub vocab: Vocabulary,
}

impl Language {
    pub fn compile(config: &LexerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            table: LexTable::compile(config)?,
            vocab: Vocabulary::compile(config)?,
        })
    }
}

/// Everything built once per engine and shared by every parse and run.
#[derive(Debug)]
pub struct Context {
    pub config: EngineConfig,
    pub language: Language,
    pub builtins: Builtins,
}

impl Context {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let language = Language::compile(&config.lexer)?;
        log::debug!(
            "compiled language: {} keywords, {} operator symbols",
            config.lexer.keywords.len(),
            config.lexer.operator_symbols().len()
        );
        Ok(Self {
            config,
            language,
            builtins: Builtins::new(),
        })
    }
}
