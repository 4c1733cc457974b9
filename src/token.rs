use crate::source::PosId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of all input.
    Eof,
    /// End of an imported unit; input continues in the importer.
    EndOfUnit,
    Identifier,
    Keyword,
    Operator,
    /// Integer literal.
    Number,
    /// Floating literal.
    Real,
    String,
    Comment,
    Whitespace,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::EndOfUnit => "end of unit",
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::Operator => "operator",
            TokenKind::Number => "number",
            TokenKind::Real => "real number",
            TokenKind::String => "string",
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
        }
    }

    /// Whitespace and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Whitespace)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Int(i64),
    Real(f64),
    /// Identifier name, unescaped string contents or comment text.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Keyword or operator id, 0 otherwise.
    pub id: u16,
    pub value: TokenValue,
    /// Exact source text.
    pub raw: String,
    pub pos: PosId,
}

impl Token {
    pub fn new(kind: TokenKind, id: u16, value: TokenValue, raw: String, pos: PosId) -> Self {
        Self {
            kind,
            id,
            value,
            raw,
            pos,
        }
    }

    pub fn end(kind: TokenKind, pos: PosId) -> Self {
        Self::new(kind, 0, TokenValue::None, String::new(), pos)
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, TokenKind::Eof | TokenKind::EndOfUnit)
    }

    pub fn is_operator(&self, id: u16) -> bool {
        self.kind == TokenKind::Operator && self.id == id
    }

    pub fn is_keyword(&self, id: u16) -> bool {
        self.kind == TokenKind::Keyword && self.id == id
    }

    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Text(s) => s,
            _ => &self.raw,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof | TokenKind::EndOfUnit => write!(f, "{}", self.kind.as_str()),
            _ => write!(f, "'{}'", self.raw),
        }
    }
}
