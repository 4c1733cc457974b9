mod table;

pub use table::{LexTable, SymbolRole};

use table::{DIGIT, ID_REST, ID_START, SPACE, STRING_DELIM, SYMBOL_PART, SYMBOL_START, UNIQUE_SYMBOL};

use crate::error::{LexError, LexErrorKind};
use crate::source::{PosId, SourceManager};
use crate::token::{Token, TokenKind, TokenValue};

/// Rest of an importer's line, parked while an imported unit is read.
struct Resume {
    line: Vec<char>,
    pos: usize,
    col_base: u32,
    more: bool,
}

/// Pulls characters line by line from the [`SourceManager`] and cuts them
/// into tokens. The current unit must already be open.
pub struct Lexer<'a> {
    sources: &'a mut SourceManager,
    table: &'a LexTable,
    line: Vec<char>,
    pos: usize,
    /// Columns drained from the front of `line` by continuations.
    col_base: u32,
    /// The reader holds more of the current line.
    more: bool,
    saved: Vec<Resume>,
    eof: Option<PosId>,
}

impl<'a> Lexer<'a> {
    pub fn new(sources: &'a mut SourceManager, table: &'a LexTable) -> Self {
        Self {
            sources,
            table,
            line: Vec::new(),
            pos: 0,
            col_base: 0,
            more: false,
            saved: Vec::new(),
            eof: None,
        }
    }

    pub fn line_of(&self, pos: PosId) -> u32 {
        self.sources.map().line_of(pos)
    }

    /// Opens `unit` on behalf of an import at `caller`. Tokens come from the
    /// new unit until its `EndOfUnit`, then the current line resumes.
    pub fn enter_unit(&mut self, unit: &str, caller: PosId) -> bool {
        if !self.sources.open_nested(unit, caller) {
            return false;
        }
        self.saved.push(Resume {
            line: std::mem::take(&mut self.line),
            pos: self.pos,
            col_base: self.col_base,
            more: self.more,
        });
        self.pos = 0;
        self.col_base = 0;
        self.more = false;
        true
    }

    /// Position of the next unread character.
    pub fn here(&mut self) -> PosId {
        let column = self.column();
        self.sources.current_position(column)
    }

    // --- character access ---

    fn column(&self) -> u32 {
        self.col_base + self.pos as u32 + 1
    }

    /// Loads the next physical line of the current unit.
    fn load_line(&mut self) -> bool {
        let max = self.table.config().max_line_chunk;
        let mut text = String::new();
        match self.sources.next_line(max, &mut text) {
            None => false,
            Some(more) => {
                self.line = text.chars().collect();
                if !more {
                    self.line.push('\n');
                }
                self.more = more;
                self.pos = 0;
                self.col_base = 0;
                true
            }
        }
    }

    /// Makes sure `n` characters past `pos` are loaded, pulling continuation
    /// pieces of an oversized line as needed.
    fn fill(&mut self, n: usize) {
        let max = self.table.config().max_line_chunk;
        while self.more && self.line.len() < self.pos + n {
            self.col_base += self.pos as u32;
            self.line.drain(..self.pos);
            self.pos = 0;
            let mut text = String::new();
            self.more = self.sources.continue_line(max, &mut text);
            self.line.extend(text.chars());
            if !self.more {
                self.line.push('\n');
            }
        }
    }

    fn peek_at(&mut self, k: usize) -> Option<char> {
        self.fill(k + 1);
        self.line.get(self.pos + k).copied()
    }

    fn peek(&mut self) -> Option<char> {
        self.peek_at(0)
    }

    fn take(&mut self, raw: &mut String) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        raw.push(c);
        Some(c)
    }

    fn is(&mut self, k: usize, flag: u16) -> bool {
        match self.peek_at(k) {
            Some(c) => self.table.has(c, flag),
            None => false,
        }
    }
}

impl Lexer<'_> {
    /// Next raw token, trivia included when the configuration retains it.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(pos) = self.eof {
            return Ok(Token::end(TokenKind::Eof, pos));
        }
        loop {
            let Some(c) = self.peek() else {
                if self.load_line() {
                    continue;
                }
                return Ok(self.end_of_unit());
            };
            if c == '\n' || self.table.has(c, SPACE) {
                if !self.table.config().keep_whitespace {
                    self.scan_whitespace();
                    continue;
                }
                let start = self.here();
                let raw = self.scan_whitespace();
                return Ok(Token::new(TokenKind::Whitespace, 0, TokenValue::None, raw, start));
            }
            let start = self.here();

            let class = self.table.class_of(c);
            if class & ID_START != 0 {
                return Ok(self.scan_word(start));
            }
            if class & DIGIT != 0 {
                return self.scan_number(start);
            }
            if class & STRING_DELIM != 0 {
                return self.scan_string(c, start);
            }
            if class & SYMBOL_START != 0 {
                match self.scan_symbol(c, class, start)? {
                    Some(token) => return Ok(token),
                    None => continue,
                }
            }
            return Err(LexError::new(
                LexErrorKind::UnexpectedCharacter(c),
                format!("unexpected character '{}'", c.escape_default()),
                start,
            ));
        }
    }

    fn end_of_unit(&mut self) -> Token {
        let pos = self.here();
        self.sources.close_current_unit();
        match self.saved.pop() {
            Some(resume) => {
                self.line = resume.line;
                self.pos = resume.pos;
                self.col_base = resume.col_base;
                self.more = resume.more;
                Token::end(TokenKind::EndOfUnit, pos)
            }
            None => {
                self.eof = Some(pos);
                Token::end(TokenKind::Eof, pos)
            }
        }
    }

    // --- scanners ---

    fn scan_whitespace(&mut self) -> String {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c != '\n' && !self.table.has(c, SPACE) {
                break;
            }
            self.take(&mut raw);
            if c == '\n' {
                break;
            }
        }
        raw
    }

    fn scan_word(&mut self, start: PosId) -> Token {
        let mut raw = String::new();
        self.take(&mut raw);
        while self.is(0, ID_REST) {
            self.take(&mut raw);
        }
        match self.table.keyword(&raw) {
            Some(id) => Token::new(TokenKind::Keyword, id, TokenValue::None, raw, start),
            None => {
                let name = raw.clone();
                Token::new(TokenKind::Identifier, 0, TokenValue::Text(name), raw, start)
            }
        }
    }

    fn scan_number(&mut self, start: PosId) -> Result<Token, LexError> {
        let formats = self.table.config().numbers;
        let bad = |msg: String| LexError::new(LexErrorKind::BadNumber, msg, start);
        let mut raw = String::new();

        let hex_prefix = formats.hex
            && self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x' | 'X'));
        if hex_prefix {
            self.take(&mut raw);
            self.take(&mut raw);
            let mut digits = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_hexdigit) {
                self.take(&mut raw);
                digits.push(c);
            }
            self.reject_suffix(&raw, start)?;
            let value = u64::from_str_radix(&digits, 16)
                .map_err(|_| bad(format!("bad hexadecimal number '{raw}'")))?;
            return Ok(Token::new(TokenKind::Number, 0, TokenValue::Int(value as i64), raw, start));
        }

        while self.is(0, DIGIT) {
            self.take(&mut raw);
        }
        let mut real = false;
        if formats.float {
            if self.peek() == Some('.') && self.is(1, DIGIT) {
                real = true;
                self.take(&mut raw);
                while self.is(0, DIGIT) {
                    self.take(&mut raw);
                }
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let signed = matches!(self.peek_at(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.is(digit_at, DIGIT) {
                    real = true;
                    for _ in 0..=digit_at {
                        self.take(&mut raw);
                    }
                    while self.is(0, DIGIT) {
                        self.take(&mut raw);
                    }
                }
            }
        }
        self.reject_suffix(&raw, start)?;

        if real {
            let value: f64 = raw
                .parse()
                .map_err(|_| bad(format!("bad real number '{raw}'")))?;
            return Ok(Token::new(TokenKind::Real, 0, TokenValue::Real(value), raw, start));
        }
        let octal = raw.len() > 1 && raw.starts_with('0');
        let value = if octal && formats.octal {
            i64::from_str_radix(&raw[1..], 8).map_err(|_| bad(format!("bad octal number '{raw}'")))?
        } else if formats.decimal {
            raw.parse::<i64>()
                .map_err(|_| bad(format!("integer '{raw}' is out of range")))?
        } else {
            return Err(bad(format!("decimal numbers are disabled: '{raw}'")));
        };
        Ok(Token::new(TokenKind::Number, 0, TokenValue::Int(value), raw, start))
    }

    /// `12abc` is one malformed number, not a number and a name.
    fn reject_suffix(&mut self, raw: &str, start: PosId) -> Result<(), LexError> {
        match self.peek() {
            Some(c) if self.table.has(c, ID_REST) => Err(LexError::new(
                LexErrorKind::BadNumber,
                format!("bad number '{raw}{c}...'"),
                start,
            )),
            _ => Ok(()),
        }
    }

    fn scan_string(&mut self, delimiter: char, start: PosId) -> Result<Token, LexError> {
        let Some(rule) = self.table.string_rule(delimiter).cloned() else {
            return Err(LexError::new(
                LexErrorKind::UnexpectedCharacter(delimiter),
                format!("unexpected character '{delimiter}'"),
                start,
            ));
        };
        let unterminated =
            || LexError::new(LexErrorKind::UnterminatedString, "unterminated string", start);
        let mut raw = String::new();
        let mut text = String::new();
        self.take(&mut raw);
        loop {
            let c = match self.take(&mut raw) {
                None | Some('\n') => return Err(unterminated()),
                Some(c) => c,
            };
            if c == delimiter {
                if rule.doubling && self.peek() == Some(delimiter) {
                    self.take(&mut raw);
                    text.push(delimiter);
                    continue;
                }
                break;
            }
            if c == '\\' && rule.escapes {
                let at = self.here();
                text.push(self.scan_escape(&mut raw, at)?);
                continue;
            }
            text.push(c);
        }
        Ok(Token::new(TokenKind::String, 0, TokenValue::Text(text), raw, start))
    }

    fn scan_escape(&mut self, raw: &mut String, at: PosId) -> Result<char, LexError> {
        let bad = |msg: &str| LexError::new(LexErrorKind::BadEscape, msg, at);
        let c = match self.peek() {
            None | Some('\n') => return Err(bad("dangling escape at end of line")),
            Some(c) => c,
        };
        self.take(raw);
        let value = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'v' => '\x0b',
            'f' => '\x0c',
            '0' => '\0',
            'x' => {
                let mut code = 0u32;
                for _ in 0..2 {
                    let digit = self.peek().and_then(|d| d.to_digit(16));
                    let Some(digit) = digit else {
                        return Err(bad("\\x needs two hexadecimal digits"));
                    };
                    self.take(raw);
                    code = code * 16 + digit;
                }
                char::from_u32(code).ok_or_else(|| bad("bad character code"))?
            }
            '\\' | '"' | '\'' => c,
            other => {
                return Err(bad(&format!("unknown escape '\\{other}'")));
            }
        };
        Ok(value)
    }

    /// Longest match against the symbol table. Comments that are not kept
    /// yield `None`.
    fn scan_symbol(&mut self, c: char, class: u16, start: PosId) -> Result<Option<Token>, LexError> {
        let mut candidate = String::new();
        candidate.push(c);
        if class & UNIQUE_SYMBOL == 0 {
            let longest = self.table.max_symbol_len();
            while candidate.len() < longest {
                match self.peek_at(candidate.len()) {
                    Some(next) if next.is_ascii() && self.table.has(next, SYMBOL_PART) => {
                        candidate.push(next)
                    }
                    _ => break,
                }
            }
        }
        let table = self.table;
        let mut found = None;
        for len in (1..=candidate.len()).rev() {
            if let Some(role) = table.find_symbol(&candidate[..len]) {
                found = Some((len, role));
                break;
            }
        }
        let Some((len, role)) = found else {
            return Err(LexError::new(
                LexErrorKind::UnexpectedCharacter(c),
                format!("unexpected character '{c}'"),
                start,
            ));
        };
        let mut raw = String::new();
        for _ in 0..len {
            self.take(&mut raw);
        }
        match role {
            SymbolRole::Operator(id) => Ok(Some(Token::new(
                TokenKind::Operator,
                *id,
                TokenValue::None,
                raw,
                start,
            ))),
            SymbolRole::LineComment => {
                let mut body = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.take(&mut raw);
                    body.push(c);
                }
                Ok(self.comment(body, raw, start))
            }
            SymbolRole::BlockComment(close) => {
                let body = self.scan_block_comment(close, &mut raw, start)?;
                Ok(self.comment(body, raw, start))
            }
        }
    }

    fn scan_block_comment(
        &mut self,
        close: &str,
        raw: &mut String,
        start: PosId,
    ) -> Result<String, LexError> {
        let close: Vec<char> = close.chars().collect();
        let mut body = String::new();
        loop {
            if self.peek().is_none() {
                if self.load_line() {
                    continue;
                }
                return Err(LexError::new(
                    LexErrorKind::UnterminatedComment,
                    "unterminated comment",
                    start,
                ));
            }
            let closes = (0..close.len()).all(|k| self.peek_at(k) == Some(close[k]));
            if closes {
                for _ in 0..close.len() {
                    self.take(raw);
                }
                return Ok(body);
            }
            if let Some(c) = self.take(raw) {
                body.push(c);
            }
        }
    }

    fn comment(&self, body: String, raw: String, start: PosId) -> Option<Token> {
        self.table
            .config()
            .keep_comments
            .then(|| Token::new(TokenKind::Comment, 0, TokenValue::Text(body), raw, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexerConfig;

    fn lex_with(config: &LexerConfig, text: &str) -> Result<Vec<Token>, LexError> {
        let table = LexTable::compile(config).unwrap();
        let mut sources = SourceManager::new();
        sources.add_buffer("t", text);
        assert!(sources.open("t"));
        let mut lexer = Lexer::new(&mut sources, &table);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            out.push(token);
            if done {
                return Ok(out);
            }
        }
    }

    /// Positions minted while lexing all of `text`.
    fn positions_for(text: &str) -> usize {
        let table = LexTable::compile(&LexerConfig::default()).unwrap();
        let mut sources = SourceManager::new();
        sources.add_buffer("t", text);
        assert!(sources.open("t"));
        let mut lexer = Lexer::new(&mut sources, &table);
        while lexer.next_token().unwrap().kind != TokenKind::Eof {}
        sources.map().positions().len()
    }

    fn lex(text: &str) -> Vec<Token> {
        lex_with(&LexerConfig::default(), text).unwrap()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn skipped_whitespace_mints_no_positions() {
        assert_eq!(
            positions_for("a b c"),
            positions_for("a        b\n\n\n   \t\n      c   \n\n")
        );
    }

    #[test]
    fn every_operator_is_one_token() {
        let config = LexerConfig::default();
        for (id, op) in config.operator_symbols().iter().enumerate() {
            let tokens = lex(op);
            assert_eq!(tokens.len(), 2, "operator {op}");
            assert_eq!(tokens[0].kind, TokenKind::Operator, "operator {op}");
            assert_eq!(tokens[0].id as usize, id, "operator {op}");
            assert_eq!(tokens[0].raw, *op);
        }
    }

    #[test]
    fn longest_match_backs_off() {
        let config = LexerConfig::default();
        let tokens = lex("a<<=b >>>c");
        let raws: Vec<&str> = tokens.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, ["a", "<<", "=", "b", ">>>", "c", ""]);
        assert_eq!(tokens[1].id, config.operator_id("<<").unwrap());
    }

    #[test]
    fn keywords_only_match_whole_words() {
        let config = LexerConfig::default();
        let tokens = lex("if iffy fi");
        assert!(tokens[0].is_keyword(config.keyword_id("if").unwrap()));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text(), "iffy");
        assert!(tokens[2].is_keyword(config.keyword_id("fi").unwrap()));
    }

    #[test]
    fn numbers_in_every_format() {
        let tokens = lex("42 0x1F 017 3.5 2e3 1.5E-2 7.size");
        let values: Vec<&TokenValue> = tokens.iter().map(|t| &t.value).collect();
        assert_eq!(values[0], &TokenValue::Int(42));
        assert_eq!(values[1], &TokenValue::Int(31));
        assert_eq!(values[2], &TokenValue::Int(15));
        assert_eq!(values[3], &TokenValue::Real(3.5));
        assert_eq!(values[4], &TokenValue::Real(2000.0));
        assert_eq!(values[5], &TokenValue::Real(0.015));
        assert_eq!(values[6], &TokenValue::Int(7));
        assert_eq!(tokens[7].raw, ".");
    }

    #[test]
    fn bad_numbers_are_lexical_errors() {
        let config = LexerConfig::default();
        for text in ["09", "12abc", "0x", "99999999999999999999"] {
            let err = lex_with(&config, text).unwrap_err();
            assert_eq!(err.kind, LexErrorKind::BadNumber, "{text}");
        }
    }

    #[test]
    fn strings_unescape() {
        let tokens = lex(r#""a\tb\x41" 'it''s'"#);
        assert_eq!(tokens[0].value, TokenValue::Text("a\tbA".into()));
        assert_eq!(tokens[1].value, TokenValue::Text("it's".into()));
        assert_eq!(tokens[1].raw, "'it''s'");
    }

    #[test]
    fn string_errors() {
        let config = LexerConfig::default();
        let err = lex_with(&config, "\"open\nx").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        let err = lex_with(&config, r#""\q""#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::BadEscape);
        let err = lex_with(&config, "\"dangling\\").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::BadEscape);
    }

    #[test]
    fn comments_are_trivia_unless_kept() {
        let tokens = lex("a // rest\n/* multi\nline */ b");
        assert_eq!(
            kinds(&tokens),
            [TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );

        let mut config = LexerConfig::default();
        config.keep_comments = true;
        let tokens = lex_with(&config, "a /* x\ny */ b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].value, TokenValue::Text(" x\ny ".into()));

        let err = lex_with(&config, "/* never closed").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn unknown_character_is_reported() {
        let err = lex_with(&LexerConfig::default(), "a $ b").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('$'));
    }

    #[test]
    fn long_lines_are_pulled_in_pieces() {
        let mut config = LexerConfig::default();
        config.max_line_chunk = 3;
        let tokens = lex_with(&config, "alpha>>>beta\nx").unwrap();
        let raws: Vec<&str> = tokens.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, ["alpha", ">>>", "beta", "x", ""]);
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let table = LexTable::compile(&LexerConfig::default()).unwrap();
        let mut sources = SourceManager::new();
        sources.add_buffer("t", "a\n  bb");
        sources.open("t");
        let mut lexer = Lexer::new(&mut sources, &table);
        lexer.next_token().unwrap();
        let bb = lexer.next_token().unwrap();
        assert_eq!(sources.map().location(bb.pos), "t:2:3");
    }

    #[test]
    fn nested_unit_resumes_the_importer_line() {
        let table = LexTable::compile(&LexerConfig::default()).unwrap();
        let mut sources = SourceManager::new();
        sources.add_buffer("main", "a b\nc");
        sources.add_buffer("lib", "x");
        sources.open("main");
        let mut lexer = Lexer::new(&mut sources, &table);
        let a = lexer.next_token().unwrap();
        assert!(lexer.enter_unit("lib", a.pos));
        assert!(!lexer.enter_unit("missing", a.pos));
        let mut seen = Vec::new();
        loop {
            let t = lexer.next_token().unwrap();
            if t.kind == TokenKind::Eof {
                break;
            }
            seen.push(if t.kind == TokenKind::EndOfUnit { "<end>".to_string() } else { t.raw });
        }
        assert_eq!(seen, ["x", "<end>", "b", "c"]);
    }
}
