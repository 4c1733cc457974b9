use std::collections::VecDeque;

use crate::error::LexError;
use crate::lexer::Lexer;
use crate::source::PosId;
use crate::token::{Token, TokenKind};

/// Non-trivial tokens with two tokens of lookahead and two of undo.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    ahead: VecDeque<Token>,
    /// Most recently consumed last.
    behind: VecDeque<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            ahead: VecDeque::with_capacity(2),
            behind: VecDeque::with_capacity(2),
        }
    }

    fn pull(&mut self) -> Result<Token, LexError> {
        loop {
            let token = self.lexer.next_token()?;
            if !token.kind.is_trivia() {
                return Ok(token);
            }
        }
    }

    fn fill(&mut self, n: usize) -> Result<(), LexError> {
        while self.ahead.len() <= n {
            let token = self.pull()?;
            self.ahead.push_back(token);
        }
        Ok(())
    }

    pub fn peek(&mut self) -> Result<&Token, LexError> {
        self.fill(0)?;
        Ok(&self.ahead[0])
    }

    pub fn peek_second(&mut self) -> Result<&Token, LexError> {
        self.fill(1)?;
        Ok(&self.ahead[1])
    }

    pub fn next(&mut self) -> Result<Token, LexError> {
        self.fill(0)?;
        let token = match self.ahead.pop_front() {
            Some(token) => token,
            None => Token::end(TokenKind::Eof, self.lexer.here()),
        };
        if self.behind.len() == 2 {
            self.behind.pop_front();
        }
        self.behind.push_back(token.clone());
        Ok(token)
    }

    /// Puts the last consumed token back. Returns `false` when there is
    /// nothing left to undo.
    pub fn undo(&mut self) -> bool {
        match self.behind.pop_back() {
            Some(token) => {
                self.ahead.push_front(token);
                true
            }
            None => false,
        }
    }

    pub fn undo_twice(&mut self) -> bool {
        self.undo() && self.undo()
    }

    /// Copy of the last consumed token, for callers that need it after
    /// further advances.
    pub fn save_last(&self) -> Option<Token> {
        self.behind.back().cloned()
    }

    /// Splices `unit` in right after the last consumed token.
    pub fn enter_unit(&mut self, unit: &str, caller: PosId) -> bool {
        debug_assert!(self.ahead.is_empty(), "unit entered with lookahead pending");
        self.lexer.enter_unit(unit, caller)
    }

    pub fn line_of(&self, pos: PosId) -> u32 {
        self.lexer.line_of(pos)
    }

    pub fn here(&mut self) -> PosId {
        match self.ahead.front() {
            Some(token) => token.pos,
            None => self.lexer.here(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexerConfig;
    use crate::lexer::LexTable;
    use crate::source::SourceManager;

    fn with_stream(text: &str, keep_comments: bool, f: impl FnOnce(&mut TokenStream)) {
        let mut config = LexerConfig::default();
        config.keep_comments = keep_comments;
        let table = LexTable::compile(&config).unwrap();
        let mut sources = SourceManager::new();
        sources.add_buffer("t", text);
        sources.open("t");
        let mut stream = TokenStream::new(Lexer::new(&mut sources, &table));
        f(&mut stream);
    }

    #[test]
    fn undo_returns_the_identical_token() {
        with_stream("x = 42;", false, |stream| {
            let first = stream.next().unwrap();
            assert!(stream.undo());
            let again = stream.next().unwrap();
            assert_eq!(first, again);
        });
    }

    #[test]
    fn undo_twice_restores_order() {
        with_stream("a b c", false, |stream| {
            let a = stream.next().unwrap();
            let b = stream.next().unwrap();
            assert!(stream.undo_twice());
            assert_eq!(stream.peek().unwrap(), &a);
            assert_eq!(stream.peek_second().unwrap(), &b);
            assert_eq!(stream.next().unwrap(), a);
            assert_eq!(stream.next().unwrap(), b);
            assert_eq!(stream.next().unwrap().raw, "c");
            assert_eq!(stream.save_last().unwrap().raw, "c");
        });
    }

    #[test]
    fn undo_is_bounded() {
        with_stream("a", false, |stream| {
            assert!(!stream.undo());
            stream.next().unwrap();
            assert!(stream.undo());
            assert!(!stream.undo());
        });
    }

    #[test]
    fn trivia_never_reaches_the_parser() {
        with_stream("a /* c */ b // d", true, |stream| {
            assert_eq!(stream.next().unwrap().raw, "a");
            assert_eq!(stream.next().unwrap().raw, "b");
            assert_eq!(stream.next().unwrap().kind, TokenKind::Eof);
            assert_eq!(stream.next().unwrap().kind, TokenKind::Eof);
        });
    }
}
