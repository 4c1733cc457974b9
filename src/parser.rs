mod expr;
mod stmt;
mod top;
mod vocab;

pub use vocab::{BinaryInfo, Kw, OperatorInfo, Vocabulary};

use crate::analyzer::builtins::Builtins;
use crate::analyzer::scope::{SpaceId, SymbolTable};
use crate::analyzer::types::Type;
use crate::ast::{Ast, Block, NodeId, NodeKind, Punct};
use crate::config::ParserOptions;
use crate::diagnostic::{Diagnostic, Diagnostics, codes};
use crate::error::LexError;
use crate::lexer::Lexer;
use crate::source::PosId;
use crate::token::{Token, TokenKind};
use crate::token_stream::TokenStream;
use crate::utils::{Interner, Symbol};

/// Why a parse function gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSignal {
    /// Recoverable; the nearest statement list resynchronizes.
    Syntax,
    /// The lexer failed. Nothing after this point is parsed.
    Lexical,
    /// Error or warning ceiling reached.
    Stop,
}

pub type ParseResult<T> = Result<T, ParseSignal>;

/// Everything a finished parse hands over.
#[derive(Debug)]
pub struct ParseOutput {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub names: Interner,
    pub diagnostics: Diagnostics,
    pub main: SpaceId,
    /// Unit name and space of every module, the main unit first.
    pub modules: Vec<(String, SpaceId)>,
}

pub struct Parser<'a> {
    stream: TokenStream<'a>,
    vocab: &'a Vocabulary,
    builtins: &'a Builtins,
    ast: Ast,
    symbols: SymbolTable,
    names: Interner,
    diagnostics: Diagnostics,
    /// Space new declarations go into.
    space: SpaceId,
    /// Keywords that end one of the bodies being parsed.
    closers: Vec<Kw>,
    modules: Vec<(String, SpaceId)>,
    /// Units whose parse is in progress, for cycle detection.
    loading: Vec<String>,
    fatal: Option<ParseSignal>,
    nesting: usize,
    max_nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(
        lexer: Lexer<'a>,
        vocab: &'a Vocabulary,
        builtins: &'a Builtins,
        options: ParserOptions,
    ) -> Self {
        let mut names = Interner::new();
        let symbols = SymbolTable::new(names.intern("<global>"));
        let space = symbols.global();
        Self {
            stream: TokenStream::new(lexer),
            vocab,
            builtins,
            ast: Ast::new(),
            symbols,
            names,
            diagnostics: Diagnostics::new(options),
            space,
            closers: Vec::new(),
            modules: Vec::new(),
            loading: Vec::new(),
            fatal: None,
            nesting: 0,
            max_nesting: options.max_nesting,
        }
    }

    // --- token access ---

    fn lexical(&mut self, err: LexError) -> ParseSignal {
        log::debug!("lexical error: {}", err.message);
        self.diagnostics.push(Diagnostic::from_lex(&err));
        self.fatal = Some(ParseSignal::Lexical);
        ParseSignal::Lexical
    }

    pub(crate) fn peek(&mut self) -> ParseResult<Token> {
        if let Some(signal) = self.fatal {
            return Err(signal);
        }
        self.stream.peek().cloned().map_err(|e| self.lexical(e))
    }

    pub(crate) fn peek_second(&mut self) -> ParseResult<Token> {
        if let Some(signal) = self.fatal {
            return Err(signal);
        }
        self.stream.peek_second().cloned().map_err(|e| self.lexical(e))
    }

    pub(crate) fn advance(&mut self) -> ParseResult<Token> {
        if let Some(signal) = self.fatal {
            return Err(signal);
        }
        self.stream.next().map_err(|e| self.lexical(e))
    }

    pub(crate) fn kw(&self, token: &Token) -> Option<Kw> {
        match token.kind {
            TokenKind::Keyword => self.vocab.keyword(token.id),
            _ => None,
        }
    }

    pub(crate) fn op(&self, token: &Token) -> Option<OperatorInfo> {
        match token.kind {
            TokenKind::Operator => self.vocab.operator(token.id).copied(),
            _ => None,
        }
    }

    pub(crate) fn punct(&self, token: &Token) -> Option<Punct> {
        self.op(token).and_then(|info| info.punct)
    }

    pub(crate) fn check_kw(&mut self, kw: Kw) -> ParseResult<bool> {
        let token = self.peek()?;
        Ok(self.kw(&token) == Some(kw))
    }

    pub(crate) fn check_punct(&mut self, punct: Punct) -> ParseResult<bool> {
        let token = self.peek()?;
        Ok(self.punct(&token) == Some(punct))
    }

    pub(crate) fn match_kw(&mut self, kw: Kw) -> ParseResult<bool> {
        if self.check_kw(kw)? {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn match_punct(&mut self, punct: Punct) -> ParseResult<bool> {
        if self.check_punct(punct)? {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn expect_kw(&mut self, kw: Kw) -> ParseResult<Token> {
        let token = self.peek()?;
        if self.kw(&token) == Some(kw) {
            return self.advance();
        }
        Err(self.unexpected(&token, &format!("'{}'", kw.word())))
    }

    pub(crate) fn expect_punct(&mut self, punct: Punct) -> ParseResult<Token> {
        let token = self.peek()?;
        if self.punct(&token) == Some(punct) {
            return self.advance();
        }
        Err(self.unexpected(&token, &format!("'{}'", punct.symbol())))
    }

    pub(crate) fn expect_ident(&mut self, what: &str) -> ParseResult<(Symbol, Token)> {
        let token = self.peek()?;
        if token.kind != TokenKind::Identifier {
            return Err(self.unexpected(&token, what));
        }
        self.advance()?;
        let name = self.names.intern(token.text());
        Ok((name, token))
    }

    /// Whether `token` ends the statement list being parsed.
    fn closes_body(&self, token: &Token) -> bool {
        token.is_end() || self.kw(token).is_some_and(|kw| self.closers.contains(&kw))
    }

    // --- diagnostics ---

    /// Records a diagnostic that does not interrupt parsing.
    pub(crate) fn report(&mut self, diag: Diagnostic) -> ParseResult<()> {
        if self.diagnostics.push(diag) {
            Ok(())
        } else {
            self.fatal = Some(ParseSignal::Stop);
            Err(ParseSignal::Stop)
        }
    }

    /// Records a syntax error and returns the signal to unwind with.
    pub(crate) fn syntax(&mut self, code: u16, message: String, pos: PosId) -> ParseSignal {
        match self.report(Diagnostic::error(code, message, pos)) {
            Ok(()) => ParseSignal::Syntax,
            Err(signal) => signal,
        }
    }

    pub(crate) fn unexpected(&mut self, found: &Token, expected: &str) -> ParseSignal {
        let code = if found.is_end() {
            codes::EXPECTED
        } else {
            codes::UNEXPECTED_TOKEN
        };
        self.syntax(code, format!("expected {expected}, found {found}"), found.pos)
    }

    /// Skips to the next statement boundary: past a `;`, or up to a
    /// closing keyword of an open body or the end of the unit.
    fn synchronize(&mut self) -> ParseResult<()> {
        loop {
            let token = self.peek()?;
            if self.closes_body(&token) {
                break;
            }
            self.advance()?;
            if self.punct(&token) == Some(Punct::Semi) {
                break;
            }
        }
        log::debug!("resynchronized before {}", self.peek()?);
        Ok(())
    }

    // --- nesting ---

    /// Enters one more nesting level. Past the configured limit the parse
    /// stops.
    pub(crate) fn deeper(&mut self, pos: PosId) -> ParseResult<()> {
        if self.nesting >= self.max_nesting {
            let message = format!("nesting deeper than {} levels", self.max_nesting);
            self.report(Diagnostic::error(codes::NESTING_TOO_DEEP, message, pos))?;
            self.fatal = Some(ParseSignal::Stop);
            return Err(ParseSignal::Stop);
        }
        self.nesting += 1;
        Ok(())
    }

    /// Runs `f` one nesting level deeper.
    pub(crate) fn nested<T>(
        &mut self,
        pos: PosId,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.deeper(pos)?;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    /// Runs `f` and drops whatever nesting it entered on the way.
    pub(crate) fn unnesting<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let outer = self.nesting;
        let result = f(self);
        self.nesting = outer;
        result
    }

    // --- scopes ---

    /// Runs `f` with `closers` ending the bodies it parses and with a body
    /// opened in the current space. Variables declared inside retire at the
    /// line of the token that ends the body.
    pub(crate) fn with_body<T>(
        &mut self,
        closers: &[Kw],
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let pos = self.stream.here();
        self.deeper(pos)?;
        let depth = self.closers.len();
        self.closers.extend_from_slice(closers);
        self.symbols.open_body(self.space);
        let result = f(self);
        self.nesting -= 1;
        let end = self.stream.here();
        let line = self.stream.line_of(end);
        self.symbols.close_body(line);
        self.closers.truncate(depth);
        result
    }

    pub(crate) fn with_space<T>(
        &mut self,
        space: SpaceId,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = std::mem::replace(&mut self.space, space);
        let result = f(self);
        self.space = saved;
        result
    }

    /// Type named by an identifier token: a built-in class or a visible
    /// user class.
    pub(crate) fn type_named(&mut self, token: &Token) -> Option<Type> {
        if token.kind != TokenKind::Identifier {
            return None;
        }
        if let Some(ty) = self.builtins.class(token.text()) {
            return Some(ty);
        }
        let name = self.names.get(token.text())?;
        self.symbols.lookup_class(self.space, name).map(Type::Class)
    }

    // --- statement lists ---

    /// Parses statements until a closing keyword or the end of the unit,
    /// recovering from syntax errors along the way.
    fn collect_statements(&mut self, stmts: &mut Vec<NodeId>) -> ParseResult<()> {
        loop {
            let token = self.peek()?;
            if self.closes_body(&token) {
                return Ok(());
            }
            if self.punct(&token) == Some(Punct::Semi) {
                self.advance()?;
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(ParseSignal::Syntax) => self.synchronize()?,
                Err(signal) => return Err(signal),
            }
        }
    }

    pub(crate) fn parse_stmt_list(&mut self) -> ParseResult<NodeId> {
        let pos = self.stream.here();
        let mut stmts = Vec::new();
        self.collect_statements(&mut stmts)?;
        Ok(self.ast.add(NodeKind::Block(Block), stmts, pos))
    }

    /// Parses the main unit. Whatever was parsed before a fatal error is
    /// kept.
    pub fn parse_program(mut self, unit: &str) -> ParseOutput {
        let global = self.symbols.global();
        self.loading.push(unit.to_string());
        self.modules.push((unit.to_string(), global));

        let pos = self.stream.here();
        let mut stmts = Vec::new();
        if let Err(signal) = self.collect_statements(&mut stmts) {
            log::debug!("parse of '{unit}' ended early: {signal:?}");
        }
        let body = self.ast.add(NodeKind::Block(Block), stmts, pos);
        self.symbols.space_mut(global).body = Some(body);
        self.loading.pop();

        ParseOutput {
            ast: self.ast,
            symbols: self.symbols,
            names: self.names,
            diagnostics: self.diagnostics,
            main: global,
            modules: self.modules,
        }
    }
}
