use super::{Kw, ParseResult, ParseSignal, Parser};
use crate::analyzer::scope::{SpaceKind, VarMode};
use crate::analyzer::types::Type;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, codes};
use crate::token::{TokenKind, TokenValue};

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<NodeId> {
        let token = self.peek()?;
        match self.kw(&token) {
            Some(Kw::If) => self.parse_if(),
            Some(Kw::While) => self.parse_while(),
            Some(Kw::Repeat) => self.parse_repeat(),
            Some(Kw::For) => self.parse_for(),
            Some(Kw::Method) => self.parse_method_def(),
            Some(Kw::Class) => self.parse_class_def(),
            Some(Kw::Import) => self.parse_import(),
            Some(Kw::Return) => self.simple(Self::parse_return),
            Some(Kw::Leave | Kw::Continue) => self.simple(Self::parse_jump),
            Some(Kw::Const) => {
                self.advance()?;
                self.simple(|p| p.parse_var_def(VarMode::Const))
            }
            Some(Kw::Lazy) => {
                self.advance()?;
                self.simple(|p| p.parse_var_def(VarMode::Lazy))
            }
            Some(Kw::True | Kw::False) | None => {
                if self.starts_var_def()? {
                    self.simple(|p| p.parse_var_def(VarMode::Plain))
                } else {
                    self.simple(Self::parse_expr_stmt)
                }
            }
            Some(_) => Err(self.unexpected(&token, "a statement")),
        }
    }

    /// Runs `f` and requires the `;` terminator, which may be left out
    /// directly before a closing keyword or the end of the unit.
    fn simple(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<NodeId>) -> ParseResult<NodeId> {
        let stmt = f(self)?;
        let token = self.peek()?;
        if self.punct(&token) == Some(Punct::Semi) {
            self.advance()?;
        } else if !self.closes_body(&token) {
            return Err(self.unexpected(&token, "';'"));
        }
        Ok(stmt)
    }

    /// `TypeName name ...`
    pub(crate) fn starts_var_def(&mut self) -> ParseResult<bool> {
        let first = self.peek()?;
        if first.kind != TokenKind::Identifier {
            return Ok(false);
        }
        let second = self.peek_second()?;
        Ok(second.kind == TokenKind::Identifier && self.type_named(&first).is_some())
    }

    fn parse_expr_stmt(&mut self) -> ParseResult<NodeId> {
        let expr = self.parse_expr()?;
        let pos = self.ast.pos(expr);
        Ok(self.ast.add(NodeKind::ExprStmt(ExprStmt), vec![expr], pos))
    }

    /// `TypeName a [= e], b [= e] ...` after any `const` / `lazy`.
    pub(crate) fn parse_var_def(&mut self, mode: VarMode) -> ParseResult<NodeId> {
        let type_token = self.peek()?;
        let Some(ty) = self.type_named(&type_token) else {
            return Err(self.unexpected(&type_token, "a type name"));
        };
        self.advance()?;

        let mut defs = Vec::new();
        loop {
            let (name, token) = self.expect_ident("a variable name")?;
            let mut init = if self.match_binary(BinaryOp::Assign)? {
                Some(self.parse_expr()?)
            } else {
                None
            };
            if init.is_some() && self.symbols.space(self.space).kind == SpaceKind::Class {
                self.report(Diagnostic::warning(
                    codes::IGNORED_INITIALIZER,
                    format!("initializer of field '{}' is ignored", token.text()),
                    token.pos,
                ))?;
                init = None;
            }
            if mode != VarMode::Plain && init.is_none() {
                let word = if mode == VarMode::Const { "const" } else { "lazy" };
                self.report(Diagnostic::error(
                    codes::MISSING_INITIALIZER,
                    format!("{word} variable '{}' needs an initializer", token.text()),
                    token.pos,
                ))?;
            }
            if ty == Type::Void {
                self.report(Diagnostic::error(
                    codes::TYPE_MISMATCH,
                    format!("variable '{}' cannot have type Void", token.text()),
                    token.pos,
                ))?;
            }

            match self.symbols.declare_var(self.space, name, ty, mode, token.pos) {
                Ok(var) => {
                    let addr = self.symbols.address(self.space, var);
                    let children = init.into_iter().collect();
                    defs.push(self.ast.add(NodeKind::VarDef(VarDef { var, addr }), children, token.pos));
                }
                Err(prev) => {
                    let first = self.symbols.var(prev).pos;
                    self.report(
                        Diagnostic::error(
                            codes::DUPLICATE,
                            format!("variable '{}' is already defined in this body", token.text()),
                            token.pos,
                        )
                        .with_related(first),
                    )?;
                }
            }

            if !self.match_punct(Punct::Comma)? {
                break;
            }
        }

        if defs.len() == 1 {
            return Ok(defs[0]);
        }
        Ok(self.ast.add(NodeKind::Block(Block), defs, type_token.pos))
    }

    fn parse_if(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let mut children = Vec::new();
        loop {
            children.push(self.parse_expr()?);
            self.expect_kw(Kw::Then)?;
            children.push(self.with_body(&[Kw::Elif, Kw::Else, Kw::Fi], Self::parse_stmt_list)?);
            if !self.match_kw(Kw::Elif)? {
                break;
            }
        }
        let has_else = self.match_kw(Kw::Else)?;
        if has_else {
            children.push(self.with_body(&[Kw::Fi], Self::parse_stmt_list)?);
        }
        self.expect_kw(Kw::Fi)?;
        Ok(self.ast.add(NodeKind::If(IfStmt { has_else }), children, start.pos))
    }

    fn parse_while(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let cond = self.parse_expr()?;
        self.expect_kw(Kw::Do)?;
        let body = self.with_body(&[Kw::Od], Self::parse_stmt_list)?;
        self.expect_kw(Kw::Od)?;
        Ok(self.ast.add(NodeKind::While(WhileLoop), vec![cond, body], start.pos))
    }

    fn parse_repeat(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let body = self.with_body(&[Kw::Until], Self::parse_stmt_list)?;
        self.expect_kw(Kw::Until)?;
        let cond = self.parse_expr()?;
        Ok(self.ast.add(NodeKind::Repeat(RepeatLoop), vec![body, cond], start.pos))
    }

    /// `for [i] from a to b [step s] do ... od` or `for x in e do ... od`.
    fn parse_for(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let var = if self.peek()?.kind == TokenKind::Identifier {
            Some(self.expect_ident("a loop variable")?)
        } else {
            None
        };

        if self.match_kw(Kw::In)? {
            let Some((name, token)) = var else {
                let found = self.peek()?;
                return Err(self.unexpected(&found, "a loop variable"));
            };
            let iterable = self.parse_expr()?;
            self.expect_kw(Kw::Do)?;
            let (declared, body) = self.with_body(&[Kw::Od], |p| {
                let declared = p.symbols.declare_var(p.space, name, Type::Any, VarMode::Plain, token.pos);
                Ok((declared, p.parse_stmt_list()?))
            })?;
            self.expect_kw(Kw::Od)?;
            let Ok(var) = declared else {
                return Err(ParseSignal::Syntax);
            };
            let addr = self.symbols.address(self.space, var);
            let node = IteratedFor { var, addr };
            return Ok(self.ast.add(NodeKind::IteratedFor(node), vec![iterable, body], start.pos));
        }

        self.expect_kw(Kw::From)?;
        let mut children = vec![self.parse_expr()?];
        self.expect_kw(Kw::To)?;
        children.push(self.parse_expr()?);
        let has_step = self.match_kw(Kw::Step)?;
        if has_step {
            children.push(self.parse_expr()?);
        }
        self.expect_kw(Kw::Do)?;
        let (counter, body) = self.with_body(&[Kw::Od], |p| {
            let counter = match var {
                Some((name, token)) => p
                    .symbols
                    .declare_var(p.space, name, Type::Int, VarMode::Plain, token.pos)
                    .ok()
                    .map(|v| (v, p.symbols.address(p.space, v))),
                None => None,
            };
            Ok((counter, p.parse_stmt_list()?))
        })?;
        self.expect_kw(Kw::Od)?;
        children.push(body);
        let node = CountedFor {
            var: counter,
            has_step,
        };
        Ok(self.ast.add(NodeKind::CountedFor(node), children, start.pos))
    }

    fn parse_return(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let next = self.peek()?;
        let children = if self.closes_body(&next) || self.punct(&next) == Some(Punct::Semi) {
            Vec::new()
        } else {
            vec![self.parse_expr()?]
        };
        Ok(self.ast.add(NodeKind::Return(Return), children, start.pos))
    }

    /// `leave [n]` / `continue [n]`.
    fn parse_jump(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let next = self.peek()?;
        let depth = match (next.kind, &next.value) {
            (TokenKind::Number, TokenValue::Int(n)) => {
                self.advance()?;
                match u32::try_from(*n) {
                    Ok(n) if n >= 1 => n,
                    _ => {
                        let message = format!("loop count must be at least 1, found {n}");
                        return Err(self.syntax(codes::UNEXPECTED_TOKEN, message, next.pos));
                    }
                }
            }
            _ => 1,
        };
        let kind = if self.kw(&start) == Some(Kw::Leave) {
            NodeKind::Leave(Leave { depth })
        } else {
            NodeKind::Continue(Continue { depth })
        };
        Ok(self.ast.add(kind, Vec::new(), start.pos))
    }
}
