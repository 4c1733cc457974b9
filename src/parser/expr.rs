use super::{Kw, ParseResult, Parser};
use crate::ast::*;
use crate::diagnostic::{Diagnostic, codes};
use crate::token::{Token, TokenKind, TokenValue};

impl<'a> Parser<'a> {
    /// Precedence climbing over the right spine of the tree built so far:
    /// each new operator descends the spine past every node that binds
    /// looser (or equally loose, for right-associative lines), takes that
    /// node's right operand as its own left operand, and takes its place.
    ///
    /// Every sub-expression and every operator of the chain counts as one
    /// nesting level, so the depth of the resulting tree stays bounded.
    pub(crate) fn parse_expr(&mut self) -> ParseResult<NodeId> {
        self.unnesting(Self::climb)
    }

    fn climb(&mut self) -> ParseResult<NodeId> {
        let first = self.peek()?;
        self.deeper(first.pos)?;
        let mut root = self.parse_unary()?;
        let mut spine: Vec<(NodeId, u8)> = Vec::new();

        loop {
            let token = self.peek()?;
            let Some(info) = self.op(&token).and_then(|info| info.binary) else {
                break;
            };
            self.advance()?;
            self.deeper(token.pos)?;
            let rhs = self.parse_unary()?;

            let prio = info.priority;
            let split = spine
                .iter()
                .position(|&(_, p)| !(p < prio || (p == prio && info.right_assoc)))
                .unwrap_or(spine.len());

            let parent = split.checked_sub(1).map(|i| spine[i].0);
            let lhs = match parent {
                None => root,
                Some(parent) => self.ast.children(parent)[1],
            };
            let node = self.ast.add(
                NodeKind::Binary(BinaryExpr { op: info.op }),
                vec![lhs, rhs],
                token.pos,
            );
            match parent {
                None => root = node,
                Some(parent) => self.ast.node_mut(parent).children[1] = node,
            }
            spine.truncate(split);
            spine.push((node, prio));
        }
        Ok(root)
    }

    pub(crate) fn match_binary(&mut self, op: BinaryOp) -> ParseResult<bool> {
        let token = self.peek()?;
        if self.op(&token).and_then(|info| info.binary).map(|b| b.op) == Some(op) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn parse_unary(&mut self) -> ParseResult<NodeId> {
        let token = self.peek()?;
        if let Some(op) = self.op(&token).and_then(|info| info.prefix) {
            self.advance()?;
            let operand = self.nested(token.pos, Self::parse_unary)?;
            return Ok(self.ast.add(NodeKind::Unary(UnaryExpr { op }), vec![operand], token.pos));
        }
        let operand = self.parse_operand()?;
        self.parse_postfix(operand)
    }

    fn parse_operand(&mut self) -> ParseResult<NodeId> {
        let token = self.peek()?;
        let literal = match (token.kind, &token.value) {
            (TokenKind::Number, TokenValue::Int(n)) => Some(Literal::Int(*n)),
            (TokenKind::Real, TokenValue::Real(x)) => Some(Literal::Float(*x)),
            (TokenKind::String, _) => Some(Literal::Str(token.text().to_string())),
            (TokenKind::Keyword, _) => match self.kw(&token) {
                Some(Kw::True) => Some(Literal::Bool(true)),
                Some(Kw::False) => Some(Literal::Bool(false)),
                _ => None,
            },
            _ => None,
        };
        if let Some(value) = literal {
            self.advance()?;
            return Ok(self.constant(value, &token));
        }

        if token.kind == TokenKind::Identifier {
            return self.parse_name_operand();
        }

        match self.punct(&token) {
            Some(Punct::LParen) => {
                self.advance()?;
                let inner = self.parse_expr()?;
                self.expect_punct(Punct::RParen)?;
                Ok(inner)
            }
            Some(Punct::LBracket) => {
                self.advance()?;
                let items = self.parse_list(Punct::RBracket)?;
                Ok(self.ast.add(NodeKind::ListLiteral(ListLiteral), items, token.pos))
            }
            Some(Punct::LBrace) => {
                self.advance()?;
                let mut entries = Vec::new();
                if !self.match_punct(Punct::RBrace)? {
                    loop {
                        entries.push(self.parse_expr()?);
                        self.expect_punct(Punct::Colon)?;
                        entries.push(self.parse_expr()?);
                        if !self.match_punct(Punct::Comma)? {
                            break;
                        }
                    }
                    self.expect_punct(Punct::RBrace)?;
                }
                Ok(self.ast.add(NodeKind::MapLiteral(MapLiteral), entries, token.pos))
            }
            _ => Err(self.unexpected(&token, "an expression")),
        }
    }

    /// Variable, call or `TypeName(expr)` conversion.
    fn parse_name_operand(&mut self) -> ParseResult<NodeId> {
        let token = self.peek()?;
        let followed_by_paren = {
            let second = self.peek_second()?;
            self.punct(&second) == Some(Punct::LParen)
        };

        if followed_by_paren {
            if let Some(to) = self.type_named(&token) {
                self.advance()?;
                self.advance()?;
                let value = self.parse_expr()?;
                self.expect_punct(Punct::RParen)?;
                let node = Conversion { to, implicit: false };
                return Ok(self.ast.add(NodeKind::Convert(node), vec![value], token.pos));
            }
            let (name, _) = self.expect_ident("a name")?;
            self.advance()?;
            let args = self.parse_list(Punct::RParen)?;
            let call = CallExpr {
                name,
                site: self.space,
                target: CallTarget::Unresolved,
            };
            return Ok(self.ast.add(NodeKind::Call(call), args, token.pos));
        }

        let (name, _) = self.expect_ident("a name")?;
        if let Some(var) = self.symbols.lookup_var(self.space, name) {
            let addr = self.symbols.address(self.space, var);
            return Ok(self.ast.add(NodeKind::Name(NameRef { var, addr }), Vec::new(), token.pos));
        }

        let retired = self.symbols.retired_var(self.space, name);
        let diag = match retired.map(|v| self.symbols.var(v)) {
            Some(old) => Diagnostic::error(
                codes::UNDEFINED,
                format!(
                    "'{}' is not defined here; it went out of scope at line {}",
                    token.text(),
                    old.retired_at.unwrap_or_default()
                ),
                token.pos,
            )
            .with_related(old.pos),
            None => Diagnostic::error(codes::UNDEFINED, format!("'{}' is not defined", token.text()), token.pos),
        };
        self.report(diag)?;
        Ok(self.constant(Literal::Undefined, &token))
    }

    /// `.field`, `.member(args)`, `[index]`, `++`, `--`.
    fn parse_postfix(&mut self, mut object: NodeId) -> ParseResult<NodeId> {
        loop {
            let token = self.peek()?;
            let Some(info) = self.op(&token) else {
                return Ok(object);
            };
            match info.punct {
                Some(Punct::Dot) => {
                    self.advance()?;
                    let (name, _) = self.expect_ident("a member name")?;
                    if self.match_punct(Punct::LParen)? {
                        let mut children = vec![object];
                        children.extend(self.parse_list(Punct::RParen)?);
                        let call = MemberCall { name, member: None };
                        object = self.ast.add(NodeKind::MemberCall(call), children, token.pos);
                    } else {
                        let field = FieldAccess {
                            name,
                            property: None,
                        };
                        object = self.ast.add(NodeKind::Field(field), vec![object], token.pos);
                    }
                    continue;
                }
                Some(Punct::LBracket) => {
                    self.advance()?;
                    let index = self.parse_expr()?;
                    self.expect_punct(Punct::RBracket)?;
                    object = self.ast.add(NodeKind::Index(IndexAccess), vec![object, index], token.pos);
                    continue;
                }
                _ => {}
            }
            match info.postfix {
                Some(op) => {
                    self.advance()?;
                    object = self.ast.add(NodeKind::Unary(UnaryExpr { op }), vec![object], token.pos);
                }
                None => return Ok(object),
            }
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: Punct) -> ParseResult<Vec<NodeId>> {
        let mut items = Vec::new();
        if self.match_punct(close)? {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if !self.match_punct(Punct::Comma)? {
                break;
            }
        }
        self.expect_punct(close)?;
        Ok(items)
    }

    fn constant(&mut self, value: Literal, token: &Token) -> NodeId {
        self.ast.add(NodeKind::Constant(Constant { value }), Vec::new(), token.pos)
    }
}
