use super::{Kw, ParseResult, Parser};
use crate::analyzer::scope::{Method, SpaceId, SpaceKind, VarMode};
use crate::analyzer::types::Type;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, codes};
use crate::source::PosId;
use crate::token::{Token, TokenKind};

impl<'a> Parser<'a> {
    /// `method [TypeName] name(TypeName a, ...) do ... od`
    pub(crate) fn parse_method_def(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let ret = if self.peek_second()?.kind == TokenKind::Identifier {
            let token = self.peek()?;
            let ty = self.resolve_type(&token)?;
            self.advance()?;
            ty
        } else {
            Type::Void
        };
        let (name, name_token) = self.expect_ident("a method name")?;

        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();
        if !self.check_punct(Punct::RParen)? {
            loop {
                let token = self.peek()?;
                let ty = self.resolve_type(&token)?;
                self.advance()?;
                let (param, param_token) = self.expect_ident("a parameter name")?;
                params.push((ty, param, param_token));
                if !self.match_punct(Punct::Comma)? {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;
        self.expect_kw(Kw::Do)?;

        let space = self.symbols.add_space(SpaceKind::Method, name, Some(self.space));
        let method = Method {
            name,
            params: params.iter().map(|(ty, ..)| *ty).collect(),
            ret,
            space,
            parent: self.space,
            pos: name_token.pos,
            body: None,
        };
        let id = match self.symbols.declare_method(self.space, method) {
            Ok(id) => Some(id),
            Err(prev) => {
                let first = self.symbols.method(prev).pos;
                self.report(
                    Diagnostic::error(
                        codes::DUPLICATE,
                        format!(
                            "method '{}' with these parameter types is already defined",
                            name_token.text()
                        ),
                        name_token.pos,
                    )
                    .with_related(first),
                )?;
                None
            }
        };

        let body = self.with_space(space, |p| {
            p.with_body(&[Kw::Od], |p| {
                for (ty, param, token) in &params {
                    if let Err(prev) = p.symbols.declare_var(p.space, *param, *ty, VarMode::Plain, token.pos) {
                        let first = p.symbols.var(prev).pos;
                        p.report(
                            Diagnostic::error(
                                codes::DUPLICATE,
                                format!("parameter '{}' is declared twice", token.text()),
                                token.pos,
                            )
                            .with_related(first),
                        )?;
                    }
                }
                p.parse_stmt_list()
            })
        })?;
        self.expect_kw(Kw::Od)?;

        let Some(method) = id else {
            return Ok(self.ast.add(NodeKind::Block(Block), Vec::new(), start.pos));
        };
        self.symbols.method_mut(method).body = Some(body);
        log::trace!("method '{}' parsed", name_token.text());
        Ok(self.ast.add(NodeKind::MethodDef(MethodDef { method }), vec![body], start.pos))
    }

    /// `class Name do fields; methods od`
    pub(crate) fn parse_class_def(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let (name, token) = self.expect_ident("a class name")?;
        self.expect_kw(Kw::Do)?;

        let space = self.symbols.add_space(SpaceKind::Class, name, Some(self.space));
        let declared = self.symbols.declare_class(self.space, name, space, token.pos);
        if let Err(prev) = declared {
            let first = self.symbols.class(prev).pos;
            self.report(
                Diagnostic::error(
                    codes::DUPLICATE,
                    format!("class '{}' is already defined", token.text()),
                    token.pos,
                )
                .with_related(first),
            )?;
        }

        let members = self.nested(start.pos, |p| {
            p.with_space(space, |p| {
                let depth = p.closers.len();
                p.closers.push(Kw::Od);
                let result = p.parse_stmt_list();
                p.closers.truncate(depth);
                result
            })
        })?;
        self.expect_kw(Kw::Od)?;

        let mut children = Vec::new();
        for member in self.ast.children(members).to_vec() {
            match self.ast.kind(member) {
                NodeKind::VarDef(_) | NodeKind::MethodDef(_) => children.push(member),
                NodeKind::Block(_) => children.extend_from_slice(self.ast.children(member)),
                other => {
                    let message = format!("{} is not allowed in a class body", other.name());
                    let pos = self.ast.pos(member);
                    self.report(Diagnostic::error(codes::UNEXPECTED_TOKEN, message, pos))?;
                }
            }
        }

        let Ok(class) = declared else {
            return Ok(self.ast.add(NodeKind::Block(Block), Vec::new(), start.pos));
        };
        Ok(self.ast.add(NodeKind::ClassDef(ClassDef { class }), children, start.pos))
    }

    /// `import name;` parses the named unit in place, as a module of the
    /// global space. A unit already parsed is only linked.
    pub(crate) fn parse_import(&mut self) -> ParseResult<NodeId> {
        let start = self.advance()?;
        let token = self.peek()?;
        if !matches!(token.kind, TokenKind::Identifier | TokenKind::String) {
            return Err(self.unexpected(&token, "a unit name"));
        }
        self.advance()?;
        let unit = token.text().to_string();
        self.expect_punct(Punct::Semi)?;

        if let Some(&(_, module)) = self.modules.iter().find(|(name, _)| *name == unit) {
            if self.loading.contains(&unit) {
                let message = format!("circular import of '{unit}'");
                self.report(Diagnostic::error(codes::CIRCULAR_IMPORT, message, token.pos))?;
                return Ok(self.import_node(unit, None, start.pos));
            }
            self.link(module);
            return Ok(self.import_node(unit, Some(module), start.pos));
        }

        if !self.stream.enter_unit(&unit, token.pos) {
            let message = format!("unit '{unit}' not found");
            self.report(Diagnostic::error(codes::UNIT_NOT_FOUND, message, token.pos))?;
            return Ok(self.import_node(unit, None, start.pos));
        }
        log::debug!("importing '{unit}'");

        let global = self.symbols.global();
        let name = self.names.intern(&unit);
        let module = self.symbols.add_space(SpaceKind::Module, name, Some(global));
        self.modules.push((unit.clone(), module));
        self.loading.push(unit.clone());

        let body = self.nested(token.pos, |p| {
            p.with_space(module, |p| {
                let closers = std::mem::take(&mut p.closers);
                let result = p.module_body();
                p.closers = closers;
                result
            })
        });
        self.loading.pop();
        let body = body?;

        self.symbols.space_mut(module).body = Some(body);
        self.link(module);
        Ok(self.import_node(unit, Some(module), start.pos))
    }

    fn module_body(&mut self) -> ParseResult<NodeId> {
        let pos = self.stream.here();
        let mut stmts = Vec::new();
        self.collect_statements(&mut stmts)?;
        let end = self.peek()?;
        if end.kind == TokenKind::EndOfUnit {
            self.advance()?;
        }
        Ok(self.ast.add(NodeKind::Block(Block), stmts, pos))
    }

    fn link(&mut self, module: SpaceId) {
        let imports = &mut self.symbols.space_mut(self.space).imports;
        if !imports.contains(&module) && module != self.space {
            imports.push(module);
        }
    }

    fn import_node(&mut self, unit: String, module: Option<SpaceId>, pos: PosId) -> NodeId {
        self.ast.add(NodeKind::Import(Import { unit, module }), Vec::new(), pos)
    }

    fn resolve_type(&mut self, token: &Token) -> ParseResult<Type> {
        match self.type_named(token) {
            Some(ty) => Ok(ty),
            None => Err(self.unexpected(token, "a type name")),
        }
    }
}
