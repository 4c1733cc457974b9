use super::Checker;
use crate::analyzer::scope::VarMode;
use crate::analyzer::types::Type;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, codes};

impl Checker<'_> {
    pub(super) fn check_stmt(&mut self, id: NodeId) {
        if self.stopped() {
            return;
        }
        match self.ast.kind(id).clone() {
            NodeKind::VarDef(def) => self.check_var_def(id, &def),
            NodeKind::ExprStmt(_) => {
                let expr = self.child(id, 0);
                let ty = self.check_expr(expr);
                self.set_ty(id, ty);
            }
            NodeKind::Block(_) => {
                for i in 0..self.ast.children(id).len() {
                    let stmt = self.child(id, i);
                    self.check_stmt(stmt);
                }
            }
            NodeKind::If(stmt) => {
                let count = self.ast.children(id).len();
                let branches = if stmt.has_else { count - 1 } else { count };
                for i in (0..branches).step_by(2) {
                    self.check_condition(id, i);
                    let body = self.child(id, i + 1);
                    self.check_stmt(body);
                }
                if stmt.has_else {
                    let body = self.child(id, count - 1);
                    self.check_stmt(body);
                }
            }
            NodeKind::While(_) => {
                self.check_condition(id, 0);
                self.check_loop_body(self.child(id, 1));
            }
            NodeKind::Repeat(_) => {
                self.check_loop_body(self.child(id, 0));
                self.check_condition(id, 1);
            }
            NodeKind::CountedFor(stmt) => {
                let bounds = if stmt.has_step { 3 } else { 2 };
                for i in 0..bounds {
                    let bound = self.child(id, i);
                    if self.check_expr(bound) != Type::Error {
                        self.expect_child(id, i, Type::Int, "loop bound");
                    }
                }
                self.check_loop_body(self.child(id, bounds));
            }
            NodeKind::IteratedFor(_) => {
                let iterable = self.child(id, 0);
                let ty = self.check_expr(iterable);
                if !matches!(ty, Type::List | Type::Map | Type::String) && !ty.is_open() {
                    let message = format!("cannot iterate over {}", self.show(ty));
                    let pos = self.ast.pos(iterable);
                    self.error(codes::TYPE_MISMATCH, message, pos);
                }
                let pos = self.ast.pos(id);
                self.report(Diagnostic::warning(
                    codes::UNIMPLEMENTED,
                    "'for ... in' loops are not implemented and fail when run",
                    pos,
                ));
                self.check_loop_body(self.child(id, 1));
            }
            NodeKind::MethodDef(def) => {
                let saved = (self.method.replace(def.method), std::mem::take(&mut self.loops));
                let body = self.child(id, 0);
                self.check_stmt(body);
                (self.method, self.loops) = saved;
            }
            NodeKind::ClassDef(_) => {
                let saved = (self.method.take(), std::mem::take(&mut self.loops));
                for i in 0..self.ast.children(id).len() {
                    let member = self.child(id, i);
                    self.check_stmt(member);
                }
                (self.method, self.loops) = saved;
            }
            NodeKind::Import(_) => {}
            NodeKind::Return(_) => self.check_return(id),
            NodeKind::Leave(Leave { depth }) | NodeKind::Continue(Continue { depth }) => {
                if depth > self.loops {
                    let word = if let NodeKind::Leave(_) = self.ast.kind(id) { "leave" } else { "continue" };
                    let message = match self.loops {
                        0 => format!("'{word}' outside of a loop"),
                        n => format!("'{word} {depth}' but only {n} enclosing loop(s)"),
                    };
                    let pos = self.ast.pos(id);
                    self.error(codes::LOOP_DEPTH, message, pos);
                }
            }
            other => {
                let pos = self.ast.pos(id);
                log::error!("{} node in statement position", other.name());
                self.error(codes::UNEXPECTED_TOKEN, format!("{} is not a statement", other.name()), pos);
            }
        }
    }

    fn check_var_def(&mut self, id: NodeId, def: &VarDef) {
        let symbols = self.symbols;
        let var = symbols.var(def.var);
        let (ty, mode) = (var.ty, var.mode);
        let Some(init) = self.ast.child(id, 0) else {
            return;
        };
        let found = self.check_expr(init);
        if found == Type::Error {
            return;
        }
        if ty == Type::Formula && mode == VarMode::Plain {
            if found == Type::Void {
                let pos = self.ast.pos(init);
                self.error(codes::TYPE_MISMATCH, "initializer has no value".into(), pos);
            }
            return;
        }
        let what = format!("initializer of '{}'", self.name_of(var.name));
        if found == Type::Void {
            let pos = self.ast.pos(init);
            self.error(codes::TYPE_MISMATCH, format!("{what} has no value"), pos);
            return;
        }
        self.expect_child(id, 0, ty, &what);
    }

    fn check_condition(&mut self, id: NodeId, index: usize) {
        let cond = self.child(id, index);
        if self.check_expr(cond) != Type::Error {
            self.expect_child(id, index, Type::Bool, "condition");
        }
    }

    fn check_loop_body(&mut self, body: NodeId) {
        self.loops += 1;
        self.check_stmt(body);
        self.loops -= 1;
    }

    fn check_return(&mut self, id: NodeId) {
        let pos = self.ast.pos(id);
        let Some(method) = self.method else {
            self.error(codes::MISPLACED_RETURN, "'return' outside of a method".into(), pos);
            return;
        };
        let ret = self.symbols.method(method).ret;
        match self.ast.child(id, 0) {
            None if ret != Type::Void => {
                let message = format!("method must return a value of type {}", self.show(ret));
                self.error(codes::TYPE_MISMATCH, message, pos);
            }
            None => {}
            Some(value) => {
                let found = self.check_expr(value);
                if ret == Type::Void {
                    self.error(codes::TYPE_MISMATCH, "method does not return a value".into(), pos);
                } else if found != Type::Error {
                    self.expect_child(id, 0, ret, "return value");
                }
            }
        }
    }
}
