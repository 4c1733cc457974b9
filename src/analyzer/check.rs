mod call;
mod expr;
mod stmt;

use crate::analyzer::builtins::Builtins;
use crate::analyzer::scope::{MethodId, SymbolTable};
use crate::analyzer::types::Type;
use crate::ast::{Ast, Conversion, NodeId, NodeKind};
use crate::diagnostic::{Diagnostic, Diagnostics, codes};
use crate::parser::ParseOutput;
use crate::source::PosId;
use crate::utils::{Interner, Symbol};

/// Types every node of a parsed program, resolves calls and members, and
/// inserts the implicit conversions. Problems land in the output's
/// diagnostics; checking stops early once their ceiling is reached.
pub fn check(output: &mut ParseOutput, builtins: &Builtins) {
    let bodies: Vec<NodeId> = output
        .modules
        .iter()
        .filter_map(|(_, space)| output.symbols.space(*space).body)
        .collect();

    let mut checker = Checker {
        ast: &mut output.ast,
        symbols: &output.symbols,
        names: &output.names,
        builtins,
        diagnostics: &mut output.diagnostics,
        method: None,
        loops: 0,
    };
    for body in bodies {
        if checker.stopped() {
            break;
        }
        checker.check_stmt(body);
    }
    log::debug!(
        "check done: {} errors, {} warnings",
        output.diagnostics.error_count(),
        output.diagnostics.warning_count()
    );
}

pub(crate) struct Checker<'a> {
    ast: &'a mut Ast,
    symbols: &'a SymbolTable,
    names: &'a Interner,
    builtins: &'a Builtins,
    diagnostics: &'a mut Diagnostics,
    /// Method whose body is being checked.
    method: Option<MethodId>,
    /// Loops enclosing the current statement within that body.
    loops: u32,
}

impl<'a> Checker<'a> {
    fn stopped(&self) -> bool {
        self.diagnostics.stopped()
    }

    fn report(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    fn error(&mut self, code: u16, message: String, pos: PosId) {
        self.report(Diagnostic::error(code, message, pos));
    }

    fn name_of(&self, name: Symbol) -> &'a str {
        self.names.resolve(name)
    }

    fn show(&self, ty: Type) -> String {
        ty.display(self.symbols, self.names).to_string()
    }

    fn set_ty(&mut self, id: NodeId, ty: Type) -> Type {
        self.ast.node_mut(id).ty = ty;
        ty
    }

    /// Wraps child `index` of `parent` in an implicit conversion when its
    /// type promotes to `target`.
    fn coerce_child(&mut self, parent: NodeId, index: usize, target: Type) {
        let Some(child) = self.ast.child(parent, index) else {
            return;
        };
        let from = self.ast.ty(child);
        if !from.promotes_to(target) {
            return;
        }
        let pos = self.ast.pos(child);
        let conversion = Conversion {
            to: target,
            implicit: true,
        };
        let wrapped = self.ast.add(NodeKind::Convert(conversion), vec![child], pos);
        self.set_ty(wrapped, target);
        self.ast.node_mut(parent).children[index] = wrapped;
    }

    /// Checks that child `index` of `parent` fits `target`, converting it
    /// when a promotion applies. Returns whether it fits.
    fn expect_child(&mut self, parent: NodeId, index: usize, target: Type, what: &str) -> bool {
        let Some(child) = self.ast.child(parent, index) else {
            return false;
        };
        let found = self.ast.ty(child);
        if !target.accepts(found) {
            let message = format!(
                "{what} must be {}, found {}",
                self.show(target),
                self.show(found)
            );
            let pos = self.ast.pos(child);
            self.error(codes::TYPE_MISMATCH, message, pos);
            return false;
        }
        self.coerce_child(parent, index, target);
        true
    }

    fn child(&self, id: NodeId, index: usize) -> NodeId {
        self.ast.children(id)[index]
    }
}
