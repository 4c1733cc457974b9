use super::Checker;
use crate::analyzer::builtins::BuiltinFn;
use crate::analyzer::scope::{MethodId, SpaceKind};
use crate::analyzer::types::Type;
use crate::ast::*;
use crate::diagnostic::{Diagnostic, codes};

impl Checker<'_> {
    pub(super) fn check_call(&mut self, id: NodeId, call: &CallExpr) -> Type {
        let args = self.check_operands(id, "argument");
        if args.contains(&Type::Error) {
            return Type::Error;
        }
        let name = self.name_of(call.name);
        let pos = self.ast.pos(id);

        let symbols = self.symbols;
        let Some(candidates) = symbols.methods_named(call.site, call.name) else {
            if let Some(builtin) = self.builtins.function(name) {
                return self.check_builtin_call(id, call, builtin, &args);
            }
            self.error(codes::UNDEFINED, format!("method '{name}' is not defined"), pos);
            return Type::Error;
        };

        let exact: Vec<MethodId> = candidates
            .iter()
            .copied()
            .filter(|m| self.symbols.method(*m).params == args)
            .collect();
        let chosen = if exact.len() == 1 {
            exact
        } else {
            candidates
                .iter()
                .copied()
                .filter(|m| {
                    let params = &self.symbols.method(*m).params;
                    params.len() == args.len() && params.iter().zip(&args).all(|(p, a)| p.accepts(*a))
                })
                .collect()
        };

        match chosen.as_slice() {
            [method] => self.bind_method(id, call, *method),
            [] => {
                if let Some(builtin) = self.builtins.function(name) {
                    return self.check_builtin_call(id, call, builtin, &args);
                }
                let shown: Vec<String> = args.iter().map(|t| self.show(*t)).collect();
                let message = format!("no overload of '{name}' accepts ({})", shown.join(", "));
                let mut diag = Diagnostic::error(codes::NO_OVERLOAD, message, pos);
                if let Some(first) = candidates.first() {
                    diag = diag.with_related(self.symbols.method(*first).pos);
                }
                self.report(diag);
                Type::Error
            }
            [first, second, ..] => {
                let message = format!("call of '{name}' is ambiguous");
                let diag = Diagnostic::error(codes::AMBIGUOUS_CALL, message, pos)
                    .with_related(self.symbols.method(*first).pos);
                self.report(diag);
                log::debug!(
                    "ambiguous candidates at {:?} and {:?}",
                    self.symbols.method(*first).pos,
                    self.symbols.method(*second).pos
                );
                Type::Error
            }
        }
    }

    fn bind_method(&mut self, id: NodeId, call: &CallExpr, method: MethodId) -> Type {
        let target = self.symbols.method(method);
        let params = target.params.clone();
        let ret = target.ret;
        let link_hops = match self.symbols.space(target.parent).kind {
            SpaceKind::Method => self.symbols.method_hops(call.site, target.parent),
            _ => None,
        };
        for (i, param) in params.iter().enumerate() {
            self.coerce_child(id, i, *param);
        }
        self.ast.node_mut(id).kind = NodeKind::Call(CallExpr {
            target: CallTarget::Method {
                id: method,
                link_hops,
            },
            ..call.clone()
        });
        ret
    }

    fn check_builtin_call(&mut self, id: NodeId, call: &CallExpr, builtin: BuiltinFn, args: &[Type]) -> Type {
        if let Some(params) = builtin.params() {
            if params.len() != args.len() {
                let message = format!(
                    "'{}' takes {} argument(s), found {}",
                    builtin.name(),
                    params.len(),
                    args.len()
                );
                let pos = self.ast.pos(id);
                self.error(codes::NO_OVERLOAD, message, pos);
                return Type::Error;
            }
            for (i, param) in params.iter().enumerate() {
                if !self.expect_child(id, i, *param, "argument") {
                    return Type::Error;
                }
            }
        }
        self.ast.node_mut(id).kind = NodeKind::Call(CallExpr {
            target: CallTarget::Builtin(builtin),
            ..call.clone()
        });
        Type::Void
    }

    /// `object.name(args)` on a built-in receiver.
    pub(super) fn check_member_call(&mut self, id: NodeId, call: &MemberCall) -> Type {
        let types = self.check_operands(id, "argument");
        let (recv, args) = match types.split_first() {
            Some((recv, args)) => (*recv, args.to_vec()),
            None => return Type::Error,
        };
        if recv == Type::Error || args.contains(&Type::Error) {
            return Type::Error;
        }
        let name = self.name_of(call.name);
        let pos = self.ast.pos(id);
        if let Type::Class(_) = recv {
            let message = format!("member call '.{name}()' on class objects is not implemented");
            self.error(codes::UNIMPLEMENTED, message, pos);
            return Type::Error;
        }
        let Some(sig) = self.builtins.member(recv, name) else {
            let message = format!("{} has no member '{name}'", self.show(recv));
            self.error(codes::UNKNOWN_MEMBER, message, pos);
            return Type::Error;
        };
        if sig.params.len() != args.len() {
            let message = format!("'{name}' takes {} argument(s), found {}", sig.params.len(), args.len());
            self.error(codes::NO_OVERLOAD, message, pos);
            return Type::Error;
        }
        for (i, param) in sig.params.iter().enumerate() {
            if !self.expect_child(id, i + 1, *param, "argument") {
                return Type::Error;
            }
        }
        if sig.member.mutates() {
            let object = self.child(id, 0);
            if !self.check_assignable(object) {
                return Type::Error;
            }
        }
        self.ast.node_mut(id).kind = NodeKind::MemberCall(MemberCall {
            name: call.name,
            member: Some(sig.member),
        });
        sig.ret
    }
}
