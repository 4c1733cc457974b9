use super::Checker;
use crate::analyzer::scope::{Address, VarMode};
use crate::analyzer::types::Type;
use crate::ast::*;
use crate::diagnostic::codes;

impl Checker<'_> {
    pub(super) fn check_expr(&mut self, id: NodeId) -> Type {
        if self.stopped() {
            return self.set_ty(id, Type::Error);
        }
        let ty = match self.ast.kind(id).clone() {
            NodeKind::Constant(c) => match c.value {
                Literal::Undefined => Type::Error,
                Literal::Bool(_) => Type::Bool,
                Literal::Int(_) => Type::Int,
                Literal::Float(_) => Type::Float,
                Literal::Str(_) => Type::String,
            },
            NodeKind::ListLiteral(_) => {
                self.check_operands(id, "list element");
                Type::List
            }
            NodeKind::MapLiteral(_) => self.check_map_literal(id),
            NodeKind::Name(name) => self.check_name(id, &name),
            NodeKind::Field(field) => self.check_field(id, &field),
            NodeKind::Index(_) => self.check_index(id),
            NodeKind::Convert(conv) => self.check_conversion(id, &conv),
            NodeKind::Unary(unary) => self.check_unary(id, unary.op),
            NodeKind::Binary(binary) => self.check_binary(id, binary.op),
            NodeKind::Call(call) => self.check_call(id, &call),
            NodeKind::MemberCall(call) => self.check_member_call(id, &call),
            other => {
                log::error!("{} node in expression position", other.name());
                Type::Error
            }
        };
        self.set_ty(id, ty)
    }

    /// Checks every child as a value.
    pub(super) fn check_operands(&mut self, id: NodeId, what: &str) -> Vec<Type> {
        let count = self.ast.children(id).len();
        (0..count)
            .map(|i| {
                let child = self.child(id, i);
                let ty = self.check_expr(child);
                if ty == Type::Void {
                    let pos = self.ast.pos(child);
                    self.error(codes::TYPE_MISMATCH, format!("{what} has no value"), pos);
                    return Type::Error;
                }
                ty
            })
            .collect()
    }

    fn check_map_literal(&mut self, id: NodeId) -> Type {
        let types = self.check_operands(id, "map entry");
        for (i, ty) in types.iter().enumerate().step_by(2) {
            if !is_key_type(*ty) {
                let message = format!("map keys must be Integer, Bool or String, found {}", self.show(*ty));
                let pos = self.ast.pos(self.child(id, i));
                self.error(codes::TYPE_MISMATCH, message, pos);
            }
        }
        Type::Map
    }

    fn check_name(&mut self, id: NodeId, name: &NameRef) -> Type {
        if let Address::Field { .. } = name.addr {
            let var = self.symbols.var(name.var);
            let message = format!(
                "access to field '{}' is not implemented",
                self.name_of(var.name)
            );
            let pos = self.ast.pos(id);
            self.error(codes::UNIMPLEMENTED, message, pos);
            return Type::Error;
        }
        self.symbols.var(name.var).ty
    }

    fn check_field(&mut self, id: NodeId, field: &FieldAccess) -> Type {
        let object = self.child(id, 0);
        let recv = self.check_expr(object);
        let pos = self.ast.pos(id);
        let member = self.name_of(field.name);
        if let Type::Class(_) = recv {
            let message = format!("field access '.{member}' on class objects is not implemented");
            self.error(codes::UNIMPLEMENTED, message, pos);
            return Type::Error;
        }
        match self.builtins.property(recv, member) {
            Some((property, ty)) => {
                self.ast.node_mut(id).kind = NodeKind::Field(FieldAccess {
                    name: field.name,
                    property: Some(property),
                });
                ty
            }
            None => {
                let message = format!("{} has no property '{member}'", self.show(recv));
                self.error(codes::UNKNOWN_MEMBER, message, pos);
                Type::Error
            }
        }
    }

    fn check_index(&mut self, id: NodeId) -> Type {
        let recv = self.check_expr(self.child(id, 0));
        let key = self.check_expr(self.child(id, 1));
        match recv {
            Type::List => {
                self.expect_child(id, 1, Type::Int, "list index");
                Type::Any
            }
            Type::String => {
                self.expect_child(id, 1, Type::Int, "string index");
                Type::String
            }
            Type::Map => {
                if !is_key_type(key) {
                    let message = format!("map keys must be Integer, Bool or String, found {}", self.show(key));
                    let pos = self.ast.pos(self.child(id, 1));
                    self.error(codes::TYPE_MISMATCH, message, pos);
                }
                Type::Any
            }
            Type::Any | Type::Error => Type::Any,
            other => {
                let message = format!("{} cannot be indexed", self.show(other));
                let pos = self.ast.pos(id);
                self.error(codes::TYPE_MISMATCH, message, pos);
                Type::Error
            }
        }
    }

    fn check_conversion(&mut self, id: NodeId, conv: &Conversion) -> Type {
        let from = self.check_expr(self.child(id, 0));
        if !conv.to.converts_from(from) {
            let message = format!("cannot convert {} to {}", self.show(from), self.show(conv.to));
            let pos = self.ast.pos(id);
            self.error(codes::TYPE_MISMATCH, message, pos);
            return Type::Error;
        }
        conv.to
    }

    fn check_unary(&mut self, id: NodeId, op: UnaryOp) -> Type {
        let operand = self.child(id, 0);
        let ty = self.check_expr(operand);
        if op.is_step() && !self.check_assignable(operand) {
            return Type::Error;
        }
        match ty {
            Type::Error => return Type::Error,
            Type::Any if op == UnaryOp::Not => return Type::Bool,
            Type::Any => return Type::Any,
            _ => {}
        }
        let pos = self.ast.pos(id);
        let fits = match op {
            UnaryOp::Not => ty == Type::Bool,
            UnaryOp::BitNot => matches!(ty, Type::Int | Type::Bool),
            _ => ty.is_numeric(),
        };
        if !fits {
            let message = format!("operator '{}' cannot be applied to {}", op.symbol(), self.show(ty));
            self.error(codes::TYPE_MISMATCH, message, pos);
            return Type::Error;
        }
        if op == UnaryOp::BitNot {
            self.coerce_child(id, 0, Type::Int);
            return Type::Int;
        }
        ty
    }

    fn check_binary(&mut self, id: NodeId, op: BinaryOp) -> Type {
        let lhs = self.check_expr(self.child(id, 0));
        let rhs = self.check_expr(self.child(id, 1));

        if op.is_assignment() {
            return self.check_assignment(id, op, lhs, rhs);
        }
        if lhs == Type::Error || rhs == Type::Error {
            return Type::Error;
        }
        match self.binary_result(id, op, lhs, rhs) {
            Some(ty) => ty,
            None => {
                self.mismatch(id, op, lhs, rhs);
                Type::Error
            }
        }
    }

    /// Result type of `lhs op rhs`, converting the operands as needed.
    /// `None` when the operator does not apply.
    fn binary_result(&mut self, id: NodeId, op: BinaryOp, lhs: Type, rhs: Type) -> Option<Type> {
        if lhs == Type::Void || rhs == Type::Void {
            return None;
        }
        if op.is_logical() {
            return (Type::Bool.accepts(lhs) && Type::Bool.accepts(rhs)).then_some(Type::Bool);
        }
        if lhs == Type::Any || rhs == Type::Any {
            return Some(if op.is_comparison() { Type::Bool } else { Type::Any });
        }
        if op.is_comparison() {
            if lhs.is_numeric() && rhs.is_numeric() {
                self.unify_numeric(id, lhs, rhs);
                return Some(Type::Bool);
            }
            let ordered = matches!(op, BinaryOp::Eq | BinaryOp::Ne) || lhs == Type::String;
            return (lhs == rhs && ordered).then_some(Type::Bool);
        }
        if op.is_bitwise() {
            let int_like = |t: Type| matches!(t, Type::Int | Type::Bool);
            if !int_like(lhs) || !int_like(rhs) {
                return None;
            }
            self.coerce_child(id, 0, Type::Int);
            self.coerce_child(id, 1, Type::Int);
            return Some(Type::Int);
        }
        if op == BinaryOp::Add && lhs == rhs && matches!(lhs, Type::String | Type::List) {
            return Some(lhs);
        }
        let arithmetic = |t: Type| t.is_numeric() || t == Type::Bool;
        if !arithmetic(lhs) || !arithmetic(rhs) {
            return None;
        }
        Some(self.unify_numeric(id, lhs, rhs))
    }

    /// Converts both operands to the wider numeric type of the two.
    fn unify_numeric(&mut self, id: NodeId, lhs: Type, rhs: Type) -> Type {
        let target = if lhs == Type::Float || rhs == Type::Float {
            Type::Float
        } else {
            Type::Int
        };
        self.coerce_child(id, 0, target);
        self.coerce_child(id, 1, target);
        target
    }

    fn check_assignment(&mut self, id: NodeId, op: BinaryOp, lhs: Type, rhs: Type) -> Type {
        let target = self.child(id, 0);
        if !self.check_assignable(target) || lhs == Type::Error || rhs == Type::Error {
            return Type::Error;
        }
        let value = match op.compound_base() {
            None => rhs,
            Some(base) => {
                if lhs.is_open() {
                    return lhs;
                }
                match self.binary_result_compound(id, base, lhs, rhs) {
                    Some(ty) => ty,
                    None => {
                        self.mismatch(id, op, lhs, rhs);
                        return Type::Error;
                    }
                }
            }
        };
        if value == Type::Void || !lhs.accepts(value) {
            let message = format!("cannot assign {} to {}", self.show(value), self.show(lhs));
            let pos = self.ast.pos(id);
            self.error(codes::TYPE_MISMATCH, message, pos);
            return Type::Error;
        }
        if op == BinaryOp::Assign {
            self.coerce_child(id, 1, lhs);
        }
        lhs
    }

    /// Like [`Self::binary_result`], but the target keeps its type; only
    /// the right operand may be converted.
    fn binary_result_compound(&mut self, id: NodeId, base: BinaryOp, lhs: Type, rhs: Type) -> Option<Type> {
        if base == BinaryOp::Add && lhs == rhs && matches!(lhs, Type::String | Type::List) {
            return Some(lhs);
        }
        if rhs == Type::Any {
            return Some(lhs);
        }
        if !lhs.is_numeric() || !(rhs.is_numeric() || rhs == Type::Bool) {
            return None;
        }
        if lhs == Type::Float {
            self.coerce_child(id, 1, Type::Float);
            return Some(Type::Float);
        }
        if rhs == Type::Bool {
            self.coerce_child(id, 1, Type::Int);
        }
        Some(if rhs == Type::Float { Type::Float } else { Type::Int })
    }

    /// Reports and returns false unless `target` can be written to.
    pub(super) fn check_assignable(&mut self, target: NodeId) -> bool {
        let pos = self.ast.pos(target);
        match self.ast.kind(target) {
            NodeKind::Name(name) => {
                let var = self.symbols.var(name.var);
                if var.mode == VarMode::Plain {
                    return true;
                }
                let word = if var.mode == VarMode::Const { "const" } else { "lazy" };
                let message = format!("{word} variable '{}' cannot be assigned", self.name_of(var.name));
                self.error(codes::NOT_ASSIGNABLE, message, pos);
                false
            }
            NodeKind::Index(_) => {
                let object = self.child(target, 0);
                self.check_assignable(object)
            }
            NodeKind::Field(_) => true,
            NodeKind::Constant(Constant {
                value: Literal::Undefined,
            }) => false,
            _ => {
                self.error(codes::NOT_ASSIGNABLE, "expression cannot be assigned to".into(), pos);
                false
            }
        }
    }

    fn mismatch(&mut self, id: NodeId, op: BinaryOp, lhs: Type, rhs: Type) {
        let message = format!(
            "operator '{}' cannot be applied to {} and {}",
            op.symbol(),
            self.show(lhs),
            self.show(rhs)
        );
        let pos = self.ast.pos(id);
        self.error(codes::TYPE_MISMATCH, message, pos);
    }
}

fn is_key_type(ty: Type) -> bool {
    matches!(ty, Type::Int | Type::Bool | Type::String) || ty.is_open()
}
