use std::collections::BTreeMap;

use super::native::{Fault, apply_binary, apply_unary, call_member, convert, index_value, property};
use super::{Calculable, MapKey, Object, RuntimeError, Thread, Variant};
use crate::analyzer::builtins::BuiltinFn;
use crate::analyzer::scope::{Address, VarMode};
use crate::ast::*;

impl Calculable for Constant {
    fn calc(&self, _id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let value = match &self.value {
            Literal::Undefined => Variant::Undefined,
            Literal::Bool(b) => Variant::Bool(*b),
            Literal::Int(n) => Variant::Int(*n),
            Literal::Float(x) => Variant::Float(*x),
            Literal::Str(s) => Variant::str(s.clone()),
        };
        thread.push(value);
        Ok(())
    }
}

impl Calculable for ListLiteral {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let items = thread.children(id);
        for &item in items {
            thread.calc(item)?;
        }
        let values = thread.pop_n(items.len())?;
        thread.push(Variant::list(values));
        Ok(())
    }
}

impl Calculable for MapLiteral {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let entries = thread.children(id);
        for &entry in entries {
            thread.calc(entry)?;
        }
        let values = thread.pop_n(entries.len())?;
        let mut map = BTreeMap::new();
        let mut iter = values.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            let Some(key) = MapKey::from_variant(&key) else {
                let fault = Fault::Mismatch {
                    left: "Map",
                    right: key.type_name(),
                };
                return Err(fault.at("{}", thread.at(id)));
            };
            map.insert(key, value);
        }
        thread.push(Variant::Object(Object::Map(map)));
        Ok(())
    }
}

impl Calculable for NameRef {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let lazy = thread.symbols.var(self.var).mode == VarMode::Lazy;
        let value = thread.slot_mut(self.addr, self.var, id)?.clone();
        if let (true, Variant::Object(Object::Formula(expr))) = (lazy, &value) {
            // evaluated where it was declared
            let frame = match self.addr {
                Address::Local { hops, .. } => thread.frame_at(hops),
                _ => None,
            };
            let saved = std::mem::replace(&mut thread.fp, frame);
            let result = thread.calc(*expr);
            thread.fp = saved;
            return result;
        }
        thread.push(value);
        Ok(())
    }
}

impl Calculable for FieldAccess {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let Some(prop) = self.property else {
            return Err(thread.unimplemented(id, "field access"));
        };
        let object = thread.children(id)[0];
        let result = match thread.place_of(object)? {
            Some(place) => property(prop, thread.resolve(&place, false)?),
            None => {
                let value = thread.value(object)?;
                property(prop, &value)
            }
        };
        let value = result.map_err(|fault| fault.at(&format!(".{}", prop.name()), thread.at(id)))?;
        if thread.tracing() {
            thread.trace_line(format!(".{} -> {value}", prop.name()));
        }
        thread.push(value);
        Ok(())
    }
}

impl Calculable for IndexAccess {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let (object, index) = (thread.children(id)[0], thread.children(id)[1]);
        let (key, result) = match thread.place_of(object)? {
            Some(place) => {
                let key = thread.value(index)?;
                let result = index_value(thread.resolve(&place, false)?, &key);
                (key, result)
            }
            None => {
                let container = thread.value(object)?;
                let key = thread.value(index)?;
                let result = index_value(&container, &key);
                (key, result)
            }
        };
        let value = result.map_err(|fault| fault.at("[]", thread.at(id)))?;
        if thread.tracing() {
            thread.trace_line(format!("[{key}] -> {value}"));
        }
        thread.push(value);
        Ok(())
    }
}

impl Calculable for Conversion {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let value = thread.value(thread.children(id)[0])?;
        let traced = thread.tracing().then(|| value.to_string());
        let name = self.to.builtin_name();
        let converted = convert(value, self.to).map_err(|fault| fault.at(name, thread.at(id)))?;
        if let Some(before) = traced {
            thread.trace_line(format!("{name} {before} -> {converted}"));
        }
        thread.push(converted);
        Ok(())
    }
}

impl Calculable for UnaryExpr {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let operand = thread.children(id)[0];
        let symbol = self.op.symbol();
        if !self.op.is_step() {
            thread.calc(operand)?;
            let tracing = thread.tracing();
            let top = thread.top_mut()?;
            let before = tracing.then(|| top.to_string());
            let result = apply_unary(self.op, top);
            let after = tracing.then(|| top.to_string());
            result.map_err(|fault| fault.at(symbol, thread.at(id)))?;
            if let (Some(before), Some(after)) = (before, after) {
                thread.trace_line(format!("{symbol} {before} -> {after}"));
            }
            return Ok(());
        }

        let Some(place) = thread.place_of(operand)? else {
            return Err(thread.unimplemented(id, "stepping this expression"));
        };
        let slot = thread.resolve(&place, false)?;
        let before = slot.clone();
        let result = apply_unary(self.op, slot);
        let after = slot.clone();
        result.map_err(|fault| fault.at(symbol, thread.at(id)))?;
        if thread.tracing() {
            thread.trace_line(format!("{symbol} {before} -> {after}"));
        }
        thread.push(if self.op.is_postfix() { before } else { after });
        Ok(())
    }
}

impl Calculable for BinaryExpr {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let (lhs, rhs) = (thread.children(id)[0], thread.children(id)[1]);
        let symbol = self.op.symbol();

        if self.op.is_logical() {
            thread.calc(lhs)?;
            let Some(left) = thread.top_mut()?.as_bool() else {
                let left = thread.pop()?;
                let fault = Fault::BadOperand(left.type_name());
                return Err(fault.at(symbol, thread.at(id)));
            };
            if left == (self.op == BinaryOp::Or) {
                return Ok(());
            }
            thread.pop()?;
            return thread.calc(rhs);
        }

        if self.op.is_assignment() {
            let Some(place) = thread.place_of(lhs)? else {
                return Err(thread.unimplemented(id, "assignment to this expression"));
            };
            let value = thread.value(rhs)?;
            let stored = match self.op.compound_base() {
                None => {
                    *thread.resolve(&place, true)? = value.clone();
                    Ok(value)
                }
                Some(base) => {
                    let slot = thread.resolve(&place, false)?;
                    apply_binary(base, slot, value).map(|()| slot.clone())
                }
            };
            let stored = stored.map_err(|fault| fault.at(symbol, thread.at(id)))?;
            if thread.tracing() {
                thread.trace_line(format!("{symbol} {stored}"));
            }
            thread.push(stored);
            return Ok(());
        }

        thread.calc(lhs)?;
        thread.calc(rhs)?;
        let right = thread.pop()?;
        let traced = thread.tracing().then(|| right.to_string());
        let left = thread.top_mut()?;
        let before = traced.as_ref().map(|_| left.to_string());
        let result = apply_binary(self.op, left, right);
        let after = traced.as_ref().map(|_| left.to_string());
        result.map_err(|fault| fault.at(symbol, thread.at(id)))?;
        if let (Some(right), Some(before), Some(after)) = (traced, before, after) {
            thread.trace_line(format!("{before} {symbol} {right} -> {after}"));
        }
        Ok(())
    }
}

impl Calculable for CallExpr {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let args = thread.children(id);
        for &arg in args {
            thread.calc(arg)?;
        }
        let values = thread.pop_n(args.len())?;
        if thread.tracing() && matches!(self.target, CallTarget::Builtin(_)) {
            let name = thread.names.resolve(self.name);
            let shown: Vec<String> = values.iter().map(Variant::to_string).collect();
            thread.trace_line(format!("call {name}({})", shown.join(", ")));
        }

        match self.target {
            CallTarget::Method { id: method, link_hops } => {
                let link = link_hops.and_then(|hops| thread.frame_at(hops));
                let value = thread.invoke(method, link, values, id)?;
                thread.push(value);
            }
            CallTarget::Builtin(BuiltinFn::Print) => {
                let line: Vec<String> = values.iter().map(Variant::to_string).collect();
                thread.print_line(line.join(" "));
                thread.push(Variant::Undefined);
            }
            CallTarget::Builtin(BuiltinFn::Assert) => {
                if values.first().and_then(Variant::as_bool) != Some(true) {
                    return Err(RuntimeError::AssertionFailed { at: thread.at(id) });
                }
                thread.push(Variant::Undefined);
            }
            CallTarget::Unresolved => {
                let name = thread.names.resolve(self.name).to_string();
                let at = thread.at(id);
                log::error!("{at}: call of '{name}' was never resolved");
                return Err(RuntimeError::Unresolved { name, at });
            }
        }
        Ok(())
    }
}

impl Calculable for MemberCall {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError> {
        let Some(member) = self.member else {
            return Err(thread.unimplemented(id, "member call"));
        };
        let children = thread.children(id);
        let (object, args) = (children[0], &children[1..]);

        let result = match thread.place_of(object)? {
            Some(place) => {
                for &arg in args {
                    thread.calc(arg)?;
                }
                let values = thread.pop_n(args.len())?;
                call_member(member, thread.resolve(&place, false)?, values)
            }
            None => {
                thread.calc(object)?;
                for &arg in args {
                    thread.calc(arg)?;
                }
                let values = thread.pop_n(args.len())?;
                let mut recv = thread.pop()?;
                call_member(member, &mut recv, values)
            }
        };
        let value = result.map_err(|fault| fault.at(&format!(".{}()", member.name()), thread.at(id)))?;
        if thread.tracing() {
            thread.trace_line(format!(".{}() -> {value}", member.name()));
        }
        thread.push(value);
        Ok(())
    }
}
