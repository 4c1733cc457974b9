use super::native::Fault;
use super::{Executable, Object, RuntimeError, Thread, Variant};
use crate::analyzer::scope::VarMode;
use crate::analyzer::types::Type;
use crate::ast::*;

/// How execution continues after a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    /// Unwind this many enclosing loops.
    Leave(u32),
    /// Unwind this many enclosing loops less one, then start the next
    /// iteration of the last.
    Continue(u32),
    Return,
}

impl Flow {
    /// The integer form: zero to fall through, `n` for `leave n`, `-n` for
    /// `continue n`. `None` for a return.
    pub fn signal(self) -> Option<i32> {
        match self {
            Flow::Next => Some(0),
            Flow::Leave(n) => Some(n as i32),
            Flow::Continue(n) => Some(-(n as i32)),
            Flow::Return => None,
        }
    }

    /// What a loop does with the flow its body ended in: `None` to run the
    /// next iteration, otherwise the flow the loop itself ends in.
    fn through_loop(self) -> Option<Flow> {
        match self {
            Flow::Next | Flow::Continue(1) => None,
            Flow::Leave(1) => Some(Flow::Next),
            Flow::Leave(n) => Some(Flow::Leave(n - 1)),
            Flow::Continue(n) => Some(Flow::Continue(n - 1)),
            Flow::Return => Some(Flow::Return),
        }
    }
}

fn condition(thread: &mut Thread<'_>, cond: NodeId, what: &str) -> Result<bool, RuntimeError> {
    let value = thread.value(cond)?;
    value
        .as_bool()
        .ok_or_else(|| Fault::BadOperand(value.type_name()).at(what, thread.at(cond)))
}

impl Executable for VarDef {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        let symbols = thread.symbols;
        let var = symbols.var(self.var);
        let init = thread.children(id).first().copied();
        let unevaluated = var.mode == VarMode::Lazy || var.ty == Type::Formula;
        let value = match init {
            Some(init) if unevaluated => Variant::Object(Object::Formula(init)),
            Some(init) => thread.value(init)?,
            None => Variant::default_for(var.ty, symbols),
        };
        *thread.slot_mut(self.addr, self.var, id)? = value;
        Ok(Flow::Next)
    }
}

impl Executable for ExprStmt {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        thread.calc(thread.children(id)[0])?;
        thread.pop()?;
        Ok(Flow::Next)
    }
}

impl Executable for Block {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        for &stmt in thread.children(id) {
            let flow = thread.execute(stmt)?;
            if flow != Flow::Next {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }
}

impl Executable for IfStmt {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        let children = thread.children(id);
        let (branches, otherwise) = if self.has_else {
            children.split_at(children.len() - 1)
        } else {
            (children, &[][..])
        };
        for pair in branches.chunks_exact(2) {
            if condition(thread, pair[0], "if")? {
                return thread.execute(pair[1]);
            }
        }
        match otherwise.first() {
            Some(&body) => thread.execute(body),
            None => Ok(Flow::Next),
        }
    }
}

impl Executable for WhileLoop {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        let (cond, body) = (thread.children(id)[0], thread.children(id)[1]);
        while condition(thread, cond, "while")? {
            if let Some(flow) = thread.execute(body)?.through_loop() {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }
}

impl Executable for RepeatLoop {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        let (body, cond) = (thread.children(id)[0], thread.children(id)[1]);
        loop {
            if let Some(flow) = thread.execute(body)?.through_loop() {
                return Ok(flow);
            }
            if condition(thread, cond, "until")? {
                return Ok(Flow::Next);
            }
        }
    }
}

/// Number of iterations of `from a to b step s`. The full `i64` range with
/// step 1 runs 2^64 times, one more than `u64` holds.
pub(crate) fn iterations(a: i64, b: i64, s: i64) -> u128 {
    let (span, step) = (b as i128 - a as i128, s as i128);
    let mut quotient = span / step;
    if span % step != 0 && (span < 0) != (step < 0) {
        quotient -= 1;
    }
    (quotient + 1).max(0) as u128
}

impl Executable for CountedFor {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        let children = thread.children(id);
        let bound = |thread: &mut Thread<'_>, node: NodeId| -> Result<i64, RuntimeError> {
            let value = thread.value(node)?;
            value
                .as_int()
                .ok_or_else(|| Fault::BadOperand(value.type_name()).at("for", thread.at(node)))
        };
        let from = bound(thread, children[0])?;
        let to = bound(thread, children[1])?;
        let step = if self.has_step { bound(thread, children[2])? } else { 1 };
        if step == 0 {
            return Err(RuntimeError::ZeroStep { at: thread.at(id) });
        }
        let body = children[children.len() - 1];

        let count = iterations(from, to, step);
        for k in 0..count {
            let counter = (from as i128 + k as i128 * step as i128) as i64;
            if let Some((var, addr)) = self.var {
                *thread.slot_mut(addr, var, id)? = Variant::Int(counter);
            }
            if thread.options.trace_auto {
                thread.trace_line(format!("for #{} = {counter}", k + 1));
            }
            if let Some(flow) = thread.execute(body)?.through_loop() {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }
}

impl Executable for IteratedFor {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        Err(thread.unimplemented(id, "'for ... in' loops"))
    }
}

impl Executable for MethodDef {
    fn execute(&self, _id: NodeId, _thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        Ok(Flow::Next)
    }
}

impl Executable for ClassDef {
    fn execute(&self, _id: NodeId, _thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        Ok(Flow::Next)
    }
}

impl Executable for Import {
    fn execute(&self, _id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        if let Some(module) = self.module {
            thread.init_module(module)?;
        }
        Ok(Flow::Next)
    }
}

impl Executable for Return {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        thread.ret = match thread.children(id).first() {
            Some(&value) => Some(thread.value(value)?),
            None => None,
        };
        Ok(Flow::Return)
    }
}

impl Executable for Leave {
    fn execute(&self, _id: NodeId, _thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        Ok(Flow::Leave(self.depth))
    }
}

impl Executable for Continue {
    fn execute(&self, _id: NodeId, _thread: &mut Thread<'_>) -> Result<Flow, RuntimeError> {
        Ok(Flow::Continue(self.depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_counts() {
        assert_eq!(iterations(1, 10, 1), 10);
        assert_eq!(iterations(1, 10, 3), 4);
        assert_eq!(iterations(5, 1, 1), 0);
        assert_eq!(iterations(10, 1, -3), 4);
        assert_eq!(iterations(1, 10, -1), 0);
        assert_eq!(iterations(i64::MIN, i64::MAX, i64::MAX), 3);
        assert_eq!(iterations(i64::MIN, i64::MAX, 1), 1u128 << 64);
        assert_eq!(iterations(i64::MAX, i64::MIN, -1), 1u128 << 64);
    }

    #[test]
    fn loops_fold_multi_level_flow() {
        assert_eq!(Flow::Leave(1).through_loop(), Some(Flow::Next));
        assert_eq!(Flow::Leave(3).through_loop(), Some(Flow::Leave(2)));
        assert_eq!(Flow::Continue(1).through_loop(), None);
        assert_eq!(Flow::Continue(2).through_loop(), Some(Flow::Continue(1)));
        assert_eq!(Flow::Next.through_loop(), None);
        assert_eq!(Flow::Return.through_loop(), Some(Flow::Return));
        assert_eq!(Flow::Continue(2).signal(), Some(-2));
        assert_eq!(Flow::Return.signal(), None);
    }
}
