use super::native::{Fault, element_mut};
use super::{RuntimeError, Thread, Variant, locate};
use crate::analyzer::scope::{Address, MethodId, SpaceId, VarId, VarMode};
use crate::ast::{NodeId, NodeKind};

/// Activation record of one method call.
#[derive(Debug, Clone)]
pub struct Frame {
    pub space: SpaceId,
    pub method: MethodId,
    pub slots: Vec<Variant>,
    /// Frame of the lexically enclosing method, for nested methods.
    pub link: Option<usize>,
}

/// A writable location: a variable plus the index keys leading into it,
/// already evaluated.
pub(crate) struct Place {
    addr: Address,
    var: VarId,
    root: NodeId,
    keys: Vec<(Variant, NodeId)>,
}

impl Thread<'_> {
    pub(crate) fn ensure_statics(&mut self, space: SpaceId) {
        if self.statics.contains_key(&space) {
            return;
        }
        let symbols = self.symbols;
        let slots = symbols
            .slot_types(space)
            .map(|ty| Variant::default_for(ty, symbols))
            .collect();
        self.statics.insert(space, slots);
    }

    /// Frame `hops` static links up from the running one.
    pub(crate) fn frame_at(&self, hops: u32) -> Option<usize> {
        let mut index = self.fp?;
        for _ in 0..hops {
            index = self.frames.get(index)?.link?;
        }
        Some(index)
    }

    pub(crate) fn slot_mut(&mut self, addr: Address, var: VarId, node: NodeId) -> Result<&mut Variant, RuntimeError> {
        let (symbols, names, map, ast) = (self.symbols, self.names, self.map, self.ast);
        let found = match addr {
            Address::Static { space, slot } => {
                self.ensure_statics(space);
                self.statics.get_mut(&space).and_then(|slots| slots.get_mut(slot))
            }
            Address::Local { hops, slot } => match self.frame_at(hops) {
                Some(index) => self.frames.get_mut(index).and_then(|f| f.slots.get_mut(slot)),
                None => None,
            },
            Address::Field { .. } => {
                return Err(RuntimeError::Unimplemented {
                    what: "field access".into(),
                    at: locate(map, ast, node),
                });
            }
        };
        found.ok_or_else(|| {
            let name = names.resolve(symbols.var(var).name).to_string();
            let at = locate(map, ast, node);
            log::error!("{at}: unresolved variable '{name}' at {addr:?}");
            RuntimeError::Unresolved { name, at }
        })
    }

    /// Evaluates the index keys of `node` in source order. `None` when
    /// `node` is not a variable or an index chain over one.
    pub(crate) fn place_of(&mut self, node: NodeId) -> Result<Option<Place>, RuntimeError> {
        let ast = self.ast;
        let mut chain = Vec::new();
        let mut cur = node;
        loop {
            match ast.kind(cur) {
                NodeKind::Index(_) => {
                    chain.push(cur);
                    cur = ast.children(cur)[0];
                }
                NodeKind::Name(name) => {
                    if self.symbols.var(name.var).mode == VarMode::Lazy {
                        return Ok(None);
                    }
                    let mut keys = Vec::with_capacity(chain.len());
                    for &index in chain.iter().rev() {
                        let key = self.value(ast.children(index)[1])?;
                        keys.push((key, index));
                    }
                    return Ok(Some(Place {
                        addr: name.addr,
                        var: name.var,
                        root: cur,
                        keys,
                    }));
                }
                NodeKind::Field(_) => return Err(self.unimplemented(cur, "field access")),
                _ => return Ok(None),
            }
        }
    }

    /// The storage `place` denotes. With `insert`, a missing last map key is
    /// created.
    pub(crate) fn resolve(&mut self, place: &Place, insert: bool) -> Result<&mut Variant, RuntimeError> {
        let (map, ast) = (self.map, self.ast);
        let mut slot = self.slot_mut(place.addr, place.var, place.root)?;
        let last = place.keys.len().saturating_sub(1);
        for (i, (key, node)) in place.keys.iter().enumerate() {
            slot = element_mut(slot, key, insert && i == last)
                .map_err(|fault: Fault| fault.at("[]", locate(map, ast, *node)))?;
        }
        Ok(slot)
    }

    /// Pushes a frame for `method`, seeding its parameters with `args`.
    pub(crate) fn push_frame(
        &mut self,
        method: MethodId,
        link: Option<usize>,
        args: Vec<Variant>,
        call: NodeId,
    ) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.options.max_depth {
            return Err(RuntimeError::StackOverflow {
                depth: self.frames.len(),
                at: self.at(call),
            });
        }
        let symbols = self.symbols;
        let space = symbols.method(method).space;
        let mut slots: Vec<Variant> = symbols
            .slot_types(space)
            .map(|ty| Variant::default_for(ty, symbols))
            .collect();
        for (slot, arg) in slots.iter_mut().zip(args) {
            *slot = arg;
        }
        self.frames.push(Frame {
            space,
            method,
            slots,
            link,
        });
        Ok(())
    }

    /// Runs `method` in a fresh frame and returns its result, or the default
    /// of its return type when the body ends without `return`.
    pub(crate) fn invoke(
        &mut self,
        method: MethodId,
        link: Option<usize>,
        args: Vec<Variant>,
        call: NodeId,
    ) -> Result<Variant, RuntimeError> {
        let symbols = self.symbols;
        let decl = symbols.method(method);
        let Some(body) = decl.body else {
            return Err(self.unimplemented(call, "calling a method without a body"));
        };
        if self.tracing() {
            let args: Vec<String> = args.iter().map(Variant::to_string).collect();
            let name = self.names.resolve(decl.name);
            self.trace_line(format!("call {name}({})", args.join(", ")));
        }
        self.push_frame(method, link, args, call)?;
        let saved = self.fp.replace(self.frames.len() - 1);
        self.ret = None;
        let flow = self.execute(body);
        self.fp = saved;
        self.pop_frame();
        flow?;
        Ok(self
            .ret
            .take()
            .unwrap_or_else(|| Variant::default_for(decl.ret, symbols)))
    }

    pub(crate) fn pop_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if self.options.trace_locals {
            let symbols = self.symbols;
            let locals: Vec<String> = symbols
                .space(frame.space)
                .slots
                .iter()
                .zip(&frame.slots)
                .map(|(var, value)| format!("{}={value}", self.names.resolve(symbols.var(*var).name)))
                .collect();
            let method = self.names.resolve(symbols.method(frame.method).name);
            self.trace_line(format!("leave {method}: {}", locals.join(", ")));
        }
    }
}
