//! Symbol spaces: the nested global / module / class / method scopes the
//! parser declares into, with body-level retirement of variables.

use std::collections::HashMap;

use super::types::Type;
use crate::ast::NodeId;
use crate::source::PosId;
use crate::utils::Symbol;

macro_rules! table_id {
    ($($name:ident),*) => {$(
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    )*};
}

table_id!(SpaceId, VarId, MethodId, ClassId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceKind {
    Global,
    Module,
    Class,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarMode {
    Plain,
    Const,
    /// Re-evaluates its initializer on every read.
    Lazy,
}

/// Where a variable lives at run time, fixed while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// Module-level storage of `space`.
    Static { space: SpaceId, slot: usize },
    /// `hops` static links up from the current frame.
    Local { hops: u32, slot: usize },
    Field { slot: usize },
}

#[derive(Debug)]
pub struct Space {
    pub kind: SpaceKind,
    pub name: Symbol,
    pub parent: Option<SpaceId>,
    vars: HashMap<Symbol, VarId>,
    methods: HashMap<Symbol, Vec<MethodId>>,
    classes: HashMap<Symbol, ClassId>,
    /// Every variable ever declared here, in slot order.
    pub slots: Vec<VarId>,
    pub imports: Vec<SpaceId>,
    /// Statement list of a module or the global space.
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Symbol,
    pub ty: Type,
    pub space: SpaceId,
    pub slot: usize,
    pub pos: PosId,
    pub mode: VarMode,
    /// Line of the closing keyword that took the variable out of scope.
    pub retired_at: Option<u32>,
    /// Same-named variable of an enclosing body, visible again on retirement.
    pub shadows: Option<VarId>,
    body: BodyKey,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: Symbol,
    pub params: Vec<Type>,
    pub ret: Type,
    /// The method's own space.
    pub space: SpaceId,
    /// Space the method was declared in.
    pub parent: SpaceId,
    pub pos: PosId,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: Symbol,
    pub space: SpaceId,
    pub pos: PosId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BodyKey {
    space: SpaceId,
    serial: u32,
}

#[derive(Debug)]
struct BodyMark {
    key: BodyKey,
    live: usize,
}

#[derive(Debug)]
pub struct SymbolTable {
    spaces: Vec<Space>,
    vars: Vec<Variable>,
    methods: Vec<Method>,
    classes: Vec<Class>,
    /// Variables declared inside open bodies, oldest first.
    live: Vec<VarId>,
    marks: Vec<BodyMark>,
    serial: u32,
}

impl SymbolTable {
    pub fn new(global_name: Symbol) -> Self {
        let mut table = Self {
            spaces: Vec::new(),
            vars: Vec::new(),
            methods: Vec::new(),
            classes: Vec::new(),
            live: Vec::new(),
            marks: Vec::new(),
            serial: 0,
        };
        table.add_space(SpaceKind::Global, global_name, None);
        table
    }

    pub fn global(&self) -> SpaceId {
        SpaceId(0)
    }

    pub fn add_space(&mut self, kind: SpaceKind, name: Symbol, parent: Option<SpaceId>) -> SpaceId {
        let id = SpaceId(self.spaces.len() as u32);
        self.spaces.push(Space {
            kind,
            name,
            parent,
            vars: HashMap::new(),
            methods: HashMap::new(),
            classes: HashMap::new(),
            slots: Vec::new(),
            imports: Vec::new(),
            body: None,
        });
        id
    }

    // --- accessors ---

    pub fn space(&self, id: SpaceId) -> &Space {
        &self.spaces[id.index()]
    }

    pub fn space_mut(&mut self, id: SpaceId) -> &mut Space {
        &mut self.spaces[id.index()]
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id.index()]
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &Method)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, m)| (MethodId(i as u32), m))
    }

    pub fn frame_size(&self, space: SpaceId) -> usize {
        self.space(space).slots.len()
    }

    /// Declared types of the variables of `space`, in slot order.
    pub fn slot_types(&self, space: SpaceId) -> impl Iterator<Item = Type> + '_ {
        self.space(space).slots.iter().map(|v| self.var(*v).ty)
    }

    // --- bodies ---

    /// Starts a statement body in `space`. Variables declared until the
    /// matching [`close_body`](Self::close_body) are retired by it.
    pub fn open_body(&mut self, space: SpaceId) {
        self.serial += 1;
        self.marks.push(BodyMark {
            key: BodyKey {
                space,
                serial: self.serial,
            },
            live: self.live.len(),
        });
    }

    /// Ends the innermost body, retiring its variables at `line`. Returns
    /// the retired variables, newest first.
    pub fn close_body(&mut self, line: u32) -> Vec<VarId> {
        let Some(mark) = self.marks.pop() else {
            debug_assert!(false, "close_body without open_body");
            return Vec::new();
        };
        let retired: Vec<VarId> = self.live.drain(mark.live..).rev().collect();
        for &id in &retired {
            let var = &mut self.vars[id.index()];
            var.retired_at = Some(line);
            let (name, space, shadows) = (var.name, var.space, var.shadows);
            let map = &mut self.spaces[space.index()].vars;
            if map.get(&name) == Some(&id) {
                match shadows {
                    Some(outer) => map.insert(name, outer),
                    None => map.remove(&name),
                };
            }
        }
        retired
    }

    fn current_body(&self, space: SpaceId) -> BodyKey {
        match self.marks.last() {
            Some(mark) if mark.key.space == space => mark.key,
            _ => BodyKey { space, serial: 0 },
        }
    }

    // --- variables ---

    /// Declares `name` in `space`. A same-named variable of the same body is
    /// a duplicate and comes back as the error; one of an enclosing body is
    /// shadowed until this one retires.
    pub fn declare_var(
        &mut self,
        space: SpaceId,
        name: Symbol,
        ty: Type,
        mode: VarMode,
        pos: PosId,
    ) -> Result<VarId, VarId> {
        let body = self.current_body(space);
        let existing = self.spaces[space.index()].vars.get(&name).copied();
        if let Some(prev) = existing {
            if self.var(prev).body == body {
                return Err(prev);
            }
        }
        let id = VarId(self.vars.len() as u32);
        let slot = self.spaces[space.index()].slots.len();
        self.vars.push(Variable {
            name,
            ty,
            space,
            slot,
            pos,
            mode,
            retired_at: None,
            shadows: existing,
            body,
        });
        let target = &mut self.spaces[space.index()];
        target.slots.push(id);
        target.vars.insert(name, id);
        if body.serial != 0 {
            self.live.push(id);
        }
        Ok(id)
    }

    /// Nearest visible variable called `name`: the space itself, its imports,
    /// then the enclosing spaces.
    pub fn lookup_var(&self, from: SpaceId, name: Symbol) -> Option<VarId> {
        self.walk(from, |space| space.vars.get(&name).copied())
    }

    /// Innermost retired variable called `name` that was declared in a space
    /// visible from `from`; used to explain a failed lookup.
    pub fn retired_var(&self, from: SpaceId, name: Symbol) -> Option<VarId> {
        let mut chain = Vec::new();
        let mut cur = Some(from);
        while let Some(id) = cur {
            chain.push(id);
            cur = self.space(id).parent;
        }
        self.vars
            .iter()
            .enumerate()
            .rev()
            .find(|(_, v)| v.name == name && v.retired_at.is_some() && chain.contains(&v.space))
            .map(|(i, _)| VarId(i as u32))
    }

    pub fn address(&self, from: SpaceId, var: VarId) -> Address {
        let v = self.var(var);
        match self.space(v.space).kind {
            SpaceKind::Global | SpaceKind::Module => Address::Static {
                space: v.space,
                slot: v.slot,
            },
            SpaceKind::Class => Address::Field { slot: v.slot },
            SpaceKind::Method => Address::Local {
                hops: self.method_hops(from, v.space).unwrap_or(0),
                slot: v.slot,
            },
        }
    }

    /// Method spaces crossed walking from `from` up to `target`.
    pub fn method_hops(&self, from: SpaceId, target: SpaceId) -> Option<u32> {
        let mut hops = 0;
        let mut cur = from;
        loop {
            if cur == target {
                return Some(hops);
            }
            let space = self.space(cur);
            if space.kind == SpaceKind::Method {
                hops += 1;
            }
            cur = space.parent?;
        }
    }

    // --- methods ---

    /// Adds an overload of `name` to `space`. An overload with the same
    /// parameter types is rejected with the existing one.
    pub fn declare_method(&mut self, space: SpaceId, method: Method) -> Result<MethodId, MethodId> {
        let name = method.name;
        if let Some(list) = self.spaces[space.index()].methods.get(&name) {
            if let Some(&dup) = list.iter().find(|m| self.method(**m).params == method.params) {
                return Err(dup);
            }
        }
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(method);
        self.spaces[space.index()]
            .methods
            .entry(name)
            .or_default()
            .push(id);
        Ok(id)
    }

    /// Overload set of the nearest space (or import) that defines `name`.
    pub fn methods_named(&self, from: SpaceId, name: Symbol) -> Option<&[MethodId]> {
        self.walk(from, |space| space.methods.get(&name).map(Vec::as_slice))
    }

    // --- classes ---

    pub fn declare_class(
        &mut self,
        space: SpaceId,
        name: Symbol,
        class_space: SpaceId,
        pos: PosId,
    ) -> Result<ClassId, ClassId> {
        if let Some(&prev) = self.spaces[space.index()].classes.get(&name) {
            return Err(prev);
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(Class {
            name,
            space: class_space,
            pos,
        });
        self.spaces[space.index()].classes.insert(name, id);
        Ok(id)
    }

    pub fn lookup_class(&self, from: SpaceId, name: Symbol) -> Option<ClassId> {
        self.walk(from, |space| space.classes.get(&name).copied())
    }

    fn walk<'s, T>(&'s self, from: SpaceId, mut find: impl FnMut(&'s Space) -> Option<T>) -> Option<T> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            let space = self.space(id);
            if let Some(found) = find(space) {
                return Some(found);
            }
            for import in &space.imports {
                if let Some(found) = find(self.space(*import)) {
                    return Some(found);
                }
            }
            cur = space.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Interner;

    fn table() -> (SymbolTable, Interner) {
        let mut names = Interner::new();
        let global = names.intern("<global>");
        (SymbolTable::new(global), names)
    }

    #[test]
    fn body_variables_retire_and_unshadow() {
        let (mut t, mut names) = table();
        let g = t.global();
        let x = names.intern("x");
        let outer = t.declare_var(g, x, Type::Int, VarMode::Plain, PosId::NONE).unwrap();

        t.open_body(g);
        let inner = t.declare_var(g, x, Type::String, VarMode::Plain, PosId::NONE).unwrap();
        assert_eq!(t.lookup_var(g, x), Some(inner));
        assert_eq!(t.var(inner).shadows, Some(outer));
        assert_eq!(t.close_body(7), vec![inner]);

        assert_eq!(t.lookup_var(g, x), Some(outer));
        assert_eq!(t.var(inner).retired_at, Some(7));
        // retired variables keep their slot
        assert_eq!(t.frame_size(g), 2);
    }

    #[test]
    fn same_body_duplicate_is_rejected() {
        let (mut t, mut names) = table();
        let g = t.global();
        let y = names.intern("y");
        t.open_body(g);
        let first = t.declare_var(g, y, Type::Int, VarMode::Plain, PosId::NONE).unwrap();
        assert_eq!(t.declare_var(g, y, Type::Int, VarMode::Plain, PosId::NONE), Err(first));
        t.close_body(2);
        assert_eq!(t.lookup_var(g, y), None);
        assert!(t.retired_var(g, y).is_some());
        // a later declaration does not collide with the retired one
        assert!(t.declare_var(g, y, Type::Int, VarMode::Plain, PosId::NONE).is_ok());
    }

    #[test]
    fn local_addresses_count_method_hops() {
        let (mut t, mut names) = table();
        let g = t.global();
        let outer = t.add_space(SpaceKind::Method, names.intern("outer"), Some(g));
        let inner = t.add_space(SpaceKind::Method, names.intern("inner"), Some(outer));
        let a = names.intern("a");
        t.open_body(outer);
        let var = t.declare_var(outer, a, Type::Int, VarMode::Plain, PosId::NONE).unwrap();
        assert_eq!(t.address(outer, var), Address::Local { hops: 0, slot: 0 });
        assert_eq!(t.address(inner, var), Address::Local { hops: 1, slot: 0 });
        assert_eq!(t.lookup_var(inner, a), Some(var));
    }

    #[test]
    fn identical_signature_is_a_duplicate() {
        let (mut t, mut names) = table();
        let g = t.global();
        let f = names.intern("f");
        let method = |params: Vec<Type>, space| Method {
            name: f,
            params,
            ret: Type::Void,
            space,
            parent: g,
            pos: PosId::NONE,
            body: None,
        };
        let s1 = t.add_space(SpaceKind::Method, f, Some(g));
        let s2 = t.add_space(SpaceKind::Method, f, Some(g));
        let s3 = t.add_space(SpaceKind::Method, f, Some(g));
        let first = t.declare_method(g, method(vec![Type::Int], s1)).unwrap();
        t.declare_method(g, method(vec![Type::String], s2)).unwrap();
        assert_eq!(t.declare_method(g, method(vec![Type::Int], s3)), Err(first));
        assert_eq!(t.methods_named(g, f).map(<[_]>::len), Some(2));
    }
}
