use std::collections::HashMap;

/// Interned identifier. Cheap to copy and compare; resolve through the
/// [`Interner`] that produced it.
#[repr(transparent)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Default, Debug, Clone)]
pub struct Interner {
    /// string -> id
    map: HashMap<String, Symbol>,
    /// id -> string
    vec: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.map.get(name) {
            return sym;
        }

        let sym = Symbol(self.vec.len() as u32);
        self.vec.push(name.to_string());
        self.map.insert(name.to_string(), sym);
        sym
    }

    /// Looks a name up without interning it.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.map.get(name).copied()
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.vec.get(sym.index()).map(String::as_str).unwrap_or("<?>")
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("count");
        let b = interner.intern("total");
        assert_eq!(interner.intern("count"), a);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(b), "total");
        assert_eq!(interner.get("missing"), None);
        assert_eq!(interner.len(), 2);
    }
}
