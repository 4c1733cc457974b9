use std::fmt;

use super::scope::{ClassId, SymbolTable};
use crate::utils::Interner;

/// Static type of an expression or declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Formula,
    Class(ClassId),
    /// Checked at run time only (list elements, map values).
    Any,
    /// Already reported; suppresses follow-up errors.
    Error,
}

impl Type {
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// `Any` and `Error` are compatible with everything.
    pub fn is_open(self) -> bool {
        matches!(self, Type::Any | Type::Error)
    }

    /// The implicit promotions: Integer to Float, Bool to Integer, Bool to
    /// Float. Nothing else converts without an explicit conversion.
    pub fn promotes_to(self, target: Type) -> bool {
        matches!(
            (self, target),
            (Type::Int, Type::Float) | (Type::Bool, Type::Int) | (Type::Bool, Type::Float)
        )
    }

    pub fn accepts(self, value: Type) -> bool {
        self == value || self.is_open() || value.is_open() || value.promotes_to(self)
    }

    /// Types with an explicit `TypeName(expr)` conversion from `from`.
    pub fn converts_from(self, from: Type) -> bool {
        let scalar = |t: Type| matches!(t, Type::Bool | Type::Int | Type::Float | Type::String);
        from.is_open() || self == from || (scalar(self) && scalar(from))
    }

    pub fn display<'a>(self, symbols: &'a SymbolTable, names: &'a Interner) -> TypeDisplay<'a> {
        TypeDisplay {
            ty: self,
            symbols,
            names,
        }
    }

    pub fn builtin_name(self) -> &'static str {
        match self {
            Type::Void => "Void",
            Type::Bool => "Bool",
            Type::Int => "Integer",
            Type::Float => "Float",
            Type::String => "String",
            Type::List => "List",
            Type::Map => "Map",
            Type::Formula => "Formula",
            Type::Class(_) => "<class>",
            Type::Any => "<any>",
            Type::Error => "<error>",
        }
    }
}

pub struct TypeDisplay<'a> {
    ty: Type,
    symbols: &'a SymbolTable,
    names: &'a Interner,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Class(id) => f.write_str(self.names.resolve(self.symbols.class(id).name)),
            other => f.write_str(other.builtin_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_documented_promotions_are_implicit() {
        assert!(Type::Int.promotes_to(Type::Float));
        assert!(Type::Bool.promotes_to(Type::Int));
        assert!(Type::Bool.promotes_to(Type::Float));
        assert!(!Type::Float.promotes_to(Type::Int));
        assert!(!Type::Int.promotes_to(Type::Bool));
        assert!(!Type::Int.promotes_to(Type::String));
        assert!(Type::Float.accepts(Type::Int));
        assert!(!Type::String.accepts(Type::Int));
        assert!(Type::String.accepts(Type::Any));
    }
}
