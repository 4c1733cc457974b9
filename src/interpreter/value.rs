use std::collections::BTreeMap;
use std::fmt;

use crate::analyzer::scope::{ClassId, SymbolTable};
use crate::analyzer::types::Type;
use crate::ast::NodeId;

/// Runtime value. Objects are owned by the slot holding them: `clone` is a
/// deep copy, and assignment never aliases.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variant {
    #[default]
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Object(Object),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Str(String),
    List(Vec<Variant>),
    Map(BTreeMap<MapKey, Variant>),
    /// Unevaluated expression; lazy variables hold one.
    Formula(NodeId),
    Instance(Instance),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub class: ClassId,
    pub fields: Vec<Variant>,
}

/// The values a map can be keyed by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl MapKey {
    pub fn from_variant(value: &Variant) -> Option<Self> {
        match value {
            Variant::Bool(b) => Some(MapKey::Bool(*b)),
            Variant::Int(n) => Some(MapKey::Int(*n)),
            Variant::Object(Object::Str(s)) => Some(MapKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn into_variant(self) -> Variant {
        match self {
            MapKey::Bool(b) => Variant::Bool(b),
            MapKey::Int(n) => Variant::Int(n),
            MapKey::Str(s) => Variant::str(s),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::Int(n) => write!(f, "{n}"),
            MapKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl Variant {
    pub fn str(text: impl Into<String>) -> Self {
        Variant::Object(Object::Str(text.into()))
    }

    pub fn list(items: Vec<Variant>) -> Self {
        Variant::Object(Object::List(items))
    }

    /// Initial value of a variable of type `ty`. A class-typed variable
    /// gets a fresh instance whose own class-typed fields start undefined,
    /// so self-referential classes construct in one step.
    pub fn default_for(ty: Type, symbols: &SymbolTable) -> Self {
        match ty {
            Type::Bool => Variant::Bool(false),
            Type::Int => Variant::Int(0),
            Type::Float => Variant::Float(0.0),
            Type::String => Variant::str(""),
            Type::List => Variant::list(Vec::new()),
            Type::Map => Variant::Object(Object::Map(BTreeMap::new())),
            Type::Class(class) => {
                let space = symbols.class(class).space;
                let fields = symbols
                    .slot_types(space)
                    .map(|t| match t {
                        Type::Class(_) => Variant::Undefined,
                        t => Variant::default_for(t, symbols),
                    })
                    .collect();
                Variant::Object(Object::Instance(Instance { class, fields }))
            }
            Type::Void | Type::Formula | Type::Any | Type::Error => Variant::Undefined,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Undefined => "Undefined",
            Variant::Bool(_) => "Bool",
            Variant::Int(_) => "Integer",
            Variant::Float(_) => "Float",
            Variant::Object(Object::Str(_)) => "String",
            Variant::Object(Object::List(_)) => "List",
            Variant::Object(Object::Map(_)) => "Map",
            Variant::Object(Object::Formula(_)) => "Formula",
            Variant::Object(Object::Instance(_)) => "Object",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Variant::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Object(Object::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Element count of strings, lists and maps.
    pub fn size(&self) -> Option<usize> {
        match self {
            Variant::Object(Object::Str(s)) => Some(s.chars().count()),
            Variant::Object(Object::List(items)) => Some(items.len()),
            Variant::Object(Object::Map(map)) => Some(map.len()),
            _ => None,
        }
    }
}

impl From<i64> for Variant {
    fn from(n: i64) -> Self {
        Variant::Int(n)
    }
}

impl From<f64> for Variant {
    fn from(x: f64) -> Self {
        Variant::Float(x)
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Variant::Bool(b)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::str(s)
    }
}

/// Strings print bare at the top level and quoted inside containers.
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Object(Object::Str(s)) => f.write_str(s),
            other => write_nested(other, f),
        }
    }
}

fn write_nested(value: &Variant, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Variant::Undefined => f.write_str("undefined"),
        Variant::Bool(b) => write!(f, "{b}"),
        Variant::Int(n) => write!(f, "{n}"),
        Variant::Float(x) => write!(f, "{x:?}"),
        Variant::Object(Object::Str(s)) => write!(f, "{s:?}"),
        Variant::Object(Object::List(items)) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(item, f)?;
            }
            f.write_str("]")
        }
        Variant::Object(Object::Map(map)) => {
            f.write_str("{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: ")?;
                write_nested(item, f)?;
            }
            f.write_str("}")
        }
        Variant::Object(Object::Formula(_)) => f.write_str("<formula>"),
        Variant::Object(Object::Instance(_)) => f.write_str("<object>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_nested_strings_only() {
        let value = Variant::list(vec![Variant::from(1), Variant::from("a"), Variant::from(2.5)]);
        assert_eq!(value.to_string(), r#"[1, "a", 2.5]"#);
        assert_eq!(Variant::from("plain").to_string(), "plain");
        assert_eq!(Variant::Float(2.0).to_string(), "2.0");
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let original = Variant::list(vec![Variant::from(1)]);
        let mut copy = original.clone();
        if let Variant::Object(Object::List(items)) = &mut copy {
            items.push(Variant::from(2));
        }
        assert_eq!(original.size(), Some(1));
        assert_eq!(copy.size(), Some(2));
    }
}
