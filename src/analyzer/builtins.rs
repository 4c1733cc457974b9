//! Registry of the built-in classes, functions and members. Built once per
//! [`Context`](crate::context::Context) and shared by the parser, the check
//! pass and the VM.

use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFn {
    /// Writes its arguments as one line to the output sink.
    Print,
    Assert,
}

impl BuiltinFn {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFn::Print => "print",
            BuiltinFn::Assert => "assert",
        }
    }

    /// `None` for variadic functions.
    pub fn params(self) -> Option<&'static [Type]> {
        match self {
            BuiltinFn::Print => None,
            BuiltinFn::Assert => Some(&[Type::Bool]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Size,
    Push,
    Pop,
    Has,
    Remove,
}

impl Member {
    pub fn name(self) -> &'static str {
        match self {
            Member::Size => "size",
            Member::Push => "push",
            Member::Pop => "pop",
            Member::Has => "has",
            Member::Remove => "remove",
        }
    }

    /// Members that change the receiver need it to be assignable.
    pub fn mutates(self) -> bool {
        matches!(self, Member::Push | Member::Pop | Member::Remove)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Size,
    Empty,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Size => "size",
            Property::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSig {
    pub member: Member,
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Debug)]
pub struct Builtins {
    classes: Vec<(&'static str, Type)>,
    functions: Vec<BuiltinFn>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let classes = [
            Type::Int,
            Type::Float,
            Type::Bool,
            Type::String,
            Type::List,
            Type::Map,
            Type::Void,
            Type::Formula,
        ];
        Self {
            classes: classes.iter().map(|t| (t.builtin_name(), *t)).collect(),
            functions: vec![BuiltinFn::Print, BuiltinFn::Assert],
        }
    }

    pub fn class(&self, name: &str) -> Option<Type> {
        self.classes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.classes.iter().map(|(n, _)| *n)
    }

    pub fn function(&self, name: &str) -> Option<BuiltinFn> {
        self.functions.iter().copied().find(|f| f.name() == name)
    }

    pub fn member(&self, receiver: Type, name: &str) -> Option<MemberSig> {
        let sig = |member, params: &[Type], ret| MemberSig {
            member,
            params: params.to_vec(),
            ret,
        };
        let any = receiver.is_open();
        match name {
            "size" if any || matches!(receiver, Type::String | Type::List | Type::Map) => {
                Some(sig(Member::Size, &[], Type::Int))
            }
            "push" if any || receiver == Type::List => Some(sig(Member::Push, &[Type::Any], Type::Void)),
            "pop" if any || receiver == Type::List => Some(sig(Member::Pop, &[], Type::Any)),
            "has" if any || receiver == Type::Map => Some(sig(Member::Has, &[Type::Any], Type::Bool)),
            "remove" if any || receiver == Type::Map => {
                Some(sig(Member::Remove, &[Type::Any], Type::Any))
            }
            _ => None,
        }
    }

    pub fn property(&self, receiver: Type, name: &str) -> Option<(Property, Type)> {
        let sized = receiver.is_open() || matches!(receiver, Type::String | Type::List | Type::Map);
        match name {
            "size" if sized => Some((Property::Size, Type::Int)),
            "empty" if sized => Some((Property::Empty, Type::Bool)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_every_builtin_class() {
        let b = Builtins::new();
        let names: Vec<&str> = b.class_names().collect();
        assert_eq!(
            names,
            ["Integer", "Float", "Bool", "String", "List", "Map", "Void", "Formula"]
        );
        assert_eq!(b.class("Integer"), Some(Type::Int));
        assert_eq!(b.class("Int"), None);
    }

    #[test]
    fn members_depend_on_receiver() {
        let b = Builtins::new();
        assert_eq!(b.member(Type::List, "push").map(|s| s.member), Some(Member::Push));
        assert!(b.member(Type::Map, "push").is_none());
        assert_eq!(b.member(Type::Map, "has").map(|s| s.ret), Some(Type::Bool));
        assert!(b.property(Type::Int, "size").is_none());
        assert_eq!(b.property(Type::String, "empty"), Some((Property::Empty, Type::Bool)));
    }
}
