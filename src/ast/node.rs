use super::ops::{BinaryOp, UnaryOp};
use crate::analyzer::builtins::{BuiltinFn, Member, Property};
use crate::analyzer::scope::{Address, ClassId, MethodId, SpaceId, VarId};
use crate::analyzer::types::Type;
use crate::source::PosId;
use crate::utils::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Stands in for an expression that failed to resolve.
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

// --- expressions ---

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Literal,
}

/// Children: the elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLiteral;

/// Children: key, value, key, value, ...
#[derive(Debug, Clone, PartialEq)]
pub struct MapLiteral;

#[derive(Debug, Clone, PartialEq)]
pub struct NameRef {
    pub var: VarId,
    pub addr: Address,
}

/// Children: `[object]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub name: Symbol,
    pub property: Option<Property>,
}

/// Children: `[object, index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAccess;

/// Children: `[value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub to: Type,
    pub implicit: bool,
}

/// Children: `[operand]`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
}

/// Children: `[lhs, rhs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallTarget {
    Unresolved,
    /// `link_hops` locates the callee's static link from the caller's frame;
    /// `None` when the callee is not nested in a method.
    Method {
        id: MethodId,
        link_hops: Option<u32>,
    },
    Builtin(BuiltinFn),
}

/// Children: the arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: Symbol,
    /// Space of the call site; overloads are resolved from here.
    pub site: SpaceId,
    pub target: CallTarget,
}

/// Children: `[object, args...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberCall {
    pub name: Symbol,
    pub member: Option<Member>,
}

// --- statements ---

/// Children: `[init]` or none.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub var: VarId,
    pub addr: Address,
}

/// Children: `[expr]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt;

/// Children: the statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block;

/// Children: `cond, body` for `if` and each `elif`, then the `else` body.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub has_else: bool,
}

/// Children: `[cond, body]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop;

/// Children: `[body, cond]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatLoop;

/// Children: `[from, to, step?, body]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountedFor {
    pub var: Option<(VarId, Address)>,
    pub has_step: bool,
}

/// Children: `[iterable, body]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IteratedFor {
    pub var: VarId,
    pub addr: Address,
}

/// Children: `[body]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub method: MethodId,
}

/// Children: field definitions and method definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub class: ClassId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub unit: String,
    /// `None` when the unit could not be loaded.
    pub module: Option<SpaceId>,
}

/// Children: `[value]` or none.
#[derive(Debug, Clone, PartialEq)]
pub struct Return;

#[derive(Debug, Clone, PartialEq)]
pub struct Leave {
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Continue {
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Constant(Constant),
    ListLiteral(ListLiteral),
    MapLiteral(MapLiteral),
    Name(NameRef),
    Field(FieldAccess),
    Index(IndexAccess),
    Convert(Conversion),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(CallExpr),
    MemberCall(MemberCall),

    VarDef(VarDef),
    ExprStmt(ExprStmt),
    Block(Block),
    If(IfStmt),
    While(WhileLoop),
    Repeat(RepeatLoop),
    CountedFor(CountedFor),
    IteratedFor(IteratedFor),
    MethodDef(MethodDef),
    ClassDef(ClassDef),
    Import(Import),
    Return(Return),
    Leave(Leave),
    Continue(Continue),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Constant(_) => "Constant",
            NodeKind::ListLiteral(_) => "List",
            NodeKind::MapLiteral(_) => "Map",
            NodeKind::Name(_) => "Name",
            NodeKind::Field(_) => "Field",
            NodeKind::Index(_) => "Index",
            NodeKind::Convert(_) => "Convert",
            NodeKind::Unary(_) => "Unary",
            NodeKind::Binary(_) => "Binary",
            NodeKind::Call(_) => "Call",
            NodeKind::MemberCall(_) => "MemberCall",
            NodeKind::VarDef(_) => "VarDef",
            NodeKind::ExprStmt(_) => "ExprStmt",
            NodeKind::Block(_) => "Block",
            NodeKind::If(_) => "If",
            NodeKind::While(_) => "While",
            NodeKind::Repeat(_) => "Repeat",
            NodeKind::CountedFor(_) => "For",
            NodeKind::IteratedFor(_) => "ForIn",
            NodeKind::MethodDef(_) => "MethodDef",
            NodeKind::ClassDef(_) => "ClassDef",
            NodeKind::Import(_) => "Import",
            NodeKind::Return(_) => "Return",
            NodeKind::Leave(_) => "Leave",
            NodeKind::Continue(_) => "Continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub pos: PosId,
    /// Set by the check pass.
    pub ty: Type,
}

/// Every node of a program. Children refer to each other by [`NodeId`].
#[derive(Debug, Default, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind, children: Vec<NodeId>, pos: PosId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            children,
            pos,
            ty: Type::Error,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).children.get(index).copied()
    }

    pub fn ty(&self, id: NodeId) -> Type {
        self.node(id).ty
    }

    pub fn pos(&self, id: NodeId) -> PosId {
        self.node(id).pos
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
