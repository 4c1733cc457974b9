use std::fmt::Write;

use super::node::{Ast, Literal, NodeId, NodeKind};
use crate::analyzer::scope::{SymbolTable, VarMode};
use crate::analyzer::types::Type;
use crate::utils::Interner;

/// Indented structural trace of the tree under `root`, one node per line.
///
/// ```text
/// Block
///   ExprStmt
///     Binary + : Integer
///       Constant 2 : Integer
///       Binary * : Integer
/// ```
pub fn dump(ast: &Ast, root: NodeId, symbols: &SymbolTable, names: &Interner) -> String {
    let mut out = String::new();
    let mut pending = vec![(root, 0usize)];
    while let Some((id, depth)) = pending.pop() {
        let node = ast.node(id);
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&label(&node.kind, symbols, names));
        if is_expression(&node.kind) && node.ty != Type::Error {
            let _ = write!(out, " : {}", node.ty.display(symbols, names));
        }
        out.push('\n');
        for child in node.children.iter().rev() {
            pending.push((*child, depth + 1));
        }
    }
    out
}

fn is_expression(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Constant(_)
            | NodeKind::ListLiteral(_)
            | NodeKind::MapLiteral(_)
            | NodeKind::Name(_)
            | NodeKind::Field(_)
            | NodeKind::Index(_)
            | NodeKind::Convert(_)
            | NodeKind::Unary(_)
            | NodeKind::Binary(_)
            | NodeKind::Call(_)
            | NodeKind::MemberCall(_)
    )
}

fn label(kind: &NodeKind, symbols: &SymbolTable, names: &Interner) -> String {
    let ty = |t: Type| t.display(symbols, names).to_string();
    match kind {
        NodeKind::Constant(c) => match &c.value {
            Literal::Undefined => "Constant undefined".to_string(),
            Literal::Bool(b) => format!("Constant {b}"),
            Literal::Int(i) => format!("Constant {i}"),
            Literal::Float(f) => format!("Constant {f:?}"),
            Literal::Str(s) => format!("Constant {s:?}"),
        },
        NodeKind::Name(n) => format!("Name {}", names.resolve(symbols.var(n.var).name)),
        NodeKind::Field(f) => format!("Field .{}", names.resolve(f.name)),
        NodeKind::Convert(c) if c.implicit => format!("Convert {} (implicit)", ty(c.to)),
        NodeKind::Convert(c) => format!("Convert {}", ty(c.to)),
        NodeKind::Unary(u) if u.op.is_postfix() => format!("Unary {} (postfix)", u.op.symbol()),
        NodeKind::Unary(u) => format!("Unary {}", u.op.symbol()),
        NodeKind::Binary(b) => format!("Binary {}", b.op.symbol()),
        NodeKind::Call(c) => format!("Call {}", names.resolve(c.name)),
        NodeKind::MemberCall(m) => format!("MemberCall .{}", names.resolve(m.name)),
        NodeKind::VarDef(d) => {
            let var = symbols.var(d.var);
            let mode = match var.mode {
                VarMode::Plain => "",
                VarMode::Const => "const ",
                VarMode::Lazy => "lazy ",
            };
            format!("VarDef {mode}{}: {}", names.resolve(var.name), ty(var.ty))
        }
        NodeKind::CountedFor(f) => match f.var {
            Some((var, _)) => format!("For {}", names.resolve(symbols.var(var).name)),
            None => "For".to_string(),
        },
        NodeKind::IteratedFor(f) => format!("ForIn {}", names.resolve(symbols.var(f.var).name)),
        NodeKind::MethodDef(m) => {
            let method = symbols.method(m.method);
            let params: Vec<String> = method.params.iter().map(|p| ty(*p)).collect();
            format!(
                "MethodDef {}({}): {}",
                names.resolve(method.name),
                params.join(", "),
                ty(method.ret)
            )
        }
        NodeKind::ClassDef(c) => format!("ClassDef {}", names.resolve(symbols.class(c.class).name)),
        NodeKind::Import(i) => format!("Import {}", i.unit),
        NodeKind::Leave(l) => format!("Leave {}", l.depth),
        NodeKind::Continue(c) => format!("Continue {}", c.depth),
        other => other.name().to_string(),
    }
}
