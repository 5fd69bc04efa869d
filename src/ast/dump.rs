//! Indented text rendering of an AST, one line per node.
//!
//! ```text
//! a.material - 1 - material "mat1" =
//! 	diffuse = 1.0 0.5
//! ```
//!
//! Atom values of properties and objects are printed inline. Other nodes are
//! printed on their own line one tab deeper than their parent: object
//! children, then non-atom values, then overrides (prefixed with `override`).

use std::io::{self, Write};

use super::{Ast, NodeId, NodeKind};

/// Write the dump of every tree in `ast` to `out`.
pub fn dump<W: Write>(ast: &Ast, out: &mut W) -> io::Result<()> {
    // (node, depth, is_override)
    let mut stack: Vec<(NodeId, usize, bool)> =
        ast.roots().iter().rev().map(|&id| (id, 0, false)).collect();

    while let Some((id, depth, is_override)) = stack.pop() {
        let node = ast.node(id);
        let mut line = "\t".repeat(depth);
        if is_override {
            line.push_str("override ");
        }

        let mut nested: Vec<(NodeId, bool)> = Vec::new();
        match &node.kind {
            NodeKind::Atom(atom) => line.push_str(&atom.value),
            NodeKind::Property(prop) => {
                line.push_str(&prop.name);
                line.push_str(" =");
                push_inline(ast, prop.values(), &mut line, &mut nested);
            }
            NodeKind::Object(obj) => {
                line.push_str(&format!(
                    "{} - {} - {} \"{}\" =",
                    node.file, node.line, obj.cls, obj.name
                ));
                nested.extend(obj.children().iter().map(|&c| (c, false)));
                push_inline(ast, obj.values(), &mut line, &mut nested);
                nested.extend(obj.overrides().iter().map(|&c| (c, true)));
            }
        }
        writeln!(out, "{line}")?;

        for &(child, over) in nested.iter().rev() {
            stack.push((child, depth + 1, over));
        }
    }
    Ok(())
}

/// Render the dump into a string.
pub fn to_string(ast: &Ast) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = dump(ast, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn push_inline(ast: &Ast, values: &[NodeId], line: &mut String, nested: &mut Vec<(NodeId, bool)>) {
    for &v in values {
        match &ast.node(v).kind {
            NodeKind::Atom(atom) => {
                line.push(' ');
                line.push_str(&atom.value);
            }
            _ => nested.push((v, false)),
        }
    }
}
