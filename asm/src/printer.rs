// printer.rs
//
// Structural inverse of the parser: renders an AST back to source text.
// Whitespace and register aliases are normalized, so the output is not
// byte-identical to the input, but re-parsing it yields an equivalent tree.

use crate::ast::{Ast, MemOperand, Node, NodeId, Operand};
use crate::error::{Diag, Error};

pub const PRINT_CAPACITY: usize = 16 * 1024;

pub fn print(ast: &Ast) -> Result<String, Diag> {
    print_with_capacity(ast, PRINT_CAPACITY)
}

pub fn print_with_capacity(ast: &Ast, capacity: usize) -> Result<String, Diag> {
    let mut out = String::new();
    for &id in ast.stmts() {
        let node = ast.arena.get(id);
        match node {
            Node::Label { name, .. } => {
                out.push_str(name);
                out.push_str(":\n");
            }
            Node::Instruction {
                name,
                mnemonic,
                operands,
                ..
            } => {
                out.push_str("    ");
                match mnemonic {
                    Some(m) => out.push_str(&m.to_string()),
                    None => out.push_str(&name.to_ascii_lowercase()),
                }
                render_operands(ast, operands, true, &mut out);
                out.push('\n');
            }
            Node::Directive { name, args, .. } => {
                out.push_str("    .");
                out.push_str(&name.to_ascii_lowercase());
                render_operands(ast, args, false, &mut out);
                out.push('\n');
            }
            _ => {}
        }
        if out.len() > capacity {
            return Err(Error::PrintOverflow(capacity).at(node.line()));
        }
    }
    Ok(out)
}

/// `hash_imm` selects `#42` (instruction operands) over `42` (directive args).
fn render_operands(ast: &Ast, ids: &[NodeId], hash_imm: bool, out: &mut String) {
    let mut after_shift_word = false;
    for (i, &id) in ids.iter().enumerate() {
        // the amount of a `lsl #n` pair follows its word with no comma
        out.push_str(if i == 0 || after_shift_word { " " } else { ", " });
        if let Some(op) = ast.operand(id) {
            render_operand(op, hash_imm, out);
            after_shift_word =
                matches!(op, Operand::Sym(name) if name.eq_ignore_ascii_case("lsl"));
        }
    }
}

fn render_operand(op: &Operand, hash_imm: bool, out: &mut String) {
    match op {
        Operand::Reg(reg) => out.push_str(&reg.to_string()),
        Operand::Imm(value) => {
            if hash_imm {
                out.push('#');
            }
            out.push_str(&value.to_string());
        }
        Operand::Sym(name) => out.push_str(name),
        Operand::Str(text) => {
            out.push('"');
            for ch in text.chars() {
                match ch {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    '\0' => out.push_str("\\0"),
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
        Operand::Mem(mem) => render_mem(mem, out),
    }
}

fn render_mem(mem: &MemOperand, out: &mut String) {
    out.push('[');
    out.push_str(&mem.base.to_string());
    if let Some(index) = mem.index {
        out.push_str(", ");
        out.push_str(&index.to_string());
    } else if mem.offset != 0 && !mem.post {
        out.push_str(", #");
        out.push_str(&mem.offset.to_string());
    }
    out.push(']');
    if mem.pre {
        out.push('!');
    }
    if mem.post {
        out.push_str(", #");
        out.push_str(&mem.offset.to_string());
    }
}
