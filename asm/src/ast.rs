// ast.rs

use crate::error::Error;
use crate::ident::{Directive, Mnemonic};
use arch::reg::Reg;

pub const MAX_NODES: usize = 512;
pub const MAX_OPERANDS: usize = 4;

pub type NodeId = usize;

/// A memory operand as written: `[base]`, `[base, #off]`, `[base, Xm]`,
/// `[base, #off]!` or `[base], #off`. At most one of `pre`/`post` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOperand {
    pub base: Reg,
    pub index: Option<Reg>,
    pub offset: i64,
    pub pre: bool,
    pub post: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    /// A bare identifier: a label reference, or a directive word argument.
    Sym(String),
    Mem(MemOperand),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program {
        stmts: Vec<NodeId>,
    },
    Label {
        name: String,
        line: u32,
    },
    Instruction {
        /// Raw spelling, kept for diagnostics.
        name: String,
        /// Resolved at parse time; `None` defers an unknown-mnemonic error
        /// to code generation.
        mnemonic: Option<Mnemonic>,
        operands: Vec<NodeId>,
        line: u32,
    },
    Directive {
        name: String,
        /// `None` for directives the toolchain does not know; those are
        /// ignored by code generation.
        directive: Option<Directive>,
        args: Vec<NodeId>,
        line: u32,
    },
    Operand {
        op: Operand,
        line: u32,
    },
}

impl Node {
    pub fn line(&self) -> u32 {
        match self {
            Node::Program { .. } => 0,
            Node::Label { line, .. }
            | Node::Instruction { line, .. }
            | Node::Directive { line, .. }
            | Node::Operand { line, .. } => *line,
        }
    }
}

/// Fixed-capacity node pool. Nodes are only ever discarded all at once,
/// together with the pool.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(MAX_NODES),
        }
    }

    pub fn alloc(&mut self, node: Node) -> Result<NodeId, Error> {
        if self.nodes.len() >= MAX_NODES {
            return Err(Error::NodeLimit(MAX_NODES));
        }
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A parsed program: the arena plus the id of its `Program` node.
#[derive(Debug)]
pub struct Ast {
    pub arena: Arena,
    pub root: NodeId,
}

impl Ast {
    pub fn stmts(&self) -> &[NodeId] {
        match self.arena.get(self.root) {
            Node::Program { stmts } => stmts,
            _ => &[],
        }
    }

    /// Operand payload of a child node; statement nodes never appear as
    /// children, so anything else is a malformed tree.
    pub fn operand(&self, id: NodeId) -> Option<&Operand> {
        match self.arena.get(id) {
            Node::Operand { op, .. } => Some(op),
            _ => None,
        }
    }
}
