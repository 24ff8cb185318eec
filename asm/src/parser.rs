// parser.rs

use crate::ast::{Arena, Ast, MemOperand, Node, NodeId, Operand, MAX_OPERANDS};
use crate::error::{Diag, Error};
use crate::ident::{Directive, Mnemonic};
use crate::lexer::Lexer;
use crate::token::TokenKind;
use arch::reg::Reg;
use std::str::FromStr;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: Arena,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            lexer: Lexer::new(src),
            arena: Arena::new(),
        }
    }

    /// Parse the whole source. Stops at the first error.
    pub fn parse(mut self) -> Result<Ast, Diag> {
        let mut stmts = Vec::new();
        loop {
            match self.lexer.peek().kind {
                TokenKind::Newline => {
                    self.lexer.next();
                    continue;
                }
                TokenKind::Eof => break,
                _ => {}
            }
            let stmt = self.statement()?;
            stmts.push(stmt);
            self.expect_end()?;
        }
        let root = self
            .arena
            .alloc(Node::Program { stmts })
            .map_err(|e| e.at(0))?;
        Ok(Ast {
            arena: self.arena,
            root,
        })
    }

    fn statement(&mut self) -> Result<NodeId, Diag> {
        let tok = self.lexer.next();
        match tok.kind {
            TokenKind::Dot => self.directive(tok.line),
            TokenKind::Ident(name) => {
                if matches!(self.lexer.peek().kind, TokenKind::Colon) {
                    self.lexer.next();
                    let node = Node::Label {
                        name: name.to_string(),
                        line: tok.line,
                    };
                    return self.alloc(node, tok.line);
                }
                self.instruction(name, tok.line)
            }
            other => Err(unexpected("a statement", &other, tok.line)),
        }
    }

    fn instruction(&mut self, name: &str, line: u32) -> Result<NodeId, Diag> {
        let mut operands = Vec::new();
        if !self.at_end() {
            loop {
                if operands.len() >= MAX_OPERANDS {
                    return Err(Error::TooManyOperands(MAX_OPERANDS).at(line));
                }
                let id = self.operand()?;
                operands.push(id);
                // a shift amount follows its `lsl` word without a comma,
                // as in `movk x0, #1, lsl #16`
                if self.is_shift_word(id)
                    && matches!(self.lexer.peek().kind, TokenKind::Hash)
                {
                    continue;
                }
                if matches!(self.lexer.peek().kind, TokenKind::Comma) {
                    self.lexer.next();
                } else {
                    break;
                }
            }
        }
        let node = Node::Instruction {
            name: name.to_string(),
            mnemonic: Mnemonic::parse(name),
            operands,
            line,
        };
        self.alloc(node, line)
    }

    fn directive(&mut self, line: u32) -> Result<NodeId, Diag> {
        let tok = self.lexer.next();
        let name = match tok.kind {
            TokenKind::Ident(name) => name,
            other => return Err(unexpected("a directive name", &other, tok.line)),
        };
        let mut args = Vec::new();
        if !self.at_end() {
            loop {
                args.push(self.operand()?);
                if matches!(self.lexer.peek().kind, TokenKind::Comma) {
                    self.lexer.next();
                } else {
                    break;
                }
            }
        }
        let node = Node::Directive {
            name: name.to_string(),
            directive: Directive::from_str(&name.to_ascii_lowercase()).ok(),
            args,
            line,
        };
        self.alloc(node, line)
    }

    fn operand(&mut self) -> Result<NodeId, Diag> {
        let tok = self.lexer.next();
        let op = match tok.kind {
            TokenKind::Ident(name) => match Reg::parse(name) {
                Some(reg) => Operand::Reg(reg),
                None => Operand::Sym(name.to_string()),
            },
            TokenKind::Hash => {
                let imm = self.lexer.next();
                match imm.kind {
                    TokenKind::Number(value) => Operand::Imm(value),
                    other => return Err(unexpected("an immediate", &other, imm.line)),
                }
            }
            TokenKind::Number(value) => Operand::Imm(value),
            TokenKind::Str(text) => Operand::Str(text),
            TokenKind::LBracket => return self.memory_operand(tok.line),
            other => return Err(unexpected("an operand", &other, tok.line)),
        };
        self.alloc(
            Node::Operand {
                op,
                line: tok.line,
            },
            tok.line,
        )
    }

    /// `[` base (`,` (#imm | imm | Xm))? `]` (`!` | `,` #imm)?
    fn memory_operand(&mut self, line: u32) -> Result<NodeId, Diag> {
        let tok = self.lexer.next();
        let base = match tok.kind {
            TokenKind::Ident(name) => Reg::parse(name)
                .ok_or_else(|| unexpected("a base register", &TokenKind::Ident(name), tok.line))?,
            other => return Err(unexpected("a base register", &other, tok.line)),
        };

        let mut mem = MemOperand {
            base,
            index: None,
            offset: 0,
            pre: false,
            post: false,
        };
        let mut bracket_offset = false;

        if matches!(self.lexer.peek().kind, TokenKind::Comma) {
            self.lexer.next();
            bracket_offset = true;
            let tok = self.lexer.next();
            match tok.kind {
                TokenKind::Hash => {
                    let imm = self.lexer.next();
                    match imm.kind {
                        TokenKind::Number(value) => mem.offset = value,
                        other => return Err(unexpected("an offset", &other, imm.line)),
                    }
                }
                TokenKind::Number(value) => mem.offset = value,
                TokenKind::Ident(name) => {
                    let index = Reg::parse(name).ok_or_else(|| {
                        unexpected("an index register", &TokenKind::Ident(name), tok.line)
                    })?;
                    mem.index = Some(index);
                }
                other => return Err(unexpected("an offset or index register", &other, tok.line)),
            }
        }

        let tok = self.lexer.next();
        if !matches!(tok.kind, TokenKind::RBracket) {
            return Err(unexpected("`]`", &tok.kind, tok.line));
        }

        match self.lexer.peek().kind {
            TokenKind::Bang => {
                self.lexer.next();
                mem.pre = true;
            }
            TokenKind::Comma => {
                // post-index offset; the memory operand is always last
                self.lexer.next();
                if bracket_offset {
                    return Err(unexpected(
                        "end of statement",
                        &TokenKind::Comma,
                        line,
                    ));
                }
                let tok = self.lexer.next();
                let value = match tok.kind {
                    TokenKind::Hash => {
                        let imm = self.lexer.next();
                        match imm.kind {
                            TokenKind::Number(value) => value,
                            other => {
                                return Err(unexpected("a post-index offset", &other, imm.line))
                            }
                        }
                    }
                    TokenKind::Number(value) => value,
                    other => return Err(unexpected("a post-index offset", &other, tok.line)),
                };
                mem.offset = value;
                mem.post = true;
            }
            _ => {}
        }

        self.alloc(
            Node::Operand {
                op: Operand::Mem(mem),
                line,
            },
            line,
        )
    }

    fn is_shift_word(&self, id: NodeId) -> bool {
        matches!(
            self.arena.get(id),
            Node::Operand { op: Operand::Sym(name), .. } if name.eq_ignore_ascii_case("lsl")
        )
    }

    fn at_end(&mut self) -> bool {
        matches!(
            self.lexer.peek().kind,
            TokenKind::Newline | TokenKind::Eof
        )
    }

    fn expect_end(&mut self) -> Result<(), Diag> {
        let tok = self.lexer.next();
        match tok.kind {
            TokenKind::Newline | TokenKind::Eof => Ok(()),
            other => Err(unexpected("end of statement", &other, tok.line)),
        }
    }

    fn alloc(&mut self, node: Node, line: u32) -> Result<NodeId, Diag> {
        self.arena.alloc(node).map_err(|e| e.at(line))
    }
}

fn unexpected(expected: &str, found: &TokenKind, line: u32) -> Diag {
    match found {
        TokenKind::Error(msg) => Error::Lexical(msg.clone()).at(line),
        other => Error::UnexpectedToken {
            expected: expected.to_string(),
            found: other.to_string(),
        }
        .at(line),
    }
}
