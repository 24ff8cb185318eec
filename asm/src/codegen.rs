// codegen.rs

use crate::ast::{Ast, MemOperand, Node, NodeId, Operand};
use crate::error::{Diag, Error};
use crate::ident::{Directive, Mnemonic};
use arch::insn::{AddrMode, ArithOp, Barrier, Hint, Insn, LogicOp, MemOp, PairMode, ShiftOp};
use arch::reg::{Reg, ZR};
use indexmap::map::Entry;
use indexmap::IndexMap;

pub const CODE_CAPACITY: usize = 4096;
pub const MAX_SYMBOL_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub addr: i64,
    pub defined: bool,
    pub global: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Second,
}

/// Section tag; tracked but not used for layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Text,
    Data,
    Bss,
}

/// Two-pass code generator. Pass 1 sizes every statement and records label
/// addresses without emitting a byte; pass 2 emits and requires every symbol
/// reference to resolve.
pub struct CodeGen {
    symbols: IndexMap<String, Symbol>,
    code: Vec<u8>,
    offset: usize,
    section: Section,
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        Self {
            symbols: IndexMap::new(),
            code: Vec::with_capacity(CODE_CAPACITY),
            offset: 0,
            section: Section::Text,
        }
    }

    /// Discard all state from a previous run.
    pub fn reset(&mut self) {
        self.symbols.clear();
        self.code.clear();
        self.offset = 0;
        self.section = Section::Text;
    }

    pub fn generate(&mut self, ast: &Ast) -> Result<(), Diag> {
        self.reset();
        self.run_pass(ast, Pass::First)?;
        self.offset = 0;
        self.section = Section::Text;
        self.run_pass(ast, Pass::Second)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    // ------------------------------------------------------------------------

    fn run_pass(&mut self, ast: &Ast, pass: Pass) -> Result<(), Diag> {
        for &id in ast.stmts() {
            match ast.arena.get(id) {
                Node::Label { name, line } => {
                    if pass == Pass::First {
                        self.define(name, self.offset as i64, *line)?;
                    }
                }
                Node::Directive {
                    directive, args, line, ..
                } => self.directive(ast, *directive, args, *line, pass)?,
                Node::Instruction {
                    name,
                    mnemonic,
                    operands,
                    line,
                } => self.instruction(ast, name, *mnemonic, operands, *line, pass)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn define(&mut self, name: &str, addr: i64, line: u32) -> Result<(), Diag> {
        if name.len() > MAX_SYMBOL_LEN {
            return Err(Error::SymbolTooLong(name.to_string()).at(line));
        }
        match self.symbols.entry(name.to_string()) {
            Entry::Occupied(mut e) => {
                let sym = e.get_mut();
                if sym.defined {
                    return Err(Error::DuplicateSymbol(name.to_string()).at(line));
                }
                sym.defined = true;
                sym.addr = addr;
            }
            Entry::Vacant(v) => {
                v.insert(Symbol {
                    name: name.to_string(),
                    addr,
                    defined: true,
                    global: false,
                });
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).filter(|s| s.defined).map(|s| s.addr)
    }

    /// A symbol or immediate value. Pass 1 substitutes the current offset for
    /// symbols not yet known, so sizing never depends on resolution.
    fn resolve(&self, op: &Operand, pass: Pass, line: u32) -> Result<i64, Diag> {
        match op {
            Operand::Imm(v) => Ok(*v),
            Operand::Sym(name) => match self.lookup(name) {
                Some(addr) => Ok(addr),
                None if pass == Pass::First => Ok(self.offset as i64),
                None => Err(Error::UndefinedSymbol(name.clone()).at(line)),
            },
            _ => Err(Error::OperandMismatch("symbol reference".into()).at(line)),
        }
    }

    // ------------------------------------------------------------------------
    // Emission

    fn emit_byte(&mut self, byte: u8, pass: Pass, line: u32) -> Result<(), Diag> {
        if self.offset >= CODE_CAPACITY {
            return Err(Error::BufferOverflow(CODE_CAPACITY).at(line));
        }
        if pass == Pass::Second {
            self.code.push(byte);
        }
        self.offset += 1;
        Ok(())
    }

    fn emit_int(&mut self, value: i64, width: usize, pass: Pass, line: u32) -> Result<(), Diag> {
        for i in 0..width {
            self.emit_byte((value >> (i * 8)) as u8, pass, line)?;
        }
        Ok(())
    }

    fn emit_word(&mut self, word: u32, pass: Pass, line: u32) -> Result<(), Diag> {
        self.emit_int(word as i64, 4, pass, line)
    }

    fn pad_to(&mut self, boundary: usize, pass: Pass, line: u32) -> Result<(), Diag> {
        if boundary == 0 {
            return Ok(());
        }
        while self.offset % boundary != 0 {
            self.emit_byte(0, pass, line)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Directives

    fn directive(
        &mut self,
        ast: &Ast,
        directive: Option<Directive>,
        args: &[NodeId],
        line: u32,
        pass: Pass,
    ) -> Result<(), Diag> {
        // Unknown directives are ignored, not errors.
        let Some(directive) = directive else {
            return Ok(());
        };
        let arg = |i: usize| -> Option<&Operand> { args.get(i).and_then(|&id| ast.operand(id)) };
        let bad = || Error::OperandMismatch(format!(".{directive}")).at(line);

        match directive {
            Directive::Text => self.section = Section::Text,
            Directive::Data => self.section = Section::Data,
            Directive::Bss => self.section = Section::Bss,
            Directive::Global => {
                if pass == Pass::First {
                    let Some(Operand::Sym(name)) = arg(0) else {
                        return Err(bad());
                    };
                    self.symbols
                        .entry(name.clone())
                        .or_insert_with(|| Symbol {
                            name: name.clone(),
                            addr: 0,
                            defined: false,
                            global: false,
                        })
                        .global = true;
                }
            }
            Directive::Align => {
                let Some(&Operand::Imm(n)) = arg(0) else {
                    return Err(bad());
                };
                if !(0..=12).contains(&n) {
                    return Err(Error::ImmRange(n).at(line));
                }
                self.pad_to(1usize << n, pass, line)?;
            }
            Directive::Balign => {
                let Some(&Operand::Imm(n)) = arg(0) else {
                    return Err(bad());
                };
                if !(1..=4096).contains(&n) {
                    return Err(Error::ImmRange(n).at(line));
                }
                self.pad_to(n as usize, pass, line)?;
            }
            Directive::Byte => self.emit_values(ast, args, 1, line, pass)?,
            Directive::Hword => self.emit_values(ast, args, 2, line, pass)?,
            Directive::Word => self.emit_values(ast, args, 4, line, pass)?,
            Directive::Quad => self.emit_values(ast, args, 8, line, pass)?,
            Directive::Space => {
                let Some(&Operand::Imm(n)) = arg(0) else {
                    return Err(bad());
                };
                if n < 0 {
                    return Err(Error::ImmRange(n).at(line));
                }
                let fill = match arg(1) {
                    Some(&Operand::Imm(f)) => f as u8,
                    None => 0,
                    Some(_) => return Err(bad()),
                };
                for _ in 0..n {
                    self.emit_byte(fill, pass, line)?;
                }
            }
            Directive::Ascii | Directive::Asciz => {
                if args.is_empty() {
                    return Err(bad());
                }
                for i in 0..args.len() {
                    let Some(Operand::Str(text)) = arg(i) else {
                        return Err(bad());
                    };
                    let bytes: Vec<u8> = text.bytes().collect();
                    for b in bytes {
                        self.emit_byte(b, pass, line)?;
                    }
                    if directive == Directive::Asciz {
                        self.emit_byte(0, pass, line)?;
                    }
                }
            }
            Directive::Equ => {
                if pass == Pass::First {
                    let Some(Operand::Sym(name)) = arg(0) else {
                        return Err(bad());
                    };
                    let Some(&Operand::Imm(value)) = arg(1) else {
                        return Err(bad());
                    };
                    let name = name.clone();
                    self.define(&name, value, line)?;
                }
            }
        }
        Ok(())
    }

    fn emit_values(
        &mut self,
        ast: &Ast,
        args: &[NodeId],
        width: usize,
        line: u32,
        pass: Pass,
    ) -> Result<(), Diag> {
        for &id in args {
            let Some(op) = ast.operand(id) else {
                return Err(Error::OperandMismatch("data directive".into()).at(line));
            };
            let value = self.resolve(op, pass, line)?;
            self.emit_int(value, width, pass, line)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Instructions

    fn instruction(
        &mut self,
        ast: &Ast,
        name: &str,
        mnemonic: Option<Mnemonic>,
        operands: &[NodeId],
        line: u32,
        pass: Pass,
    ) -> Result<(), Diag> {
        let Some(mnemonic) = mnemonic else {
            return Err(Error::UnknownMnemonic(name.to_string()).at(line));
        };
        let ops: Vec<&Operand> = operands
            .iter()
            .filter_map(|&id| ast.operand(id))
            .collect();
        let insn = self.encode(name, mnemonic, &ops, line, pass)?;
        self.emit_word(insn.encode(), pass, line)
    }

    fn encode(
        &mut self,
        name: &str,
        mnemonic: Mnemonic,
        ops: &[&Operand],
        line: u32,
        pass: Pass,
    ) -> Result<Insn, Diag> {
        use Mnemonic as M;
        let bad = || Error::OperandMismatch(name.to_string()).at(line);

        match mnemonic {
            M::Mov => {
                let (rd, src) = two(ops).ok_or_else(bad)?;
                let rd = reg(rd).ok_or_else(bad)?;
                match src {
                    Operand::Reg(rm) => Ok(Insn::LogicReg {
                        op: LogicOp::Orr,
                        invert: false,
                        width: rd.width,
                        rd: rd.num,
                        rn: ZR,
                        rm: rm.num,
                    }),
                    &Operand::Imm(value) => mov_imm(rd, value, line),
                    _ => Err(bad()),
                }
            }
            M::Movz | M::Movn | M::Movk => mov_wide(name, mnemonic, ops, line),
            M::Add | M::Adds | M::Sub | M::Subs => {
                let (rd, rn, src) = three_or_two(ops).ok_or_else(bad)?;
                let rd = reg(rd).ok_or_else(bad)?;
                let rn = reg(rn).ok_or_else(bad)?;
                let op = match mnemonic {
                    M::Add => ArithOp::Add,
                    M::Adds => ArithOp::Adds,
                    M::Sub => ArithOp::Sub,
                    _ => ArithOp::Subs,
                };
                arith(op, rd, rn.num, src, line, bad)
            }
            M::Cmp | M::Cmn => {
                let (rn, src) = two(ops).ok_or_else(bad)?;
                let rn = reg(rn).ok_or_else(bad)?;
                let op = if mnemonic == M::Cmp {
                    ArithOp::Subs
                } else {
                    ArithOp::Adds
                };
                arith(op, Reg { num: ZR, width: rn.width }, rn.num, src, line, bad)
            }
            M::Neg => {
                let (rd, src) = two(ops).ok_or_else(bad)?;
                let rd = reg(rd).ok_or_else(bad)?;
                arith(ArithOp::Sub, rd, ZR, src, line, bad)
            }
            M::And | M::Ands | M::Orr | M::Eor | M::Bic | M::Orn => {
                let (rd, rn, src) = three_or_two(ops).ok_or_else(bad)?;
                let rd = reg(rd).ok_or_else(bad)?;
                let rn = reg(rn).ok_or_else(bad)?;
                let (op, invert) = match mnemonic {
                    M::And => (LogicOp::And, false),
                    M::Ands => (LogicOp::Ands, false),
                    M::Orr => (LogicOp::Orr, false),
                    M::Eor => (LogicOp::Eor, false),
                    M::Bic => (LogicOp::And, true),
                    _ => (LogicOp::Orr, true),
                };
                logic(op, invert, rd, rn.num, src, line, bad)
            }
            M::Mvn => {
                let (rd, src) = two(ops).ok_or_else(bad)?;
                let rd = reg(rd).ok_or_else(bad)?;
                logic(LogicOp::Orr, true, rd, ZR, src, line, bad)
            }
            M::Tst => {
                let (rn, src) = two(ops).ok_or_else(bad)?;
                let rn = reg(rn).ok_or_else(bad)?;
                logic(
                    LogicOp::Ands,
                    false,
                    Reg { num: ZR, width: rn.width },
                    rn.num,
                    src,
                    line,
                    bad,
                )
            }
            M::Mul | M::Udiv | M::Sdiv | M::Lsl | M::Lsr | M::Asr | M::Ror => {
                let (rd, rn, src) = three_or_two(ops).ok_or_else(bad)?;
                let rd = reg(rd).ok_or_else(bad)?;
                let rn = reg(rn).ok_or_else(bad)?;
                // register-only family
                let rm = match src {
                    Operand::Reg(rm) => rm.num,
                    _ => return Err(bad()),
                };
                Ok(match mnemonic {
                    M::Mul => Insn::Mul {
                        width: rd.width,
                        rd: rd.num,
                        rn: rn.num,
                        rm,
                    },
                    M::Udiv => Insn::Div {
                        signed: false,
                        width: rd.width,
                        rd: rd.num,
                        rn: rn.num,
                        rm,
                    },
                    M::Sdiv => Insn::Div {
                        signed: true,
                        width: rd.width,
                        rd: rd.num,
                        rn: rn.num,
                        rm,
                    },
                    M::Lsl => shift(ShiftOp::Lsl, rd, rn.num, rm),
                    M::Lsr => shift(ShiftOp::Lsr, rd, rn.num, rm),
                    M::Asr => shift(ShiftOp::Asr, rd, rn.num, rm),
                    _ => shift(ShiftOp::Ror, rd, rn.num, rm),
                })
            }
            M::Ldr | M::Ldrb | M::Ldrh | M::Ldrsb | M::Ldrsh | M::Ldrsw | M::Str | M::Strb
            | M::Strh => {
                let (rt, addr) = two(ops).ok_or_else(bad)?;
                let rt = reg(rt).ok_or_else(bad)?;
                let op = match mnemonic {
                    M::Ldr => MemOp::Ldr,
                    M::Ldrb => MemOp::Ldrb,
                    M::Ldrh => MemOp::Ldrh,
                    M::Ldrsb => MemOp::Ldrsb,
                    M::Ldrsh => MemOp::Ldrsh,
                    M::Ldrsw => MemOp::Ldrsw,
                    M::Str => MemOp::Str,
                    M::Strb => MemOp::Strb,
                    _ => MemOp::Strh,
                };
                match addr {
                    Operand::Mem(mem) => load_store(op, rt, mem, line, bad),
                    Operand::Sym(_) if mnemonic == M::Ldr => {
                        // PC-relative literal load
                        let target = self.resolve(addr, pass, line)?;
                        let off = target - self.offset as i64;
                        let words = branch_offset(off, 19, line)?;
                        Ok(Insn::LdrLit {
                            width: rt.width,
                            rt: rt.num,
                            imm19: words,
                        })
                    }
                    _ => Err(bad()),
                }
            }
            M::Ldp | M::Stp => {
                let (rt, rt2, addr) = three(ops).ok_or_else(bad)?;
                let rt = reg(rt).ok_or_else(bad)?;
                let rt2 = reg(rt2).ok_or_else(bad)?;
                let Operand::Mem(mem) = addr else {
                    return Err(bad());
                };
                load_store_pair(mnemonic == M::Ldp, rt, rt2.num, mem, line, bad)
            }
            M::B | M::Bl => {
                let target = one(ops).ok_or_else(bad)?;
                let target = self.resolve(target, pass, line)?;
                let off = target - self.offset as i64;
                let words = branch_offset(off, 26, line)?;
                Ok(Insn::B {
                    link: mnemonic == M::Bl,
                    imm26: words,
                })
            }
            M::Bcc(cond) => {
                let target = one(ops).ok_or_else(bad)?;
                let target = self.resolve(target, pass, line)?;
                let off = target - self.offset as i64;
                let words = branch_offset(off, 19, line)?;
                Ok(Insn::BCond { cond, imm19: words })
            }
            M::Cbz | M::Cbnz => {
                let (rt, target) = two(ops).ok_or_else(bad)?;
                let rt = reg(rt).ok_or_else(bad)?;
                let target = self.resolve(target, pass, line)?;
                let off = target - self.offset as i64;
                let words = branch_offset(off, 19, line)?;
                Ok(Insn::Cbz {
                    nonzero: mnemonic == M::Cbnz,
                    width: rt.width,
                    rt: rt.num,
                    imm19: words,
                })
            }
            M::Br | M::Blr => {
                let rn = one(ops).and_then(reg).ok_or_else(bad)?;
                Ok(Insn::Br {
                    link: mnemonic == M::Blr,
                    rn: rn.num,
                })
            }
            M::Ret => match ops {
                &[] => Ok(Insn::Ret { rn: 30 }),
                &[op] => {
                    let rn = reg(op).ok_or_else(bad)?;
                    Ok(Insn::Ret { rn: rn.num })
                }
                _ => Err(bad()),
            },
            M::Nop | M::Wfi | M::Wfe | M::Sev | M::Sevl => {
                if !ops.is_empty() {
                    return Err(bad());
                }
                Ok(Insn::Hint(match mnemonic {
                    M::Nop => Hint::Nop,
                    M::Wfi => Hint::Wfi,
                    M::Wfe => Hint::Wfe,
                    M::Sev => Hint::Sev,
                    _ => Hint::Sevl,
                }))
            }
            M::Dmb | M::Dsb | M::Isb => {
                let option = match ops {
                    &[] => 0xF,
                    &[&Operand::Imm(n)] => {
                        if !(0..=15).contains(&n) {
                            return Err(Error::ImmRange(n).at(line));
                        }
                        n as u8
                    }
                    _ => return Err(bad()),
                };
                let kind = match mnemonic {
                    M::Dmb => Barrier::Dmb,
                    M::Dsb => Barrier::Dsb,
                    _ => Barrier::Isb,
                };
                Ok(Insn::Barrier { kind, option })
            }
            M::Svc | M::Hvc | M::Smc => {
                let imm = match one(ops) {
                    Some(&Operand::Imm(n)) if (0..=0xFFFF).contains(&n) => n as u16,
                    Some(&Operand::Imm(n)) => return Err(Error::ImmRange(n).at(line)),
                    _ => return Err(bad()),
                };
                Ok(match mnemonic {
                    M::Svc => Insn::Svc(imm),
                    M::Hvc => Insn::Hvc(imm),
                    _ => Insn::Smc(imm),
                })
            }
            M::Ext(ext) => {
                // Operand passing is a run-time register convention.
                if !ops.is_empty() {
                    return Err(bad());
                }
                Ok(Insn::Svc(ext.imm16()))
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Operand helpers

fn one<'a>(ops: &[&'a Operand]) -> Option<&'a Operand> {
    match ops {
        &[a] => Some(a),
        _ => None,
    }
}

fn two<'a>(ops: &[&'a Operand]) -> Option<(&'a Operand, &'a Operand)> {
    match ops {
        &[a, b] => Some((a, b)),
        _ => None,
    }
}

fn three<'a>(ops: &[&'a Operand]) -> Option<(&'a Operand, &'a Operand, &'a Operand)> {
    match ops {
        &[a, b, c] => Some((a, b, c)),
        _ => None,
    }
}

/// `op Rd, Rm` expands to `op Rd, Rd, Rm`.
fn three_or_two<'a>(ops: &[&'a Operand]) -> Option<(&'a Operand, &'a Operand, &'a Operand)> {
    match ops {
        &[a, b, c] => Some((a, b, c)),
        &[a, b] => Some((a, a, b)),
        _ => None,
    }
}

fn reg(op: &Operand) -> Option<Reg> {
    match op {
        Operand::Reg(r) => Some(*r),
        _ => None,
    }
}

fn shift(op: ShiftOp, rd: Reg, rn: u8, rm: u8) -> Insn {
    Insn::Shift {
        op,
        width: rd.width,
        rd: rd.num,
        rn,
        rm,
    }
}

/// `mov Rd, #imm`: movz with a halfword search, movn for negatives.
fn mov_imm(rd: Reg, value: i64, line: u32) -> Result<Insn, Diag> {
    let limit = if rd.width.is_64() { 4u32 } else { 2 };
    let (raw, invert) = if value >= 0 {
        (value as u64, false)
    } else {
        let inv = !(value as u64);
        let inv = if rd.width.is_64() {
            inv
        } else {
            inv & 0xFFFF_FFFF
        };
        (inv, true)
    };
    for hw in 0..limit {
        let sh = hw * 16;
        if raw & !(0xFFFFu64 << sh) == 0 {
            return Ok(Insn::MovWide {
                width: rd.width,
                invert,
                keep: false,
                rd: rd.num,
                imm16: (raw >> sh) as u16,
                hw: hw as u8,
            });
        }
    }
    Err(Error::ImmRange(value).at(line))
}

/// Explicit `movz`/`movn`/`movk`, with an optional trailing `lsl #n`.
fn mov_wide(name: &str, mnemonic: Mnemonic, ops: &[&Operand], line: u32) -> Result<Insn, Diag> {
    let bad = || Error::OperandMismatch(name.to_string()).at(line);
    let explicit_hw = match ops.len() {
        2 => None,
        4 => {
            let (Operand::Sym(word), &Operand::Imm(n)) = (ops[2], ops[3]) else {
                return Err(bad());
            };
            if !word.eq_ignore_ascii_case("lsl") {
                return Err(bad());
            }
            if n % 16 != 0 || !(0..=48).contains(&n) {
                return Err(Error::ImmRange(n).at(line));
            }
            Some((n / 16) as u8)
        }
        _ => return Err(bad()),
    };
    let rd = reg(ops[0]).ok_or_else(bad)?;
    let &Operand::Imm(value) = ops[1] else {
        return Err(bad());
    };
    let invert = mnemonic == Mnemonic::Movn;
    let keep = mnemonic == Mnemonic::Movk;

    if let Some(hw) = explicit_hw {
        if !rd.width.is_64() && hw > 1 {
            return Err(Error::ImmRange(hw as i64 * 16).at(line));
        }
        if !(0..=0xFFFF).contains(&value) {
            return Err(Error::ImmRange(value).at(line));
        }
        return Ok(Insn::MovWide {
            width: rd.width,
            invert,
            keep,
            rd: rd.num,
            imm16: value as u16,
            hw,
        });
    }
    // No explicit shift: search the halfword positions for the 16-bit field.
    if value < 0 {
        return Err(Error::ImmRange(value).at(line));
    }
    let limit = if rd.width.is_64() { 4u32 } else { 2 };
    for hw in 0..limit {
        let sh = hw * 16;
        if (value as u64) & !(0xFFFFu64 << sh) == 0 {
            return Ok(Insn::MovWide {
                width: rd.width,
                invert,
                keep,
                rd: rd.num,
                imm16: ((value as u64) >> sh) as u16,
                hw: hw as u8,
            });
        }
    }
    Err(Error::ImmRange(value).at(line))
}

fn arith(
    op: ArithOp,
    rd: Reg,
    rn: u8,
    src: &Operand,
    line: u32,
    bad: impl Fn() -> Diag,
) -> Result<Insn, Diag> {
    match src {
        Operand::Reg(rm) => Ok(Insn::ArithReg {
            op,
            width: rd.width,
            rd: rd.num,
            rn,
            rm: rm.num,
        }),
        &Operand::Imm(value) => {
            if (0..=0xFFF).contains(&value) {
                Ok(Insn::ArithImm {
                    op,
                    width: rd.width,
                    rd: rd.num,
                    rn,
                    imm12: value as u16,
                    lsl12: false,
                })
            } else if value > 0 && value & 0xFFF == 0 && (value >> 12) <= 0xFFF {
                Ok(Insn::ArithImm {
                    op,
                    width: rd.width,
                    rd: rd.num,
                    rn,
                    imm12: (value >> 12) as u16,
                    lsl12: true,
                })
            } else {
                Err(Error::ImmRange(value).at(line))
            }
        }
        _ => Err(bad()),
    }
}

fn logic(
    op: LogicOp,
    invert: bool,
    rd: Reg,
    rn: u8,
    src: &Operand,
    line: u32,
    bad: impl Fn() -> Diag,
) -> Result<Insn, Diag> {
    match src {
        Operand::Reg(rm) => Ok(Insn::LogicReg {
            op,
            invert,
            width: rd.width,
            rd: rd.num,
            rn,
            rm: rm.num,
        }),
        &Operand::Imm(value) => {
            if !(0..=0xFFF).contains(&value) {
                return Err(Error::ImmRange(value).at(line));
            }
            Ok(Insn::LogicImm {
                op,
                invert,
                width: rd.width,
                rd: rd.num,
                rn,
                imm12: value as u16,
            })
        }
        _ => Err(bad()),
    }
}

fn load_store(
    op: MemOp,
    rt: Reg,
    mem: &MemOperand,
    line: u32,
    bad: impl Fn() -> Diag,
) -> Result<Insn, Diag> {
    // Register-offset addressing is not supported.
    if mem.index.is_some() {
        return Err(bad());
    }
    if mem.pre || mem.post {
        if !(-256..=255).contains(&mem.offset) {
            return Err(Error::ImmRange(mem.offset).at(line));
        }
        let off = mem.offset as i32;
        let mode = if mem.pre {
            AddrMode::Pre(off)
        } else {
            AddrMode::Post(off)
        };
        return Ok(Insn::LdSt {
            op,
            width: rt.width,
            rt: rt.num,
            rn: mem.base.num,
            mode,
        });
    }
    let size = op.size(rt.width);
    let scale = 1i64 << size;
    if mem.offset < 0 {
        return Err(Error::ImmRange(mem.offset).at(line));
    }
    if mem.offset % scale != 0 {
        return Err(Error::Misaligned(mem.offset).at(line));
    }
    if mem.offset >> size > 0xFFF {
        return Err(Error::ImmRange(mem.offset).at(line));
    }
    Ok(Insn::LdSt {
        op,
        width: rt.width,
        rt: rt.num,
        rn: mem.base.num,
        mode: AddrMode::Offset(mem.offset as u32),
    })
}

fn load_store_pair(
    load: bool,
    rt: Reg,
    rt2: u8,
    mem: &MemOperand,
    line: u32,
    bad: impl Fn() -> Diag,
) -> Result<Insn, Diag> {
    if mem.index.is_some() {
        return Err(bad());
    }
    let scale = if rt.width.is_64() { 8 } else { 4 };
    if mem.offset % scale != 0 {
        return Err(Error::Misaligned(mem.offset).at(line));
    }
    let units = mem.offset / scale;
    if !(-64..=63).contains(&units) {
        return Err(Error::ImmRange(mem.offset).at(line));
    }
    let mode = if mem.pre {
        PairMode::Pre
    } else if mem.post {
        PairMode::Post
    } else {
        PairMode::Offset
    };
    Ok(Insn::LdStPair {
        load,
        width: rt.width,
        rt: rt.num,
        rt2,
        rn: mem.base.num,
        imm7: units as i8,
        mode,
    })
}

/// Validate a byte offset for a word-granularity branch field of `bits`
/// signed bits, returning the word offset.
fn branch_offset(off: i64, bits: u32, line: u32) -> Result<i32, Diag> {
    if off % 4 != 0 {
        return Err(Error::Misaligned(off).at(line));
    }
    let words = off >> 2;
    let limit = 1i64 << (bits - 1);
    if !(-limit..limit).contains(&words) {
        return Err(Error::BranchRange(off).at(line));
    }
    Ok(words as i32)
}
