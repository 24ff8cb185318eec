use crate::cond::Cond;
use crate::ext::ExtOp;
use crate::reg::{Reg, Width};

use color_print::cformat;

/// Add/subtract, with or without flag setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Adds,
    Sub,
    Subs,
}

impl ArithOp {
    fn op_s(self) -> (u32, u32) {
        match self {
            ArithOp::Add => (0, 0),
            ArithOp::Adds => (0, 1),
            ArithOp::Sub => (1, 0),
            ArithOp::Subs => (1, 1),
        }
    }

    fn from_op_s(op: u32, s: u32) -> ArithOp {
        match (op & 1, s & 1) {
            (0, 0) => ArithOp::Add,
            (0, 1) => ArithOp::Adds,
            (1, 0) => ArithOp::Sub,
            _ => ArithOp::Subs,
        }
    }

    pub fn sets_flags(self) -> bool {
        matches!(self, ArithOp::Adds | ArithOp::Subs)
    }

    pub fn is_sub(self) -> bool {
        matches!(self, ArithOp::Sub | ArithOp::Subs)
    }
}

/// Bitwise operations. The `invert` flag on the containing variant turns
/// `and`/`orr` into `bic`/`orn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And = 0,
    Orr = 1,
    Eor = 2,
    Ands = 3,
}

impl LogicOp {
    fn from_opc(opc: u32) -> LogicOp {
        match opc & 3 {
            0 => LogicOp::And,
            1 => LogicOp::Orr,
            2 => LogicOp::Eor,
            _ => LogicOp::Ands,
        }
    }

    pub fn sets_flags(self) -> bool {
        matches!(self, LogicOp::Ands)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Lsl = 0x08,
    Lsr = 0x09,
    Asr = 0x0A,
    Ror = 0x0B,
}

/// Load/store operation and access size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    Strb,
    Strh,
    Str,
    Ldrb,
    Ldrh,
    Ldr,
    Ldrsb,
    Ldrsh,
    Ldrsw,
}

impl MemOp {
    /// log2 of the access size in bytes.
    pub fn size(self, width: Width) -> u32 {
        match self {
            MemOp::Strb | MemOp::Ldrb | MemOp::Ldrsb => 0,
            MemOp::Strh | MemOp::Ldrh | MemOp::Ldrsh => 1,
            MemOp::Ldrsw => 2,
            MemOp::Str | MemOp::Ldr => {
                if width.is_64() {
                    3
                } else {
                    2
                }
            }
        }
    }

    pub fn is_load(self) -> bool {
        !matches!(self, MemOp::Strb | MemOp::Strh | MemOp::Str)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, MemOp::Ldrsb | MemOp::Ldrsh | MemOp::Ldrsw)
    }

    fn size_opc(self, width: Width) -> (u32, u32) {
        let opc = match self {
            MemOp::Strb | MemOp::Strh | MemOp::Str => 0,
            MemOp::Ldrb | MemOp::Ldrh | MemOp::Ldr => 1,
            MemOp::Ldrsw => 2,
            MemOp::Ldrsb | MemOp::Ldrsh => {
                if width.is_64() {
                    2
                } else {
                    3
                }
            }
        };
        (self.size(width), opc)
    }

    fn from_size_opc(size: u32, opc: u32) -> Option<(MemOp, Width)> {
        match (size, opc) {
            (0, 0) => Some((MemOp::Strb, Width::W32)),
            (0, 1) => Some((MemOp::Ldrb, Width::W32)),
            (0, 2) => Some((MemOp::Ldrsb, Width::W64)),
            (0, 3) => Some((MemOp::Ldrsb, Width::W32)),
            (1, 0) => Some((MemOp::Strh, Width::W32)),
            (1, 1) => Some((MemOp::Ldrh, Width::W32)),
            (1, 2) => Some((MemOp::Ldrsh, Width::W64)),
            (1, 3) => Some((MemOp::Ldrsh, Width::W32)),
            (2, 0) => Some((MemOp::Str, Width::W32)),
            (2, 1) => Some((MemOp::Ldr, Width::W32)),
            (2, 2) => Some((MemOp::Ldrsw, Width::W64)),
            (3, 0) => Some((MemOp::Str, Width::W64)),
            (3, 1) => Some((MemOp::Ldr, Width::W64)),
            _ => None,
        }
    }
}

/// Addressing mode of a single load/store. `Offset` carries the raw byte
/// offset (scaled into the imm12 field at encode time); `Pre`/`Post` carry
/// the signed 9-bit byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Offset(u32),
    Pre(i32),
    Post(i32),
}

/// Pair addressing; the payload is the scaled 7-bit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMode {
    Offset,
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Nop,
    Wfi,
    Wfe,
    Sev,
    Sevl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    Dmb,
    Dsb,
    Isb,
}

/// One fully-resolved machine instruction. `encode` and `decode` are exact
/// inverses; the assembler and the VM both go through this type, so the two
/// cannot disagree about a bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insn {
    /// movz / movn / movk. `keep` selects movk, `invert` selects movn.
    MovWide {
        width: Width,
        invert: bool,
        keep: bool,
        rd: u8,
        imm16: u16,
        hw: u8,
    },
    ArithImm {
        op: ArithOp,
        width: Width,
        rd: u8,
        rn: u8,
        imm12: u16,
        lsl12: bool,
    },
    ArithReg {
        op: ArithOp,
        width: Width,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    LogicImm {
        op: LogicOp,
        invert: bool,
        width: Width,
        rd: u8,
        rn: u8,
        imm12: u16,
    },
    LogicReg {
        op: LogicOp,
        invert: bool,
        width: Width,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    Mul {
        width: Width,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    Div {
        signed: bool,
        width: Width,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    Shift {
        op: ShiftOp,
        width: Width,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    LdSt {
        op: MemOp,
        width: Width,
        rt: u8,
        rn: u8,
        mode: AddrMode,
    },
    LdStPair {
        load: bool,
        width: Width,
        rt: u8,
        rt2: u8,
        rn: u8,
        imm7: i8,
        mode: PairMode,
    },
    /// PC-relative literal load; imm19 is a word offset.
    LdrLit {
        width: Width,
        rt: u8,
        imm19: i32,
    },
    /// b / bl; imm26 is a word offset.
    B {
        link: bool,
        imm26: i32,
    },
    BCond {
        cond: Cond,
        imm19: i32,
    },
    Cbz {
        nonzero: bool,
        width: Width,
        rt: u8,
        imm19: i32,
    },
    Br {
        link: bool,
        rn: u8,
    },
    Ret {
        rn: u8,
    },
    Hint(Hint),
    Barrier {
        kind: Barrier,
        option: u8,
    },
    Svc(u16),
    Hvc(u16),
    Smc(u16),
}

fn sx(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

impl Insn {
    pub fn encode(&self) -> u32 {
        match *self {
            Insn::MovWide { width, invert, keep, rd, imm16, hw } => {
                let opc: u32 = if keep {
                    3
                } else if invert {
                    0
                } else {
                    2
                };
                (width.sf() << 31)
                    | (opc << 29)
                    | (0x25 << 23)
                    | ((hw as u32 & 3) << 21)
                    | ((imm16 as u32) << 5)
                    | rd as u32
            }
            Insn::ArithImm { op, width, rd, rn, imm12, lsl12 } => {
                let (o, s) = op.op_s();
                (width.sf() << 31)
                    | (o << 30)
                    | (s << 29)
                    | (0x11 << 24)
                    | ((lsl12 as u32) << 22)
                    | ((imm12 as u32 & 0xFFF) << 10)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::ArithReg { op, width, rd, rn, rm } => {
                let (o, s) = op.op_s();
                (width.sf() << 31)
                    | (o << 30)
                    | (s << 29)
                    | (0x0B << 24)
                    | ((rm as u32) << 16)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::LogicImm { op, invert, width, rd, rn, imm12 } => {
                (width.sf() << 31)
                    | ((op as u32) << 29)
                    | (0x24 << 23)
                    | ((invert as u32) << 22)
                    | ((imm12 as u32 & 0xFFF) << 10)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::LogicReg { op, invert, width, rd, rn, rm } => {
                (width.sf() << 31)
                    | ((op as u32) << 29)
                    | (0x0A << 24)
                    | ((invert as u32) << 21)
                    | ((rm as u32) << 16)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::Mul { width, rd, rn, rm } => {
                (width.sf() << 31)
                    | (0x1B << 24)
                    | ((rm as u32) << 16)
                    | (0x1F << 10)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::Div { signed, width, rd, rn, rm } => {
                let op6 = if signed { 0x03 } else { 0x02 };
                (width.sf() << 31)
                    | (0x0D6 << 21)
                    | ((rm as u32) << 16)
                    | (op6 << 10)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::Shift { op, width, rd, rn, rm } => {
                (width.sf() << 31)
                    | (0x0D6 << 21)
                    | ((rm as u32) << 16)
                    | ((op as u32) << 10)
                    | ((rn as u32) << 5)
                    | rd as u32
            }
            Insn::LdSt { op, width, rt, rn, mode } => {
                let (size, opc) = op.size_opc(width);
                match mode {
                    AddrMode::Offset(byte_off) => {
                        let imm12 = byte_off >> op.size(width);
                        (size << 30)
                            | (0x39 << 24)
                            | (opc << 22)
                            | ((imm12 & 0xFFF) << 10)
                            | ((rn as u32) << 5)
                            | rt as u32
                    }
                    AddrMode::Pre(off) | AddrMode::Post(off) => {
                        let idx: u32 = if matches!(mode, AddrMode::Pre(_)) { 3 } else { 1 };
                        (size << 30)
                            | (0x38 << 24)
                            | (opc << 22)
                            | ((off as u32 & 0x1FF) << 12)
                            | (idx << 10)
                            | ((rn as u32) << 5)
                            | rt as u32
                    }
                }
            }
            Insn::LdStPair { load, width, rt, rt2, rn, imm7, mode } => {
                let opc = if width.is_64() { 2 } else { 0 };
                let variant: u32 = match mode {
                    PairMode::Post => 1,
                    PairMode::Offset => 2,
                    PairMode::Pre => 3,
                };
                (opc << 30)
                    | (0x5 << 27)
                    | (variant << 23)
                    | ((load as u32) << 22)
                    | ((imm7 as u32 & 0x7F) << 15)
                    | ((rt2 as u32) << 10)
                    | ((rn as u32) << 5)
                    | rt as u32
            }
            Insn::LdrLit { width, rt, imm19 } => {
                let opc = if width.is_64() { 1 } else { 0 };
                (opc << 30) | (0x18 << 24) | ((imm19 as u32 & 0x7FFFF) << 5) | rt as u32
            }
            Insn::B { link, imm26 } => {
                ((link as u32) << 31) | (0x05 << 26) | (imm26 as u32 & 0x3FF_FFFF)
            }
            Insn::BCond { cond, imm19 } => {
                (0x54 << 24) | ((imm19 as u32 & 0x7FFFF) << 5) | cond.field()
            }
            Insn::Cbz { nonzero, width, rt, imm19 } => {
                (width.sf() << 31)
                    | (0x34 << 24)
                    | ((nonzero as u32) << 24)
                    | ((imm19 as u32 & 0x7FFFF) << 5)
                    | rt as u32
            }
            Insn::Br { link, rn } => {
                let base = if link { 0xD63F_0000 } else { 0xD61F_0000 };
                base | ((rn as u32) << 5)
            }
            Insn::Ret { rn } => 0xD65F_0000 | ((rn as u32) << 5),
            Insn::Hint(h) => match h {
                Hint::Nop => 0xD503_201F,
                Hint::Wfe => 0xD503_205F,
                Hint::Wfi => 0xD503_207F,
                Hint::Sev => 0xD503_209F,
                Hint::Sevl => 0xD503_20BF,
            },
            Insn::Barrier { kind, option } => {
                let base = match kind {
                    Barrier::Dsb => 0xD503_309F,
                    Barrier::Dmb => 0xD503_30BF,
                    Barrier::Isb => 0xD503_30DF,
                };
                base | ((option as u32 & 0xF) << 8)
            }
            Insn::Svc(imm) => 0xD400_0001 | ((imm as u32) << 5),
            Insn::Hvc(imm) => 0xD400_0002 | ((imm as u32) << 5),
            Insn::Smc(imm) => 0xD400_0003 | ((imm as u32) << 5),
        }
    }

    pub fn decode(word: u32) -> Option<Insn> {
        // Fixed patterns first.
        match word {
            0xD503_201F => return Some(Insn::Hint(Hint::Nop)),
            0xD503_205F => return Some(Insn::Hint(Hint::Wfe)),
            0xD503_207F => return Some(Insn::Hint(Hint::Wfi)),
            0xD503_209F => return Some(Insn::Hint(Hint::Sev)),
            0xD503_20BF => return Some(Insn::Hint(Hint::Sevl)),
            _ => {}
        }
        if word & 0xFFFF_F0FF == 0xD503_309F {
            let option = ((word >> 8) & 0xF) as u8;
            return Some(Insn::Barrier { kind: Barrier::Dsb, option });
        }
        if word & 0xFFFF_F0FF == 0xD503_30BF {
            let option = ((word >> 8) & 0xF) as u8;
            return Some(Insn::Barrier { kind: Barrier::Dmb, option });
        }
        if word & 0xFFFF_F0FF == 0xD503_30DF {
            let option = ((word >> 8) & 0xF) as u8;
            return Some(Insn::Barrier { kind: Barrier::Isb, option });
        }
        if word & 0xFFE0_001F == 0xD400_0001 {
            return Some(Insn::Svc(((word >> 5) & 0xFFFF) as u16));
        }
        if word & 0xFFE0_001F == 0xD400_0002 {
            return Some(Insn::Hvc(((word >> 5) & 0xFFFF) as u16));
        }
        if word & 0xFFE0_001F == 0xD400_0003 {
            return Some(Insn::Smc(((word >> 5) & 0xFFFF) as u16));
        }
        if word & 0xFFFF_FC1F == 0xD65F_0000 {
            return Some(Insn::Ret { rn: ((word >> 5) & 0x1F) as u8 });
        }
        if word & 0xFFFF_FC1F == 0xD61F_0000 {
            return Some(Insn::Br { link: false, rn: ((word >> 5) & 0x1F) as u8 });
        }
        if word & 0xFFFF_FC1F == 0xD63F_0000 {
            return Some(Insn::Br { link: true, rn: ((word >> 5) & 0x1F) as u8 });
        }

        let sf = word >> 31;
        let width = Width::from_sf(sf);
        let rd = (word & 0x1F) as u8;
        let rn = ((word >> 5) & 0x1F) as u8;
        let rm = ((word >> 16) & 0x1F) as u8;

        // movz / movn / movk
        if (word >> 23) & 0x3F == 0x25 {
            let opc = (word >> 29) & 3;
            if opc != 1 {
                return Some(Insn::MovWide {
                    width,
                    invert: opc == 0,
                    keep: opc == 3,
                    rd,
                    imm16: ((word >> 5) & 0xFFFF) as u16,
                    hw: ((word >> 21) & 3) as u8,
                });
            }
            return None;
        }
        // add/sub immediate
        if (word >> 24) & 0x1F == 0x11 {
            return Some(Insn::ArithImm {
                op: ArithOp::from_op_s(word >> 30, word >> 29),
                width,
                rd,
                rn,
                imm12: ((word >> 10) & 0xFFF) as u16,
                lsl12: (word >> 22) & 1 == 1,
            });
        }
        // add/sub shifted register (shift amount 0 only)
        if (word >> 24) & 0x1F == 0x0B && (word >> 10) & 0x3F == 0 && (word >> 21) & 1 == 0 {
            return Some(Insn::ArithReg {
                op: ArithOp::from_op_s(word >> 30, word >> 29),
                width,
                rd,
                rn,
                rm,
            });
        }
        // logical immediate (12-bit field with invert bit)
        if (word >> 23) & 0x3F == 0x24 {
            return Some(Insn::LogicImm {
                op: LogicOp::from_opc(word >> 29),
                invert: (word >> 22) & 1 == 1,
                width,
                rd,
                rn,
                imm12: ((word >> 10) & 0xFFF) as u16,
            });
        }
        // logical shifted register (shift amount 0 only)
        if (word >> 24) & 0x1F == 0x0A && (word >> 10) & 0x3F == 0 {
            return Some(Insn::LogicReg {
                op: LogicOp::from_opc(word >> 29),
                invert: (word >> 21) & 1 == 1,
                width,
                rd,
                rn,
                rm,
            });
        }
        // madd with Ra = zr, i.e. mul
        if (word >> 21) & 0x3FF == 0x0D8 && (word >> 10) & 0x3F == 0x1F {
            return Some(Insn::Mul { width, rd, rn, rm });
        }
        // two-source data processing: udiv/sdiv and the register shifts
        if (word >> 21) & 0x3FF == 0x0D6 {
            let op6 = (word >> 10) & 0x3F;
            return match op6 {
                0x02 => Some(Insn::Div { signed: false, width, rd, rn, rm }),
                0x03 => Some(Insn::Div { signed: true, width, rd, rn, rm }),
                0x08 => Some(Insn::Shift { op: ShiftOp::Lsl, width, rd, rn, rm }),
                0x09 => Some(Insn::Shift { op: ShiftOp::Lsr, width, rd, rn, rm }),
                0x0A => Some(Insn::Shift { op: ShiftOp::Asr, width, rd, rn, rm }),
                0x0B => Some(Insn::Shift { op: ShiftOp::Ror, width, rd, rn, rm }),
                _ => None,
            };
        }
        // load/store, unsigned scaled offset
        if (word >> 24) & 0x3F == 0x39 {
            let size = word >> 30;
            let opc = (word >> 22) & 3;
            let (op, w) = MemOp::from_size_opc(size, opc)?;
            let imm12 = (word >> 10) & 0xFFF;
            return Some(Insn::LdSt {
                op,
                width: w,
                rt: rd,
                rn,
                mode: AddrMode::Offset(imm12 << op.size(w)),
            });
        }
        // load/store, pre/post indexed
        if (word >> 24) & 0x3F == 0x38 && (word >> 21) & 1 == 0 {
            let idx = (word >> 10) & 3;
            if idx != 1 && idx != 3 {
                return None;
            }
            let size = word >> 30;
            let opc = (word >> 22) & 3;
            let (op, w) = MemOp::from_size_opc(size, opc)?;
            let off = sx((word >> 12) & 0x1FF, 9);
            let mode = if idx == 3 { AddrMode::Pre(off) } else { AddrMode::Post(off) };
            return Some(Insn::LdSt { op, width: w, rt: rd, rn, mode });
        }
        // load/store pair
        if (word >> 27) & 0x7 == 0x5 && (word >> 26) & 1 == 0 {
            let variant = (word >> 23) & 7;
            let mode = match variant {
                1 => PairMode::Post,
                2 => PairMode::Offset,
                3 => PairMode::Pre,
                _ => return None,
            };
            let opc = word >> 30;
            let w = if opc == 2 {
                Width::W64
            } else if opc == 0 {
                Width::W32
            } else {
                return None;
            };
            return Some(Insn::LdStPair {
                load: (word >> 22) & 1 == 1,
                width: w,
                rt: rd,
                rt2: ((word >> 10) & 0x1F) as u8,
                rn,
                imm7: sx((word >> 15) & 0x7F, 7) as i8,
                mode,
            });
        }
        // ldr (literal)
        if (word >> 24) & 0x3F == 0x18 {
            let opc = word >> 30;
            if opc > 1 {
                return None;
            }
            return Some(Insn::LdrLit {
                width: Width::from_sf(opc),
                rt: rd,
                imm19: sx((word >> 5) & 0x7FFFF, 19),
            });
        }
        // b / bl
        if (word >> 26) & 0x1F == 0x05 {
            return Some(Insn::B {
                link: word >> 31 == 1,
                imm26: sx(word & 0x3FF_FFFF, 26),
            });
        }
        // b.cond
        if word >> 24 == 0x54 && (word >> 4) & 1 == 0 {
            let cond = Cond::try_from((word & 0xF) as u8).ok()?;
            return Some(Insn::BCond { cond, imm19: sx((word >> 5) & 0x7FFFF, 19) });
        }
        // cbz / cbnz
        if (word >> 25) & 0x3F == 0x1A {
            return Some(Insn::Cbz {
                nonzero: (word >> 24) & 1 == 1,
                width,
                rt: rd,
                imm19: sx((word >> 5) & 0x7FFFF, 19),
            });
        }
        None
    }
}

// ----------------------------------------------------------------------------
// Rendering (used by the disassembler and the trace output)
// ----------------------------------------------------------------------------

impl Insn {
    fn mnemonic(&self) -> String {
        match *self {
            Insn::MovWide { invert, keep, .. } => {
                if keep {
                    "movk"
                } else if invert {
                    "movn"
                } else {
                    "movz"
                }
                .into()
            }
            Insn::ArithImm { op, .. } | Insn::ArithReg { op, .. } => match op {
                ArithOp::Add => "add",
                ArithOp::Adds => "adds",
                ArithOp::Sub => "sub",
                ArithOp::Subs => "subs",
            }
            .into(),
            Insn::LogicImm { op, invert, .. } | Insn::LogicReg { op, invert, .. } => {
                match (op, invert) {
                    (LogicOp::And, false) => "and",
                    (LogicOp::And, true) => "bic",
                    (LogicOp::Orr, false) => "orr",
                    (LogicOp::Orr, true) => "orn",
                    (LogicOp::Eor, _) => "eor",
                    (LogicOp::Ands, _) => "ands",
                }
                .into()
            }
            Insn::Mul { .. } => "mul".into(),
            Insn::Div { signed, .. } => if signed { "sdiv" } else { "udiv" }.into(),
            Insn::Shift { op, .. } => match op {
                ShiftOp::Lsl => "lsl",
                ShiftOp::Lsr => "lsr",
                ShiftOp::Asr => "asr",
                ShiftOp::Ror => "ror",
            }
            .into(),
            Insn::LdSt { op, .. } => match op {
                MemOp::Strb => "strb",
                MemOp::Strh => "strh",
                MemOp::Str => "str",
                MemOp::Ldrb => "ldrb",
                MemOp::Ldrh => "ldrh",
                MemOp::Ldr => "ldr",
                MemOp::Ldrsb => "ldrsb",
                MemOp::Ldrsh => "ldrsh",
                MemOp::Ldrsw => "ldrsw",
            }
            .into(),
            Insn::LdStPair { load, .. } => if load { "ldp" } else { "stp" }.into(),
            Insn::LdrLit { .. } => "ldr".into(),
            Insn::B { link, .. } => if link { "bl" } else { "b" }.into(),
            Insn::BCond { cond, .. } => format!("b.{cond}"),
            Insn::Cbz { nonzero, .. } => if nonzero { "cbnz" } else { "cbz" }.into(),
            Insn::Br { link, .. } => if link { "blr" } else { "br" }.into(),
            Insn::Ret { .. } => "ret".into(),
            Insn::Hint(h) => match h {
                Hint::Nop => "nop",
                Hint::Wfi => "wfi",
                Hint::Wfe => "wfe",
                Hint::Sev => "sev",
                Hint::Sevl => "sevl",
            }
            .into(),
            Insn::Barrier { kind, .. } => match kind {
                Barrier::Dmb => "dmb",
                Barrier::Dsb => "dsb",
                Barrier::Isb => "isb",
            }
            .into(),
            Insn::Svc(imm) => match ExtOp::try_from(imm) {
                Ok(ext) => ext.to_string(),
                Err(_) => "svc".into(),
            },
            Insn::Hvc(_) => "hvc".into(),
            Insn::Smc(_) => "smc".into(),
        }
    }

    fn operands(&self) -> String {
        let r = |n: u8, w: Width| Reg { num: n, width: w }.to_string();
        match *self {
            Insn::MovWide { width, rd, imm16, hw, .. } => {
                if hw != 0 {
                    format!("{}, #{}, lsl #{}", r(rd, width), imm16, hw as u32 * 16)
                } else {
                    format!("{}, #{}", r(rd, width), imm16)
                }
            }
            Insn::ArithImm { width, rd, rn, imm12, lsl12, .. } => {
                let imm = (imm12 as u64) << if lsl12 { 12 } else { 0 };
                format!("{}, {}, #{}", r(rd, width), r(rn, width), imm)
            }
            Insn::ArithReg { width, rd, rn, rm, .. } => {
                format!("{}, {}, {}", r(rd, width), r(rn, width), r(rm, width))
            }
            Insn::LogicImm { width, rd, rn, imm12, .. } => {
                format!("{}, {}, #{}", r(rd, width), r(rn, width), imm12)
            }
            Insn::LogicReg { width, rd, rn, rm, .. } => {
                format!("{}, {}, {}", r(rd, width), r(rn, width), r(rm, width))
            }
            Insn::Mul { width, rd, rn, rm } => {
                format!("{}, {}, {}", r(rd, width), r(rn, width), r(rm, width))
            }
            Insn::Div { width, rd, rn, rm, .. } => {
                format!("{}, {}, {}", r(rd, width), r(rn, width), r(rm, width))
            }
            Insn::Shift { width, rd, rn, rm, .. } => {
                format!("{}, {}, {}", r(rd, width), r(rn, width), r(rm, width))
            }
            Insn::LdSt { width, rt, rn, mode, .. } => {
                let base = r(rn, Width::W64);
                match mode {
                    AddrMode::Offset(0) => format!("{}, [{}]", r(rt, width), base),
                    AddrMode::Offset(off) => format!("{}, [{}, #{}]", r(rt, width), base, off),
                    AddrMode::Pre(off) => format!("{}, [{}, #{}]!", r(rt, width), base, off),
                    AddrMode::Post(off) => format!("{}, [{}], #{}", r(rt, width), base, off),
                }
            }
            Insn::LdStPair { width, rt, rt2, rn, imm7, mode, .. } => {
                let scale = if width.is_64() { 3 } else { 2 };
                let off = (imm7 as i32) << scale;
                let base = r(rn, Width::W64);
                let pair = format!("{}, {}", r(rt, width), r(rt2, width));
                match mode {
                    PairMode::Offset if off == 0 => format!("{pair}, [{base}]"),
                    PairMode::Offset => format!("{pair}, [{base}, #{off}]"),
                    PairMode::Pre => format!("{pair}, [{base}, #{off}]!"),
                    PairMode::Post => format!("{pair}, [{base}], #{off}"),
                }
            }
            Insn::LdrLit { width, rt, imm19 } => {
                format!("{}, .{:+}", r(rt, width), imm19 << 2)
            }
            Insn::B { imm26, .. } => format!(".{:+}", imm26 << 2),
            Insn::BCond { imm19, .. } => format!(".{:+}", imm19 << 2),
            Insn::Cbz { width, rt, imm19, .. } => {
                format!("{}, .{:+}", r(rt, width), imm19 << 2)
            }
            Insn::Br { rn, .. } => r(rn, Width::W64),
            Insn::Ret { rn } => {
                if rn == 30 {
                    String::new()
                } else {
                    r(rn, Width::W64)
                }
            }
            Insn::Hint(_) => String::new(),
            Insn::Barrier { option, .. } => format!("#{option}"),
            Insn::Svc(imm) => match ExtOp::try_from(imm) {
                Ok(_) => String::new(),
                Err(_) => format!("#0x{imm:x}"),
            },
            Insn::Hvc(imm) | Insn::Smc(imm) => format!("#0x{imm:x}"),
        }
    }

    pub fn cformat(&self) -> String {
        let ops = self.operands();
        if ops.is_empty() {
            cformat!("<r>{}</>", self.mnemonic())
        } else {
            cformat!("<r>{:<6}</> <b>{}</>", self.mnemonic(), ops)
        }
    }
}

impl std::fmt::Display for Insn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ops = self.operands();
        if ops.is_empty() {
            write!(f, "{}", self.mnemonic())
        } else {
            write!(f, "{} {}", self.mnemonic(), ops)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_roundtrip {
        ($($name:ident: $insn:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let insn = $insn;
                    let word = insn.encode();
                    let back = Insn::decode(word);
                    assert_eq!(Some(insn), back, "word = {word:#010x}");
                }
            )*
        }
    }

    test_roundtrip! {
        rt_movz: Insn::MovWide { width: Width::W64, invert: false, keep: false, rd: 0, imm16: 72, hw: 0 },
        rt_movn: Insn::MovWide { width: Width::W64, invert: true, keep: false, rd: 3, imm16: 4, hw: 0 },
        rt_movk: Insn::MovWide { width: Width::W64, invert: false, keep: true, rd: 7, imm16: 0xBEEF, hw: 2 },
        rt_movz32: Insn::MovWide { width: Width::W32, invert: false, keep: false, rd: 12, imm16: 0xFFFF, hw: 1 },
        rt_add_imm: Insn::ArithImm { op: ArithOp::Add, width: Width::W64, rd: 0, rn: 1, imm12: 42, lsl12: false },
        rt_sub_imm_sh: Insn::ArithImm { op: ArithOp::Sub, width: Width::W64, rd: 2, rn: 2, imm12: 5, lsl12: true },
        rt_subs_imm: Insn::ArithImm { op: ArithOp::Subs, width: Width::W32, rd: 31, rn: 4, imm12: 1, lsl12: false },
        rt_add_reg: Insn::ArithReg { op: ArithOp::Add, width: Width::W64, rd: 0, rn: 0, rm: 1 },
        rt_subs_reg: Insn::ArithReg { op: ArithOp::Subs, width: Width::W64, rd: 31, rn: 1, rm: 2 },
        rt_and_imm: Insn::LogicImm { op: LogicOp::And, invert: false, width: Width::W64, rd: 1, rn: 2, imm12: 0xFF },
        rt_orn_imm: Insn::LogicImm { op: LogicOp::Orr, invert: true, width: Width::W64, rd: 1, rn: 31, imm12: 7 },
        rt_orr_reg: Insn::LogicReg { op: LogicOp::Orr, invert: false, width: Width::W64, rd: 5, rn: 31, rm: 9 },
        rt_bic_reg: Insn::LogicReg { op: LogicOp::And, invert: true, width: Width::W32, rd: 5, rn: 6, rm: 7 },
        rt_mul: Insn::Mul { width: Width::W64, rd: 0, rn: 1, rm: 2 },
        rt_udiv: Insn::Div { signed: false, width: Width::W64, rd: 0, rn: 1, rm: 2 },
        rt_sdiv: Insn::Div { signed: true, width: Width::W32, rd: 3, rn: 4, rm: 5 },
        rt_lsl: Insn::Shift { op: ShiftOp::Lsl, width: Width::W64, rd: 0, rn: 1, rm: 2 },
        rt_ror: Insn::Shift { op: ShiftOp::Ror, width: Width::W64, rd: 9, rn: 10, rm: 11 },
        rt_ldr_off: Insn::LdSt { op: MemOp::Ldr, width: Width::W64, rt: 0, rn: 1, mode: AddrMode::Offset(16) },
        rt_str_off32: Insn::LdSt { op: MemOp::Str, width: Width::W32, rt: 2, rn: 31, mode: AddrMode::Offset(8) },
        rt_ldrb: Insn::LdSt { op: MemOp::Ldrb, width: Width::W32, rt: 3, rn: 4, mode: AddrMode::Offset(5) },
        rt_ldrsb64: Insn::LdSt { op: MemOp::Ldrsb, width: Width::W64, rt: 3, rn: 4, mode: AddrMode::Offset(1) },
        rt_ldrsw: Insn::LdSt { op: MemOp::Ldrsw, width: Width::W64, rt: 6, rn: 7, mode: AddrMode::Offset(4) },
        rt_ldr_pre: Insn::LdSt { op: MemOp::Ldr, width: Width::W64, rt: 0, rn: 28, mode: AddrMode::Pre(-16) },
        rt_str_post: Insn::LdSt { op: MemOp::Str, width: Width::W64, rt: 0, rn: 28, mode: AddrMode::Post(255) },
        rt_stp_pre: Insn::LdStPair { load: false, width: Width::W64, rt: 29, rt2: 30, rn: 31, imm7: -4, mode: PairMode::Pre },
        rt_ldp_post: Insn::LdStPair { load: true, width: Width::W64, rt: 29, rt2: 30, rn: 31, imm7: 4, mode: PairMode::Post },
        rt_ldp_off: Insn::LdStPair { load: true, width: Width::W32, rt: 0, rt2: 1, rn: 2, imm7: 63, mode: PairMode::Offset },
        rt_ldr_lit: Insn::LdrLit { width: Width::W64, rt: 0, imm19: -3 },
        rt_b: Insn::B { link: false, imm26: -2 },
        rt_bl: Insn::B { link: true, imm26: 0x1FF_FFFF },
        rt_beq: Insn::BCond { cond: Cond::Eq, imm19: 4 },
        rt_blt: Insn::BCond { cond: Cond::Lt, imm19: -1 },
        rt_cbz: Insn::Cbz { nonzero: false, width: Width::W64, rt: 0, imm19: 2 },
        rt_cbnz: Insn::Cbz { nonzero: true, width: Width::W32, rt: 1, imm19: -2 },
        rt_cbnz_far: Insn::Cbz { nonzero: true, width: Width::W32, rt: 1, imm19: -(1 << 18) },
        rt_br: Insn::Br { link: false, rn: 3 },
        rt_blr: Insn::Br { link: true, rn: 4 },
        rt_ret: Insn::Ret { rn: 30 },
        rt_nop: Insn::Hint(Hint::Nop),
        rt_wfi: Insn::Hint(Hint::Wfi),
        rt_dmb: Insn::Barrier { kind: Barrier::Dmb, option: 0xF },
        rt_isb: Insn::Barrier { kind: Barrier::Isb, option: 0x3 },
        rt_svc: Insn::Svc(0x1FF),
        rt_hvc: Insn::Hvc(0),
        rt_smc: Insn::Smc(0xFFFF),
    }

    #[test]
    fn known_words() {
        // Encodings shared with standard tooling.
        assert_eq!(Insn::Hint(Hint::Nop).encode(), 0xD503201F);
        assert_eq!(Insn::Ret { rn: 30 }.encode(), 0xD65F03C0);
        assert_eq!(Insn::Svc(0x100).encode(), 0xD4002001);
        assert_eq!(Insn::Svc(0x1FF).encode(), 0xD4003FE1);
        // movz x0, #72
        assert_eq!(
            Insn::MovWide {
                width: Width::W64,
                invert: false,
                keep: false,
                rd: 0,
                imm16: 72,
                hw: 0
            }
            .encode(),
            0xD2800900
        );
    }

    #[test]
    fn undecodable() {
        assert_eq!(Insn::decode(0xFFFF_FFFF), None);
        assert_eq!(Insn::decode(0x0000_0000), None);
    }
}
