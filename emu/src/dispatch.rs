//! Instruction execution.
//!
//! Decoding goes through [`arch::insn::Insn`], the same type the
//! assembler encodes with. [`step`] drives the interpreter loop;
//! [`trap`] is the native-dispatch entry that handles a trapped `svc`
//! word outside the loop. Both funnel service calls through the one
//! `ext_call` table.

use arch::ext::ExtOp;
use arch::insn::{AddrMode, ArithOp, Insn, LogicOp, PairMode, ShiftOp};
use arch::reg::Width;

use crate::host::Host;
use crate::session::{RunError, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Continue,
    /// `halt` service call.
    Halt,
    /// `ret` with no saved frame underneath.
    Return,
}

fn mask(width: Width) -> u64 {
    match width {
        Width::W32 => 0xFFFF_FFFF,
        Width::W64 => u64::MAX,
    }
}

fn msb(width: Width) -> u32 {
    if width.is_64() {
        63
    } else {
        31
    }
}

/// Executes the word at the current pc and advances it.
pub fn step(session: &mut Session, host: &mut dyn Host, word: u32) -> Result<Exit, RunError> {
    let pc = session.pc;
    let insn = Insn::decode(word).ok_or(RunError::UnknownInsn { pc, word })?;
    let mut next = pc.wrapping_add(4);

    let exit = match insn {
        Insn::MovWide {
            width,
            invert,
            keep,
            rd,
            imm16,
            hw,
        } => {
            let shift = 16 * hw as u32;
            let field = (imm16 as u64) << shift;
            let value = if keep {
                (session.reg(rd) & !(0xFFFFu64 << shift)) | field
            } else if invert {
                !field
            } else {
                field
            };
            session.set_reg(rd, value & mask(width));
            Exit::Continue
        }

        Insn::ArithImm {
            op,
            width,
            rd,
            rn,
            imm12,
            lsl12,
        } => {
            let op1 = session.reg(rn);
            let op2 = (imm12 as u64) << if lsl12 { 12 } else { 0 };
            arith(session, op, width, rd, op1, op2);
            Exit::Continue
        }
        Insn::ArithReg {
            op,
            width,
            rd,
            rn,
            rm,
        } => {
            let (op1, op2) = (session.reg(rn), session.reg(rm));
            arith(session, op, width, rd, op1, op2);
            Exit::Continue
        }

        Insn::LogicImm {
            op,
            invert,
            width,
            rd,
            rn,
            imm12,
        } => {
            let op1 = session.reg(rn);
            logic(session, op, width, rd, op1, imm12 as u64, invert);
            Exit::Continue
        }
        Insn::LogicReg {
            op,
            invert,
            width,
            rd,
            rn,
            rm,
        } => {
            let (op1, op2) = (session.reg(rn), session.reg(rm));
            logic(session, op, width, rd, op1, op2, invert);
            Exit::Continue
        }

        Insn::Mul { width, rd, rn, rm } => {
            let m = mask(width);
            let value = (session.reg(rn) & m).wrapping_mul(session.reg(rm) & m) & m;
            session.set_reg(rd, value);
            Exit::Continue
        }
        Insn::Div {
            signed,
            width,
            rd,
            rn,
            rm,
        } => {
            let m = mask(width);
            let a = session.reg(rn) & m;
            let b = session.reg(rm) & m;
            // division by zero yields zero, no trap
            let value = if b == 0 {
                0
            } else if signed {
                if width.is_64() {
                    (a as i64).wrapping_div(b as i64) as u64
                } else {
                    (a as u32 as i32).wrapping_div(b as u32 as i32) as u32 as u64
                }
            } else {
                a / b
            };
            session.set_reg(rd, value & m);
            Exit::Continue
        }
        Insn::Shift {
            op,
            width,
            rd,
            rn,
            rm,
        } => {
            let m = mask(width);
            let bits = if width.is_64() { 64u64 } else { 32 };
            let amount = ((session.reg(rm) & m) % bits) as u32;
            let a = session.reg(rn) & m;
            let value = match op {
                ShiftOp::Lsl => a << amount,
                ShiftOp::Lsr => a >> amount,
                ShiftOp::Asr => {
                    if width.is_64() {
                        ((a as i64) >> amount) as u64
                    } else {
                        ((a as u32 as i32) >> amount) as u32 as u64
                    }
                }
                ShiftOp::Ror => {
                    if width.is_64() {
                        a.rotate_right(amount)
                    } else {
                        (a as u32).rotate_right(amount) as u64
                    }
                }
            };
            session.set_reg(rd, value & m);
            Exit::Continue
        }

        Insn::LdSt {
            op,
            width,
            rt,
            rn,
            mode,
        } => {
            let base = session.base(rn);
            let (addr, writeback) = match mode {
                AddrMode::Offset(off) => (base.wrapping_add(off as u64), None),
                AddrMode::Pre(off) => {
                    let a = base.wrapping_add(off as i64 as u64);
                    (a, Some(a))
                }
                AddrMode::Post(off) => (base, Some(base.wrapping_add(off as i64 as u64))),
            };
            let bytes = 1usize << op.size(width);
            if op.is_load() {
                let raw = session.load(addr, bytes);
                let value = if op.is_signed() {
                    let shift = 64 - 8 * bytes as u32;
                    (((raw << shift) as i64) >> shift) as u64
                } else {
                    raw
                };
                session.set_reg(rt, value & mask(width));
            } else {
                let value = session.reg(rt);
                session.store(addr, bytes, value);
            }
            if let Some(updated) = writeback {
                session.set_base(rn, updated);
            }
            Exit::Continue
        }
        Insn::LdStPair {
            load,
            width,
            rt,
            rt2,
            rn,
            imm7,
            mode,
        } => {
            let size = if width.is_64() { 8u64 } else { 4 };
            let off = (imm7 as i64 * size as i64) as u64;
            let base = session.base(rn);
            let (addr, writeback) = match mode {
                PairMode::Offset => (base.wrapping_add(off), None),
                PairMode::Pre => {
                    let a = base.wrapping_add(off);
                    (a, Some(a))
                }
                PairMode::Post => (base, Some(base.wrapping_add(off))),
            };
            if load {
                let lo = session.load(addr, size as usize) & mask(width);
                let hi = session.load(addr.wrapping_add(size), size as usize) & mask(width);
                session.set_reg(rt, lo);
                session.set_reg(rt2, hi);
            } else {
                let lo = session.reg(rt);
                let hi = session.reg(rt2);
                session.store(addr, size as usize, lo);
                session.store(addr.wrapping_add(size), size as usize, hi);
            }
            if let Some(updated) = writeback {
                session.set_base(rn, updated);
            }
            Exit::Continue
        }
        Insn::LdrLit { width, rt, imm19 } => {
            let addr = pc.wrapping_add((imm19 as i64 * 4) as u64);
            let bytes = if width.is_64() { 8 } else { 4 };
            let value = session.load(addr, bytes);
            session.set_reg(rt, value & mask(width));
            Exit::Continue
        }

        Insn::B { link, imm26 } => {
            if link {
                session.set_reg(30, pc.wrapping_add(4));
            }
            next = pc.wrapping_add((imm26 as i64 * 4) as u64);
            Exit::Continue
        }
        Insn::BCond { cond, imm19 } => {
            if cond.holds(session.n, session.z, session.c, session.v) {
                next = pc.wrapping_add((imm19 as i64 * 4) as u64);
            }
            Exit::Continue
        }
        Insn::Cbz {
            nonzero,
            width,
            rt,
            imm19,
        } => {
            let value = session.reg(rt) & mask(width);
            let taken = if nonzero { value != 0 } else { value == 0 };
            if taken {
                next = pc.wrapping_add((imm19 as i64 * 4) as u64);
            }
            Exit::Continue
        }
        Insn::Br { link, rn } => {
            let target = session.reg(rn);
            if link {
                session.set_reg(30, pc.wrapping_add(4));
            }
            next = target;
            Exit::Continue
        }
        Insn::Ret { rn: _ } => Exit::Return,

        Insn::Hint(_) => Exit::Continue,
        Insn::Barrier { .. } => Exit::Continue,

        Insn::Svc(imm) => {
            let ext = ExtOp::try_from(imm).map_err(|_| RunError::UnknownSvc { pc, imm })?;
            ext_call(session, host, ext)
        }
        // privileged calls with no handler behind them
        Insn::Hvc(_) | Insn::Smc(_) => Exit::Continue,
    };

    if exit != Exit::Halt {
        session.count_retired();
    }
    session.pc = next;
    Ok(exit)
}

/// Handles a trapped `svc` word without going through the fetch loop.
/// Rejects anything that is not a known service call.
pub fn trap(session: &mut Session, host: &mut dyn Host, word: u32) -> Result<Exit, RunError> {
    match Insn::decode(word) {
        Some(Insn::Svc(imm)) => match ExtOp::try_from(imm) {
            Ok(ext) => Ok(ext_call(session, host, ext)),
            Err(_) => Err(RunError::UnknownSvc {
                pc: session.pc,
                imm,
            }),
        },
        _ => Err(RunError::UnknownInsn {
            pc: session.pc,
            word,
        }),
    }
}

fn arith(session: &mut Session, op: ArithOp, width: Width, rd: u8, op1: u64, op2: u64) {
    let m = mask(width);
    let top = msb(width);
    let op1 = op1 & m;
    let op2 = op2 & m;
    let result = if op.is_sub() {
        op1.wrapping_sub(op2)
    } else {
        op1.wrapping_add(op2)
    } & m;
    if op.sets_flags() {
        session.n = result >> top & 1 == 1;
        session.z = result == 0;
        if op.is_sub() {
            session.c = op1 >= op2;
            session.v = ((op1 ^ op2) & (op1 ^ result)) >> top & 1 == 1;
        } else {
            session.c = result < op1;
            session.v = (!(op1 ^ op2) & (op1 ^ result)) >> top & 1 == 1;
        }
    }
    session.set_reg(rd, result);
}

fn logic(
    session: &mut Session,
    op: LogicOp,
    width: Width,
    rd: u8,
    op1: u64,
    op2: u64,
    invert: bool,
) {
    let m = mask(width);
    let a = op1 & m;
    let b = (if invert { !op2 } else { op2 }) & m;
    let result = match op {
        LogicOp::And | LogicOp::Ands => a & b,
        LogicOp::Orr => a | b,
        LogicOp::Eor => a ^ b,
    };
    if op.sets_flags() {
        session.n = result >> msb(width) & 1 == 1;
        session.z = result == 0;
        session.c = false;
        session.v = false;
    }
    session.set_reg(rd, result);
}

// ----------------------------------------------------------------------------
// Extended service calls. Memory arguments are clamped to the 5 KiB
// window; no service call can fault.

fn ext_call(session: &mut Session, host: &mut dyn Host, ext: ExtOp) -> Exit {
    match ext {
        ExtOp::Prt => {
            let text = session.string_at(session.reg(0));
            session.put_str(host, &text);
        }
        ExtOp::Prtc => {
            let byte = session.reg(0) as u8;
            session.put_byte(host, byte);
        }
        ExtOp::Prtn => {
            let text = format!("{}", session.reg(0) as i64);
            session.put_str(host, &text);
        }
        ExtOp::Prtx => {
            let text = format!("0x{:x}", session.reg(0));
            session.put_str(host, &text);
        }
        ExtOp::Inp => {
            session.flush(host);
            let byte = host.read_byte();
            session.set_reg(0, byte as u64);
        }
        ExtOp::Inps => {
            session.flush(host);
            read_line(session, host);
        }

        ExtOp::Cls => session.canvas_mut().clear(),
        ExtOp::Setc => {
            let (fg, bg) = (session.reg(0) as u8, session.reg(1) as u8);
            session.canvas_mut().set_colors(fg, bg);
        }
        ExtOp::Plot => {
            let (x, y) = (session.reg(0) as u8 as usize, session.reg(1) as u8 as usize);
            let ch = session.reg(2) as u8;
            session.canvas_mut().plot(x, y, ch);
        }
        ExtOp::Line => {
            let (x1, y1) = (session.reg(0) as u8 as usize, session.reg(1) as u8 as usize);
            let (x2, y2) = (session.reg(2) as u8 as usize, session.reg(3) as u8 as usize);
            let ch = session.reg(4) as u8;
            session.canvas_mut().line(x1, y1, x2, y2, ch);
        }
        ExtOp::Box => {
            let (x, y) = (session.reg(0) as u8 as usize, session.reg(1) as u8 as usize);
            let (w, h) = (session.reg(2) as u8 as usize, session.reg(3) as u8 as usize);
            session.canvas_mut().rect(x, y, w, h);
        }
        ExtOp::Reset => {
            if let Some(canvas) = session.canvas.as_mut() {
                canvas.reset_colors();
            }
        }
        ExtOp::Canvas => {
            let (w, h) = (session.reg(0) as u8 as usize, session.reg(1) as u8 as usize);
            session.canvas = Some(crate::canvas::Canvas::sized(w, h));
        }

        ExtOp::Fcreat => {
            let name = session.string_at(session.reg(0));
            let created = host.file_create(&name);
            session.set_reg(0, created as u64);
        }
        ExtOp::Fwrite => {
            let name = session.string_at(session.reg(0));
            let addr = session.reg(1) as usize;
            let len = session.reg(2) as usize;
            let start = addr.min(session.mem().len());
            let end = addr.saturating_add(len).min(session.mem().len());
            let data = session.mem()[start..end].to_vec();
            let written = data.len();
            let ok = host.file_write(&name, &data);
            session.set_reg(0, if ok { written as u64 } else { 0 });
        }
        ExtOp::Fread => {
            let name = session.string_at(session.reg(0));
            let addr = session.reg(1) as usize;
            let len = session.reg(2) as usize;
            let end = addr.saturating_add(len).min(session.mem().len());
            let start = addr.min(end);
            let count = host.file_read(&name, &mut session.mem_mut()[start..end]);
            session.set_reg(0, count as u64);
        }
        ExtOp::Fdel => {
            let name = session.string_at(session.reg(0));
            let ok = host.file_delete(&name);
            session.set_reg(0, ok as u64);
        }
        ExtOp::Fcopy => {
            let src = session.string_at(session.reg(0));
            let dst = session.string_at(session.reg(1));
            let ok = host.file_copy(&src, &dst);
            session.set_reg(0, ok as u64);
        }
        ExtOp::Fmove => {
            let src = session.string_at(session.reg(0));
            let dst = session.string_at(session.reg(1));
            let ok = host.file_move(&src, &dst);
            session.set_reg(0, ok as u64);
        }
        ExtOp::Fexist => {
            let name = session.string_at(session.reg(0));
            let exists = host.file_exists(&name);
            session.set_reg(0, exists as u64);
        }

        ExtOp::Strlen => {
            let len = session.string_at(session.reg(0)).len();
            session.set_reg(0, len as u64);
        }
        ExtOp::Memcpy => {
            let dst = session.reg(0);
            let src = session.reg(1);
            let len = span(session, src, session.reg(2)).min(span(session, dst, u64::MAX));
            // forward byte copy, overlap behaves like memmove downward
            for i in 0..len {
                let byte = session.load(src + i, 1);
                session.store(dst + i, 1, byte);
            }
        }
        ExtOp::Memset => {
            let dst = session.reg(0);
            let byte = session.reg(1) & 0xFF;
            let len = span(session, dst, session.reg(2));
            for i in 0..len {
                session.store(dst + i, 1, byte);
            }
        }
        ExtOp::Abs => {
            let value = (session.reg(0) as i64).wrapping_abs() as u64;
            session.set_reg(0, value);
        }

        ExtOp::Sleep => {
            session.flush(host);
            host.sleep_ms(session.reg(0) & 0xFFFF);
        }
        ExtOp::Rnd => {
            let bound = session.reg(0).max(1);
            let sample = session.next_random() % bound;
            session.set_reg(0, sample);
        }
        ExtOp::Tick => {
            let now = host.now_ms();
            session.set_reg(0, now);
        }
        ExtOp::Halt => {
            session.flush(host);
            return Exit::Halt;
        }
    }
    Exit::Continue
}

/// How many of `len` bytes starting at `addr` fall inside memory.
/// Block operations never walk past the end of the window.
fn span(session: &Session, addr: u64, len: u64) -> u64 {
    let size = session.mem().len() as u64;
    if addr >= size {
        0
    } else {
        len.min(size - addr)
    }
}

/// Line input with echo and backspace editing. The buffer address is
/// in reg0, the limit in reg1 (default 64, capped at 256); the final
/// length lands back in reg0.
fn read_line(session: &mut Session, host: &mut dyn Host) {
    let buf = session.reg(0);
    let limit = match session.reg(1) {
        0 => 64,
        n => n.min(256),
    } as usize;
    let mut len = 0usize;
    while len + 1 < limit {
        let byte = host.read_byte();
        match byte {
            b'\r' | b'\n' => {
                host.write_byte(b'\n');
                break;
            }
            0x7F | 0x08 => {
                if len > 0 {
                    len -= 1;
                    host.write_str("\x08 \x08");
                }
            }
            _ => {
                host.write_byte(byte);
                session.store(buf.wrapping_add(len as u64), 1, byte as u64);
                len += 1;
            }
        }
    }
    session.store(buf.wrapping_add(len as u64), 1, 0);
    session.set_reg(0, len as u64);
}
