//! VM state and the main execution loop.
//!
//! All mutable machine state lives in one [`Session`] value. The
//! interpreter loop, the service-call handler and the hook machinery
//! all borrow it rather than touching globals, so two programs can run
//! back to back (or in parallel) without bleeding into each other.

use thiserror::Error;

use crate::canvas::Canvas;
use crate::dispatch::{self, Exit};
use crate::hooks::Hook;
use crate::host::Host;

/// Bytes of flat memory. The code image loads at address 0; everything
/// after it is scratch space.
pub const MEM_SIZE: usize = 5120;

/// Retired-instruction ceiling per run.
pub const STEP_LIMIT: u64 = 10_000;

/// Console output held back until a flush point.
const OUT_BUF: usize = 256;

const RNG_SEED: u32 = 12345;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("program is {0} bytes, memory holds {MEM_SIZE}")]
    ImageTooLarge(usize),
    #[error("undecodable word {word:#010x} at pc={pc:#06x}")]
    UnknownInsn { pc: u64, word: u32 },
    #[error("unknown service call {imm:#06x} at pc={pc:#06x}")]
    UnknownSvc { pc: u64, imm: u16 },
    #[error("step limit reached ({STEP_LIMIT} instructions)")]
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Instructions retired, not counting the final `halt`.
    pub retired: u64,
}

pub struct Session {
    regs: [u64; 32],
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
    pub pc: u64,
    mem: Vec<u8>,
    code_len: usize,
    retired: u64,
    rng: u32,
    pub(crate) canvas: Option<Canvas>,
    out: Vec<u8>,
}

impl Session {
    pub fn new(image: &[u8]) -> Result<Self, RunError> {
        if image.len() > MEM_SIZE {
            return Err(RunError::ImageTooLarge(image.len()));
        }
        let mut mem = vec![0u8; MEM_SIZE];
        mem[..image.len()].copy_from_slice(image);
        Ok(Self {
            regs: [0; 32],
            n: false,
            z: false,
            c: false,
            v: false,
            pc: 0,
            mem,
            code_len: image.len(),
            retired: 0,
            rng: RNG_SEED,
            canvas: None,
            out: Vec::new(),
        })
    }

    pub fn retired(&self) -> u64 {
        self.retired
    }

    pub(crate) fn count_retired(&mut self) {
        self.retired += 1;
    }

    pub fn code_len(&self) -> usize {
        self.code_len
    }

    // ------------------------------------------------------------------------
    // Registers. Slot 31 reads as zero and swallows writes in operand
    // position; base-address accessors below see the raw stack slot.

    pub fn reg(&self, num: u8) -> u64 {
        if num == 31 {
            0
        } else {
            self.regs[num as usize]
        }
    }

    pub fn set_reg(&mut self, num: u8, value: u64) {
        if num != 31 {
            self.regs[num as usize] = value;
        }
    }

    pub fn base(&self, num: u8) -> u64 {
        self.regs[num as usize]
    }

    pub fn set_base(&mut self, num: u8, value: u64) {
        self.regs[num as usize] = value;
    }

    // ------------------------------------------------------------------------
    // Memory. Accesses outside the 5 KiB window are clamped: loads
    // read zero, stores drop. Service calls share the same policy.

    pub fn load(&self, addr: u64, size: usize) -> u64 {
        let mut value = 0u64;
        for i in 0..size {
            let byte = addr
                .checked_add(i as u64)
                .and_then(|a| self.mem.get(a as usize))
                .copied()
                .unwrap_or(0);
            value |= (byte as u64) << (8 * i);
        }
        value
    }

    pub fn store(&mut self, addr: u64, size: usize, value: u64) {
        for i in 0..size {
            if let Some(slot) = addr
                .checked_add(i as u64)
                .and_then(|a| self.mem.get_mut(a as usize))
            {
                *slot = (value >> (8 * i)) as u8;
            }
        }
    }

    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }

    /// NUL-terminated string starting at `addr`, clamped to memory.
    pub fn string_at(&self, addr: u64) -> String {
        let start = (addr as usize).min(self.mem.len());
        let bytes = self.mem[start..]
            .iter()
            .take_while(|&&b| b != 0)
            .copied()
            .collect::<Vec<u8>>();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Code word at `addr`, if it lies inside the loaded image.
    pub fn fetch(&self, addr: u64) -> Option<u32> {
        let addr = addr as usize;
        match addr.checked_add(4) {
            Some(end) if end <= self.code_len => {}
            _ => return None,
        }
        let bytes = [
            self.mem[addr],
            self.mem[addr + 1],
            self.mem[addr + 2],
            self.mem[addr + 3],
        ];
        Some(u32::from_le_bytes(bytes))
    }

    // ------------------------------------------------------------------------

    /// Linear congruential generator shared by the `rnd` service call.
    pub(crate) fn next_random(&mut self) -> u64 {
        self.rng = self.rng.wrapping_mul(1103515245).wrapping_add(12345);
        (self.rng >> 16) as u64
    }

    pub(crate) fn canvas_mut(&mut self) -> &mut Canvas {
        self.canvas.get_or_insert_with(Canvas::new)
    }

    // ------------------------------------------------------------------------
    // Buffered console output. Bytes collect in `out` and reach the
    // host on newline, when the buffer fills, before any blocking
    // read, and at end of run.

    pub(crate) fn put_byte(&mut self, host: &mut dyn Host, byte: u8) {
        self.out.push(byte);
        if byte == b'\n' || self.out.len() >= OUT_BUF {
            self.flush(host);
        }
    }

    pub(crate) fn put_str(&mut self, host: &mut dyn Host, s: &str) {
        for b in s.bytes() {
            self.put_byte(host, b);
        }
    }

    pub(crate) fn flush(&mut self, host: &mut dyn Host) {
        if self.out.is_empty() {
            return;
        }
        for &b in &self.out {
            host.write_byte(b);
        }
        self.out.clear();
    }

    // ------------------------------------------------------------------------

    /// Runs until `halt`, `ret` at top level, or the pc leaving the
    /// image. Hooks observe each instruction after it executes.
    pub fn run(
        &mut self,
        host: &mut dyn Host,
        hooks: &mut [Box<dyn Hook>],
    ) -> Result<RunStats, RunError> {
        loop {
            let pc = self.pc;
            let word = match self.fetch(pc) {
                Some(word) => word,
                None => break,
            };
            if self.retired >= STEP_LIMIT {
                self.flush(host);
                return Err(RunError::StepLimit);
            }
            let exit = match dispatch::step(self, host, word) {
                Ok(exit) => exit,
                Err(err) => {
                    self.flush(host);
                    return Err(err);
                }
            };
            for hook in hooks.iter_mut() {
                hook.exec(pc, word, self);
            }
            match exit {
                Exit::Continue => {}
                Exit::Halt | Exit::Return => break,
            }
        }
        self.flush(host);
        if let Some(canvas) = &self.canvas {
            host.write_str(&canvas.render());
        }
        Ok(RunStats {
            retired: self.retired,
        })
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_limit() {
        assert!(Session::new(&vec![0u8; MEM_SIZE]).is_ok());
        match Session::new(&vec![0u8; MEM_SIZE + 1]) {
            Err(RunError::ImageTooLarge(n)) => assert_eq!(n, MEM_SIZE + 1),
            _ => panic!("oversized image accepted"),
        }
    }

    #[test]
    fn register_slot_31() {
        let mut s = Session::new(&[]).unwrap();
        s.set_reg(31, 99);
        assert_eq!(s.reg(31), 0);
        s.set_base(31, 0x1000);
        assert_eq!(s.base(31), 0x1000);
        assert_eq!(s.reg(31), 0);
    }

    #[test]
    fn memory_clamps_out_of_range() {
        let mut s = Session::new(&[]).unwrap();
        s.store(MEM_SIZE as u64, 4, 0xDEADBEEF);
        assert_eq!(s.load(MEM_SIZE as u64, 4), 0);
        s.store(MEM_SIZE as u64 - 2, 4, 0xAABBCCDD);
        // first two bytes land, the rest drop
        assert_eq!(s.load(MEM_SIZE as u64 - 2, 2), 0xCCDD);
    }

    #[test]
    fn string_reads_stop_at_nul() {
        let mut s = Session::new(&[]).unwrap();
        let base = 0x100;
        for (i, b) in b"hi\0zz".iter().enumerate() {
            s.store(base + i as u64, 1, *b as u64);
        }
        assert_eq!(s.string_at(base), "hi");
        assert_eq!(s.string_at(MEM_SIZE as u64 + 10), "");
    }
}
