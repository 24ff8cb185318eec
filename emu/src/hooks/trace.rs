use arch::insn::Insn;
use color_print::ceprintln;

use crate::hooks::Hook;
use crate::session::Session;

/// Prints every retired instruction to stderr, so the trace interleaves
/// cleanly with the program's own stdout.
pub struct Trace;

impl Hook for Trace {
    fn exec(&mut self, pc: u64, word: u32, session: &Session) {
        match Insn::decode(word) {
            Some(insn) => {
                ceprintln!("<blue>[{:>5}]</> {:04x}: {}", session.retired(), pc, insn.cformat())
            }
            None => ceprintln!("<blue>[{:>5}]</> {:04x}: <r>??</> {:08x}", session.retired(), pc, word),
        }
    }
}
