pub mod dump;
pub mod trace;

use crate::session::Session;

/// Side-channel observers driven from the run loop. Each retired
/// instruction is reported with the pc it executed at and its word.
pub trait Hook {
    fn exec(&mut self, pc: u64, word: u32, session: &Session);
}
