pub mod cond;
pub mod ext;
pub mod insn;
pub mod reg;
