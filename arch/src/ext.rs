use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Extended pseudo-opcodes. Each assembles to `svc #imm16` with the reserved
/// immediate below; the execution engine intercepts the trap instead of
/// taking a real supervisor call.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
)]
#[repr(u16)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExtOp {
    // Console I/O
    Prt = 0x100,
    Prtc = 0x101,
    Prtn = 0x102,
    Inp = 0x103,
    Inps = 0x104,
    Prtx = 0x105,
    // Text-mode graphics
    Cls = 0x110,
    Setc = 0x111,
    Plot = 0x112,
    Line = 0x113,
    Box = 0x114,
    Reset = 0x115,
    Canvas = 0x116,
    // File access
    Fcreat = 0x120,
    Fwrite = 0x121,
    Fread = 0x122,
    Fdel = 0x123,
    Fcopy = 0x124,
    Fmove = 0x125,
    Fexist = 0x126,
    // Memory / strings
    Strlen = 0x130,
    Memcpy = 0x131,
    Memset = 0x132,
    Abs = 0x133,
    // System
    Sleep = 0x1F0,
    Rnd = 0x1F1,
    Tick = 0x1F2,
    Halt = 0x1FF,
}

impl ExtOp {
    pub fn imm16(self) -> u16 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn table() {
        assert_eq!(ExtOp::from_str("prt"), Ok(ExtOp::Prt));
        assert_eq!(ExtOp::from_str("fcreat"), Ok(ExtOp::Fcreat));
        assert_eq!(ExtOp::Halt.imm16(), 0x1FF);
        assert_eq!(ExtOp::try_from(0x112u16), Ok(ExtOp::Plot));
        assert!(ExtOp::try_from(0x150u16).is_err());
    }
}
