use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The 4-bit condition field of conditional branches. `Nv` exists only so
/// that every bit pattern decodes; it has no accepted spelling and, like
/// `Al`, is always true.
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
#[repr(u8)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Cond {
    Eq = 0,
    Ne = 1,
    #[strum(serialize = "cs", serialize = "hs")]
    Cs = 2,
    #[strum(serialize = "cc", serialize = "lo")]
    Cc = 3,
    Mi = 4,
    Pl = 5,
    Vs = 6,
    Vc = 7,
    Hi = 8,
    Ls = 9,
    Ge = 10,
    Lt = 11,
    Gt = 12,
    Le = 13,
    Al = 14,
    #[strum(disabled)]
    Nv = 15,
}

impl Cond {
    /// Evaluate against the NZCV flags.
    pub fn holds(self, n: bool, z: bool, c: bool, v: bool) -> bool {
        match self {
            Cond::Eq => z,
            Cond::Ne => !z,
            Cond::Cs => c,
            Cond::Cc => !c,
            Cond::Mi => n,
            Cond::Pl => !n,
            Cond::Vs => v,
            Cond::Vc => !v,
            Cond::Hi => c && !z,
            Cond::Ls => !c || z,
            Cond::Ge => n == v,
            Cond::Lt => n != v,
            Cond::Gt => !z && (n == v),
            Cond::Le => z || (n != v),
            Cond::Al | Cond::Nv => true,
        }
    }

    pub fn field(self) -> u32 {
        u8::from(self) as u32
    }
}
