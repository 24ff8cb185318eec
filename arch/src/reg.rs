use serde::{Deserialize, Serialize};

/// Operand width, derived from the `x`/`w` register prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Width {
    W32,
    #[default]
    W64,
}

impl Width {
    pub fn is_64(self) -> bool {
        matches!(self, Width::W64)
    }

    /// The `sf` bit of most encodings.
    pub fn sf(self) -> u32 {
        match self {
            Width::W32 => 0,
            Width::W64 => 1,
        }
    }

    pub fn from_sf(bit: u32) -> Width {
        if bit & 1 == 1 {
            Width::W64
        } else {
            Width::W32
        }
    }
}

/// A general-purpose register operand. Number 31 is the zero register in
/// register-operand contexts and the stack pointer in base-address contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reg {
    pub num: u8,
    pub width: Width,
}

pub const ZR: u8 = 31;
pub const LR: u8 = 30;

impl Reg {
    pub fn x(num: u8) -> Reg {
        Reg { num, width: Width::W64 }
    }

    pub fn w(num: u8) -> Reg {
        Reg { num, width: Width::W32 }
    }

    /// Recognize `x0`-`x30`, `w0`-`w30`, `sp`, `lr`, `xzr`, `wzr`.
    /// Anything else is not a register name.
    pub fn parse(s: &str) -> Option<Reg> {
        match s.to_ascii_lowercase().as_str() {
            "sp" | "xzr" => return Some(Reg::x(ZR)),
            "wzr" => return Some(Reg::w(ZR)),
            "lr" => return Some(Reg::x(LR)),
            _ => {}
        }
        let lower = s.to_ascii_lowercase();
        let (prefix, rest) = lower.split_at(1);
        let width = match prefix {
            "x" => Width::W64,
            "w" => Width::W32,
            _ => return None,
        };
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let num: u8 = rest.parse().ok()?;
        if num > 30 {
            return None;
        }
        Some(Reg { num, width })
    }

    pub fn field(self) -> u32 {
        self.num as u32
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.num == ZR {
            return match self.width {
                Width::W64 => write!(f, "sp"),
                Width::W32 => write!(f, "wzr"),
            };
        }
        match self.width {
            Width::W64 => write!(f, "x{}", self.num),
            Width::W32 => write!(f, "w{}", self.num),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Reg::parse("x0"), Some(Reg::x(0)));
        assert_eq!(Reg::parse("X30"), Some(Reg::x(30)));
        assert_eq!(Reg::parse("w7"), Some(Reg::w(7)));
        assert_eq!(Reg::parse("lr"), Some(Reg::x(30)));
        assert_eq!(Reg::parse("sp"), Some(Reg::x(31)));
        assert_eq!(Reg::parse("xzr"), Some(Reg::x(31)));
        assert_eq!(Reg::parse("wzr"), Some(Reg::w(31)));
        assert_eq!(Reg::parse("x31"), None);
        assert_eq!(Reg::parse("w32"), None);
        assert_eq!(Reg::parse("hoge"), None);
        assert_eq!(Reg::parse("x"), None);
    }
}
