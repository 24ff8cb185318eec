// ident.rs
//
// Mnemonic and directive identity, resolved once at parse time so code
// generation never compares strings.

use arch::cond::Cond;
use arch::ext::ExtOp;
use std::str::FromStr;
use strum::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Mnemonic {
    Mov,
    Movz,
    Movn,
    Movk,
    Add,
    Adds,
    Sub,
    Subs,
    And,
    Ands,
    Orr,
    Eor,
    Bic,
    Orn,
    Mvn,
    Neg,
    Cmp,
    Cmn,
    Tst,
    Mul,
    Udiv,
    Sdiv,
    Lsl,
    Lsr,
    Asr,
    Ror,
    Ldr,
    Ldrb,
    Ldrh,
    Ldrsb,
    Ldrsh,
    Ldrsw,
    Str,
    Strb,
    Strh,
    Ldp,
    Stp,
    B,
    Bl,
    Br,
    Blr,
    Ret,
    Cbz,
    Cbnz,
    Nop,
    Wfi,
    Wfe,
    Sev,
    Sevl,
    Dmb,
    Dsb,
    Isb,
    Svc,
    Hvc,
    Smc,
    /// `b.eq` / `beq` spellings, resolved through [`Cond`].
    #[strum(disabled)]
    Bcc(Cond),
    /// Extended pseudo-opcode, assembling to a reserved `svc` immediate.
    #[strum(disabled)]
    Ext(ExtOp),
}

impl Mnemonic {
    /// Case-insensitive lookup covering the plain table, the extended
    /// opcodes, and both conditional-branch spellings.
    pub fn parse(name: &str) -> Option<Mnemonic> {
        let lower = name.to_ascii_lowercase();
        if let Ok(m) = Mnemonic::from_str(&lower) {
            return Some(m);
        }
        if let Ok(ext) = ExtOp::from_str(&lower) {
            return Some(Mnemonic::Ext(ext));
        }
        let suffix = lower.strip_prefix("b.").or_else(|| lower.strip_prefix('b'))?;
        Cond::from_str(suffix).ok().map(Mnemonic::Bcc)
    }
}

impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mnemonic::Bcc(cond) => return write!(f, "b.{cond}"),
            Mnemonic::Ext(ext) => return write!(f, "{ext}"),
            Mnemonic::Mov => "mov",
            Mnemonic::Movz => "movz",
            Mnemonic::Movn => "movn",
            Mnemonic::Movk => "movk",
            Mnemonic::Add => "add",
            Mnemonic::Adds => "adds",
            Mnemonic::Sub => "sub",
            Mnemonic::Subs => "subs",
            Mnemonic::And => "and",
            Mnemonic::Ands => "ands",
            Mnemonic::Orr => "orr",
            Mnemonic::Eor => "eor",
            Mnemonic::Bic => "bic",
            Mnemonic::Orn => "orn",
            Mnemonic::Mvn => "mvn",
            Mnemonic::Neg => "neg",
            Mnemonic::Cmp => "cmp",
            Mnemonic::Cmn => "cmn",
            Mnemonic::Tst => "tst",
            Mnemonic::Mul => "mul",
            Mnemonic::Udiv => "udiv",
            Mnemonic::Sdiv => "sdiv",
            Mnemonic::Lsl => "lsl",
            Mnemonic::Lsr => "lsr",
            Mnemonic::Asr => "asr",
            Mnemonic::Ror => "ror",
            Mnemonic::Ldr => "ldr",
            Mnemonic::Ldrb => "ldrb",
            Mnemonic::Ldrh => "ldrh",
            Mnemonic::Ldrsb => "ldrsb",
            Mnemonic::Ldrsh => "ldrsh",
            Mnemonic::Ldrsw => "ldrsw",
            Mnemonic::Str => "str",
            Mnemonic::Strb => "strb",
            Mnemonic::Strh => "strh",
            Mnemonic::Ldp => "ldp",
            Mnemonic::Stp => "stp",
            Mnemonic::B => "b",
            Mnemonic::Bl => "bl",
            Mnemonic::Br => "br",
            Mnemonic::Blr => "blr",
            Mnemonic::Ret => "ret",
            Mnemonic::Cbz => "cbz",
            Mnemonic::Cbnz => "cbnz",
            Mnemonic::Nop => "nop",
            Mnemonic::Wfi => "wfi",
            Mnemonic::Wfe => "wfe",
            Mnemonic::Sev => "sev",
            Mnemonic::Sevl => "sevl",
            Mnemonic::Dmb => "dmb",
            Mnemonic::Dsb => "dsb",
            Mnemonic::Isb => "isb",
            Mnemonic::Svc => "svc",
            Mnemonic::Hvc => "hvc",
            Mnemonic::Smc => "smc",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Directive {
    Text,
    Data,
    Bss,
    #[strum(serialize = "global", serialize = "globl")]
    Global,
    #[strum(serialize = "align", serialize = "p2align")]
    Align,
    Balign,
    Byte,
    Hword,
    Word,
    Quad,
    #[strum(serialize = "space", serialize = "skip")]
    Space,
    Ascii,
    #[strum(serialize = "asciz", serialize = "string")]
    Asciz,
    #[strum(serialize = "equ", serialize = "set")]
    Equ,
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Directive::Text => "text",
            Directive::Data => "data",
            Directive::Bss => "bss",
            Directive::Global => "global",
            Directive::Align => "align",
            Directive::Balign => "balign",
            Directive::Byte => "byte",
            Directive::Hword => "hword",
            Directive::Word => "word",
            Directive::Quad => "quad",
            Directive::Space => "space",
            Directive::Ascii => "ascii",
            Directive::Asciz => "asciz",
            Directive::Equ => "equ",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mnemonics() {
        assert_eq!(Mnemonic::parse("add"), Some(Mnemonic::Add));
        assert_eq!(Mnemonic::parse("LDR"), Some(Mnemonic::Ldr));
        assert_eq!(Mnemonic::parse("bl"), Some(Mnemonic::Bl));
        assert_eq!(Mnemonic::parse("frobnicate"), None);
    }

    #[test]
    fn conditional_spellings() {
        assert_eq!(Mnemonic::parse("b.eq"), Some(Mnemonic::Bcc(Cond::Eq)));
        assert_eq!(Mnemonic::parse("bne"), Some(Mnemonic::Bcc(Cond::Ne)));
        assert_eq!(Mnemonic::parse("b.hs"), Some(Mnemonic::Bcc(Cond::Cs)));
        assert_eq!(Mnemonic::parse("blo"), Some(Mnemonic::Bcc(Cond::Cc)));
        // no explicit nv spelling
        assert_eq!(Mnemonic::parse("b.nv"), None);
    }

    #[test]
    fn extended_opcodes() {
        assert_eq!(Mnemonic::parse("prt"), Some(Mnemonic::Ext(ExtOp::Prt)));
        assert_eq!(Mnemonic::parse("halt"), Some(Mnemonic::Ext(ExtOp::Halt)));
        assert_eq!(Mnemonic::parse("fcreat"), Some(Mnemonic::Ext(ExtOp::Fcreat)));
    }

    #[test]
    fn directive_aliases() {
        use std::str::FromStr;
        assert_eq!(Directive::from_str("globl"), Ok(Directive::Global));
        assert_eq!(Directive::from_str("skip"), Ok(Directive::Space));
        assert_eq!(Directive::from_str("string"), Ok(Directive::Asciz));
        assert_eq!(Directive::from_str("set"), Ok(Directive::Equ));
        assert!(Directive::from_str("unknowndir").is_err());
    }
}
