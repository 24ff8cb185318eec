use color_print::cprintln;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Lexical(String),

    #[error("expected {expected}, found `{found}`")]
    UnexpectedToken { expected: String, found: String },

    #[error("too many operands (limit {0})")]
    TooManyOperands(usize),

    #[error("node pool exhausted (limit {0})")]
    NodeLimit(usize),

    #[error("unknown mnemonic: `{0}`")]
    UnknownMnemonic(String),

    #[error("symbol name too long: `{0}`")]
    SymbolTooLong(String),

    #[error("duplicate symbol: `{0}`")]
    DuplicateSymbol(String),

    #[error("undefined symbol: `{0}`")]
    UndefinedSymbol(String),

    #[error("bad operands for `{0}`")]
    OperandMismatch(String),

    #[error("immediate out of range: {0}")]
    ImmRange(i64),

    #[error("branch offset out of range: {0}")]
    BranchRange(i64),

    #[error("misaligned offset: {0}")]
    Misaligned(i64),

    #[error("code buffer overflow (limit {0} bytes)")]
    BufferOverflow(usize),

    #[error("output buffer overflow (limit {0} bytes)")]
    PrintOverflow(usize),
}

impl Error {
    pub fn at(self, line: u32) -> Diag {
        Diag { error: self, line }
    }
}

/// An [`Error`] pinned to the source line it was raised on. The first
/// diagnostic of a run is the only one; later stages never see the input.
#[derive(Debug, PartialEq, Eq)]
pub struct Diag {
    pub error: Error,
    pub line: u32,
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {})", self.error, self.line)
    }
}

impl Diag {
    /// Print error with diagnostic information showing file location and line content
    pub fn print_diag(&self, file: &str, src: &str) {
        cprintln!("<red,bold>error</>: {}", self.error);
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, self.line);
        cprintln!("      <blue>|</>");
        let content = src
            .lines()
            .nth(self.line.saturating_sub(1) as usize)
            .unwrap_or("");
        cprintln!(" <blue>{:>4} |</> {}", self.line, content);
        cprintln!("      <blue>|</>");
    }
}
