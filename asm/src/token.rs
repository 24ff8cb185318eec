// token.rs

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub line: u32,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, line: u32) -> Self {
        Token { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Punctuation
    Comma,    // ','
    Colon,    // ':'
    Hash,     // '#'
    Dot,      // '.'
    Bang,     // '!'
    LBracket, // '['
    RBracket, // ']'

    // Identifier (slice of the source buffer)
    Ident(&'a str),

    // Literals
    Number(i64),
    Str(String),

    // Special
    Newline,
    Eof,
    Error(String),
}

impl std::fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Hash => write!(f, "#"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Ident(s) => write!(f, "{s}"),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Newline => write!(f, "\\n"),
            TokenKind::Eof => write!(f, "<eof>"),
            TokenKind::Error(msg) => write!(f, "<error: {msg}>"),
        }
    }
}
