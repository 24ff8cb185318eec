use casm::lexer::Lexer;
use casm::token::TokenKind;

fn case(src: &str) -> Vec<TokenKind<'_>> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let tok = lexer.next();
        let done = tok.kind == TokenKind::Eof;
        out.push(tok.kind);
        if done {
            return out;
        }
    }
}

#[test]
fn instruction_line() {
    assert_eq!(
        case("add x0, x1, #2\n"),
        vec![
            TokenKind::Ident("add"),
            TokenKind::Ident("x0"),
            TokenKind::Comma,
            TokenKind::Ident("x1"),
            TokenKind::Comma,
            TokenKind::Hash,
            TokenKind::Number(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn number_forms() {
    assert_eq!(
        case("0x1F 0b101 -123 42"),
        vec![
            TokenKind::Number(31),
            TokenKind::Number(5),
            TokenKind::Number(-123),
            TokenKind::Number(42),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn minus_fuses_only_before_digit() {
    let toks = case("-x");
    assert!(matches!(toks[0], TokenKind::Error(_)));
}

#[test]
fn fused_condition_mnemonic() {
    assert_eq!(
        case("b.eq loop"),
        vec![
            TokenKind::Ident("b.eq"),
            TokenKind::Ident("loop"),
            TokenKind::Eof,
        ]
    );
    // bcc spelling stays a plain identifier
    assert_eq!(
        case("beq loop"),
        vec![
            TokenKind::Ident("beq"),
            TokenKind::Ident("loop"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn comments_run_to_end_of_line() {
    assert_eq!(
        case("nop ; drop this\nret // and this\n"),
        vec![
            TokenKind::Ident("nop"),
            TokenKind::Newline,
            TokenKind::Ident("ret"),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn string_escapes() {
    assert_eq!(
        case(r#""hi\n\t\"\\\0""#),
        vec![
            TokenKind::Str("hi\n\t\"\\\0".to_string()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_string() {
    let toks = case("\"abc");
    assert!(matches!(toks[0], TokenKind::Error(_)));
}

#[test]
fn unexpected_character() {
    let toks = case("@");
    assert!(matches!(toks[0], TokenKind::Error(_)));
}

#[test]
fn eof_is_repeatable() {
    let mut lexer = Lexer::new("nop");
    assert_eq!(lexer.next().kind, TokenKind::Ident("nop"));
    assert_eq!(lexer.next().kind, TokenKind::Eof);
    assert_eq!(lexer.next().kind, TokenKind::Eof);
}

#[test]
fn line_numbers_advance() {
    let mut lexer = Lexer::new("a\nb\nc");
    assert_eq!(lexer.next().line, 1);
    assert_eq!(lexer.next().line, 1); // the newline itself
    assert_eq!(lexer.next().line, 2);
    assert_eq!(lexer.next().line, 2);
    assert_eq!(lexer.next().line, 3);
}

#[test]
fn peek_does_not_advance() {
    let mut lexer = Lexer::new("mov x0");
    assert_eq!(lexer.peek().kind, TokenKind::Ident("mov"));
    assert_eq!(lexer.peek().kind, TokenKind::Ident("mov"));
    assert_eq!(lexer.next().kind, TokenKind::Ident("mov"));
    assert_eq!(lexer.next().kind, TokenKind::Ident("x0"));
}
