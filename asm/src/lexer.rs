// lexer.rs

use crate::token::{Token, TokenKind};
use std::iter::Peekable;
use std::str::CharIndices;

pub struct Lexer<'a> {
    src: &'a str,
    iter: Peekable<CharIndices<'a>>,
    line: u32,
    peeked: Option<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            iter: src.char_indices().peekable(),
            line: 1,
            peeked: None,
        }
    }

    pub fn next(&mut self) -> Token<'a> {
        match self.peeked.take() {
            Some(tok) => tok,
            None => self.next_token(),
        }
    }

    pub fn peek(&mut self) -> &Token<'a> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_token());
        }
        self.peeked.as_ref().unwrap()
    }

    fn next_token(&mut self) -> Token<'a> {
        // 0. Skip spaces, tabs, CR; newline is significant
        while self
            .iter
            .next_if(|&(_, ch)| ch == ' ' || ch == '\t' || ch == '\r')
            .is_some()
        {}

        // 1. End of input (repeatable)
        let (start, c) = match self.iter.next() {
            Some(pair) => pair,
            None => return self.token(TokenKind::Eof),
        };

        // 2. Newline
        if c == '\n' {
            let tok = self.token(TokenKind::Newline);
            self.line += 1;
            return tok;
        }

        // 3. Comments run to end of line
        if c == ';' {
            return self.skip_comment();
        }
        if c == '/' {
            if self.iter.next_if(|&(_, ch)| ch == '/').is_some() {
                return self.skip_comment();
            }
            return self.token(TokenKind::Error(format!("unexpected character `{c}`")));
        }

        // 4. Punctuation
        match c {
            ',' => return self.token(TokenKind::Comma),
            ':' => return self.token(TokenKind::Colon),
            '#' => return self.token(TokenKind::Hash),
            '.' => return self.token(TokenKind::Dot),
            '!' => return self.token(TokenKind::Bang),
            '[' => return self.token(TokenKind::LBracket),
            ']' => return self.token(TokenKind::RBracket),
            _ => {}
        }

        // 5. Identifier, with the `b.eq`-style fused condition suffix
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(ptr, ch)) = self.iter.peek() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    self.iter.next();
                    end = ptr + ch.len_utf8();
                } else {
                    break;
                }
            }
            if self.src[start..end].eq_ignore_ascii_case("b") {
                if let Some(&(_, '.')) = self.iter.peek() {
                    let (ptr, _) = self.iter.next().unwrap_or((end, '.'));
                    end = ptr + 1;
                    while let Some(&(ptr, ch)) = self.iter.peek() {
                        if ch.is_ascii_alphanumeric() {
                            self.iter.next();
                            end = ptr + ch.len_utf8();
                        } else {
                            break;
                        }
                    }
                }
            }
            return self.token(TokenKind::Ident(&self.src[start..end]));
        }

        // 6. Number literal; unary minus fuses when a digit follows
        if c.is_ascii_digit() {
            return self.lex_number(c, false);
        }
        if c == '-' {
            if let Some((_, d)) = self.iter.next_if(|&(_, ch)| ch.is_ascii_digit()) {
                return self.lex_number(d, true);
            }
            return self.token(TokenKind::Error(format!("unexpected character `{c}`")));
        }

        // 7. String literal
        if c == '"' {
            return self.lex_string();
        }

        self.token(TokenKind::Error(format!("unexpected character `{c}`")))
    }

    fn skip_comment(&mut self) -> Token<'a> {
        while self.iter.next_if(|&(_, ch)| ch != '\n').is_some() {}
        self.next_token()
    }

    fn lex_number(&mut self, first: char, negative: bool) -> Token<'a> {
        let radix = if first == '0' {
            match self.iter.peek() {
                Some(&(_, 'x')) | Some(&(_, 'X')) => {
                    self.iter.next();
                    16
                }
                Some(&(_, 'b')) | Some(&(_, 'B')) => {
                    self.iter.next();
                    2
                }
                _ => 10,
            }
        } else {
            10
        };

        let mut value: i64 = if radix == 10 { first as i64 - '0' as i64 } else { 0 };
        while let Some((_, ch)) = self.iter.next_if(|&(_, ch)| ch.is_ascii_alphanumeric()) {
            match ch.to_digit(radix) {
                Some(d) => value = value.wrapping_mul(radix as i64).wrapping_add(d as i64),
                None => {
                    return self.token(TokenKind::Error(format!(
                        "bad digit `{ch}` in number literal"
                    )))
                }
            }
        }
        self.token(TokenKind::Number(if negative { -value } else { value }))
    }

    fn lex_string(&mut self) -> Token<'a> {
        let mut out = String::new();
        loop {
            match self.iter.next() {
                None => {
                    return self.token(TokenKind::Error("unterminated string literal".into()))
                }
                Some((_, '"')) => return self.token(TokenKind::Str(out)),
                Some((_, '\n')) => {
                    let tok = self.token(TokenKind::Error("unterminated string literal".into()));
                    self.line += 1;
                    return tok;
                }
                Some((_, '\\')) => match self.iter.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, other)) => out.push(other),
                    None => {
                        return self.token(TokenKind::Error("unterminated string literal".into()))
                    }
                },
                Some((_, ch)) => out.push(ch),
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>) -> Token<'a> {
        Token::new(kind, self.line)
    }
}
