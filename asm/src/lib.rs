pub mod ast;
pub mod codegen;
pub mod error;
pub mod ident;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

use crate::codegen::CodeGen;
use crate::error::Diag;

/// Assemble a source string into a raw little-endian image.
pub fn assemble(src: &str) -> Result<Vec<u8>, Diag> {
    let ast = parser::Parser::new(src).parse()?;
    let mut gen = CodeGen::new();
    gen.generate(&ast)?;
    Ok(gen.into_code())
}
