use casm::assemble;
use casm::parser::Parser;
use casm::printer;

const PROGRAM: &str = "\
.global start
start:
    mov x0, #72
    movk x1, #0xBEEF, lsl #16
    adds x2, x0, #1
    b.ne skip
    ldr x3, [sp, #8]
    str x3, [x1], #4
    stp x29, x30, [sp, #-16]!
    ldr x4, message
skip:
    prt
    halt
message:
    .asciz \"hello\\n\"
    .align 2
    .word 0xCAFE
";

#[test]
fn print_parse_reaches_a_fixpoint() {
    let ast = Parser::new(PROGRAM).parse().unwrap();
    let printed = printer::print(&ast).unwrap();
    let ast2 = Parser::new(&printed).parse().unwrap();
    let printed2 = printer::print(&ast2).unwrap();
    assert_eq!(printed, printed2);
}

#[test]
fn printed_text_assembles_identically() {
    let ast = Parser::new(PROGRAM).parse().unwrap();
    let printed = printer::print(&ast).unwrap();
    assert_eq!(assemble(PROGRAM).unwrap(), assemble(&printed).unwrap());
}

#[test]
fn aliases_normalize() {
    let ast = Parser::new("mov lr, xzr\nldr w0, [sp]\n").parse().unwrap();
    let printed = printer::print(&ast).unwrap();
    // lr prints as x30; register 31 prints as sp in 64-bit contexts
    assert!(printed.contains("mov x30, sp"));
    assert!(printed.contains("ldr w0, [sp]"));
}

#[test]
fn mnemonics_lowercase() {
    let ast = Parser::new("NOP\nB.EQ there\nthere:\n").parse().unwrap();
    let printed = printer::print(&ast).unwrap();
    assert!(printed.contains("nop"));
    assert!(printed.contains("b.eq there"));
}

#[test]
fn print_capacity_is_enforced() {
    let ast = Parser::new("nop\nnop\nnop\n").parse().unwrap();
    assert!(printer::print_with_capacity(&ast, 8).is_err());
}
