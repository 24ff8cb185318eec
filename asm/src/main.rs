use casm::codegen::CodeGen;
use casm::parser::Parser;
use color_print::{cformat, cprintln};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "CASM assembler", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    #[clap(default_value = "main.s")]
    input: String,

    /// Output file
    #[clap(short, long, default_value = "main.bin")]
    output: String,

    /// Dump the symbol table and generated words
    #[clap(short, long)]
    dump: bool,
}

fn main() {
    use clap::Parser as _;

    let args: Args = Args::parse();

    let src = match std::fs::read_to_string(&args.input) {
        Ok(src) => src,
        Err(e) => {
            cprintln!("<red,bold>error</>: failed to open `{}`: {}", args.input, e);
            std::process::exit(1);
        }
    };

    let ast = match Parser::new(&src).parse() {
        Ok(ast) => ast,
        Err(diag) => {
            diag.print_diag(&args.input, &src);
            std::process::exit(1);
        }
    };

    let mut gen = CodeGen::new();
    if let Err(diag) = gen.generate(&ast) {
        diag.print_diag(&args.input, &src);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&args.output, gen.code()) {
        cprintln!("<red,bold>error</>: failed to write `{}`: {}", args.output, e);
        std::process::exit(1);
    }
    println!("{}", cformat!("<green>></> {} ({} bytes)", args.output, gen.code().len()));

    if args.dump {
        let symbols: Vec<_> = gen.symbols().collect();
        if !symbols.is_empty() {
            println!("Symbols:");
            for sym in symbols {
                let global = if sym.global { " (global)" } else { "" };
                println!("  {} = 0x{:x}{}", sym.name, sym.addr, global);
            }
        }
        for (i, word) in gen.code().chunks(4).enumerate() {
            let mut value = 0u32;
            for (j, &b) in word.iter().enumerate() {
                value |= (b as u32) << (j * 8);
            }
            println!("  {:04x}: {:08x}", i * 4, value);
        }
    }
}
