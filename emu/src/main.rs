use color_print::cprintln;

use cvm::hooks::{dump::Dump, trace::Trace, Hook};
use cvm::host::StdHost;
use cvm::session::{RunError, Session};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "CASM virtual machine", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input binary
    #[clap(default_value = "main.bin")]
    input: String,

    /// Print each instruction as it executes
    #[clap(short, long)]
    trace: bool,

    /// Disassemble the binary instead of running it
    #[clap(short, long)]
    disasm: bool,

    /// Watchpoint config (YAML)
    #[clap(long)]
    dump_cfg: Option<String>,

    /// Suppress the retired-instruction summary
    #[clap(short, long)]
    quiet: bool,
}

fn main() {
    use clap::Parser as _;

    let args: Args = Args::parse();

    let image = match std::fs::read(&args.input) {
        Ok(image) => image,
        Err(e) => {
            cprintln!("<red,bold>error</>: failed to open `{}`: {}", args.input, e);
            std::process::exit(1);
        }
    };

    if args.disasm {
        disassemble(&image);
        return;
    }

    let mut session = match Session::new(&image) {
        Ok(session) => session,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            std::process::exit(1);
        }
    };

    let mut hooks: Vec<Box<dyn Hook>> = Vec::new();
    if args.trace {
        hooks.push(Box::new(Trace));
    }
    if let Some(path) = &args.dump_cfg {
        match Dump::from_file(path) {
            Ok(dump) => hooks.push(Box::new(dump)),
            Err(e) => {
                cprintln!("<red,bold>error</>: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut host = StdHost::new();
    match session.run(&mut host, &mut hooks) {
        Ok(stats) => {
            if !args.quiet {
                cprintln!("<green>></> {} instructions retired", stats.retired);
            }
        }
        Err(err) => {
            cprintln!("<red,bold>error</>: {}", err);
            if let RunError::StepLimit = err {
                cprintln!("<red,bold>error</>: stopped at pc={:#06x}", session.pc);
            }
            std::process::exit(1);
        }
    }
}

fn disassemble(image: &[u8]) {
    use arch::insn::Insn;

    for (i, chunk) in image.chunks(4).enumerate() {
        let mut word = 0u32;
        for (j, &b) in chunk.iter().enumerate() {
            word |= (b as u32) << (j * 8);
        }
        match Insn::decode(word) {
            Some(insn) => println!("{:04x}: {:08x}  {}", i * 4, word, insn.cformat()),
            None => cprintln!("{:04x}: {:08x}  <yellow>.word {:#010x}</>", i * 4, word, word),
        }
    }
}
