use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use loxvm::{InterpretResult, VM};

#[derive(Parser)]
#[command(name = "loxvm", about = "Bytecode virtual machine for Lox scripts")]
struct Cli {
    /// script to run; starts a REPL when omitted
    script: Option<PathBuf>,

    /// raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn exit_code(result: InterpretResult) -> Option<i32> {
    match result {
        InterpretResult::InterpretOk => None,
        InterpretResult::InterpretCompileError => Some(65),
        InterpretResult::InterpretRuntimeError => Some(70),
    }
}

fn repl() {
    let mut vm = VM::new();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        line.clear();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            // errors are already reported; the session keeps its globals
            Ok(_) => {
                vm.interpret(&line);
            }
            Err(error) => {
                eprintln!("Error reading line: {}", error);
                break;
            }
        }
    }
}

fn run_file(path: &Path) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Could not read file \"{}\": {}", path.display(), e);
            process::exit(74);
        }
    };

    let mut vm = VM::new();
    if let Some(code) = exit_code(vm.interpret(&source)) {
        process::exit(code);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.script {
        Some(path) => run_file(&path),
        None => repl(),
    }
}
