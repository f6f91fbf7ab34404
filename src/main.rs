use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use log::LevelFilter;

use monkey_lang::error::MonkeyError;
use monkey_lang::loader::{self, Backend};
use monkey_lang::repl;

/// Lexer, parser, tree-walking evaluator and bytecode compiler/VM for the
/// Monkey programming language.
#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to a `.monkey` source file; omit to start the REPL.
    file: Option<PathBuf>,

    /// Use the tree-walking evaluator instead of the bytecode VM.
    #[arg(long, conflicts_with = "vm")]
    eval: bool,

    /// Use the bytecode VM (default).
    #[arg(long)]
    vm: bool,

    /// Raise logging verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dump compiled bytecode instead of running it (VM backend only).
    #[arg(long)]
    disassemble: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("logger is initialized exactly once");

    let backend = if cli.eval { Backend::Eval } else { Backend::Vm };

    let result = match cli.file {
        Some(path) => loader::run_file(&path, backend, cli.disassemble),
        None => repl::run(backend).map_err(MonkeyError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
