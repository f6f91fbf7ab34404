use std::io::{self, Write};

use log::error;

use crate::compiler::Compiler;
use crate::evaluator::{self, Environment};
use crate::loader::Backend;
use crate::object::Object;
use crate::parser::Parser;
use crate::vm::Vm;

const PROMPT: &str = ">> ";

/// Line-based REPL. The VM backend carries its globals array forward across
/// lines (via [`Vm::take_globals`]/[`Vm::with_globals`]) so a `let` on one
/// line is visible on the next; the evaluator backend does the same with a
/// single long-lived [`Environment`].
pub fn run(backend: Backend) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut line = String::new();
    let mut globals: Option<Vec<Object>> = None;
    let eval_env = Environment::new();

    loop {
        print!("{PROMPT}");
        stdout.lock().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }
        let source = line.trim_end();
        if source.is_empty() {
            continue;
        }

        let (program, errors) = Parser::parse(source);
        if !errors.is_empty() {
            for err in &errors {
                error!("{err}");
            }
            continue;
        }

        match backend {
            Backend::Vm => {
                let bytecode = match Compiler::compile_program(&program) {
                    Ok(bytecode) => bytecode,
                    Err(err) => {
                        error!("{err}");
                        continue;
                    }
                };
                let mut vm = match globals.take() {
                    Some(g) => Vm::with_globals(bytecode, g),
                    None => Vm::new(bytecode),
                };
                if let Err(err) = vm.run() {
                    error!("{err}");
                    globals = Some(vm.take_globals());
                    continue;
                }
                println!("{}", vm.last_popped());
                globals = Some(vm.take_globals());
            }
            Backend::Eval => {
                let result = evaluator::eval_program(&program, &eval_env);
                println!("{result}");
            }
        }
    }
}
