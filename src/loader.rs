use std::fs;
use std::path::Path;

use log::error;

use crate::compiler::Compiler;
use crate::error::MonkeyError;
use crate::evaluator::{self, Environment};
use crate::parser::Parser;
use crate::vm::Vm;

/// Which of the two execution backends a run or REPL line uses. The VM is
/// the default; the evaluator exists as a cross-check and a compile-free
/// fallback (SPEC_FULL.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Vm,
    Eval,
}

/// Loads a `.monkey` source file and runs it with the selected backend. With
/// `disassemble` set (VM backend only), prints the compiled instructions
/// instead of executing them.
pub fn run_file(path: &Path, backend: Backend, disassemble: bool) -> Result<(), MonkeyError> {
    let source = fs::read_to_string(path)?;
    let (program, errors) = Parser::parse(&source);
    if !errors.is_empty() {
        return Err(MonkeyError::Parse(errors));
    }

    match backend {
        Backend::Vm => {
            let bytecode = Compiler::compile_program(&program)?;
            if disassemble {
                print!("{}", bytecode.instructions.disassemble());
                return Ok(());
            }
            let mut vm = Vm::new(bytecode);
            vm.run()?;
            report(vm.last_popped())
        }
        Backend::Eval => {
            if disassemble {
                return Err(MonkeyError::Runtime(
                    "--disassemble requires the VM backend".to_string(),
                ));
            }
            let env = Environment::new();
            report(evaluator::eval_program(&program, &env))
        }
    }
}

fn report(result: crate::object::Object) -> Result<(), MonkeyError> {
    if result.is_error() {
        let message = result.to_string();
        error!("{message}");
        return Err(MonkeyError::Runtime(message));
    }
    println!("{result}");
    Ok(())
}
