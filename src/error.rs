use std::fmt::{self, Display};
use std::io;

use crate::compiler::CompileError;
use crate::parser::ParseError;
use crate::vm::VmError;

/// Unifies every failure domain the CLI's single `Result`-returning `main`
/// can surface, mirroring the per-subsystem error enums (`ParseError`,
/// `CompileError`, `VmError`) rather than introducing a derive-macro error
/// crate of its own.
#[derive(Debug)]
pub enum MonkeyError {
    Io(io::Error),
    Parse(Vec<ParseError>),
    Compile(CompileError),
    Vm(VmError),
    /// A guest-level `Error` object reached the top level unhandled; its
    /// message is the object's printed form.
    Runtime(String),
}

impl Display for MonkeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonkeyError::Io(err) => write!(f, "{err}"),
            MonkeyError::Parse(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
            MonkeyError::Compile(err) => write!(f, "{err}"),
            MonkeyError::Vm(err) => write!(f, "{err}"),
            MonkeyError::Runtime(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for MonkeyError {}

impl From<io::Error> for MonkeyError {
    fn from(err: io::Error) -> Self {
        MonkeyError::Io(err)
    }
}

impl From<CompileError> for MonkeyError {
    fn from(err: CompileError) -> Self {
        MonkeyError::Compile(err)
    }
}

impl From<VmError> for MonkeyError {
    fn from(err: VmError) -> Self {
        MonkeyError::Vm(err)
    }
}
