use std::fmt::{self, Display};

use crate::ast::Operator;

/// Errors raised while lowering an AST to bytecode. Compilation aborts on
/// the first one; unlike parse errors there is no partial-bytecode recovery.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    UnknownOperator(Operator),
    UnknownExpressionType(String),
    BreakOutsideLoop,
    ContinueOutsideLoop,
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownOperator(op) => write!(f, "unknown operator: {op}"),
            CompileError::UnknownExpressionType(what) => {
                write!(f, "unknown expression type: {what}")
            }
            CompileError::BreakOutsideLoop => write!(f, "break outside of a loop"),
            CompileError::ContinueOutsideLoop => write!(f, "continue outside of a loop"),
        }
    }
}

impl std::error::Error for CompileError {}
