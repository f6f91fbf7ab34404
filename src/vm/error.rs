use std::fmt::{self, Display};

/// Runtime failures that abort the run outright. Guest-level failures
/// (type mismatches, unknown operators, bad indices) are represented as
/// `Error` objects on the stack instead and never reach this type; these
/// variants are reserved for control-flow impossibilities.
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    StackOverflow,
    UnknownOpcode(u8),
    MissingFrame,
}

impl Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackOverflow => write!(f, "stack overflow"),
            VmError::UnknownOpcode(byte) => write!(f, "unknown opcode byte {byte}"),
            VmError::MissingFrame => write!(f, "frame stack underflow"),
        }
    }
}

impl std::error::Error for VmError {}
