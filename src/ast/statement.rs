use std::fmt::{self, Display};

use super::expression::Expression;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let { name: String, value: Expression },
    Return(Expression),
    Expression(Expression),
    Break,
    Continue,
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {name} = {value};"),
            Statement::Return(value) => write!(f, "return {value};"),
            Statement::Expression(expr) => write!(f, "{expr};"),
            Statement::Break => write!(f, "break;"),
            Statement::Continue => write!(f, "continue;"),
        }
    }
}

/// An ordered sequence of statements, e.g. the body of a block `{ ... }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block(pub Vec<Statement>);

impl Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for stmt in &self.0 {
            write!(f, "{stmt} ")?;
        }
        write!(f, "}}")
    }
}

/// A full parsed source file: an ordered sequence of top-level statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program(pub Vec<Statement>);

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.0 {
            writeln!(f, "{stmt}")?;
        }
        Ok(())
    }
}
