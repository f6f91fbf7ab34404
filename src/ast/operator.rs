use std::fmt::{self, Display};

use crate::lexer::TokenKind;

/// Binary operators. `<=`/`>=` are dedicated variants (see compiler lowering
/// notes) rather than being desugared into `<`/`>` plus negation, since that
/// would double-evaluate their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl Operator {
    pub fn from_token(kind: &TokenKind) -> Option<Self> {
        use Operator::*;
        Some(match kind {
            TokenKind::Plus => Plus,
            TokenKind::Minus => Minus,
            TokenKind::Asterisk => Asterisk,
            TokenKind::Slash => Slash,
            TokenKind::Percent => Percent,
            TokenKind::Eq => Eq,
            TokenKind::NotEq => NotEq,
            TokenKind::Lt => Lt,
            TokenKind::Lte => Lte,
            TokenKind::Gt => Gt,
            TokenKind::Gte => Gte,
            TokenKind::And => And,
            TokenKind::Or => Or,
            _ => return None,
        })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Asterisk => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Bang,
    Minus,
}

impl Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOperator::Bang => "!",
            PrefixOperator::Minus => "-",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOperator {
    Increment,
    Decrement,
}

impl Display for PostfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PostfixOperator::Increment => "++",
            PostfixOperator::Decrement => "--",
        })
    }
}
