use std::fmt::{self, Display};

use super::operator::{Operator, PostfixOperator, PrefixOperator};
use super::statement::Block;

/// A tagged expression node. Every parser entry point that produces an
/// `Expression` leaves exactly one variant populated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Null,
    Integer(i64),
    Boolean(bool),
    StringLiteral(String),
    Identifier(String),
    ArrayLiteral(Vec<Expression>),
    Prefix {
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: Operator,
        right: Box<Expression>,
    },
    Postfix {
        left: Box<Expression>,
        operator: PostfixOperator,
    },
    If {
        condition: Box<Expression>,
        consequence: Block,
        alternative: Option<Block>,
    },
    While {
        condition: Box<Expression>,
        body: Block,
    },
    For {
        init: Option<Box<super::statement::Statement>>,
        condition: Option<Box<Expression>>,
        post: Option<Box<super::statement::Statement>>,
        body: Block,
    },
    FunctionLiteral {
        name: Option<String>,
        parameters: Vec<String>,
        body: Block,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
    Slice {
        left: Box<Expression>,
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
    },
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
}

impl Expression {
    /// An assignment target must be an identifier or an index expression.
    pub fn is_valid_assign_target(&self) -> bool {
        matches!(self, Expression::Identifier(_) | Expression::Index { .. })
    }

    pub fn function_name(&mut self) -> Option<&mut Option<String>> {
        match self {
            Expression::FunctionLiteral { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Null => write!(f, "null"),
            Expression::Integer(value) => write!(f, "{value}"),
            Expression::Boolean(value) => write!(f, "{value}"),
            Expression::StringLiteral(value) => write!(f, "{value}"),
            Expression::Identifier(name) => write!(f, "{name}"),
            Expression::ArrayLiteral(elements) => {
                write!(f, "[")?;
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{el}")?;
                }
                write!(f, "]")
            }
            Expression::Prefix { operator, right } => write!(f, "({operator}{right})"),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expression::Postfix { left, operator } => write!(f, "({left}{operator})"),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {condition} {consequence}")?;
                if let Some(alt) = alternative {
                    write!(f, " else {alt}")?;
                }
                Ok(())
            }
            Expression::While { condition, body } => write!(f, "while ({condition}) {body}"),
            Expression::For {
                init,
                condition,
                post,
                body,
            } => {
                write!(f, "for (")?;
                if let Some(init) = init {
                    write!(f, "{init}")?;
                } else {
                    write!(f, ";")?;
                }
                write!(f, " ")?;
                if let Some(condition) = condition {
                    write!(f, "{condition}")?;
                }
                write!(f, "; ")?;
                if let Some(post) = post {
                    // Trim the trailing `;` a Statement::Display always appends.
                    let rendered = post.to_string();
                    write!(f, "{}", rendered.trim_end_matches(';'))?;
                }
                write!(f, ") {body}")
            }
            Expression::FunctionLiteral {
                name,
                parameters,
                body,
            } => {
                write!(f, "fn")?;
                if let Some(name) = name {
                    write!(f, " {name}")?;
                }
                write!(f, "({}) {body}", parameters.join(", "))
            }
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{function}(")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expression::Index { left, index } => write!(f, "({left}[{index}])"),
            Expression::Slice { left, start, end } => {
                write!(f, "({left}[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                write!(f, ":")?;
                if let Some(end) = end {
                    write!(f, "{end}")?;
                }
                write!(f, "])")
            }
            Expression::Assign { target, value } => write!(f, "({target} = {value})"),
        }
    }
}
