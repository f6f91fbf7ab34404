mod expression;
mod operator;
mod statement;

pub use expression::Expression;
pub use operator::{Operator, PostfixOperator, PrefixOperator};
pub use statement::{Block, Program, Statement};
