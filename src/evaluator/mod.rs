mod environment;

pub use environment::Environment;

use std::rc::Rc;

use crate::ast::{Block, Expression, Operator, PostfixOperator, PrefixOperator, Program, Statement};
use crate::builtins::{self, BUILTINS};
use crate::object::{Function, HeapData, Object};

/// A block can end either with an ordinary value or a control-flow signal
/// that must unwind past enclosing `if`/block boundaries before it is
/// handled by the nearest loop (`break`/`continue`) or call frame (`return`).
enum Flow {
    Value(Object),
    Return(Object),
    Break,
    Continue,
}

impl Flow {
    fn into_object(self) -> Object {
        match self {
            Flow::Value(obj) | Flow::Return(obj) => obj,
            Flow::Break | Flow::Continue => Object::Null,
        }
    }
}

/// Evaluates a whole program against a fresh top-level environment.
pub fn eval_program(program: &Program, env: &Environment) -> Object {
    let mut result = Object::Null;
    for stmt in &program.0 {
        match eval_statement(stmt, env) {
            Flow::Return(obj) => return obj,
            Flow::Value(obj) => result = obj,
            Flow::Break | Flow::Continue => {
                return Object::error("break/continue outside of a loop");
            }
        }
        if result.is_error() {
            return result;
        }
    }
    result
}

fn eval_block(block: &Block, env: &Environment) -> Flow {
    let mut result = Object::Null;
    for stmt in &block.0 {
        match eval_statement(stmt, env) {
            Flow::Value(obj) => {
                if obj.is_error() {
                    return Flow::Value(obj);
                }
                result = obj;
            }
            other => return other,
        }
    }
    Flow::Value(result)
}

fn eval_statement(stmt: &Statement, env: &Environment) -> Flow {
    match stmt {
        Statement::Let { name, value } => {
            let value = eval(value, env);
            if value.is_error() {
                return Flow::Value(value);
            }
            env.set(name, value);
            Flow::Value(Object::Null)
        }
        Statement::Return(expr) => {
            let value = eval(expr, env);
            if value.is_error() {
                Flow::Value(value)
            } else {
                Flow::Return(value)
            }
        }
        Statement::Expression(expr) => Flow::Value(eval(expr, env)),
        Statement::Break => Flow::Break,
        Statement::Continue => Flow::Continue,
    }
}

/// Walks one expression node to a value. Unresolved identifiers and any
/// other failure produce an `Error` object rather than panicking; callers
/// check `Object::is_error` and short-circuit, mirroring the VM's
/// per-instruction error propagation.
pub fn eval(expr: &Expression, env: &Environment) -> Object {
    match expr {
        Expression::Null => Object::Null,
        Expression::Integer(value) => Object::Integer(*value),
        Expression::Boolean(value) => Object::Boolean(*value),
        Expression::StringLiteral(value) => Object::string(value.clone()),
        Expression::Identifier(name) => match env.get(name) {
            Some(value) => value,
            None => match builtins::lookup(name) {
                Some(index) => Object::Builtin(index),
                None => Object::error(format!("identifier not found: {name}")),
            },
        },
        Expression::ArrayLiteral(elements) => {
            match eval_expressions(elements, env) {
                Ok(values) => Object::array(values),
                Err(err) => err,
            }
        }
        Expression::Prefix { operator, right } => {
            let right = eval(right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix(*operator, &right)
        }
        Expression::Infix {
            left,
            operator,
            right,
        } => {
            let left = eval(left, env);
            if left.is_error() {
                return left;
            }
            match operator {
                Operator::And if !left.is_truthy() => return Object::Boolean(false),
                Operator::Or if left.is_truthy() => return Object::Boolean(true),
                _ => {}
            }
            let right = eval(right, env);
            if right.is_error() {
                return right;
            }
            eval_infix(*operator, &left, &right)
        }
        Expression::Postfix { left, operator } => {
            let delta = match operator {
                PostfixOperator::Increment => 1,
                PostfixOperator::Decrement => -1,
            };
            eval_assign(
                left,
                &Expression::Infix {
                    left: left.clone(),
                    operator: match operator {
                        PostfixOperator::Increment => Operator::Plus,
                        PostfixOperator::Decrement => Operator::Minus,
                    },
                    right: Box::new(Expression::Integer(delta.unsigned_abs() as i64)),
                },
                env,
            )
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let cond = eval(condition, env);
            if cond.is_error() {
                return cond;
            }
            if cond.is_truthy() {
                eval_block(consequence, env).into_object()
            } else if let Some(alt) = alternative {
                eval_block(alt, env).into_object()
            } else {
                Object::Null
            }
        }
        Expression::While { condition, body } => eval_while(condition, body, env),
        Expression::For {
            init,
            condition,
            post,
            body,
        } => eval_for(init.as_deref(), condition.as_deref(), post.as_deref(), body, env),
        Expression::FunctionLiteral {
            parameters, body, ..
        } => Object::Function(Rc::new(Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: env.clone(),
        })),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = eval(function, env);
            if function.is_error() {
                return function;
            }
            let args = match eval_expressions(arguments, env) {
                Ok(values) => values,
                Err(err) => return err,
            };
            apply_function(&function, &args)
        }
        Expression::Index { left, index } => {
            let left = eval(left, env);
            if left.is_error() {
                return left;
            }
            let index = eval(index, env);
            if index.is_error() {
                return index;
            }
            eval_index(&left, &index)
        }
        Expression::Slice { left, start, end } => {
            let left = eval(left, env);
            if left.is_error() {
                return left;
            }
            eval_slice(&left, start.as_deref(), end.as_deref(), env)
        }
        Expression::Assign { target, value } => eval_assign(target, value, env),
    }
}

fn eval_expressions(exprs: &[Expression], env: &Environment) -> Result<Vec<Object>, Object> {
    let mut values = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let value = eval(expr, env);
        if value.is_error() {
            return Err(value);
        }
        values.push(value);
    }
    Ok(values)
}

fn eval_prefix(operator: PrefixOperator, right: &Object) -> Object {
    match (operator, right) {
        (PrefixOperator::Bang, obj) => Object::Boolean(!obj.is_truthy()),
        (PrefixOperator::Minus, Object::Integer(value)) => Object::Integer(-value),
        (PrefixOperator::Minus, obj) => {
            Object::error(format!("unknown operator: -{}", obj.type_name()))
        }
    }
}

fn eval_infix(operator: Operator, left: &Object, right: &Object) -> Object {
    match (left, right) {
        (Object::Integer(a), Object::Integer(b)) => eval_integer_infix(operator, *a, *b),
        _ if left.as_str().is_some() && right.as_str().is_some() => {
            eval_string_infix(operator, left, right)
        }
        _ => match operator {
            Operator::Eq => Object::Boolean(left == right),
            Operator::NotEq => Object::Boolean(left != right),
            Operator::And => Object::Boolean(left.is_truthy() && right.is_truthy()),
            Operator::Or => Object::Boolean(left.is_truthy() || right.is_truthy()),
            _ if left.type_name() != right.type_name() => Object::error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
            _ => Object::error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
        },
    }
}

fn eval_integer_infix(operator: Operator, a: i64, b: i64) -> Object {
    match operator {
        Operator::Plus => Object::Integer(a + b),
        Operator::Minus => Object::Integer(a - b),
        Operator::Asterisk => Object::Integer(a * b),
        Operator::Slash => {
            if b == 0 {
                Object::error("division by zero")
            } else {
                Object::Integer(a / b)
            }
        }
        Operator::Percent => {
            if b == 0 {
                Object::error("modulo by zero")
            } else {
                Object::Integer(a % b)
            }
        }
        Operator::Eq => Object::Boolean(a == b),
        Operator::NotEq => Object::Boolean(a != b),
        Operator::Lt => Object::Boolean(a < b),
        Operator::Lte => Object::Boolean(a <= b),
        Operator::Gt => Object::Boolean(a > b),
        Operator::Gte => Object::Boolean(a >= b),
        Operator::And => Object::Boolean(a != 0 && b != 0),
        Operator::Or => Object::Boolean(a != 0 || b != 0),
    }
}

fn eval_string_infix(operator: Operator, left: &Object, right: &Object) -> Object {
    let (a, b) = (left.as_str().unwrap(), right.as_str().unwrap());
    match operator {
        Operator::Plus => Object::string(format!("{a}{b}")),
        Operator::Eq => Object::Boolean(*a == *b),
        Operator::NotEq => Object::Boolean(*a != *b),
        _ => Object::error(format!("unknown operator: STRING {operator} STRING")),
    }
}

fn eval_while(condition: &Expression, body: &Block, env: &Environment) -> Object {
    loop {
        let cond = eval(condition, env);
        if cond.is_error() {
            return cond;
        }
        if !cond.is_truthy() {
            return Object::Null;
        }
        match eval_block(body, env) {
            Flow::Value(obj) if obj.is_error() => return obj,
            Flow::Return(obj) => return Flow::Return(obj).into_object(),
            Flow::Break => return Object::Null,
            Flow::Value(_) | Flow::Continue => continue,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_for(
    init: Option<&Statement>,
    condition: Option<&Expression>,
    post: Option<&Statement>,
    body: &Block,
    env: &Environment,
) -> Object {
    let loop_env = Environment::enclosed(env.clone());
    if let Some(init) = init {
        match eval_statement(init, &loop_env) {
            Flow::Value(obj) if obj.is_error() => return obj,
            _ => {}
        }
    }
    loop {
        let proceed = match condition {
            Some(cond) => {
                let value = eval(cond, &loop_env);
                if value.is_error() {
                    return value;
                }
                value.is_truthy()
            }
            None => true,
        };
        if !proceed {
            return Object::Null;
        }
        let mut broke = false;
        match eval_block(body, &loop_env) {
            Flow::Value(obj) if obj.is_error() => return obj,
            Flow::Return(obj) => return obj,
            Flow::Break => broke = true,
            Flow::Value(_) | Flow::Continue => {}
        }
        if broke {
            return Object::Null;
        }
        if let Some(post) = post {
            match eval_statement(post, &loop_env) {
                Flow::Value(obj) if obj.is_error() => return obj,
                _ => {}
            }
        }
    }
}

fn apply_function(function: &Object, args: &[Object]) -> Object {
    match function {
        Object::Function(func) => {
            if func.parameters.len() != args.len() {
                return Object::error(format!(
                    "wrong number of arguments: want={}, got={}",
                    func.parameters.len(),
                    args.len()
                ));
            }
            let call_env = Environment::enclosed(func.env.clone());
            for (param, arg) in func.parameters.iter().zip(args) {
                call_env.set(param, arg.clone());
            }
            eval_block(&func.body, &call_env).into_object()
        }
        Object::Builtin(index) => match BUILTINS.get(*index) {
            Some(builtin) => (builtin.func)(args),
            None => Object::error("invalid builtin index"),
        },
        other => Object::error(format!("not a function: {}", other.type_name())),
    }
}

fn eval_index(left: &Object, index: &Object) -> Object {
    match (left, index) {
        (Object::Heap(_), Object::Integer(i)) => match left.as_heap_data().as_deref() {
            Some(HeapData::Array(elements)) => index_at(elements, *i)
                .map(|el| el.clone())
                .unwrap_or(Object::Null),
            Some(HeapData::Str(s)) => {
                let chars: Vec<char> = s.chars().collect();
                index_at(&chars, *i)
                    .map(|c| Object::string(c.to_string()))
                    .unwrap_or(Object::Null)
            }
            _ => Object::error(format!("index operator not supported: {}", left.type_name())),
        },
        _ => Object::error(format!("index operator not supported: {}", left.type_name())),
    }
}

fn index_at<T>(items: &[T], i: i64) -> Option<&T> {
    if i < 0 {
        return None;
    }
    items.get(i as usize)
}

fn eval_slice(
    left: &Object,
    start: Option<&Expression>,
    end: Option<&Expression>,
    env: &Environment,
) -> Object {
    let data = match left.as_heap_data() {
        Some(data) => data,
        None => return Object::error(format!("slice operator not supported: {}", left.type_name())),
    };
    let len = match &*data {
        HeapData::Array(elements) => elements.len(),
        HeapData::Str(s) => s.chars().count(),
        _ => return Object::error(format!("slice operator not supported: {}", left.type_name())),
    };
    drop(data);

    let start = match start {
        Some(expr) => match eval(expr, env) {
            Object::Integer(i) => i.clamp(0, len as i64) as usize,
            other if other.is_error() => return other,
            _ => return Object::error("slice bounds must be integers"),
        },
        None => 0,
    };
    let end = match end {
        Some(expr) => match eval(expr, env) {
            Object::Integer(i) => i.clamp(0, len as i64) as usize,
            other if other.is_error() => return other,
            _ => return Object::error("slice bounds must be integers"),
        },
        None => len,
    };
    let end = end.max(start);

    match left.as_heap_data().as_deref() {
        Some(HeapData::Array(elements)) => Object::array(elements[start..end].to_vec()),
        Some(HeapData::Str(s)) => {
            let slice: String = s.chars().skip(start).take(end - start).collect();
            Object::string(slice)
        }
        _ => unreachable!(),
    }
}

fn eval_assign(target: &Expression, value: &Expression, env: &Environment) -> Object {
    let value = eval(value, env);
    if value.is_error() {
        return value;
    }
    match target {
        Expression::Identifier(name) => {
            if env.assign(name, value.clone()) {
                value
            } else {
                Object::error(format!("identifier not found: {name}"))
            }
        }
        Expression::Index { left, index } => {
            let left_obj = eval(left, env);
            if left_obj.is_error() {
                return left_obj;
            }
            let index_obj = eval(index, env);
            if index_obj.is_error() {
                return index_obj;
            }
            match (&left_obj, &index_obj) {
                (Object::Heap(_), Object::Integer(i)) => {
                    let mut data = left_obj.as_heap_data_mut();
                    match data.as_deref_mut() {
                        Some(HeapData::Array(elements)) => {
                            if *i < 0 || *i as usize >= elements.len() {
                                return Object::error("index out of bounds");
                            }
                            elements[*i as usize] = value.clone();
                            value
                        }
                        _ => Object::error("index assignment not supported"),
                    }
                }
                _ => Object::error("index assignment not supported"),
            }
        }
        _ => Object::error("invalid assignment target"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(input: &str) -> Object {
        let (program, errors) = Parser::parse(input);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        eval_program(&program, &Environment::new())
    }

    #[test]
    fn evaluates_integer_arithmetic() {
        assert_eq!(run("5 + 5 * 2;"), Object::Integer(15));
    }

    #[test]
    fn fibonacci_recursion() {
        let src = "let fib = fn(x) { if (x < 2) { return x; } return fib(x-1) + fib(x-2); }; fib(10);";
        assert_eq!(run(src), Object::Integer(55));
    }

    #[test]
    fn closures_capture_environment() {
        let src = "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(3);";
        assert_eq!(run(src), Object::Integer(5));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run(r#""Hello" + " " + "World";"#), Object::string("Hello World"));
    }

    #[test]
    fn for_loop_break_stops_early() {
        let src = "let i = 0; for (; i < 5; i = i + 1) { if (i == 3) { break; } }; i;";
        assert_eq!(run(src), Object::Integer(3));
    }

    #[test]
    fn unresolved_identifier_is_an_error() {
        let result = run("doesNotExist;");
        assert!(result.is_error());
    }

    #[test]
    fn division_by_zero_is_runtime_error() {
        assert!(run("1 / 0;").is_error());
    }
}
