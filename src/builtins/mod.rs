use std::fs;

use crate::object::{HeapData, Object};

/// One entry in the fixed builtin table. Order is load-bearing: a
/// `GetBuiltin` opcode's operand is the index into [`BUILTINS`], assigned
/// once at compiler construction time and never renumbered.
pub struct Builtin {
    pub name: &'static str,
    pub func: fn(&[Object]) -> Object,
}

pub static BUILTINS: &[Builtin] = &[
    Builtin { name: "len", func: builtin_len },
    Builtin { name: "puts", func: builtin_puts },
    Builtin { name: "type", func: builtin_type },
    Builtin { name: "int", func: builtin_int },
    Builtin { name: "array_push", func: builtin_array_push },
    Builtin { name: "array_pop", func: builtin_array_pop },
    Builtin { name: "str_split", func: builtin_str_split },
    Builtin { name: "file_get_contents", func: builtin_file_get_contents },
];

/// Looks up a builtin's table index by name, for the compiler's
/// `GetBuiltin` path and the evaluator's identifier fallback.
pub fn lookup(name: &str) -> Option<usize> {
    BUILTINS.iter().position(|b| b.name == name)
}

fn wrong_arg_count(want: usize, got: usize) -> Object {
    Object::error(format!("wrong number of arguments: expected {want}, got {got}"))
}

fn builtin_len(args: &[Object]) -> Object {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match &args[0] {
        Object::Heap(cell) => match &*cell.data.borrow() {
            HeapData::Str(s) => Object::Integer(s.chars().count() as i64),
            HeapData::Array(elements) => Object::Integer(elements.len() as i64),
            other => Object::error(format!(
                "argument to len() not supported: got {}",
                heap_type_name(other)
            )),
        },
        other => Object::error(format!(
            "argument to len() not supported: got {}",
            other.type_name()
        )),
    }
}

fn builtin_puts(args: &[Object]) -> Object {
    let mut line = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&arg.to_string());
    }
    println!("{line}");
    Object::Null
}

fn builtin_type(args: &[Object]) -> Object {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    Object::string(args[0].type_name().to_lowercase())
}

fn builtin_int(args: &[Object]) -> Object {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match &args[0] {
        Object::Integer(v) => Object::Integer(*v),
        Object::Boolean(b) => Object::Integer(if *b { 1 } else { 0 }),
        obj if obj.as_str().is_some() => {
            let text = obj.as_str().unwrap();
            match text.trim().parse::<i64>() {
                Ok(v) => Object::Integer(v),
                Err(_) => Object::error(format!("cannot convert {text:?} to integer")),
            }
        }
        other => Object::error(format!(
            "argument to int() not supported: got {}",
            other.type_name()
        )),
    }
}

fn builtin_array_push(args: &[Object]) -> Object {
    if args.len() != 2 {
        return wrong_arg_count(2, args.len());
    }
    match args[0].as_heap_data_mut().as_deref_mut() {
        Some(HeapData::Array(elements)) => {
            elements.push(args[1].clone());
            Object::Integer(elements.len() as i64)
        }
        _ => Object::error(format!(
            "argument to array_push() not supported: got {}",
            args[0].type_name()
        )),
    }
}

fn builtin_array_pop(args: &[Object]) -> Object {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match args[0].as_heap_data_mut().as_deref_mut() {
        Some(HeapData::Array(elements)) => elements.pop().unwrap_or(Object::Null),
        _ => Object::error(format!(
            "argument to array_pop() not supported: got {}",
            args[0].type_name()
        )),
    }
}

fn builtin_str_split(args: &[Object]) -> Object {
    if args.len() != 2 {
        return wrong_arg_count(2, args.len());
    }
    match (args[0].as_str(), args[1].as_str()) {
        (Some(s), Some(sep)) => {
            let parts: Vec<Object> = if sep.is_empty() {
                s.chars().map(|c| Object::string(c.to_string())).collect()
            } else {
                s.split(&*sep).map(Object::string).collect()
            };
            Object::array(parts)
        }
        _ => Object::error("arguments to str_split() must be strings"),
    }
}

fn builtin_file_get_contents(args: &[Object]) -> Object {
    if args.len() != 1 {
        return wrong_arg_count(1, args.len());
    }
    match args[0].as_str() {
        Some(path) => match fs::read_to_string(&*path) {
            Ok(contents) => Object::string(contents),
            Err(e) => Object::error(format!("could not read {path}: {e}")),
        },
        None => Object::error(format!(
            "argument to file_get_contents() not supported: got {}",
            args[0].type_name()
        )),
    }
}

fn heap_type_name(data: &HeapData) -> &'static str {
    match data {
        HeapData::Str(_) => "STRING",
        HeapData::Error(_) => "ERROR",
        HeapData::Array(_) => "ARRAY",
        HeapData::CompiledFunction(_) => "COMPILED_FUNCTION",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_reports_string_length() {
        assert_eq!(builtin_len(&[Object::string("monkey")]), Object::Integer(6));
    }

    #[test]
    fn len_rejects_integer() {
        let result = builtin_len(&[Object::Integer(1)]);
        assert!(result.is_error());
        assert_eq!(result.to_string(), "argument to len() not supported: got INTEGER");
    }

    #[test]
    fn array_push_appends_and_returns_new_length() {
        let arr = Object::array(vec![Object::Integer(1)]);
        let result = builtin_array_push(&[arr.clone(), Object::Integer(2)]);
        assert_eq!(result, Object::Integer(2));
        assert_eq!(arr, Object::array(vec![Object::Integer(1), Object::Integer(2)]));
    }

    #[test]
    fn array_pop_empty_returns_null() {
        let arr = Object::array(vec![]);
        assert_eq!(builtin_array_pop(&[arr]), Object::Null);
    }

    #[test]
    fn str_split_by_separator() {
        let result = builtin_str_split(&[Object::string("a,b,c"), Object::string(",")]);
        assert_eq!(
            result,
            Object::array(vec![Object::string("a"), Object::string("b"), Object::string("c")])
        );
    }

    #[test]
    fn lookup_finds_known_names() {
        assert_eq!(lookup("len"), Some(0));
        assert_eq!(lookup("nonexistent"), None);
    }
}
