mod gc;

pub use gc::Heap;

use std::cell::{Cell, RefCell};
use std::fmt::{self, Display};
use std::rc::Rc;

use crate::ast::Block;
use crate::code::Instructions;
use crate::evaluator::Environment;

/// A compiled function's body: its instruction buffer plus the arity
/// bookkeeping the VM needs to set up a call frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
    pub name: Option<String>,
}

/// An evaluator-only closure: a function literal paired with the
/// environment it was defined in. Not GC-tracked; released by the
/// `Rc<RefCell<..>>` refcounting the evaluator's `Environment` already uses.
#[derive(Debug, PartialEq)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: Block,
    pub env: Environment,
}

/// The payload of a heap-allocated object, tracked by the mark-sweep
/// collector. Strings and errors are immutable once created; arrays are
/// mutated in place by `array_push`/`SetIndex`/etc.
#[derive(Debug)]
pub enum HeapData {
    Str(String),
    Error(String),
    Array(Vec<Object>),
    CompiledFunction(Rc<CompiledFunction>),
}

#[derive(Debug)]
pub struct HeapCell {
    marked: Cell<bool>,
    pub data: RefCell<HeapData>,
}

pub type HeapRef = Rc<HeapCell>;

/// The shared tagged-variant runtime value used by both the evaluator and
/// the VM. `Null`/`Boolean`/`Integer` are stack-only and never touch the
/// heap; `Heap(..)` payloads are mark-swept; `Function` is the evaluator's
/// refcounted closure representation.
#[derive(Debug, Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Builtin(usize),
    Function(Rc<Function>),
    Heap(HeapRef),
}

impl Object {
    pub fn string(value: impl Into<String>) -> Object {
        Object::Heap(Rc::new(HeapCell {
            marked: Cell::new(false),
            data: RefCell::new(HeapData::Str(value.into())),
        }))
    }

    pub fn error(message: impl Into<String>) -> Object {
        Object::Heap(Rc::new(HeapCell {
            marked: Cell::new(false),
            data: RefCell::new(HeapData::Error(message.into())),
        }))
    }

    pub fn array(elements: Vec<Object>) -> Object {
        Object::Heap(Rc::new(HeapCell {
            marked: Cell::new(false),
            data: RefCell::new(HeapData::Array(elements)),
        }))
    }

    pub fn compiled_function(f: CompiledFunction) -> Object {
        Object::compiled_function_ref(Rc::new(f))
    }

    /// Wraps an already-shared `CompiledFunction` (e.g. a VM's synthetic
    /// top-level frame) without cloning its instruction buffer.
    pub fn compiled_function_ref(f: Rc<CompiledFunction>) -> Object {
        Object::Heap(Rc::new(HeapCell {
            marked: Cell::new(false),
            data: RefCell::new(HeapData::CompiledFunction(f)),
        }))
    }

    /// Null and false are falsy; every other value (including integer 0) is
    /// truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.as_heap_data(), Some(HeapData::Error(_)))
    }

    pub fn as_heap_data(&self) -> Option<std::cell::Ref<'_, HeapData>> {
        match self {
            Object::Heap(cell) => Some(cell.data.borrow()),
            _ => None,
        }
    }

    pub fn as_heap_data_mut(&self) -> Option<std::cell::RefMut<'_, HeapData>> {
        match self {
            Object::Heap(cell) => Some(cell.data.borrow_mut()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<std::cell::Ref<'_, str>> {
        match self.as_heap_data() {
            Some(data) => std::cell::Ref::filter_map(data, |d| match d {
                HeapData::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .ok(),
            None => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "NULL",
            Object::Boolean(_) => "BOOLEAN",
            Object::Integer(_) => "INTEGER",
            Object::Builtin(_) => "BUILTIN",
            Object::Function(_) => "FUNCTION",
            Object::Heap(cell) => match &*cell.data.borrow() {
                HeapData::Str(_) => "STRING",
                HeapData::Error(_) => "ERROR",
                HeapData::Array(_) => "ARRAY",
                HeapData::CompiledFunction(_) => "COMPILED_FUNCTION",
            },
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Null, Object::Null) => true,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Builtin(a), Object::Builtin(b)) => a == b,
            (Object::Heap(a), Object::Heap(b)) => {
                // Structural equality for strings and arrays (element-wise,
                // recursively); reference equality would make `[1] == [1]`
                // surprisingly false. See DESIGN.md for the Open Question
                // this resolves.
                match (&*a.data.borrow(), &*b.data.borrow()) {
                    (HeapData::Str(x), HeapData::Str(y)) => x == y,
                    (HeapData::Error(x), HeapData::Error(y)) => x == y,
                    (HeapData::Array(x), HeapData::Array(y)) => x == y,
                    (HeapData::CompiledFunction(x), HeapData::CompiledFunction(y)) => {
                        Rc::ptr_eq(x, y)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => write!(f, "null"),
            Object::Boolean(value) => write!(f, "{value}"),
            Object::Integer(value) => write!(f, "{value}"),
            Object::Builtin(idx) => write!(f, "builtin#{idx}"),
            Object::Function(func) => {
                write!(f, "fn({}) {{ ... }}", func.parameters.join(", "))
            }
            Object::Heap(cell) => match &*cell.data.borrow() {
                HeapData::Str(s) => write!(f, "{s}"),
                HeapData::Error(msg) => write!(f, "{msg}"),
                HeapData::Array(elements) => {
                    write!(f, "[")?;
                    for (i, el) in elements.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{el}")?;
                    }
                    write!(f, "]")
                }
                HeapData::CompiledFunction(func) => {
                    write!(f, "fn({} params) {{ ... }}", func.num_parameters)
                }
            },
        }
    }
}
