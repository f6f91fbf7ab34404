use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

/// A lexical scope for the tree-walking evaluator: a binding map plus an
/// optional link to the enclosing scope. Function literals capture the
/// environment they were defined in by cloning this handle (cheap, an `Rc`
/// bump) to build closures.
#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Inner>>);

#[derive(Debug)]
struct Inner {
    store: HashMap<String, Object>,
    outer: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Inner {
            store: HashMap::new(),
            outer: None,
        })))
    }

    pub fn enclosed(outer: Environment) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            store: HashMap::new(),
            outer: Some(outer),
        })))
    }

    /// Walks outward through enclosing scopes looking for `name`.
    pub fn get(&self, name: &str) -> Option<Object> {
        let inner = self.0.borrow();
        if let Some(value) = inner.store.get(name) {
            return Some(value.clone());
        }
        inner.outer.as_ref()?.get(name)
    }

    /// Always binds in the current scope, shadowing an outer binding of the
    /// same name rather than writing through to it (`let` never mutates an
    /// enclosing `let`).
    pub fn set(&self, name: impl Into<String>, value: Object) {
        self.0.borrow_mut().store.insert(name.into(), value);
    }

    /// Assigns through to wherever `name` is already bound, for `=`
    /// (re-assignment, as opposed to `let`'s fresh binding). Returns `false`
    /// if `name` is unbound anywhere in the chain.
    pub fn assign(&self, name: &str, value: Object) -> bool {
        let mut inner = self.0.borrow_mut();
        if inner.store.contains_key(name) {
            inner.store.insert(name.to_string(), value);
            return true;
        }
        match &inner.outer {
            Some(outer) => outer.assign(name, value),
            None => false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_through_outer_scope() {
        let global = Environment::new();
        global.set("a", Object::Integer(1));
        let local = Environment::enclosed(global);
        assert_eq!(local.get("a"), Some(Object::Integer(1)));
    }

    #[test]
    fn set_shadows_without_mutating_outer() {
        let global = Environment::new();
        global.set("a", Object::Integer(1));
        let local = Environment::enclosed(global.clone());
        local.set("a", Object::Integer(2));
        assert_eq!(local.get("a"), Some(Object::Integer(2)));
        assert_eq!(global.get("a"), Some(Object::Integer(1)));
    }

    #[test]
    fn assign_writes_through_to_outer() {
        let global = Environment::new();
        global.set("a", Object::Integer(1));
        let local = Environment::enclosed(global.clone());
        assert!(local.assign("a", Object::Integer(9)));
        assert_eq!(global.get("a"), Some(Object::Integer(9)));
    }

    #[test]
    fn assign_to_unbound_name_fails() {
        let env = Environment::new();
        assert!(!env.assign("missing", Object::Null));
    }
}
