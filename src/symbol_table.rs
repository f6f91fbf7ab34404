use std::collections::HashMap;
use std::rc::Rc;

/// Where a binding lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: Scope,
    pub index: usize,
}

/// Maps identifier names to [`Symbol`]s for one lexical level, with an
/// `outer` link mirroring the nesting of function bodies.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    store: HashMap<String, Symbol>,
    pub outer: Option<Rc<SymbolTable>>,
    pub num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            outer: None,
            num_definitions: 0,
        }
    }

    pub fn new_enclosed(outer: Rc<SymbolTable>) -> Self {
        Self {
            store: HashMap::new(),
            outer: Some(outer),
            num_definitions: 0,
        }
    }

    /// Assigns the next index in the current scope. Global iff there is no
    /// enclosing table, Local otherwise.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_some() {
            Scope::Local
        } else {
            Scope::Global
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: Scope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }
        self.outer.as_ref()?.resolve(name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_global_before_any_enclosing() {
        let mut global = SymbolTable::new();
        let a = global.define("a");
        assert_eq!(a.scope, Scope::Global);
        assert_eq!(a.index, 0);
    }

    #[test]
    fn enclosed_scope_defines_locals() {
        let mut global = SymbolTable::new();
        global.define("a");
        let outer = Rc::new(global);
        let mut local = SymbolTable::new_enclosed(outer);
        let b = local.define("b");
        assert_eq!(b.scope, Scope::Local);
        assert_eq!(b.index, 0);
        assert_eq!(local.resolve("a").unwrap().scope, Scope::Global);
    }

    #[test]
    fn builtin_resolves_from_any_depth() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        let outer = Rc::new(global);
        let local = SymbolTable::new_enclosed(outer);
        assert_eq!(local.resolve("len").unwrap().scope, Scope::Builtin);
    }

    #[test]
    fn unresolved_name_is_none() {
        let table = SymbolTable::new();
        assert!(table.resolve("missing").is_none());
    }
}
