use std::collections::HashMap;

use crate::ast::Parameter;
use crate::types::Type;

/// Index of a scope inside the [`ScopeArena`]. Nodes store ids instead of
/// references so the scope tree has a single owner and no cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    pub used: bool,
    pub fallible: bool,
    /// Declared parameter list, functions only.
    pub parameters: Option<Vec<Parameter>>,
}

impl Symbol {
    pub fn variable(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            kind: SymbolKind::Variable,
            used: false,
            fallible: false,
            parameters: None,
        }
    }

    pub fn function(name: &str, return_type: Type, fallible: bool, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.to_string(),
            ty: return_type,
            kind: SymbolKind::Function,
            used: false,
            fallible,
            parameters: Some(parameters),
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub symbols: HashMap<String, Symbol>,
    /// `NoReturn` for scopes that `return`/`fail` resolve through
    /// (blocks, loop bodies, if branches).
    pub return_type: Type,
    pub fallible: bool,
}

#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn push(&mut self, parent: Option<ScopeId>, return_type: Type, fallible: bool) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent,
            symbols: HashMap::new(),
            return_type,
            fallible,
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// Declare a symbol in `scope`. Returns false if the name already
    /// exists in that scope (ancestors are not consulted).
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> bool {
        let table = &mut self.get_mut(scope).symbols;
        if table.contains_key(&symbol.name) {
            return false;
        }
        table.insert(symbol.name.clone(), symbol);
        true
    }

    /// Walk the parent chain looking for `name`. Lookup never skips an
    /// ancestor.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Symbol)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.get(id).symbols.get(name) {
                return Some((id, symbol));
            }
            current = self.get(id).parent;
        }
        None
    }

    /// Mark `name` used on the scope that declared it.
    pub fn mark_used(&mut self, scope: ScopeId, name: &str) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.get(id).symbols.contains_key(name) {
                self.get_mut(id)
                    .symbols
                    .get_mut(name)
                    .expect("symbol just found")
                    .used = true;
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }

    /// Fix the type of `name` on its declaring scope. Only meaningful for
    /// the single Undetermined-to-concrete transition.
    pub fn set_symbol_type(&mut self, scope: ScopeId, name: &str, ty: Type) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.get(id).symbols.contains_key(name) {
                self.get_mut(id)
                    .symbols
                    .get_mut(name)
                    .expect("symbol just found")
                    .ty = ty;
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }

    /// The nearest enclosing scope whose return type is not `NoReturn`,
    /// i.e. the function body that `return` and `fail` resolve to.
    pub fn closest_returning(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.get(id).return_type != Type::NoReturn {
                return Some(id);
            }
            current = self.get(id).parent;
        }
        None
    }
}
