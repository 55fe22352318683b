use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
}

impl SymbolScope {
    pub fn describe(self) -> &'static str {
        match self {
            SymbolScope::Global => "global",
            SymbolScope::Local => "local",
            SymbolScope::Builtin => "builtin",
            SymbolScope::Free => "free",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: u16,
    pub constant: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeKind {
    Global,
    Function,
    Block,
}

#[derive(Clone, Debug)]
struct Scope {
    kind: ScopeKind,
    store: HashMap<String, Symbol>,
    free: Vec<Symbol>,
    num_definitions: u16,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            store: HashMap::new(),
            free: Vec::new(),
            num_definitions: 0,
        }
    }
}

/// Lexically nested name resolution. Function scopes own slot allocation and
/// free-variable lists; block scopes borrow the enclosing function's slot
/// counter so their definitions shadow without leaking.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global)],
        }
    }

    pub fn enter_function(&mut self) {
        self.scopes.push(Scope::new(ScopeKind::Function));
    }

    /// Pops the current function scope, returning its free symbols (in
    /// promotion order) and its local slot count.
    pub fn leave_function(&mut self) -> (Vec<Symbol>, u16) {
        let scope = self.scopes.pop().expect("unbalanced function scope");
        (scope.free, scope.num_definitions)
    }

    pub fn enter_block(&mut self) {
        self.scopes.push(Scope::new(ScopeKind::Block));
    }

    pub fn leave_block(&mut self) {
        let scope = self.scopes.pop().expect("unbalanced block scope");
        debug_assert_eq!(scope.kind, ScopeKind::Block);
    }

    /// Index of the nearest scope that owns slot allocation (global or
    /// function), searching down from the top of the stack.
    fn allocation_root(&self) -> usize {
        self.scopes
            .iter()
            .rposition(|scope| scope.kind != ScopeKind::Block)
            .expect("symbol table always has a root scope")
    }

    pub fn define(&mut self, name: &str) -> Symbol {
        self.define_with(name, false)
    }

    pub fn define_const(&mut self, name: &str) -> Symbol {
        self.define_with(name, true)
    }

    fn define_with(&mut self, name: &str, constant: bool) -> Symbol {
        let root = self.allocation_root();
        let scope = if self.scopes[root].kind == ScopeKind::Global {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let index = self.scopes[root].num_definitions;
        self.scopes[root].num_definitions += 1;

        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index,
            constant,
        };
        let top = self.scopes.len() - 1;
        self.scopes[top]
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_builtin(&mut self, index: u16, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
            constant: false,
        };
        self.scopes[0].store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.resolve_at(self.scopes.len() - 1, name)
    }

    fn resolve_at(&mut self, depth: usize, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.scopes[depth].store.get(name) {
            return Some(symbol.clone());
        }
        if depth == 0 {
            return None;
        }
        let outer = self.resolve_at(depth - 1, name)?;
        match outer.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(outer),
            SymbolScope::Local | SymbolScope::Free => {
                if self.scopes[depth].kind == ScopeKind::Function {
                    Some(self.define_free(depth, outer))
                } else {
                    Some(outer)
                }
            }
        }
    }

    // Promotes an enclosing function's symbol to a free variable of the
    // function scope at `depth`, caching the promotion so a second resolve
    // yields the same free index.
    fn define_free(&mut self, depth: usize, original: Symbol) -> Symbol {
        let scope = &mut self.scopes[depth];
        scope.free.push(original.clone());
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: (scope.free.len() - 1) as u16,
            constant: original.constant,
        };
        scope.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Looks a name up in the outermost scope only. Used by the VM to map
    /// global names to slots after compilation.
    pub fn resolve_global(&self, name: &str) -> Option<Symbol> {
        self.scopes[0].store.get(name).cloned()
    }

    pub fn num_definitions(&self) -> u16 {
        let root = self.allocation_root();
        self.scopes[root].num_definitions
    }
}
