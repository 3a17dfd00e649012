//! Symbol table and scope management
//!
//! The table is a stack of scopes, innermost last. The checker and the code
//! generator each build their own table while walking the tree; the storage
//! handle on a symbol is only filled in by the code generator.

use std::collections::HashMap;

use crate::common::Span;
use crate::frontend::ast::{FnDecl, VarDecl};
use crate::ir::Value;
use crate::types::Type;

/// Declaration a symbol was introduced by
#[derive(Debug, Clone, Copy)]
pub enum DeclRef<'ast> {
    Var(&'ast VarDecl),
    Func(&'ast FnDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

/// Backend handle attached to a symbol during code generation
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// Address of a stack slot or global
    Address(Value),
    /// Name of a generated function
    Function(String),
}

#[derive(Debug, Clone)]
pub struct Symbol<'ast> {
    pub name: String,
    pub decl: DeclRef<'ast>,
    pub storage: Option<Storage>,
}

impl<'ast> Symbol<'ast> {
    pub fn variable(decl: &'ast VarDecl) -> Self {
        Self {
            name: decl.name.name.clone(),
            decl: DeclRef::Var(decl),
            storage: None,
        }
    }

    pub fn function(decl: &'ast FnDecl) -> Self {
        Self {
            name: decl.name.name.clone(),
            decl: DeclRef::Func(decl),
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn kind(&self) -> SymbolKind {
        match self.decl {
            DeclRef::Var(_) => SymbolKind::Variable,
            DeclRef::Func(_) => SymbolKind::Function,
        }
    }

    /// Declared type of a variable, return type of a function
    pub fn ty(&self) -> &'ast Type {
        match self.decl {
            DeclRef::Var(var) => &var.ty,
            DeclRef::Func(func) => &func.return_type,
        }
    }

    /// Where the name was declared
    pub fn span(&self) -> Span {
        match self.decl {
            DeclRef::Var(var) => var.name.span,
            DeclRef::Func(func) => func.name.span,
        }
    }

    pub fn as_var(&self) -> Option<&'ast VarDecl> {
        match self.decl {
            DeclRef::Var(var) => Some(var),
            DeclRef::Func(_) => None,
        }
    }

    pub fn as_func(&self) -> Option<&'ast FnDecl> {
        match self.decl {
            DeclRef::Func(func) => Some(func),
            DeclRef::Var(_) => None,
        }
    }
}

/// Names declared in one lexical block
#[derive(Debug, Default)]
pub struct Scope<'ast> {
    symbols: HashMap<String, Symbol<'ast>>,
}

impl<'ast> Scope<'ast> {
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    /// Insert `symbol`, returning the one it replaced
    pub fn insert(&mut self, symbol: Symbol<'ast>) -> Option<Symbol<'ast>> {
        self.symbols.insert(symbol.name.clone(), symbol)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol<'ast>> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Stack of scopes; the bottom one is the global scope and is never popped
#[derive(Debug)]
pub struct SymbolTable<'ast> {
    scopes: Vec<Scope<'ast>>,
}

impl<'ast> SymbolTable<'ast> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Leave the current scope; the global scope stays
    pub fn pop(&mut self) -> Option<Scope<'ast>> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn is_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Declare `symbol` in the current scope
    ///
    /// A name already declared in the same scope is replaced, and the old
    /// symbol is handed back so the caller can report the conflict.
    pub fn declare(&mut self, symbol: Symbol<'ast>) -> Option<Symbol<'ast>> {
        let current = self.scopes.last_mut()?;
        current.insert(symbol)
    }

    /// Innermost visible symbol named `name`
    pub fn lookup(&self, name: &str) -> Option<&Symbol<'ast>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl Default for SymbolTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::Identifier;

    fn var(name: &str, ty: Type, at: usize) -> VarDecl {
        VarDecl::new(Identifier::new(name, Span::new(at, at + 1)), ty, Span::new(at, at + 1))
    }

    #[test]
    fn test_shadowing_and_restore() {
        let outer = var("x", Type::Int, 0);
        let inner = var("x", Type::Vec3, 10);

        let mut table = SymbolTable::new();
        table.declare(Symbol::variable(&outer));
        table.push();
        table.declare(Symbol::variable(&inner));
        assert_eq!(table.lookup("x").map(|s| s.ty()), Some(&Type::Vec3));

        table.pop();
        assert_eq!(table.lookup("x").map(|s| s.ty()), Some(&Type::Int));
    }

    #[test]
    fn test_popped_symbols_unreachable() {
        let y = var("y", Type::Float, 0);
        let mut table = SymbolTable::new();
        table.push();
        table.declare(Symbol::variable(&y));
        assert!(table.lookup("y").is_some());
        table.pop();
        assert!(table.lookup("y").is_none());
    }

    #[test]
    fn test_duplicate_replaces_and_returns_previous() {
        let first = var("a", Type::Int, 0);
        let second = var("a", Type::Bool, 5);

        let mut table = SymbolTable::new();
        assert!(table.declare(Symbol::variable(&first)).is_none());
        let previous = table.declare(Symbol::variable(&second));
        assert_eq!(previous.map(|s| s.span()), Some(Span::new(0, 1)));
        assert_eq!(table.lookup("a").map(|s| s.ty()), Some(&Type::Bool));
    }

    #[test]
    fn test_lookup_walks_outward() {
        let g = var("g", Type::Int, 0);
        let mut table = SymbolTable::new();
        table.declare(Symbol::variable(&g));
        table.push();
        table.push();
        assert!(table.lookup("g").is_some());
        assert!(!table.is_global_scope());
    }

    #[test]
    fn test_global_scope_never_popped() {
        let mut table = SymbolTable::new();
        assert!(table.pop().is_none());
        assert!(table.is_global_scope());
    }

    #[test]
    fn test_storage_attached() {
        let v = var("v", Type::Vec2, 0);
        let symbol = Symbol::variable(&v).with_storage(Storage::Address(Value::Global("v".into())));
        assert_eq!(symbol.kind(), SymbolKind::Variable);
        assert!(matches!(symbol.storage, Some(Storage::Address(Value::Global(ref n))) if n == "v"));
    }
}
