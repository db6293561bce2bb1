//! Lexical scopes and the flat function and type tables.
//!
//! Scopes form a tree rooted at the global scope. Lookup walks from the
//! current scope through its parents, so an inner declaration shadows an
//! outer one of the same name. Functions and typedef names are kept in
//! separate flat tables and never shadow variables.

use super::ast::NodeId;
use crate::source::Symbol;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: FxHashMap<Symbol, NodeId>,
    decl_count: usize,
    parent: Option<ScopeId>,
}

impl Scope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn decl_count(&self) -> usize {
        self.decl_count
    }

    pub fn get(&self, name: Symbol) -> Option<NodeId> {
        self.symbols.get(&name).copied()
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: ScopeId,
    functions: FxHashMap<Symbol, NodeId>,
    types: FxHashMap<Symbol, NodeId>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            current: ScopeId::GLOBAL,
            functions: FxHashMap::default(),
            types: FxHashMap::default(),
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Open a child of the current scope and make it current.
    pub fn enter(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(self.current),
            ..Scope::default()
        });
        self.current = id;
        id
    }

    /// Return to the parent scope. The global scope is never left.
    pub fn exit(&mut self) {
        if let Some(parent) = self.get(self.current).parent {
            self.current = parent;
        }
    }

    /// Declare `name` in the current scope. On a redeclaration in the same
    /// scope the existing declaration is returned and nothing changes.
    pub fn declare(&mut self, name: Symbol, node: NodeId) -> Result<(), NodeId> {
        let scope = &mut self.scopes[self.current.index()];
        if let Some(&existing) = scope.symbols.get(&name) {
            return Err(existing);
        }
        scope.symbols.insert(name, node);
        scope.decl_count += 1;
        Ok(())
    }

    /// Resolve `name` from the current scope outwards.
    pub fn lookup(&self, name: Symbol) -> Option<NodeId> {
        self.lookup_from(self.current, name)
    }

    pub fn lookup_from(&self, scope: ScopeId, name: Symbol) -> Option<NodeId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let scope = self.get(id);
            if let Some(node) = scope.get(name) {
                return Some(node);
            }
            cursor = scope.parent;
        }
        None
    }

    pub fn function(&self, name: Symbol) -> Option<NodeId> {
        self.functions.get(&name).copied()
    }

    /// Record a function declaration or definition, returning the entry it
    /// replaces.
    pub fn declare_function(&mut self, name: Symbol, node: NodeId) -> Option<NodeId> {
        self.functions.insert(name, node)
    }

    pub fn type_name(&self, name: Symbol) -> Option<NodeId> {
        self.types.get(&name).copied()
    }

    pub fn declare_type(&mut self, name: Symbol, node: NodeId) -> Option<NodeId> {
        self.types.insert(name, node)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{Ast, NodeKind};
    use crate::source::{Interner, SourceLocation};

    #[test]
    fn test_inner_declaration_shadows_outer() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut ast = Ast::new();
        let outer = ast.alloc(NodeKind::Empty, SourceLocation::default());
        let inner = ast.alloc(NodeKind::Empty, SourceLocation::default());

        let mut scopes = ScopeTree::new();
        scopes.declare(x, outer).expect("outer");
        let block = scopes.enter();
        scopes.declare(x, inner).expect("inner shadows");
        assert_eq!(scopes.lookup(x), Some(inner));
        assert_eq!(scopes.get(block).decl_count(), 1);

        scopes.exit();
        assert_eq!(scopes.current(), ScopeId::GLOBAL);
        assert_eq!(scopes.lookup(x), Some(outer));
        assert_eq!(scopes.lookup_from(block, x), Some(inner));
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut ast = Ast::new();
        let first = ast.alloc(NodeKind::Empty, SourceLocation::default());
        let second = ast.alloc(NodeKind::Empty, SourceLocation::default());

        let mut scopes = ScopeTree::new();
        scopes.declare(x, first).expect("first");
        assert_eq!(scopes.declare(x, second), Err(first));
        assert_eq!(scopes.lookup(x), Some(first));
        assert_eq!(scopes.get(ScopeId::GLOBAL).decl_count(), 1);
    }

    #[test]
    fn test_global_scope_is_never_exited() {
        let mut scopes = ScopeTree::new();
        scopes.exit();
        assert_eq!(scopes.current(), ScopeId::GLOBAL);
        assert_eq!(scopes.len(), 1);
    }
}
