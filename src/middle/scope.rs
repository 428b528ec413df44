//! Lexically scoped name bindings
//!
//! Each name maps to a stack of bindings with the innermost on top, and each
//! open scope remembers which names it declared so leaving it pops exactly
//! those. The table is generic over what a binding holds: the type checker
//! stores declarations, static analysis stores declaration sites and IR
//! generation stores virtual registers.

use hashbrown::HashMap;

use crate::frontend::{ast::ty::Type, lexer::Span};

/// Pseudo-name bound to the return type of the function being checked
pub const RETURN_BINDING: &str = "return";

#[derive(Debug)]
pub struct SymbolTable<D> {
    bindings: HashMap<String, Vec<D>>,
    scopes: Vec<Vec<String>>,
}

/// Bindings removed by [`SymbolTable::hide`], to be handed back to
/// [`SymbolTable::unhide`]
#[derive(Debug)]
#[must_use = "hidden bindings are lost unless passed to `unhide`"]
pub struct HiddenBindings<D>(Vec<(String, D)>);

impl<D> Default for SymbolTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> SymbolTable<D> {
    /// Creates a table with the global scope open
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            scopes: vec![Vec::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn exit_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot exit the global scope");

        let Some(names) = self.scopes.pop() else {
            return;
        };

        for name in names {
            if let Some(stack) = self.bindings.get_mut(&name) {
                stack.pop();
            }
        }
    }

    pub fn declare(&mut self, name: impl Into<String>, binding: D) {
        let name = name.into();

        self.bindings.entry(name.clone()).or_default().push(binding);

        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name);
        }
    }

    /// Innermost visible binding of `name`
    pub fn lookup(&self, name: &str) -> Option<&D> {
        self.bindings.get(name).and_then(|stack| stack.last())
    }

    /// Whether `name` was declared in the innermost open scope
    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.iter().any(|n| n == name))
    }

    /// Temporarily removes the innermost binding of each name. Names without a
    /// binding are skipped.
    pub fn hide(&mut self, names: &[String]) -> HiddenBindings<D> {
        let mut hidden = Vec::new();

        for name in names {
            if let Some(binding) = self.bindings.get_mut(name).and_then(|stack| stack.pop()) {
                hidden.push((name.clone(), binding));
            }
        }

        HiddenBindings(hidden)
    }

    /// Puts back bindings removed by [`SymbolTable::hide`]
    pub fn unhide(&mut self, hidden: HiddenBindings<D>) {
        for (name, binding) in hidden.0.into_iter().rev() {
            self.bindings.entry(name).or_default().push(binding);
        }
    }
}

/// What the type checker knows about a name
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub ty: Type,
    /// Absent for the prelude
    pub span: Option<Span>,
}

impl SymbolTable<Declaration> {
    /// Opens the scope of a function body and binds its return type
    pub fn enter_function_scope(&mut self, return_type: Type) {
        self.enter_scope();
        self.declare(
            RETURN_BINDING,
            Declaration {
                ty: return_type,
                span: None,
            },
        );
    }

    pub fn return_type(&self) -> Option<&Type> {
        self.lookup(RETURN_BINDING).map(|d| &d.ty)
    }
}
