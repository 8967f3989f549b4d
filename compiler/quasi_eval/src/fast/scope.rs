//! Compile-time scopes.
//!
//! The lowerer mirrors the runtime scope chain: wherever generated code
//! will create a child [`Environment`], a [`Scope`] is pushed here, and
//! every binding the code defines is recorded in the same order. A local
//! then resolves once to `(depth, index)` and the closure fetches it with
//! [`Environment::binding_at`].
//!
//! The scope the form runs in is not tracked. It is the REPL scope, whose
//! names may be redefined between runs, so names that resolve past the
//! innermost tracked scope are looked up by name.

use crate::environment::{Binding, Environment};
use crate::errors::{undefined_name, EvalError};
use quasi_ir::Name;
use rustc_hash::FxHashMap;

/// Where a name lives at run time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Resolved {
    Local { depth: usize, index: usize },
    /// Outside every tracked scope.
    Global,
}

#[derive(Default)]
struct Scope {
    names: FxHashMap<Name, usize>,
    len: usize,
}

#[derive(Default)]
pub(crate) struct Scopes {
    stack: Vec<Scope>,
}

impl Scopes {
    pub(crate) fn push(&mut self) {
        self.stack.push(Scope::default());
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    /// Whether code is being lowered for the scope the form runs in.
    pub(crate) fn at_root(&self) -> bool {
        self.stack.is_empty()
    }

    /// Record a binding of the innermost scope. `_` takes no index, as at
    /// run time.
    pub(crate) fn define(&mut self, name: Name) {
        if name.is_blank() {
            return;
        }
        if let Some(scope) = self.stack.last_mut() {
            scope.names.insert(name, scope.len);
            scope.len += 1;
        }
    }

    /// Index of `name` in the innermost scope.
    pub(crate) fn local_index(&self, name: Name) -> Option<usize> {
        self.stack.last()?.names.get(&name).copied()
    }

    pub(crate) fn resolve(&self, name: Name) -> Resolved {
        for (depth, scope) in self.stack.iter().rev().enumerate() {
            if let Some(&index) = scope.names.get(&name) {
                return Resolved::Local { depth, index };
            }
        }
        Resolved::Global
    }
}

/// Fetch the binding `resolved` designates from `env`.
///
/// Code the lowerer hands to the tree-walker defines only in scopes of its
/// own, so slot positions hold; the name is the fallback when a binding was
/// never created (a `range` value over a channel).
pub(crate) fn fetch(env: &Environment, resolved: Resolved, name: Name) -> Result<Binding, EvalError> {
    let found = match resolved {
        Resolved::Local { depth, index } => match env.binding_at(depth, index) {
            Some(binding) => {
                debug_assert_eq!(
                    env.index_at(depth, name),
                    Some(index),
                    "slot {index} at depth {depth} does not hold `{name}`"
                );
                Some(binding)
            }
            None => env.lookup_binding(name),
        },
        Resolved::Global => env.lookup_binding(name),
    };
    found.ok_or_else(|| undefined_name(name))
}
