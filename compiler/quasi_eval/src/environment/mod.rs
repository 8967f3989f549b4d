//! Lexical environments.
//!
//! An [`Environment`] is a reference-counted scope node: a table of bindings
//! plus a link to its parent. A scope lives as long as the longest holder
//! among the block being executed, the call frames inside it and any closure
//! that captured it.
//!
//! Bindings are stored in definition order so the compiler can resolve a
//! local to `(depth, index)` once and the runtime can fetch the slot without
//! hashing. The REPL top level may redefine names; the new binding takes a
//! fresh index and the name now points at it.

#[cfg(test)]
mod tests;

use crate::errors::{duplicate_binding, type_mismatch, undefined_name, EvalError};
use crate::types::Type;
use crate::value::{Slot, Value};
use parking_lot::RwLock;
use quasi_ir::Name;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// What a name is bound to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BindingKind {
    Var,
    Const,
    Type,
    Func,
    Macro,
    Package,
    Builtin,
}

/// One binding: its kind, declared type and storage.
#[derive(Clone)]
pub struct Binding {
    pub kind: BindingKind,
    pub ty: Type,
    pub slot: Arc<Slot>,
}

impl Binding {
    pub fn get(&self) -> Value {
        self.slot.get()
    }
}

#[derive(Default)]
struct Table {
    names: FxHashMap<Name, usize>,
    bindings: Vec<Binding>,
}

struct Scope {
    parent: Option<Environment>,
    table: RwLock<Table>,
    redefinable: bool,
}

/// A scope node.
#[derive(Clone)]
pub struct Environment(Arc<Scope>);

impl Environment {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Environment(Arc::new(Scope {
            parent: None,
            table: RwLock::new(Table::default()),
            redefinable: false,
        }))
    }

    /// A scope whose names may be redefined, for the REPL top level.
    pub fn new_top_level(parent: &Environment) -> Self {
        Environment(Arc::new(Scope {
            parent: Some(parent.clone()),
            table: RwLock::new(Table::default()),
            redefinable: true,
        }))
    }

    /// A new scope linked to `self`.
    #[must_use]
    pub fn child(&self) -> Environment {
        Environment(Arc::new(Scope {
            parent: Some(self.clone()),
            table: RwLock::new(Table::default()),
            redefinable: false,
        }))
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Define a variable in this scope, typed by its value.
    pub fn define(&self, name: Name, value: Value) -> Result<(), EvalError> {
        let ty = value.type_of();
        self.define_binding(name, BindingKind::Var, ty, value).map(|_| ())
    }

    /// Define a binding in this scope, returning its index.
    ///
    /// The blank identifier `_` is never stored; it still consumes no index.
    pub fn define_binding(
        &self,
        name: Name,
        kind: BindingKind,
        ty: Type,
        value: Value,
    ) -> Result<Option<usize>, EvalError> {
        if name.is_blank() {
            return Ok(None);
        }
        let mut table = self.0.table.write();
        if table.names.contains_key(&name) && !self.0.redefinable {
            return Err(duplicate_binding(name));
        }
        let index = table.bindings.len();
        table.bindings.push(Binding {
            kind,
            ty,
            slot: Slot::new(value),
        });
        table.names.insert(name, index);
        Ok(Some(index))
    }

    /// Whether `name` is bound in this very scope.
    pub fn defines_locally(&self, name: Name) -> bool {
        self.0.table.read().names.contains_key(&name)
    }

    /// Find the nearest binding of `name`.
    pub fn lookup_binding(&self, name: Name) -> Option<Binding> {
        let mut env = self;
        loop {
            if let Some(&i) = env.0.table.read().names.get(&name) {
                return Some(env.0.table.read().bindings[i].clone());
            }
            env = env.0.parent.as_ref()?;
        }
    }

    /// Current value of `name`.
    pub fn lookup(&self, name: Name) -> Result<Value, EvalError> {
        self.lookup_binding(name)
            .map(|b| b.get())
            .ok_or_else(|| undefined_name(name))
    }

    /// Store into the nearest binding of `name`. The value must already be
    /// converted to the binding's type.
    pub fn assign(&self, name: Name, value: Value) -> Result<(), EvalError> {
        let binding = self.lookup_binding(name).ok_or_else(|| undefined_name(name))?;
        if binding.kind != BindingKind::Var {
            return Err(type_mismatch(format!("cannot assign to {name} (neither addressable nor a map index expression)")));
        }
        binding.slot.set(value);
        Ok(())
    }

    /// The binding `depth` scopes up at definition index `index`.
    pub fn binding_at(&self, depth: usize, index: usize) -> Option<Binding> {
        let mut env = self;
        for _ in 0..depth {
            env = env.0.parent.as_ref()?;
        }
        let table = env.0.table.read();
        table.bindings.get(index).cloned()
    }

    /// Definition index of `name` in the scope `depth` levels up.
    pub(crate) fn index_at(&self, depth: usize, name: Name) -> Option<usize> {
        let mut env = self;
        for _ in 0..depth {
            env = env.0.parent.as_ref()?;
        }
        let table = env.0.table.read();
        table.names.get(&name).copied()
    }

    /// Number of bindings defined in this scope, including shadowed
    /// top-level redefinitions.
    pub fn len(&self) -> usize {
        self.0.table.read().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names bound in this scope, sorted.
    pub fn names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.0.table.read().names.keys().copied().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
