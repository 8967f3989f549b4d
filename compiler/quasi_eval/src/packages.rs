//! Host package registry.
//!
//! `import "path"` binds a [`Package`] looked up in the interpreter's
//! [`PackageRegistry`]. Packages are plain member tables filled before
//! evaluation starts; evaluated code only reads them.

mod fmt;
mod strings;

#[cfg(test)]
mod tests;

pub use fmt::{sprint, sprintf, sprintln};

use crate::errors::EvalError;
use crate::interpreter::Interpreter;
use crate::types::{FuncType, Type};
use crate::value::{FuncImpl, FunctionValue, NativeFunc, Value, Values};
use quasi_ir::Name;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A host package: an import path, the name it binds by default, and its
/// exported members.
pub struct Package {
    pub path: Arc<str>,
    pub name: Name,
    members: FxHashMap<Name, Value>,
}

/// Signature of a host function body.
pub type NativeCall = fn(&mut Interpreter, Vec<Value>) -> Result<Values, EvalError>;

impl Package {
    pub fn new(path: &str, name: &str) -> Self {
        Package {
            path: Arc::from(path),
            name: Name::intern(name),
            members: FxHashMap::default(),
        }
    }

    /// Add an exported member.
    pub fn insert(&mut self, name: &str, value: Value) {
        self.members.insert(Name::intern(name), value);
    }

    /// Add a host function with the given signature.
    #[must_use]
    pub fn with_native(
        mut self,
        name: &'static str,
        signature: FuncType,
        call: NativeCall,
    ) -> Self {
        let func = FunctionValue::new(
            Arc::new(signature),
            FuncImpl::Native(NativeFunc { name, call }),
        );
        self.insert(name, Value::Func(func));
        self
    }

    pub fn member(&self, name: Name) -> Option<Value> {
        self.members.get(&name).cloned()
    }

    /// Exported member names, sorted.
    pub fn member_names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.members.keys().copied().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }
}

/// Import path to package.
#[derive(Clone, Default)]
pub struct PackageRegistry {
    packages: FxHashMap<Arc<str>, Arc<Package>>,
}

impl PackageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PackageRegistry::default()
    }

    /// The registry with the bundled `fmt` and `strings` packages.
    pub fn with_defaults() -> Self {
        let mut registry = PackageRegistry::new();
        registry.register(fmt::package());
        registry.register(strings::package());
        registry
    }

    /// Add or replace a package under its path.
    pub fn register(&mut self, package: Package) {
        self.packages.insert(package.path.clone(), Arc::new(package));
    }

    pub fn get(&self, path: &str) -> Option<Arc<Package>> {
        self.packages.get(path).cloned()
    }

    /// Registered import paths, sorted.
    pub fn paths(&self) -> Vec<Arc<str>> {
        let mut paths: Vec<Arc<str>> = self.packages.keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// Signature helper: `func(params...) results`.
fn signature(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> FuncType {
    FuncType::new(params, results, variadic)
}

/// Argument `i` as a string, for host functions.
fn string_arg(name: &str, args: &[Value], i: usize) -> Result<Arc<str>, EvalError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(other) => Err(crate::errors::cannot_use(other, other.type_of(), "string")),
        None => Err(crate::errors::arity_mismatch(name, i + 1, args.len())),
    }
}
