//! Function values.

use super::{Value, Values};
use crate::builtins::Builtin;
use crate::environment::Environment;
use crate::errors::EvalError;
use crate::fast::CompiledFunc;
use crate::interpreter::Interpreter;
use crate::types::FuncType;
use quasi_ir::{FuncLit, Name};
use std::sync::Arc;

/// A function value: its signature plus an implementation; `imp` is `None`
/// for a nil function.
#[derive(Clone)]
pub struct FunctionValue {
    pub ty: Arc<FuncType>,
    pub imp: Option<FuncImpl>,
}

/// How a function runs.
#[derive(Clone)]
pub enum FuncImpl {
    /// Tree-walked body.
    Closure(Arc<Closure>),
    /// Body lowered by the compiler.
    Compiled(Arc<CompiledFunc>),
    /// Host function from a package.
    Native(NativeFunc),
    /// Builtin used as a value (`defer close(c)`, `f := println`).
    Builtin(Builtin),
    /// Method value `x.M` with its receiver bound.
    Bound(Arc<BoundMethod>),
}

/// A function literal or declaration closed over its defining scope.
pub struct Closure {
    pub name: Name,
    pub lit: Arc<FuncLit>,
    pub env: Environment,
    /// Parameter names in order, receiver first for methods.
    pub params: Vec<Name>,
    /// Result names; empty when results are unnamed.
    pub results: Vec<Name>,
}

/// A host function.
#[derive(Clone, Copy)]
pub struct NativeFunc {
    pub name: &'static str,
    pub call: fn(&mut Interpreter, Vec<Value>) -> Result<Values, EvalError>,
}

pub struct BoundMethod {
    pub recv: Value,
    pub func: FunctionValue,
}

impl FunctionValue {
    pub fn nil(ty: Arc<FuncType>) -> Self {
        FunctionValue { ty, imp: None }
    }

    pub fn new(ty: Arc<FuncType>, imp: FuncImpl) -> Self {
        FunctionValue { ty, imp: Some(imp) }
    }

    pub fn is_nil(&self) -> bool {
        self.imp.is_none()
    }

    /// Name for diagnostics.
    pub fn name(&self) -> String {
        match &self.imp {
            None => "nil".to_string(),
            Some(FuncImpl::Closure(c)) => c.name.to_string(),
            Some(FuncImpl::Compiled(c)) => c.name.to_string(),
            Some(FuncImpl::Native(n)) => n.name.to_string(),
            Some(FuncImpl::Builtin(b)) => b.name().to_string(),
            Some(FuncImpl::Bound(b)) => b.func.name(),
        }
    }

    /// Identity, for printing.
    pub fn address(&self) -> usize {
        match &self.imp {
            None => 0,
            Some(FuncImpl::Closure(c)) => Arc::as_ptr(c) as usize,
            Some(FuncImpl::Compiled(c)) => Arc::as_ptr(c) as usize,
            Some(FuncImpl::Native(n)) => n.call as usize,
            Some(FuncImpl::Builtin(b)) => *b as usize,
            Some(FuncImpl::Bound(b)) => Arc::as_ptr(b) as usize,
        }
    }
}

/// A user macro: a function over syntax.
#[derive(Clone)]
pub struct MacroValue {
    pub name: Name,
    pub func: FunctionValue,
}

impl MacroValue {
    /// Number of syntax arguments the macro consumes.
    pub fn arity(&self) -> usize {
        self.func.ty.params.len()
    }
}
