//! Tree-walking interpreter.
//!
//! The interpreter evaluates syntax trees directly: every expression is
//! re-dispatched on its kind each time it runs, and untyped constants are
//! computed with `f64` floats (see [`Precision::Approx`]). The compiling
//! evaluator in [`crate::fast`] shares the value model, the environment and
//! the call machinery defined here.
//!
//! # Top-level evaluation
//!
//! [`Interpreter::eval_ast`] takes a parsed form and, statement by
//! statement, macro-expands then evaluates it in the REPL scope. Expanding
//! lazily lets a `~macro` declaration be used by the statements after it.
//!
//! # Call frames
//!
//! Each function call pushes a [`Frame`] holding its deferred calls and the
//! in-flight panic while those defers run. `recover` looks one frame up from
//! the deferred function that calls it.
//!
//! Submodules:
//! - `expr` - expressions
//! - `stmt` - statements and control flow
//! - `assign` - assignable places, `=`, `:=`, `op=`
//! - `decl` - `var`, `const`, `type`, `import`, `func`, `~macro`
//! - `call` - calls, frames, defers, goroutines
//! - `select` - the `select` statement
//! - `types` - type expressions
//! - `ops` - value-level operations shared with the compiler

pub(crate) mod assign;
mod builder;
pub(crate) mod call;
pub(crate) mod decl;
pub(crate) mod expr;
pub(crate) mod ops;
mod select;
pub(crate) mod stmt;
pub(crate) mod types;

#[cfg(test)]
mod tests;

pub use builder::InterpreterBuilder;

use crate::builtins::Builtin;
use crate::environment::{BindingKind, Environment};
use crate::errors::{ControlAction, EvalError, EvalResult};
use crate::macros::Expander;
use crate::packages::PackageRegistry;
use crate::print_handler::SharedPrintHandler;
use crate::types::{universe_types, FuncType, Type, UntypedKind};
use crate::value::{Constant, FuncImpl, FunctionValue, Precision, Value, Values};
use quasi_ir::{Name, Node, Span, Stmt};
use std::collections::VecDeque;
use std::sync::Arc;

/// Configuration and registries shared by an interpreter, its goroutines
/// and the compiler built on it.
pub(crate) struct Shared {
    pub universe: Environment,
    pub packages: PackageRegistry,
    pub print: SharedPrintHandler,
    pub max_macro_expansions: usize,
    pub max_call_depth: usize,
    pub repl_redefinition: bool,
}

/// A call registered by `defer`, with its arguments already evaluated.
pub(crate) struct Deferred {
    pub func: FunctionValue,
    pub args: Vec<Value>,
    pub spread: bool,
    pub env: Environment,
    pub span: Span,
}

/// One active function call.
pub(crate) struct Frame {
    pub name: Name,
    pub defers: Vec<Deferred>,
    /// Panic unwinding through this frame while its defers run.
    pub panic: Option<Value>,
    /// This call is a deferred call, so `recover` inside it may stop the
    /// caller's panic.
    pub deferred_call: bool,
    /// Number of declared results, used to decide how `return f()` spreads.
    pub result_count: usize,
}

impl Frame {
    fn new(name: Name, result_count: usize, deferred_call: bool) -> Self {
        Frame {
            name,
            defers: Vec::new(),
            panic: None,
            deferred_call,
            result_count,
        }
    }
}

/// Tree-walking interpreter.
///
/// Cheap to clone into a goroutine: the REPL scope and the shared
/// configuration are reference counted, only the call stack is per thread.
pub struct Interpreter {
    pub(crate) globals: Environment,
    pub(crate) shared: Arc<Shared>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) precision: Precision,
    /// Set while a deferred call is being started; consumed by the frame it
    /// pushes.
    pub(crate) next_call_deferred: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    /// An interpreter with default configuration, writing to stdout.
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// The REPL scope that top-level forms evaluate in.
    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.shared.print
    }

    pub fn packages(&self) -> &PackageRegistry {
        &self.shared.packages
    }

    /// Current value of a top-level name.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.globals.lookup_binding(Name::intern(name)).map(|b| b.get())
    }

    /// A copy for a new goroutine: same scopes and configuration, empty
    /// call stack.
    pub(crate) fn spawn_clone(&self) -> Interpreter {
        Interpreter {
            globals: self.globals.clone(),
            shared: Arc::clone(&self.shared),
            frames: Vec::new(),
            precision: self.precision,
            next_call_deferred: false,
        }
    }

    /// Macro-expand and evaluate a top-level form.
    ///
    /// Returns the values of the last statement with untyped constants
    /// given their default types. A panic that no deferred call recovered
    /// is reported as `UserPanic`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn eval_ast(&mut self, node: Node) -> Result<Values, EvalError> {
        let env = self.globals.clone();
        let mut queue: VecDeque<Stmt> = node.into_stmts().into();
        let mut expander = Expander::new(self.shared.max_macro_expansions);
        let exit = self.run_frame(Name::intern("main"), 0, |interp| {
            // statements are expanded one at a time as execution reaches
            // them; `expanded` keeps them for `goto`
            let mut expanded: Vec<Stmt> = Vec::new();
            let mut pc = 0;
            let mut last = Values::new();
            loop {
                if pc == expanded.len() {
                    match expander.next_stmt(interp, &mut queue, &env)? {
                        Some(stmt) => expanded.push(stmt),
                        None => break,
                    }
                }
                let span = expanded[pc].span;
                match interp.exec_stmt(&expanded[pc], &env) {
                    Ok(values) => {
                        last = values;
                        pc += 1;
                    }
                    Err(ControlAction::Goto(label)) => {
                        pc = loop {
                            if let Some(target) = stmt::find_label(&expanded, label) {
                                break target;
                            }
                            match expander.next_stmt(interp, &mut queue, &env)? {
                                Some(stmt) => expanded.push(stmt),
                                None => return Err(ControlAction::Goto(label)),
                            }
                        };
                    }
                    Err(action) => return Err(action.with_span_if_missing(span)),
                }
            }
            Ok(last)
        });
        top_level_results(exit)
    }

    /// `Eval(x)`: expand and evaluate a syntax value in `env`.
    pub(crate) fn eval_syntax(&mut self, node: Node, env: &Environment) -> EvalResult<Values> {
        let mut expander = Expander::new(self.shared.max_macro_expansions);
        let node = expander.expand(self, node, env)?;
        match node {
            Node::Expr(e) => self.eval_multi(&e, env),
            Node::Stmt(s) => self.exec_stmt(&s, env),
            Node::Block(b) => self.exec_stmts(&b.stmts, env),
        }
    }

    /// Fully expand `node` against the macros visible from the REPL scope.
    pub fn expand(&mut self, node: Node) -> Result<Node, EvalError> {
        let env = self.globals.clone();
        let mut expander = Expander::new(self.shared.max_macro_expansions);
        expander
            .expand(self, node, &env)
            .map_err(ControlAction::into_error)
    }

    /// `MacroExpand` / `MacroExpand1`: rewrite the root of `node` until it
    /// is no longer a macro use (or once), reporting whether anything
    /// changed.
    pub(crate) fn macroexpand(
        &mut self,
        node: Node,
        env: &Environment,
        once: bool,
    ) -> EvalResult<(Node, bool)> {
        let mut expander = Expander::new(self.shared.max_macro_expansions);
        let (mut node, expanded) = expander.expand_root_once(self, node, env)?;
        if expanded && !once {
            loop {
                let (next, again) = expander.expand_root_once(self, node, env)?;
                node = next;
                if !again {
                    break;
                }
            }
        }
        Ok((node, expanded))
    }

    /// `recover()`: the panic of the frame that deferred the current call,
    /// if the current call is a deferred one.
    pub(crate) fn recover_panic(&mut self) -> Value {
        let n = self.frames.len();
        if n < 2 || !self.frames[n - 1].deferred_call {
            return Value::Nil;
        }
        self.frames[n - 2].panic.take().unwrap_or(Value::Nil)
    }

    /// Call a function value from host code.
    pub fn call(&mut self, func: &Value, args: Vec<Value>) -> Result<Values, EvalError> {
        let Value::Func(f) = func else {
            return Err(crate::errors::not_callable(func.describe()));
        };
        let env = self.globals.clone();
        self.call_function(f, args, false, &env)
            .map_err(ControlAction::into_error)
    }
}

/// The values a top-level form yields once its frame has exited, with
/// untyped constants given their default types.
pub(crate) fn top_level_results(exit: EvalResult<call::Exit>) -> Result<Values, EvalError> {
    let values = match exit {
        Ok(call::Exit::Done { values, .. }) => values,
        Ok(call::Exit::Recovered) => Values::new(),
        Err(action) => return Err(action.into_error()),
    };
    values
        .into_iter()
        .map(Value::defaulted)
        .collect::<Result<Values, _>>()
}

/// The universe scope: predeclared types, constants, `nil` and builtins.
pub(crate) fn universe() -> Environment {
    let env = Environment::new();
    let define = |name: &str, kind: BindingKind, ty: Type, value: Value| {
        // names are distinct, so this cannot fail
        let _ = env.define_binding(Name::intern(name), kind, ty, value);
    };
    for (name, ty) in universe_types() {
        define(name, BindingKind::Type, ty.clone(), Value::Type(ty));
    }
    define("any", BindingKind::Type, Type::any(), Value::Type(Type::any()));
    for (name, b) in [("true", true), ("false", false)] {
        define(
            name,
            BindingKind::Const,
            Type::Untyped(UntypedKind::Bool),
            Value::Untyped(Constant::Bool(b)),
        );
    }
    define("nil", BindingKind::Const, Type::Untyped(UntypedKind::Nil), Value::Nil);
    for b in Builtin::ALL {
        let func = FunctionValue::new(Arc::new(FuncType::default()), FuncImpl::Builtin(b));
        define(b.name(), BindingKind::Builtin, Type::Invalid, Value::Func(func));
    }
    env
}
