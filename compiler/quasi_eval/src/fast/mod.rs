//! Compiling evaluator.
//!
//! [`Compiler::compile`] macro-expands a form once, then lowers it to a tree
//! of closures: identifiers are resolved to scope slots (see [`scope`]),
//! constant subexpressions are folded, and every node is dispatched once at
//! compile time instead of on each execution. The resulting
//! [`CompiledForm`] can be run any number of times; runs share no mutable
//! compiled state, only the environment they run in.
//!
//! Differences from the tree-walking [`Interpreter`]:
//! - untyped constants are exact ([`Precision::Exact`]) until their first
//!   typed use, so `(0.1 + 0.2) / 3` rounds once;
//! - [`Compiler::compile`] expands macros when the form is compiled, not
//!   while it runs; [`Compiler::eval_ast`] expands each top-level statement
//!   just before running it, as the interpreter does.
//!
//! Constructs with their own scoping rules that the lowerer does not
//! specialize (`select`, type switches, statement lists that use `goto`)
//! run on the tree-walker sharing the same call stack and precision.
//!
//! # Pipeline Position
//!
//! ```text
//! syntax → expand (macros::Expander) → lower (this module) → run
//! ```

mod expr;
mod scope;
mod stmt;


use crate::environment::Environment;
use crate::errors::{ControlAction, EvalError, EvalResult};
use crate::interpreter::call::{bind_params, finish_results, store_named_results};
use crate::interpreter::{top_level_results, Interpreter, InterpreterBuilder};
use crate::macros::Expander;
use crate::types::FuncType;
use crate::value::{Precision, Value, Values};
use quasi_ir::{Decl, FuncLit, Name, Node, Span, Stmt, StmtKind};
use quasi_stack::ensure_sufficient_stack;
use scope::Scopes;
use std::collections::VecDeque;
use std::sync::Arc;

/// A lowered expression.
type ExprFn = Arc<dyn Fn(&mut Interpreter, &Environment) -> EvalResult<Value> + Send + Sync>;

/// A lowered statement, statement list or multi-valued expression.
type StmtFn = Arc<dyn Fn(&mut Interpreter, &Environment) -> EvalResult<Values> + Send + Sync>;

/// Compiles forms against a REPL scope and runs them.
pub struct Compiler {
    interp: Interpreter,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

impl Compiler {
    /// A compiler with default configuration and its own REPL scope.
    pub fn new() -> Self {
        Compiler::from_builder(Interpreter::builder())
    }

    /// A compiler configured by `builder`. The precision setting is
    /// ignored: compiled code always keeps constants exact.
    pub fn from_builder(builder: InterpreterBuilder) -> Self {
        Compiler {
            interp: builder.precision(Precision::Exact).build(),
        }
    }

    /// A compiler sharing `interp`'s REPL scope and configuration, so
    /// bindings made by either are visible to the other.
    pub fn with_interpreter(interp: &Interpreter) -> Self {
        let mut shared = interp.spawn_clone();
        shared.precision = Precision::Exact;
        Compiler { interp: shared }
    }

    /// The REPL scope forms are compiled against and run in.
    pub fn globals(&self) -> &Environment {
        self.interp.globals()
    }

    /// Current value of a top-level name.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.interp.lookup(name)
    }

    /// The interpreter compiled code runs on.
    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Expand and lower `node`.
    ///
    /// A `~macro` declaration in the form is available to the statements
    /// after it during expansion; it is defined in the REPL scope when the
    /// form runs.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn compile(&mut self, node: Node) -> Result<CompiledForm, EvalError> {
        let span = node.span();
        let stmts = self.expand(node).map_err(ControlAction::into_error)?;
        let mut lowerer = Lowerer::new(&self.interp);
        let body = lowerer.lower_stmts(&stmts)?;
        tracing::debug!(statements = stmts.len(), "compiled form");
        Ok(CompiledForm { body, span })
    }

    fn expand(&mut self, node: Node) -> EvalResult<Vec<Stmt>> {
        // macros declared by this form live here until it runs
        let macros = self.interp.globals().child();
        let mut queue: VecDeque<Stmt> = node.into_stmts().into();
        let mut expander = Expander::new(self.interp.shared.max_macro_expansions);
        let mut stmts = Vec::with_capacity(queue.len());
        while let Some(stmt) = expander.next_stmt(&mut self.interp, &mut queue, &macros)? {
            if let StmtKind::Decl(decl @ Decl::Macro(_)) = &stmt.kind {
                self.interp.exec_decl(decl, &macros)?;
            }
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    /// Run `form` in the REPL scope.
    pub fn run(&mut self, form: &CompiledForm) -> Result<Values, EvalError> {
        let env = self.interp.globals().clone();
        self.run_in(form, &env)
    }

    /// Run `form` in `env`. Names the form did not declare itself are looked
    /// up in `env` by name.
    pub fn run_in(&mut self, form: &CompiledForm, env: &Environment) -> Result<Values, EvalError> {
        let exit = self.interp.run_frame(Name::intern("main"), 0, |interp| {
            (form.body)(interp, env).map_err(|action| action.with_span_if_missing(form.span))
        });
        top_level_results(exit)
    }

    /// Compile and run `node` in the REPL scope, one top-level statement
    /// at a time.
    ///
    /// Unlike [`Compiler::compile`], each statement is expanded only after
    /// the ones before it ran, so a macro may use variables and functions
    /// declared earlier in the same form.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn eval_ast(&mut self, node: Node) -> Result<Values, EvalError> {
        let env = self.interp.globals().clone();
        let mut queue: VecDeque<Stmt> = node.into_stmts().into();
        let mut expander = Expander::new(self.interp.shared.max_macro_expansions);
        let exit = self.interp.run_frame(Name::intern("main"), 0, |interp| {
            let mut compiled: Vec<(Stmt, StmtFn)> = Vec::new();
            let mut next = |interp: &mut Interpreter, compiled: &mut Vec<(Stmt, StmtFn)>| -> EvalResult<bool> {
                let Some(stmt) = expander.next_stmt(interp, &mut queue, &env)? else {
                    return Ok(false);
                };
                let body = Lowerer::new(interp).lower_stmts(std::slice::from_ref(&stmt))?;
                compiled.push((stmt, body));
                Ok(true)
            };
            let mut pc = 0;
            let mut last = Values::new();
            loop {
                if pc == compiled.len() && !next(interp, &mut compiled)? {
                    break;
                }
                let body = Arc::clone(&compiled[pc].1);
                let span = compiled[pc].0.span;
                match body(interp, &env) {
                    Ok(values) => {
                        last = values;
                        pc += 1;
                    }
                    Err(ControlAction::Goto(label)) => {
                        pc = loop {
                            if let Some(target) = compiled.iter().position(|(s, _)| is_label(s, label)) {
                                break target;
                            }
                            if !next(interp, &mut compiled)? {
                                return Err(ControlAction::Goto(label));
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
}

fn is_label(stmt: &Stmt, label: Name) -> bool {
    matches!(&stmt.kind, StmtKind::Labeled { label: l, .. } if l.name == label)
}

/// A form lowered by [`Compiler::compile`].
#[derive(Clone)]
pub struct CompiledForm {
    body: StmtFn,
    span: Span,
}

impl CompiledForm {
    pub fn span(&self) -> Span {
        self.span
    }
}

impl std::fmt::Debug for CompiledForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledForm").field("span", &self.span).finish_non_exhaustive()
    }
}

/// Lowered code of a function literal, declaration or method.
pub(crate) struct FuncCode {
    lit: Arc<FuncLit>,
    /// Receiver type syntax of a method.
    recv: Option<quasi_ir::Expr>,
    params: Vec<Name>,
    results: Vec<Name>,
    body: StmtFn,
}

/// A compiled function closed over the scope it was created in.
pub struct CompiledFunc {
    pub(crate) name: Name,
    env: Environment,
    code: Arc<FuncCode>,
}

impl CompiledFunc {
    /// Run the function with arguments already bound to its parameter
    /// types.
    #[tracing::instrument(level = "debug", skip_all, fields(func = %self.name))]
    pub(crate) fn invoke(
        &self,
        interp: &mut Interpreter,
        ty: &FuncType,
        args: Vec<Value>,
    ) -> EvalResult<Values> {
        let env = self.env.child();
        bind_params(&env, &self.code.params, &self.code.results, ty, args)?;
        let exit = interp.run_frame(self.name, ty.results.len(), |interp| {
            let outcome = ensure_sufficient_stack(|| (self.code.body)(interp, &env));
            store_named_results(outcome, &self.code.results, ty, &env)
        })?;
        finish_results(exit, ty, &self.code.results, &env)
    }
}

/// Lowers expanded syntax to closures.
pub(crate) struct Lowerer {
    scopes: Scopes,
    shared: Arc<crate::interpreter::Shared>,
}

impl Lowerer {
    fn new(interp: &Interpreter) -> Self {
        Lowerer {
            scopes: Scopes::default(),
            shared: Arc::clone(&interp.shared),
        }
    }

    /// Lower `f` inside a scope that is a child of the current one.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push();
        let out = f(self);
        self.scopes.pop();
        out
    }
}
