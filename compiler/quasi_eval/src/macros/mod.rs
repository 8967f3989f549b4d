//! Macro expansion.
//!
//! A macro is a function over syntax bound by `~macro`. It is used in two
//! forms:
//! - a call `m(a, b)`, whose argument expressions are passed unevaluated;
//! - a statement sequence `m; a; b`, where the bare macro name consumes the
//!   next `arity` statements as its arguments.
//!
//! The result replaces the use and is expanded again, outside-in, until no
//! macro use remains. Every rewrite counts against the expander's limit;
//! exceeding it is a `MacroExpansionOverflow` error, which is how a macro
//! that expands to itself terminates.
//!
//! Quoted syntax is left alone: `~quote` bodies are data, and `~quasiquote`
//! bodies are expanded when their unquoted parts are evaluated.

pub(crate) mod quasiquote;
pub(crate) mod syntax;

#[cfg(test)]
mod tests;

use crate::environment::{BindingKind, Environment};
use crate::errors::{macro_overflow, type_mismatch, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{MacroValue, Value};
use quasi_ir::fold::{walk_expr, Fold};
use quasi_ir::{Block, Expr, ExprKind, Node, QuoteKind, Span, Stmt, StmtKind};
use std::collections::VecDeque;
use std::sync::Arc;
use syntax::{stmt_node, value_to_node};

/// Expands the macro uses of one form, counting rewrites.
pub(crate) struct Expander {
    limit: usize,
    rewrites: usize,
}

impl Expander {
    pub(crate) fn new(limit: usize) -> Self {
        Expander { limit, rewrites: 0 }
    }

    /// Fully expand `node`.
    pub(crate) fn expand(
        &mut self,
        interp: &mut Interpreter,
        node: Node,
        env: &Environment,
    ) -> EvalResult<Node> {
        ExpandFold {
            expander: self,
            interp,
            env,
        }
        .fold_node(node)
    }

    /// Rewrite the root of `node` once if it is a macro use.
    pub(crate) fn expand_root_once(
        &mut self,
        interp: &mut Interpreter,
        node: Node,
        env: &Environment,
    ) -> EvalResult<(Node, bool)> {
        let mut fold = ExpandFold {
            expander: self,
            interp,
            env,
        };
        match node {
            Node::Expr(e) => match macro_call(&e, env) {
                Some((mac, args)) => Ok((fold.invoke(&mac, args, e.span)?, true)),
                None => Ok((Node::Expr(e), false)),
            },
            Node::Stmt(s) => match fold.rewrite_stmt(&s, &mut VecDeque::new())? {
                Some(stmts) => Ok((Node::from_stmts(stmts, s.span), true)),
                None => Ok((Node::Stmt(s), false)),
            },
            Node::Block(b) => {
                let mut queue: VecDeque<Stmt> = b.stmts.clone().into();
                let Some(first) = queue.pop_front() else {
                    return Ok((Node::Block(b), false));
                };
                match fold.rewrite_stmt(&first, &mut queue)? {
                    Some(stmts) => {
                        prepend(&mut queue, stmts);
                        Ok((Node::from_stmts(queue.into(), b.span), true))
                    }
                    None => Ok((Node::Block(b), false)),
                }
            }
        }
    }

    /// Take the next top-level statement from `queue`, fully expanded.
    ///
    /// Statement-sequence macro uses consume their arguments from the
    /// queue and their expansion is pushed back in front of it, so a macro
    /// declared by one statement applies to the statements after it.
    pub(crate) fn next_stmt(
        &mut self,
        interp: &mut Interpreter,
        queue: &mut VecDeque<Stmt>,
        env: &Environment,
    ) -> EvalResult<Option<Stmt>> {
        let mut fold = ExpandFold {
            expander: self,
            interp,
            env,
        };
        while let Some(stmt) = queue.pop_front() {
            match fold.rewrite_stmt(&stmt, queue)? {
                Some(stmts) => prepend(queue, stmts),
                None => return Ok(Some(fold.fold_stmt(stmt)?)),
            }
        }
        Ok(None)
    }
}

fn prepend(queue: &mut VecDeque<Stmt>, stmts: Vec<Stmt>) {
    for stmt in stmts.into_iter().rev() {
        queue.push_front(stmt);
    }
}

/// The macro `e` names, if it is an identifier bound to one.
fn macro_named(e: &Expr, env: &Environment) -> Option<MacroValue> {
    let binding = env.lookup_binding(e.as_ident()?)?;
    if binding.kind != BindingKind::Macro {
        return None;
    }
    match binding.get() {
        Value::Macro(m) => Some(m),
        _ => None,
    }
}

/// `m(args...)` with `m` a macro: the macro and its argument syntax.
fn macro_call(e: &Expr, env: &Environment) -> Option<(MacroValue, Vec<Value>)> {
    let ExprKind::Call { fun, args, .. } = &e.kind else {
        return None;
    };
    let mac = macro_named(fun, env)?;
    let args = args.iter().map(|a| Value::Syntax(Node::from(a.clone()))).collect();
    Some((mac, args))
}

struct ExpandFold<'a> {
    expander: &'a mut Expander,
    interp: &'a mut Interpreter,
    env: &'a Environment,
}

impl ExpandFold<'_> {
    /// Run a macro on argument syntax.
    fn invoke(&mut self, mac: &MacroValue, args: Vec<Value>, span: Span) -> EvalResult<Node> {
        self.expander.rewrites += 1;
        if self.expander.rewrites > self.expander.limit {
            return Err(macro_overflow(self.expander.limit).with_span(span).into());
        }
        let _guard = tracing::debug_span!("macro", name = %mac.name).entered();
        let values = self.interp.call_function(&mac.func, args, false, self.env)?;
        match values.into_iter().next() {
            None | Some(Value::None) => Ok(Node::Block(Arc::new(Block::new(Vec::new(), span)))),
            Some(v) => Ok(value_to_node(v, span)?),
        }
    }

    /// If `stmt` is a macro use, its expansion as statements. A
    /// statement-sequence use takes its arguments from the front of `rest`.
    fn rewrite_stmt(&mut self, stmt: &Stmt, rest: &mut VecDeque<Stmt>) -> EvalResult<Option<Vec<Stmt>>> {
        let StmtKind::Expr(e) = &stmt.kind else {
            return Ok(None);
        };
        if let Some((mac, args)) = macro_call(e, self.env) {
            return Ok(Some(self.invoke(&mac, args, stmt.span)?.into_stmts()));
        }
        let Some(mac) = macro_named(e, self.env) else {
            return Ok(None);
        };
        let arity = mac.arity();
        if rest.len() < arity {
            return Err(type_mismatch(format!(
                "not enough arguments in call to macro {}: have {}, want {arity}",
                mac.name,
                rest.len()
            ))
            .with_span(stmt.span)
            .into());
        }
        let args = rest.drain(..arity).map(|s| Value::Syntax(stmt_node(s))).collect();
        Ok(Some(self.invoke(&mac, args, stmt.span)?.into_stmts()))
    }
}

impl Fold for ExpandFold<'_> {
    type Error = crate::errors::ControlAction;

    fn fold_expr(&mut self, mut expr: Expr) -> EvalResult<Expr> {
        while let Some((mac, args)) = macro_call(&expr, self.env) {
            let span = expr.span;
            let node = self.invoke(&mac, args, span)?;
            expr = node.into_expr().ok_or_else(|| {
                type_mismatch(format!(
                    "macro {} expanded to a statement where an expression is required",
                    mac.name
                ))
                .with_span(span)
            })?;
        }
        walk_expr(self, expr)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> EvalResult<Stmt> {
        let span = stmt.span;
        match self.rewrite_stmt(&stmt, &mut VecDeque::new())? {
            None => quasi_ir::fold::walk_stmt(self, stmt),
            Some(mut stmts) if stmts.len() == 1 => {
                let only = stmts.remove(0);
                self.fold_stmt(only)
            }
            Some(stmts) => self.fold_stmt(Stmt::new(StmtKind::Block(Block::new(stmts, span)), span)),
        }
    }

    fn fold_stmts(&mut self, stmts: Vec<Stmt>) -> EvalResult<Vec<Stmt>> {
        let mut queue: VecDeque<Stmt> = stmts.into();
        let mut out = Vec::with_capacity(queue.len());
        while let Some(stmt) = queue.pop_front() {
            match self.rewrite_stmt(&stmt, &mut queue)? {
                Some(stmts) => prepend(&mut queue, stmts),
                None => out.push(quasi_ir::fold::walk_stmt(self, stmt)?),
            }
        }
        Ok(out)
    }

    fn fold_quote(&mut self, kind: QuoteKind, body: Arc<Block>, span: Span) -> EvalResult<Expr> {
        Ok(Expr::new(ExprKind::Quote(kind, body), span))
    }
}
