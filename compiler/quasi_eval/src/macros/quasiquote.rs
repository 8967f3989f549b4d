//! `~quasiquote` evaluation.
//!
//! The quoted block is copied with each `~unquote` at nesting level one
//! replaced by the syntax of its value. Nested quasiquotes raise the level
//! and unquotes lower it, so an unquote inside an inner quasiquote stays
//! quoted. `~unquote_splice` in a statement list or an expression list
//! expands to zero or more elements.

use super::syntax::{splice_items, value_to_expr, value_to_node};
use crate::environment::Environment;
use crate::errors::{type_mismatch, ControlAction, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;
use quasi_ir::fold::{walk_block, Fold};
use quasi_ir::{Block, Expr, ExprKind, Node, QuoteKind, Span, Stmt, StmtKind};
use std::sync::Arc;

/// Evaluate `~quasiquote{body}` in `env`.
pub(crate) fn evaluate(interp: &mut Interpreter, body: &Arc<Block>, env: &Environment) -> EvalResult<Value> {
    let mut q = Quasiquote { interp, env, depth: 1 };
    let block = walk_block(&mut q, Block::clone(body))?;
    Ok(Value::Syntax(block.into_node()))
}

struct Quasiquote<'a> {
    interp: &'a mut Interpreter,
    env: &'a Environment,
    depth: usize,
}

/// The operand of an unquote or splice at the current level, if `e` is one.
fn unquote_of(e: &Expr, kind: QuoteKind) -> Option<&Arc<Block>> {
    match &e.kind {
        ExprKind::Quote(k, body) if *k == kind => Some(body),
        _ => None,
    }
}

impl Quasiquote<'_> {
    /// Evaluate an unquoted block to one value.
    fn value_of(&mut self, body: &Arc<Block>, span: Span) -> EvalResult<Value> {
        let node = Block::clone(body).into_node();
        let values = self.interp.eval_syntax(node, self.env)?;
        values.into_iter().next().ok_or_else(|| {
            ControlAction::from(type_mismatch("unquoted expression has no value").with_span(span))
        })
    }

    fn splice(&mut self, body: &Arc<Block>, span: Span) -> EvalResult<Vec<Node>> {
        let value = self.value_of(body, span)?;
        Ok(splice_items(value, span)?)
    }
}

impl Fold for Quasiquote<'_> {
    type Error = ControlAction;

    fn fold_quote(&mut self, kind: QuoteKind, body: Arc<Block>, span: Span) -> Result<Expr, ControlAction> {
        match kind {
            QuoteKind::Unquote | QuoteKind::UnquoteSplice if self.depth == 1 => {
                if kind == QuoteKind::UnquoteSplice {
                    let mut items = self.splice(&body, span)?;
                    if items.len() != 1 {
                        return Err(type_mismatch(format!(
                            "unquote_splice of {} items in a single-element position",
                            items.len()
                        ))
                        .with_span(span)
                        .into());
                    }
                    let item = items.remove(0);
                    return Ok(value_to_expr(Value::Syntax(item), span)?);
                }
                let value = self.value_of(&body, span)?;
                Ok(value_to_expr(value, span)?)
            }
            _ => {
                let saved = self.depth;
                match kind {
                    QuoteKind::Quasiquote => self.depth += 1,
                    QuoteKind::Unquote | QuoteKind::UnquoteSplice => self.depth -= 1,
                    QuoteKind::Quote => {}
                }
                let folded = walk_block(self, Arc::unwrap_or_clone(body));
                self.depth = saved;
                Ok(Expr::new(ExprKind::Quote(kind, Arc::new(folded?)), span))
            }
        }
    }

    fn fold_exprs(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>, ControlAction> {
        let mut out = Vec::with_capacity(exprs.len());
        for e in exprs {
            match unquote_of(&e, QuoteKind::UnquoteSplice) {
                Some(body) if self.depth == 1 => {
                    for item in self.splice(body, e.span)? {
                        out.push(value_to_expr(Value::Syntax(item), e.span)?);
                    }
                }
                _ => out.push(self.fold_expr(e)?),
            }
        }
        Ok(out)
    }

    fn fold_stmts(&mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, ControlAction> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let StmtKind::Expr(e) = &stmt.kind else {
                out.push(self.fold_stmt(stmt)?);
                continue;
            };
            if self.depth == 1 {
                if let Some(body) = unquote_of(e, QuoteKind::UnquoteSplice) {
                    for item in self.splice(body, stmt.span)? {
                        out.extend(item.into_stmts());
                    }
                    continue;
                }
                // a statement-position unquote may produce any statement
                if let Some(body) = unquote_of(e, QuoteKind::Unquote) {
                    let value = self.value_of(body, stmt.span)?;
                    match value_to_node(value, stmt.span)? {
                        Node::Block(b) => {
                            out.push(Stmt::new(StmtKind::Block(Arc::unwrap_or_clone(b)), stmt.span));
                        }
                        node => out.extend(node.into_stmts()),
                    }
                    continue;
                }
            }
            out.push(self.fold_stmt(stmt)?);
        }
        Ok(out)
    }
}
