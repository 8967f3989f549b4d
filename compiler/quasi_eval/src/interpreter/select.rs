//! The `select` statement.
//!
//! Channel operands and send values are evaluated once, in source order.
//! The ready operations are then raced through a crossbeam [`Select`],
//! which picks uniformly among the cases that are ready. Cases on nil
//! channels never become ready.

use super::Interpreter;
use crate::environment::{BindingKind, Environment};
use crate::errors::{channel_closed, invalid_operation, type_mismatch, EvalResult};
use crate::value::{Channel, ChanValue, Value, Values};
use crossbeam::channel::{Select, Sender};
use quasi_ir::{AssignOp, CommClause, Expr, ExprKind, StmtKind, UnaryOp};
use smallvec::smallvec;
use std::sync::Arc;

/// One registered case of a select.
struct Pending<'s> {
    clause: usize,
    chan: Arc<Channel>,
    elem: crate::types::Type,
    op: PendingOp<'s>,
}

enum PendingOp<'s> {
    Send { sender: Sender<Value>, value: Value },
    /// `lhs` holds the receive assignment, if any.
    Recv { assign: Option<(&'s [Expr], AssignOp)> },
}

impl Interpreter {
    pub(crate) fn exec_select(&mut self, clauses: &[CommClause], env: &Environment) -> EvalResult<Values> {
        let mut pending = Vec::new();
        let mut default = None;
        for (i, clause) in clauses.iter().enumerate() {
            let Some(comm) = clause.comm.as_deref() else {
                default = Some(i);
                continue;
            };
            match &comm.kind {
                StmtKind::Send { chan, value } => {
                    let ch = self.eval(chan, env)?;
                    let v = self.eval(value, env)?;
                    if is_nil_chan(&ch) {
                        continue;
                    }
                    let (c, v) = super::ops::send_operands(&ch, v)?;
                    let Some(chan) = c.chan.clone() else {
                        continue;
                    };
                    let sender = chan.sender()?;
                    pending.push(Pending {
                        clause: i,
                        chan,
                        elem: c.elem,
                        op: PendingOp::Send { sender, value: v },
                    });
                }
                StmtKind::Expr(e) => {
                    if let Some(p) = self.recv_case(i, e, None, env)? {
                        pending.push(p);
                    }
                }
                StmtKind::Assign { lhs, op, rhs } if rhs.len() == 1 && lhs.len() <= 2 => {
                    if let Some(p) = self.recv_case(i, &rhs[0], Some((lhs.as_slice(), *op)), env)? {
                        pending.push(p);
                    }
                }
                _ => {
                    return Err(type_mismatch(format!(
                        "select case must be receive, send or assign recv, not {}",
                        comm.kind.describe()
                    ))
                    .into())
                }
            }
        }
        if pending.is_empty() && default.is_none() {
            return Err(invalid_operation("select with no ready cases blocks forever").into());
        }

        let mut sel = Select::new();
        for p in &pending {
            match &p.op {
                PendingOp::Send { sender, .. } => sel.send(sender),
                PendingOp::Recv { .. } => sel.recv(p.chan.receiver()),
            };
        }
        let oper = match default {
            Some(d) => match sel.try_select() {
                Ok(oper) => oper,
                Err(_) => return self.exec_stmts(&clauses[d].body, &env.child()),
            },
            None => sel.select(),
        };
        let chosen = &pending[oper.index()];
        let scope = env.child();
        match &chosen.op {
            PendingOp::Send { sender, value } => {
                oper.send(sender, value.clone())
                    .map_err(|_| channel_closed("send on closed channel"))?;
            }
            PendingOp::Recv { assign } => {
                let (value, ok) = match oper.recv(chosen.chan.receiver()) {
                    Ok(v) => (v, true),
                    Err(_) => (Value::zero(&chosen.elem), false),
                };
                if let Some((lhs, op)) = assign {
                    let values: Values = smallvec![value, Value::Bool(ok)];
                    self.bind_received(lhs, *op, values, &scope)?;
                }
            }
        }
        tracing::trace!(clause = chosen.clause, "select case chosen");
        self.exec_stmts(&clauses[chosen.clause].body, &scope)
    }

    fn recv_case<'s>(
        &mut self,
        clause: usize,
        e: &Expr,
        assign: Option<(&'s [Expr], AssignOp)>,
        env: &Environment,
    ) -> EvalResult<Option<Pending<'s>>> {
        let ExprKind::Unary(UnaryOp::Recv, ch) = &e.unparen().kind else {
            return Err(type_mismatch("select case must be receive, send or assign recv").into());
        };
        let ch = self.eval(ch, env)?;
        match ch {
            Value::Chan(ChanValue {
                chan: Some(chan),
                elem,
                ..
            }) => Ok(Some(Pending {
                clause,
                chan,
                elem,
                op: PendingOp::Recv { assign },
            })),
            Value::Chan(_) => Ok(None),
            other => Err(invalid_operation(format!(
                "cannot receive from non-channel {other} (type {})",
                other.type_of()
            ))
            .into()),
        }
    }

    /// `v, ok := <-ch` / `v, ok = <-ch` inside the chosen clause.
    fn bind_received(
        &mut self,
        lhs: &[Expr],
        op: AssignOp,
        values: Values,
        scope: &Environment,
    ) -> EvalResult<()> {
        for (e, v) in lhs.iter().zip(values) {
            if op == AssignOp::Define {
                let name = e
                    .as_ident()
                    .ok_or_else(|| type_mismatch("non-name on left side of :="))?;
                scope.define_binding(name, BindingKind::Var, v.type_of(), v)?;
            } else {
                self.eval_target(e, scope)?.store(v)?;
            }
        }
        Ok(())
    }
}

fn is_nil_chan(v: &Value) -> bool {
    matches!(v, Value::Chan(ChanValue { chan: None, .. }))
}
