//! Statements and control flow.

use super::call::single;
use super::expr::Callee;
use super::ops;
use super::Interpreter;
use crate::environment::{BindingKind, Environment};
use crate::errors::{invalid_operation, type_mismatch, unimplemented, ControlAction, EvalError, EvalResult};
use crate::operators::evaluate_binary;
use crate::types::{IntKind, Type};
use crate::value::{Constant, Value, Values};
use quasi_ir::{BinaryOp, Block, BranchKind, CaseClause, Expr, ExprKind, Name, Stmt, StmtKind, UnaryOp};
use std::sync::Arc;

/// What a loop does after its body unwound with a control action.
pub(crate) enum Flow {
    Break,
    Continue,
}

/// Consume `break` and `continue` aimed at the loop labelled `label`.
pub(crate) fn loop_control(action: ControlAction, label: Option<Name>) -> EvalResult<Flow> {
    match action {
        ControlAction::Break(None) => Ok(Flow::Break),
        ControlAction::Continue(None) => Ok(Flow::Continue),
        ControlAction::Break(Some(l)) if Some(l) == label => Ok(Flow::Break),
        ControlAction::Continue(Some(l)) if Some(l) == label => Ok(Flow::Continue),
        other => Err(other),
    }
}

/// Consume `break` aimed at a switch or select labelled `label`.
pub(crate) fn switch_control(result: EvalResult<Values>, label: Option<Name>) -> EvalResult<Values> {
    match result {
        Err(ControlAction::Break(None)) => Ok(Values::new()),
        Err(ControlAction::Break(Some(l))) if Some(l) == label => Ok(Values::new()),
        other => other,
    }
}

/// Index of the statement labelled `label` in `stmts`.
pub(super) fn find_label(stmts: &[Stmt], label: Name) -> Option<usize> {
    stmts.iter().position(|s| {
        matches!(&s.kind, StmtKind::Labeled { label: l, .. } if l.name == label)
    })
}

impl Interpreter {
    /// Run a statement list in `env`, resolving `goto` to labels of this
    /// list. Yields the values of the last statement.
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt], env: &Environment) -> EvalResult<Values> {
        let mut last = Values::new();
        let mut i = 0;
        while i < stmts.len() {
            match self.exec_stmt(&stmts[i], env) {
                Ok(values) => {
                    last = values;
                    i += 1;
                }
                Err(ControlAction::Goto(label)) => match find_label(stmts, label) {
                    Some(target) => i = target,
                    None => return Err(ControlAction::Goto(label)),
                },
                Err(action) => return Err(action.with_span_if_missing(stmts[i].span)),
            }
        }
        Ok(last)
    }

    /// Execute one statement.
    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt, env: &Environment) -> EvalResult<Values> {
        match &stmt.kind {
            StmtKind::Bad => Err(invalid_operation("bad statement").into()),
            StmtKind::Empty => Ok(Values::new()),
            StmtKind::Expr(e) => match &e.unparen().kind {
                ExprKind::Call { .. } | ExprKind::Unary(UnaryOp::Recv, _) => {
                    self.eval_multi(e.unparen(), env)
                }
                _ => self.eval(e, env).map(single),
            },
            StmtKind::Send { chan, value } => {
                let ch = self.eval(chan, env)?;
                let v = self.eval(value, env)?;
                ops::send(&ch, v)?;
                Ok(Values::new())
            }
            StmtKind::IncDec { x, inc } => self.exec_inc_dec(x, *inc, env),
            StmtKind::Assign { lhs, op, rhs } => self.exec_assign(lhs, *op, rhs, env),
            StmtKind::Decl(decl) => self.exec_decl(decl, env),
            StmtKind::Labeled { label, stmt } => self.exec_labeled(Some(label.name), stmt, env),
            StmtKind::Go(call) => {
                let prepared = self.prepare_statement_call(call, "go", env)?;
                self.spawn_goroutine(prepared.func, prepared.args, prepared.spread, env)?;
                Ok(Values::new())
            }
            StmtKind::Defer(call) => {
                let prepared = self.prepare_statement_call(call, "defer", env)?;
                self.push_defer(prepared.into_deferred(env, stmt.span))?;
                Ok(Values::new())
            }
            StmtKind::Return(results) => {
                let values = self.eval_results(results, env)?;
                Err(ControlAction::Return(values))
            }
            StmtKind::Branch { kind, label } => {
                let label = label.map(|l| l.name);
                Err(match kind {
                    BranchKind::Break => ControlAction::Break(label),
                    BranchKind::Continue => ControlAction::Continue(label),
                    BranchKind::Fallthrough => ControlAction::Fallthrough,
                    BranchKind::Goto => match label {
                        Some(l) => ControlAction::Goto(l),
                        None => return Err(invalid_operation("goto without label").into()),
                    },
                })
            }
            StmtKind::Block(block) => self.exec_stmts(&block.stmts, &env.child()),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                let scope = env.child();
                if let Some(init) = init {
                    self.exec_stmt(init, &scope)?;
                }
                if self.eval_cond(cond, &scope)? {
                    self.exec_stmts(&then.stmts, &scope.child())
                } else if let Some(els) = els {
                    self.exec_stmt(els, &scope)
                } else {
                    Ok(Values::new())
                }
            }
            StmtKind::Switch { .. }
            | StmtKind::TypeSwitch { .. }
            | StmtKind::Select(_)
            | StmtKind::For { .. }
            | StmtKind::Range { .. } => self.exec_labeled(None, stmt, env),
        }
    }

    /// Statements that `break` / `continue` may target, with their label.
    fn exec_labeled(
        &mut self,
        label: Option<Name>,
        stmt: &Stmt,
        env: &Environment,
    ) -> EvalResult<Values> {
        match &stmt.kind {
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => self.exec_for(init.as_deref(), cond.as_ref(), post.as_deref(), body, label, env),
            StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                let vars = RangeVars {
                    key: key.as_ref(),
                    value: value.as_ref(),
                    define: *define,
                };
                self.exec_range(&vars, x, body, label, env)
            }
            StmtKind::Switch { init, tag, clauses } => {
                let result = self.exec_switch(init.as_deref(), tag.as_ref(), clauses, env);
                switch_control(result, label)
            }
            StmtKind::TypeSwitch {
                init,
                bind,
                x,
                clauses,
            } => {
                let bind = bind.map(|b| b.name);
                let result = self.exec_type_switch(init.as_deref(), bind, x, clauses, env);
                switch_control(result, label)
            }
            StmtKind::Select(clauses) => {
                let result = self.exec_select(clauses, env);
                switch_control(result, label)
            }
            _ => self.exec_stmt(stmt, env),
        }
    }

    /// Results of `return`: a lone call spreads when the function has
    /// several results.
    pub(crate) fn eval_results(&mut self, results: &[Expr], env: &Environment) -> EvalResult<Values> {
        if let [only] = results {
            if self.current_result_count() > 1 {
                return self.eval_multi(only, env);
            }
        }
        let mut values = Values::with_capacity(results.len());
        for e in results {
            values.push(self.eval(e, env)?);
        }
        Ok(values)
    }

    pub(crate) fn eval_cond(&mut self, cond: &Expr, env: &Environment) -> EvalResult<bool> {
        let v = self.eval(cond, env)?;
        v.as_bool().ok_or_else(|| {
            type_mismatch(format!("non-boolean condition in statement: {v} (type {})", v.type_of()))
                .into()
        })
    }

    /// Evaluate the call of a `go` or `defer` statement.
    fn prepare_statement_call(
        &mut self,
        call: &Expr,
        what: &str,
        env: &Environment,
    ) -> EvalResult<super::call::PreparedCall> {
        let ExprKind::Call {
            fun,
            args,
            ellipsis,
        } = &call.unparen().kind
        else {
            return Err(type_mismatch(format!("expression in {what} must be function call")).into());
        };
        match self.prepare_call(fun, args, *ellipsis, env)? {
            Callee::Call(prepared) => Ok(prepared),
            Callee::Converted(_) => {
                Err(type_mismatch(format!("{what} requires function call, not conversion")).into())
            }
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &Block,
        label: Option<Name>,
        env: &Environment,
    ) -> EvalResult<Values> {
        let scope = env.child();
        if let Some(init) = init {
            self.exec_stmt(init, &scope)?;
        }
        loop {
            if let Some(cond) = cond {
                if !self.eval_cond(cond, &scope)? {
                    break;
                }
            }
            if let Err(action) = self.exec_stmts(&body.stmts, &scope.child()) {
                match loop_control(action, label)? {
                    Flow::Break => break,
                    Flow::Continue => {}
                }
            }
            if let Some(post) = post {
                self.exec_stmt(post, &scope)?;
            }
        }
        Ok(Values::new())
    }

    fn exec_switch(
        &mut self,
        init: Option<&Stmt>,
        tag: Option<&Expr>,
        clauses: &[CaseClause],
        env: &Environment,
    ) -> EvalResult<Values> {
        let scope = env.child();
        if let Some(init) = init {
            self.exec_stmt(init, &scope)?;
        }
        let tag = match tag {
            Some(t) => Some(self.eval(t, &scope)?.defaulted()?),
            None => None,
        };
        let mut matched = None;
        'clauses: for (i, clause) in clauses.iter().enumerate() {
            let Some(list) = &clause.list else {
                continue;
            };
            for case in list {
                let v = self.eval(case, &scope)?;
                let hit = match &tag {
                    Some(t) => evaluate_binary(BinaryOp::Eql, t.clone(), v, self.precision)?
                        .as_bool()
                        .unwrap_or(false),
                    None => v.as_bool().ok_or_else(|| {
                        type_mismatch(format!("invalid case {v} in switch (mismatched types {} and bool)", v.type_of()))
                    })?,
                };
                if hit {
                    matched = Some(i);
                    break 'clauses;
                }
            }
        }
        let Some(mut i) = matched.or_else(|| clauses.iter().position(|c| c.list.is_none())) else {
            return Ok(Values::new());
        };
        loop {
            match self.exec_stmts(&clauses[i].body, &scope.child()) {
                Err(ControlAction::Fallthrough) if i + 1 < clauses.len() => i += 1,
                Err(ControlAction::Fallthrough) => {
                    return Err(invalid_operation("cannot fallthrough final case in switch").into())
                }
                other => return other,
            }
        }
    }

    fn exec_type_switch(
        &mut self,
        init: Option<&Stmt>,
        bind: Option<Name>,
        x: &Expr,
        clauses: &[CaseClause],
        env: &Environment,
    ) -> EvalResult<Values> {
        let scope = env.child();
        if let Some(init) = init {
            self.exec_stmt(init, &scope)?;
        }
        let v = self.eval(x, &scope)?;
        let mut matched: Option<(usize, Option<Type>)> = None;
        'clauses: for (i, clause) in clauses.iter().enumerate() {
            let Some(list) = &clause.list else {
                continue;
            };
            for case in list {
                let (hit, ty) = if is_nil_case(case, &scope) {
                    (matches!(v, Value::Nil), None)
                } else {
                    let ty = self.resolve_type(case, &scope)?;
                    (ops::has_type(&v, &ty), Some(ty))
                };
                if hit {
                    // a single-type case binds the value at that type
                    let ty = if list.len() == 1 { ty } else { None };
                    matched = Some((i, ty));
                    break 'clauses;
                }
            }
        }
        let matched = matched.or_else(|| {
            clauses
                .iter()
                .position(|c| c.list.is_none())
                .map(|i| (i, None))
        });
        let Some((i, ty)) = matched else {
            return Ok(Values::new());
        };
        let clause_scope = scope.child();
        if let Some(name) = bind {
            let (value, ty) = match ty {
                Some(ty) => (v.clone(), ty),
                None => (v.clone(), Type::any()),
            };
            clause_scope.define_binding(name, BindingKind::Var, ty, value)?;
        }
        match self.exec_stmts(&clauses[i].body, &clause_scope) {
            Err(ControlAction::Fallthrough) => {
                Err(invalid_operation("cannot fallthrough in type switch").into())
            }
            other => other,
        }
    }

    fn exec_range(
        &mut self,
        vars: &RangeVars<'_>,
        x: &Expr,
        body: &Block,
        label: Option<Name>,
        env: &Environment,
    ) -> EvalResult<Values> {
        let subject = self.eval(x, env)?;
        let mut iter = RangeIter::new(subject)?;
        while let Some((k, v)) = iter.advance()? {
            let scope = if vars.define { env.child() } else { env.clone() };
            self.bind_range_vars(vars, k, v, &scope)?;
            if let Err(action) = self.exec_stmts(&body.stmts, &scope.child()) {
                match loop_control(action, label)? {
                    Flow::Break => break,
                    Flow::Continue => {}
                }
            }
        }
        Ok(Values::new())
    }

    fn bind_range_vars(
        &mut self,
        vars: &RangeVars<'_>,
        key: Value,
        value: Option<Value>,
        scope: &Environment,
    ) -> EvalResult<()> {
        let pairs = [(vars.key, Some(key)), (vars.value, value)];
        for (expr, val) in pairs {
            let (Some(expr), Some(val)) = (expr, val) else {
                continue;
            };
            if vars.define {
                let name = expr.as_ident().ok_or_else(|| {
                    type_mismatch("non-name on left side of := in range")
                })?;
                let (val, ty) = super::assign::define_value(val)?;
                scope.define_binding(name, BindingKind::Var, ty, val)?;
            } else {
                let target = self.eval_target(expr, scope)?;
                target.store(val)?;
            }
        }
        Ok(())
    }
}

/// Loop variables of a `range` statement.
struct RangeVars<'a> {
    key: Option<&'a Expr>,
    value: Option<&'a Expr>,
    define: bool,
}

/// Iteration state of a `range` statement. The length of slices and
/// strings is fixed when the loop starts; arrays are copied first.
pub(crate) enum RangeIter {
    Indexed { subject: Value, next: usize, len: usize },
    Runes { text: Arc<str>, pos: usize },
    Entries(std::vec::IntoIter<(Value, Value)>),
    Chan(Value),
    Count { next: i128, end: i128, kind: IntKind },
}

impl RangeIter {
    pub(crate) fn new(subject: Value) -> Result<RangeIter, EvalError> {
        Ok(match subject {
            Value::Slice(ref s) => {
                let len = s.len();
                RangeIter::Indexed {
                    subject,
                    next: 0,
                    len,
                }
            }
            Value::Array(ref a) => {
                let len = a.len();
                RangeIter::Indexed {
                    subject: subject.copied(),
                    next: 0,
                    len,
                }
            }
            Value::Pointer(ref p) => {
                let len = match p.elem.underlying() {
                    Type::Array(n, _) => n,
                    _ => return Err(range_error(&subject)),
                };
                if p.target.is_none() {
                    return Err(ops::nil_dereference());
                }
                RangeIter::Indexed {
                    subject,
                    next: 0,
                    len,
                }
            }
            Value::Str(s) | Value::Untyped(Constant::String(s)) => RangeIter::Runes { text: s, pos: 0 },
            Value::Map(m) => RangeIter::Entries(m.entries().into_iter()),
            Value::Chan(_) => RangeIter::Chan(subject),
            Value::Int(i) => RangeIter::Count {
                next: 0,
                end: i.get(),
                kind: i.kind(),
            },
            Value::Untyped(ref c) => match subject.as_int() {
                Some(n) if c.to_integer().is_some() => RangeIter::Count {
                    next: 0,
                    end: n,
                    kind: IntKind::Int,
                },
                _ => return Err(range_error(&subject)),
            },
            Value::Func(_) => return Err(unimplemented("range over function")),
            other => return Err(range_error(&other)),
        })
    }

    /// The next key and, when the subject has one, value.
    pub(crate) fn advance(&mut self) -> EvalResult<Option<(Value, Option<Value>)>> {
        Ok(match self {
            RangeIter::Indexed { subject, next, len } => {
                if *next >= *len {
                    return Ok(None);
                }
                let i = *next;
                *next += 1;
                let v = ops::index(subject, Value::int(i as i64))?;
                Some((Value::int(i as i64), Some(v)))
            }
            RangeIter::Runes { text, pos } => {
                let Some(c) = text[*pos..].chars().next() else {
                    return Ok(None);
                };
                let at = *pos;
                *pos += c.len_utf8();
                Some((
                    Value::int(at as i64),
                    Some(Value::typed_int(IntKind::Int32, i128::from(u32::from(c)))),
                ))
            }
            RangeIter::Entries(entries) => entries.next().map(|(k, v)| (k, Some(v))),
            RangeIter::Chan(ch) => match ops::receive(ch)? {
                (v, true) => Some((v, None)),
                (_, false) => None,
            },
            RangeIter::Count { next, end, kind } => {
                if *next >= *end {
                    return Ok(None);
                }
                let i = *next;
                *next += 1;
                Some((Value::typed_int(*kind, i), None))
            }
        })
    }
}

fn range_error(v: &Value) -> EvalError {
    type_mismatch(format!("cannot range over {v} (type {})", v.type_of()))
}

/// Whether a type switch case is the predeclared `nil`.
pub(crate) fn is_nil_case(case: &Expr, env: &Environment) -> bool {
    let Some(name) = case.unparen().as_ident() else {
        return false;
    };
    env.lookup_binding(name)
        .is_some_and(|b| b.kind == BindingKind::Const && matches!(b.get(), Value::Nil))
}
