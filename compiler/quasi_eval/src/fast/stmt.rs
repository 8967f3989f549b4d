//! Lowering statements.

use super::expr::{instantiate, Lowered, LoweredCall};
use super::scope::{fetch, Resolved};
use super::{FuncCode, Lowerer, StmtFn};
use crate::convert::assign_convert;
use crate::environment::{BindingKind, Environment};
use crate::errors::{
    invalid_operation, type_mismatch, unimplemented, ControlAction, EvalError, EvalResult,
};
use crate::interpreter::assign::{define_value, reject_untyped_nil, Target};
use crate::interpreter::call::{single, PreparedCall};
use crate::interpreter::decl::func_lit;
use crate::interpreter::expr::Callee;
use crate::interpreter::ops;
use crate::interpreter::stmt::{loop_control, switch_control, Flow, RangeIter};
use crate::interpreter::types::describe_expr;
use crate::interpreter::Interpreter;
use crate::operators::evaluate_binary;
use crate::types::{Method, Type};
use crate::value::{Constant, MacroValue, Place, Precision, Value, Values};
use quasi_ir::{
    AssignOp, BinaryOp, BranchKind, CaseClause, Decl, Expr, ExprKind, FuncDecl, Name, Span, Stmt,
    StmtKind, UnaryOp, ValueSpec,
};
use std::sync::Arc;

/// A lowered assignment target.
type TargetFn = Arc<dyn Fn(&mut Interpreter, &Environment) -> EvalResult<Target> + Send + Sync>;

fn code(
    f: impl Fn(&mut Interpreter, &Environment) -> EvalResult<Values> + Send + Sync + 'static,
) -> StmtFn {
    Arc::new(f)
}

fn nothing() -> StmtFn {
    code(|_, _| Ok(Values::new()))
}

/// Hand `stmt` to the tree-walker.
fn walked(stmt: &Stmt) -> StmtFn {
    let stmt = stmt.clone();
    code(move |interp, env| interp.exec_stmt(&stmt, env))
}

fn condition(v: &Value) -> EvalResult<bool> {
    v.as_bool().ok_or_else(|| {
        type_mismatch(format!("non-boolean condition in statement: {v} (type {})", v.type_of())).into()
    })
}

/// Whether `stmts` contain a `goto`, not looking into function literals.
fn has_goto(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match &s.kind {
        StmtKind::Branch {
            kind: BranchKind::Goto,
            ..
        } => true,
        StmtKind::Labeled { stmt, .. } => has_goto(std::slice::from_ref(stmt)),
        StmtKind::Block(b) => has_goto(&b.stmts),
        StmtKind::If { then, els, .. } => {
            has_goto(&then.stmts) || els.as_deref().is_some_and(|e| has_goto(std::slice::from_ref(e)))
        }
        StmtKind::For { body, .. } | StmtKind::Range { body, .. } => has_goto(&body.stmts),
        StmtKind::Switch { clauses, .. } | StmtKind::TypeSwitch { clauses, .. } => {
            clauses.iter().any(|c| has_goto(&c.body))
        }
        StmtKind::Select(clauses) => clauses.iter().any(|c| has_goto(&c.body)),
        _ => false,
    })
}

/// How one name of a `:=` outside the REPL scope is bound.
#[derive(Copy, Clone)]
enum DefineSlot {
    /// Already declared in this scope: assigned.
    Existing { name: Name, index: usize },
    New(Name),
}

/// A lowered clause of an expression switch.
struct SwitchClause {
    /// `None` for `default`.
    list: Option<Vec<Lowered>>,
    body: StmtFn,
}

/// A lowered range loop variable.
enum RangeVar {
    Define(Name),
    Assign(TargetFn),
}

impl Lowerer {
    /// Lower a statement list run in one scope. Lists that jump with
    /// `goto` are left to the tree-walker, which resolves labels by
    /// position.
    pub(crate) fn lower_stmts(&mut self, stmts: &[Stmt]) -> Result<StmtFn, EvalError> {
        let labeled = stmts.iter().any(|s| matches!(s.kind, StmtKind::Labeled { .. }));
        if labeled && has_goto(stmts) {
            let stmts: Arc<[Stmt]> = stmts.into();
            return Ok(code(move |interp, env| interp.exec_stmts(&stmts, env)));
        }
        let mut lowered: Vec<(StmtFn, Span)> = Vec::with_capacity(stmts.len());
        for s in stmts {
            lowered.push((self.lower_stmt(s)?, s.span));
        }
        if let [(only, span)] = lowered.as_slice() {
            let (only, span) = (Arc::clone(only), *span);
            return Ok(code(move |interp, env| {
                only(interp, env).map_err(|action| action.with_span_if_missing(span))
            }));
        }
        Ok(code(move |interp, env| {
            let mut last = Values::new();
            for (stmt, span) in &lowered {
                last = stmt(interp, env).map_err(|action| action.with_span_if_missing(*span))?;
            }
            Ok(last)
        }))
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<StmtFn, EvalError> {
        tracing::trace!(kind = stmt.kind.describe(), "lower");
        Ok(match &stmt.kind {
            StmtKind::Bad => {
                let err = invalid_operation("bad statement");
                code(move |_, _| Err(err.clone().into()))
            }
            StmtKind::Empty => nothing(),
            StmtKind::Expr(e) => match &e.unparen().kind {
                ExprKind::Call { .. } | ExprKind::Unary(UnaryOp::Recv, _) => {
                    self.lower_multi(e.unparen())?
                }
                _ => {
                    let x = self.lower_expr(e)?;
                    code(move |interp, env| x.run(interp, env).map(single))
                }
            },
            StmtKind::Send { chan, value } => {
                let (chan, value) = (self.lower_expr(chan)?, self.lower_expr(value)?);
                code(move |interp, env| {
                    let ch = chan.run(interp, env)?;
                    let v = value.run(interp, env)?;
                    ops::send(&ch, v)?;
                    Ok(Values::new())
                })
            }
            StmtKind::IncDec { x, inc } => {
                let target = self.lower_target(x)?;
                let op = if *inc { BinaryOp::Add } else { BinaryOp::Sub };
                code(move |interp, env| {
                    let target = target(interp, env)?;
                    let one = Value::Untyped(Constant::int(1));
                    let result = evaluate_binary(op, target.load()?, one, Precision::Exact)?;
                    target.store(result)?;
                    Ok(Values::new())
                })
            }
            StmtKind::Assign { lhs, op, rhs } => self.lower_assign(lhs, *op, rhs)?,
            StmtKind::Decl(decl) => self.lower_decl(decl, stmt)?,
            StmtKind::Labeled { label, stmt: inner } => self.lower_labeled(label.name, inner, stmt)?,
            StmtKind::Go(call) => {
                let call = self.lower_statement_call(call, "go")?;
                code(move |interp, env| {
                    let prepared = prepared_statement_call(&call, "go", interp, env)?;
                    interp.spawn_goroutine(prepared.func, prepared.args, prepared.spread, env)?;
                    Ok(Values::new())
                })
            }
            StmtKind::Defer(call) => {
                let call = self.lower_statement_call(call, "defer")?;
                let span = stmt.span;
                code(move |interp, env| {
                    let prepared = prepared_statement_call(&call, "defer", interp, env)?;
                    interp.push_defer(prepared.into_deferred(env, span))?;
                    Ok(Values::new())
                })
            }
            StmtKind::Return(results) => self.lower_return(results)?,
            StmtKind::Branch { kind, label } => {
                let label = label.map(|l| l.name);
                let action = match (kind, label) {
                    (BranchKind::Break, _) => ControlAction::Break(label),
                    (BranchKind::Continue, _) => ControlAction::Continue(label),
                    (BranchKind::Fallthrough, _) => ControlAction::Fallthrough,
                    (BranchKind::Goto, Some(l)) => ControlAction::Goto(l),
                    (BranchKind::Goto, None) => invalid_operation("goto without label").into(),
                };
                code(move |_, _| Err(action.clone()))
            }
            StmtKind::Block(block) => {
                let body = self.scoped(|this| this.lower_stmts(&block.stmts))?;
                code(move |interp, env| body(interp, &env.child()))
            }
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => self.scoped(|this| {
                let init = init.as_deref().map(|s| this.lower_stmt(s)).transpose()?;
                let cond = this.lower_expr(cond)?;
                let then = this.scoped(|this| this.lower_stmts(&then.stmts))?;
                let els = els.as_deref().map(|s| this.lower_stmt(s)).transpose()?;
                Ok::<_, EvalError>(code(move |interp, env| {
                    let scope = env.child();
                    if let Some(init) = &init {
                        init(interp, &scope)?;
                    }
                    if condition(&cond.run(interp, &scope)?)? {
                        then(interp, &scope.child())
                    } else if let Some(els) = &els {
                        els(interp, &scope)
                    } else {
                        Ok(Values::new())
                    }
                }))
            })?,
            StmtKind::For { .. } | StmtKind::Range { .. } | StmtKind::Switch { .. } => {
                self.lower_breakable(None, stmt)?
            }
            StmtKind::TypeSwitch { .. } | StmtKind::Select(_) => walked(stmt),
        })
    }

    /// `label: stmt`. Without a `goto` in the list, a label only names the
    /// target of `break` and `continue`.
    fn lower_labeled(&mut self, label: Name, inner: &Stmt, whole: &Stmt) -> Result<StmtFn, EvalError> {
        match &inner.kind {
            StmtKind::For { .. } | StmtKind::Range { .. } | StmtKind::Switch { .. } => {
                self.lower_breakable(Some(label), inner)
            }
            StmtKind::TypeSwitch { .. } | StmtKind::Select(_) => Ok(walked(whole)),
            _ => self.lower_stmt(inner),
        }
    }

    fn lower_breakable(&mut self, label: Option<Name>, stmt: &Stmt) -> Result<StmtFn, EvalError> {
        match &stmt.kind {
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => self.lower_for(label, init.as_deref(), cond.as_ref(), post.as_deref(), &body.stmts),
            StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            } => self.lower_range(label, key.as_ref(), value.as_ref(), *define, x, &body.stmts),
            StmtKind::Switch { init, tag, clauses } => {
                self.lower_switch(label, init.as_deref(), tag.as_ref(), clauses)
            }
            _ => self.lower_stmt(stmt),
        }
    }

    fn lower_for(
        &mut self,
        label: Option<Name>,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &[Stmt],
    ) -> Result<StmtFn, EvalError> {
        self.scoped(|this| {
            let init = init.map(|s| this.lower_stmt(s)).transpose()?;
            let cond = cond.map(|c| this.lower_expr(c)).transpose()?;
            let post = post.map(|s| this.lower_stmt(s)).transpose()?;
            let body = this.scoped(|this| this.lower_stmts(body))?;
            Ok(code(move |interp, env| {
                let scope = env.child();
                if let Some(init) = &init {
                    init(interp, &scope)?;
                }
                loop {
                    if let Some(cond) = &cond {
                        if !condition(&cond.run(interp, &scope)?)? {
                            break;
                        }
                    }
                    if let Err(action) = body(interp, &scope.child()) {
                        match loop_control(action, label)? {
                            Flow::Break => break,
                            Flow::Continue => {}
                        }
                    }
                    if let Some(post) = &post {
                        post(interp, &scope)?;
                    }
                }
                Ok(Values::new())
            }))
        })
    }

    fn lower_range(
        &mut self,
        label: Option<Name>,
        key: Option<&Expr>,
        value: Option<&Expr>,
        define: bool,
        x: &Expr,
        body: &[Stmt],
    ) -> Result<StmtFn, EvalError> {
        let subject = self.lower_expr(x)?;
        let lower_body = |this: &mut Self, vars: [Option<RangeVar>; 2]| {
            let body = this.scoped(|this| this.lower_stmts(body))?;
            Ok::<_, EvalError>(range_loop(label, define, subject.clone(), vars, body))
        };
        if !define {
            let key = key.map(|k| self.lower_target(k).map(RangeVar::Assign)).transpose()?;
            let value = value.map(|v| self.lower_target(v).map(RangeVar::Assign)).transpose()?;
            return lower_body(self, [key, value]);
        }
        let name = |e: &Expr| {
            e.as_ident()
                .ok_or_else(|| type_mismatch("non-name on left side of := in range"))
        };
        let key = key.map(name).transpose()?;
        let value = value.map(name).transpose()?;
        self.scoped(|this| {
            for n in key.iter().chain(&value) {
                this.scopes.define(*n);
            }
            lower_body(this, [key.map(RangeVar::Define), value.map(RangeVar::Define)])
        })
    }

    fn lower_switch(
        &mut self,
        label: Option<Name>,
        init: Option<&Stmt>,
        tag: Option<&Expr>,
        clauses: &[CaseClause],
    ) -> Result<StmtFn, EvalError> {
        self.scoped(|this| {
            let init = init.map(|s| this.lower_stmt(s)).transpose()?;
            let tag = tag.map(|t| this.lower_expr(t)).transpose()?;
            let mut lowered = Vec::with_capacity(clauses.len());
            for clause in clauses {
                let list = clause
                    .list
                    .as_ref()
                    .map(|l| l.iter().map(|e| this.lower_expr(e)).collect::<Result<Vec<_>, _>>())
                    .transpose()?;
                let body = this.scoped(|this| this.lower_stmts(&clause.body))?;
                lowered.push(SwitchClause { list, body });
            }
            Ok(code(move |interp, env| {
                let result = run_switch(interp, env, init.as_ref(), tag.as_ref(), &lowered);
                switch_control(result, label)
            }))
        })
    }

    fn lower_return(&mut self, results: &[Expr]) -> Result<StmtFn, EvalError> {
        if let [only] = results {
            let multi = self.lower_multi(only)?;
            let x = self.lower_expr(only)?;
            return Ok(code(move |interp, env| {
                let values = if interp.current_result_count() > 1 {
                    multi(interp, env)?
                } else {
                    single(x.run(interp, env)?)
                };
                Err(ControlAction::Return(values))
            }));
        }
        let results = results
            .iter()
            .map(|e| self.lower_expr(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(code(move |interp, env| {
            let mut values = Values::with_capacity(results.len());
            for r in &results {
                values.push(r.run(interp, env)?);
            }
            Err(ControlAction::Return(values))
        }))
    }

    fn lower_statement_call(&mut self, call: &Expr, what: &str) -> Result<LoweredCall, EvalError> {
        if !matches!(call.unparen().kind, ExprKind::Call { .. }) {
            return Err(type_mismatch(format!("expression in {what} must be function call")));
        }
        self.lower_call(call)
    }

    /// Lower the left side of an assignment.
    fn lower_target(&mut self, e: &Expr) -> Result<TargetFn, EvalError> {
        Ok(match &e.unparen().kind {
            ExprKind::Ident(name) if name.is_blank() => Arc::new(|_, _| Ok(Target::Blank)),
            ExprKind::Ident(name) => {
                let (name, resolved) = (*name, self.scopes.resolve(*name));
                Arc::new(move |_, env| variable_target(env, resolved, name))
            }
            ExprKind::Index(x, i) => {
                let (x, i) = (self.lower_expr(x)?, self.lower_expr(i)?);
                Arc::new(move |interp, env| {
                    let container = x.run(interp, env)?;
                    let idx = i.run(interp, env)?;
                    if let Value::Map(m) = container {
                        let key = assign_convert(idx, &m.key)?;
                        return Ok(Target::MapEntry(m, key));
                    }
                    let place = ops::element_place(&container, &idx)?;
                    Ok(Target::Place(place, ops::element_type(&container)))
                })
            }
            _ => {
                let e = e.clone();
                Arc::new(move |interp, env| interp.eval_target(&e, env))
            }
        })
    }

    /// Right-hand sides of an `n`-variable assignment.
    fn lower_rhs(&mut self, n: usize, rhs: &[Expr]) -> Result<StmtFn, EvalError> {
        if rhs.len() == 1 && n > 1 {
            let multi = self.lower_multi(&rhs[0])?;
            let describe = describe_expr(&rhs[0]);
            return Ok(code(move |interp, env| {
                let values = multi(interp, env)?;
                if values.len() != n {
                    return Err(type_mismatch(format!(
                        "assignment mismatch: {n} variables but {describe} returns {} values",
                        values.len()
                    ))
                    .into());
                }
                Ok(values)
            }));
        }
        if rhs.len() != n {
            return Err(type_mismatch(format!(
                "assignment mismatch: {n} variables but {} values",
                rhs.len()
            )));
        }
        let rhs = rhs
            .iter()
            .map(|e| self.lower_expr(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(code(move |interp, env| {
            let mut values = Values::with_capacity(rhs.len());
            for r in &rhs {
                values.push(r.run(interp, env)?);
            }
            Ok(values)
        }))
    }

    fn lower_assign(&mut self, lhs: &[Expr], op: AssignOp, rhs: &[Expr]) -> Result<StmtFn, EvalError> {
        match op {
            AssignOp::Define => self.lower_define(lhs, rhs),
            AssignOp::Assign => {
                let values = self.lower_rhs(lhs.len(), rhs)?;
                let targets = lhs
                    .iter()
                    .map(|e| self.lower_target(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(code(move |interp, env| {
                    let values = values(interp, env)?;
                    let mut resolved = Vec::with_capacity(targets.len());
                    for t in &targets {
                        resolved.push(t(interp, env)?);
                    }
                    let mut stored = Values::with_capacity(values.len());
                    for (target, value) in resolved.iter().zip(values) {
                        stored.push(target.store(value)?);
                    }
                    Ok(stored)
                }))
            }
            AssignOp::Op(bop) => {
                let ([l], [r]) = (lhs, rhs) else {
                    return Err(type_mismatch(format!(
                        "assignment operation {}= requires single-valued expressions",
                        bop.as_symbol()
                    )));
                };
                let r = self.lower_expr(r)?;
                let target = self.lower_target(l)?;
                Ok(code(move |interp, env| {
                    let rv = r.run(interp, env)?;
                    let target = target(interp, env)?;
                    let result = evaluate_binary(bop, target.load()?, rv, Precision::Exact)?;
                    Ok(single(target.store(result)?))
                }))
            }
        }
    }

    /// `a, b := x, y`. Outside the REPL scope, which names are new is known
    /// here; in it, the runtime decides as the tree-walker does.
    fn lower_define(&mut self, lhs: &[Expr], rhs: &[Expr]) -> Result<StmtFn, EvalError> {
        let names = lhs
            .iter()
            .map(|e| {
                e.as_ident().ok_or_else(|| {
                    type_mismatch(format!("non-name {} on left side of :=", describe_expr(e)))
                })
            })
            .collect::<Result<Vec<Name>, _>>()?;
        reject_untyped_nil(rhs)?;
        let values = self.lower_rhs(names.len(), rhs)?;
        if self.scopes.at_root() {
            return Ok(code(move |interp, env| {
                let values = values(interp, env)?;
                interp.define_names(&names, values, env)
            }));
        }
        let slots: Vec<DefineSlot> = names
            .iter()
            .map(|&n| match self.scopes.local_index(n) {
                Some(index) if !n.is_blank() => DefineSlot::Existing { name: n, index },
                _ => DefineSlot::New(n),
            })
            .collect();
        let any_new = slots
            .iter()
            .any(|s| matches!(s, DefineSlot::New(n) if !n.is_blank()));
        if !any_new {
            return Err(invalid_operation("no new variables on left side of :="));
        }
        for slot in &slots {
            if let DefineSlot::New(n) = slot {
                self.scopes.define(*n);
            }
        }
        Ok(code(move |interp, env| {
            let values = values(interp, env)?;
            let mut stored = Values::with_capacity(values.len());
            for (slot, value) in slots.iter().zip(values) {
                match *slot {
                    DefineSlot::Existing { name, index } => {
                        let binding = fetch(env, Resolved::Local { depth: 0, index }, name)?;
                        let value = assign_convert(value, &binding.ty)?;
                        binding.slot.set(value.clone());
                        stored.push(value);
                    }
                    DefineSlot::New(name) => {
                        let (value, ty) = define_value(value)?;
                        env.define_binding(name, BindingKind::Var, ty, value.clone())?;
                        stored.push(value);
                    }
                }
            }
            Ok(stored)
        }))
    }

    fn lower_decl(&mut self, decl: &Decl, stmt: &Stmt) -> Result<StmtFn, EvalError> {
        match decl {
            Decl::Var(specs) => {
                let specs = specs
                    .iter()
                    .map(|spec| self.lower_var_spec(spec))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(code(move |interp, env| {
                    let mut last = Values::new();
                    for spec in &specs {
                        last = spec(interp, env)?;
                    }
                    Ok(last)
                }))
            }
            // constants are computed by the tree-walker at the same
            // precision; only their names matter here
            Decl::Const(specs) => {
                for spec in specs {
                    for ident in &spec.names {
                        self.scopes.define(ident.name);
                    }
                }
                Ok(walked(stmt))
            }
            Decl::Type(specs) => {
                for spec in specs {
                    self.scopes.define(spec.name.name);
                }
                Ok(walked(stmt))
            }
            Decl::Import(specs) => {
                for spec in specs {
                    let name = match spec.name {
                        Some(ident) => Some(ident.name),
                        None => self.shared.packages.get(&spec.path).map(|p| p.name),
                    };
                    if let Some(name) = name {
                        self.scopes.define(name);
                    }
                }
                Ok(walked(stmt))
            }
            Decl::Func(decl) => self.lower_func_decl(decl),
            Decl::Macro(decl) => self.lower_macro_decl(decl),
        }
    }

    /// `var a, b T = x, y`
    fn lower_var_spec(&mut self, spec: &ValueSpec) -> Result<StmtFn, EvalError> {
        let n = spec.names.len();
        let values = if spec.values.is_empty() {
            None
        } else {
            if spec.ty.is_none() {
                reject_untyped_nil(&spec.values)?;
            }
            Some(self.lower_rhs(n, &spec.values)?)
        };
        let names: Vec<Name> = spec.names.iter().map(|i| i.name).collect();
        for name in &names {
            self.scopes.define(*name);
        }
        let ty_expr = spec.ty.clone();
        Ok(code(move |interp, env| {
            let ty = ty_expr.as_ref().map(|t| interp.resolve_type(t, env)).transpose()?;
            let values = match (&values, &ty) {
                (Some(values), _) => values(interp, env)?,
                (None, Some(ty)) => (0..n).map(|_| Value::zero(ty)).collect(),
                (None, None) => {
                    return Err(type_mismatch("missing type or init expr in var declaration").into())
                }
            };
            let mut bound = Values::with_capacity(n);
            for (name, value) in names.iter().zip(values) {
                let (value, binding_ty) = match &ty {
                    Some(ty) => (assign_convert(value, ty)?, ty.clone()),
                    None => define_value(value)?,
                };
                env.define_binding(*name, BindingKind::Var, binding_ty, value.clone())?;
                bound.push(value);
            }
            Ok(bound)
        }))
    }

    /// `func f(...)` or `func (r T) m(...)`.
    fn lower_func_decl(&mut self, decl: &FuncDecl) -> Result<StmtFn, EvalError> {
        let name = decl.name.name;
        let lit = Arc::new(func_lit(decl)?);
        let Some(recv) = &decl.recv else {
            // bound before the body is lowered so it may call itself
            self.scopes.define(name);
            let lowered = Arc::new(self.lower_func(&lit, None)?);
            return Ok(code(move |interp, env| {
                let f = instantiate(interp, name, &lowered, env)?;
                env.define_binding(name, BindingKind::Func, Type::Func(f.ty.clone()), Value::Func(f))?;
                Ok(Values::new())
            }));
        };
        let method: Arc<FuncCode> = Arc::new(self.lower_func(&lit, Some(recv))?);
        let recv_expr = recv.ty.clone();
        Ok(code(move |interp, env| {
            let recv_ty = interp.resolve_type(&recv_expr, env)?;
            let (named, pointer_recv) = match &recv_ty {
                Type::Named(n) => (Arc::clone(n), false),
                Type::Pointer(elem) => match &**elem {
                    Type::Named(n) => (Arc::clone(n), true),
                    _ => return Err(unimplemented(format!("method on {recv_ty}")).into()),
                },
                _ => return Err(unimplemented(format!("method on {recv_ty}")).into()),
            };
            let func = instantiate(interp, name, &method, env)?;
            named.set_method(name, Method { func, pointer_recv });
            Ok(Values::new())
        }))
    }

    /// `~macro m(...) { ... }`, defined when the form runs. Expansion
    /// already used the copy made while compiling.
    fn lower_macro_decl(&mut self, decl: &FuncDecl) -> Result<StmtFn, EvalError> {
        if decl.recv.is_some() {
            return Err(type_mismatch("macro cannot have a receiver"));
        }
        let name = decl.name.name;
        let lit = Arc::new(func_lit(decl)?);
        let body = Arc::new(self.lower_func(&lit, None)?);
        self.scopes.define(name);
        Ok(code(move |interp, env| {
            let func = instantiate(interp, name, &body, env)?;
            env.define_binding(
                name,
                BindingKind::Macro,
                Type::Invalid,
                Value::Macro(MacroValue { name, func }),
            )?;
            Ok(Values::new())
        }))
    }
}

/// The place of variable `name`.
fn variable_target(env: &Environment, resolved: Resolved, name: Name) -> EvalResult<Target> {
    let binding = fetch(env, resolved, name)?;
    if binding.kind != BindingKind::Var {
        return Err(type_mismatch(format!(
            "cannot assign to {name} (neither addressable nor a map index expression)"
        ))
        .into());
    }
    let ty = match binding.ty {
        Type::Invalid => binding.get().type_of(),
        ty => ty,
    };
    Ok(Target::Place(Place::Slot(binding.slot), ty))
}

fn prepared_statement_call(
    call: &LoweredCall,
    what: &str,
    interp: &mut Interpreter,
    env: &Environment,
) -> EvalResult<PreparedCall> {
    match call.prepare(interp, env)? {
        Callee::Call(prepared) => Ok(prepared),
        Callee::Converted(_) => {
            Err(type_mismatch(format!("{what} requires function call, not conversion")).into())
        }
    }
}

fn range_loop(
    label: Option<Name>,
    define: bool,
    subject: Lowered,
    vars: [Option<RangeVar>; 2],
    body: StmtFn,
) -> StmtFn {
    code(move |interp, env| {
        let mut iter = RangeIter::new(subject.run(interp, env)?)?;
        while let Some((k, v)) = iter.advance()? {
            let scope = if define { env.child() } else { env.clone() };
            for (var, val) in vars.iter().zip([Some(k), v]) {
                let (Some(var), Some(val)) = (var, val) else {
                    continue;
                };
                match var {
                    RangeVar::Define(name) => {
                        let (val, ty) = define_value(val)?;
                        scope.define_binding(*name, BindingKind::Var, ty, val)?;
                    }
                    RangeVar::Assign(target) => {
                        target(interp, &scope)?.store(val)?;
                    }
                }
            }
            if let Err(action) = body(interp, &scope.child()) {
                match loop_control(action, label)? {
                    Flow::Break => break,
                    Flow::Continue => {}
                }
            }
        }
        Ok(Values::new())
    })
}

fn run_switch(
    interp: &mut Interpreter,
    env: &Environment,
    init: Option<&StmtFn>,
    tag: Option<&Lowered>,
    clauses: &[SwitchClause],
) -> EvalResult<Values> {
    let scope = env.child();
    if let Some(init) = init {
        init(interp, &scope)?;
    }
    let tag = match tag {
        Some(t) => Some(t.run(interp, &scope)?.defaulted()?),
        None => None,
    };
    let mut matched = None;
    'clauses: for (i, clause) in clauses.iter().enumerate() {
        let Some(list) = &clause.list else {
            continue;
        };
        for case in list {
            let v = case.run(interp, &scope)?;
            let hit = match &tag {
                Some(t) => evaluate_binary(BinaryOp::Eql, t.clone(), v, Precision::Exact)?
                    .as_bool()
                    .unwrap_or(false),
                None => v.as_bool().ok_or_else(|| {
                    type_mismatch(format!(
                        "invalid case {v} in switch (mismatched types {} and bool)",
                        v.type_of()
                    ))
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
        match (clauses[i].body)(interp, &scope.child()) {
            Err(ControlAction::Fallthrough) if i + 1 < clauses.len() => i += 1,
            Err(ControlAction::Fallthrough) => {
                return Err(invalid_operation("cannot fallthrough final case in switch").into())
            }
            other => return other,
        }
    }
}
