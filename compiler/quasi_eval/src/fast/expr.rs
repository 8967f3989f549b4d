//! Lowering expressions.

use super::scope::fetch;
use super::{CompiledFunc, ExprFn, FuncCode, Lowerer, StmtFn};
use crate::convert::convert;
use crate::environment::Environment;
use crate::errors::{
    arity_mismatch, invalid_operation, not_callable, type_mismatch, EvalError, EvalResult,
};
use crate::interpreter::call::{single, PreparedCall};
use crate::interpreter::expr::{param_names, result_names, truth, Callee};
use crate::interpreter::ops;
use crate::interpreter::types::describe_expr;
use crate::interpreter::Interpreter;
use crate::literal;
use crate::macros::quasiquote;
use crate::operators::evaluate_binary;
use crate::unary_operators::evaluate_unary;
use crate::value::{Constant, FuncImpl, FunctionValue, Precision, Value, Values};
use quasi_ir::{BinaryOp, Block, Expr, ExprKind, Field, FuncLit, Name, QuoteKind, UnaryOp};
use quasi_stack::ensure_sufficient_stack;
use smallvec::smallvec;
use std::sync::Arc;

/// A lowered expression: a constant folded at compile time, or code.
#[derive(Clone)]
pub(crate) enum Lowered {
    Const(Value),
    Dyn(ExprFn),
}

impl Lowered {
    fn code(
        f: impl Fn(&mut Interpreter, &Environment) -> EvalResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Lowered::Dyn(Arc::new(f))
    }

    /// An expression that fails with `err` when it runs.
    fn failing(err: EvalError) -> Self {
        Lowered::code(move |_, _| Err(err.clone().into()))
    }

    pub(crate) fn run(&self, interp: &mut Interpreter, env: &Environment) -> EvalResult<Value> {
        match self {
            Lowered::Const(v) => Ok(v.clone()),
            Lowered::Dyn(f) => f(interp, env),
        }
    }
}

/// A lowered call: callee, arguments, and the multi-valued form of a sole
/// argument for `f(g())`.
pub(crate) struct LoweredCall {
    fun: Lowered,
    args: Vec<Lowered>,
    sole: Option<StmtFn>,
    ellipsis: bool,
    describe: String,
}

impl LoweredCall {
    /// Evaluate callee and arguments, performing a conversion on the spot.
    pub(crate) fn prepare(&self, interp: &mut Interpreter, env: &Environment) -> EvalResult<Callee> {
        match self.fun.run(interp, env)? {
            Value::Type(ty) => {
                if self.args.len() != 1 || self.ellipsis {
                    return Err(arity_mismatch(format!("conversion to {ty}"), 1, self.args.len()).into());
                }
                let v = self.args[0].run(interp, env)?;
                Ok(Callee::Converted(convert(v, &ty)?))
            }
            Value::Func(func) => {
                let spreads_sole = match &func.imp {
                    Some(FuncImpl::Builtin(b)) => b.spreads_call_argument(),
                    _ => true,
                };
                let values = match &self.sole {
                    Some(sole) if spreads_sole && !self.ellipsis => sole(interp, env)?.into_vec(),
                    _ => {
                        let mut values = Vec::with_capacity(self.args.len());
                        for a in &self.args {
                            values.push(a.run(interp, env)?);
                        }
                        values
                    }
                };
                Ok(Callee::Call(PreparedCall {
                    func,
                    args: values,
                    spread: self.ellipsis,
                }))
            }
            Value::Macro(m) => Err(invalid_operation(format!(
                "macro {} called at runtime (not expanded)",
                m.name
            ))
            .into()),
            other => Err(not_callable(format!("{} (type {})", self.describe, other.type_of())).into()),
        }
    }

    pub(crate) fn run(&self, interp: &mut Interpreter, env: &Environment) -> EvalResult<Values> {
        match self.prepare(interp, env)? {
            Callee::Call(call) => interp.call_function(&call.func, call.args, call.spread, env),
            Callee::Converted(v) => Ok(single(v)),
        }
    }
}

/// Hand `e` to the tree-walker.
fn walked(e: &Expr) -> Lowered {
    let e = e.clone();
    Lowered::code(move |interp, env| interp.eval(&e, env))
}

impl Lowerer {
    pub(crate) fn lower_expr(&mut self, e: &Expr) -> Result<Lowered, EvalError> {
        ensure_sufficient_stack(|| self.lower_expr_inner(e))
    }

    fn lower_expr_inner(&mut self, e: &Expr) -> Result<Lowered, EvalError> {
        Ok(match &e.kind {
            ExprKind::Bad => Lowered::failing(invalid_operation("bad expression")),
            ExprKind::Ident(name) => self.lower_ident(*name),
            ExprKind::BasicLit(kind, raw) => {
                Lowered::Const(Value::Untyped(literal::decode(*kind, raw, Precision::Exact)?))
            }
            ExprKind::Paren(inner) => self.lower_expr(inner)?,
            ExprKind::FuncLit(lit) => {
                let code = Arc::new(self.lower_func(lit, None)?);
                Lowered::code(move |interp, env| {
                    Ok(Value::Func(instantiate(interp, Name::intern("func"), &code, env)?))
                })
            }
            ExprKind::Index(x, i) => {
                let (x, i) = (self.lower_expr(x)?, self.lower_expr(i)?);
                Lowered::code(move |interp, env| {
                    let container = x.run(interp, env)?;
                    let idx = i.run(interp, env)?;
                    Ok(ops::index(&container, idx)?)
                })
            }
            ExprKind::Slice {
                x, low, high, max, ..
            } => {
                let x = self.lower_expr(x)?;
                let low = self.lower_opt(low.as_deref())?;
                let high = self.lower_opt(high.as_deref())?;
                let max = self.lower_opt(max.as_deref())?;
                Lowered::code(move |interp, env| {
                    let v = x.run(interp, env)?;
                    let low = run_opt(low.as_ref(), interp, env)?;
                    let high = run_opt(high.as_ref(), interp, env)?;
                    let max = run_opt(max.as_ref(), interp, env)?;
                    Ok(ops::slice(&v, low, high, max)?)
                })
            }
            ExprKind::Call { .. } => {
                let call = self.lower_call(e)?;
                Lowered::code(move |interp, env| {
                    let values = call.run(interp, env)?;
                    Ok(values.into_iter().next().unwrap_or(Value::None))
                })
            }
            ExprKind::Unary(op, x) => self.lower_unary(*op, x, e)?,
            ExprKind::Binary(op, l, r) => self.lower_binary(*op, l, r, e)?,
            ExprKind::KeyValue(..) => {
                Lowered::failing(invalid_operation("key:value expression outside composite literal"))
            }
            ExprKind::Quote(kind, body) => match kind {
                QuoteKind::Quote => Lowered::Const(Value::Syntax(Block::clone(body).into_node())),
                QuoteKind::Quasiquote => {
                    let body = Arc::clone(body);
                    Lowered::code(move |interp, env| quasiquote::evaluate(interp, &body, env))
                }
                QuoteKind::Unquote | QuoteKind::UnquoteSplice => Lowered::failing(invalid_operation(
                    format!("{} outside quasiquote", kind.keyword()),
                )),
            },
            // selectors need the operand's place for pointer-receiver
            // methods; literals and type syntax resolve types as they run
            ExprKind::Selector(..)
            | ExprKind::CompositeLit { .. }
            | ExprKind::TypeAssert { .. }
            | ExprKind::Star(_)
            | ExprKind::ArrayType { .. }
            | ExprKind::Ellipsis(_)
            | ExprKind::StructType(_)
            | ExprKind::FuncType(_)
            | ExprKind::InterfaceType(_)
            | ExprKind::MapType(..)
            | ExprKind::ChanType(..) => walked(e),
        })
    }

    fn lower_opt(&mut self, e: Option<&Expr>) -> Result<Option<Lowered>, EvalError> {
        e.map(|e| self.lower_expr(e)).transpose()
    }

    fn lower_ident(&mut self, name: Name) -> Lowered {
        if name.is_blank() {
            return Lowered::failing(invalid_operation("cannot use _ as value"));
        }
        let resolved = self.scopes.resolve(name);
        Lowered::code(move |_, env| Ok(fetch(env, resolved, name)?.get()))
    }

    fn lower_unary(&mut self, op: UnaryOp, x: &Expr, whole: &Expr) -> Result<Lowered, EvalError> {
        match op {
            UnaryOp::Recv => {
                let x = self.lower_expr(x)?;
                Ok(Lowered::code(move |interp, env| {
                    let ch = x.run(interp, env)?;
                    Ok(ops::receive(&ch)?.0)
                }))
            }
            UnaryOp::Addr => Ok(walked(whole)),
            _ => match self.lower_expr(x)? {
                Lowered::Const(v) => Ok(match evaluate_unary(op, v) {
                    Ok(folded) => Lowered::Const(folded),
                    Err(err) => Lowered::failing(err),
                }),
                x => Ok(Lowered::code(move |interp, env| {
                    let v = x.run(interp, env)?;
                    Ok(evaluate_unary(op, v)?)
                })),
            },
        }
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        l: &Expr,
        r: &Expr,
        whole: &Expr,
    ) -> Result<Lowered, EvalError> {
        let is_nil = |e: &Expr| e.unparen().as_ident().is_some_and(|n| n.as_str() == "nil");
        if matches!(op, BinaryOp::Eql | BinaryOp::Neq) && (is_nil(l) || is_nil(r)) {
            // comparing with nil depends on the variable's declared type
            return Ok(walked(whole));
        }
        let (lx, rx) = (self.lower_expr(l)?, self.lower_expr(r)?);
        if matches!(op, BinaryOp::LAnd | BinaryOp::LOr) {
            return Ok(Lowered::code(move |interp, env| {
                let lv = lx.run(interp, env)?;
                let lb = truth(&lv, op)?;
                if lb == (op == BinaryOp::LOr) {
                    return Ok(lv);
                }
                let rv = rx.run(interp, env)?;
                let rb = truth(&rv, op)?;
                Ok(match (&lv, &rv) {
                    (Value::Untyped(_), Value::Untyped(_)) => Value::Untyped(Constant::Bool(rb)),
                    _ => Value::Bool(rb),
                })
            }));
        }
        if let (Lowered::Const(a), Lowered::Const(b)) = (&lx, &rx) {
            let folded = evaluate_binary(op, a.clone(), b.clone(), Precision::Exact);
            tracing::trace!(op = op.as_symbol(), folded = folded.is_ok(), "constant operands");
            return Ok(match folded {
                Ok(v) => Lowered::Const(v),
                Err(err) => Lowered::failing(err),
            });
        }
        Ok(Lowered::code(move |interp, env| {
            let lv = lx.run(interp, env)?;
            let rv = rx.run(interp, env)?;
            Ok(evaluate_binary(op, lv, rv, Precision::Exact)?)
        }))
    }

    /// Lower `e` for a context that accepts several values.
    pub(crate) fn lower_multi(&mut self, e: &Expr) -> Result<StmtFn, EvalError> {
        Ok(match &e.kind {
            ExprKind::Paren(inner) => self.lower_multi(inner)?,
            ExprKind::Call { .. } => {
                let call = self.lower_call(e)?;
                Arc::new(move |interp, env| call.run(interp, env))
            }
            ExprKind::Unary(UnaryOp::Recv, x) => {
                let x = self.lower_expr(x)?;
                Arc::new(move |interp, env| {
                    let ch = x.run(interp, env)?;
                    let (v, ok) = ops::receive(&ch)?;
                    Ok(smallvec![v, Value::Bool(ok)])
                })
            }
            ExprKind::Index(x, i) => {
                let (x, i) = (self.lower_expr(x)?, self.lower_expr(i)?);
                Arc::new(move |interp, env| {
                    let container = x.run(interp, env)?;
                    let idx = i.run(interp, env)?;
                    match &container {
                        Value::Map(m) => {
                            let (v, ok) = ops::map_lookup(m, idx)?;
                            Ok(smallvec![v, Value::Bool(ok)])
                        }
                        _ => Ok(single(ops::index(&container, idx)?)),
                    }
                })
            }
            ExprKind::TypeAssert { ty: Some(_), .. } => {
                let e = e.clone();
                Arc::new(move |interp, env| interp.eval_multi(&e, env))
            }
            _ => {
                let x = self.lower_expr(e)?;
                Arc::new(move |interp, env| x.run(interp, env).map(single))
            }
        })
    }

    /// Lower the call expression `e`.
    pub(crate) fn lower_call(&mut self, e: &Expr) -> Result<LoweredCall, EvalError> {
        let ExprKind::Call {
            fun,
            args,
            ellipsis,
        } = &e.unparen().kind
        else {
            return Err(type_mismatch(format!("{} is not a call", describe_expr(e))));
        };
        let sole = match args.as_slice() {
            [only] if !ellipsis => Some(self.lower_multi(only)?),
            _ => None,
        };
        Ok(LoweredCall {
            fun: self.lower_expr(fun)?,
            args: args
                .iter()
                .map(|a| self.lower_expr(a))
                .collect::<Result<_, _>>()?,
            sole,
            ellipsis: *ellipsis,
            describe: describe_expr(fun),
        })
    }

    /// Lower a function body in a new scope holding its receiver,
    /// parameters and named results, in the order calls bind them.
    pub(crate) fn lower_func(
        &mut self,
        lit: &Arc<FuncLit>,
        recv: Option<&Field>,
    ) -> Result<FuncCode, EvalError> {
        let mut params = Vec::new();
        if let Some(recv) = recv {
            params.extend(param_names(std::slice::from_ref(recv)));
        }
        params.extend(param_names(&lit.ty.params));
        let results = result_names(&lit.ty.results);
        let body = self.scoped(|this| {
            for name in params.iter().chain(&results) {
                this.scopes.define(*name);
            }
            this.lower_stmts(&lit.body.stmts)
        })?;
        Ok(FuncCode {
            lit: Arc::clone(lit),
            recv: recv.map(|r| r.ty.clone()),
            params,
            results,
            body,
        })
    }
}

fn run_opt(
    e: Option<&Lowered>,
    interp: &mut Interpreter,
    env: &Environment,
) -> EvalResult<Option<Value>> {
    e.map(|e| e.run(interp, env)).transpose()
}

/// Close `code` over `env`, resolving its signature there.
pub(crate) fn instantiate(
    interp: &mut Interpreter,
    name: Name,
    code: &Arc<FuncCode>,
    env: &Environment,
) -> Result<FunctionValue, EvalError> {
    let mut ty = interp.resolve_func_type(&code.lit.ty, env)?;
    if let Some(recv) = &code.recv {
        ty.params.insert(0, interp.resolve_type(recv, env)?);
    }
    let func = CompiledFunc {
        name,
        env: env.clone(),
        code: Arc::clone(code),
    };
    Ok(FunctionValue::new(
        Arc::new(ty),
        FuncImpl::Compiled(Arc::new(func)),
    ))
}
