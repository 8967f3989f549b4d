//! Expression evaluation.

use super::call::{single, PreparedCall};
use super::ops::{self, CompositeKey};
use super::types::describe_expr;
use super::Interpreter;
use crate::convert::convert;
use crate::environment::{BindingKind, Environment};
use crate::errors::{
    arity_mismatch, invalid_operation, not_callable, type_mismatch, undefined_name, ControlAction,
    EvalError, EvalResult,
};
use crate::literal;
use crate::macros::quasiquote;
use crate::operators::evaluate_binary;
use crate::types::{Type, UntypedKind};
use crate::unary_operators::evaluate_unary;
use crate::value::{
    Closure, Constant, FuncImpl, FunctionValue, Place, PointerValue, Slot, Value, Values,
};
use quasi_ir::{BinaryOp, Block, Expr, ExprKind, Field, FuncLit, Name, QuoteKind, UnaryOp};
use quasi_stack::ensure_sufficient_stack;
use smallvec::smallvec;
use std::sync::Arc;

impl Interpreter {
    /// Evaluate `e` to a single value. A call returning several values
    /// yields its first; a call returning none yields `Value::None`.
    pub(crate) fn eval(&mut self, e: &Expr, env: &Environment) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.eval_inner(e, env))
    }

    /// Evaluate `e` in a context that accepts several values: calls, and
    /// the comma-ok forms of receive, map index and type assertion.
    pub(crate) fn eval_multi(&mut self, e: &Expr, env: &Environment) -> EvalResult<Values> {
        match &e.kind {
            ExprKind::Paren(inner) => self.eval_multi(inner, env),
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => self.eval_call(fun, args, *ellipsis, env),
            ExprKind::Unary(UnaryOp::Recv, x) => {
                let ch = self.eval(x, env)?;
                let (v, ok) = ops::receive(&ch)?;
                Ok(smallvec![v, Value::Bool(ok)])
            }
            ExprKind::Index(x, i) => {
                let container = self.eval(x, env)?;
                let idx = self.eval(i, env)?;
                match &container {
                    Value::Map(m) => {
                        let (v, ok) = ops::map_lookup(m, idx)?;
                        Ok(smallvec![v, Value::Bool(ok)])
                    }
                    _ => Ok(single(ops::index(&container, idx)?)),
                }
            }
            ExprKind::TypeAssert { x, ty: Some(ty) } => {
                let v = self.eval(x, env)?;
                let ty = self.resolve_type(ty, env)?;
                let (v, ok) = ops::type_assert(&v, &ty);
                Ok(smallvec![v, Value::Bool(ok)])
            }
            _ => self.eval(e, env).map(single),
        }
    }

    fn eval_inner(&mut self, e: &Expr, env: &Environment) -> EvalResult<Value> {
        match &e.kind {
            ExprKind::Bad => Err(invalid_operation("bad expression").into()),
            ExprKind::Ident(name) => self.eval_ident(*name, env),
            ExprKind::BasicLit(kind, raw) => Ok(Value::Untyped(literal::decode(
                *kind,
                raw,
                self.precision,
            )?)),
            ExprKind::Paren(inner) => self.eval(inner, env),
            ExprKind::FuncLit(lit) => {
                let f = self.closure(Name::intern("func"), lit, None, env)?;
                Ok(Value::Func(f))
            }
            ExprKind::CompositeLit { ty, elts } => {
                self.eval_composite(ty.as_deref(), elts, None, env)
            }
            ExprKind::Selector(..) => Ok(self.eval_operand(e, env)?.0),
            ExprKind::Index(x, i) => {
                let container = self.eval(x, env)?;
                let idx = self.eval(i, env)?;
                Ok(ops::index(&container, idx)?)
            }
            ExprKind::Slice {
                x, low, high, max, ..
            } => {
                let v = self.eval(x, env)?;
                let low = self.eval_opt(low.as_deref(), env)?;
                let high = self.eval_opt(high.as_deref(), env)?;
                let max = self.eval_opt(max.as_deref(), env)?;
                Ok(ops::slice(&v, low, high, max)?)
            }
            ExprKind::TypeAssert { x, ty } => {
                let Some(ty) = ty else {
                    return Err(invalid_operation("use of .(type) outside type switch").into());
                };
                let v = self.eval(x, env)?;
                let ty = self.resolve_type(ty, env)?;
                Ok(ops::type_assert_strict(&v, &ty)?)
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => {
                let values = self.eval_call(fun, args, *ellipsis, env)?;
                Ok(values.into_iter().next().unwrap_or(Value::None))
            }
            ExprKind::Star(x) => match self.eval(x, env)? {
                Value::Type(t) => Ok(Value::Type(Type::pointer(t))),
                Value::Pointer(p) => match &p.target {
                    Some(place) => Ok(place.load()),
                    None => Err(ops::nil_dereference().into()),
                },
                other => Err(invalid_operation(format!(
                    "invalid indirect of {other} (type {})",
                    other.type_of()
                ))
                .into()),
            },
            ExprKind::Unary(op, x) => self.eval_unary(*op, x, env),
            ExprKind::Binary(op, l, r) => self.eval_binary(*op, l, r, env),
            ExprKind::KeyValue(..) => {
                Err(invalid_operation("key:value expression outside composite literal").into())
            }
            ExprKind::ArrayType { .. }
            | ExprKind::Ellipsis(_)
            | ExprKind::StructType(_)
            | ExprKind::FuncType(_)
            | ExprKind::InterfaceType(_)
            | ExprKind::MapType(..)
            | ExprKind::ChanType(..) => Ok(Value::Type(self.resolve_type(e, env)?)),
            ExprKind::Quote(kind, body) => match kind {
                QuoteKind::Quote => Ok(Value::Syntax(Block::clone(body).into_node())),
                QuoteKind::Quasiquote => Ok(quasiquote::evaluate(self, body, env)?),
                QuoteKind::Unquote | QuoteKind::UnquoteSplice => Err(invalid_operation(
                    format!("{} outside quasiquote", kind.keyword()),
                )
                .into()),
            },
        }
    }

    fn eval_opt(&mut self, e: Option<&Expr>, env: &Environment) -> EvalResult<Option<Value>> {
        e.map(|e| self.eval(e, env)).transpose()
    }

    fn eval_ident(&mut self, name: Name, env: &Environment) -> EvalResult<Value> {
        if name.is_blank() {
            return Err(invalid_operation("cannot use _ as value").into());
        }
        let binding = env.lookup_binding(name).ok_or_else(|| undefined_name(name))?;
        Ok(binding.get())
    }

    fn eval_unary(&mut self, op: UnaryOp, x: &Expr, env: &Environment) -> EvalResult<Value> {
        match op {
            UnaryOp::Recv => {
                let ch = self.eval(x, env)?;
                Ok(ops::receive(&ch)?.0)
            }
            UnaryOp::Addr => {
                if let ExprKind::CompositeLit { ty, elts } = &x.unparen().kind {
                    let v = self.eval_composite(ty.as_deref(), elts, None, env)?;
                    return Ok(Value::Pointer(PointerValue::new(
                        v.type_of(),
                        Place::Slot(Slot::new(v)),
                    )));
                }
                match self.eval_operand(x, env)? {
                    (_, Some((place, ty))) => Ok(Value::Pointer(PointerValue::new(ty, place))),
                    (v, None) => Err(invalid_operation(format!(
                        "cannot take address of {}",
                        describe_operand(x, &v)
                    ))
                    .into()),
                }
            }
            _ => {
                let v = self.eval(x, env)?;
                Ok(evaluate_unary(op, v)?)
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        l: &Expr,
        r: &Expr,
        env: &Environment,
    ) -> EvalResult<Value> {
        if matches!(op, BinaryOp::LAnd | BinaryOp::LOr) {
            let lv = self.eval(l, env)?;
            let lb = truth(&lv, op)?;
            if lb == (op == BinaryOp::LOr) {
                return Ok(lv);
            }
            let rv = self.eval(r, env)?;
            let rb = truth(&rv, op)?;
            return Ok(match (&lv, &rv) {
                (Value::Untyped(_), Value::Untyped(_)) => Value::Untyped(Constant::Bool(rb)),
                _ => Value::Bool(rb),
            });
        }
        let lv = self.eval(l, env)?;
        let rv = self.eval(r, env)?;
        if matches!(op, BinaryOp::Eql | BinaryOp::Neq) {
            let nil_check = match (&lv, &rv) {
                (Value::Nil, Value::Nil) => None,
                (Value::Nil, other) => Some((r, other)),
                (other, Value::Nil) => Some((l, other)),
                _ => None,
            };
            if let Some((expr, value)) = nil_check {
                let static_ty = static_type(expr, env).unwrap_or_else(|| value.type_of());
                let is_nil = ops::is_nil_in(&static_ty, value);
                return Ok(Value::Bool(is_nil == (op == BinaryOp::Eql)));
            }
        }
        Ok(evaluate_binary(op, lv, rv, self.precision)?)
    }

    /// `x.sel` given the evaluated operand `x`: package member, struct
    /// field (with its place), method value or method expression.
    pub(crate) fn select_member(
        &mut self,
        x: &Expr,
        v: Value,
        place: Option<(Place, Type)>,
        sel: Name,
    ) -> EvalResult<(Value, Option<(Place, Type)>)> {
        match &v {
            Value::Package(pkg) => {
                return match pkg.member(sel) {
                    Some(member) => Ok((member, None)),
                    None => Err(undefined_name(format!("{}.{sel}", pkg.name)).into()),
                };
            }
            Value::Type(t) => {
                // method expression `T.M`: the receiver becomes the first argument
                return match t.method(sel) {
                    Some(m) => Ok((Value::Func(m.func), None)),
                    None => Err(type_mismatch(format!(
                        "{t}.{sel} undefined (type {t} has no method {sel})"
                    ))
                    .into()),
                };
            }
            _ => {}
        }
        if let Some((field, ty)) = ops::field_place(&v, sel)? {
            return Ok((field.load(), Some((field, ty))));
        }
        if let Some(method) = ops::find_method(&v, sel) {
            let recv = ops::method_receiver(&method, v, place.map(|(p, _)| p))?;
            return Ok((ops::bind_method(&method, recv), None));
        }
        Err(type_mismatch(format!(
            "{}.{sel} undefined (type {} has no field or method {sel})",
            describe_expr(x),
            v.type_of()
        ))
        .into())
    }

    /// Composite literal. `ctx` is the element type of an enclosing literal,
    /// used when this literal's type is elided.
    pub(crate) fn eval_composite(
        &mut self,
        ty_expr: Option<&Expr>,
        elts: &[Expr],
        ctx: Option<&Type>,
        env: &Environment,
    ) -> EvalResult<Value> {
        let declared = match ty_expr {
            Some(te) => self.composite_type(te, elts, env)?,
            None => ctx
                .cloned()
                .ok_or_else(|| type_mismatch("missing type in composite literal"))?,
        };
        // `[]*T{{...}}` elides `&T`
        let (ty, take_address) = match (ty_expr, declared.underlying()) {
            (None, Type::Pointer(elem)) => (Type::clone(&elem), true),
            _ => (declared, false),
        };
        let struct_ty = ty.struct_type();
        let (key_ty, elem_ty) = match ty.underlying() {
            Type::Map(k, v) => (Some(Type::clone(&k)), ty.elem()),
            _ => (None, ty.elem()),
        };
        let mut pairs = Vec::with_capacity(elts.len());
        for (i, elt) in elts.iter().enumerate() {
            let (key, value_expr) = match &elt.kind {
                ExprKind::KeyValue(k, v) => {
                    let key = if struct_ty.is_some() {
                        let name = k.as_ident().ok_or_else(|| {
                            type_mismatch(format!("invalid field name {} in struct literal", describe_expr(k)))
                        })?;
                        CompositeKey::Field(name)
                    } else {
                        CompositeKey::Value(self.eval_element(k, key_ty.as_ref(), env)?)
                    };
                    (key, &**v)
                }
                _ => (CompositeKey::None, elt),
            };
            let value_ctx = match (&struct_ty, &key) {
                (Some(st), CompositeKey::Field(name)) => {
                    st.field_index(*name).map(|j| st.fields[j].ty.clone())
                }
                (Some(st), _) => st.fields.get(i).map(|f| f.ty.clone()),
                (None, _) => elem_ty.clone(),
            };
            let value = self.eval_element(value_expr, value_ctx.as_ref(), env)?;
            pairs.push((key, value));
        }
        let value = ops::build_composite(&ty, pairs)?;
        if take_address {
            return Ok(Value::Pointer(PointerValue::new(
                ty,
                Place::Slot(Slot::new(value)),
            )));
        }
        Ok(value)
    }

    /// An element or key of a composite literal, which may itself be a
    /// literal with its type elided.
    fn eval_element(
        &mut self,
        e: &Expr,
        ctx: Option<&Type>,
        env: &Environment,
    ) -> EvalResult<Value> {
        match &e.kind {
            ExprKind::CompositeLit { ty: None, elts } => self.eval_composite(None, elts, ctx, env),
            _ => self.eval(e, env),
        }
    }

    /// The type of `T{...}`, sizing `[...]T` from its elements.
    fn composite_type(
        &mut self,
        te: &Expr,
        elts: &[Expr],
        env: &Environment,
    ) -> Result<Type, EvalError> {
        if let ExprKind::ArrayType {
            len: Some(len),
            elem,
        } = &te.kind
        {
            if matches!(len.kind, ExprKind::Ellipsis(None)) {
                let elem = self.resolve_type(elem, env)?;
                let mut keys = Vec::with_capacity(elts.len());
                for elt in elts {
                    keys.push(match &elt.kind {
                        ExprKind::KeyValue(k, _) => {
                            let k = self.eval(k, env).map_err(ControlAction::into_error)?;
                            k.as_int().and_then(|i| usize::try_from(i).ok())
                        }
                        _ => None,
                    });
                }
                return Ok(Type::array(ops::literal_length(&keys), elem));
            }
        }
        self.resolve_type(te, env)
    }

    /// `fun(args)`: a call or a conversion.
    pub(crate) fn eval_call(
        &mut self,
        fun: &Expr,
        args: &[Expr],
        ellipsis: bool,
        env: &Environment,
    ) -> EvalResult<Values> {
        let prepared = match self.prepare_call(fun, args, ellipsis, env)? {
            Callee::Call(call) => call,
            Callee::Converted(v) => return Ok(single(v)),
        };
        self.call_function(&prepared.func, prepared.args, prepared.spread, env)
    }

    /// Evaluate the callee and arguments of a call, performing conversions
    /// on the spot.
    pub(crate) fn prepare_call(
        &mut self,
        fun: &Expr,
        args: &[Expr],
        ellipsis: bool,
        env: &Environment,
    ) -> EvalResult<Callee> {
        match self.eval(fun, env)? {
            Value::Type(ty) => {
                if args.len() != 1 || ellipsis {
                    return Err(arity_mismatch(format!("conversion to {ty}"), 1, args.len()).into());
                }
                let v = self.eval(&args[0], env)?;
                Ok(Callee::Converted(convert(v, &ty)?))
            }
            Value::Func(func) => {
                let spreads_single = match &func.imp {
                    Some(FuncImpl::Builtin(b)) => b.spreads_call_argument(),
                    _ => true,
                };
                let values = if args.len() == 1 && !ellipsis && spreads_single {
                    self.eval_multi(&args[0], env)?.into_vec()
                } else {
                    let mut values = Vec::with_capacity(args.len());
                    for a in args {
                        values.push(self.eval(a, env)?);
                    }
                    values
                };
                Ok(Callee::Call(PreparedCall {
                    func,
                    args: values,
                    spread: ellipsis,
                }))
            }
            Value::Macro(m) => Err(invalid_operation(format!(
                "macro {} called at runtime (not expanded)",
                m.name
            ))
            .into()),
            other => Err(not_callable(format!(
                "{} (type {})",
                describe_expr(fun),
                other.type_of()
            ))
            .into()),
        }
    }

    /// Build a closure over `env` for a function literal, a declared
    /// function or a method (`recv` becomes the first parameter).
    pub(crate) fn closure(
        &mut self,
        name: Name,
        lit: &Arc<FuncLit>,
        recv: Option<&Field>,
        env: &Environment,
    ) -> Result<FunctionValue, EvalError> {
        let mut ty = self.resolve_func_type(&lit.ty, env)?;
        let mut params = Vec::new();
        if let Some(recv) = recv {
            ty.params.insert(0, self.resolve_type(&recv.ty, env)?);
            params.extend(param_names(std::slice::from_ref(recv)));
        }
        params.extend(param_names(&lit.ty.params));
        let results = result_names(&lit.ty.results);
        let closure = Closure {
            name,
            lit: Arc::clone(lit),
            env: env.clone(),
            params,
            results,
        };
        Ok(FunctionValue::new(
            Arc::new(ty),
            FuncImpl::Closure(Arc::new(closure)),
        ))
    }
}

/// Result of evaluating a call's callee.
pub(crate) enum Callee {
    Call(PreparedCall),
    /// `T(x)` already performed.
    Converted(Value),
}

pub(crate) fn truth(v: &Value, op: BinaryOp) -> Result<bool, EvalError> {
    v.as_bool().ok_or_else(|| {
        invalid_operation(format!(
            "operator {} not defined on {v} (type {})",
            op.as_symbol(),
            v.type_of()
        ))
    })
}

/// Declared type of the variable `e` names, if `e` is an identifier.
fn static_type(e: &Expr, env: &Environment) -> Option<Type> {
    let name = e.unparen().as_ident()?;
    let binding = env.lookup_binding(name)?;
    match binding.kind {
        BindingKind::Var if !matches!(binding.ty, Type::Invalid | Type::Untyped(UntypedKind::Nil)) => {
            Some(binding.ty)
        }
        _ => None,
    }
}

fn describe_operand(e: &Expr, v: &Value) -> String {
    format!("{} (value of type {})", describe_expr(e), v.type_of())
}

/// Parameter names in order; unnamed parameters are `_`.
pub(crate) fn param_names(fields: &[Field]) -> Vec<Name> {
    let mut names = Vec::new();
    for f in fields {
        if f.names.is_empty() {
            names.push(Name::intern("_"));
        } else {
            names.extend(f.names.iter().map(|i| i.name));
        }
    }
    names
}

/// Result names, or nothing when results are unnamed.
pub(crate) fn result_names(fields: &[Field]) -> Vec<Name> {
    if fields.iter().any(|f| f.names.is_empty()) {
        return Vec::new();
    }
    param_names(fields)
}
