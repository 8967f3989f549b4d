//! Assignable places and assignment statements.

use super::ops;
use super::types::describe_expr;
use super::Interpreter;
use crate::convert::assign_convert;
use crate::environment::{BindingKind, Environment};
use crate::errors::{invalid_operation, type_mismatch, undefined_name, EvalError, EvalResult};
use crate::operators::evaluate_binary;
use crate::types::Type;
use crate::value::{Constant, MapValue, Place, Value, Values};
use quasi_ir::{AssignOp, BinaryOp, Expr, ExprKind, Name};

/// Where an assignment stores.
pub(crate) enum Target {
    /// `_`
    Blank,
    Place(Place, Type),
    /// `m[k]`; the key is already converted.
    MapEntry(MapValue, Value),
}

impl Target {
    pub(crate) fn load(&self) -> Result<Value, EvalError> {
        match self {
            Target::Blank => Err(invalid_operation("cannot use _ as value")),
            Target::Place(place, _) => Ok(place.load()),
            Target::MapEntry(m, key) => Ok(m.get(key)?.unwrap_or_else(|| Value::zero(&m.value))),
        }
    }

    /// Convert `value` to the target's type and store it, returning what
    /// was stored.
    pub(crate) fn store(&self, value: Value) -> Result<Value, EvalError> {
        match self {
            Target::Blank => assign_convert(value, &Type::Invalid),
            Target::Place(place, ty) => {
                let value = assign_convert(value, ty)?;
                place.store(value.clone());
                Ok(value)
            }
            Target::MapEntry(m, key) => {
                let value = assign_convert(value, &m.value)?;
                m.insert(key.clone(), value.clone())?;
                Ok(value)
            }
        }
    }
}

impl Interpreter {
    /// Evaluate `e` as an operand, returning its storage location and
    /// static type when it designates a variable, field, element or
    /// pointer target.
    pub(crate) fn eval_operand(
        &mut self,
        e: &Expr,
        env: &Environment,
    ) -> EvalResult<(Value, Option<(Place, Type)>)> {
        match &e.kind {
            ExprKind::Paren(inner) => self.eval_operand(inner, env),
            ExprKind::Ident(name) if !name.is_blank() => {
                let binding = env.lookup_binding(*name).ok_or_else(|| undefined_name(name))?;
                let value = binding.get();
                if binding.kind != BindingKind::Var {
                    return Ok((value, None));
                }
                let ty = match binding.ty {
                    Type::Invalid => value.type_of(),
                    ty => ty,
                };
                Ok((value, Some((Place::Slot(binding.slot), ty))))
            }
            ExprKind::Selector(x, sel) => {
                let (v, place) = self.eval_operand(x, env)?;
                self.select_member(x, v, place, sel.name)
            }
            ExprKind::Index(x, i) => {
                let container = self.eval(x, env)?;
                let idx = self.eval(i, env)?;
                match &container {
                    Value::Slice(_) | Value::Array(_) | Value::Pointer(_) => {
                        let place = ops::element_place(&container, &idx)?;
                        Ok((place.load(), Some((place, ops::element_type(&container)))))
                    }
                    _ => Ok((ops::index(&container, idx)?, None)),
                }
            }
            ExprKind::Star(x) => match self.eval(x, env)? {
                Value::Pointer(p) => match p.target {
                    Some(place) => Ok((place.load(), Some((place, p.elem)))),
                    None => Err(ops::nil_dereference().into()),
                },
                Value::Type(t) => Ok((Value::Type(Type::pointer(t)), None)),
                other => Err(invalid_operation(format!(
                    "invalid indirect of {other} (type {})",
                    other.type_of()
                ))
                .into()),
            },
            _ => Ok((self.eval(e, env)?, None)),
        }
    }

    /// The place `e` designates, or an error if it is not assignable.
    pub(crate) fn eval_place(&mut self, e: &Expr, env: &Environment) -> EvalResult<(Place, Type)> {
        match self.eval_operand(e, env)? {
            (_, Some(found)) => Ok(found),
            (_, None) => Err(type_mismatch(format!(
                "cannot assign to {} (neither addressable nor a map index expression)",
                describe_expr(e)
            ))
            .into()),
        }
    }

    /// Evaluate the left side of an assignment.
    pub(crate) fn eval_target(&mut self, e: &Expr, env: &Environment) -> EvalResult<Target> {
        match &e.unparen().kind {
            ExprKind::Ident(name) if name.is_blank() => Ok(Target::Blank),
            ExprKind::Index(x, i) => {
                let container = self.eval(x, env)?;
                let idx = self.eval(i, env)?;
                if let Value::Map(m) = container {
                    let key = assign_convert(idx, &m.key)?;
                    return Ok(Target::MapEntry(m, key));
                }
                let place = ops::element_place(&container, &idx)?;
                Ok(Target::Place(place, ops::element_type(&container)))
            }
            _ => {
                let (place, ty) = self.eval_place(e, env)?;
                Ok(Target::Place(place, ty))
            }
        }
    }

    /// Right-hand sides of an `n`-variable assignment, spreading a single
    /// multi-valued expression.
    pub(crate) fn eval_rhs(&mut self, n: usize, rhs: &[Expr], env: &Environment) -> EvalResult<Values> {
        if rhs.len() == 1 && n > 1 {
            let values = self.eval_multi(&rhs[0], env)?;
            if values.len() != n {
                return Err(type_mismatch(format!(
                    "assignment mismatch: {n} variables but {} returns {} values",
                    describe_expr(&rhs[0]),
                    values.len()
                ))
                .into());
            }
            return Ok(values);
        }
        if rhs.len() != n {
            return Err(type_mismatch(format!(
                "assignment mismatch: {n} variables but {} values",
                rhs.len()
            ))
            .into());
        }
        let mut values = Values::with_capacity(n);
        for e in rhs {
            values.push(self.eval(e, env)?);
        }
        Ok(values)
    }

    /// `lhs op rhs`
    pub(crate) fn exec_assign(
        &mut self,
        lhs: &[Expr],
        op: AssignOp,
        rhs: &[Expr],
        env: &Environment,
    ) -> EvalResult<Values> {
        match op {
            AssignOp::Define => self.exec_define(lhs, rhs, env),
            AssignOp::Assign => {
                let values = self.eval_rhs(lhs.len(), rhs, env)?;
                let mut targets = Vec::with_capacity(lhs.len());
                for e in lhs {
                    targets.push(self.eval_target(e, env)?);
                }
                let mut stored = Values::with_capacity(values.len());
                for (target, value) in targets.iter().zip(values) {
                    stored.push(target.store(value)?);
                }
                Ok(stored)
            }
            AssignOp::Op(bop) => {
                let ([l], [r]) = (lhs, rhs) else {
                    return Err(type_mismatch(format!(
                        "assignment operation {}= requires single-valued expressions",
                        bop.as_symbol()
                    ))
                    .into());
                };
                let rv = self.eval(r, env)?;
                let target = self.eval_target(l, env)?;
                let result = evaluate_binary(bop, target.load()?, rv, self.precision)?;
                Ok(super::call::single(target.store(result)?))
            }
        }
    }

    /// `x++` / `x--`
    pub(crate) fn exec_inc_dec(&mut self, x: &Expr, inc: bool, env: &Environment) -> EvalResult<Values> {
        let target = self.eval_target(x, env)?;
        let op = if inc { BinaryOp::Add } else { BinaryOp::Sub };
        let result = evaluate_binary(op, target.load()?, Value::Untyped(Constant::int(1)), self.precision)?;
        target.store(result)?;
        Ok(Values::new())
    }

    /// `a, b := x, y`. At least one name must be new in this scope, except
    /// in the REPL scope where every name is (re)defined.
    fn exec_define(&mut self, lhs: &[Expr], rhs: &[Expr], env: &Environment) -> EvalResult<Values> {
        reject_untyped_nil(rhs)?;
        let values = self.eval_rhs(lhs.len(), rhs, env)?;
        let names = lhs
            .iter()
            .map(|e| {
                e.as_ident().ok_or_else(|| {
                    type_mismatch(format!("non-name {} on left side of :=", describe_expr(e)))
                })
            })
            .collect::<Result<Vec<Name>, _>>()?;
        self.define_names(&names, values, env)
    }

    /// Bind the names of a `:=` to already evaluated values.
    pub(crate) fn define_names(
        &mut self,
        names: &[Name],
        values: Values,
        env: &Environment,
    ) -> EvalResult<Values> {
        let redefine = self.shared.repl_redefinition && env.ptr_eq(&self.globals);
        let mut any_new = false;
        let mut stored = Values::with_capacity(values.len());
        for (&name, value) in names.iter().zip(values) {
            if !redefine && env.defines_locally(name) {
                let binding = env.lookup_binding(name).ok_or_else(|| undefined_name(name))?;
                let value = assign_convert(value, &binding.ty)?;
                env.assign(name, value.clone())?;
                stored.push(value);
                continue;
            }
            let (value, ty) = define_value(value)?;
            if !name.is_blank() {
                any_new = true;
            }
            env.define_binding(name, BindingKind::Var, ty, value.clone())?;
            stored.push(value);
        }
        if !any_new && !redefine {
            return Err(invalid_operation("no new variables on left side of :=").into());
        }
        Ok(stored)
    }
}

/// `x := nil` and `var x = nil` leave `x` without a type.
pub(crate) fn reject_untyped_nil(rhs: &[Expr]) -> Result<(), EvalError> {
    let is_nil = |e: &Expr| e.unparen().as_ident().is_some_and(|n| n.as_str() == "nil");
    if rhs.iter().any(is_nil) {
        return Err(type_mismatch("use of untyped nil in assignment"));
    }
    Ok(())
}

/// The value a `:=` or an untyped `var` binds, with the variable's type:
/// constants take their default type, a nil interface value keeps an
/// empty interface type.
pub(crate) fn define_value(value: Value) -> Result<(Value, Type), EvalError> {
    if matches!(value, Value::Nil) {
        return Ok((value, Type::any()));
    }
    let value = assign_convert(value, &Type::Invalid)?;
    let ty = value.type_of();
    Ok((value, ty))
}
