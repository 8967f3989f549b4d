//! Binary operator implementations.
//!
//! Direct dispatch on the operand pair. Untyped constants meet each other
//! through [`Constant::binary`] at the caller's [`Precision`]; an untyped
//! operand facing a typed one is first converted to the typed operand's type,
//! after which arithmetic wraps or rounds to that type.
//!
//! `&&` and `||` short-circuit in the evaluators; they reach this module only
//! with both operands already evaluated.

use crate::errors::{invalid_operation, EvalError};
use crate::value::{ordering_holds, ComplexValue, Constant, FloatValue, IntValue, Precision, Value};
use quasi_ir::BinaryOp;
use std::cmp::Ordering;

/// Evaluate `l op r`.
pub fn evaluate_binary(
    op: BinaryOp,
    l: Value,
    r: Value,
    precision: Precision,
) -> Result<Value, EvalError> {
    if op.is_shift() {
        return evaluate_shift(op, l, &r);
    }
    match (l, r) {
        (Value::Untyped(a), Value::Untyped(b)) => {
            Constant::binary(op, &a, &b, precision).map(Value::Untyped)
        }
        (l @ Value::Nil, r) | (r, l @ Value::Nil) => compare_nil(op, &l, &r),
        (Value::Untyped(c), r) => {
            let l = c.to_typed(&r.type_of(), false)?;
            typed_binary(op, &l, &r)
        }
        (l, Value::Untyped(c)) => {
            let r = c.to_typed(&l.type_of(), false)?;
            typed_binary(op, &l, &r)
        }
        (l, r) => typed_binary(op, &l, &r),
    }
}

/// `x == nil` / `x != nil` on the dynamic value.
fn compare_nil(op: BinaryOp, nil: &Value, other: &Value) -> Result<Value, EvalError> {
    let equal = other.is_nil();
    match op {
        BinaryOp::Eql => Ok(Value::Bool(equal)),
        BinaryOp::Neq => Ok(Value::Bool(!equal)),
        _ => Err(mismatched(op, nil, other)),
    }
}

#[cold]
fn mismatched(op: BinaryOp, l: &Value, r: &Value) -> EvalError {
    invalid_operation(format!(
        "{l} {} {r} (mismatched types {} and {})",
        op.as_symbol(),
        l.type_of(),
        r.type_of()
    ))
}

#[cold]
fn not_defined(op: BinaryOp, v: &Value) -> EvalError {
    invalid_operation(format!(
        "operator {} not defined on {v} (variable of type {})",
        op.as_symbol(),
        v.type_of()
    ))
}

fn typed_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    if !l.type_of().identical(&r.type_of()) {
        // interface operands with different dynamic types are unequal
        return match op {
            BinaryOp::Eql => Ok(Value::Bool(false)),
            BinaryOp::Neq => Ok(Value::Bool(true)),
            _ => Err(mismatched(op, l, r)),
        };
    }
    match (l, r) {
        (Value::Bool(a), Value::Bool(b)) => bool_binary(op, *a, *b).ok_or_else(|| not_defined(op, l)),
        (Value::Int(a), Value::Int(b)) => int_binary(op, *a, *b).and_then(|v| v.ok_or_else(|| not_defined(op, l))),
        (Value::Float(a), Value::Float(b)) => float_binary(op, *a, *b).ok_or_else(|| not_defined(op, l)),
        (Value::Complex(a), Value::Complex(b)) => complex_binary(op, *a, *b).ok_or_else(|| not_defined(op, l)),
        (Value::Str(a), Value::Str(b)) => match op {
            BinaryOp::Add => Ok(Value::Str(format!("{a}{b}").into())),
            _ if op.is_comparison() => Ok(Value::Bool(ordering_holds(op, a.cmp(b)))),
            _ => Err(not_defined(op, l)),
        },
        (Value::Slice(_) | Value::Map(_) | Value::Func(_), _) if matches!(op, BinaryOp::Eql | BinaryOp::Neq) => {
            Err(invalid_operation(format!(
                "{l} {} {r} ({} can only be compared to nil)",
                op.as_symbol(),
                l.type_of()
            )))
        }
        _ => match op {
            BinaryOp::Eql => Ok(Value::Bool(l == r)),
            BinaryOp::Neq => Ok(Value::Bool(l != r)),
            _ => Err(not_defined(op, l)),
        },
    }
}

fn bool_binary(op: BinaryOp, a: bool, b: bool) -> Option<Value> {
    Some(Value::Bool(match op {
        BinaryOp::LAnd => a && b,
        BinaryOp::LOr => a || b,
        BinaryOp::Eql => a == b,
        BinaryOp::Neq => a != b,
        _ => return None,
    }))
}

fn int_binary(op: BinaryOp, a: IntValue, b: IntValue) -> Result<Option<Value>, EvalError> {
    if op.is_comparison() {
        return Ok(Some(Value::Bool(ordering_holds(op, a.compare(b)))));
    }
    let v = match op {
        BinaryOp::Add => a.add(b),
        BinaryOp::Sub => a.sub(b),
        BinaryOp::Mul => a.mul(b),
        BinaryOp::Quo => a.quo(b)?,
        BinaryOp::Rem => a.rem(b)?,
        BinaryOp::And => a.and(b),
        BinaryOp::Or => a.or(b),
        BinaryOp::Xor => a.xor(b),
        BinaryOp::AndNot => a.and_not(b),
        _ => return Ok(None),
    };
    Ok(Some(Value::Int(v)))
}

fn float_binary(op: BinaryOp, a: FloatValue, b: FloatValue) -> Option<Value> {
    if op.is_comparison() {
        // NaN is unordered: only `!=` holds
        return Some(Value::Bool(match a.get().partial_cmp(&b.get()) {
            Some(ord) => ordering_holds(op, ord),
            None => op == BinaryOp::Neq,
        }));
    }
    let v = match op {
        BinaryOp::Add => a.map2(b, |x, y| x + y),
        BinaryOp::Sub => a.map2(b, |x, y| x - y),
        BinaryOp::Mul => a.map2(b, |x, y| x * y),
        BinaryOp::Quo => a.map2(b, |x, y| x / y),
        _ => return None,
    };
    Some(Value::Float(v))
}

fn complex_binary(op: BinaryOp, a: ComplexValue, b: ComplexValue) -> Option<Value> {
    Some(match op {
        BinaryOp::Eql => Value::Bool(a == b),
        BinaryOp::Neq => Value::Bool(a != b),
        BinaryOp::Add => Value::Complex(a.add(b)),
        BinaryOp::Sub => Value::Complex(a.sub(b)),
        BinaryOp::Mul => Value::Complex(a.mul(b)),
        BinaryOp::Quo => Value::Complex(a.quo(b)),
        _ => return None,
    })
}

/// `l << r` and `l >> r`.
///
/// An untyped left operand stays untyped when the count is constant; with a
/// typed count it takes its default type first.
fn evaluate_shift(op: BinaryOp, l: Value, r: &Value) -> Result<Value, EvalError> {
    let count = shift_count(r)?;
    match l {
        Value::Untyped(c) if matches!(r, Value::Untyped(_)) => {
            Constant::shift(op, &c, count).map(Value::Untyped)
        }
        Value::Untyped(c) => {
            let Some(i) = c.to_integer() else {
                return Err(invalid_operation(format!(
                    "shifted operand {c} must be integer"
                )));
            };
            evaluate_shift(op, Constant::Int(i).default_value()?, r)
        }
        Value::Int(i) => Ok(Value::Int(if op == BinaryOp::Shl {
            i.shl(count)
        } else {
            i.shr(count)
        })),
        other => Err(invalid_operation(format!(
            "shift of type {} ({other} must be integer)",
            other.type_of()
        ))),
    }
}

fn shift_count(r: &Value) -> Result<u64, EvalError> {
    let count = match r {
        Value::Int(_) | Value::Untyped(_) => r.as_int(),
        _ => None,
    };
    match count {
        Some(n) if n >= 0 => Ok(u64::try_from(n).unwrap_or(u64::MAX)),
        Some(n) => Err(invalid_operation(format!("negative shift amount {n}"))),
        None => Err(invalid_operation(format!(
            "shift count {r} (type {}) must be integer",
            r.type_of()
        ))),
    }
}

/// Ordering of two values of the same ordered type, used by `min` and `max`.
pub fn compare_ordered(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.compare(*b)),
        (Value::Float(a), Value::Float(b)) => a.get().partial_cmp(&b.get()),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
