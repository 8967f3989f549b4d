//! Unary operator implementations.
//!
//! `<-x` and `&x` need the evaluator (a channel or an addressable place) and
//! never reach this module.

use crate::errors::{invalid_operation, EvalError};
use crate::value::{Constant, FloatValue, Value};
use quasi_ir::UnaryOp;

/// Evaluate `op v` for `+`, `-`, `!` and `^`.
pub fn evaluate_unary(op: UnaryOp, v: Value) -> Result<Value, EvalError> {
    let result = match (&v, op) {
        (Value::Untyped(c), _) => return Constant::unary(op, c).map(Value::Untyped),
        (Value::Int(_) | Value::Float(_) | Value::Complex(_), UnaryOp::Pos) => Some(v.clone()),
        (Value::Int(i), UnaryOp::Neg) => Some(Value::Int(i.neg())),
        (Value::Int(i), UnaryOp::Xor) => Some(Value::Int(i.not())),
        (Value::Float(f), UnaryOp::Neg) => Some(Value::Float(FloatValue::new(f.kind(), -f.get()))),
        (Value::Complex(c), UnaryOp::Neg) => Some(Value::Complex(c.neg())),
        (Value::Bool(b), UnaryOp::Not) => Some(Value::Bool(!b)),
        _ => None,
    };
    result.ok_or_else(|| {
        invalid_operation(format!(
            "operator {} not defined on {v} (variable of type {})",
            op.as_symbol(),
            v.type_of()
        ))
    })
}

#[cfg(test)]
mod tests;
