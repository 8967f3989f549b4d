//! Assignment compatibility and explicit conversions.
//!
//! [`assign_convert`] is applied on every store into a typed location:
//! variables, fields, elements, parameters and results. It collapses untyped
//! constants, turns `nil` into the target's typed nil and copies arrays and
//! structs. [`convert`] implements `T(x)`.

use crate::errors::{cannot_use, type_mismatch, EvalError};
use crate::types::{IntKind, Type};
use crate::value::{
    ChanValue, ComplexValue, FloatValue, IntValue, SliceValue, StructValue, Value,
};

/// Convert `value` for storage in a location of type `to`.
pub fn assign_convert(value: Value, to: &Type) -> Result<Value, EvalError> {
    match value {
        Value::None => Err(type_mismatch("expression has no value, cannot be used as value")),
        Value::Type(t) => Err(type_mismatch(format!("type {t} is not an expression"))),
        _ if matches!(to, Type::Invalid) => value.defaulted().map(|v| v.copied()),
        Value::Untyped(c) if !to.is_interface() => c.to_typed(to, false),
        Value::Nil => {
            if to.is_nilable() {
                Ok(Value::zero(to))
            } else {
                Err(cannot_use("nil", "untyped nil", to))
            }
        }
        value if to.is_interface() => {
            let value = value.defaulted()?;
            if let Some(iface) = to.interface_methods() {
                let have = value.type_of();
                if !iface.is_empty() && !have.implements(&iface) {
                    return Err(type_mismatch(format!(
                        "cannot use {value} (type {have}) as type {to}: missing method"
                    )));
                }
            }
            Ok(value.copied())
        }
        Value::Syntax(_) if matches!(to, Type::Syntax) => Ok(value),
        value => {
            let have = value.type_of();
            if have.assignable_to(to) {
                Ok(retag(value.copied(), to))
            } else {
                Err(cannot_use(&value, have, to))
            }
        }
    }
}

/// Give an assignable value the exact type of its destination.
fn retag(value: Value, to: &Type) -> Value {
    match value {
        Value::Struct(s) => Value::Struct(StructValue {
            ty: to.clone(),
            fields: s.fields,
        }),
        Value::Chan(c) => match to.underlying() {
            Type::Chan(dir, _) => Value::Chan(ChanValue { dir, ..c }),
            _ => Value::Chan(c),
        },
        other => other,
    }
}

/// Explicit conversion `T(x)`.
pub fn convert(value: Value, to: &Type) -> Result<Value, EvalError> {
    let under = to.underlying();
    if to.is_interface() || matches!(to, Type::Syntax) {
        return assign_convert(value, to);
    }
    let value = match value {
        Value::Untyped(c) => match under {
            Type::Slice(_) => c.default_value()?,
            _ => return c.to_typed(to, true),
        },
        Value::Nil => return assign_convert(Value::Nil, to),
        other => other,
    };
    let fail = |value: &Value| {
        type_mismatch(format!(
            "cannot convert {value} (type {}) to type {to}",
            value.type_of()
        ))
    };
    Ok(match (&value, &under) {
        (Value::Int(i), Type::Int(k)) => Value::Int(i.cast(*k)),
        (Value::Int(i), Type::Float(k)) => Value::Float(FloatValue::new(*k, i.get() as f64)),
        (Value::Float(f), Type::Int(k)) => Value::Int(float_to_int(f.get(), *k)),
        (Value::Float(f), Type::Float(k)) => Value::Float(FloatValue::new(*k, f.get())),
        (Value::Complex(c), Type::Complex(k)) => {
            Value::Complex(ComplexValue::new(*k, c.re(), c.im()))
        }
        (Value::Int(i), Type::String) => {
            let c = u32::try_from(i.get())
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            Value::Str(c.to_string().into())
        }
        (Value::Str(s), Type::Slice(elem)) => match **elem {
            Type::Int(IntKind::Uint8) => Value::Slice(SliceValue::from_vec(
                Type::clone(elem),
                s.bytes()
                    .map(|b| Value::typed_int(IntKind::Uint8, i128::from(b)))
                    .collect(),
            )),
            Type::Int(IntKind::Int32) => Value::Slice(SliceValue::from_vec(
                Type::clone(elem),
                s.chars()
                    .map(|c| Value::typed_int(IntKind::Int32, i128::from(u32::from(c))))
                    .collect(),
            )),
            _ => return Err(fail(&value)),
        },
        (Value::Slice(s), Type::String) => match s.elem {
            Type::Int(IntKind::Uint8) => {
                let bytes: Vec<u8> = s
                    .to_vec()
                    .iter()
                    .filter_map(Value::as_int)
                    .map(|b| b as u8)
                    .collect();
                Value::Str(String::from_utf8_lossy(&bytes).into())
            }
            Type::Int(IntKind::Int32) => {
                let text: String = s
                    .to_vec()
                    .iter()
                    .filter_map(Value::as_int)
                    .map(|c| {
                        u32::try_from(c)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                    })
                    .collect();
                Value::Str(text.into())
            }
            _ => return Err(fail(&value)),
        },
        (Value::Str(_), Type::String) | (Value::Bool(_), Type::Bool) => value,
        _ => {
            let have = value.type_of();
            if have.assignable_to(to) || have.underlying().identical(&under) {
                retag(value.copied(), to)
            } else {
                return Err(fail(&value));
            }
        }
    })
}

/// Float to integer conversion truncates toward zero, then wraps.
fn float_to_int(v: f64, kind: IntKind) -> IntValue {
    // `as` saturates out-of-range values and maps NaN to 0
    IntValue::new(kind, v.trunc() as i128)
}

#[cfg(test)]
mod tests;
