//! Value-level operations shared by both evaluators.
//!
//! Everything here works on already-evaluated operands, so the tree-walker
//! and the compiled closures agree on indexing, slicing, field access,
//! channel operations and composite construction.

use crate::convert::assign_convert;
use crate::errors::{
    channel_closed, index_out_of_range, invalid_operation, slice_bounds, type_mismatch, EvalError,
};
use crate::types::{IntKind, Method, Type};
use crate::value::{
    ArrayValue, BoundMethod, ChanValue, FuncImpl, FunctionValue, MapValue, Place, PointerValue,
    SliceValue, StructValue, Value,
};
use quasi_ir::{ChanDir, Name};
use std::sync::Arc;

/// Checked conversion of an index operand against `len`.
fn checked_index(index: &Value, len: usize) -> Result<usize, EvalError> {
    let Some(i) = index.as_int() else {
        return Err(type_mismatch(format!(
            "invalid argument: index {index} (type {}) must be integer",
            index.type_of()
        )));
    };
    match usize::try_from(i) {
        Ok(u) if u < len => Ok(u),
        _ => Err(index_out_of_range(i, len)),
    }
}

/// The array behind a pointer-to-array operand.
fn deref_array(p: &PointerValue) -> Result<ArrayValue, EvalError> {
    match p.target.as_ref().map(Place::load) {
        Some(Value::Array(a)) => Ok(a),
        Some(_) => Err(invalid_operation(format!("cannot index pointer to {}", p.elem))),
        None => Err(nil_dereference()),
    }
}

#[cold]
pub(crate) fn nil_dereference() -> EvalError {
    invalid_operation("invalid memory address or nil pointer dereference")
}

/// `x[i]`
pub(crate) fn index(container: &Value, idx: Value) -> Result<Value, EvalError> {
    match container {
        Value::Slice(s) => {
            let i = checked_index(&idx, s.len())?;
            s.get(i).ok_or_else(|| index_out_of_range(i as i128, s.len()))
        }
        Value::Array(a) => {
            let i = checked_index(&idx, a.len())?;
            a.get(i).ok_or_else(|| index_out_of_range(i as i128, a.len()))
        }
        Value::Pointer(p) => index(&Value::Array(deref_array(p)?), idx),
        Value::Str(s) | Value::Untyped(crate::value::Constant::String(s)) => {
            let i = checked_index(&idx, s.len())?;
            Ok(Value::typed_int(IntKind::Uint8, i128::from(s.as_bytes()[i])))
        }
        Value::Map(m) => map_lookup(m, idx).map(|(v, _)| v),
        other => Err(invalid_operation(format!(
            "cannot index {other} (type {})",
            other.type_of()
        ))),
    }
}

/// `m[k]` in comma-ok form.
pub(crate) fn map_lookup(m: &MapValue, key: Value) -> Result<(Value, bool), EvalError> {
    let key = assign_convert(key, &m.key)?;
    Ok(match m.get(&key)? {
        Some(v) => (v, true),
        None => (Value::zero(&m.value), false),
    })
}

/// The storage location `x[i]` designates, for slices and arrays.
pub(crate) fn element_place(container: &Value, idx: &Value) -> Result<Place, EvalError> {
    match container {
        Value::Slice(s) => {
            let i = checked_index(idx, s.len())?;
            s.place(i).ok_or_else(|| index_out_of_range(i as i128, s.len()))
        }
        Value::Array(a) => {
            let i = checked_index(idx, a.len())?;
            Ok(Place::Cell(a.cells.clone(), i))
        }
        Value::Pointer(p) => element_place(&Value::Array(deref_array(p)?), idx),
        Value::Str(_) => Err(invalid_operation(format!(
            "cannot assign to {container}[{idx}] (neither addressable nor a map index expression)"
        ))),
        other => Err(invalid_operation(format!(
            "cannot index {other} (type {})",
            other.type_of()
        ))),
    }
}

/// Element type of an indexable container, for converting stores.
pub(crate) fn element_type(container: &Value) -> Type {
    match container {
        Value::Slice(s) => s.elem.clone(),
        Value::Array(a) => a.elem.clone(),
        Value::Map(m) => m.value.clone(),
        Value::Pointer(p) => p.elem.elem().unwrap_or(Type::Invalid),
        _ => Type::Invalid,
    }
}

fn bound(v: Option<Value>, default: usize) -> Result<usize, EvalError> {
    match v {
        None => Ok(default),
        Some(v) => match v.as_int() {
            Some(i) => usize::try_from(i).map_err(|_| index_out_of_range(i, default)),
            None => Err(type_mismatch(format!(
                "invalid slice index {v} (type {})",
                v.type_of()
            ))),
        },
    }
}

/// `x[low:high]` and `x[low:high:max]`.
pub(crate) fn slice(
    x: &Value,
    low: Option<Value>,
    high: Option<Value>,
    max: Option<Value>,
) -> Result<Value, EvalError> {
    match x {
        Value::Slice(s) => {
            let low = bound(low, 0)?;
            let high = bound(high, s.len())?;
            let max = bound(max, s.cap())?;
            s.reslice(low, high, max).map(Value::Slice)
        }
        Value::Array(a) => {
            let len = a.len();
            let low = bound(low, 0)?;
            let high = bound(high, len)?;
            let max = bound(max, len)?;
            if low > high || high > max || max > len {
                return Err(slice_bounds(low, high, len));
            }
            Ok(Value::Slice(SliceValue::over(
                a.elem.clone(),
                a.cells.clone(),
                low,
                high,
                max,
            )))
        }
        Value::Pointer(p) => slice(&Value::Array(deref_array(p)?), low, high, max),
        Value::Str(s) | Value::Untyped(crate::value::Constant::String(s)) => {
            if max.is_some() {
                return Err(invalid_operation(format!("3-index slice of string {x}")));
            }
            let low = bound(low, 0)?;
            let high = bound(high, s.len())?;
            if low > high || high > s.len() {
                return Err(slice_bounds(low, high, s.len()));
            }
            let bytes = &s.as_bytes()[low..high];
            Ok(Value::Str(String::from_utf8_lossy(bytes).into()))
        }
        other => Err(invalid_operation(format!(
            "cannot slice {other} (type {})",
            other.type_of()
        ))),
    }
}

/// The struct behind a struct or pointer-to-struct value.
fn struct_of(v: &Value) -> Result<Option<StructValue>, EvalError> {
    match v {
        Value::Struct(s) => Ok(Some(s.clone())),
        Value::Pointer(p) => match p.target.as_ref().map(Place::load) {
            Some(Value::Struct(s)) => Ok(Some(s)),
            Some(_) => Ok(None),
            None if p.elem.struct_type().is_some() => Err(nil_dereference()),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Location of field `name` in `v`, searching embedded fields one level
/// deep when `v` has no direct field of that name.
pub(crate) fn field_place(v: &Value, name: Name) -> Result<Option<(Place, Type)>, EvalError> {
    let Some(s) = struct_of(v)? else {
        return Ok(None);
    };
    let Some(st) = s.ty.struct_type() else {
        return Ok(None);
    };
    if let Some(i) = st.field_index(name) {
        return Ok(Some((Place::Cell(s.fields.clone(), i), st.fields[i].ty.clone())));
    }
    for (i, f) in st.fields.iter().enumerate() {
        if f.embedded {
            let inner = s.field(i).unwrap_or(Value::None);
            if let Some(found) = field_place(&inner, name)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

/// The method `name` of `recv`'s dynamic type.
pub(crate) fn find_method(recv: &Value, name: Name) -> Option<Method> {
    recv.type_of().method(name)
}

/// Prepare the receiver argument for `method`: pointer methods need an
/// address, value methods get a copy.
pub(crate) fn method_receiver(
    method: &Method,
    recv: Value,
    place: Option<Place>,
) -> Result<Value, EvalError> {
    if method.pointer_recv {
        match recv {
            Value::Pointer(_) => Ok(recv),
            other => match place {
                Some(place) => Ok(Value::Pointer(PointerValue::new(other.type_of(), place))),
                None => Err(invalid_operation(format!(
                    "cannot call pointer method on {other}"
                ))),
            },
        }
    } else {
        match recv {
            Value::Pointer(p) => p
                .target
                .as_ref()
                .map(|t| t.load().copied())
                .ok_or_else(nil_dereference),
            other => Ok(other.copied()),
        }
    }
}

/// `x.M` used as a value: a function with the receiver bound.
pub(crate) fn bind_method(method: &Method, recv: Value) -> Value {
    let full = &method.func.ty;
    let ty = crate::types::FuncType::new(
        full.params.iter().skip(1).cloned().collect(),
        full.results.clone(),
        full.variadic,
    );
    Value::Func(FunctionValue::new(
        Arc::new(ty),
        FuncImpl::Bound(Arc::new(BoundMethod {
            recv,
            func: method.func.clone(),
        })),
    ))
}

/// Whether `v` is a value of `ty`, the test of type assertions and type
/// switch cases.
pub(crate) fn has_type(v: &Value, ty: &Type) -> bool {
    if matches!(v, Value::Nil) {
        return false;
    }
    match ty.interface_methods() {
        Some(iface) => v.type_of().implements(&iface),
        None => v.type_of().identical(ty),
    }
}

/// `x.(T)` in comma-ok form.
pub(crate) fn type_assert(v: &Value, ty: &Type) -> (Value, bool) {
    if has_type(v, ty) {
        (v.clone(), true)
    } else {
        (Value::zero(ty), false)
    }
}

/// Single-value `x.(T)`: a failed assertion is an error.
pub(crate) fn type_assert_strict(v: &Value, ty: &Type) -> Result<Value, EvalError> {
    if has_type(v, ty) {
        return Ok(v.clone());
    }
    Err(type_mismatch(match v {
        Value::Nil => format!("interface conversion: interface is nil, not {ty}"),
        other => format!(
            "interface conversion: interface {{}} is {}, not {ty}",
            other.type_of()
        ),
    }))
}

fn live_channel(v: &Value, op: &str) -> Result<ChanValue, EvalError> {
    match v {
        Value::Chan(c) if c.chan.is_some() => Ok(c.clone()),
        Value::Chan(_) => Err(channel_closed(format!("{op} on nil channel"))),
        other => Err(invalid_operation(format!(
            "invalid operation: cannot {op} {other} (type {})",
            other.type_of()
        ))),
    }
}

/// `<-ch`: the value and whether it was sent (false once closed and
/// drained).
pub(crate) fn receive(ch: &Value) -> Result<(Value, bool), EvalError> {
    let c = live_channel(ch, "receive")?;
    if c.dir == ChanDir::Send {
        return Err(invalid_operation(format!(
            "invalid operation: cannot receive from send-only channel {ch}"
        )));
    }
    let chan = c.chan.as_ref().ok_or_else(|| channel_closed("receive on nil channel"))?;
    Ok(match chan.recv() {
        Some(v) => (v, true),
        None => (Value::zero(&c.elem), false),
    })
}

/// `ch <- v`
pub(crate) fn send(ch: &Value, v: Value) -> Result<(), EvalError> {
    let c = live_channel(ch, "send")?;
    if c.dir == ChanDir::Recv {
        return Err(invalid_operation(format!(
            "invalid operation: cannot send to receive-only channel {ch}"
        )));
    }
    let v = assign_convert(v, &c.elem)?;
    let chan = c.chan.as_ref().ok_or_else(|| channel_closed("send on nil channel"))?;
    chan.send(v)
}

/// Channel and converted value for a send case of `select`.
pub(crate) fn send_operands(ch: &Value, v: Value) -> Result<(ChanValue, Value), EvalError> {
    let c = live_channel(ch, "send")?;
    let v = assign_convert(v, &c.elem)?;
    Ok((c, v))
}

/// Key of one composite literal element.
pub(crate) enum CompositeKey {
    None,
    Field(Name),
    Value(Value),
}

/// Build a composite literal of type `ty` from evaluated elements.
pub(crate) fn build_composite(
    ty: &Type,
    elts: Vec<(CompositeKey, Value)>,
) -> Result<Value, EvalError> {
    match ty.underlying() {
        Type::Struct(st) => {
            let mut fields: Vec<Value> = st.fields.iter().map(|f| Value::zero(&f.ty)).collect();
            let keyed = elts.iter().any(|(k, _)| matches!(k, CompositeKey::Field(_)));
            if !keyed && !elts.is_empty() && elts.len() != fields.len() {
                return Err(type_mismatch(format!("too few values in struct literal of type {ty}")));
            }
            for (i, (key, value)) in elts.into_iter().enumerate() {
                let index = match key {
                    CompositeKey::Field(name) => st.field_index(name).ok_or_else(|| {
                        type_mismatch(format!("unknown field {name} in struct literal of type {ty}"))
                    })?,
                    CompositeKey::None if !keyed => i,
                    _ => {
                        return Err(type_mismatch(
                            "mixture of field:value and value elements in struct literal",
                        ))
                    }
                };
                fields[index] = assign_convert(value, &st.fields[index].ty)?;
            }
            Ok(Value::Struct(StructValue::new(ty.clone(), fields)))
        }
        Type::Array(len, elem) => {
            let values = indexed_elements(&elem, elts, Some(len))?;
            Ok(Value::Array(ArrayValue::new(Type::clone(&elem), values)))
        }
        Type::Slice(elem) => {
            let values = indexed_elements(&elem, elts, None)?;
            Ok(Value::Slice(SliceValue::from_vec(Type::clone(&elem), values)))
        }
        Type::Map(key_ty, value_ty) => {
            let map = MapValue::new(Type::clone(&key_ty), Type::clone(&value_ty));
            for (key, value) in elts {
                let CompositeKey::Value(key) = key else {
                    return Err(type_mismatch(format!("missing key in map literal of type {ty}")));
                };
                let key = assign_convert(key, &key_ty)?;
                if map.get(&key)?.is_some() {
                    return Err(type_mismatch(format!("duplicate key {key} in map literal")));
                }
                map.insert(key, assign_convert(value, &value_ty)?)?;
            }
            Ok(Value::Map(map))
        }
        other => Err(type_mismatch(format!("invalid composite literal type {other}"))),
    }
}

/// Elements of an array or slice literal, honouring `index: value` keys.
fn indexed_elements(
    elem: &Type,
    elts: Vec<(CompositeKey, Value)>,
    fixed_len: Option<usize>,
) -> Result<Vec<Value>, EvalError> {
    let mut values: Vec<Option<Value>> = Vec::new();
    let mut next = 0usize;
    for (key, value) in elts {
        let index = match key {
            CompositeKey::None => next,
            CompositeKey::Value(k) => match k.as_int().and_then(|i| usize::try_from(i).ok()) {
                Some(i) => i,
                None => return Err(type_mismatch(format!("index {k} must be non-negative integer constant"))),
            },
            CompositeKey::Field(name) => {
                return Err(type_mismatch(format!("invalid field name {name} in literal")))
            }
        };
        if let Some(len) = fixed_len {
            if index >= len {
                return Err(index_out_of_range(index as i128, len));
            }
        }
        if values.len() <= index {
            values.resize(index + 1, None);
        }
        if values[index].is_some() {
            return Err(type_mismatch(format!("duplicate index {index} in array or slice literal")));
        }
        values[index] = Some(assign_convert(value, elem)?);
        next = index + 1;
    }
    let len = fixed_len.unwrap_or(values.len());
    let zero = Value::zero(elem);
    values.resize(len, None);
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or_else(|| zero.copied()))
        .collect())
}

/// Number of elements a `[...]T{...}` literal declares.
pub(crate) fn literal_length(keys: &[Option<usize>]) -> usize {
    let mut next = 0usize;
    let mut len = 0usize;
    for key in keys {
        let index = key.unwrap_or(next);
        next = index + 1;
        len = len.max(next);
    }
    len
}

/// Whether `value`, held in a location declared with `static_ty`, equals
/// `nil`. An interface holding a typed nil is not nil.
pub(crate) fn is_nil_in(static_ty: &Type, value: &Value) -> bool {
    if static_ty.is_interface() {
        matches!(value, Value::Nil)
    } else {
        value.is_nil()
    }
}
