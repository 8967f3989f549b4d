use super::*;
use crate::errors::EvalErrorKind;
use crate::types::{ComplexKind, FloatKind, IntKind, Type};
use crate::value::{Constant, Value};
use pretty_assertions::assert_eq;

fn untyped(v: i64) -> Value {
    Value::Untyped(Constant::int(v))
}

#[test]
fn untyped_constant_collapses_to_target() {
    let v = assign_convert(untyped(7), &Type::Int(IntKind::Uint8)).unwrap();
    assert_eq!(v, Value::typed_int(IntKind::Uint8, 7));
}

#[test]
fn overflowing_constant_is_rejected() {
    let err = assign_convert(untyped(256), &Type::Int(IntKind::Uint8)).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
    assert_eq!(err.message, "constant 256 overflows uint8");
}

#[test]
fn nil_becomes_typed_nil() {
    let ty = Type::slice(Type::Int(IntKind::Uint8));
    let v = assign_convert(Value::Nil, &ty).unwrap();
    assert!(v.is_nil());
    assert_eq!(v.type_of(), ty);
    assert!(assign_convert(Value::Nil, &Type::INT).is_err());
}

#[test]
fn interface_keeps_dynamic_value() {
    let v = assign_convert(untyped(1), &Type::any()).unwrap();
    assert_eq!(v, Value::int(1));
    let v = assign_convert(Value::Nil, &Type::any()).unwrap();
    assert_eq!(v, Value::Nil);
}

#[test]
fn error_interface_requires_method() {
    let err = assign_convert(Value::int(1), &Type::error()).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
}

#[test]
fn typed_mismatch_is_rejected() {
    let err = assign_convert(Value::string("x"), &Type::INT).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
}

#[test]
fn integer_conversion_wraps() {
    let v = convert(Value::int(300), &Type::Int(IntKind::Uint8)).unwrap();
    assert_eq!(v, Value::typed_int(IntKind::Uint8, 44));
    let v = convert(Value::typed_int(IntKind::Int8, -1), &Type::Int(IntKind::Uint16)).unwrap();
    assert_eq!(v, Value::typed_int(IntKind::Uint16, 65535));
}

#[test]
fn float_conversion_truncates() {
    let v = convert(Value::float64(-2.75), &Type::INT).unwrap();
    assert_eq!(v, Value::int(-2));
    let v = convert(Value::int(3), &Type::Float(FloatKind::F32)).unwrap();
    assert_eq!(v, Value::float32(3.0));
}

#[test]
fn constant_conversions() {
    let v = convert(untyped(65), &Type::String).unwrap();
    assert_eq!(v, Value::string("A"));
    let v = convert(untyped(64), &Type::Int(IntKind::Int8)).unwrap();
    assert_eq!(v, Value::typed_int(IntKind::Int8, 64));
    let v = convert(untyped(2), &Type::Complex(ComplexKind::C64)).unwrap();
    assert_eq!(v, Value::complex(ComplexKind::C64, 2.0, 0.0));
}

#[test]
fn string_byte_and_rune_slices() {
    let bytes = convert(Value::string("hé"), &Type::slice(Type::Int(IntKind::Uint8))).unwrap();
    match &bytes {
        Value::Slice(s) => assert_eq!(s.len(), 3),
        other => panic!("expected slice, got {other:?}"),
    }
    assert_eq!(convert(bytes, &Type::String).unwrap(), Value::string("hé"));

    let runes = convert(Value::string("hé"), &Type::slice(Type::Int(IntKind::Int32))).unwrap();
    match &runes {
        Value::Slice(s) => assert_eq!(s.len(), 2),
        other => panic!("expected slice, got {other:?}"),
    }
    assert_eq!(convert(runes, &Type::String).unwrap(), Value::string("hé"));
}
