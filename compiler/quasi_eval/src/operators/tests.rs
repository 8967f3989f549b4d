use super::*;
use crate::errors::EvalErrorKind;
use crate::types::{FloatKind, IntKind};
use crate::value::{Constant, Precision, Value};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quasi_ir::BinaryOp;

fn untyped(v: i64) -> Value {
    Value::Untyped(Constant::int(v))
}

fn rune(c: char) -> Value {
    Value::Untyped(Constant::Rune(BigInt::from(u32::from(c))))
}

fn eval(op: BinaryOp, l: Value, r: Value) -> Value {
    evaluate_binary(op, l, r, Precision::Approx).unwrap()
}

#[test]
fn typed_integers_wrap() {
    let v = eval(BinaryOp::Add, Value::typed_int(IntKind::Int8, 64), untyped(64));
    assert_eq!(v, Value::typed_int(IntKind::Int8, -128));
    let v = eval(BinaryOp::Add, Value::typed_int(IntKind::Uint8, 2), untyped(255));
    assert_eq!(v, Value::typed_int(IntKind::Uint8, 1));
}

#[test]
fn rune_promotion_depends_on_precision() {
    let approx = evaluate_binary(BinaryOp::Add, untyped(1), rune('A'), Precision::Approx).unwrap();
    assert_eq!(approx.defaulted().unwrap(), Value::int(66));
    let exact = evaluate_binary(BinaryOp::Add, untyped(1), rune('A'), Precision::Exact).unwrap();
    assert_eq!(exact.defaulted().unwrap(), Value::typed_int(IntKind::Int32, 66));
}

#[test]
fn untyped_integer_division_truncates() {
    assert_eq!(eval(BinaryOp::Quo, untyped(1), untyped(2)), untyped(0));
}

#[test]
fn integer_division_by_zero() {
    let err = evaluate_binary(BinaryOp::Quo, Value::int(1), Value::int(0), Precision::Approx)
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    let err = evaluate_binary(BinaryOp::Rem, untyped(1), untyped(0), Precision::Exact).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
}

#[test]
fn float32_rounds_each_operation() {
    let v = eval(BinaryOp::Quo, untyped(1), Value::float32(0.123_456_79));
    assert_eq!(v, Value::float32(1.0 / 0.123_456_79_f32));
    assert_eq!(v.type_of(), crate::types::Type::Float(FloatKind::F32));
}

#[test]
fn shifts() {
    let v2 = Value::typed_int(IntKind::Uint8, 7);
    assert_eq!(eval(BinaryOp::Shl, v2.clone(), untyped(3)), Value::typed_int(IntKind::Uint8, 56));
    assert_eq!(eval(BinaryOp::Shl, untyped(0xff), v2.clone()), Value::int(0xff << 7));
    let v3 = Value::typed_int(IntKind::Uint16, 12);
    assert_eq!(eval(BinaryOp::Shl, v3, untyped(13)), Value::typed_int(IntKind::Uint16, 32768));
    assert_eq!(eval(BinaryOp::Shl, untyped(7), untyped(8)), untyped(7 << 8));
}

#[test]
fn float_constant_shift_when_integral() {
    let two = Value::Untyped(Constant::Float(crate::value::Real::Approx(2.0)));
    assert_eq!(eval(BinaryOp::Shr, two, untyped(1)).defaulted().unwrap(), Value::int(1));
}

#[test]
fn negative_shift_count_fails() {
    assert!(evaluate_binary(BinaryOp::Shl, Value::int(1), Value::int(-1), Precision::Approx).is_err());
}

#[test]
fn string_operators() {
    let v = eval(BinaryOp::Add, Value::string("8y57r"), Value::Untyped(Constant::String("iuh".into())));
    assert_eq!(v, Value::string("8y57riuh"));
    assert_eq!(eval(BinaryOp::Lss, Value::string(""), Value::string("a")), Value::Bool(true));
}

#[test]
fn nil_comparisons() {
    let nil_slice = Value::zero(&crate::types::Type::slice(crate::types::Type::INT));
    assert_eq!(eval(BinaryOp::Eql, nil_slice, Value::Nil), Value::Bool(true));
    assert_eq!(eval(BinaryOp::Neq, Value::int(1), Value::Nil), Value::Bool(true));
    assert_eq!(eval(BinaryOp::Eql, Value::Nil, Value::Nil), Value::Bool(true));
}

#[test]
fn mismatched_dynamic_types_are_unequal() {
    let v = eval(BinaryOp::Eql, Value::int(1), Value::string("1"));
    assert_eq!(v, Value::Bool(false));
    assert!(evaluate_binary(BinaryOp::Add, Value::int(1), Value::string("1"), Precision::Approx).is_err());
}

#[test]
fn slices_compare_only_to_nil() {
    let ty = crate::types::Type::INT;
    let a = Value::Slice(crate::value::SliceValue::from_vec(ty.clone(), vec![Value::int(1)]));
    let b = Value::Slice(crate::value::SliceValue::from_vec(ty, vec![Value::int(1)]));
    assert!(evaluate_binary(BinaryOp::Eql, a, b, Precision::Approx).is_err());
}

proptest! {
    #[test]
    fn int8_addition_wraps_like_twos_complement(a in any::<i8>(), b in any::<i8>()) {
        let v = eval(
            BinaryOp::Add,
            Value::typed_int(IntKind::Int8, i128::from(a)),
            Value::typed_int(IntKind::Int8, i128::from(b)),
        );
        prop_assert_eq!(v, Value::typed_int(IntKind::Int8, i128::from(a.wrapping_add(b))));
    }

    #[test]
    fn uint16_multiplication_wraps(a in any::<u16>(), b in any::<u16>()) {
        let v = eval(
            BinaryOp::Mul,
            Value::typed_int(IntKind::Uint16, i128::from(a)),
            Value::typed_int(IntKind::Uint16, i128::from(b)),
        );
        prop_assert_eq!(v, Value::typed_int(IntKind::Uint16, i128::from(a.wrapping_mul(b))));
    }

    #[test]
    fn int64_subtraction_wraps(a in any::<i64>(), b in any::<i64>()) {
        let v = eval(
            BinaryOp::Sub,
            Value::typed_int(IntKind::Int64, i128::from(a)),
            Value::typed_int(IntKind::Int64, i128::from(b)),
        );
        prop_assert_eq!(v, Value::typed_int(IntKind::Int64, i128::from(a.wrapping_sub(b))));
    }
}
