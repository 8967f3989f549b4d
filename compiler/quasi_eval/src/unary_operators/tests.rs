use super::*;
use crate::types::{ComplexKind, IntKind};
use crate::value::Constant;
use pretty_assertions::assert_eq;

#[test]
fn typed_unary_chains_wrap() {
    // +-^v2 with v2 = uint8(7)
    let v = evaluate_unary(UnaryOp::Xor, Value::typed_int(IntKind::Uint8, 7)).unwrap();
    let v = evaluate_unary(UnaryOp::Neg, v).unwrap();
    let v = evaluate_unary(UnaryOp::Pos, v).unwrap();
    assert_eq!(v, Value::typed_int(IntKind::Uint8, 8));

    // +^-v3 with v3 = uint16(12)
    let v = evaluate_unary(UnaryOp::Neg, Value::typed_int(IntKind::Uint16, 12)).unwrap();
    let v = evaluate_unary(UnaryOp::Xor, v).unwrap();
    assert_eq!(v, Value::typed_int(IntKind::Uint16, 11));
}

#[test]
fn untyped_unary_is_exact() {
    let v = evaluate_unary(UnaryOp::Xor, Value::Untyped(Constant::int(6))).unwrap();
    let v = evaluate_unary(UnaryOp::Pos, v).unwrap();
    let v = evaluate_unary(UnaryOp::Neg, v).unwrap();
    assert_eq!(v, Value::Untyped(Constant::int(7)));
}

#[test]
fn negate_complex64() {
    let v = evaluate_unary(UnaryOp::Neg, Value::complex(ComplexKind::C64, 0.0, 2.5)).unwrap();
    assert_eq!(v, Value::complex(ComplexKind::C64, -0.0, -2.5));
}

#[test]
fn not_on_bool_only() {
    assert_eq!(evaluate_unary(UnaryOp::Not, Value::Bool(false)).unwrap(), Value::Bool(true));
    assert!(evaluate_unary(UnaryOp::Not, Value::int(1)).is_err());
    assert!(evaluate_unary(UnaryOp::Neg, Value::string("x")).is_err());
}
