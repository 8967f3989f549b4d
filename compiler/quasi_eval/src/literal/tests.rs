use super::*;
use crate::value::{Constant, Precision, Real};
use num_bigint::BigInt;
use num_rational::BigRational;
use pretty_assertions::assert_eq;
use quasi_ir::LitKind;

fn int(raw: &str) -> Constant {
    decode(LitKind::Int, raw, Precision::Exact).unwrap()
}

#[test]
fn integer_bases() {
    assert_eq!(int("42"), Constant::int(42));
    assert_eq!(int("0x1f"), Constant::int(31));
    assert_eq!(int("0b101"), Constant::int(5));
    assert_eq!(int("0o17"), Constant::int(15));
    assert_eq!(int("017"), Constant::int(15));
    assert_eq!(int("1_000"), Constant::int(1000));
    assert_eq!(int("0"), Constant::int(0));
}

#[test]
fn big_integers_stay_exact() {
    let c = int("123456789012345678901234567890");
    assert_eq!(
        c,
        Constant::Int("123456789012345678901234567890".parse::<BigInt>().unwrap())
    );
}

#[test]
fn floats_by_precision() {
    let exact = decode(LitKind::Float, "0.1", Precision::Exact).unwrap();
    assert_eq!(
        exact,
        Constant::Float(Real::Exact(BigRational::new(1.into(), 10.into())))
    );
    let approx = decode(LitKind::Float, "0.1", Precision::Approx).unwrap();
    assert!(matches!(approx, Constant::Float(Real::Approx(v)) if v == 0.1));
    let sci = decode(LitKind::Float, "1.5e3", Precision::Exact).unwrap();
    assert_eq!(sci, Constant::Float(Real::Exact(BigRational::from_integer(1500.into()))));
    let hex = decode(LitKind::Float, "0x1p-2", Precision::Exact).unwrap();
    assert_eq!(hex, Constant::Float(Real::Exact(BigRational::new(1.into(), 4.into()))));
}

#[test]
fn imaginary_literals() {
    let c = decode(LitKind::Imag, "7i", Precision::Exact).unwrap();
    assert_eq!(c, Constant::Complex(Real::zero(Precision::Exact), Real::from_int(&7.into(), Precision::Exact)));
    let c = decode(LitKind::Imag, "1.75i", Precision::Approx).unwrap();
    assert!(matches!(c, Constant::Complex(_, Real::Approx(v)) if v == 1.75));
}

#[test]
fn runes_and_strings() {
    assert_eq!(
        decode(LitKind::Char, "'A'", Precision::Exact).unwrap(),
        Constant::Rune(65.into())
    );
    assert_eq!(
        decode(LitKind::Char, r"'\n'", Precision::Exact).unwrap(),
        Constant::Rune(10.into())
    );
    assert_eq!(
        decode(LitKind::Char, r"'é'", Precision::Exact).unwrap(),
        Constant::Rune(0xe9.into())
    );
    assert_eq!(
        decode(LitKind::String, r#""a\tb\"c""#, Precision::Exact).unwrap(),
        Constant::String("a\tb\"c".into())
    );
    assert_eq!(
        decode(LitKind::String, "`raw\\n`", Precision::Exact).unwrap(),
        Constant::String("raw\\n".into())
    );
    assert_eq!(
        decode(LitKind::String, r#""\101""#, Precision::Exact).unwrap(),
        Constant::String("A".into())
    );
}

#[test]
fn malformed_literals_fail() {
    assert!(decode(LitKind::Char, "'ab'", Precision::Exact).is_err());
    assert!(decode(LitKind::String, r#""\q""#, Precision::Exact).is_err());
}

#[test]
fn quoting_round_trips_through_unescape() {
    let s = "tab\there \"quoted\" back\\slash";
    let quoted = quote_string(s);
    let inner = &quoted[1..quoted.len() - 1];
    let back: String = unescape(inner, '"').unwrap().into_iter().collect();
    assert_eq!(back, s);
    assert_eq!(quote_rune('\''), r"'\''");
    assert_eq!(quote_rune('x'), "'x'");
}
