//! Untyped constants.
//!
//! Integer constants are always arbitrary precision. Floating constants are
//! exact rationals under [`Precision::Exact`] (the compiled path) and `f64`
//! under [`Precision::Approx`] (the tree-walker). The two paths also differ in
//! how mixed kinds promote: exact promotion follows the language
//! (`int < rune < float < complex`, so `1+'A'` is a rune), approximate
//! promotion lets the wider runtime representation win (`int` over `rune`).
//!
//! A constant collapses to a fixed-width value only through
//! [`Constant::to_typed`], which checks that it is representable.

use super::scalar::{format_complex, format_float, ComplexValue, FloatValue, IntValue};
use super::Value;
use crate::errors::{division_by_zero, invalid_operation, type_mismatch, EvalError};
use crate::types::{FloatKind, Type, UntypedKind};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use quasi_ir::BinaryOp;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Largest constant shift count accepted.
const MAX_SHIFT: u64 = 10_000;

/// How floating constants are represented.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Precision {
    Exact,
    Approx,
}

/// A real number, exact or approximate.
#[derive(Clone, Debug)]
pub enum Real {
    Exact(BigRational),
    Approx(f64),
}

impl Real {
    pub fn from_int(i: &BigInt, precision: Precision) -> Real {
        match precision {
            Precision::Exact => Real::Exact(BigRational::from_integer(i.clone())),
            Precision::Approx => Real::Approx(i.to_f64().unwrap_or(f64::INFINITY)),
        }
    }

    pub fn zero(precision: Precision) -> Real {
        Real::from_int(&BigInt::zero(), precision)
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Real::Exact(r) => r.to_f64().unwrap_or(f64::NAN),
            Real::Approx(v) => *v,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Real::Exact(r) => r.is_zero(),
            Real::Approx(v) => *v == 0.0,
        }
    }

    /// The integer value, if this real has no fractional part.
    pub fn to_integer(&self) -> Option<BigInt> {
        match self {
            Real::Exact(r) => r.is_integer().then(|| r.to_integer()),
            Real::Approx(v) => {
                if v.is_finite() && v.fract() == 0.0 {
                    BigInt::from_f64(*v)
                } else {
                    None
                }
            }
        }
    }

    fn zip(
        &self,
        other: &Real,
        exact: impl FnOnce(&BigRational, &BigRational) -> BigRational,
        approx: impl FnOnce(f64, f64) -> f64,
    ) -> Real {
        match (self, other) {
            (Real::Exact(a), Real::Exact(b)) => Real::Exact(exact(a, b)),
            _ => Real::Approx(approx(self.to_f64(), other.to_f64())),
        }
    }

    #[must_use]
    pub fn add(&self, other: &Real) -> Real {
        self.zip(other, |a, b| a + b, |a, b| a + b)
    }

    #[must_use]
    pub fn sub(&self, other: &Real) -> Real {
        self.zip(other, |a, b| a - b, |a, b| a - b)
    }

    #[must_use]
    pub fn mul(&self, other: &Real) -> Real {
        self.zip(other, |a, b| a * b, |a, b| a * b)
    }

    /// Division; the caller rules out a zero divisor.
    #[must_use]
    pub fn quo(&self, other: &Real) -> Real {
        self.zip(other, |a, b| a / b, |a, b| a / b)
    }

    #[must_use]
    pub fn neg(&self) -> Real {
        match self {
            Real::Exact(r) => Real::Exact(-r),
            Real::Approx(v) => Real::Approx(-v),
        }
    }

    pub fn compare(&self, other: &Real) -> Option<Ordering> {
        match (self, other) {
            (Real::Exact(a), Real::Exact(b)) => Some(a.cmp(b)),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

/// An untyped constant.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Bool(bool),
    String(Arc<str>),
    Int(BigInt),
    Rune(BigInt),
    Float(Real),
    Complex(Real, Real),
}

impl Constant {
    pub fn int(v: i64) -> Constant {
        Constant::Int(BigInt::from(v))
    }

    pub fn kind(&self) -> UntypedKind {
        match self {
            Constant::Bool(_) => UntypedKind::Bool,
            Constant::String(_) => UntypedKind::String,
            Constant::Int(_) => UntypedKind::Int,
            Constant::Rune(_) => UntypedKind::Rune,
            Constant::Float(_) => UntypedKind::Float,
            Constant::Complex(..) => UntypedKind::Complex,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Constant::Bool(_) | Constant::String(_))
    }

    /// The exact integer value, if this constant is integral.
    pub fn to_integer(&self) -> Option<BigInt> {
        match self {
            Constant::Int(i) | Constant::Rune(i) => Some(i.clone()),
            Constant::Float(r) => r.to_integer(),
            Constant::Complex(re, im) if im.is_zero() => re.to_integer(),
            _ => None,
        }
    }

    pub fn to_real(&self, precision: Precision) -> Option<Real> {
        match self {
            Constant::Int(i) | Constant::Rune(i) => Some(Real::from_int(i, precision)),
            Constant::Float(r) => Some(r.clone()),
            Constant::Complex(re, im) if im.is_zero() => Some(re.clone()),
            _ => None,
        }
    }

    pub fn to_complex(&self, precision: Precision) -> Option<(Real, Real)> {
        match self {
            Constant::Complex(re, im) => Some((re.clone(), im.clone())),
            other => other.to_real(precision).map(|re| (re, Real::zero(precision))),
        }
    }

    /// Convert to the representation a constant of `precision` would have.
    #[must_use]
    pub fn with_precision(self, precision: Precision) -> Constant {
        let convert = |r: Real| match (r, precision) {
            (Real::Exact(q), Precision::Approx) => Real::Approx(q.to_f64().unwrap_or(f64::NAN)),
            (Real::Approx(v), Precision::Exact) => {
                BigRational::from_float(v).map_or(Real::Approx(v), Real::Exact)
            }
            (r, _) => r,
        };
        match self {
            Constant::Float(r) => Constant::Float(convert(r)),
            Constant::Complex(re, im) => Constant::Complex(convert(re), convert(im)),
            other => other,
        }
    }

    /// Binary operation between two untyped constants.
    pub fn binary(
        op: BinaryOp,
        x: &Constant,
        y: &Constant,
        precision: Precision,
    ) -> Result<Constant, EvalError> {
        match (x, y) {
            (Constant::Bool(a), Constant::Bool(b)) => match op {
                BinaryOp::LAnd => Ok(Constant::Bool(*a && *b)),
                BinaryOp::LOr => Ok(Constant::Bool(*a || *b)),
                BinaryOp::Eql => Ok(Constant::Bool(a == b)),
                BinaryOp::Neq => Ok(Constant::Bool(a != b)),
                _ => Err(undefined_on(op, UntypedKind::Bool)),
            },
            (Constant::String(a), Constant::String(b)) => match op {
                BinaryOp::Add => Ok(Constant::String(format!("{a}{b}").into())),
                _ if op.is_comparison() => Ok(Constant::Bool(ordering_holds(op, a.cmp(b)))),
                _ => Err(undefined_on(op, UntypedKind::String)),
            },
            _ if x.is_numeric() && y.is_numeric() => numeric_binary(op, x, y, precision),
            _ => Err(invalid_operation(format!(
                "{x} {} {y} (mismatched types {} and {})",
                op.as_symbol(),
                x.kind().name(),
                y.kind().name()
            ))),
        }
    }

    /// `x << count` or `x >> count` with an untyped left operand.
    pub fn shift(op: BinaryOp, x: &Constant, count: u64) -> Result<Constant, EvalError> {
        let Some(value) = x.to_integer() else {
            return Err(invalid_operation(format!(
                "shift of type {} (constant {x} truncated to integer)",
                x.kind().name()
            )));
        };
        if count > MAX_SHIFT {
            return Err(invalid_operation(format!("invalid shift count {count}")));
        }
        let shifted = if op == BinaryOp::Shl {
            value << count as usize
        } else {
            value >> count as usize
        };
        Ok(match x {
            Constant::Rune(_) => Constant::Rune(shifted),
            _ => Constant::Int(shifted),
        })
    }

    /// Unary `+`, `-`, `!` and `^`.
    pub fn unary(op: quasi_ir::UnaryOp, x: &Constant) -> Result<Constant, EvalError> {
        use quasi_ir::UnaryOp;
        let result = match (op, x) {
            (UnaryOp::Pos, c) if c.is_numeric() => Some(c.clone()),
            (UnaryOp::Neg, Constant::Int(i)) => Some(Constant::Int(-i)),
            (UnaryOp::Neg, Constant::Rune(i)) => Some(Constant::Rune(-i)),
            (UnaryOp::Neg, Constant::Float(r)) => Some(Constant::Float(r.neg())),
            (UnaryOp::Neg, Constant::Complex(re, im)) => Some(Constant::Complex(re.neg(), im.neg())),
            (UnaryOp::Not, Constant::Bool(b)) => Some(Constant::Bool(!b)),
            (UnaryOp::Xor, Constant::Int(i)) => Some(Constant::Int(-i - 1)),
            (UnaryOp::Xor, Constant::Rune(i)) => Some(Constant::Rune(-i - 1)),
            _ => None,
        };
        result.ok_or_else(|| {
            invalid_operation(format!(
                "operator {} not defined on {x} ({})",
                op.as_symbol(),
                x.kind().name()
            ))
        })
    }

    /// Collapse to a value of type `ty`.
    ///
    /// `explicit` marks a conversion `T(c)`, which additionally turns integer
    /// constants into strings.
    pub fn to_typed(&self, ty: &Type, explicit: bool) -> Result<Value, EvalError> {
        let under = ty.underlying();
        let fail = || {
            type_mismatch(format!(
                "cannot use {self} ({}) as {ty} value",
                self.kind().name()
            ))
        };
        match under {
            Type::Untyped(_) => Ok(Value::Untyped(self.clone())),
            Type::Interface(_) => self.to_typed(&self.kind().default_type(), explicit),
            Type::Bool => match self {
                Constant::Bool(b) => Ok(Value::Bool(*b)),
                _ => Err(fail()),
            },
            Type::String => match self {
                Constant::String(s) => Ok(Value::Str(s.clone())),
                Constant::Int(i) | Constant::Rune(i) if explicit => {
                    let c = i
                        .to_u32()
                        .and_then(char::from_u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    Ok(Value::Str(c.to_string().into()))
                }
                _ => Err(fail()),
            },
            Type::Int(kind) => {
                if !self.is_numeric() {
                    return Err(fail());
                }
                let Some(i) = self.to_integer() else {
                    return Err(type_mismatch(format!("constant {self} truncated to integer")));
                };
                match i.to_i128() {
                    Some(v) if v >= kind.min() && v <= kind.max() => {
                        Ok(Value::Int(IntValue::new(kind, v)))
                    }
                    _ => Err(type_mismatch(format!("constant {self} overflows {}", kind.name()))),
                }
            }
            Type::Float(kind) => match self.to_real(Precision::Exact) {
                Some(r) if self.is_numeric() => {
                    let v = r.to_f64();
                    if kind == FloatKind::F32 && v.is_finite() && (v as f32).is_infinite() {
                        return Err(type_mismatch(format!("constant {self} overflows float32")));
                    }
                    Ok(Value::Float(FloatValue::new(kind, v)))
                }
                _ => Err(fail()),
            },
            Type::Complex(kind) => match self.to_complex(Precision::Exact) {
                Some((re, im)) if self.is_numeric() => Ok(Value::Complex(ComplexValue::new(
                    kind,
                    re.to_f64(),
                    im.to_f64(),
                ))),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        }
    }

    /// The value this constant takes with its default type.
    pub fn default_value(&self) -> Result<Value, EvalError> {
        self.to_typed(&self.kind().default_type(), false)
    }
}

fn undefined_on(op: BinaryOp, kind: UntypedKind) -> EvalError {
    invalid_operation(format!(
        "operator {} not defined on {}",
        op.as_symbol(),
        kind.name()
    ))
}

/// Whether ordering `ord` satisfies comparison `op`.
pub fn ordering_holds(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::Eql => ord == Ordering::Equal,
        BinaryOp::Neq => ord != Ordering::Equal,
        BinaryOp::Lss => ord == Ordering::Less,
        BinaryOp::Leq => ord != Ordering::Greater,
        BinaryOp::Gtr => ord == Ordering::Greater,
        BinaryOp::Geq => ord != Ordering::Less,
        _ => false,
    }
}

/// Kind rank for promotion of mixed untyped operands.
fn rank(kind: UntypedKind, precision: Precision) -> u8 {
    match (kind, precision) {
        (UntypedKind::Int, Precision::Exact) | (UntypedKind::Rune, Precision::Approx) => 0,
        (UntypedKind::Rune, Precision::Exact) | (UntypedKind::Int, Precision::Approx) => 1,
        (UntypedKind::Float, _) => 2,
        _ => 3,
    }
}

fn numeric_binary(
    op: BinaryOp,
    x: &Constant,
    y: &Constant,
    precision: Precision,
) -> Result<Constant, EvalError> {
    let kind = if rank(x.kind(), precision) >= rank(y.kind(), precision) {
        x.kind()
    } else {
        y.kind()
    };
    match kind {
        UntypedKind::Int | UntypedKind::Rune => {
            // both operands are integers: only Int and Rune rank below Float
            let (Some(a), Some(b)) = (x.to_integer(), y.to_integer()) else {
                return Err(undefined_on(op, kind));
            };
            if op.is_comparison() {
                return Ok(Constant::Bool(ordering_holds(op, a.cmp(&b))));
            }
            let r = int_binary(op, &a, &b, kind)?;
            Ok(if kind == UntypedKind::Rune {
                Constant::Rune(r)
            } else {
                Constant::Int(r)
            })
        }
        UntypedKind::Float => {
            let (Some(a), Some(b)) = (x.to_real(precision), y.to_real(precision)) else {
                return Err(undefined_on(op, kind));
            };
            if op.is_comparison() {
                return match a.compare(&b) {
                    Some(ord) => Ok(Constant::Bool(ordering_holds(op, ord))),
                    None => Ok(Constant::Bool(op == BinaryOp::Neq)),
                };
            }
            let r = match op {
                BinaryOp::Add => a.add(&b),
                BinaryOp::Sub => a.sub(&b),
                BinaryOp::Mul => a.mul(&b),
                BinaryOp::Quo => {
                    if b.is_zero() {
                        return Err(division_by_zero());
                    }
                    a.quo(&b)
                }
                _ => return Err(undefined_on(op, kind)),
            };
            Ok(Constant::Float(r))
        }
        _ => {
            let (Some((a, b)), Some((c, d))) =
                (x.to_complex(precision), y.to_complex(precision))
            else {
                return Err(undefined_on(op, kind));
            };
            match op {
                BinaryOp::Eql => Ok(Constant::Bool(a == c && b == d)),
                BinaryOp::Neq => Ok(Constant::Bool(a != c || b != d)),
                BinaryOp::Add => Ok(Constant::Complex(a.add(&c), b.add(&d))),
                BinaryOp::Sub => Ok(Constant::Complex(a.sub(&c), b.sub(&d))),
                BinaryOp::Mul => Ok(Constant::Complex(
                    a.mul(&c).sub(&b.mul(&d)),
                    a.mul(&d).add(&b.mul(&c)),
                )),
                BinaryOp::Quo => {
                    let den = c.mul(&c).add(&d.mul(&d));
                    if den.is_zero() {
                        return Err(division_by_zero());
                    }
                    Ok(Constant::Complex(
                        a.mul(&c).add(&b.mul(&d)).quo(&den),
                        b.mul(&c).sub(&a.mul(&d)).quo(&den),
                    ))
                }
                _ => Err(undefined_on(op, kind)),
            }
        }
    }
}

fn int_binary(op: BinaryOp, a: &BigInt, b: &BigInt, kind: UntypedKind) -> Result<BigInt, EvalError> {
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Quo => {
            if b.is_zero() {
                return Err(division_by_zero());
            }
            a / b
        }
        BinaryOp::Rem => {
            if b.is_zero() {
                return Err(division_by_zero());
            }
            a % b
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::AndNot => a & (-b - 1),
        _ => return Err(undefined_on(op, kind)),
    })
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::String(s) => f.write_str(s),
            Constant::Int(i) | Constant::Rune(i) => write!(f, "{i}"),
            Constant::Float(r) => f.write_str(&format_float(r.to_f64(), FloatKind::F64)),
            Constant::Complex(re, im) => {
                f.write_str(&format_complex(re.to_f64(), im.to_f64(), FloatKind::F64))
            }
        }
    }
}
