//! Fixed-width scalars.
//!
//! Integers are stored as the low `width` bits of a `u64` plus their kind;
//! every operation wraps modulo 2^width. Floats are `f64` rounded to the
//! kind's precision after each operation.

use crate::errors::{division_by_zero, EvalError};
use crate::types::{ComplexKind, FloatKind, IntKind};
use std::cmp::Ordering;
use std::fmt;

#[inline]
const fn mask(kind: IntKind) -> u64 {
    match kind.bits() {
        64 => u64::MAX,
        w => (1u64 << w) - 1,
    }
}

/// A typed integer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct IntValue {
    kind: IntKind,
    bits: u64,
}

impl IntValue {
    /// Wrap `v` into `kind` (two's complement truncation).
    #[inline]
    pub fn new(kind: IntKind, v: i128) -> Self {
        Self::from_bits(kind, v as u64)
    }

    #[inline]
    pub fn from_bits(kind: IntKind, bits: u64) -> Self {
        IntValue {
            kind,
            bits: bits & mask(kind),
        }
    }

    #[inline]
    pub fn kind(self) -> IntKind {
        self.kind
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self.bits
    }

    /// Mathematical value.
    #[inline]
    pub fn get(self) -> i128 {
        if self.kind.is_signed() {
            let shift = 64 - self.kind.bits();
            i128::from(((self.bits << shift) as i64) >> shift)
        } else {
            i128::from(self.bits)
        }
    }

    /// Same mathematical value wrapped into another kind.
    #[inline]
    #[must_use]
    pub fn cast(self, kind: IntKind) -> Self {
        Self::new(kind, self.get())
    }

    #[must_use]
    pub fn add(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits.wrapping_add(rhs.bits))
    }

    #[must_use]
    pub fn sub(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits.wrapping_sub(rhs.bits))
    }

    #[must_use]
    pub fn mul(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits.wrapping_mul(rhs.bits))
    }

    /// Truncated division; `MinInt / -1` wraps to `MinInt`.
    pub fn quo(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.bits == 0 {
            return Err(division_by_zero());
        }
        Ok(Self::new(self.kind, self.get() / rhs.get()))
    }

    /// Remainder with the sign of the dividend.
    pub fn rem(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.bits == 0 {
            return Err(division_by_zero());
        }
        Ok(Self::new(self.kind, self.get() % rhs.get()))
    }

    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits & rhs.bits)
    }

    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits | rhs.bits)
    }

    #[must_use]
    pub fn xor(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits ^ rhs.bits)
    }

    #[must_use]
    pub fn and_not(self, rhs: Self) -> Self {
        Self::from_bits(self.kind, self.bits & !rhs.bits)
    }

    #[must_use]
    pub fn shl(self, count: u64) -> Self {
        if count >= 64 {
            Self::from_bits(self.kind, 0)
        } else {
            Self::from_bits(self.kind, self.bits << count)
        }
    }

    /// Arithmetic shift for signed kinds, logical for unsigned.
    #[must_use]
    pub fn shr(self, count: u64) -> Self {
        if self.kind.is_signed() {
            Self::new(self.kind, self.get() >> count.min(127))
        } else if count >= 64 {
            Self::from_bits(self.kind, 0)
        } else {
            Self::from_bits(self.kind, self.bits >> count)
        }
    }

    #[must_use]
    pub fn neg(self) -> Self {
        Self::from_bits(self.kind, self.bits.wrapping_neg())
    }

    /// Bitwise complement `^x`.
    #[must_use]
    pub fn not(self) -> Self {
        Self::from_bits(self.kind, !self.bits)
    }

    pub fn compare(self, rhs: Self) -> Ordering {
        self.get().cmp(&rhs.get())
    }
}

impl fmt::Display for IntValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A typed float.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FloatValue {
    kind: FloatKind,
    v: f64,
}

impl FloatValue {
    #[inline]
    pub fn new(kind: FloatKind, v: f64) -> Self {
        FloatValue {
            kind,
            v: kind.round(v),
        }
    }

    #[inline]
    pub fn kind(self) -> FloatKind {
        self.kind
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.v
    }

    /// Apply a binary operation and round the result to this kind.
    #[must_use]
    pub fn map2(self, rhs: Self, op: impl FnOnce(f64, f64) -> f64) -> Self {
        Self::new(self.kind, op(self.v, rhs.v))
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_float(self.v, self.kind))
    }
}

/// A typed complex number.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ComplexValue {
    kind: ComplexKind,
    re: f64,
    im: f64,
}

impl ComplexValue {
    #[inline]
    pub fn new(kind: ComplexKind, re: f64, im: f64) -> Self {
        let part = kind.part();
        ComplexValue {
            kind,
            re: part.round(re),
            im: part.round(im),
        }
    }

    #[inline]
    pub fn kind(self) -> ComplexKind {
        self.kind
    }

    #[inline]
    pub fn re(self) -> f64 {
        self.re
    }

    #[inline]
    pub fn im(self) -> f64 {
        self.im
    }

    #[must_use]
    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.kind, self.re + rhs.re, self.im + rhs.im)
    }

    #[must_use]
    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.kind, self.re - rhs.re, self.im - rhs.im)
    }

    #[must_use]
    pub fn mul(self, rhs: Self) -> Self {
        let (a, b, c, d) = (self.re, self.im, rhs.re, rhs.im);
        Self::new(self.kind, a * c - b * d, a * d + b * c)
    }

    #[must_use]
    pub fn quo(self, rhs: Self) -> Self {
        let (a, b, c, d) = (self.re, self.im, rhs.re, rhs.im);
        let den = c * c + d * d;
        Self::new(self.kind, (a * c + b * d) / den, (b * c - a * d) / den)
    }

    #[must_use]
    pub fn neg(self) -> Self {
        Self::new(self.kind, -self.re, -self.im)
    }
}

impl fmt::Display for ComplexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_complex(self.re, self.im, self.kind.part()))
    }
}

/// Shortest `%v` rendering of a float: fixed notation for decimal exponents
/// in `-4..6`, otherwise `d.ddde+XX`.
pub fn format_float(v: f64, kind: FloatKind) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let sci = match kind {
        FloatKind::F32 => format!("{:e}", v as f32),
        FloatKind::F64 => format!("{v:e}"),
    };
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..6).contains(&exp) {
        return match kind {
            FloatKind::F32 => format!("{}", v as f32),
            FloatKind::F64 => format!("{v}"),
        };
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

/// `(re+imi)` with an explicit sign on the imaginary part.
pub fn format_complex(re: f64, im: f64, part: FloatKind) -> String {
    let im_text = format_float(im, part);
    let sign = if im_text.starts_with('-') || im_text.starts_with('+') {
        ""
    } else {
        "+"
    };
    format!("({}{sign}{im_text}i)", format_float(re, part))
}
