//! Basic literal decoding.
//!
//! Turns the raw text the lexer kept for each literal into an untyped
//! [`Constant`]. Float and imaginary literals are decoded as exact rationals
//! or as `f64` depending on the requested [`Precision`].

use crate::errors::{invalid_operation, EvalError};
use crate::value::{Constant, Precision, Real};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Num, ToPrimitive, Zero};
use quasi_ir::LitKind;

/// Decode a literal of `kind` from its source text.
pub fn decode(kind: LitKind, raw: &str, precision: Precision) -> Result<Constant, EvalError> {
    match kind {
        LitKind::Int => parse_int(raw).map(Constant::Int),
        LitKind::Float => parse_float(raw, precision).map(Constant::Float),
        LitKind::Imag => {
            let body = raw.strip_suffix('i').unwrap_or(raw);
            let im = if looks_like_float(body) {
                parse_float(body, precision)?
            } else {
                // legacy form: `0123i` is decimal
                let digits: String = body.chars().filter(|c| *c != '_').collect();
                let is_prefixed = digits.starts_with("0x") || digits.starts_with("0X")
                    || digits.starts_with("0b") || digits.starts_with("0B")
                    || digits.starts_with("0o") || digits.starts_with("0O");
                let value = if is_prefixed {
                    parse_int(&digits)?
                } else {
                    BigInt::from_str_radix(&digits, 10).map_err(|_| bad_literal(raw))?
                };
                Real::from_int(&value, precision)
            };
            Ok(Constant::Complex(Real::zero(precision), im))
        }
        LitKind::Char => {
            let inner = raw
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .ok_or_else(|| bad_literal(raw))?;
            let chars = unescape(inner, '\'')?;
            match chars.as_slice() {
                [c] => Ok(Constant::Rune(BigInt::from(u32::from(*c)))),
                _ => Err(bad_literal(raw)),
            }
        }
        LitKind::String => {
            if let Some(inner) = raw.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
                return Ok(Constant::String(inner.replace('\r', "").into()));
            }
            let inner = raw
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .ok_or_else(|| bad_literal(raw))?;
            let s: String = unescape(inner, '"')?.into_iter().collect();
            Ok(Constant::String(s.into()))
        }
    }
}

#[cold]
fn bad_literal(raw: &str) -> EvalError {
    invalid_operation(format!("malformed literal {raw}"))
}

fn looks_like_float(text: &str) -> bool {
    let hex = text.starts_with("0x") || text.starts_with("0X");
    if hex {
        text.contains(['.', 'p', 'P'])
    } else {
        text.contains(['.', 'e', 'E'])
    }
}

fn parse_int(raw: &str) -> Result<BigInt, EvalError> {
    let text: String = raw.chars().filter(|c| *c != '_').collect();
    let (digits, radix) = if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        (rest, 2)
    } else if let Some(rest) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        (rest, 8)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text.as_str(), 10)
    };
    BigInt::from_str_radix(digits, radix).map_err(|_| bad_literal(raw))
}

fn parse_float(raw: &str, precision: Precision) -> Result<Real, EvalError> {
    let text: String = raw.chars().filter(|c| *c != '_').collect();
    if text.starts_with("0x") || text.starts_with("0X") {
        let exact = parse_hex_float(&text[2..]).ok_or_else(|| bad_literal(raw))?;
        return Ok(match precision {
            Precision::Exact => Real::Exact(exact),
            Precision::Approx => Real::Approx(exact.to_f64().unwrap_or(f64::NAN)),
        });
    }
    match precision {
        Precision::Approx => text
            .parse::<f64>()
            .map(Real::Approx)
            .map_err(|_| bad_literal(raw)),
        Precision::Exact => parse_decimal(&text).map(Real::Exact).ok_or_else(|| bad_literal(raw)),
    }
}

/// Exact value of a decimal float literal `digits[.digits][e[+-]digits]`.
fn parse_decimal(text: &str) -> Option<BigRational> {
    let (mantissa, exp) = match text.find(['e', 'E']) {
        Some(i) => (&text[..i], text[i + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int_part}{frac_part}");
    let digits = if digits.is_empty() { "0" } else { &digits };
    let numer = BigInt::from_str_radix(digits, 10).ok()?;
    let scale = exp - i64::try_from(frac_part.len()).ok()?;
    Some(scale_pow(BigRational::from_integer(numer), 10, scale))
}

/// Exact value of a hexadecimal float mantissa `h[.h]p[+-]d`.
fn parse_hex_float(text: &str) -> Option<BigRational> {
    let (mantissa, exp) = match text.find(['p', 'P']) {
        Some(i) => (&text[..i], text[i + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int_part}{frac_part}");
    let numer = BigInt::from_str_radix(if digits.is_empty() { "0" } else { &digits }, 16).ok()?;
    let scale = exp - 4 * i64::try_from(frac_part.len()).ok()?;
    Some(scale_pow(BigRational::from_integer(numer), 2, scale))
}

fn scale_pow(value: BigRational, base: u32, exp: i64) -> BigRational {
    if value.is_zero() || exp == 0 {
        return value;
    }
    let factor = num_traits::pow(BigInt::from(base), exp.unsigned_abs() as usize);
    if exp > 0 {
        value * BigRational::from_integer(factor)
    } else {
        value / BigRational::from_integer(factor)
    }
}

/// Decode the escapes of a quoted literal body.
pub fn unescape(body: &str, quote: char) -> Result<Vec<char>, EvalError> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err(bad_literal(body));
        };
        let decoded = match esc {
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{b}',
            '\\' => '\\',
            c if c == quote => c,
            'x' | 'u' | 'U' => {
                let len = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.by_ref().take(len).collect();
                let code = u32::from_str_radix(&hex, 16).map_err(|_| bad_literal(body))?;
                // strings are UTF-8, so `\xNN` above 0x7f decodes as U+00NN
                char::from_u32(code).ok_or_else(|| bad_literal(body))?
            }
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    let d = chars.next().and_then(|c| c.to_digit(8)).ok_or_else(|| bad_literal(body))?;
                    code = code * 8 + d;
                }
                char::from_u32(code).ok_or_else(|| bad_literal(body))?
            }
            _ => return Err(bad_literal(body)),
        };
        out.push(decoded);
    }
    Ok(out)
}

/// Render a string as a double-quoted literal.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a rune as a single-quoted literal.
pub fn quote_rune(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        c if c.is_control() => format!("'\\x{:02x}'", u32::from(c)),
        c => format!("'{c}'"),
    }
}

#[cfg(test)]
mod tests;
