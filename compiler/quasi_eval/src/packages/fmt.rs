//! The bundled `fmt` package.

use super::{signature, string_arg, Package};
use crate::errors::EvalError;
use crate::interpreter::Interpreter;
use crate::literal::{quote_rune, quote_string};
use crate::types::Type;
use crate::value::{Value, Values};
use smallvec::smallvec;
use std::fmt::Write;

pub(super) fn package() -> Package {
    let any = || Type::slice(Type::any());
    let written = || vec![Type::INT, Type::error()];
    Package::new("fmt", "fmt")
        .with_native("Sprint", signature(vec![any()], vec![Type::String], true), |_, args| {
            Ok(smallvec![Value::Str(sprint(&args).into())])
        })
        .with_native("Sprintln", signature(vec![any()], vec![Type::String], true), |_, args| {
            Ok(smallvec![Value::Str(sprintln(&args).into())])
        })
        .with_native(
            "Sprintf",
            signature(vec![Type::String, any()], vec![Type::String], true),
            |_, args| {
                let format = string_arg("Sprintf", &args, 0)?;
                Ok(smallvec![Value::Str(sprintf(&format, &args[1..]).into())])
            },
        )
        .with_native("Print", signature(vec![any()], written(), true), |interp, args| {
            write_out(interp, &sprint(&args))
        })
        .with_native("Println", signature(vec![any()], written(), true), |interp, args| {
            write_out(interp, &sprintln(&args))
        })
        .with_native(
            "Printf",
            signature(vec![Type::String, any()], written(), true),
            |interp, args| {
                let format = string_arg("Printf", &args, 0)?;
                write_out(interp, &sprintf(&format, &args[1..]))
            },
        )
}

fn write_out(interp: &mut Interpreter, text: &str) -> Result<Values, EvalError> {
    interp.print_handler().print(text);
    Ok(smallvec![Value::int(text.len() as i64), Value::Nil])
}

/// Operands in their default format; spaces separate operands when neither
/// side is a string.
pub fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let is_string = |v: &Value| matches!(v, Value::Str(_));
        if i > 0 && !is_string(arg) && !is_string(&args[i - 1]) {
            out.push(' ');
        }
        let _ = write!(out, "{arg}");
    }
    out
}

/// Operands separated by spaces, with a trailing newline.
pub fn sprintln(args: &[Value]) -> String {
    let mut out = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    out
}

#[derive(Default)]
struct Spec {
    minus: bool,
    plus: bool,
    zero: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// `Sprintf` with the common verbs: `%v %d %s %q %x %X %o %b %c %f %e %g %t
/// %T %p %%`, flags `-+#0`, width and precision.
pub fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                '#' => spec.sharp = true,
                ' ' => {}
                _ => break,
            }
            chars.next();
        }
        spec.width = read_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_number(&mut chars).unwrap_or(0));
        }
        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.get(next_arg) else {
            let _ = write!(out, "%!{verb}(MISSING)");
            continue;
        };
        next_arg += 1;
        let text = format_verb(verb, &spec, arg);
        pad(&mut out, &text, &spec, is_numeric(arg));
    }
    if next_arg < args.len() {
        out.push_str("%!(EXTRA ");
        for (i, arg) in args[next_arg..].iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={arg}", arg.type_of());
        }
        out.push(')');
    }
    out
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0) * 10 + d as usize);
        chars.next();
    }
    n
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Int(_) | Value::Float(_) | Value::Untyped(_))
}

fn pad(out: &mut String, text: &str, spec: &Spec, numeric: bool) {
    let len = text.chars().count();
    let Some(width) = spec.width.filter(|w| *w > len) else {
        out.push_str(text);
        return;
    };
    let fill = width - len;
    if spec.minus {
        out.push_str(text);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if spec.zero && numeric {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => match text.strip_prefix('+') {
                Some(rest) => ("+", rest),
                None => ("", text),
            },
        };
        out.push_str(sign);
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(text);
    }
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{verb}({}={arg})", arg.type_of())
}

fn format_verb(verb: char, spec: &Spec, arg: &Value) -> String {
    let arg = match arg {
        Value::Untyped(c) => c.default_value().unwrap_or_else(|_| arg.clone()),
        other => other.clone(),
    };
    match verb {
        'v' => match (&arg, spec.sharp) {
            (Value::Str(s), true) => quote_string(s),
            _ => with_sign(arg.to_string(), spec.plus, &arg),
        },
        'T' => arg.type_of().to_string(),
        't' => match &arg {
            Value::Bool(b) => b.to_string(),
            _ => bad_verb(verb, &arg),
        },
        'd' => match &arg {
            Value::Int(i) => with_sign(i.get().to_string(), spec.plus, &arg),
            _ => bad_verb(verb, &arg),
        },
        'b' | 'o' | 'x' | 'X' => integer_radix(verb, spec, &arg),
        'c' => match arg.as_int().and_then(|i| u32::try_from(i).ok()).and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => bad_verb(verb, &arg),
        },
        'q' => match &arg {
            Value::Str(s) => quote_string(s),
            Value::Int(i) => u32::try_from(i.get())
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| bad_verb(verb, &arg), quote_rune),
            _ => bad_verb(verb, &arg),
        },
        's' => match &arg {
            Value::Str(s) => match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.to_string(),
            },
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => bad_verb(verb, &arg),
            other => other.to_string(),
        },
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => float_verb(verb, spec, &arg),
        'p' => match &arg {
            Value::Pointer(p) => p
                .target
                .as_ref()
                .map_or_else(|| "0x0".to_string(), |t| format!("{:#x}", t.address())),
            Value::Func(f) => format!("{:#x}", f.address()),
            Value::Chan(c) => format!("{:#x}", c.id()),
            Value::Map(m) => format!("{:#x}", m.identity()),
            _ => bad_verb(verb, &arg),
        },
        _ => bad_verb(verb, &arg),
    }
}

fn with_sign(text: String, plus: bool, arg: &Value) -> String {
    if plus && is_numeric(arg) && !text.starts_with('-') {
        format!("+{text}")
    } else {
        text
    }
}

fn integer_radix(verb: char, spec: &Spec, arg: &Value) -> String {
    if let (Value::Str(s), 'x' | 'X') = (arg, verb) {
        let hex: String = s.bytes().map(|b| format!("{b:02x}")).collect();
        return if verb == 'X' { hex.to_uppercase() } else { hex };
    }
    let Value::Int(i) = arg else {
        return bad_verb(verb, arg);
    };
    let v = i.get();
    let magnitude = v.unsigned_abs();
    let (digits, prefix) = match verb {
        'b' => (format!("{magnitude:b}"), "0b"),
        'o' => (format!("{magnitude:o}"), "0"),
        'x' => (format!("{magnitude:x}"), "0x"),
        _ => (format!("{magnitude:X}"), "0X"),
    };
    let sign = if v < 0 { "-" } else { "" };
    let prefix = if spec.sharp { prefix } else { "" };
    format!("{sign}{prefix}{digits}")
}

fn float_verb(verb: char, spec: &Spec, arg: &Value) -> String {
    let (v, kind) = match arg {
        Value::Float(f) => (f.get(), f.kind()),
        _ => return bad_verb(verb, arg),
    };
    let text = match verb {
        'f' | 'F' => format!("{v:.*}", spec.precision.unwrap_or(6)),
        'e' | 'E' => {
            let text = exponent_form(v, spec.precision.unwrap_or(6));
            if verb == 'E' {
                text.to_uppercase()
            } else {
                text
            }
        }
        _ => match spec.precision {
            Some(p) => {
                let text = exponent_form(v, p.saturating_sub(1));
                let exp: i32 = text
                    .split_once('e')
                    .and_then(|(_, e)| e.parse().ok())
                    .unwrap_or(0);
                if exp < -4 || exp >= p as i32 {
                    text
                } else {
                    let decimals = (p as i32 - 1 - exp).max(0) as usize;
                    trim_zeros(&format!("{v:.decimals$}"))
                }
            }
            None => crate::value::format_float(v, kind),
        },
    };
    with_sign(text, spec.plus, arg)
}

/// `d.dddde±dd`
fn exponent_form(v: f64, precision: usize) -> String {
    let text = format!("{v:.precision$e}");
    let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

fn trim_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}
