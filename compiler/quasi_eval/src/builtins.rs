//! Predeclared functions.
//!
//! Builtins are bound in the universe scope like any other function value
//! and receive already-evaluated arguments; type arguments (`make([]int, 3)`,
//! `new(T)`) arrive as `Value::Type`. Both evaluators call [`call_builtin`].

use crate::convert::assign_convert;
use crate::environment::Environment;
use crate::errors::{
    arity_mismatch, channel_closed, invalid_operation, type_mismatch, ControlAction, EvalError,
    EvalResult,
};
use crate::interpreter::Interpreter;
use crate::operators::compare_ordered;
use crate::types::{ComplexKind, FloatKind, IntKind, Type};
use crate::value::{
    ChanValue, ComplexValue, Constant, FloatValue, MapValue, Place, PointerValue, SliceValue,
    Slot, Value, Values,
};
use quasi_ir::BinaryOp;
use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;

/// A predeclared function.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Builtin {
    Append,
    Cap,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
    /// `Eval(x)`: evaluate a syntax value in the calling scope.
    Eval,
    /// `Values(xs...)`: return the arguments as multiple results.
    Values,
    /// `MacroExpand(x)`: expand until no macro call remains at the root.
    MacroExpand,
    /// `MacroExpand1(x)`: one expansion step at the root.
    MacroExpand1,
}

impl Builtin {
    pub const ALL: [Builtin; 21] = [
        Builtin::Append,
        Builtin::Cap,
        Builtin::Close,
        Builtin::Complex,
        Builtin::Copy,
        Builtin::Delete,
        Builtin::Imag,
        Builtin::Len,
        Builtin::Make,
        Builtin::Max,
        Builtin::Min,
        Builtin::New,
        Builtin::Panic,
        Builtin::Print,
        Builtin::Println,
        Builtin::Real,
        Builtin::Recover,
        Builtin::Eval,
        Builtin::Values,
        Builtin::MacroExpand,
        Builtin::MacroExpand1,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Close => "close",
            Builtin::Complex => "complex",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Imag => "imag",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Real => "real",
            Builtin::Recover => "recover",
            Builtin::Eval => "Eval",
            Builtin::Values => "Values",
            Builtin::MacroExpand => "MacroExpand",
            Builtin::MacroExpand1 => "MacroExpand1",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Whether a lone multi-valued call argument spreads into this
    /// builtin's parameters (`Values(f())`, `println(f())`). Every other
    /// builtin takes its arguments in single-value context.
    pub fn spreads_call_argument(self) -> bool {
        matches!(self, Builtin::Values | Builtin::Print | Builtin::Println)
    }
}

fn expect_args(b: Builtin, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(arity_mismatch(b.name(), n, args.len()))
    }
}

fn one(v: Value) -> EvalResult<Values> {
    Ok(smallvec![v])
}

#[cold]
fn invalid_argument(b: Builtin, v: &Value) -> EvalError {
    invalid_operation(format!(
        "invalid argument {v} (type {}) for built-in {}",
        v.type_of(),
        b.name()
    ))
}

/// A non-negative size argument of `make`.
fn size_arg(b: Builtin, v: &Value) -> Result<usize, EvalError> {
    match v.as_int() {
        Some(n) if n >= 0 => usize::try_from(n).map_err(|_| invalid_argument(b, v)),
        Some(n) => Err(invalid_operation(format!("negative size argument in make: {n}"))),
        None => Err(invalid_argument(b, v)),
    }
}

/// Call `builtin` with evaluated `args`. `spread` marks `f(xs...)`.
#[tracing::instrument(level = "trace", skip(interp, args, env), fields(builtin = builtin.name()))]
pub fn call_builtin(
    interp: &mut Interpreter,
    builtin: Builtin,
    args: Vec<Value>,
    spread: bool,
    env: &Environment,
) -> EvalResult<Values> {
    if spread && builtin != Builtin::Append {
        return Err(invalid_operation(format!(
            "invalid use of ... with built-in {}",
            builtin.name()
        ))
        .into());
    }
    match builtin {
        Builtin::Len => {
            expect_args(builtin, &args, 1)?;
            let n = length(&args[0]).ok_or_else(|| invalid_argument(builtin, &args[0]))?;
            one(Value::int(n as i64))
        }
        Builtin::Cap => {
            expect_args(builtin, &args, 1)?;
            let n = match &args[0] {
                Value::Slice(s) => s.cap(),
                Value::Array(a) => a.len(),
                Value::Chan(c) => c.chan.as_ref().map_or(0, |ch| ch.cap()),
                other => return Err(invalid_argument(builtin, other).into()),
            };
            one(Value::int(n as i64))
        }
        Builtin::Append => append(args, spread),
        Builtin::Make => make(args),
        Builtin::New => {
            expect_args(builtin, &args, 1)?;
            let Value::Type(ty) = &args[0] else {
                return Err(type_mismatch(format!("{} is not a type", args[0])).into());
            };
            let slot = Slot::new(Value::zero(ty));
            one(Value::Pointer(PointerValue::new(ty.clone(), Place::Slot(slot))))
        }
        Builtin::Close => {
            expect_args(builtin, &args, 1)?;
            match &args[0] {
                Value::Chan(ChanValue { chan: Some(ch), .. }) => ch.close()?,
                Value::Chan(_) => return Err(channel_closed("close of nil channel").into()),
                other => return Err(invalid_argument(builtin, other).into()),
            }
            Ok(Values::new())
        }
        Builtin::Delete => {
            expect_args(builtin, &args, 2)?;
            let Value::Map(m) = &args[0] else {
                return Err(invalid_argument(builtin, &args[0]).into());
            };
            let key = assign_convert(args[1].clone(), &m.key)?;
            m.remove(&key)?;
            Ok(Values::new())
        }
        Builtin::Copy => {
            expect_args(builtin, &args, 2)?;
            let Value::Slice(dst) = &args[0] else {
                return Err(invalid_argument(builtin, &args[0]).into());
            };
            let src = match &args[1] {
                Value::Slice(s) => s.to_vec(),
                Value::Str(s) => string_bytes(s),
                other => return Err(invalid_argument(builtin, other).into()),
            };
            one(Value::int(dst.copy_from(&src) as i64))
        }
        Builtin::Panic => {
            expect_args(builtin, &args, 1)?;
            let value = args.into_iter().next().unwrap_or(Value::Nil).defaulted()?;
            Err(ControlAction::Panic(value))
        }
        Builtin::Recover => {
            expect_args(builtin, &args, 0)?;
            one(interp.recover_panic())
        }
        Builtin::Complex => {
            expect_args(builtin, &args, 2)?;
            complex(interp, &args[0], &args[1]).map(|v| smallvec![v]).map_err(Into::into)
        }
        Builtin::Real | Builtin::Imag => {
            expect_args(builtin, &args, 1)?;
            let imag = builtin == Builtin::Imag;
            let v = match &args[0] {
                Value::Complex(c) => Value::Float(FloatValue::new(
                    c.kind().part(),
                    if imag { c.im() } else { c.re() },
                )),
                Value::Untyped(c) => match c.to_complex(interp.precision()) {
                    Some((re, im)) => Value::Untyped(Constant::Float(if imag { im } else { re })),
                    None => return Err(invalid_argument(builtin, &args[0]).into()),
                },
                Value::Float(f) if !imag => Value::Float(*f),
                Value::Float(f) => Value::Float(FloatValue::new(f.kind(), 0.0)),
                other => return Err(invalid_argument(builtin, other).into()),
            };
            one(v)
        }
        Builtin::Print | Builtin::Println => {
            let text: Vec<String> = args.iter().map(ToString::to_string).collect();
            if builtin == Builtin::Println {
                interp.print_handler().println(&text.join(" "));
            } else {
                interp.print_handler().print(&text.concat());
            }
            Ok(Values::new())
        }
        Builtin::Min | Builtin::Max => {
            extremum(interp, builtin, args).map(|v| smallvec![v]).map_err(Into::into)
        }
        Builtin::Eval => {
            expect_args(builtin, &args, 1)?;
            match args.into_iter().next() {
                Some(Value::Syntax(node)) => interp.eval_syntax(node, env),
                Some(other) => one(other),
                None => Ok(Values::new()),
            }
        }
        Builtin::Values => args
            .into_iter()
            .map(Value::defaulted)
            .collect::<Result<Values, _>>()
            .map_err(Into::into),
        Builtin::MacroExpand | Builtin::MacroExpand1 => {
            expect_args(builtin, &args, 1)?;
            let Value::Syntax(node) = &args[0] else {
                return Err(invalid_argument(builtin, &args[0]).into());
            };
            let once = builtin == Builtin::MacroExpand1;
            let (node, expanded) = interp.macroexpand(node.clone(), env, once)?;
            Ok(smallvec![Value::Syntax(node), Value::Bool(expanded)])
        }
    }
}

/// `len(v)`
fn length(v: &Value) -> Option<usize> {
    Some(match v {
        Value::Str(s) | Value::Untyped(Constant::String(s)) => s.len(),
        Value::Slice(s) => s.len(),
        Value::Array(a) => a.len(),
        Value::Map(m) => m.len(),
        Value::Chan(c) => c.chan.as_ref().map_or(0, |ch| ch.len()),
        Value::Pointer(p) => match p.target.as_ref().map(Place::load) {
            Some(Value::Array(a)) => a.len(),
            _ => return None,
        },
        _ => return None,
    })
}

fn string_bytes(s: &str) -> Vec<Value> {
    s.bytes()
        .map(|b| Value::typed_int(IntKind::Uint8, i128::from(b)))
        .collect()
}

fn append(args: Vec<Value>, spread: bool) -> EvalResult<Values> {
    let mut args = args.into_iter();
    let Some(first) = args.next() else {
        return Err(arity_mismatch("append", 1, 0).into());
    };
    let Value::Slice(slice) = first else {
        return Err(invalid_argument(Builtin::Append, &first).into());
    };
    let items: Vec<Value> = if spread {
        match args.next() {
            Some(Value::Slice(s)) => s.to_vec(),
            Some(Value::Str(s)) => string_bytes(&s),
            Some(Value::Nil) | None => Vec::new(),
            Some(other) => return Err(invalid_argument(Builtin::Append, &other).into()),
        }
    } else {
        args.collect()
    };
    let items = items
        .into_iter()
        .map(|v| assign_convert(v, &slice.elem))
        .collect::<Result<Vec<_>, _>>()?;
    one(Value::Slice(slice.append(items)))
}

fn make(args: Vec<Value>) -> EvalResult<Values> {
    let Some(Value::Type(ty)) = args.first() else {
        return Err(match args.first() {
            Some(v) => type_mismatch(format!("{v} is not a type")),
            None => arity_mismatch("make", 1, 0),
        }
        .into());
    };
    let sizes = args[1..]
        .iter()
        .map(|v| size_arg(Builtin::Make, v))
        .collect::<Result<SmallVec<[usize; 2]>, _>>()?;
    let value = match ty.underlying() {
        Type::Slice(elem) => {
            let (len, cap) = match sizes.as_slice() {
                [len] => (*len, *len),
                [len, cap] => (*len, *cap),
                _ => return Err(arity_mismatch("make", 2, args.len()).into()),
            };
            if len > cap {
                return Err(invalid_operation(format!(
                    "len larger than cap in make({ty}): {len} > {cap}"
                ))
                .into());
            }
            let elem = Type::clone(&elem);
            let zero = Value::zero(&elem);
            Value::Slice(SliceValue::with_len(elem, len, cap, &zero))
        }
        Type::Map(key, value) => {
            if sizes.len() > 1 {
                return Err(arity_mismatch("make", 2, args.len()).into());
            }
            Value::Map(MapValue::new(Type::clone(&key), Type::clone(&value)))
        }
        Type::Chan(dir, elem) => {
            let cap = match sizes.as_slice() {
                [] => 0,
                [cap] => *cap,
                _ => return Err(arity_mismatch("make", 2, args.len()).into()),
            };
            Value::Chan(ChanValue {
                dir,
                ..ChanValue::new(Type::clone(&elem), cap)
            })
        }
        _ => {
            return Err(invalid_operation(format!(
                "invalid argument: cannot make {ty}; type must be slice, map, or channel"
            ))
            .into())
        }
    };
    one(value)
}

fn complex(interp: &Interpreter, re: &Value, im: &Value) -> Result<Value, EvalError> {
    let fail = || invalid_operation(format!("invalid operation: complex({re}, {im})"));
    match (re, im) {
        (Value::Untyped(a), Value::Untyped(b)) => {
            let precision = interp.precision();
            match (a.to_real(precision), b.to_real(precision)) {
                (Some(a), Some(b)) => Ok(Value::Untyped(Constant::Complex(a, b))),
                _ => Err(fail()),
            }
        }
        (Value::Float(a), Value::Float(b)) if a.kind() == b.kind() => {
            let kind = match a.kind() {
                FloatKind::F32 => ComplexKind::C64,
                FloatKind::F64 => ComplexKind::C128,
            };
            Ok(Value::Complex(ComplexValue::new(kind, a.get(), b.get())))
        }
        (Value::Float(f), Value::Untyped(c)) => {
            let other = c.to_typed(&Type::Float(f.kind()), false)?;
            complex(interp, re, &other)
        }
        (Value::Untyped(c), Value::Float(f)) => {
            let other = c.to_typed(&Type::Float(f.kind()), false)?;
            complex(interp, &other, im)
        }
        _ => Err(fail()),
    }
}

fn extremum(interp: &Interpreter, b: Builtin, args: Vec<Value>) -> Result<Value, EvalError> {
    let want = if b == Builtin::Min {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    if args.is_empty() {
        return Err(arity_mismatch(b.name(), 1, 0));
    }
    if let Some(typed) = args.iter().find(|v| !matches!(v, Value::Untyped(_))) {
        let ty = typed.type_of();
        let mut best: Option<Value> = None;
        for arg in args {
            let v = assign_convert(arg, &ty)?;
            best = Some(match best {
                None => v,
                Some(cur) => match compare_ordered(&v, &cur) {
                    Some(ord) if ord == want => v,
                    Some(_) => cur,
                    None => return Err(invalid_argument(b, &v)),
                },
            });
        }
        return best.ok_or_else(|| arity_mismatch(b.name(), 1, 0));
    }
    let op = if b == Builtin::Min {
        BinaryOp::Lss
    } else {
        BinaryOp::Gtr
    };
    let mut best: Option<Constant> = None;
    for arg in args {
        let Value::Untyped(c) = arg else { continue };
        best = Some(match best {
            None => c,
            Some(cur) => match Constant::binary(op, &c, &cur, interp.precision())? {
                Constant::Bool(true) => c,
                _ => cur,
            },
        });
    }
    best.map(Value::Untyped)
        .ok_or_else(|| arity_mismatch(b.name(), 1, 0))
}

#[cfg(test)]
mod tests;
