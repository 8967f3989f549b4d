//! Runtime values.
//!
//! [`Value`] is the tagged union both evaluators compute with. Scalars are
//! stored inline; aggregates share their storage behind `Arc` so that
//! slices, maps, channels and pointers alias the way the language requires,
//! while arrays and structs get value semantics through [`Value::copied`] on
//! every store.
//!
//! `Value::Untyped` holds a constant that has not met a typed context yet.
//! `Value::Nil` is the untyped `nil` (and the content of a nil interface);
//! typed nils are the nil states of pointers, slices, maps, channels and
//! functions.

mod channel;
mod composite;
mod constant;
mod function;
mod scalar;

#[cfg(test)]
mod tests;

pub use channel::{ChanValue, Channel};
pub use composite::{
    new_cells, ArrayValue, Cells, MapKey, MapValue, Place, PointerValue, SliceValue, Slot,
    StructValue,
};
pub use constant::{ordering_holds, Constant, Precision, Real};
pub use function::{BoundMethod, Closure, FuncImpl, FunctionValue, MacroValue, NativeFunc};
pub use scalar::{format_complex, format_float, ComplexValue, FloatValue, IntValue};

use crate::packages::Package;
use crate::types::{ComplexKind, FloatKind, FuncType, IntKind, Type, UntypedKind};
use quasi_ir::{same_syntax, Node};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Ordered results of a statement or call; single-value callers use the
/// first element.
pub type Values = SmallVec<[Value; 2]>;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    /// No value: the result of statements that produce nothing.
    None,
    /// Untyped `nil`, also the content of a nil interface.
    Nil,
    Bool(bool),
    Int(IntValue),
    Float(FloatValue),
    Complex(ComplexValue),
    Str(Arc<str>),
    Untyped(Constant),
    Pointer(PointerValue),
    Slice(SliceValue),
    Array(ArrayValue),
    Map(MapValue),
    Chan(ChanValue),
    Func(FunctionValue),
    Struct(StructValue),
    /// Quoted syntax.
    Syntax(Node),
    /// A type used as a value (conversion callee, `make` argument).
    Type(Type),
    Macro(MacroValue),
    Package(Arc<Package>),
}

impl Value {
    pub fn int(v: i64) -> Value {
        Value::Int(IntValue::new(IntKind::Int, i128::from(v)))
    }

    pub fn typed_int(kind: IntKind, v: i128) -> Value {
        Value::Int(IntValue::new(kind, v))
    }

    pub fn float64(v: f64) -> Value {
        Value::Float(FloatValue::new(FloatKind::F64, v))
    }

    pub fn float32(v: f32) -> Value {
        Value::Float(FloatValue::new(FloatKind::F32, f64::from(v)))
    }

    pub fn complex(kind: ComplexKind, re: f64, im: f64) -> Value {
        Value::Complex(ComplexValue::new(kind, re, im))
    }

    pub fn string(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    pub fn syntax(node: impl Into<Node>) -> Value {
        Value::Syntax(node.into())
    }

    /// Dynamic type.
    pub fn type_of(&self) -> Type {
        match self {
            Value::None | Value::Type(_) | Value::Macro(_) | Value::Package(_) => Type::Invalid,
            Value::Nil => Type::Untyped(UntypedKind::Nil),
            Value::Bool(_) => Type::Bool,
            Value::Int(i) => Type::Int(i.kind()),
            Value::Float(f) => Type::Float(f.kind()),
            Value::Complex(c) => Type::Complex(c.kind()),
            Value::Str(_) => Type::String,
            Value::Untyped(c) => Type::Untyped(c.kind()),
            Value::Pointer(p) => Type::pointer(p.elem.clone()),
            Value::Slice(s) => Type::slice(s.elem.clone()),
            Value::Array(a) => Type::array(a.len(), a.elem.clone()),
            Value::Map(m) => Type::map(m.key.clone(), m.value.clone()),
            Value::Chan(c) => Type::chan(c.dir, c.elem.clone()),
            Value::Func(f) => Type::Func(f.ty.clone()),
            Value::Struct(s) => s.ty.clone(),
            Value::Syntax(_) => Type::Syntax,
        }
    }

    /// Whether this is a nil of any kind.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Pointer(p) => p.target.is_none(),
            Value::Slice(s) => s.is_nil(),
            Value::Map(m) => m.is_nil(),
            Value::Chan(c) => c.chan.is_none(),
            Value::Func(f) => f.is_nil(),
            _ => false,
        }
    }

    /// The zero value of `ty`.
    pub fn zero(ty: &Type) -> Value {
        match ty.underlying() {
            Type::Bool => Value::Bool(false),
            Type::Int(k) => Value::Int(IntValue::new(k, 0)),
            Type::Float(k) => Value::Float(FloatValue::new(k, 0.0)),
            Type::Complex(k) => Value::Complex(ComplexValue::new(k, 0.0, 0.0)),
            Type::String => Value::string(""),
            Type::Pointer(e) => Value::Pointer(PointerValue::nil(Type::clone(&e))),
            Type::Slice(e) => Value::Slice(SliceValue::nil(Type::clone(&e))),
            Type::Array(n, e) => {
                let zero = Value::zero(&e);
                Value::Array(ArrayValue::new(
                    Type::clone(&e),
                    (0..n).map(|_| zero.copied()).collect(),
                ))
            }
            Type::Map(k, v) => Value::Map(MapValue::nil(Type::clone(&k), Type::clone(&v))),
            Type::Chan(d, e) => Value::Chan(ChanValue::nil(Type::clone(&e), d)),
            Type::Func(ft) => Value::Func(FunctionValue::nil(ft)),
            Type::Struct(st) => Value::Struct(StructValue::new(
                ty.clone(),
                st.fields.iter().map(|f| Value::zero(&f.ty)).collect(),
            )),
            Type::Untyped(k) if k != UntypedKind::Nil => Value::zero(&k.default_type()),
            Type::Interface(_) | Type::Syntax | Type::Untyped(_) | Type::Named(_) | Type::Invalid => {
                Value::Nil
            }
        }
    }

    /// A copy with value semantics: arrays and structs get fresh storage.
    #[must_use]
    pub fn copied(&self) -> Value {
        match self {
            Value::Array(a) => Value::Array(ArrayValue::new(
                a.elem.clone(),
                a.to_vec().iter().map(Value::copied).collect(),
            )),
            Value::Struct(s) => Value::Struct(StructValue::new(
                s.ty.clone(),
                s.to_vec().iter().map(Value::copied).collect(),
            )),
            other => other.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) | Value::Untyped(Constant::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of a typed integer or an integral constant.
    pub fn as_int(&self) -> Option<i128> {
        use num_traits::ToPrimitive;
        match self {
            Value::Int(i) => Some(i.get()),
            Value::Untyped(c) => c.to_integer().and_then(|i| i.to_i128()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Untyped(Constant::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_syntax(&self) -> Option<&Node> {
        match self {
            Value::Syntax(n) => Some(n),
            _ => None,
        }
    }

    /// Replace an untyped constant by its default-typed value.
    pub fn defaulted(self) -> Result<Value, crate::errors::EvalError> {
        match self {
            Value::Untyped(c) => c.default_value(),
            other => Ok(other),
        }
    }

    pub fn func_type(&self) -> Option<Arc<FuncType>> {
        match self {
            Value::Func(f) => Some(f.ty.clone()),
            _ => None,
        }
    }

    /// Short description of the value's kind for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Value::None => "no value".to_string(),
            Value::Type(t) => format!("type {t}"),
            Value::Macro(m) => format!("macro {}", m.name),
            Value::Package(p) => format!("package {}", p.name),
            other => other.type_of().to_string(),
        }
    }
}

/// Deep structural equality, `reflect.DeepEqual`-style. Operator `==` has
/// its own rules in the operators module.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) | (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Complex(a), Value::Complex(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Untyped(a), Value::Untyped(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => {
                a.elem.identical(&b.elem)
                    && a.target.as_ref().map(Place::address) == b.target.as_ref().map(Place::address)
            }
            (Value::Slice(a), Value::Slice(b)) => {
                a.elem.identical(&b.elem)
                    && a.is_nil() == b.is_nil()
                    && a.to_vec() == b.to_vec()
            }
            (Value::Array(a), Value::Array(b)) => {
                a.elem.identical(&b.elem) && a.to_vec() == b.to_vec()
            }
            (Value::Map(a), Value::Map(b)) => {
                a.key.identical(&b.key)
                    && a.value.identical(&b.value)
                    && a.is_nil() == b.is_nil()
                    && a.entries() == b.entries()
            }
            (Value::Chan(a), Value::Chan(b)) => a.elem.identical(&b.elem) && a.id() == b.id(),
            (Value::Func(a), Value::Func(b)) => {
                a.is_nil() && b.is_nil() && Type::Func(a.ty.clone()).identical(&Type::Func(b.ty.clone()))
            }
            (Value::Struct(a), Value::Struct(b)) => {
                a.ty.identical(&b.ty) && a.to_vec() == b.to_vec()
            }
            (Value::Syntax(a), Value::Syntax(b)) => same_syntax(a, b),
            (Value::Type(a), Value::Type(b)) => a.identical(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("<no value>"),
            Value::Nil => f.write_str("<nil>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Complex(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::Untyped(c) => write!(f, "{c}"),
            Value::Pointer(p) => match &p.target {
                None => f.write_str("<nil>"),
                Some(place) => match place.load() {
                    Value::Struct(s) => write!(f, "&{}", Value::Struct(s)),
                    _ => write!(f, "{:#x}", place.address()),
                },
            },
            Value::Slice(s) => write_list(f, &s.to_vec()),
            Value::Array(a) => write_list(f, &a.to_vec()),
            Value::Map(m) => {
                f.write_str("map[")?;
                for (i, (k, v)) in m.entries().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
            Value::Chan(c) => match c.chan {
                None => f.write_str("<nil>"),
                Some(_) => write!(f, "{:#x}", c.id()),
            },
            Value::Func(func) => match func.imp {
                None => f.write_str("<nil>"),
                Some(_) => write!(f, "{:#x}", func.address()),
            },
            Value::Struct(s) => {
                f.write_str("{")?;
                for (i, v) in s.to_vec().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
            Value::Syntax(n) => write!(f, "{n}"),
            Value::Type(t) => write!(f, "{t}"),
            Value::Macro(m) => write!(f, "<macro {}>", m.name),
            Value::Package(p) => write!(f, "<package {}>", p.path),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{v}")?;
    }
    f.write_str("]")
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Nil => f.write_str("nil"),
            Value::Syntax(n) => write!(f, "Syntax({n:?})"),
            Value::Str(s) => write!(f, "string({s:?})"),
            other => write!(f, "{}({other})", other.describe()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
