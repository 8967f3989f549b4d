//! Runtime types.
//!
//! Every value knows its dynamic type; bindings additionally remember their
//! declared (static) type so interface-typed slots and typed nils behave
//! like the source language. Types are cheap to clone: composite types share
//! their parts behind `Arc`.
//!
//! Declared types whose underlying type is a struct or an interface keep
//! their identity as a [`NamedType`] (method sets hang off it). Other
//! declared types are recorded as their underlying type.

mod universe;


pub use universe::universe_types;

use crate::value::FunctionValue;
use parking_lot::RwLock;
use quasi_ir::{ChanDir, Name};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Integer kinds. `int`, `uint` and `uintptr` are 64 bits wide.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
}

impl IntKind {
    pub const fn bits(self) -> u32 {
        match self {
            IntKind::Int8 | IntKind::Uint8 => 8,
            IntKind::Int16 | IntKind::Uint16 => 16,
            IntKind::Int32 | IntKind::Uint32 => 32,
            IntKind::Int
            | IntKind::Int64
            | IntKind::Uint
            | IntKind::Uint64
            | IntKind::Uintptr => 64,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::Int | IntKind::Int8 | IntKind::Int16 | IntKind::Int32 | IntKind::Int64
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
            IntKind::Uintptr => "uintptr",
        }
    }

    /// Smallest representable value.
    pub const fn min(self) -> i128 {
        if self.is_signed() {
            -(1i128 << (self.bits() - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    pub const fn max(self) -> i128 {
        if self.is_signed() {
            (1i128 << (self.bits() - 1)) - 1
        } else {
            (1i128 << self.bits()) - 1
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    pub const fn name(self) -> &'static str {
        match self {
            FloatKind::F32 => "float32",
            FloatKind::F64 => "float64",
        }
    }

    /// Round `v` to this precision.
    #[inline]
    pub fn round(self, v: f64) -> f64 {
        match self {
            FloatKind::F32 => f64::from(v as f32),
            FloatKind::F64 => v,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ComplexKind {
    C64,
    C128,
}

impl ComplexKind {
    pub const fn name(self) -> &'static str {
        match self {
            ComplexKind::C64 => "complex64",
            ComplexKind::C128 => "complex128",
        }
    }

    /// Precision of the real and imaginary parts.
    pub const fn part(self) -> FloatKind {
        match self {
            ComplexKind::C64 => FloatKind::F32,
            ComplexKind::C128 => FloatKind::F64,
        }
    }
}

/// Kinds of untyped constants, plus the untyped `nil`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UntypedKind {
    Bool,
    Int,
    Rune,
    Float,
    Complex,
    String,
    Nil,
}

impl UntypedKind {
    pub const fn name(self) -> &'static str {
        match self {
            UntypedKind::Bool => "untyped bool",
            UntypedKind::Int => "untyped int",
            UntypedKind::Rune => "untyped rune",
            UntypedKind::Float => "untyped float",
            UntypedKind::Complex => "untyped complex",
            UntypedKind::String => "untyped string",
            UntypedKind::Nil => "untyped nil",
        }
    }

    /// The type an untyped constant of this kind takes when nothing else
    /// decides.
    pub fn default_type(self) -> Type {
        match self {
            UntypedKind::Bool => Type::Bool,
            UntypedKind::Int => Type::Int(IntKind::Int),
            UntypedKind::Rune => Type::Int(IntKind::Int32),
            UntypedKind::Float => Type::Float(FloatKind::F64),
            UntypedKind::Complex => Type::Complex(ComplexKind::C128),
            UntypedKind::String => Type::String,
            UntypedKind::Nil => Type::Untyped(UntypedKind::Nil),
        }
    }
}

/// A runtime type.
#[derive(Clone)]
pub enum Type {
    Bool,
    Int(IntKind),
    Float(FloatKind),
    Complex(ComplexKind),
    String,
    Untyped(UntypedKind),
    Pointer(Arc<Type>),
    Slice(Arc<Type>),
    Array(usize, Arc<Type>),
    Map(Arc<Type>, Arc<Type>),
    Chan(ChanDir, Arc<Type>),
    Func(Arc<FuncType>),
    Struct(Arc<StructType>),
    Interface(Arc<InterfaceType>),
    Named(Arc<NamedType>),
    /// Quoted syntax, the type of `~quote{..}` and of macro parameters.
    Syntax,
    /// Result of a failed resolution; never assignable.
    Invalid,
}

/// Function signature.
#[derive(Clone, Default)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    /// The last parameter is `...T`, stored as `[]T`.
    pub variadic: bool,
}

impl FuncType {
    pub fn new(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Self {
        FuncType {
            params,
            results,
            variadic,
        }
    }
}

#[derive(Clone)]
pub struct StructField {
    pub name: Name,
    pub ty: Type,
    pub embedded: bool,
}

#[derive(Clone, Default)]
pub struct StructType {
    pub fields: Vec<StructField>,
}

impl StructType {
    pub fn field_index(&self, name: Name) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Interface method set, sorted by name.
#[derive(Clone, Default)]
pub struct InterfaceType {
    pub methods: Vec<(Name, Arc<FuncType>)>,
}

impl InterfaceType {
    pub fn new(mut methods: Vec<(Name, Arc<FuncType>)>) -> Self {
        methods.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        methods.dedup_by(|a, b| a.0 == b.0);
        InterfaceType { methods }
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A method attached to a named type.
#[derive(Clone)]
pub struct Method {
    pub func: FunctionValue,
    pub pointer_recv: bool,
}

/// A declared struct or interface type.
///
/// The underlying type is set after creation so recursive declarations
/// (`type List struct { next *List }`) can refer to themselves.
pub struct NamedType {
    pub name: Name,
    id: u64,
    underlying: RwLock<Type>,
    methods: RwLock<FxHashMap<Name, Method>>,
}

static NEXT_NAMED_ID: AtomicU64 = AtomicU64::new(1);

impl NamedType {
    pub fn new(name: Name, underlying: Type) -> Arc<Self> {
        Arc::new(NamedType {
            name,
            id: NEXT_NAMED_ID.fetch_add(1, Ordering::Relaxed),
            underlying: RwLock::new(underlying),
            methods: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn underlying(&self) -> Type {
        self.underlying.read().clone()
    }

    pub fn set_underlying(&self, ty: Type) {
        *self.underlying.write() = ty;
    }

    pub fn method(&self, name: Name) -> Option<Method> {
        self.methods.read().get(&name).cloned()
    }

    /// Attach or replace a method. Redeclaring a method is allowed at the
    /// REPL top level.
    pub fn set_method(&self, name: Name, method: Method) {
        self.methods.write().insert(name, method);
    }
}

static ERROR_TYPE: LazyLock<Type> = LazyLock::new(|| {
    let error_method = Arc::new(FuncType::new(Vec::new(), vec![Type::String], false));
    Type::Named(NamedType::new(
        Name::intern("error"),
        Type::Interface(Arc::new(InterfaceType::new(vec![(
            Name::intern("Error"),
            error_method,
        )]))),
    ))
});

static EMPTY_INTERFACE: LazyLock<Type> =
    LazyLock::new(|| Type::Interface(Arc::new(InterfaceType::default())));

impl Type {
    pub const INT: Type = Type::Int(IntKind::Int);
    pub const FLOAT64: Type = Type::Float(FloatKind::F64);

    /// The predeclared `error` interface.
    pub fn error() -> Type {
        ERROR_TYPE.clone()
    }

    /// `interface{}`
    pub fn any() -> Type {
        EMPTY_INTERFACE.clone()
    }

    pub fn pointer(elem: Type) -> Type {
        Type::Pointer(Arc::new(elem))
    }

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Arc::new(elem))
    }

    pub fn array(len: usize, elem: Type) -> Type {
        Type::Array(len, Arc::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Arc::new(key), Arc::new(value))
    }

    pub fn chan(dir: ChanDir, elem: Type) -> Type {
        Type::Chan(dir, Arc::new(elem))
    }

    pub fn func(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Type {
        Type::Func(Arc::new(FuncType::new(params, results, variadic)))
    }

    /// The underlying type, looking through one level of naming.
    pub fn underlying(&self) -> Type {
        match self {
            Type::Named(named) => named.underlying(),
            other => other.clone(),
        }
    }

    pub fn is_interface(&self) -> bool {
        match self {
            Type::Interface(_) => true,
            Type::Named(named) => matches!(named.underlying(), Type::Interface(_)),
            _ => false,
        }
    }

    /// Interface method set, if this is an interface type.
    pub fn interface_methods(&self) -> Option<Arc<InterfaceType>> {
        match self.underlying() {
            Type::Interface(iface) => Some(iface),
            _ => None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    /// Whether `nil` is a value of this type.
    pub fn is_nilable(&self) -> bool {
        matches!(
            self.underlying(),
            Type::Pointer(_)
                | Type::Slice(_)
                | Type::Map(..)
                | Type::Chan(..)
                | Type::Func(_)
                | Type::Interface(_)
                | Type::Syntax
                | Type::Untyped(UntypedKind::Nil)
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::Int(_) | Type::Untyped(UntypedKind::Int | UntypedKind::Rune)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Int(_)
                | Type::Float(_)
                | Type::Complex(_)
                | Type::Untyped(
                    UntypedKind::Int | UntypedKind::Rune | UntypedKind::Float | UntypedKind::Complex
                )
        )
    }

    /// The type an untyped constant of this type defaults to; typed types
    /// are returned unchanged.
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Untyped(kind) => kind.default_type(),
            other => other.clone(),
        }
    }

    /// Element type of pointers, slices, arrays, channels and maps.
    pub fn elem(&self) -> Option<Type> {
        match self.underlying() {
            Type::Pointer(e) | Type::Slice(e) | Type::Array(_, e) | Type::Chan(_, e) | Type::Map(_, e) => {
                Some(Type::clone(&e))
            }
            _ => None,
        }
    }

    pub fn struct_type(&self) -> Option<Arc<StructType>> {
        match self.underlying() {
            Type::Struct(st) => Some(st),
            _ => None,
        }
    }

    pub fn func_type(&self) -> Option<Arc<FuncType>> {
        match self.underlying() {
            Type::Func(ft) => Some(ft),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&Arc<NamedType>> {
        match self {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }

    /// Look up a method on `T`, or on the pointed-to named type for `*T`.
    pub fn method(&self, name: Name) -> Option<Method> {
        match self {
            Type::Named(named) => named.method(name),
            Type::Pointer(elem) => match &**elem {
                Type::Named(named) => named.method(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether a value of this dynamic type satisfies `iface`.
    ///
    /// Pointer-receiver methods count for both `T` and `*T`: values stored in
    /// variables are addressable in this runtime.
    pub fn implements(&self, iface: &InterfaceType) -> bool {
        iface.methods.iter().all(|(name, want)| {
            self.method(*name).is_some_and(|m| {
                let have = &m.func.ty;
                // receiver is the first parameter of the stored function
                have.params.len() == want.params.len() + 1
                    && have.params[1..]
                        .iter()
                        .zip(&want.params)
                        .all(|(a, b)| a.identical(b))
                    && have.results.len() == want.results.len()
                    && have.results.iter().zip(&want.results).all(|(a, b)| a.identical(b))
            })
        })
    }

    /// Type identity.
    pub fn identical(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Syntax, Type::Syntax) => true,
            (Type::Int(a), Type::Int(b)) => a == b,
            (Type::Float(a), Type::Float(b)) => a == b,
            (Type::Complex(a), Type::Complex(b)) => a == b,
            (Type::Untyped(a), Type::Untyped(b)) => a == b,
            (Type::Pointer(a), Type::Pointer(b)) | (Type::Slice(a), Type::Slice(b)) => {
                a.identical(b)
            }
            (Type::Array(n, a), Type::Array(m, b)) => n == m && a.identical(b),
            (Type::Map(k1, v1), Type::Map(k2, v2)) => k1.identical(k2) && v1.identical(v2),
            (Type::Chan(d1, a), Type::Chan(d2, b)) => d1 == d2 && a.identical(b),
            (Type::Func(a), Type::Func(b)) => {
                a.variadic == b.variadic
                    && a.params.len() == b.params.len()
                    && a.results.len() == b.results.len()
                    && a.params.iter().zip(&b.params).all(|(x, y)| x.identical(y))
                    && a.results.iter().zip(&b.results).all(|(x, y)| x.identical(y))
            }
            (Type::Struct(a), Type::Struct(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.fields.len() == b.fields.len()
                        && a.fields.iter().zip(&b.fields).all(|(x, y)| {
                            x.name == y.name && x.embedded == y.embedded && x.ty.identical(&y.ty)
                        }))
            }
            (Type::Interface(a), Type::Interface(b)) => {
                a.methods.len() == b.methods.len()
                    && a.methods.iter().zip(&b.methods).all(|((n1, f1), (n2, f2))| {
                        n1 == n2 && Type::Func(f1.clone()).identical(&Type::Func(f2.clone()))
                    })
            }
            (Type::Named(a), Type::Named(b)) => a.id == b.id,
            _ => false,
        }
    }

    /// Assignability of a value of type `self` to a location of type `to`,
    /// for typed (non-constant) values.
    pub fn assignable_to(&self, to: &Type) -> bool {
        if self.identical(to) {
            return true;
        }
        if to.is_interface() {
            return to.interface_methods().map_or(true, |iface| self.implements(&iface));
        }
        match (self, to) {
            (Type::Untyped(UntypedKind::Nil), _) => to.is_nilable(),
            // unnamed and named with identical underlying types
            (Type::Named(_), Type::Named(_)) => false,
            (Type::Named(_), _) | (_, Type::Named(_)) => self.underlying().identical(&to.underlying()),
            // bidirectional channel into a directional one
            (Type::Chan(ChanDir::Both, a), Type::Chan(_, b)) => a.identical(b),
            _ => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.identical(other)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int(k) => f.write_str(k.name()),
            Type::Float(k) => f.write_str(k.name()),
            Type::Complex(k) => f.write_str(k.name()),
            Type::String => f.write_str("string"),
            Type::Untyped(k) => f.write_str(k.name()),
            Type::Pointer(e) => write!(f, "*{e}"),
            Type::Slice(e) => write!(f, "[]{e}"),
            Type::Array(n, e) => write!(f, "[{n}]{e}"),
            Type::Map(k, v) => write!(f, "map[{k}]{v}"),
            Type::Chan(ChanDir::Both, e) => write!(f, "chan {e}"),
            Type::Chan(ChanDir::Send, e) => write!(f, "chan<- {e}"),
            Type::Chan(ChanDir::Recv, e) => write!(f, "<-chan {e}"),
            Type::Func(ft) => {
                f.write_str("func")?;
                write_signature(f, ft)
            }
            Type::Struct(st) => {
                f.write_str("struct {")?;
                for (i, field) in st.fields.iter().enumerate() {
                    f.write_str(if i == 0 { " " } else { "; " })?;
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                }
                if st.fields.is_empty() {
                    f.write_str("}")
                } else {
                    f.write_str(" }")
                }
            }
            Type::Interface(iface) => {
                f.write_str("interface {")?;
                for (i, (name, ft)) in iface.methods.iter().enumerate() {
                    f.write_str(if i == 0 { " " } else { "; " })?;
                    write!(f, "{name}")?;
                    write_signature(f, ft)?;
                }
                if iface.methods.is_empty() {
                    f.write_str("}")
                } else {
                    f.write_str(" }")
                }
            }
            Type::Named(named) => write!(f, "{}", named.name),
            Type::Syntax => f.write_str("ast.Node"),
            Type::Invalid => f.write_str("invalid type"),
        }
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, ft: &FuncType) -> fmt::Result {
    f.write_str("(")?;
    for (i, p) in ft.params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match p {
            Type::Slice(elem) if ft.variadic && i + 1 == ft.params.len() => write!(f, "...{elem}")?,
            _ => write!(f, "{p}")?,
        }
    }
    f.write_str(")")?;
    match ft.results.as_slice() {
        [] => Ok(()),
        [single] => write!(f, " {single}"),
        many => {
            f.write_str(" (")?;
            for (i, r) in many.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{r}")?;
            }
            f.write_str(")")
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
