//! Predeclared types.

use super::{ComplexKind, FloatKind, IntKind, Type};

/// Names and types predeclared in the universe scope.
pub fn universe_types() -> Vec<(&'static str, Type)> {
    let mut types = vec![
        ("bool", Type::Bool),
        ("string", Type::String),
        ("error", Type::error()),
        ("float32", Type::Float(FloatKind::F32)),
        ("float64", Type::Float(FloatKind::F64)),
        ("complex64", Type::Complex(ComplexKind::C64)),
        ("complex128", Type::Complex(ComplexKind::C128)),
        ("byte", Type::Int(IntKind::Uint8)),
        ("rune", Type::Int(IntKind::Int32)),
    ];
    for kind in [
        IntKind::Int,
        IntKind::Int8,
        IntKind::Int16,
        IntKind::Int32,
        IntKind::Int64,
        IntKind::Uint,
        IntKind::Uint8,
        IntKind::Uint16,
        IntKind::Uint32,
        IntKind::Uint64,
        IntKind::Uintptr,
    ] {
        types.push((kind.name(), Type::Int(kind)));
    }
    types
}
