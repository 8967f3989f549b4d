//! Resolution of type expressions.

use super::Interpreter;
use crate::environment::{BindingKind, Environment};
use crate::errors::{type_mismatch, undefined_name, unimplemented, EvalError};
use crate::types::{FuncType, InterfaceType, StructField, StructType, Type};
use crate::value::Value;
use quasi_ir::{Expr, ExprKind, Field, Name};
use std::sync::Arc;

impl Interpreter {
    /// Resolve a type expression in `env`.
    pub(crate) fn resolve_type(&mut self, expr: &Expr, env: &Environment) -> Result<Type, EvalError> {
        match &expr.kind {
            ExprKind::Ident(name) => lookup_type(env, *name),
            ExprKind::Paren(inner) => self.resolve_type(inner, env),
            ExprKind::Star(inner) => Ok(Type::pointer(self.resolve_type(inner, env)?)),
            ExprKind::Selector(pkg, sel) => {
                let Some(pkg_name) = pkg.as_ident() else {
                    return Err(type_mismatch(format!("{} is not a type", sel.name)));
                };
                match env.lookup(pkg_name)? {
                    Value::Package(p) => match p.member(sel.name) {
                        Some(Value::Type(t)) => Ok(t),
                        _ => Err(undefined_name(format!("{pkg_name}.{}", sel.name))),
                    },
                    _ => Err(type_mismatch(format!("{pkg_name}.{} is not a type", sel.name))),
                }
            }
            ExprKind::ArrayType { len: None, elem } => Ok(Type::slice(self.resolve_type(elem, env)?)),
            ExprKind::ArrayType {
                len: Some(len),
                elem,
            } => {
                if matches!(len.kind, ExprKind::Ellipsis(None)) {
                    return Err(type_mismatch("invalid use of [...] array (outside a composite literal)"));
                }
                let elem = self.resolve_type(elem, env)?;
                let n = self.eval(len, env).map_err(crate::errors::ControlAction::into_error)?;
                let n = n
                    .as_int()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| type_mismatch(format!("array length {n} must be non-negative integer constant")))?;
                Ok(Type::array(n, elem))
            }
            ExprKind::Ellipsis(Some(elem)) => Ok(Type::slice(self.resolve_type(elem, env)?)),
            ExprKind::MapType(k, v) => Ok(Type::map(
                self.resolve_type(k, env)?,
                self.resolve_type(v, env)?,
            )),
            ExprKind::ChanType(dir, elem) => Ok(Type::chan(*dir, self.resolve_type(elem, env)?)),
            ExprKind::FuncType(ft) => Ok(Type::Func(Arc::new(self.resolve_func_type(ft, env)?))),
            ExprKind::StructType(fields) => self.resolve_struct(fields, env).map(|st| Type::Struct(Arc::new(st))),
            ExprKind::InterfaceType(fields) => {
                self.resolve_interface(fields, env).map(|it| Type::Interface(Arc::new(it)))
            }
            _ => Err(type_mismatch(format!("{} is not a type", describe_expr(expr)))),
        }
    }

    /// Resolve a signature; a trailing `...T` becomes a `[]T` parameter.
    pub(crate) fn resolve_func_type(
        &mut self,
        ft: &quasi_ir::FuncType,
        env: &Environment,
    ) -> Result<FuncType, EvalError> {
        let params = self.resolve_fields(&ft.params, env)?;
        let results = self.resolve_fields(&ft.results, env)?;
        Ok(FuncType::new(params, results, ft.is_variadic()))
    }

    /// One type per declared name (or per unnamed field).
    fn resolve_fields(&mut self, fields: &[Field], env: &Environment) -> Result<Vec<Type>, EvalError> {
        let mut out = Vec::new();
        for field in fields {
            let ty = self.resolve_type(&field.ty, env)?;
            let count = field.names.len().max(1);
            out.extend(std::iter::repeat(ty).take(count));
        }
        Ok(out)
    }

    fn resolve_struct(&mut self, fields: &[Field], env: &Environment) -> Result<StructType, EvalError> {
        let mut out: Vec<StructField> = Vec::new();
        for field in fields {
            let ty = self.resolve_type(&field.ty, env)?;
            if field.names.is_empty() {
                let name = embedded_name(&field.ty)
                    .ok_or_else(|| type_mismatch("embedded field must be a type name"))?;
                out.push(StructField {
                    name,
                    ty,
                    embedded: true,
                });
            } else {
                for ident in &field.names {
                    if !ident.name.is_blank() && out.iter().any(|f| f.name == ident.name) {
                        return Err(crate::errors::duplicate_binding(ident.name));
                    }
                    out.push(StructField {
                        name: ident.name,
                        ty: ty.clone(),
                        embedded: false,
                    });
                }
            }
        }
        Ok(StructType { fields: out })
    }

    fn resolve_interface(&mut self, fields: &[Field], env: &Environment) -> Result<InterfaceType, EvalError> {
        let mut methods = Vec::new();
        for field in fields {
            match (field.names.as_slice(), &field.ty.kind) {
                ([], _) => {
                    let embedded = self.resolve_type(&field.ty, env)?;
                    let Some(iface) = embedded.interface_methods() else {
                        return Err(type_mismatch(format!("interface contains type constraints: {embedded}")));
                    };
                    methods.extend(iface.methods.iter().cloned());
                }
                (names, ExprKind::FuncType(ft)) => {
                    let sig = Arc::new(self.resolve_func_type(ft, env)?);
                    for ident in names {
                        methods.push((ident.name, sig.clone()));
                    }
                }
                _ => return Err(unimplemented("interface element")),
            }
        }
        Ok(InterfaceType::new(methods))
    }
}

/// The type bound to `name`, or an error if `name` is not a type.
pub(crate) fn lookup_type(env: &Environment, name: Name) -> Result<Type, EvalError> {
    let binding = env.lookup_binding(name).ok_or_else(|| undefined_name(name))?;
    match (binding.kind, binding.get()) {
        (BindingKind::Type, Value::Type(t)) => Ok(t),
        _ => Err(type_mismatch(format!("{name} is not a type"))),
    }
}

/// Field name of an embedded `T` or `*T`.
fn embedded_name(ty: &Expr) -> Option<Name> {
    match &ty.unparen().kind {
        ExprKind::Ident(name) => Some(*name),
        ExprKind::Star(inner) => embedded_name(inner),
        ExprKind::Selector(_, sel) => Some(sel.name),
        _ => None,
    }
}

/// Whether `expr` is syntactically a type (as opposed to a value that may
/// turn out to be one after lookup).
pub(crate) fn is_type_syntax(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::ArrayType { .. }
            | ExprKind::MapType(..)
            | ExprKind::ChanType(..)
            | ExprKind::FuncType(_)
            | ExprKind::StructType(_)
            | ExprKind::InterfaceType(_)
    )
}

pub(crate) fn describe_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.to_string(),
        ExprKind::BasicLit(_, raw) => raw.to_string(),
        ExprKind::Selector(x, sel) => format!("{}.{}", describe_expr(x), sel.name),
        ExprKind::Call { fun, .. } => format!("{}(...)", describe_expr(fun)),
        _ => "expression".to_string(),
    }
}
