//! Declarations: `var`, `const`, `type`, `import`, `func` and `~macro`.

use super::assign::{define_value, reject_untyped_nil};
use super::call::single;
use super::Interpreter;
use crate::convert::assign_convert;
use crate::environment::{BindingKind, Environment};
use crate::errors::{type_mismatch, undefined_name, unimplemented, EvalError, EvalResult};
use crate::types::{Method, NamedType, Type, UntypedKind};
use crate::value::{Constant, MacroValue, Value, Values};
use quasi_ir::{Decl, Expr, ExprKind, FuncDecl, FuncLit, ImportSpec, Name, TypeSpec, ValueSpec};
use std::sync::Arc;

impl Interpreter {
    pub(crate) fn exec_decl(&mut self, decl: &Decl, env: &Environment) -> EvalResult<Values> {
        match decl {
            Decl::Var(specs) => {
                let mut last = Values::new();
                for spec in specs {
                    last = self.exec_var_spec(spec, env)?;
                }
                Ok(last)
            }
            Decl::Const(specs) => self.exec_const_specs(specs, env),
            Decl::Type(specs) => {
                for spec in specs {
                    self.exec_type_spec(spec, env)?;
                }
                Ok(Values::new())
            }
            Decl::Import(specs) => {
                let mut last = Values::new();
                for spec in specs {
                    last = single(self.exec_import(spec, env)?);
                }
                Ok(last)
            }
            Decl::Func(decl) => {
                self.exec_func_decl(decl, env)?;
                Ok(Values::new())
            }
            Decl::Macro(decl) => {
                self.exec_macro_decl(decl, env)?;
                Ok(Values::new())
            }
        }
    }

    /// `var a, b T = x, y`. Yields the values bound.
    fn exec_var_spec(&mut self, spec: &ValueSpec, env: &Environment) -> EvalResult<Values> {
        let ty = spec.ty.as_ref().map(|t| self.resolve_type(t, env)).transpose()?;
        let n = spec.names.len();
        let values = if spec.values.is_empty() {
            let Some(ty) = &ty else {
                return Err(type_mismatch("missing type or init expr in var declaration").into());
            };
            (0..n).map(|_| Value::zero(ty)).collect()
        } else {
            if ty.is_none() {
                reject_untyped_nil(&spec.values)?;
            }
            self.eval_rhs(n, &spec.values, env)?
        };
        let mut bound = Values::with_capacity(n);
        for (ident, value) in spec.names.iter().zip(values) {
            let (value, binding_ty) = match &ty {
                Some(ty) => (assign_convert(value, ty)?, ty.clone()),
                None => define_value(value)?,
            };
            env.define_binding(ident.name, BindingKind::Var, binding_ty, value.clone())?;
            bound.push(value);
        }
        Ok(bound)
    }

    /// A `const` group. `iota` counts the lines of the group; a line
    /// without values repeats the type and expressions of the previous one.
    fn exec_const_specs(&mut self, specs: &[ValueSpec], env: &Environment) -> EvalResult<Values> {
        let mut previous: Option<(Option<&Expr>, &[Expr])> = None;
        let mut last = Values::new();
        for (iota, spec) in specs.iter().enumerate() {
            let (ty_expr, exprs) = if spec.values.is_empty() && spec.ty.is_none() {
                previous.ok_or_else(|| type_mismatch("missing init expr for const declaration"))?
            } else {
                (spec.ty.as_ref(), spec.values.as_slice())
            };
            previous = Some((ty_expr, exprs));
            if exprs.len() != spec.names.len() {
                let what = if exprs.len() < spec.names.len() { "missing" } else { "extra" };
                return Err(type_mismatch(format!("{what} init expr for const declaration")).into());
            }
            let scope = env.child();
            scope.define_binding(
                Name::intern("iota"),
                BindingKind::Const,
                Type::Untyped(UntypedKind::Int),
                Value::Untyped(Constant::int(iota as i64)),
            )?;
            let ty = ty_expr.map(|t| self.resolve_type(t, &scope)).transpose()?;
            last = Values::with_capacity(exprs.len());
            for (ident, e) in spec.names.iter().zip(exprs) {
                let value = self.eval(e, &scope)?;
                let value = match &ty {
                    Some(ty) => assign_convert(value, ty)?,
                    None => value,
                };
                let binding_ty = ty.clone().unwrap_or_else(|| value.type_of());
                env.define_binding(ident.name, BindingKind::Const, binding_ty, value.clone())?;
                last.push(value);
            }
        }
        Ok(last)
    }

    /// `type T ...`. Struct and interface declarations create a named type,
    /// bound before its underlying type is resolved so it may refer to
    /// itself; other declarations name their underlying type directly.
    fn exec_type_spec(&mut self, spec: &TypeSpec, env: &Environment) -> Result<(), EvalError> {
        let name = spec.name.name;
        let named = !spec.alias
            && matches!(
                spec.ty.unparen().kind,
                ExprKind::StructType(_) | ExprKind::InterfaceType(_)
            );
        if !named {
            let ty = self.resolve_type(&spec.ty, env)?;
            env.define_binding(name, BindingKind::Type, ty.clone(), Value::Type(ty))?;
            return Ok(());
        }
        let decl = NamedType::new(name, Type::Invalid);
        let ty = Type::Named(Arc::clone(&decl));
        env.define_binding(name, BindingKind::Type, ty.clone(), Value::Type(ty))?;
        decl.set_underlying(self.resolve_type(&spec.ty, env)?);
        Ok(())
    }

    /// `import [name] "path"`: bind a package from the registry. Yields the
    /// path.
    fn exec_import(&mut self, spec: &ImportSpec, env: &Environment) -> Result<Value, EvalError> {
        let pkg = self
            .shared
            .packages
            .get(&spec.path)
            .ok_or_else(|| undefined_name(format!("package {}", spec.path)))?;
        let name = match spec.name {
            Some(ident) if ident.name.as_str() == "." => {
                return Err(unimplemented("dot import"));
            }
            Some(ident) => ident.name,
            None => pkg.name,
        };
        tracing::debug!(path = %spec.path, "import");
        env.define_binding(name, BindingKind::Package, Type::Invalid, Value::Package(pkg))?;
        Ok(Value::Str(Arc::clone(&spec.path)))
    }

    /// `func f(...)` or `func (r T) m(...)`.
    fn exec_func_decl(&mut self, decl: &FuncDecl, env: &Environment) -> Result<(), EvalError> {
        let name = decl.name.name;
        let lit = Arc::new(func_lit(decl)?);
        let Some(recv) = &decl.recv else {
            let f = self.closure(name, &lit, None, env)?;
            env.define_binding(name, BindingKind::Func, Type::Func(f.ty.clone()), Value::Func(f))?;
            return Ok(());
        };
        let recv_ty = self.resolve_type(&recv.ty, env)?;
        let (named, pointer_recv) = match &recv_ty {
            Type::Named(n) => (Arc::clone(n), false),
            Type::Pointer(elem) => match &**elem {
                Type::Named(n) => (Arc::clone(n), true),
                _ => return Err(unimplemented(format!("method on {recv_ty}"))),
            },
            _ => return Err(unimplemented(format!("method on {recv_ty}"))),
        };
        let func = self.closure(name, &lit, Some(recv), env)?;
        named.set_method(name, Method { func, pointer_recv });
        Ok(())
    }

    /// `~macro m(args) result { body }`: a function over syntax, bound as a
    /// macro.
    fn exec_macro_decl(&mut self, decl: &FuncDecl, env: &Environment) -> Result<(), EvalError> {
        if decl.recv.is_some() {
            return Err(type_mismatch("macro cannot have a receiver"));
        }
        let name = decl.name.name;
        let lit = Arc::new(func_lit(decl)?);
        let func = self.closure(name, &lit, None, env)?;
        env.define_binding(
            name,
            BindingKind::Macro,
            Type::Invalid,
            Value::Macro(MacroValue { name, func }),
        )?;
        Ok(())
    }
}

/// The literal a declared function's closure runs.
pub(crate) fn func_lit(decl: &FuncDecl) -> Result<FuncLit, EvalError> {
    let body = decl
        .body
        .clone()
        .ok_or_else(|| unimplemented(format!("function {} without body", decl.name.name)))?;
    Ok(FuncLit {
        ty: decl.ty.clone(),
        body,
        span: decl.span,
    })
}
