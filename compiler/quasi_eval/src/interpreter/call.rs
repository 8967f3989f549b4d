//! Function calls, call frames, `defer`, `recover` and `go`.

use super::{Deferred, Frame, Interpreter};
use crate::builtins::call_builtin;
use crate::convert::assign_convert;
use crate::environment::{BindingKind, Environment};
use crate::errors::{
    arity_mismatch, invalid_operation, stack_overflow, type_mismatch, ControlAction, EvalError,
    EvalResult,
};
use crate::types::{FuncType, Type};
use crate::value::{Closure, FuncImpl, FunctionValue, SliceValue, Value, Values};
use quasi_ir::{Name, Span};
use quasi_stack::ensure_sufficient_stack;
use smallvec::smallvec;

/// How a frame ended once its deferred calls have run.
pub(crate) enum Exit {
    /// The body finished (`returned == false`) or executed `return`.
    Done { values: Values, returned: bool },
    /// The body panicked and a deferred call recovered.
    Recovered,
}

impl Interpreter {
    /// Run `body` in a new call frame, then its deferred calls in reverse
    /// order.
    ///
    /// Panics are parked in the frame while defers run so `recover` can take
    /// them; a panic raised by a deferred call replaces the current one.
    /// Hard errors are never observed by `recover`, but the registered
    /// defers still run before the error propagates.
    pub(crate) fn run_frame(
        &mut self,
        name: Name,
        result_count: usize,
        body: impl FnOnce(&mut Self) -> EvalResult<Values>,
    ) -> EvalResult<Exit> {
        let deferred_call = std::mem::take(&mut self.next_call_deferred);
        if self.frames.len() >= self.shared.max_call_depth {
            return Err(stack_overflow(self.shared.max_call_depth).into());
        }
        self.frames.push(Frame::new(name, result_count, deferred_call));
        let (exit, mut failure) = match body(self) {
            Ok(values) => (
                Some(Exit::Done {
                    values,
                    returned: false,
                }),
                None,
            ),
            Err(ControlAction::Return(values)) => (
                Some(Exit::Done {
                    values,
                    returned: true,
                }),
                None,
            ),
            Err(ControlAction::Panic(value)) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.panic = Some(value);
                }
                (None, None)
            }
            Err(other) => (None, Some(other.into_error())),
        };
        if let Some(err) = self.run_defers() {
            failure.get_or_insert(err);
        }
        let frame = self.frames.pop();
        if let Some(err) = failure {
            return Err(err.into());
        }
        if let Some(value) = frame.and_then(|f| f.panic) {
            return Err(ControlAction::Panic(value));
        }
        Ok(exit.unwrap_or(Exit::Recovered))
    }

    /// Run the current frame's deferred calls, returning the first hard
    /// error any of them raised.
    fn run_defers(&mut self) -> Option<EvalError> {
        let mut failure = None;
        while let Some(deferred) = self.frames.last_mut().and_then(|f| f.defers.pop()) {
            self.next_call_deferred = true;
            let result = self.call_function(
                &deferred.func,
                deferred.args,
                deferred.spread,
                &deferred.env,
            );
            self.next_call_deferred = false;
            match result {
                Ok(_) => {}
                Err(ControlAction::Panic(value)) => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.panic = Some(value);
                    }
                }
                Err(other) => {
                    let err = other.into_error().with_span_if_missing(deferred.span);
                    failure.get_or_insert(err);
                }
            }
        }
        failure
    }

    /// Register a deferred call in the current frame.
    pub(crate) fn push_defer(&mut self, deferred: Deferred) -> Result<(), EvalError> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.defers.push(deferred);
                Ok(())
            }
            None => Err(invalid_operation("defer outside function")),
        }
    }

    /// Number of results of the innermost function.
    pub(crate) fn current_result_count(&self) -> usize {
        self.frames.last().map_or(0, |f| f.result_count)
    }

    /// Call `func` with evaluated arguments.
    pub(crate) fn call_function(
        &mut self,
        func: &FunctionValue,
        mut args: Vec<Value>,
        spread: bool,
        env: &Environment,
    ) -> EvalResult<Values> {
        let Some(imp) = &func.imp else {
            return Err(invalid_operation("call of nil function").into());
        };
        match imp {
            FuncImpl::Builtin(b) => {
                self.next_call_deferred = false;
                call_builtin(self, *b, args, spread, env)
            }
            FuncImpl::Native(native) => {
                self.next_call_deferred = false;
                if spread {
                    if let Some(Value::Slice(rest)) = args.pop() {
                        args.extend(rest.to_vec());
                    }
                }
                let args = args
                    .into_iter()
                    .map(Value::defaulted)
                    .collect::<Result<Vec<_>, _>>()?;
                (native.call)(self, args).map_err(Into::into)
            }
            FuncImpl::Bound(bound) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(bound.recv.clone());
                full.extend(args);
                self.call_function(&bound.func, full, spread, env)
            }
            FuncImpl::Closure(closure) => {
                let args = bind_args(&func.ty, args, spread, closure.name)?;
                self.call_closure(closure, &func.ty, args)
            }
            FuncImpl::Compiled(compiled) => {
                let args = bind_args(&func.ty, args, spread, compiled.name)?;
                compiled.invoke(self, &func.ty, args)
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(func = %closure.name))]
    fn call_closure(
        &mut self,
        closure: &Closure,
        ty: &FuncType,
        args: Vec<Value>,
    ) -> EvalResult<Values> {
        let env = closure.env.child();
        bind_params(&env, &closure.params, &closure.results, ty, args)?;
        let exit = self.run_frame(closure.name, ty.results.len(), |interp| {
            let outcome =
                ensure_sufficient_stack(|| interp.exec_stmts(&closure.lit.body.stmts, &env));
            store_named_results(outcome, &closure.results, ty, &env)
        })?;
        finish_results(exit, ty, &closure.results, &env)
    }

    /// `go f(args)`: run the call on its own thread. A panic that escapes the
    /// goroutine ends it and is logged.
    pub(crate) fn spawn_goroutine(
        &mut self,
        func: FunctionValue,
        args: Vec<Value>,
        spread: bool,
        env: &Environment,
    ) -> Result<(), EvalError> {
        let mut interp = self.spawn_clone();
        let env = env.clone();
        let name = func.name();
        std::thread::Builder::new()
            .name(format!("goroutine {name}"))
            .spawn(move || {
                let outcome = interp.run_frame(Name::intern("goroutine"), 0, |interp| {
                    interp.call_function(&func, args, spread, &env)
                });
                if let Err(action) = outcome {
                    let err = action.into_error();
                    tracing::warn!(goroutine = %name, error = %err, "goroutine terminated");
                }
            })
            .map(|_| ())
            .map_err(|e| invalid_operation(format!("cannot start goroutine: {e}")))
    }
}

/// Check arity and convert arguments to the parameter types, packing the
/// variadic tail into a slice unless the call spreads one (`f(xs...)`).
pub(crate) fn bind_args(
    ty: &FuncType,
    args: Vec<Value>,
    spread: bool,
    name: Name,
) -> Result<Vec<Value>, EvalError> {
    let params = &ty.params;
    if !ty.variadic {
        if spread {
            return Err(type_mismatch(format!(
                "have (...) arguments in call to non-variadic function {name}"
            )));
        }
        if args.len() != params.len() {
            return Err(arity_mismatch(name, params.len(), args.len()));
        }
        return args
            .into_iter()
            .zip(params)
            .map(|(v, t)| assign_convert(v, t))
            .collect();
    }
    let fixed = params.len().saturating_sub(1);
    if spread {
        if args.len() != params.len() {
            return Err(arity_mismatch(name, params.len(), args.len()));
        }
        return args
            .into_iter()
            .zip(params)
            .map(|(v, t)| assign_convert(v, t))
            .collect();
    }
    if args.len() < fixed {
        return Err(arity_mismatch(name, fixed, args.len()));
    }
    let elem = params
        .last()
        .and_then(Type::elem)
        .unwrap_or_else(Type::any);
    let mut args = args.into_iter();
    let mut bound = Vec::with_capacity(params.len());
    for t in &params[..fixed] {
        if let Some(v) = args.next() {
            bound.push(assign_convert(v, t)?);
        }
    }
    let rest = args
        .map(|v| assign_convert(v, &elem))
        .collect::<Result<Vec<_>, _>>()?;
    bound.push(Value::Slice(if rest.is_empty() {
        SliceValue::nil(elem)
    } else {
        SliceValue::from_vec(elem, rest)
    }));
    Ok(bound)
}

/// Define parameters and zeroed named results in a fresh call scope.
pub(crate) fn bind_params(
    env: &Environment,
    params: &[Name],
    results: &[Name],
    ty: &FuncType,
    args: Vec<Value>,
) -> Result<(), EvalError> {
    for ((name, value), t) in params.iter().zip(args).zip(&ty.params) {
        env.define_binding(*name, BindingKind::Var, t.clone(), value)?;
    }
    for (name, t) in results.iter().zip(&ty.results) {
        env.define_binding(*name, BindingKind::Var, t.clone(), Value::zero(t))?;
    }
    Ok(())
}

/// With named results, `return a, b` assigns the named variables before
/// deferred calls run, so defers observe and may change them.
pub(crate) fn store_named_results(
    outcome: EvalResult<Values>,
    results: &[Name],
    ty: &FuncType,
    env: &Environment,
) -> EvalResult<Values> {
    match outcome {
        Err(ControlAction::Return(values)) if !results.is_empty() && !values.is_empty() => {
            let values = convert_results(values, ty)?;
            for (name, value) in results.iter().zip(values) {
                if !name.is_blank() {
                    env.assign(*name, value)?;
                }
            }
            Err(ControlAction::Return(Values::new()))
        }
        other => other,
    }
}

/// The values a finished call returns to its caller.
pub(crate) fn finish_results(
    exit: Exit,
    ty: &FuncType,
    results: &[Name],
    env: &Environment,
) -> EvalResult<Values> {
    if !results.is_empty() {
        return Ok(results
            .iter()
            .zip(&ty.results)
            .map(|(name, t)| {
                if name.is_blank() {
                    Value::zero(t)
                } else {
                    env.lookup(*name).unwrap_or_else(|_| Value::zero(t))
                }
            })
            .collect());
    }
    match exit {
        Exit::Recovered => Ok(ty.results.iter().map(Value::zero).collect()),
        Exit::Done {
            values,
            returned: true,
        } => convert_results(values, ty).map_err(Into::into),
        Exit::Done {
            values,
            returned: false,
        } => {
            if ty.results.is_empty() {
                Ok(Values::new())
            } else if values.len() == ty.results.len() {
                // a body ending in an expression yields it
                convert_results(values, ty).map_err(Into::into)
            } else {
                Err(type_mismatch("missing return").into())
            }
        }
    }
}

fn convert_results(values: Values, ty: &FuncType) -> Result<Values, EvalError> {
    if values.len() != ty.results.len() {
        let what = if values.len() > ty.results.len() {
            "too many"
        } else {
            "not enough"
        };
        return Err(type_mismatch(format!(
            "{what} return values: have {}, want {}",
            values.len(),
            ty.results.len()
        )));
    }
    values
        .into_iter()
        .zip(&ty.results)
        .map(|(v, t)| assign_convert(v, t))
        .collect()
}

/// A call with its callee and arguments evaluated, used by `defer` and
/// `go`.
pub(crate) struct PreparedCall {
    pub func: FunctionValue,
    pub args: Vec<Value>,
    pub spread: bool,
}

impl PreparedCall {
    pub(crate) fn into_deferred(self, env: &Environment, span: Span) -> Deferred {
        Deferred {
            func: self.func,
            args: self.args,
            spread: self.spread,
            env: env.clone(),
            span,
        }
    }
}

/// Single-element result list.
pub(crate) fn single(v: Value) -> Values {
    smallvec![v]
}
