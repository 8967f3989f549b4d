//! Evaluation errors and non-local control flow.
//!
//! [`EvalError`] is what callers of the engine see: a structured
//! [`EvalErrorKind`], a formatted message, the source span of the failing
//! statement and, for user panics, the raw panic value.
//!
//! [`ControlAction`] is the channel both evaluators use to unwind: errors,
//! in-flight panics, `return`, `break`, `continue`, `goto` and `fallthrough`
//! all travel through the `Err` side of [`EvalResult`] until the construct
//! that consumes them.

use crate::value::{Value, Values};
use quasi_ir::{Name, Span};

/// Structured error category.
///
/// The first nine variants are the error kinds callers match on. The rest
/// refine `TypeMismatch`-like failures that have their own natural message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("undefined: {name}")]
    UndefinedName { name: String },

    #[error("{name} redeclared in this block")]
    DuplicateBinding { name: String },

    #[error("{message}")]
    TypeMismatch { message: String },

    #[error("unimplemented {construct}")]
    UnimplementedConstruct { construct: String },

    #[error("macro expansion exceeded {limit} rewrites")]
    MacroExpansionOverflow { limit: usize },

    #[error("index out of range [{index}] with length {len}")]
    IndexOutOfRange { index: i128, len: usize },

    #[error("integer divide by zero")]
    DivisionByZero,

    #[error("{message}")]
    ChannelClosed { message: String },

    #[error("panic: {message}")]
    UserPanic { message: String },

    #[error("cannot call non-function {what}")]
    NotCallable { what: String },

    #[error("{}", arity_message(name, *expected, *got))]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("maximum call depth exceeded (limit: {depth})")]
    StackOverflow { depth: usize },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

fn arity_message(name: &str, expected: usize, got: usize) -> String {
    let what = if got < expected {
        "not enough"
    } else {
        "too many"
    };
    if name.is_empty() {
        format!("{what} arguments in call: have {got}, want {expected}")
    } else {
        format!("{what} arguments in call to {name}: have {got}, want {expected}")
    }
}

/// Evaluation error.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()` for factory errors.
    pub message: String,
    /// Location of the statement that failed, when known.
    pub span: Option<Span>,
    /// The value passed to `panic`, for `UserPanic`.
    pub panic_value: Option<Value>,
}

impl EvalError {
    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        EvalError {
            kind,
            message,
            span: None,
            panic_value: None,
        }
    }

    /// Attach a source span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach `span` unless an inner statement already did.
    #[must_use]
    pub fn with_span_if_missing(mut self, span: Span) -> Self {
        if self.span.is_none() && !span.is_dummy() {
            self.span = Some(span);
        }
        self
    }

    /// Whether a deferred `recover()` may observe this error. Only user
    /// panics are recoverable.
    pub fn is_user_panic(&self) -> bool {
        matches!(self.kind, EvalErrorKind::UserPanic { .. })
    }
}

#[cold]
pub fn undefined_name(name: impl std::fmt::Display) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedName {
        name: name.to_string(),
    })
}

#[cold]
pub fn duplicate_binding(name: impl std::fmt::Display) -> EvalError {
    EvalError::from_kind(EvalErrorKind::DuplicateBinding {
        name: name.to_string(),
    })
}

#[cold]
pub fn type_mismatch(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        message: message.into(),
    })
}

/// `cannot use <what> (type <have>) as type <want>`.
#[cold]
pub fn cannot_use(what: impl std::fmt::Display, have: impl std::fmt::Display, want: impl std::fmt::Display) -> EvalError {
    type_mismatch(format!("cannot use {what} (type {have}) as type {want}"))
}

#[cold]
pub fn unimplemented(construct: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnimplementedConstruct {
        construct: construct.into(),
    })
}

#[cold]
pub fn macro_overflow(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MacroExpansionOverflow { limit })
}

#[cold]
pub fn index_out_of_range(index: i128, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfRange { index, len })
}

/// Slice bounds violation, reported under `IndexOutOfRange`.
#[cold]
pub fn slice_bounds(low: usize, high: usize, cap: usize) -> EvalError {
    let mut err = index_out_of_range(high as i128, cap);
    err.message = format!("slice bounds out of range [{low}:{high}] with capacity {cap}");
    err
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn channel_closed(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ChannelClosed {
        message: message.into(),
    })
}

/// A panic that escaped every deferred `recover`.
#[cold]
pub fn user_panic(value: Value) -> EvalError {
    let mut err = EvalError::from_kind(EvalErrorKind::UserPanic {
        message: value.to_string(),
    });
    err.panic_value = Some(value);
    err
}

#[cold]
pub fn not_callable(what: impl std::fmt::Display) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        what: what.to_string(),
    })
}

#[cold]
pub fn arity_mismatch(name: impl std::fmt::Display, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn invalid_operation(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperation {
        message: message.into(),
    })
}

/// Non-local control flow.
///
/// Everything that leaves a statement other than by falling off its end.
/// `Panic` carries the in-flight value so deferred calls can `recover` it;
/// `Error` carries a hard failure that `recover` never observes.
#[derive(Clone, Debug)]
pub enum ControlAction {
    Error(Box<EvalError>),
    Panic(Value),
    Return(Values),
    Break(Option<Name>),
    Continue(Option<Name>),
    Goto(Name),
    Fallthrough,
}

impl ControlAction {
    /// Attach a span to a contained error that has none.
    #[must_use]
    pub fn with_span_if_missing(self, span: Span) -> Self {
        match self {
            ControlAction::Error(err) => {
                ControlAction::Error(Box::new(err.with_span_if_missing(span)))
            }
            other => other,
        }
    }

    /// Convert a control action that escaped every construct able to
    /// consume it into the error a caller sees.
    pub fn into_error(self) -> EvalError {
        match self {
            ControlAction::Error(err) => *err,
            ControlAction::Panic(value) => user_panic(value),
            ControlAction::Return(_) => invalid_operation("return outside function"),
            ControlAction::Break(None) => invalid_operation("break is not in a loop, switch, or select"),
            ControlAction::Continue(None) => invalid_operation("continue is not in a loop"),
            ControlAction::Break(Some(label))
            | ControlAction::Continue(Some(label))
            | ControlAction::Goto(label) => invalid_operation(format!("label {label} not defined")),
            ControlAction::Fallthrough => {
                invalid_operation("fallthrough statement out of place")
            }
        }
    }
}

impl From<EvalError> for ControlAction {
    fn from(err: EvalError) -> Self {
        ControlAction::Error(Box::new(err))
    }
}

/// Result of evaluating anything that may unwind.
pub type EvalResult<T = Value> = Result<T, ControlAction>;

#[cfg(test)]
mod tests;
