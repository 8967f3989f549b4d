use super::*;
use crate::value::Value;
use pretty_assertions::assert_eq;
use quasi_ir::Span;

#[test]
fn factory_messages() {
    assert_eq!(undefined_name("x").message, "undefined: x");
    assert_eq!(duplicate_binding("x").message, "x redeclared in this block");
    assert_eq!(division_by_zero().message, "integer divide by zero");
    assert_eq!(
        index_out_of_range(5, 3).message,
        "index out of range [5] with length 3"
    );
    assert_eq!(
        arity_mismatch("f", 2, 1).message,
        "not enough arguments in call to f: have 1, want 2"
    );
    assert_eq!(
        arity_mismatch("", 1, 3).message,
        "too many arguments in call: have 3, want 1"
    );
    assert_eq!(unimplemented("goto").message, "unimplemented goto");
}

#[test]
fn user_panic_keeps_value() {
    let err = user_panic(Value::int(-3));
    assert!(err.is_user_panic());
    assert_eq!(err.message, "panic: -3");
    assert_eq!(err.panic_value, Some(Value::int(-3)));
}

#[test]
fn span_if_missing_keeps_innermost() {
    let inner = Span::new(4, 9);
    let err = division_by_zero()
        .with_span_if_missing(inner)
        .with_span_if_missing(Span::new(0, 20));
    assert_eq!(err.span, Some(inner));
    assert_eq!(division_by_zero().with_span_if_missing(Span::DUMMY).span, None);
}

#[test]
fn escaped_control_becomes_error() {
    let err = ControlAction::Break(None).into_error();
    assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    let err = ControlAction::Panic(Value::string("boom")).into_error();
    assert_eq!(err.message, "panic: boom");
    let err = ControlAction::from(channel_closed("send on closed channel")).into_error();
    assert_eq!(err.kind, EvalErrorKind::ChannelClosed {
        message: "send on closed channel".into()
    });
}
