use crate::errors::{EvalError, EvalErrorKind};
use crate::interpreter::Interpreter;
use crate::print_handler::silent_handler;
use crate::types::IntKind;
use crate::value::{Value, Values};
use pretty_assertions::assert_eq;
use quasi_ir::Node;
use smallvec::smallvec;

fn interpreter() -> Interpreter {
    Interpreter::builder().print_handler(silent_handler()).build()
}

fn eval(interp: &mut Interpreter, src: &str) -> Result<Values, EvalError> {
    let block = quasi_parse::parse_source(src).unwrap_or_else(|e| panic!("parse {src:?}: {e}"));
    interp.eval_ast(Node::from(block))
}

fn run(src: &str) -> Values {
    eval(&mut interpreter(), src).unwrap_or_else(|e| panic!("eval {src:?}: {e}"))
}

/// The syntax `src` parses to.
fn syntax(src: &str) -> Value {
    let block = quasi_parse::parse_source(src).unwrap_or_else(|e| panic!("parse {src:?}: {e}"));
    Value::Syntax(block.into_node())
}

const SECOND_ARG: &str = "~macro second_arg(a, b, c interface{}) interface{} { return b }\n";

#[test]
fn quote_yields_its_body_unevaluated() {
    assert_eq!(run("~quote{7}"), Values::from_elem(syntax("7"), 1));
    assert_eq!(run("~quote{x}"), Values::from_elem(syntax("x"), 1));
    assert_eq!(run(r#"~'{"foo" + "bar"}"#), Values::from_elem(syntax(r#""foo" + "bar""#), 1));
}

#[test]
fn quote_of_several_statements_is_a_block() {
    assert_eq!(run("var ab = ~quote{a; b}; ab"), Values::from_elem(syntax("a; b"), 1));
}

#[test]
fn unquote_is_replaced_by_its_value() {
    assert_eq!(run("~quasiquote{1 + ~unquote{2 + 3}}"), Values::from_elem(syntax("1 + 5"), 1));
    assert_eq!(run(r#"~"{2 * ~,{3 << 1}}"#), Values::from_elem(syntax("2 * 6"), 1));
}

#[test]
fn unquote_sees_local_variables() {
    let got = run("x := int8(-3); ~quasiquote{y + ~unquote{x}}");
    assert_eq!(got, Values::from_elem(syntax("y + int8(-3)"), 1));
}

#[test]
fn unquote_splice_inserts_block_statements() {
    let src = "ab := ~'{a; b}\n~quasiquote{~unquote_splice ab; c}";
    assert_eq!(run(src), Values::from_elem(syntax("a; b; c"), 1));
    let src = "ab := ~'{a; b}\n~\"{zero; ~,@ab; one}";
    assert_eq!(run(src), Values::from_elem(syntax("zero; a; b; one"), 1));
}

#[test]
fn unquote_splice_into_call_arguments() {
    let src = "args := ~'{x; y}\n~\"{f(~,@args, z)}";
    assert_eq!(run(src), Values::from_elem(syntax("f(x, y, z)"), 1));
}

#[test]
fn splice_of_nil_removes_the_element() {
    assert_eq!(run("~\"{~,@nil; x}"), Values::from_elem(syntax("x"), 1));
}

#[test]
fn nested_quasiquote_keeps_inner_unquote() {
    let got = run("~quasiquote{~quasiquote{~unquote{7}}}");
    assert_eq!(got, Values::from_elem(syntax("~quasiquote{~unquote{7}}"), 1));
}

#[test]
fn macro_declaration_yields_nothing_visible() {
    let got = run(&format!("{SECOND_ARG}0"));
    assert_eq!(got, Values::from_elem(Value::int(0), 1));
}

#[test]
fn statement_sequence_macro_consumes_following_statements() {
    let src = format!("{SECOND_ARG}var v uint32 = 98\nsecond_arg; 1; v; 3");
    assert_eq!(run(&src), Values::from_elem(Value::typed_int(IntKind::Uint32, 98), 1));
}

#[test]
fn macro_result_is_expanded_again() {
    let src = format!("{SECOND_ARG}second_arg; 1; {{second_arg; 2; 3; 4}}; 5");
    assert_eq!(run(&src), Values::from_elem(Value::int(3), 1));
}

#[test]
fn macro_call_form_passes_argument_syntax() {
    let src = format!("{SECOND_ARG}second_arg(undefined1, 7 * 6, undefined2)");
    assert_eq!(run(&src), Values::from_elem(Value::int(42), 1));
}

#[test]
fn macro_inside_function_body_is_expanded_at_declaration() {
    let src = format!("{SECOND_ARG}func f() int {{ return second_arg(0, 11, 0) }}\nf()");
    assert_eq!(run(&src), Values::from_elem(Value::int(11), 1));
}

#[test]
fn self_expanding_macro_overflows() {
    let mut interp = Interpreter::builder()
        .print_handler(silent_handler())
        .max_macro_expansions(16)
        .build();
    let err = eval(&mut interp, "~macro again() interface{} { return ~quote{again()} }\nagain()")
        .expect_err("expansion should not terminate");
    assert_eq!(err.kind, EvalErrorKind::MacroExpansionOverflow { limit: 16 });
}

#[test]
fn macroexpand1_rewrites_once() {
    let src = format!("{SECOND_ARG}MacroExpand1(~quote{{second_arg(1, second_arg(4, 5, 6), 3)}})");
    let expected: Values = smallvec![syntax("second_arg(4, 5, 6)"), Value::Bool(true)];
    assert_eq!(run(&src), expected);
}

#[test]
fn macroexpand_reports_non_macro() {
    let expected: Values = smallvec![syntax("1 + 2"), Value::Bool(false)];
    assert_eq!(run("MacroExpand(~quote{1 + 2})"), expected);
}

#[test]
fn eval_of_quoted_syntax() {
    let expected: Values = smallvec![Value::int(3), Value::int(4), Value::int(5)];
    assert_eq!(run("Values(3, 4, 5)"), expected);
    assert_eq!(run("Eval(~quote{Values(3, 4, 5)})"), expected);
    assert_eq!(run("Eval(Values(3, 4, 5))"), Values::from_elem(Value::int(3), 1));
}
