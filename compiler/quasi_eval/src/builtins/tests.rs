use super::*;
use crate::errors::EvalErrorKind;
use crate::print_handler::{buffer_handler, silent_handler};
use crate::types::IntKind;
use pretty_assertions::assert_eq;
use quasi_ir::Node;

fn eval_with(interp: &mut Interpreter, src: &str) -> Result<Values, EvalError> {
    let block = quasi_parse::parse_source(src).unwrap_or_else(|e| panic!("parse {src:?}: {e}"));
    interp.eval_ast(Node::from(block))
}

fn eval(src: &str) -> Result<Values, EvalError> {
    let mut interp = Interpreter::builder().print_handler(silent_handler()).build();
    eval_with(&mut interp, src)
}

fn run(src: &str) -> Vec<Value> {
    eval(src)
        .unwrap_or_else(|e| panic!("eval {src:?}: {e}"))
        .into_vec()
}

fn fail(src: &str) -> EvalError {
    match eval(src) {
        Ok(values) => panic!("{src:?} should fail, got {values:?}"),
        Err(err) => err,
    }
}

fn output(src: &str) -> String {
    let print = buffer_handler();
    let mut interp = Interpreter::builder().print_handler(print.clone()).build();
    eval_with(&mut interp, src).unwrap_or_else(|e| panic!("eval {src:?}: {e}"));
    print.get_output()
}

#[test]
fn names_are_unique() {
    let mut names: Vec<&str> = Builtin::ALL.iter().map(|b| b.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), Builtin::ALL.len());
}

#[test]
fn only_output_and_values_spread_a_call() {
    let spreading: Vec<Builtin> = Builtin::ALL
        .into_iter()
        .filter(|b| b.spreads_call_argument())
        .collect();
    assert_eq!(spreading, vec![Builtin::Print, Builtin::Println, Builtin::Values]);
}

mod sizes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn len_and_cap_of_made_slice() {
        assert_eq!(run("s := make([]int, 2, 5); Values(len(s), cap(s))"), vec![Value::int(2), Value::int(5)]);
    }

    #[test]
    fn len_of_string_counts_bytes() {
        assert_eq!(run(r#"len("héllo")"#), vec![Value::int(6)]);
    }

    #[test]
    fn len_of_map_and_channel() {
        let src = "m := map[int]bool{1: true, 2: false}; c := make(chan int, 3); c <- 1; Values(len(m), len(c), cap(c))";
        assert_eq!(run(src), vec![Value::int(2), Value::int(1), Value::int(3)]);
    }

    #[test]
    fn len_of_nil_values_is_zero() {
        assert_eq!(run("var s []int; var m map[string]int; Values(len(s), len(m))"), vec![Value::int(0), Value::int(0)]);
    }

    #[test]
    fn wrong_arity() {
        let err = fail("len()");
        assert!(matches!(err.kind, EvalErrorKind::ArityMismatch { .. }));
    }

    #[test]
    fn len_of_int_is_invalid() {
        let err = fail("len(3)");
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }
}

mod slices {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_values() {
        assert_eq!(run("s := []int{1}; s = append(s, 2, 3); s").iter().map(ToString::to_string).collect::<Vec<_>>(), vec!["[1 2 3]"]);
    }

    #[test]
    fn append_spread() {
        let got = run("a := []int{1}; b := []int{2, 3}; a = append(a, b...); Values(len(a), a[2])");
        assert_eq!(got, vec![Value::int(3), Value::int(3)]);
    }

    #[test]
    fn append_converts_constants_to_element_type() {
        let got = run("s := []int8{}; s = append(s, 5); s[0]");
        assert_eq!(got, vec![Value::typed_int(IntKind::Int8, 5)]);
    }

    #[test]
    fn append_rejects_unrepresentable_constant() {
        let err = fail("s := []uint8{}; s = append(s, 256)");
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn copy_counts_shorter_side() {
        let got = run("dst := make([]int, 2); n := copy(dst, []int{7, 8, 9}); Values(n, dst[1])");
        assert_eq!(got, vec![Value::int(2), Value::int(8)]);
    }

    #[test]
    fn make_with_negative_size() {
        let err = fail("make([]int, -1)");
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }

    #[test]
    fn make_with_len_above_cap() {
        let err = fail("make([]int, 4, 2)");
        assert!(err.message.contains("len larger than cap"), "{}", err.message);
    }

    #[test]
    fn make_of_scalar_type() {
        let err = fail("make(int)");
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }

    #[test]
    fn spread_only_for_append() {
        let err = fail("xs := []int{1}; len(xs...)");
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }
}

mod maps_and_pointers {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn delete_removes_key() {
        let got = run(r#"m := map[string]int{"a": 1, "b": 2}; delete(m, "a"); Values(len(m), m["b"])"#);
        assert_eq!(got, vec![Value::int(1), Value::int(2)]);
    }

    #[test]
    fn delete_missing_key_is_noop() {
        assert_eq!(run(r#"m := map[string]int{}; delete(m, "x"); len(m)"#), vec![Value::int(0)]);
    }

    #[test]
    fn new_allocates_zero_value() {
        assert_eq!(run("p := new(int); a := *p; *p = 5; Values(a, *p)"), vec![Value::int(0), Value::int(5)]);
    }
}

mod numbers {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::types::{ComplexKind, FloatKind};

    #[test]
    fn complex_of_constants() {
        let got = run("c := complex(1.5, 2); Values(real(c), imag(c))");
        assert_eq!(got, vec![Value::float64(1.5), Value::float64(2.0)]);
    }

    #[test]
    fn complex_of_float32_is_complex64() {
        let got = run("var f float32 = 1; complex(f, 2)");
        assert_eq!(got, vec![Value::complex(ComplexKind::C64, 1.0, 2.0)]);
        assert_eq!(got[0].type_of(), Type::Complex(ComplexKind::C64));
    }

    #[test]
    fn real_of_typed_complex() {
        let got = run("var c complex128 = complex(3, 4); real(c)");
        assert_eq!(got, vec![Value::Float(FloatValue::new(FloatKind::F64, 3.0))]);
    }

    #[test]
    fn min_and_max_of_constants() {
        assert_eq!(run("min(3, 1, 2)"), vec![Value::int(1)]);
        assert_eq!(run("max(1, 2.5)"), vec![Value::float64(2.5)]);
    }

    #[test]
    fn min_and_max_take_the_typed_operand_type() {
        assert_eq!(run("x := int8(5); max(x, 7)"), vec![Value::typed_int(IntKind::Int8, 7)]);
        assert_eq!(run(r#"min("b", "a", "c")"#), vec![Value::string("a")]);
    }
}

mod channels {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn close_nil_channel() {
        let err = fail("var c chan int; close(c)");
        assert!(matches!(err.kind, EvalErrorKind::ChannelClosed { .. }));
    }

    #[test]
    fn close_twice() {
        let err = fail("c := make(chan int); close(c); close(c)");
        assert_eq!(err.message, "close of closed channel");
    }

    #[test]
    fn receive_after_close_drains_buffer() {
        let got = run("c := make(chan int, 1); c <- 4; close(c); a, ok1 := <-c; b, ok2 := <-c; Values(a, ok1, b, ok2)");
        assert_eq!(got, vec![Value::int(4), Value::Bool(true), Value::int(0), Value::Bool(false)]);
    }
}

mod output {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn println_separates_with_spaces() {
        assert_eq!(output(r#"println(1, "a", 2.5, true)"#), "1 a 2.5 true\n");
    }

    #[test]
    fn print_concatenates() {
        assert_eq!(output(r#"print("a", 1); print("b")"#), "a1b");
    }

    #[test]
    fn println_spreads_a_call() {
        let src = "func two() (int, string) { return 7, \"x\" }\nprintln(two())";
        assert_eq!(output(src), "7 x\n");
    }

    #[test]
    fn composite_formatting() {
        let src = r#"println([]int{1, 2}, map[string]int{"k": 3}, [2]bool{})"#;
        assert_eq!(output(src), "[1 2] map[k:3] [false false]\n");
    }
}

mod reflection {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn values_returns_all_arguments() {
        assert_eq!(run(r#"Values(1, "two")"#), vec![Value::int(1), Value::string("two")]);
        assert_eq!(run("Values()"), Vec::<Value>::new());
    }

    #[test]
    fn eval_runs_syntax_in_calling_scope() {
        assert_eq!(run("x := 3; Eval(~quote{x + 1})"), vec![Value::int(4)]);
    }

    #[test]
    fn eval_of_plain_value_is_identity() {
        assert_eq!(run("Eval(5)"), vec![Value::int(5)]);
    }

    #[test]
    fn panic_escapes_as_user_panic() {
        let err = fail(r#"panic("boom")"#);
        assert_eq!(err.kind, EvalErrorKind::UserPanic { message: "boom".to_string() });
        assert_eq!(err.panic_value, Some(Value::string("boom")));
    }

    #[test]
    fn recover_outside_defer_is_nil() {
        assert_eq!(run("recover()"), vec![Value::Nil]);
    }
}
