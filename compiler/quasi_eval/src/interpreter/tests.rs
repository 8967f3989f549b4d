use super::*;
use crate::errors::EvalErrorKind;
use crate::print_handler::{buffer_handler, silent_handler};
use crate::types::IntKind;
use pretty_assertions::assert_eq;

fn interpreter() -> Interpreter {
    Interpreter::builder().print_handler(silent_handler()).build()
}

fn eval(interp: &mut Interpreter, src: &str) -> Result<Values, EvalError> {
    let block = quasi_parse::parse_source(src).unwrap_or_else(|e| panic!("parse {src:?}: {e}"));
    interp.eval_ast(Node::from(block))
}

fn run(src: &str) -> Vec<Value> {
    eval(&mut interpreter(), src)
        .unwrap_or_else(|e| panic!("eval {src:?}: {e}"))
        .into_vec()
}

fn run1(src: &str) -> Value {
    let mut values = run(src);
    assert_eq!(values.len(), 1, "{src:?} yielded {values:?}");
    values.remove(0)
}

fn fail(src: &str) -> EvalError {
    match eval(&mut interpreter(), src) {
        Ok(values) => panic!("{src:?} should fail, got {values:?}"),
        Err(err) => err,
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::int).collect()
}

mod arithmetic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_integers_wrap() {
        assert_eq!(run1("var x int8 = 64; x + 64"), Value::typed_int(IntKind::Int8, -128));
        assert_eq!(run1("var u uint8 = 0; u - 1"), Value::typed_int(IntKind::Uint8, 255));
        assert_eq!(run1("var y int16 = -32768; -y"), Value::typed_int(IntKind::Int16, -32768));
    }

    #[test]
    fn untyped_constants_default_at_top_level() {
        assert_eq!(run1("1 + 2"), Value::int(3));
        assert_eq!(run1("7 / 2"), Value::int(3));
        assert_eq!(run1("7 / 2.0"), Value::float64(3.5));
        assert_eq!(run1(r#""foo" + "bar""#), Value::string("foobar"));
    }

    #[test]
    fn constants_are_approximate() {
        assert_eq!(run1("(0.1 + 0.2) / 3"), Value::float64((0.1 + 0.2) / 3.0));
    }

    #[test]
    fn mixed_int_and_rune_constants_are_int() {
        assert_eq!(run1("1 + 'A'"), Value::int(66));
    }

    #[test]
    fn huge_constant_shifted_back_into_range() {
        assert_eq!(run1("1 << 70 >> 68"), Value::int(4));
    }

    #[test]
    fn constant_overflow_on_typed_use() {
        let err = fail("var b byte = 300");
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn string_comparison_and_indexing() {
        assert_eq!(run(r#"s := "abc"; Values(s < "abd", s[1], len(s[1:]))"#), vec![
            Value::Bool(true),
            Value::typed_int(IntKind::Uint8, i128::from(b'b')),
            Value::int(2),
        ]);
    }

    #[test]
    fn op_assign_and_inc_dec() {
        assert_eq!(run("x := 5; x += 3; x *= 2; x--; y := 1; y <<= 4; Values(x, y)"), ints(&[15, 16]));
    }

    #[test]
    fn short_circuit() {
        let src = "n := 0; f := func() bool { n++; return true }; a := false && f(); b := true || f(); Values(a, b, n)";
        assert_eq!(run(src), vec![Value::Bool(false), Value::Bool(true), Value::int(0)]);
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn for_loop_with_continue() {
        let src = "var i, j, k int
for i = 1; i <= 7; i = i + 1 {
    if i == 3 {
        j = i
        continue
    }
    k = k + i
}
Values(i, j, k)";
        assert_eq!(run(src), ints(&[8, 3, 25]));
    }

    #[test]
    fn labeled_break_leaves_outer_loop() {
        let src = "n := 0
outer:
for i := 0; i < 5; i++ {
    for j := 0; j < 5; j++ {
        if i*j == 6 {
            break outer
        }
        n++
    }
}
n";
        assert_eq!(run1(src), Value::int(13));
    }

    #[test]
    fn labeled_continue() {
        let src = "sum := 0
rows:
for i := 0; i < 3; i++ {
    for j := 0; j < 3; j++ {
        if j > i {
            continue rows
        }
        sum += j
    }
}
sum";
        assert_eq!(run1(src), Value::int(4));
    }

    #[test]
    fn goto_backwards() {
        let src = "func count() int {
    i := 0
again:
    i++
    if i < 4 {
        goto again
    }
    return i
}
count()";
        assert_eq!(run1(src), Value::int(4));
    }

    #[test]
    fn switch_with_fallthrough() {
        let src = "func grade(n int) string {
    s := \"\"
    switch {
    case n > 90:
        s += \"A\"
        fallthrough
    case n > 80:
        s += \"B\"
    default:
        s += \"C\"
    }
    return s
}
Values(grade(95), grade(85), grade(10))";
        assert_eq!(run(src), vec![Value::string("AB"), Value::string("B"), Value::string("C")]);
    }

    #[test]
    fn switch_on_tag_with_lists() {
        let src = "func kind(c rune) int {
    switch c {
    case 'a', 'e', 'i':
        return 1
    case ' ':
        return 2
    }
    return 0
}
Values(kind('e'), kind(' '), kind('z'))";
        assert_eq!(run(src), ints(&[1, 2, 0]));
    }

    #[test]
    fn range_over_slice_map_string() {
        let src = r#"total := 0
for i, v := range []int{10, 20, 30} {
    total += i * v
}
keys := 0
for k := range map[int]bool{1: true, 2: true, 4: true} {
    keys += k
}
runes := 0
for range "héllo" {
    runes++
}
Values(total, keys, runes)"#;
        assert_eq!(run(src), ints(&[80, 7, 5]));
    }

    #[test]
    fn range_over_integer() {
        assert_eq!(run1("s := 0; for i := range 5 { s += i }; s"), Value::int(10));
    }

    #[test]
    fn range_over_channel_until_closed() {
        let src = "c := make(chan int, 3); c <- 1; c <- 2; c <- 3; close(c); s := 0; for v := range c { s += v }; s";
        assert_eq!(run1(src), Value::int(6));
    }

    #[test]
    fn closures_share_the_loop_variable() {
        let src = "var fs []func() int
for i := 0; i < 3; i++ {
    fs = append(fs, func() int { return i })
}
Values(fs[0](), fs[1](), fs[2]())";
        assert_eq!(run(src), ints(&[3, 3, 3]));
    }

    #[test]
    fn if_with_init_scopes_its_variable() {
        let src = "x := 1; if x := 5; x > 3 { x = 7 }; x";
        assert_eq!(run1(src), Value::int(1));
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let err = fail("break");
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }
}

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recursion() {
        let src = "func fib(n int) int { if n < 2 { return n }; return fib(n-1) + fib(n-2) }\nfib(20)";
        assert_eq!(run1(src), Value::int(6765));
    }

    #[test]
    fn multiple_and_named_results() {
        let src = "func divmod(a, b int) (q, r int) { q = a / b; r = a % b; return }\nq, r := divmod(17, 5); Values(q, r)";
        assert_eq!(run(src), ints(&[3, 2]));
    }

    #[test]
    fn variadic_packing_and_spread() {
        let src = "func sum(xs ...int) int { t := 0; for _, x := range xs { t += x }; return t }
ns := []int{4, 5}
Values(sum(), sum(1, 2, 3), sum(ns...))";
        assert_eq!(run(src), ints(&[0, 6, 9]));
    }

    #[test]
    fn closure_counter() {
        let src = "func counter() func() int { n := 0; return func() int { n++; return n } }
c := counter(); c(); c()
d := counter()
Values(c(), d())";
        assert_eq!(run(src), ints(&[3, 1]));
    }

    #[test]
    fn arguments_are_evaluated_left_to_right() {
        let src = "order := \"\"
f := func(s string) int { order += s; return 0 }
g := func(a, b, c int) {}
g(f(\"a\"), f(\"b\"), f(\"c\"))
order";
        assert_eq!(run1(src), Value::string("abc"));
    }

    #[test]
    fn return_spreads_a_call() {
        let src = "func pair() (int, int) { return 1, 2 }\nfunc swap() (int, int) { a, b := pair(); return b, a }\nfunc again() (int, int) { return swap() }\nagain()";
        assert_eq!(run(src), ints(&[2, 1]));
    }

    #[test]
    fn wrong_argument_count() {
        let err = fail("func f(a int) int { return a }\nf(1, 2)");
        assert!(matches!(err.kind, EvalErrorKind::ArityMismatch { expected: 1, got: 2, .. }), "{err}");
    }

    #[test]
    fn calling_a_non_function() {
        let err = fail("x := 3; x()");
        assert!(matches!(err.kind, EvalErrorKind::NotCallable { .. }), "{err}");
    }

    #[test]
    fn call_depth_is_bounded() {
        let mut interp = Interpreter::builder()
            .print_handler(silent_handler())
            .max_call_depth(64)
            .build();
        let err = eval(&mut interp, "func down(n int) int { return down(n + 1) }\ndown(0)").unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::StackOverflow { depth: 64 });
    }

    #[test]
    fn host_call_of_interpreted_function() {
        let mut interp = interpreter();
        eval(&mut interp, "func add(a, b int) int { return a + b }").unwrap();
        let add = interp.lookup("add").unwrap();
        let got = interp.call(&add, vec![Value::int(2), Value::int(40)]).unwrap();
        assert_eq!(got.into_vec(), ints(&[42]));
    }
}

mod defer_and_recover {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defers_run_in_reverse_order() {
        let src = "out := \"\"
func f() {
    for i := 0; i < 3; i++ {
        defer func(n int) { out += string(rune('a' + n)) }(i)
    }
}
f()
out";
        assert_eq!(run1(src), Value::string("cba"));
    }

    #[test]
    fn defer_arguments_are_evaluated_at_defer_time() {
        let src = "got := 0
func f() { x := 1; defer func(v int) { got = v }(x); x = 2 }
f()
got";
        assert_eq!(run1(src), Value::int(1));
    }

    #[test]
    fn recover_captures_the_panic_value() {
        let src = "func f() (r interface{}) {
    defer func() { r = recover() }()
    panic(-3)
}
f()";
        assert_eq!(run1(src), Value::int(-3));
    }

    #[test]
    fn only_the_first_recover_sees_the_panic() {
        let src = "var seen []interface{}
func f() {
    defer func() { seen = append(seen, recover()) }()
    defer func() { seen = append(seen, recover()) }()
    defer func() { seen = append(seen, recover()) }()
    panic(-3)
}
f()
Values(len(seen), seen[0], seen[1], seen[2])";
        assert_eq!(run(src), vec![Value::int(3), Value::int(-3), Value::Nil, Value::Nil]);
    }

    #[test]
    fn recovered_function_returns_named_results() {
        let src = "func safe(a, b int) (q int, ok bool) {
    defer func() {
        if recover() != nil {
            q, ok = -1, false
        }
    }()
    if b == 0 {
        panic(\"zero\")
    }
    return a / b, true
}
x, okx := safe(6, 3)
y, oky := safe(1, 0)
Values(x, okx, y, oky)";
        assert_eq!(run(src), vec![Value::int(2), Value::Bool(true), Value::int(-1), Value::Bool(false)]);
    }

    #[test]
    fn panic_propagates_through_callers() {
        let src = "func inner() { panic(\"deep\") }
func outer() (r interface{}) { defer func() { r = recover() }(); inner(); return nil }
outer()";
        assert_eq!(run1(src), Value::string("deep"));
    }

    #[test]
    fn recover_in_nested_call_of_deferred_function_is_nil() {
        let src = "func helper() interface{} { return recover() }
func f() (got interface{}) {
    defer func() {
        got = helper()
        recover()
    }()
    panic(1)
}
f()";
        assert_eq!(run1(src), Value::Nil);
    }

    #[test]
    fn evaluator_faults_are_not_recoverable() {
        let src = "func f() (r interface{}) { defer func() { r = recover() }(); s := []int{}; return s[1] }\nf()";
        let err = fail(src);
        assert_eq!(err.kind, EvalErrorKind::IndexOutOfRange { index: 1, len: 0 });
    }

    #[test]
    fn defers_still_run_on_fault() {
        let mut interp = interpreter();
        let src = "ran := false\nfunc f() int { defer func() { ran = true }(); x := 0; return 1 / x }\nf()";
        let err = eval(&mut interp, src).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
        assert_eq!(interp.lookup("ran"), Some(Value::Bool(true)));
    }

    #[test]
    fn unrecovered_panic() {
        let err = fail("func f() { defer func() {}(); panic(42) }\nf()");
        assert!(err.is_user_panic());
        assert_eq!(err.message, "panic: 42");
        assert_eq!(err.panic_value, Some(Value::int(42)));
    }

    #[test]
    fn repanic_in_defer_replaces_value() {
        let src = "func f() { defer func() { recover(); panic(\"second\") }(); panic(\"first\") }
func g() (r interface{}) { defer func() { r = recover() }(); f(); return nil }
g()";
        assert_eq!(run1(src), Value::string("second"));
    }
}

mod composites {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyed_and_positional_literals() {
        let src = "a := [5]int{1, 3: 4}; s := []string{2: \"c\"}; Values(a[3], a[4], len(s), s[2])";
        assert_eq!(run(src), vec![Value::int(4), Value::int(0), Value::int(3), Value::string("c")]);
    }

    #[test]
    fn struct_fields_default_to_zero() {
        let src = "type P struct { X, Y int; Name string }\np := P{Y: 2}\nValues(p.X, p.Y, p.Name)";
        assert_eq!(run(src), vec![Value::int(0), Value::int(2), Value::string("")]);
    }

    #[test]
    fn arrays_and_structs_copy_on_assignment() {
        let src = "type P struct { X int }
a := [2]int{1, 2}; b := a; b[0] = 9
p := P{1}; q := p; q.X = 5
Values(a[0], p.X)";
        assert_eq!(run(src), ints(&[1, 1]));
    }

    #[test]
    fn slices_share_backing_storage() {
        let src = "a := []int{1, 2, 3}; b := a[1:]; b[0] = 7; a[1]";
        assert_eq!(run1(src), Value::int(7));
    }

    #[test]
    fn full_slice_expression_limits_capacity() {
        let src = "a := []int{0, 1, 2, 3, 4}; b := a[1:3:4]; c := append(b, 9, 9); c[0] = 100; Values(len(b), cap(b), a[1])";
        assert_eq!(run(src), ints(&[2, 3, 1]));
    }

    #[test]
    fn slice_bounds_checked() {
        let err = fail("a := []int{1, 2}; a[1:5]");
        assert!(matches!(err.kind, EvalErrorKind::IndexOutOfRange { .. }), "{err}");
    }

    #[test]
    fn map_comma_ok() {
        let src = r#"m := map[string]int{"a": 1}; v, ok := m["a"]; w, ok2 := m["b"]; Values(v, ok, w, ok2)"#;
        assert_eq!(run(src), vec![Value::int(1), Value::Bool(true), Value::int(0), Value::Bool(false)]);
    }

    #[test]
    fn assignment_to_nil_map_fails() {
        let err = fail(r#"var m map[string]int; m["a"] = 1"#);
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn pointers_to_struct_fields() {
        let src = "type P struct { X int }\np := &P{1}\nq := &p.X\n*q = 7\np.X";
        assert_eq!(run1(src), Value::int(7));
    }

    #[test]
    fn nested_elided_literal_types() {
        let src = "type P struct { X, Y int }\nps := []P{{1, 2}, {X: 3}}\nValues(ps[0].Y, ps[1].X)";
        assert_eq!(run(src), ints(&[2, 3]));
    }
}

mod types_and_methods {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHAPES: &str = "type Shape interface { Area() int }
type Rect struct { W, H int }
func (r Rect) Area() int { return r.W * r.H }
func (r *Rect) Grow(n int) { r.W += n; r.H += n }
";

    #[test]
    fn value_and_pointer_receivers() {
        let src = format!("{SHAPES}r := Rect{{2, 3}}\nr.Grow(1)\nr.Area()");
        assert_eq!(run1(&src), Value::int(12));
    }

    #[test]
    fn interface_dispatch() {
        let src = format!("{SHAPES}var s Shape = Rect{{4, 5}}\ns.Area()");
        assert_eq!(run1(&src), Value::int(20));
    }

    #[test]
    fn method_value_binds_receiver() {
        let src = format!("{SHAPES}r := Rect{{1, 1}}\narea := r.Area\nr.W = 10\narea()");
        assert_eq!(run1(&src), Value::int(1));
    }

    #[test]
    fn method_expression_takes_receiver_first() {
        let src = format!("{SHAPES}f := Rect.Area\nf(Rect{{3, 3}})");
        assert_eq!(run1(&src), Value::int(9));
    }

    #[test]
    fn missing_method_is_not_assignable() {
        let err = fail("type Shape interface { Area() int }\nvar s Shape = 3");
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn type_switch_matches_nil_case() {
        let src = "func kind(x interface{}) string {
    switch v := x.(type) {
    case int:
        return \"int\"
    case string:
        return \"string:\" + v
    case nil:
        return \"nil\"
    default:
        return \"other\"
    }
}
Values(kind(1), kind(\"a\"), kind(nil), kind(1.5))";
        assert_eq!(run(src), vec![
            Value::string("int"),
            Value::string("string:a"),
            Value::string("nil"),
            Value::string("other"),
        ]);
    }

    #[test]
    fn type_switch_on_interface_case() {
        let src = format!(
            "{SHAPES}func describe(x interface{{}}) int {{
    switch s := x.(type) {{
    case Shape:
        return s.Area()
    }}
    return -1
}}
Values(describe(Rect{{2, 2}}), describe(\"no\"))"
        );
        assert_eq!(run(&src), ints(&[4, -1]));
    }

    #[test]
    fn type_assertions() {
        let src = "var x interface{} = 5; n := x.(int); s, ok := x.(string); Values(n, s, ok)";
        assert_eq!(run(src), vec![Value::int(5), Value::string(""), Value::Bool(false)]);
        let err = fail("var x interface{} = 5; x.(string)");
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn conversions() {
        let src = "f := 3.9; Values(int(f), float64(7) / 2, string(rune(65)), uint8(257 - 2))";
        assert_eq!(run(src), vec![
            Value::int(3),
            Value::float64(3.5),
            Value::string("A"),
            Value::typed_int(IntKind::Uint8, 255),
        ]);
    }

    #[test]
    fn recursive_struct_type() {
        let src = "type Node struct { V int; Next *Node }
list := &Node{1, &Node{2, &Node{3, nil}}}
s := 0
for n := list; n != nil; n = n.Next { s += n.V }
s";
        assert_eq!(run1(src), Value::int(6));
    }

    #[test]
    fn interface_holding_nil_pointer_is_not_nil() {
        let src = "type T struct{}\nvar p *T\nvar x interface{} = p\nValues(p == nil, x == nil)";
        assert_eq!(run(src), vec![Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn nil_interface_values_bind_with_short_declarations() {
        let src = "func g() error { return nil }
var a interface{}
e := g()
b := a
r := recover()
for _, v := range []interface{}{nil} { b = v }
Values(e == nil, b == nil, r == nil)";
        assert_eq!(run(src), vec![Value::Bool(true); 3]);
    }

    #[test]
    fn untyped_nil_has_no_type_to_bind() {
        for src in ["x := nil", "var x = nil", "x, y := nil, 1"] {
            let err = fail(src);
            assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{src:?}: {err}");
        }
        assert_eq!(run1("var x error = nil; x == nil"), Value::Bool(true));
    }
}

mod concurrency {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buffered_channel_round_trip() {
        assert_eq!(run(r#"cx := make(chan string, 1); cx <- "x"; <-cx"#), vec![
            Value::string("x"),
            Value::Bool(true),
        ]);
    }

    #[test]
    fn goroutine_sends_result() {
        let src = "c := make(chan int)\ngo func(n int) { c <- n * 2 }(21)\nv := <-c\nv";
        assert_eq!(run1(src), Value::int(42));
    }

    #[test]
    fn workers_fan_in() {
        let src = "results := make(chan int, 10)
for i := 1; i <= 10; i++ {
    go func(n int) { results <- n * n }(i)
}
total := 0
for i := 0; i < 10; i++ {
    total += <-results
}
total";
        assert_eq!(run1(src), Value::int(385));
    }

    #[test]
    fn select_takes_ready_case() {
        let src = "a := make(chan int, 1); b := make(chan int, 1); b <- 5
got := 0
select {
case v := <-a:
    got = v
case v := <-b:
    got = v + 100
}
got";
        assert_eq!(run1(src), Value::int(105));
    }

    #[test]
    fn select_default_when_nothing_ready() {
        let src = "c := make(chan int)\nr := \"\"\nselect {\ncase <-c:\n    r = \"recv\"\ndefault:\n    r = \"default\"\n}\nr";
        assert_eq!(run1(src), Value::string("default"));
    }

    #[test]
    fn select_blocks_until_a_goroutine_sends() {
        let src = "c := make(chan string)
go func() { c <- \"late\" }()
r := \"\"
select {
case s := <-c:
    r = s
}
r";
        assert_eq!(run1(src), Value::string("late"));
    }

    #[test]
    fn select_send_case() {
        let src = "c := make(chan int, 1)\nselect {\ncase c <- 8:\n}\n<-c";
        assert_eq!(run(src), vec![Value::int(8), Value::Bool(true)]);
    }

    #[test]
    fn send_on_closed_channel() {
        let err = fail("c := make(chan int, 1); close(c); c <- 1");
        assert!(matches!(err.kind, EvalErrorKind::ChannelClosed { .. }), "{err}");
    }

    #[test]
    fn goroutine_panic_does_not_reach_spawner() {
        let src = "done := make(chan bool)
go func() {
    defer func() { done <- true }()
    panic(\"in goroutine\")
}()
<-done";
        assert_eq!(run(src), vec![Value::Bool(true), Value::Bool(true)]);
    }
}

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn undefined_name() {
        let err = fail("y + 1");
        assert_eq!(err.kind, EvalErrorKind::UndefinedName { name: "y".to_string() });
        assert!(err.span.is_some());
    }

    #[test]
    fn duplicate_binding_in_function_scope() {
        let err = fail("func f() { a := 1; var a int; _ = a }\nf()");
        assert!(matches!(err.kind, EvalErrorKind::DuplicateBinding { .. }), "{err}");
    }

    #[test]
    fn short_declaration_needs_a_new_name() {
        let err = fail("func f() { a := 1; a := 2; _ = a }\nf()");
        assert_eq!(err.message, "invalid operation: no new variables on left side of :=");
    }

    #[test]
    fn repl_scope_allows_redefinition() {
        assert_eq!(run1("x := 1; x := \"now a string\"; x"), Value::string("now a string"));
    }

    #[test]
    fn repl_redefinition_can_be_disabled() {
        let mut interp = Interpreter::builder()
            .print_handler(silent_handler())
            .repl_redefinition(false)
            .build();
        let err = eval(&mut interp, "var x = 1; var x = 2").unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::DuplicateBinding { .. }), "{err}");
    }

    #[test]
    fn type_mismatch_on_assignment() {
        let err = fail("var x int = \"a\"");
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{err}");
        let err = fail("x := 1; x = \"a\"");
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn mismatched_operands() {
        let err = fail("a := 1; b := \"s\"; a + b");
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }), "{err}");
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(fail("x := 0; 1 / x").kind, EvalErrorKind::DivisionByZero);
        assert_eq!(fail("x := 0; 1 % x").kind, EvalErrorKind::DivisionByZero);
    }

    #[test]
    fn float_division_by_zero_is_infinite() {
        let got = run1("x := 0.0; 1 / x");
        assert_eq!(got.to_string(), "+Inf");
    }

    #[test]
    fn index_out_of_range() {
        assert_eq!(
            fail("s := []int{1, 2}; i := 2; s[i]").kind,
            EvalErrorKind::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn unimplemented_dot_import() {
        let err = fail("import . \"strings\"");
        assert!(matches!(err.kind, EvalErrorKind::UnimplementedConstruct { .. }), "{err}");
    }

    #[test]
    fn error_message_from_display() {
        let err = fail("s := []int{}; s[3]");
        assert_eq!(err.to_string(), "index out of range [3] with length 0");
    }
}

mod repl {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bindings_persist_between_forms() {
        let mut interp = interpreter();
        eval(&mut interp, "x := 40").unwrap();
        eval(&mut interp, "func inc(n int) int { return n + 1 }").unwrap();
        let got = eval(&mut interp, "inc(x) + 1").unwrap();
        assert_eq!(got.into_vec(), ints(&[42]));
        assert_eq!(interp.lookup("x"), Some(Value::int(40)));
    }

    #[test]
    fn variable_and_constant_declarations_yield_their_values() {
        assert_eq!(run("var z = 3"), ints(&[3]));
        assert_eq!(
            run("var a, b int8 = 1, 2"),
            vec![Value::typed_int(IntKind::Int8, 1), Value::typed_int(IntKind::Int8, 2)]
        );
        assert_eq!(run("const c = 'x'"), vec![Value::typed_int(IntKind::Int32, 120)]);
    }

    #[test]
    fn type_and_function_declarations_yield_nothing() {
        assert_eq!(run("type T struct{}"), Vec::<Value>::new());
        assert_eq!(run("func f() {}"), Vec::<Value>::new());
    }

    #[test]
    fn println_writes_to_handler() {
        let print = buffer_handler();
        let mut interp = Interpreter::builder().print_handler(print.clone()).build();
        eval(&mut interp, "for i := 0; i < 3; i++ { println(\"line\", i) }").unwrap();
        assert_eq!(print.get_output(), "line 0\nline 1\nline 2\n");
    }

    #[test]
    fn imported_package_call() {
        assert_eq!(run1("import \"strings\"\nstrings.ToUpper(\"go\")"), Value::string("GO"));
        assert_eq!(run1("import \"fmt\"\nfmt.Sprintf(\"%d-%s\", 7, \"x\")"), Value::string("7-x"));
    }

    #[test]
    fn expand_reports_rewritten_syntax() {
        let mut interp = interpreter();
        eval(&mut interp, "~macro twice(x interface{}) interface{} { return ~\"{~,x + ~,x} }").unwrap();
        let block = quasi_parse::parse_source("twice(3)").unwrap();
        let expanded = interp.expand(block.into_node()).unwrap();
        let want = quasi_parse::parse_source("3 + 3").unwrap().into_node();
        assert_eq!(Value::Syntax(expanded), Value::Syntax(want));
    }
}
