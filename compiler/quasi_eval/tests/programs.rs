//! Whole programs run through both evaluators.
//!
//! Every program here must produce the same values on the tree-walking
//! interpreter and on the compiler, except where untyped float constants
//! are rounded differently.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quasi_eval::{buffer_handler, silent_handler, Compiler, EvalError, EvalErrorKind, Interpreter, Value};
use quasi_ir::Node;

fn parse(src: &str) -> Node {
    quasi_parse::parse_source(src)
        .unwrap_or_else(|e| panic!("parse {src:?}: {e}"))
        .into_node()
}

fn walk(src: &str) -> Result<Vec<Value>, EvalError> {
    let mut interp = Interpreter::builder().print_handler(silent_handler()).build();
    interp.eval_ast(parse(src)).map(|v| v.into_vec())
}

fn compile(src: &str) -> Result<Vec<Value>, EvalError> {
    let mut compiler = Compiler::from_builder(Interpreter::builder().print_handler(silent_handler()));
    compiler.eval_ast(parse(src)).map(|v| v.into_vec())
}

/// Runs `src` on both evaluators and returns the shared result.
fn both(src: &str) -> Vec<Value> {
    let walked = walk(src).unwrap_or_else(|e| panic!("interpreter on {src:?}: {e}"));
    let compiled = compile(src).unwrap_or_else(|e| panic!("compiler on {src:?}: {e}"));
    assert_eq!(walked, compiled, "evaluators disagree on {src:?}");
    walked
}

fn both_fail(src: &str) -> EvalErrorKind {
    let walked = walk(src).expect_err("interpreter should fail");
    let compiled = compile(src).expect_err("compiler should fail");
    assert_eq!(walked.kind, compiled.kind, "evaluators disagree on {src:?}");
    walked.kind
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::int).collect()
}

const SIEVE: &str = "
func primes(n int) []int {
    composite := make([]bool, n+1)
    var out []int
    for i := 2; i <= n; i++ {
        if composite[i] {
            continue
        }
        out = append(out, i)
        for j := i * i; j <= n; j += i {
            composite[j] = true
        }
    }
    return out
}
p := primes(50)
Values(len(p), p[0], p[len(p)-1])
";

const WORD_COUNT: &str = r#"
func count(words []string) map[string]int {
    m := make(map[string]int)
    for _, w := range words {
        m[w]++
    }
    return m
}
m := count([]string{"go", "rust", "go", "go", "c"})
_, missing := m["zig"]
Values(m["go"], m["rust"], len(m), missing)
"#;

const STACK: &str = "
type Stack struct {
    items []int
}

func (s *Stack) Push(v int) { s.items = append(s.items, v) }

func (s *Stack) Pop() (int, bool) {
    if len(s.items) == 0 {
        return 0, false
    }
    v := s.items[len(s.items)-1]
    s.items = s.items[:len(s.items)-1]
    return v, true
}

var s Stack
for i := 1; i <= 3; i++ {
    s.Push(i * 10)
}
a, _ := s.Pop()
b, _ := s.Pop()
c, _ := s.Pop()
_, ok := s.Pop()
Values(a, b, c, ok)
";

const PIPELINE: &str = "
func gen(n int) chan int {
    out := make(chan int)
    go func() {
        for i := 1; i <= n; i++ {
            out <- i
        }
        close(out)
    }()
    return out
}

func square(src chan int) chan int {
    out := make(chan int)
    go func() {
        for v := range src {
            out <- v * v
        }
        close(out)
    }()
    return out
}

total := 0
for v := range square(gen(5)) {
    total += v
}
total
";

const SAFE_DIV: &str = "
func safeDiv(a, b int) (q int, failed bool) {
    defer func() {
        if r := recover(); r != nil {
            failed = true
        }
    }()
    if b == 0 {
        panic(\"divide by zero\")
    }
    return a / b, false
}
q1, f1 := safeDiv(9, 2)
q2, f2 := safeDiv(1, 0)
Values(q1, f1, q2, f2)
";

const INTERFACES: &str = r#"
type Animal interface {
    Sound() string
}

type Dog struct{ name string }
type Cat struct{ name string }

func (d Dog) Sound() string { return d.name + " says woof" }
func (c *Cat) Sound() string { return c.name + " says meow" }

animals := []Animal{Dog{name: "rex"}, &Cat{name: "tom"}}
out := ""
for i, a := range animals {
    if i > 0 {
        out += "; "
    }
    out += a.Sound()
}
_, isDog := animals[1].(Dog)
Values(out, isDog)
"#;

const MACRO_UNLESS: &str = "
~macro unless(cond, body interface{}) interface{} {
    return ~\"{if !~,cond { ~,body }}
}
x := 0
unless; false; x = 10
unless; true; x = 20
x
";

#[test]
fn sieve() {
    assert_eq!(both(SIEVE), ints(&[15, 2, 47]));
}

#[test]
fn word_count() {
    assert_eq!(both(WORD_COUNT), vec![Value::int(3), Value::int(1), Value::int(3), Value::Bool(false)]);
}

#[test]
fn stack_with_pointer_methods() {
    assert_eq!(both(STACK), vec![Value::int(30), Value::int(20), Value::int(10), Value::Bool(false)]);
}

#[test]
fn channel_pipeline() {
    assert_eq!(both(PIPELINE), ints(&[55]));
}

#[test]
fn recover_into_named_result() {
    assert_eq!(both(SAFE_DIV), vec![Value::int(4), Value::Bool(false), Value::int(0), Value::Bool(true)]);
}

#[test]
fn interface_dispatch() {
    assert_eq!(both(INTERFACES), vec![Value::string("rex says woof; tom says meow"), Value::Bool(false)]);
}

#[test]
fn macro_builds_control_flow() {
    assert_eq!(both(MACRO_UNLESS), ints(&[10]));
}

#[test]
fn top_level_goto() {
    assert_eq!(both("i := 0\nL:\ni++\nif i < 5 {\n\tgoto L\n}\ni"), ints(&[5]));
    assert_eq!(both("x := 1\ngoto done\nx = 2\ndone:\nx"), ints(&[1]));
}

#[test]
fn macro_body_sees_earlier_globals() {
    let src = "var n int
~macro m(a interface{}) interface{} { n++; return a }
m(5)
m(6)
n";
    assert_eq!(both(src), ints(&[2]));
}

#[test]
fn nil_interface_values_bind() {
    let src = "func g() error { return nil }
var a interface{}
e := g()
b := a
r := recover()
Values(e == nil, b == nil, r == nil)";
    assert_eq!(both(src), vec![Value::Bool(true); 3]);
}

#[test]
fn variable_declarations_yield_their_values() {
    assert_eq!(both("var z = 3"), ints(&[3]));
    assert_eq!(both("type T struct{}"), Vec::<Value>::new());
}

#[test]
fn printed_output_matches() {
    let src = r#"for i := 0; i < 3; i++ { print(i, " ") }; println(); println("done", 1.5, []string{"a"})"#;
    let walker_out = buffer_handler();
    let mut interp = Interpreter::builder().print_handler(walker_out.clone()).build();
    interp.eval_ast(parse(src)).unwrap();

    let compiler_out = buffer_handler();
    let mut compiler = Compiler::from_builder(Interpreter::builder().print_handler(compiler_out.clone()));
    compiler.eval_ast(parse(src)).unwrap();

    assert_eq!(walker_out.get_output(), "0 1 2 \ndone 1.5 [a]\n");
    assert_eq!(compiler_out.get_output(), walker_out.get_output());
}

#[test]
fn float_constants_diverge() {
    let src = "(0.1 + 0.2) / 3";
    assert_eq!(compile(src).unwrap(), vec![Value::float64(0.1)]);
    assert_eq!(walk(src).unwrap(), vec![Value::float64((0.1 + 0.2) / 3.0)]);
}

#[test]
fn error_kinds_agree() {
    assert!(matches!(both_fail("undefinedThing"), EvalErrorKind::UndefinedName { .. }));
    assert_eq!(both_fail("x := 0; 1 / x"), EvalErrorKind::DivisionByZero);
    assert_eq!(both_fail("s := []int{}; s[0]"), EvalErrorKind::IndexOutOfRange { index: 0, len: 0 });
    assert!(matches!(both_fail("c := make(chan int); close(c); c <- 1"), EvalErrorKind::ChannelClosed { .. }));
    assert!(matches!(both_fail("x := 1; x()"), EvalErrorKind::NotCallable { .. }));
    assert!(matches!(both_fail("func f(a int) {}; f(1, 2)"), EvalErrorKind::ArityMismatch { .. }));
    assert!(matches!(both_fail(r#"panic("stop")"#), EvalErrorKind::UserPanic { .. }));
    assert!(matches!(both_fail("x := nil"), EvalErrorKind::TypeMismatch { .. }));
}

/// Integer constant expressions built from small operands.
fn int_expr() -> impl Strategy<Value = (String, i64)> {
    let leaf = (0i64..100).prop_map(|n| (n.to_string(), n));
    leaf.prop_recursive(3, 16, 2, |inner| {
        (inner.clone(), prop_oneof![Just('+'), Just('-'), Just('*')], inner).prop_map(
            |((ls, lv), op, (rs, rv))| {
                let value = match op {
                    '+' => lv + rv,
                    '-' => lv - rv,
                    _ => lv * rv,
                };
                (format!("({ls} {op} {rs})"), value)
            },
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn integer_arithmetic_agrees((src, expected) in int_expr()) {
        let typed = format!("var x int = {src}; x");
        prop_assert_eq!(both(&src), vec![Value::int(expected)]);
        prop_assert_eq!(both(&typed), vec![Value::int(expected)]);
    }
}
