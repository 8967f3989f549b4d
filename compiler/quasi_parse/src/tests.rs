use super::*;
use pretty_assertions::assert_eq;
use quasi_ir::{
    AssignOp, BinaryOp, Decl, Expr, ExprKind, LitKind, Name, QuoteKind, Stmt, StmtKind, UnaryOp,
};

fn parse_ok(source: &str) -> Vec<Stmt> {
    match parse_source(source) {
        Ok(block) => block.stmts,
        Err(e) => panic!("parse failed for {source:?}: {e}"),
    }
}

fn single(source: &str) -> StmtKind {
    let mut stmts = parse_ok(source);
    assert_eq!(stmts.len(), 1, "expected one statement in {source:?}");
    stmts.remove(0).kind
}

fn single_expr(source: &str) -> Expr {
    match single(source) {
        StmtKind::Expr(e) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn name(s: &str) -> Name {
    Name::intern(s)
}

#[test]
fn test_binary_precedence() {
    let e = single_expr("1 + 2 * 3");
    match e.kind {
        ExprKind::Binary(BinaryOp::Add, _, rhs) => {
            assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_nested_unary() {
    let e = single_expr("-+^6");
    match e.kind {
        ExprKind::Unary(UnaryOp::Neg, inner) => match inner.kind {
            ExprKind::Unary(UnaryOp::Pos, inner) => {
                assert!(matches!(inner.kind, ExprKind::Unary(UnaryOp::Xor, _)));
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_var_decl_with_type() {
    match single("var v uint32 = 99") {
        StmtKind::Decl(Decl::Var(specs)) => {
            assert_eq!(specs.len(), 1);
            assert_eq!(specs[0].names[0].name, name("v"));
            assert!(specs[0].ty.is_some());
            assert_eq!(specs[0].values.len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_const_group_with_implicit_repeat() {
    match single("const ( c8 uint = iota+8; c9 )") {
        StmtKind::Decl(Decl::Const(specs)) => {
            assert_eq!(specs.len(), 2);
            assert!(specs[1].ty.is_none());
            assert!(specs[1].values.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_grouped_parameters() {
    match single("func second(a, b, c interface{}) interface{} { return b }") {
        StmtKind::Decl(Decl::Func(decl)) => {
            assert_eq!(decl.ty.params.len(), 1);
            assert_eq!(decl.ty.params[0].names.len(), 3);
            assert_eq!(decl.ty.results.len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_unnamed_result_list() {
    match single("func twins(x float32) (float32, float32) { return x, x+1 }") {
        StmtKind::Decl(Decl::Func(decl)) => {
            assert_eq!(decl.ty.results.len(), 2);
            assert!(decl.ty.results.iter().all(|f| f.names.is_empty()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_method_decl() {
    match single("func (p *Pair) SetLhs(a int) { p.A = a }") {
        StmtKind::Decl(Decl::Func(decl)) => {
            let recv = decl.recv.as_ref().unwrap();
            assert_eq!(recv.names[0].name, name("p"));
            assert!(matches!(recv.ty.kind, ExprKind::Star(_)));
            assert_eq!(decl.name.name, name("SetLhs"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_func_literal_call_is_expression() {
    let e = single_expr("func() { v = 1 }()");
    assert!(matches!(e.kind, ExprKind::Call { .. }));
}

#[test]
fn test_variadic_call_and_param() {
    match single("func list_args(args ...interface{}) []interface{} { args }") {
        StmtKind::Decl(Decl::Func(decl)) => assert!(decl.ty.is_variadic()),
        other => panic!("unexpected {other:?}"),
    }
    match single_expr("f(xs...)").kind {
        ExprKind::Call { ellipsis, .. } => assert!(ellipsis),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_composite_literal_not_in_if_header() {
    match single("if x == y { z = 1 }") {
        StmtKind::If { cond, then, .. } => {
            assert!(matches!(cond.kind, ExprKind::Binary(BinaryOp::Eql, _, _)));
            assert_eq!(then.stmts.len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_composite_literals() {
    let e = single_expr("[3]int{1, 2: 3}");
    match e.kind {
        ExprKind::CompositeLit { ty, elts } => {
            assert!(ty.is_some());
            assert_eq!(elts.len(), 2);
            assert!(matches!(elts[1].kind, ExprKind::KeyValue(..)));
        }
        other => panic!("unexpected {other:?}"),
    }
    let e = single_expr("map[int]string{1: \"x\"}");
    assert!(matches!(e.kind, ExprKind::CompositeLit { .. }));
    let e = single_expr("Pair{A: 73, B: 94}");
    assert!(matches!(e.kind, ExprKind::CompositeLit { .. }));
}

#[test]
fn test_three_index_slice() {
    match single_expr("y[:3:4]").kind {
        ExprKind::Slice {
            low,
            high,
            max,
            slice3,
            ..
        } => {
            assert!(low.is_none());
            assert!(high.is_some() && max.is_some());
            assert!(slice3);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_for_clauses() {
    match single("for i = 1; i <= 7; i = i + 1 { k = k + i }") {
        StmtKind::For {
            init, cond, post, ..
        } => {
            assert!(init.is_some() && cond.is_some() && post.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
    match single("for e := range c { s += e }") {
        StmtKind::Range { key, define, .. } => {
            assert!(key.is_some());
            assert!(define);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(single("for { break }"), StmtKind::For { cond: None, .. }));
}

#[test]
fn test_type_switch_guard() {
    match single("switch y := x.(type) { case nil: 0; case int: 1; default: 2 }") {
        StmtKind::TypeSwitch { bind, clauses, .. } => {
            assert_eq!(bind.map(|b| b.name), Some(name("y")));
            assert_eq!(clauses.len(), 3);
            assert!(clauses[2].list.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_switch_with_init() {
    match single("switch x := 3; x { case 1, 2: a(); fallthrough; case 3: b() }") {
        StmtKind::Switch { init, tag, clauses } => {
            assert!(init.is_some());
            assert!(tag.is_some());
            assert_eq!(clauses[0].list.as_ref().map(Vec::len), Some(2));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_select_clauses() {
    let source = "select { case v, ok := <-c: v; case c <- 1: ; default: }";
    match single(source) {
        StmtKind::Select(clauses) => {
            assert_eq!(clauses.len(), 3);
            assert!(matches!(
                clauses[0].comm.as_deref().map(|s| &s.kind),
                Some(StmtKind::Assign {
                    op: AssignOp::Define,
                    ..
                })
            ));
            assert!(matches!(
                clauses[1].comm.as_deref().map(|s| &s.kind),
                Some(StmtKind::Send { .. })
            ));
            assert!(clauses[2].comm.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_quote_forms() {
    let e = single_expr("~quote{a; b}");
    match e.kind {
        ExprKind::Quote(QuoteKind::Quote, body) => assert_eq!(body.stmts.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    let e = single_expr("~\"{2 * ~,{3<<1}}");
    assert!(matches!(e.kind, ExprKind::Quote(QuoteKind::Quasiquote, _)));
}

#[test]
fn test_unquote_splice_without_braces() {
    let stmts = parse_ok("~quasiquote{~unquote_splice ab ; c}");
    let StmtKind::Expr(Expr {
        kind: ExprKind::Quote(QuoteKind::Quasiquote, body),
        ..
    }) = &stmts[0].kind
    else {
        panic!("expected quasiquote");
    };
    assert_eq!(body.stmts.len(), 2);
    match &body.stmts[0].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Quote(QuoteKind::UnquoteSplice, inner),
            ..
        }) => assert_eq!(inner.stmts.len(), 1),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_macro_decl() {
    match single("~macro second_arg(a, b, c interface{}) interface{} { return b }") {
        StmtKind::Decl(Decl::Macro(decl)) => {
            assert_eq!(decl.name.name, name("second_arg"));
            assert!(decl.body.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_multiline_program() {
    let source = "
var i, j, k int
for i = 1; i <= 7; i = i + 1 {
    if i == 3 {
        j = i
        continue
    }
    k = k + i
}
k";
    let stmts = parse_ok(source);
    assert_eq!(stmts.len(), 3);
}

#[test]
fn test_labeled_loop() {
    match single("outer: for { break outer }") {
        StmtKind::Labeled { label, stmt } => {
            assert_eq!(label.name, name("outer"));
            assert!(matches!(stmt.kind, StmtKind::For { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_send_and_receive() {
    assert!(matches!(single("cx <- \"x\""), StmtKind::Send { .. }));
    let e = single_expr("<-cx");
    assert!(matches!(e.kind, ExprKind::Unary(UnaryOp::Recv, _)));
}

#[test]
fn test_type_decl_struct() {
    match single("type Pair struct { A, B int }") {
        StmtKind::Decl(Decl::Type(specs)) => match &specs[0].ty.kind {
            ExprKind::StructType(fields) => assert_eq!(fields[0].names.len(), 2),
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_complicated_func_type() {
    let source = "type tfff func(int,int) func(error, func(bool)) string";
    assert!(matches!(single(source), StmtKind::Decl(Decl::Type(_))));
}

#[test]
fn test_literal_kinds() {
    let e = single_expr("'A'");
    assert!(matches!(e.kind, ExprKind::BasicLit(LitKind::Char, _)));
}

#[test]
fn test_error_reports_span() {
    let err = parse_source("x := )").unwrap_err();
    assert!(matches!(err, ParseError::Expected { .. }));
    assert_eq!(err.span().start, 5);
}
