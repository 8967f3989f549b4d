use super::*;
use crate::fold::{erase_spans, same_syntax};
use pretty_assertions::assert_eq;

fn int(raw: &str, start: u32) -> Expr {
    Expr::new(
        ExprKind::BasicLit(LitKind::Int, Arc::from(raw)),
        Span::new(start, start + 1),
    )
}

#[test]
fn test_block_single_expr_reduces_to_expr() {
    let block = Block::new(vec![Stmt::expr(int("7", 0))], Span::new(0, 3));
    match block.into_node() {
        Node::Expr(e) => assert_eq!(*e, int("7", 0)),
        other => panic!("expected expression, got {other:?}"),
    }
}

#[test]
fn test_block_single_stmt_reduces_to_stmt() {
    let stmt = Stmt::new(StmtKind::Return(vec![]), Span::new(0, 6));
    let node = Block::new(vec![stmt.clone()], Span::DUMMY).into_node();
    assert_eq!(node, Node::Stmt(Arc::new(stmt)));
}

#[test]
fn test_block_many_stmts_stays_block() {
    let a = Stmt::expr(Expr::ident(Name::intern("a"), Span::new(0, 1)));
    let b = Stmt::expr(Expr::ident(Name::intern("b"), Span::new(2, 3)));
    let node = Block::new(vec![a, b], Span::new(0, 3)).into_node();
    assert!(matches!(node, Node::Block(ref blk) if blk.stmts.len() == 2));
    assert_eq!(node.kind_name(), "BlockStmt");
}

#[test]
fn test_erase_spans_compares_structure() {
    let a = Node::from(int("1", 4));
    let b = Node::from(int("1", 9));
    assert_ne!(a, b);
    assert!(same_syntax(&a, &b));
    assert_eq!(erase_spans(a).span(), Span::DUMMY);
}

#[test]
fn test_node_into_expr() {
    let node = Node::from_stmts(vec![Stmt::expr(int("3", 0))], Span::DUMMY);
    assert_eq!(node.into_expr(), Some(int("3", 0)));
}

#[test]
fn test_precedence_order() {
    assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
    assert!(BinaryOp::Add.precedence() > BinaryOp::Eql.precedence());
    assert!(BinaryOp::Eql.precedence() > BinaryOp::LAnd.precedence());
    assert!(BinaryOp::LAnd.precedence() > BinaryOp::LOr.precedence());
    assert_eq!(BinaryOp::Shl.precedence(), BinaryOp::And.precedence());
}

#[test]
fn test_variadic_detection() {
    let ellipsis = Expr::new(
        ExprKind::Ellipsis(Some(Box::new(Expr::ident(Name::intern("int"), Span::DUMMY)))),
        Span::DUMMY,
    );
    let ty = FuncType {
        params: vec![Field {
            names: vec![Ident::new(Name::intern("args"), Span::DUMMY)],
            ty: ellipsis,
            tag: None,
            span: Span::DUMMY,
        }],
        results: vec![],
    };
    assert!(ty.is_variadic());
    assert!(!FuncType::default().is_variadic());
}
