//! Turning runtime values back into syntax.
//!
//! Unquoted expressions and macro bodies produce values; the expander
//! needs trees. Syntax values pass through, scalars become literals (typed
//! scalars other than `int`, `float64`, `complex128` and `string` keep
//! their type as a conversion call), everything else is rejected.

use crate::errors::{type_mismatch, EvalError};
use crate::types::{FloatKind, IntKind, Type};
use crate::value::{Constant, Value};
use num_traits::ToPrimitive;
use quasi_ir::{BinaryOp, Expr, ExprKind, LitKind, Name, Node, Span, Stmt, StmtKind, UnaryOp};
use std::fmt::Write;
use std::sync::Arc;

/// Syntax for `value`, positioned at `span` when it has to be built.
pub(crate) fn value_to_node(value: Value, span: Span) -> Result<Node, EvalError> {
    match value {
        Value::Syntax(node) => Ok(node),
        other => value_to_expr(other, span).map(Node::from),
    }
}

/// Expression syntax for `value`.
pub(crate) fn value_to_expr(value: Value, span: Span) -> Result<Expr, EvalError> {
    let expr = |kind| Expr::new(kind, span);
    Ok(match value {
        Value::Syntax(node) => {
            let kind = node.kind_name();
            return node.into_expr().ok_or_else(|| {
                type_mismatch(format!("cannot use {kind} syntax as an expression"))
            });
        }
        Value::Nil => expr(ExprKind::Ident(Name::intern("nil"))),
        Value::Bool(b) | Value::Untyped(Constant::Bool(b)) => {
            expr(ExprKind::Ident(Name::intern(if b { "true" } else { "false" })))
        }
        Value::Str(s) | Value::Untyped(Constant::String(s)) => string_lit(&s, span),
        Value::Untyped(Constant::Int(i)) => signed_lit(LitKind::Int, i.to_string(), span),
        Value::Untyped(Constant::Rune(r)) => {
            let c = r.to_u32().and_then(char::from_u32).unwrap_or('\u{fffd}');
            expr(ExprKind::BasicLit(LitKind::Char, rune_text(c).into()))
        }
        Value::Untyped(Constant::Float(r)) => float_lit(finite(r.to_f64())?, span),
        Value::Untyped(Constant::Complex(re, im)) => {
            complex_lit(finite(re.to_f64())?, finite(im.to_f64())?, span)
        }
        Value::Int(i) => {
            let lit = signed_lit(LitKind::Int, i.get().to_string(), span);
            if i.kind() == IntKind::Int {
                lit
            } else {
                conversion(&Type::Int(i.kind()), lit, span)
            }
        }
        Value::Float(x) => {
            let lit = float_lit(finite(x.get())?, span);
            if x.kind() == FloatKind::F64 {
                lit
            } else {
                conversion(&Type::Float(x.kind()), lit, span)
            }
        }
        Value::Complex(c) => {
            let lit = complex_lit(finite(c.re())?, finite(c.im())?, span);
            conversion(&Type::Complex(c.kind()), lit, span)
        }
        other => {
            return Err(type_mismatch(format!(
                "cannot convert {} (type {}) to syntax",
                other,
                other.type_of()
            )))
        }
    })
}

/// The nodes an `unquote_splice` operand stands for: the statements of a
/// block, a single node, or the elements of a slice of syntax values.
pub(crate) fn splice_items(value: Value, span: Span) -> Result<Vec<Node>, EvalError> {
    match value {
        Value::Syntax(Node::Block(b)) => Ok(Arc::unwrap_or_clone(b)
            .stmts
            .into_iter()
            .map(stmt_node)
            .collect()),
        Value::Slice(s) => s
            .to_vec()
            .into_iter()
            .map(|v| value_to_node(v, span))
            .collect(),
        Value::Nil | Value::None => Ok(Vec::new()),
        other => Ok(vec![value_to_node(other, span)?]),
    }
}

/// A statement as a node; expression statements become expressions.
pub(crate) fn stmt_node(stmt: Stmt) -> Node {
    match stmt.kind {
        StmtKind::Expr(e) => Node::from(e),
        kind => Node::from(Stmt::new(kind, stmt.span)),
    }
}

/// Infinities and NaN have no literal spelling.
fn finite(v: f64) -> Result<f64, EvalError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(type_mismatch(format!("cannot convert {v} to syntax")))
    }
}

fn conversion(ty: &Type, arg: Expr, span: Span) -> Expr {
    let fun = Expr::ident(Name::intern(&ty.to_string()), span);
    Expr::new(
        ExprKind::Call {
            fun: Box::new(fun),
            args: vec![arg],
            ellipsis: false,
        },
        span,
    )
}

/// A literal with a leading minus as a unary negation.
fn signed_lit(kind: LitKind, text: String, span: Span) -> Expr {
    match text.strip_prefix('-') {
        Some(abs) => Expr::new(
            ExprKind::Unary(
                UnaryOp::Neg,
                Box::new(Expr::new(ExprKind::BasicLit(kind, abs.into()), span)),
            ),
            span,
        ),
        None => Expr::new(ExprKind::BasicLit(kind, text.into()), span),
    }
}

fn float_lit(v: f64, span: Span) -> Expr {
    signed_lit(LitKind::Float, format!("{v:?}"), span)
}

fn complex_lit(re: f64, im: f64, span: Span) -> Expr {
    let imag = Expr::new(ExprKind::BasicLit(LitKind::Imag, format!("{:?}i", im.abs()).into()), span);
    let op = if im.is_sign_negative() { BinaryOp::Sub } else { BinaryOp::Add };
    Expr::new(
        ExprKind::Paren(Box::new(Expr::new(
            ExprKind::Binary(op, Box::new(float_lit(re, span)), Box::new(imag)),
            span,
        ))),
        span,
    )
}

fn string_lit(s: &str, span: Span) -> Expr {
    let mut text = String::with_capacity(s.len() + 2);
    text.push('"');
    for c in s.chars() {
        escape_into(&mut text, c, '"');
    }
    text.push('"');
    Expr::new(ExprKind::BasicLit(LitKind::String, text.into()), span)
}

fn rune_text(c: char) -> String {
    let mut text = String::from('\'');
    escape_into(&mut text, c, '\'');
    text.push('\'');
    text
}

fn escape_into(out: &mut String, c: char, quote: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() => {
            let _ = write!(out, "\\u{:04x}", u32::from(c));
        }
        c => out.push(c),
    }
}
