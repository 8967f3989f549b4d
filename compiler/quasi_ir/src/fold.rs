//! Tree rewriting.
//!
//! [`Fold`] consumes a tree and rebuilds it bottom-up. Each `fold_*` method
//! defaults to the matching `walk_*` function, which folds the children and
//! reassembles the node. Implementors override only the nodes they rewrite.
//!
//! List hooks (`fold_exprs`, `fold_stmts`) exist so a rewrite can replace
//! one element with several, which is how unquote-splice and statement-form
//! macro calls work.
//!
//! Clients: the macro expander, quasiquote substitution, and [`erase_spans`].

use crate::ast::{
    Block, CaseClause, CommClause, Decl, Expr, ExprKind, Field, FuncDecl, FuncLit, FuncType,
    Ident, ImportSpec, Node, QuoteKind, Stmt, StmtKind, TypeSpec, ValueSpec,
};
use crate::Span;
use std::convert::Infallible;
use std::sync::Arc;

/// Fallible tree rewriter.
pub trait Fold: Sized {
    type Error;

    fn fold_node(&mut self, node: Node) -> Result<Node, Self::Error> {
        walk_node(self, node)
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, Self::Error> {
        walk_expr(self, expr)
    }

    fn fold_exprs(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>, Self::Error> {
        exprs.into_iter().map(|e| self.fold_expr(e)).collect()
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Stmt, Self::Error> {
        walk_stmt(self, stmt)
    }

    fn fold_stmts(&mut self, stmts: Vec<Stmt>) -> Result<Vec<Stmt>, Self::Error> {
        stmts.into_iter().map(|s| self.fold_stmt(s)).collect()
    }

    fn fold_block(&mut self, block: Block) -> Result<Block, Self::Error> {
        walk_block(self, block)
    }

    /// Quote-family forms. The default descends into the quoted block.
    fn fold_quote(
        &mut self,
        kind: QuoteKind,
        body: Arc<Block>,
        span: Span,
    ) -> Result<Expr, Self::Error> {
        let body = self.fold_block(Arc::unwrap_or_clone(body))?;
        Ok(Expr::new(
            ExprKind::Quote(kind, Arc::new(body)),
            self.fold_span(span),
        ))
    }

    fn fold_span(&mut self, span: Span) -> Span {
        span
    }

    fn fold_ident(&mut self, ident: Ident) -> Ident {
        Ident::new(ident.name, self.fold_span(ident.span))
    }
}

pub fn walk_node<F: Fold>(f: &mut F, node: Node) -> Result<Node, F::Error> {
    Ok(match node {
        Node::Expr(e) => Node::Expr(Arc::new(f.fold_expr(Arc::unwrap_or_clone(e))?)),
        Node::Stmt(s) => Node::Stmt(Arc::new(f.fold_stmt(Arc::unwrap_or_clone(s))?)),
        Node::Block(b) => Node::Block(Arc::new(f.fold_block(Arc::unwrap_or_clone(b))?)),
    })
}

fn fold_box<F: Fold>(f: &mut F, e: Box<Expr>) -> Result<Box<Expr>, F::Error> {
    Ok(Box::new(f.fold_expr(*e)?))
}

fn fold_opt<F: Fold>(f: &mut F, e: Option<Box<Expr>>) -> Result<Option<Box<Expr>>, F::Error> {
    e.map(|e| fold_box(f, e)).transpose()
}

fn fold_opt_stmt<F: Fold>(f: &mut F, s: Option<Box<Stmt>>) -> Result<Option<Box<Stmt>>, F::Error> {
    s.map(|s| f.fold_stmt(*s).map(Box::new)).transpose()
}

pub fn walk_expr<F: Fold>(f: &mut F, expr: Expr) -> Result<Expr, F::Error> {
    let span = expr.span;
    let kind = match expr.kind {
        ExprKind::Quote(kind, body) => return f.fold_quote(kind, body, span),
        k @ (ExprKind::Bad | ExprKind::Ident(_) | ExprKind::BasicLit(..)) => k,
        ExprKind::CompositeLit { ty, elts } => ExprKind::CompositeLit {
            ty: fold_opt(f, ty)?,
            elts: f.fold_exprs(elts)?,
        },
        ExprKind::FuncLit(lit) => ExprKind::FuncLit(Arc::new(walk_func_lit(
            f,
            Arc::unwrap_or_clone(lit),
        )?)),
        ExprKind::Paren(x) => ExprKind::Paren(fold_box(f, x)?),
        ExprKind::Selector(x, sel) => ExprKind::Selector(fold_box(f, x)?, f.fold_ident(sel)),
        ExprKind::Index(x, i) => ExprKind::Index(fold_box(f, x)?, fold_box(f, i)?),
        ExprKind::Slice {
            x,
            low,
            high,
            max,
            slice3,
        } => ExprKind::Slice {
            x: fold_box(f, x)?,
            low: fold_opt(f, low)?,
            high: fold_opt(f, high)?,
            max: fold_opt(f, max)?,
            slice3,
        },
        ExprKind::TypeAssert { x, ty } => ExprKind::TypeAssert {
            x: fold_box(f, x)?,
            ty: fold_opt(f, ty)?,
        },
        ExprKind::Call {
            fun,
            args,
            ellipsis,
        } => ExprKind::Call {
            fun: fold_box(f, fun)?,
            args: f.fold_exprs(args)?,
            ellipsis,
        },
        ExprKind::Star(x) => ExprKind::Star(fold_box(f, x)?),
        ExprKind::Unary(op, x) => ExprKind::Unary(op, fold_box(f, x)?),
        ExprKind::Binary(op, l, r) => ExprKind::Binary(op, fold_box(f, l)?, fold_box(f, r)?),
        ExprKind::KeyValue(k, v) => ExprKind::KeyValue(fold_box(f, k)?, fold_box(f, v)?),
        ExprKind::ArrayType { len, elem } => ExprKind::ArrayType {
            len: fold_opt(f, len)?,
            elem: fold_box(f, elem)?,
        },
        ExprKind::Ellipsis(elt) => ExprKind::Ellipsis(fold_opt(f, elt)?),
        ExprKind::StructType(fields) => ExprKind::StructType(walk_fields(f, fields)?),
        ExprKind::FuncType(ty) => ExprKind::FuncType(walk_func_type(f, ty)?),
        ExprKind::InterfaceType(fields) => ExprKind::InterfaceType(walk_fields(f, fields)?),
        ExprKind::MapType(k, v) => ExprKind::MapType(fold_box(f, k)?, fold_box(f, v)?),
        ExprKind::ChanType(dir, elem) => ExprKind::ChanType(dir, fold_box(f, elem)?),
    };
    Ok(Expr::new(kind, f.fold_span(span)))
}

pub fn walk_fields<F: Fold>(f: &mut F, fields: Vec<Field>) -> Result<Vec<Field>, F::Error> {
    fields
        .into_iter()
        .map(|field| {
            Ok(Field {
                names: field.names.into_iter().map(|n| f.fold_ident(n)).collect(),
                ty: f.fold_expr(field.ty)?,
                tag: field.tag,
                span: f.fold_span(field.span),
            })
        })
        .collect()
}

pub fn walk_func_type<F: Fold>(f: &mut F, ty: FuncType) -> Result<FuncType, F::Error> {
    Ok(FuncType {
        params: walk_fields(f, ty.params)?,
        results: walk_fields(f, ty.results)?,
    })
}

pub fn walk_func_lit<F: Fold>(f: &mut F, lit: FuncLit) -> Result<FuncLit, F::Error> {
    Ok(FuncLit {
        ty: walk_func_type(f, lit.ty)?,
        body: f.fold_block(lit.body)?,
        span: f.fold_span(lit.span),
    })
}

pub fn walk_func_decl<F: Fold>(f: &mut F, decl: FuncDecl) -> Result<FuncDecl, F::Error> {
    let recv = match decl.recv {
        Some(r) => walk_fields(f, vec![r])?.pop(),
        None => None,
    };
    Ok(FuncDecl {
        recv,
        name: f.fold_ident(decl.name),
        ty: walk_func_type(f, decl.ty)?,
        body: decl.body.map(|b| f.fold_block(b)).transpose()?,
        span: f.fold_span(decl.span),
    })
}

pub fn walk_block<F: Fold>(f: &mut F, block: Block) -> Result<Block, F::Error> {
    Ok(Block {
        stmts: f.fold_stmts(block.stmts)?,
        span: f.fold_span(block.span),
    })
}

fn walk_value_specs<F: Fold>(f: &mut F, specs: Vec<ValueSpec>) -> Result<Vec<ValueSpec>, F::Error> {
    specs
        .into_iter()
        .map(|spec| {
            Ok(ValueSpec {
                names: spec.names.into_iter().map(|n| f.fold_ident(n)).collect(),
                ty: spec.ty.map(|t| f.fold_expr(t)).transpose()?,
                values: f.fold_exprs(spec.values)?,
                span: f.fold_span(spec.span),
            })
        })
        .collect()
}

pub fn walk_decl<F: Fold>(f: &mut F, decl: Decl) -> Result<Decl, F::Error> {
    Ok(match decl {
        Decl::Var(specs) => Decl::Var(walk_value_specs(f, specs)?),
        Decl::Const(specs) => Decl::Const(walk_value_specs(f, specs)?),
        Decl::Type(specs) => Decl::Type(
            specs
                .into_iter()
                .map(|spec| {
                    Ok(TypeSpec {
                        name: f.fold_ident(spec.name),
                        alias: spec.alias,
                        ty: f.fold_expr(spec.ty)?,
                        span: f.fold_span(spec.span),
                    })
                })
                .collect::<Result<_, F::Error>>()?,
        ),
        Decl::Import(specs) => Decl::Import(
            specs
                .into_iter()
                .map(|spec| ImportSpec {
                    name: spec.name.map(|n| f.fold_ident(n)),
                    path: spec.path,
                    span: f.fold_span(spec.span),
                })
                .collect(),
        ),
        Decl::Func(decl) => Decl::Func(Arc::new(walk_func_decl(f, Arc::unwrap_or_clone(decl))?)),
        Decl::Macro(decl) => {
            Decl::Macro(Arc::new(walk_func_decl(f, Arc::unwrap_or_clone(decl))?))
        }
    })
}

fn walk_case_clauses<F: Fold>(
    f: &mut F,
    clauses: Vec<CaseClause>,
) -> Result<Vec<CaseClause>, F::Error> {
    clauses
        .into_iter()
        .map(|c| {
            Ok(CaseClause {
                list: c.list.map(|l| f.fold_exprs(l)).transpose()?,
                body: f.fold_stmts(c.body)?,
                span: f.fold_span(c.span),
            })
        })
        .collect()
}

pub fn walk_stmt<F: Fold>(f: &mut F, stmt: Stmt) -> Result<Stmt, F::Error> {
    let kind = match stmt.kind {
        k @ (StmtKind::Bad | StmtKind::Empty) => k,
        StmtKind::Expr(e) => StmtKind::Expr(f.fold_expr(e)?),
        StmtKind::Send { chan, value } => StmtKind::Send {
            chan: f.fold_expr(chan)?,
            value: f.fold_expr(value)?,
        },
        StmtKind::IncDec { x, inc } => StmtKind::IncDec {
            x: f.fold_expr(x)?,
            inc,
        },
        StmtKind::Assign { lhs, op, rhs } => StmtKind::Assign {
            lhs: f.fold_exprs(lhs)?,
            op,
            rhs: f.fold_exprs(rhs)?,
        },
        StmtKind::Decl(decl) => StmtKind::Decl(walk_decl(f, decl)?),
        StmtKind::Labeled { label, stmt } => StmtKind::Labeled {
            label: f.fold_ident(label),
            stmt: Box::new(f.fold_stmt(*stmt)?),
        },
        StmtKind::Go(e) => StmtKind::Go(f.fold_expr(e)?),
        StmtKind::Defer(e) => StmtKind::Defer(f.fold_expr(e)?),
        StmtKind::Return(results) => StmtKind::Return(f.fold_exprs(results)?),
        StmtKind::Branch { kind, label } => StmtKind::Branch {
            kind,
            label: label.map(|l| f.fold_ident(l)),
        },
        StmtKind::Block(b) => StmtKind::Block(f.fold_block(b)?),
        StmtKind::If {
            init,
            cond,
            then,
            els,
        } => StmtKind::If {
            init: fold_opt_stmt(f, init)?,
            cond: f.fold_expr(cond)?,
            then: f.fold_block(then)?,
            els: fold_opt_stmt(f, els)?,
        },
        StmtKind::Switch { init, tag, clauses } => StmtKind::Switch {
            init: fold_opt_stmt(f, init)?,
            tag: tag.map(|t| f.fold_expr(t)).transpose()?,
            clauses: walk_case_clauses(f, clauses)?,
        },
        StmtKind::TypeSwitch {
            init,
            bind,
            x,
            clauses,
        } => StmtKind::TypeSwitch {
            init: fold_opt_stmt(f, init)?,
            bind: bind.map(|b| f.fold_ident(b)),
            x: f.fold_expr(x)?,
            clauses: walk_case_clauses(f, clauses)?,
        },
        StmtKind::Select(clauses) => StmtKind::Select(
            clauses
                .into_iter()
                .map(|c| {
                    Ok(CommClause {
                        comm: fold_opt_stmt(f, c.comm)?,
                        body: f.fold_stmts(c.body)?,
                        span: f.fold_span(c.span),
                    })
                })
                .collect::<Result<_, F::Error>>()?,
        ),
        StmtKind::For {
            init,
            cond,
            post,
            body,
        } => StmtKind::For {
            init: fold_opt_stmt(f, init)?,
            cond: cond.map(|c| f.fold_expr(c)).transpose()?,
            post: fold_opt_stmt(f, post)?,
            body: f.fold_block(body)?,
        },
        StmtKind::Range {
            key,
            value,
            define,
            x,
            body,
        } => StmtKind::Range {
            key: key.map(|k| f.fold_expr(k)).transpose()?,
            value: value.map(|v| f.fold_expr(v)).transpose()?,
            define,
            x: f.fold_expr(x)?,
            body: f.fold_block(body)?,
        },
    };
    Ok(Stmt::new(kind, f.fold_span(stmt.span)))
}

/// Replaces every span with [`Span::DUMMY`].
struct SpanEraser;

impl Fold for SpanEraser {
    type Error = Infallible;

    fn fold_span(&mut self, _span: Span) -> Span {
        Span::DUMMY
    }
}

/// Copy of `node` with all spans erased, for structural comparison.
pub fn erase_spans(node: Node) -> Node {
    match walk_node(&mut SpanEraser, node) {
        Ok(node) => node,
        Err(never) => match never {},
    }
}

/// Structural equality ignoring source positions.
pub fn same_syntax(a: &Node, b: &Node) -> bool {
    erase_spans(a.clone()) == erase_spans(b.clone())
}
