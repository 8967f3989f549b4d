//! Quasi IR - syntax tree and shared front-end types
//!
//! This crate contains the data structures shared by the lexer, the parser and
//! the evaluator:
//! - Spans for source locations
//! - Names for interned identifiers
//! - Tokens and `TokenList` for lexer output
//! - The immutable syntax tree (`Expr`, `Stmt`, `Block`, `Node`)
//! - A `Fold` trait for rewriting trees (macro expansion, quasiquote)

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
pub mod fold;
mod name;
mod span;
mod token;

pub use ast::{
    AssignOp, BinaryOp, Block, BranchKind, CaseClause, ChanDir, CommClause, Decl, Expr, ExprKind,
    Field, FuncDecl, FuncLit, FuncType, Ident, ImportSpec, LitKind, Node, QuoteKind, Stmt,
    StmtKind, TypeSpec, UnaryOp, ValueSpec,
};
pub use fold::{erase_spans, same_syntax, Fold};
pub use name::Name;
pub use span::Span;
pub use token::{Token, TokenKind, TokenList};
