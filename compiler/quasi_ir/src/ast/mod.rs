//! Syntax tree.
//!
//! An owned, immutable tree modelled on Go's syntax. Types appear as
//! expressions (`[]int`, `map[K]V`, `chan T`) because the surface syntax does
//! not separate the two until evaluation. Function bodies and quoted blocks
//! sit behind `Arc` so closures and syntax values share them without copying.
//!
//! Trees are never mutated after parsing; the macro expander and quasiquote
//! build new nodes through [`Fold`](crate::fold::Fold).

mod operators;

#[cfg(test)]
mod tests;

pub use operators::{AssignOp, BinaryOp, UnaryOp};

use crate::{Name, Span};
use std::fmt;
use std::sync::Arc;

/// Identifier with its location.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Ident {
    pub name: Name,
    pub span: Span,
}

impl Ident {
    pub fn new(name: Name, span: Span) -> Self {
        Ident { name, span }
    }
}

/// Kind of a basic literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

/// Quote-family forms.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum QuoteKind {
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplice,
}

impl QuoteKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            QuoteKind::Quote => "quote",
            QuoteKind::Quasiquote => "quasiquote",
            QuoteKind::Unquote => "unquote",
            QuoteKind::UnquoteSplice => "unquote_splice",
        }
    }
}

/// Channel direction in a channel type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Expression node.
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn ident(name: Name, span: Span) -> Self {
        Expr::new(ExprKind::Ident(name), span)
    }

    /// The identifier name if this is a bare identifier.
    pub fn as_ident(&self) -> Option<Name> {
        match self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Paren(inner) = &e.kind {
            e = inner;
        }
        e
    }
}

/// Expression kinds.
#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    /// Placeholder produced for syntax that failed to parse.
    Bad,
    Ident(Name),
    /// Literal with its raw source text.
    BasicLit(LitKind, Arc<str>),
    /// `T{elts}`; `ty` is `None` for elided element types inside a literal.
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
    },
    FuncLit(Arc<FuncLit>),
    Paren(Box<Expr>),
    Selector(Box<Expr>, Ident),
    Index(Box<Expr>, Box<Expr>),
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
        slice3: bool,
    },
    /// `x.(T)`; `ty` is `None` for the `x.(type)` form of a type switch.
    TypeAssert {
        x: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        ellipsis: bool,
    },
    /// `*x`: dereference, or pointer type when `x` is a type.
    Star(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `key: value` inside a composite literal.
    KeyValue(Box<Expr>, Box<Expr>),

    /// `[N]T`, `[...]T` (`len` is an `Ellipsis`) or `[]T` (`len` is `None`).
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    /// `...T` in a variadic parameter, or `...` alone in `[...]T`.
    Ellipsis(Option<Box<Expr>>),
    StructType(Vec<Field>),
    FuncType(FuncType),
    /// Interface type; each field is a method (`names` + `FuncType`) or an embedded type.
    InterfaceType(Vec<Field>),
    MapType(Box<Expr>, Box<Expr>),
    ChanType(ChanDir, Box<Expr>),

    /// `~quote{..}`, `~quasiquote{..}`, `~unquote{..}`, `~unquote_splice{..}`.
    Quote(QuoteKind, Arc<Block>),
}

/// Function literal: signature plus body.
#[derive(Clone, PartialEq, Debug)]
pub struct FuncLit {
    pub ty: FuncType,
    pub body: Block,
    pub span: Span,
}

/// Function signature.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FuncType {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

impl FuncType {
    /// Whether the last parameter is `...T`.
    pub fn is_variadic(&self) -> bool {
        self.params
            .last()
            .is_some_and(|f| matches!(f.ty.kind, ExprKind::Ellipsis(_)))
    }
}

/// Parameter, result, struct field or interface method.
#[derive(Clone, PartialEq, Debug)]
pub struct Field {
    /// Empty for unnamed parameters and embedded fields.
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub tag: Option<Arc<str>>,
    pub span: Span,
}

/// Statement node.
#[derive(Clone, PartialEq, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Stmt::new(StmtKind::Expr(expr), span)
    }
}

/// Statement kinds.
#[derive(Clone, PartialEq, Debug)]
pub enum StmtKind {
    Bad,
    Empty,
    Expr(Expr),
    Send {
        chan: Expr,
        value: Expr,
    },
    IncDec {
        x: Expr,
        inc: bool,
    },
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    Decl(Decl),
    Labeled {
        label: Ident,
        stmt: Box<Stmt>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch {
        kind: BranchKind,
        label: Option<Ident>,
    },
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        els: Option<Box<Stmt>>,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    },
    /// `switch [init;] [bind :=] x.(type) { ... }`
    TypeSwitch {
        init: Option<Box<Stmt>>,
        bind: Option<Ident>,
        x: Expr,
        clauses: Vec<CaseClause>,
    },
    Select(Vec<CommClause>),
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: Block,
    },
}

impl StmtKind {
    /// Short name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            StmtKind::Bad => "bad statement",
            StmtKind::Empty => "empty statement",
            StmtKind::Expr(_) => "expression statement",
            StmtKind::Send { .. } => "send statement",
            StmtKind::IncDec { .. } => "increment statement",
            StmtKind::Assign { .. } => "assignment",
            StmtKind::Decl(_) => "declaration",
            StmtKind::Labeled { .. } => "labeled statement",
            StmtKind::Go(_) => "go statement",
            StmtKind::Defer(_) => "defer statement",
            StmtKind::Return(_) => "return statement",
            StmtKind::Branch { .. } => "branch statement",
            StmtKind::Block(_) => "block",
            StmtKind::If { .. } => "if statement",
            StmtKind::Switch { .. } => "switch statement",
            StmtKind::TypeSwitch { .. } => "type switch",
            StmtKind::Select(_) => "select statement",
            StmtKind::For { .. } => "for statement",
            StmtKind::Range { .. } => "range statement",
        }
    }
}

/// `break`, `continue`, `goto` or `fallthrough`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

/// `case a, b:` or `default:` in a switch or type switch.
#[derive(Clone, PartialEq, Debug)]
pub struct CaseClause {
    /// `None` for `default`.
    pub list: Option<Vec<Expr>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `case <comm>:` or `default:` in a select.
#[derive(Clone, PartialEq, Debug)]
pub struct CommClause {
    /// Send, receive expression or receive assignment; `None` for `default`.
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `{ stmts }`
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Block { stmts, span }
    }

    /// The reduced form a quoted block stands for: its single expression,
    /// its single statement, or the block itself.
    pub fn into_node(self) -> Node {
        if self.stmts.len() == 1 {
            let mut stmts = self.stmts;
            let stmt = stmts.remove(0);
            match stmt.kind {
                StmtKind::Expr(expr) => Node::Expr(Arc::new(expr)),
                kind => Node::Stmt(Arc::new(Stmt::new(kind, stmt.span))),
            }
        } else {
            Node::Block(Arc::new(self))
        }
    }
}

/// Declarations.
#[derive(Clone, PartialEq, Debug)]
pub enum Decl {
    Var(Vec<ValueSpec>),
    Const(Vec<ValueSpec>),
    Type(Vec<TypeSpec>),
    Import(Vec<ImportSpec>),
    Func(Arc<FuncDecl>),
    Macro(Arc<FuncDecl>),
}

/// One line of a `var` or `const` declaration.
#[derive(Clone, PartialEq, Debug)]
pub struct ValueSpec {
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `name [=] type`
#[derive(Clone, PartialEq, Debug)]
pub struct TypeSpec {
    pub name: Ident,
    pub alias: bool,
    pub ty: Expr,
    pub span: Span,
}

/// `import [name] "path"`
#[derive(Clone, PartialEq, Debug)]
pub struct ImportSpec {
    pub name: Option<Ident>,
    pub path: Arc<str>,
    pub span: Span,
}

/// Function, method or macro declaration.
#[derive(Clone, PartialEq, Debug)]
pub struct FuncDecl {
    pub recv: Option<Field>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<Block>,
    pub span: Span,
}

/// Any syntax node that can be quoted, passed to a macro or evaluated.
#[derive(Clone, PartialEq, Debug)]
pub enum Node {
    Expr(Arc<Expr>),
    Stmt(Arc<Stmt>),
    Block(Arc<Block>),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Expr(e) => e.span,
            Node::Stmt(s) => s.span,
            Node::Block(b) => b.span,
        }
    }

    /// Short kind name, used when a syntax value is printed.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Expr(e) => match e.kind {
                ExprKind::Ident(_) => "Ident",
                ExprKind::BasicLit(..) => "BasicLit",
                ExprKind::Binary(..) => "BinaryExpr",
                ExprKind::Unary(..) => "UnaryExpr",
                ExprKind::Call { .. } => "CallExpr",
                ExprKind::CompositeLit { .. } => "CompositeLit",
                ExprKind::FuncLit(_) => "FuncLit",
                _ => "Expr",
            },
            Node::Stmt(s) => match s.kind {
                StmtKind::Assign { .. } => "AssignStmt",
                StmtKind::Decl(_) => "DeclStmt",
                _ => "Stmt",
            },
            Node::Block(_) => "BlockStmt",
        }
    }

    /// View the node as a statement list: a block's statements, or the node
    /// wrapped as a single statement.
    pub fn into_stmts(self) -> Vec<Stmt> {
        match self {
            Node::Block(b) => Arc::unwrap_or_clone(b).stmts,
            Node::Stmt(s) => vec![Arc::unwrap_or_clone(s)],
            Node::Expr(e) => vec![Stmt::expr(Arc::unwrap_or_clone(e))],
        }
    }

    /// View the node as an expression, if it is one or a statement wrapping one.
    pub fn into_expr(self) -> Option<Expr> {
        match self {
            Node::Expr(e) => Some(Arc::unwrap_or_clone(e)),
            Node::Stmt(s) => match &s.kind {
                StmtKind::Expr(e) => Some(e.clone()),
                _ => None,
            },
            Node::Block(b) => {
                if let [Stmt {
                    kind: StmtKind::Expr(e),
                    ..
                }] = b.stmts.as_slice()
                {
                    Some(e.clone())
                } else {
                    None
                }
            }
        }
    }

    /// Wrap a statement list into the reduced node it stands for.
    pub fn from_stmts(stmts: Vec<Stmt>, span: Span) -> Node {
        Block::new(stmts, span).into_node()
    }
}

impl From<Expr> for Node {
    fn from(e: Expr) -> Self {
        Node::Expr(Arc::new(e))
    }
}

impl From<Stmt> for Node {
    fn from(s: Stmt) -> Self {
        Node::Stmt(Arc::new(s))
    }
}

impl From<Block> for Node {
    fn from(b: Block) -> Self {
        Node::Block(Arc::new(b))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.kind_name())
    }
}
