//! Statements and control clauses.

use crate::{ParseError, Parser};
use quasi_ir::{
    AssignOp, BinaryOp, Block, BranchKind, CaseClause, CommClause, Expr, ExprKind, Ident, Stmt,
    StmtKind, TokenKind,
};
use quasi_stack::ensure_sufficient_stack;

/// Which extra forms a simple statement may take.
#[derive(Copy, Clone, PartialEq, Eq)]
enum SimpleMode {
    Basic,
    /// `for` header: `k, v := range x` allowed.
    Range,
}

/// A simple statement, or the `range` clause of a `for` header.
enum Simple {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Assign => return Some(AssignOp::Assign),
        TokenKind::Define => return Some(AssignOp::Define),
        TokenKind::AddAssign => BinaryOp::Add,
        TokenKind::SubAssign => BinaryOp::Sub,
        TokenKind::MulAssign => BinaryOp::Mul,
        TokenKind::QuoAssign => BinaryOp::Quo,
        TokenKind::RemAssign => BinaryOp::Rem,
        TokenKind::AndAssign => BinaryOp::And,
        TokenKind::OrAssign => BinaryOp::Or,
        TokenKind::XorAssign => BinaryOp::Xor,
        TokenKind::ShlAssign => BinaryOp::Shl,
        TokenKind::ShrAssign => BinaryOp::Shr,
        TokenKind::AndNotAssign => BinaryOp::AndNot,
        _ => return None,
    };
    Some(AssignOp::Op(op))
}

impl Parser<'_> {
    /// Statements up to `}`, `case`, `default` or end of input.
    pub(crate) fn parse_stmt_list(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            match self.kind() {
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof => {
                    break
                }
                TokenKind::Semicolon => {
                    self.cursor.advance();
                    continue;
                }
                _ => {}
            }
            stmts.push(self.parse_stmt()?);
            match self.kind() {
                TokenKind::Semicolon => {
                    self.cursor.advance();
                }
                TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Eof => {}
                _ => return Err(self.cursor.error_expected(";")),
            }
        }
        Ok(stmts)
    }

    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.cursor.expect(&TokenKind::LBrace)?;
        let saved = std::mem::replace(&mut self.expr_lev, 0);
        let stmts = self.parse_stmt_list();
        self.expr_lev = saved;
        let stmts = stmts?;
        let end = self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Block::new(stmts, start.merge(end)))
    }

    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        ensure_sufficient_stack(|| self.parse_stmt_inner())
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        match self.kind() {
            TokenKind::Var
            | TokenKind::Const
            | TokenKind::Type
            | TokenKind::Import
            | TokenKind::Macro => {
                let decl = self.parse_decl()?;
                Ok(Stmt::new(
                    StmtKind::Decl(decl),
                    start.merge(self.cursor.previous_span()),
                ))
            }
            TokenKind::Func if self.is_func_decl() => {
                let decl = self.parse_decl()?;
                Ok(Stmt::new(
                    StmtKind::Decl(decl),
                    start.merge(self.cursor.previous_span()),
                ))
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(Stmt::new(StmtKind::Block(block), span))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Return => {
                self.cursor.advance();
                let results = if matches!(self.kind(), TokenKind::Semicolon | TokenKind::RBrace)
                {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Ok(Stmt::new(
                    StmtKind::Return(results),
                    start.merge(self.cursor.previous_span()),
                ))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let kind = match self.cursor.advance().kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = match self.kind() {
                    TokenKind::Ident(_) if kind != BranchKind::Fallthrough => {
                        Some(self.cursor.expect_ident()?)
                    }
                    _ => None,
                };
                if kind == BranchKind::Goto && label.is_none() {
                    return Err(self.cursor.error_expected("label"));
                }
                Ok(Stmt::new(
                    StmtKind::Branch { kind, label },
                    start.merge(self.cursor.previous_span()),
                ))
            }
            TokenKind::Go | TokenKind::Defer => {
                let is_go = matches!(self.cursor.advance().kind, TokenKind::Go);
                let call = self.parse_expr()?;
                if !matches!(call.unparen().kind, ExprKind::Call { .. }) {
                    return Err(ParseError::invalid(
                        "expression in go/defer must be a function call",
                        call.span,
                    ));
                }
                let span = start.merge(call.span);
                let kind = if is_go {
                    StmtKind::Go(call)
                } else {
                    StmtKind::Defer(call)
                };
                Ok(Stmt::new(kind, span))
            }
            TokenKind::Ident(name) if matches!(self.cursor.peek(1), TokenKind::Colon) => {
                let label = Ident::new(*name, start);
                self.cursor.advance();
                self.cursor.advance();
                let stmt = if matches!(self.kind(), TokenKind::RBrace | TokenKind::Semicolon) {
                    Stmt::new(StmtKind::Empty, self.span())
                } else {
                    self.parse_stmt()?
                };
                let span = start.merge(stmt.span);
                Ok(Stmt::new(
                    StmtKind::Labeled {
                        label,
                        stmt: Box::new(stmt),
                    },
                    span,
                ))
            }
            _ => self.parse_simple_stmt(),
        }
    }

    /// `func name(...)` or `func (recv) name(...)`, as opposed to a literal.
    fn is_func_decl(&self) -> bool {
        match self.cursor.peek(1) {
            TokenKind::Ident(_) => true,
            TokenKind::LParen => {
                let open = self.cursor.position() + 1;
                match self.cursor.matching_paren(open) {
                    Some(close) => {
                        matches!(self.cursor.kind_at(close + 1), TokenKind::Ident(_))
                            && matches!(self.cursor.kind_at(close + 2), TokenKind::LParen)
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    pub(crate) fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.parse_simple(SimpleMode::Basic)? {
            Simple::Stmt(stmt) => Ok(stmt),
            Simple::Range { x, .. } => Err(ParseError::invalid("unexpected range", x.span)),
        }
    }

    fn parse_simple(&mut self, mode: SimpleMode) -> Result<Simple, ParseError> {
        let start = self.span();
        let lhs = self.parse_expr_list()?;

        if let Some(op) = assign_op(self.kind()) {
            self.cursor.advance();
            if mode == SimpleMode::Range
                && self.check(&TokenKind::Range)
                && matches!(op, AssignOp::Assign | AssignOp::Define)
            {
                self.cursor.advance();
                let x = self.parse_expr()?;
                let mut lhs = lhs.into_iter();
                let key = lhs.next();
                let value = lhs.next();
                if lhs.next().is_some() {
                    return Err(ParseError::invalid(
                        "range clause permits at most two iteration variables",
                        start,
                    ));
                }
                return Ok(Simple::Range {
                    key,
                    value,
                    define: op == AssignOp::Define,
                    x,
                });
            }
            let rhs = self.parse_expr_list()?;
            let span = start.merge(self.cursor.previous_span());
            return Ok(Simple::Stmt(Stmt::new(
                StmtKind::Assign { lhs, op, rhs },
                span,
            )));
        }

        let mut lhs = lhs;
        if lhs.len() > 1 {
            return Err(self.cursor.error_expected(":= or = or comma"));
        }
        let x = lhs.remove(0);
        match self.kind() {
            TokenKind::Arrow => {
                self.cursor.advance();
                let value = self.parse_expr()?;
                let span = start.merge(value.span);
                Ok(Simple::Stmt(Stmt::new(
                    StmtKind::Send { chan: x, value },
                    span,
                )))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let inc = matches!(self.cursor.advance().kind, TokenKind::Inc);
                let span = start.merge(self.cursor.previous_span());
                Ok(Simple::Stmt(Stmt::new(StmtKind::IncDec { x, inc }, span)))
            }
            _ => Ok(Simple::Stmt(Stmt::expr(x))),
        }
    }

    /// Run `f` with composite literals of bare type names disabled.
    fn in_control_clause<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.expr_lev, -1);
        let result = f(self);
        self.expr_lev = saved;
        result
    }

    fn expect_condition(stmt: Stmt) -> Result<Expr, ParseError> {
        match stmt.kind {
            StmtKind::Expr(e) => Ok(e),
            _ => Err(ParseError::invalid(
                "expected boolean expression, found statement",
                stmt.span,
            )),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(&TokenKind::If)?;
        let (init, cond) = self.in_control_clause(|p| {
            let mut init = None;
            if !p.check(&TokenKind::Semicolon) {
                let s = p.parse_simple_stmt()?;
                if !p.check(&TokenKind::Semicolon) {
                    return Ok((None, Self::expect_condition(s)?));
                }
                init = Some(Box::new(s));
            }
            p.cursor.expect(&TokenKind::Semicolon)?;
            let cond = p.parse_expr()?;
            Ok((init, cond))
        })?;
        let then = self.parse_block()?;
        let els = if self.cursor.eat(&TokenKind::Else) {
            let stmt = match self.kind() {
                TokenKind::If => self.parse_if()?,
                TokenKind::LBrace => {
                    let block = self.parse_block()?;
                    let span = block.span;
                    Stmt::new(StmtKind::Block(block), span)
                }
                _ => return Err(self.cursor.error_expected("if statement or block")),
            };
            Some(Box::new(stmt))
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                init,
                cond,
                then,
                els,
            },
            start.merge(self.cursor.previous_span()),
        ))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(&TokenKind::For)?;
        let header = self.in_control_clause(|p| {
            let mut init = None;
            let mut cond = None;
            let mut post = None;
            if p.check(&TokenKind::LBrace) {
                return Ok((None, None, None, None));
            }
            let mut first = None;
            if !p.check(&TokenKind::Semicolon) {
                if p.cursor.eat(&TokenKind::Range) {
                    let x = p.parse_expr()?;
                    return Ok((
                        None,
                        None,
                        None,
                        Some(Simple::Range {
                            key: None,
                            value: None,
                            define: false,
                            x,
                        }),
                    ));
                }
                match p.parse_simple(SimpleMode::Range)? {
                    range @ Simple::Range { .. } => return Ok((None, None, None, Some(range))),
                    Simple::Stmt(s) => first = Some(s),
                }
            }
            if p.check(&TokenKind::Semicolon) {
                p.cursor.advance();
                init = first.take().map(Box::new);
                if !p.check(&TokenKind::Semicolon) {
                    cond = Some(Self::expect_condition(p.parse_simple_stmt()?)?);
                }
                p.cursor.expect(&TokenKind::Semicolon)?;
                if !p.check(&TokenKind::LBrace) {
                    post = Some(Box::new(p.parse_simple_stmt()?));
                }
            } else if let Some(s) = first {
                cond = Some(Self::expect_condition(s)?);
            }
            Ok((init, cond, post, None))
        })?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        let kind = match header {
            (_, _, _, Some(Simple::Range { key, value, define, x })) => StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            },
            (init, cond, post, _) => StmtKind::For {
                init,
                cond,
                post,
                body,
            },
        };
        Ok(Stmt::new(kind, span))
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(&TokenKind::Switch)?;
        let (init, tag) = self.in_control_clause(|p| {
            let mut init = None;
            let mut tag = None;
            if !p.check(&TokenKind::LBrace) {
                if !p.check(&TokenKind::Semicolon) {
                    tag = Some(p.parse_simple_stmt()?);
                }
                if p.cursor.eat(&TokenKind::Semicolon) {
                    init = tag.take().map(Box::new);
                    if !p.check(&TokenKind::LBrace) {
                        tag = Some(p.parse_simple_stmt()?);
                    }
                }
            }
            Ok((init, tag))
        })?;

        // Type switch guard: `x.(type)` or `v := x.(type)`.
        let guard = tag.as_ref().and_then(|s| match &s.kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::TypeAssert { x, ty: None },
                ..
            }) => Some((None, (**x).clone())),
            StmtKind::Assign {
                lhs,
                op: AssignOp::Define,
                rhs,
            } if lhs.len() == 1 && rhs.len() == 1 => match (&lhs[0].kind, &rhs[0].kind) {
                (ExprKind::Ident(name), ExprKind::TypeAssert { x, ty: None }) => {
                    Some((Some(Ident::new(*name, lhs[0].span)), (**x).clone()))
                }
                _ => None,
            },
            _ => None,
        });

        let clauses = self.parse_case_clauses()?;
        let span = start.merge(self.cursor.previous_span());
        if let Some((bind, x)) = guard {
            return Ok(Stmt::new(
                StmtKind::TypeSwitch {
                    init,
                    bind,
                    x,
                    clauses,
                },
                span,
            ));
        }
        let tag = tag.map(Self::expect_condition).transpose()?;
        Ok(Stmt::new(StmtKind::Switch { init, tag, clauses }, span))
    }

    fn parse_case_clauses(&mut self) -> Result<Vec<CaseClause>, ParseError> {
        self.cursor.expect(&TokenKind::LBrace)?;
        let saved = std::mem::replace(&mut self.expr_lev, 0);
        let mut clauses = Vec::new();
        let result = loop {
            let start = self.span();
            let list = match self.kind() {
                TokenKind::Case => {
                    self.cursor.advance();
                    match self.parse_expr_list() {
                        Ok(list) => Some(list),
                        Err(e) => break Err(e),
                    }
                }
                TokenKind::Default => {
                    self.cursor.advance();
                    None
                }
                TokenKind::RBrace => break Ok(()),
                _ => break Err(self.cursor.error_expected("case or default")),
            };
            if let Err(e) = self.cursor.expect(&TokenKind::Colon) {
                break Err(e);
            }
            match self.parse_stmt_list() {
                Ok(body) => clauses.push(CaseClause {
                    list,
                    body,
                    span: start.merge(self.cursor.previous_span()),
                }),
                Err(e) => break Err(e),
            }
        };
        self.expr_lev = saved;
        result?;
        self.cursor.expect(&TokenKind::RBrace)?;
        Ok(clauses)
    }

    fn parse_select(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(&TokenKind::Select)?;
        self.cursor.expect(&TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        loop {
            let clause_start = self.span();
            let comm = match self.kind() {
                TokenKind::Case => {
                    self.cursor.advance();
                    Some(Box::new(self.parse_simple_stmt()?))
                }
                TokenKind::Default => {
                    self.cursor.advance();
                    None
                }
                TokenKind::RBrace => break,
                _ => return Err(self.cursor.error_expected("case or default")),
            };
            self.cursor.expect(&TokenKind::Colon)?;
            let body = self.parse_stmt_list()?;
            clauses.push(CommClause {
                comm,
                body,
                span: clause_start.merge(self.cursor.previous_span()),
            });
        }
        let end = self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Stmt::new(StmtKind::Select(clauses), start.merge(end)))
    }
}
