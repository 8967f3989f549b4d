//! Expression parsing.
//!
//! Binary operators use precedence climbing over Go's five levels. Unary
//! forms include the macro prefixes: `~quote X` and friends take either a
//! braced block or a single unary operand.

use crate::{ParseError, Parser};
use quasi_ir::{
    BinaryOp, Block, Expr, ExprKind, FuncLit, QuoteKind, Stmt, TokenKind, UnaryOp,
};
use quasi_stack::ensure_sufficient_stack;
use std::sync::Arc;

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::LOr => BinaryOp::LOr,
        TokenKind::LAnd => BinaryOp::LAnd,
        TokenKind::Eql => BinaryOp::Eql,
        TokenKind::Neq => BinaryOp::Neq,
        TokenKind::Lss => BinaryOp::Lss,
        TokenKind::Leq => BinaryOp::Leq,
        TokenKind::Gtr => BinaryOp::Gtr,
        TokenKind::Geq => BinaryOp::Geq,
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Xor => BinaryOp::Xor,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Quo => BinaryOp::Quo,
        TokenKind::Rem => BinaryOp::Rem,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::And => BinaryOp::And,
        TokenKind::AndNot => BinaryOp::AndNot,
        _ => return None,
    })
}

fn quote_kind(kind: &TokenKind) -> Option<QuoteKind> {
    Some(match kind {
        TokenKind::Quote => QuoteKind::Quote,
        TokenKind::Quasiquote => QuoteKind::Quasiquote,
        TokenKind::Unquote => QuoteKind::Unquote,
        TokenKind::UnquoteSplice => QuoteKind::UnquoteSplice,
        _ => return None,
    })
}

impl Parser<'_> {
    /// Parse an expression.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_binary(1))
    }

    pub(crate) fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut list = vec![self.parse_expr()?];
        while self.cursor.eat(&TokenKind::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = binary_op(self.kind()) {
            if op.precedence() < min_prec {
                break;
            }
            self.cursor.advance();
            let right = self.parse_binary(op.precedence() + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        let op = match self.kind() {
            TokenKind::Add => UnaryOp::Pos,
            TokenKind::Sub => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Xor => UnaryOp::Xor,
            TokenKind::And => UnaryOp::Addr,
            TokenKind::Arrow => {
                if matches!(self.cursor.peek(1), TokenKind::Chan) {
                    let ty = self.parse_chan_type()?;
                    return self.parse_postfix(ty);
                }
                UnaryOp::Recv
            }
            TokenKind::Mul => {
                self.cursor.advance();
                let x = self.parse_unary()?;
                let span = start.merge(x.span);
                return Ok(Expr::new(ExprKind::Star(Box::new(x)), span));
            }
            kind => {
                if let Some(quote) = quote_kind(kind) {
                    return self.parse_quote(quote);
                }
                return self.parse_primary();
            }
        };
        self.cursor.advance();
        let x = self.parse_unary()?;
        let span = start.merge(x.span);
        Ok(Expr::new(ExprKind::Unary(op, Box::new(x)), span))
    }

    /// `~quote{...}` or `~quote operand`.
    fn parse_quote(&mut self, kind: QuoteKind) -> Result<Expr, ParseError> {
        let start = self.cursor.advance().span;
        let body = if self.check(&TokenKind::LBrace) {
            self.parse_block()?
        } else {
            let operand = self.parse_unary()?;
            let span = operand.span;
            Block::new(vec![Stmt::expr(operand)], span)
        };
        let span = start.merge(body.span);
        Ok(Expr::new(ExprKind::Quote(kind, Arc::new(body)), span))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let operand = self.parse_operand()?;
        self.parse_postfix(operand)
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        match self.kind() {
            TokenKind::Ident(name) => {
                self.cursor.advance();
                Ok(Expr::ident(*name, start))
            }
            TokenKind::Literal(kind, raw) => {
                self.cursor.advance();
                Ok(Expr::new(ExprKind::BasicLit(*kind, Arc::clone(raw)), start))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                self.expr_lev += 1;
                let inner = self.parse_expr();
                self.expr_lev -= 1;
                let inner = inner?;
                let end = self.cursor.expect(&TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), start.merge(end)))
            }
            TokenKind::Func => {
                self.cursor.advance();
                let sig = self.parse_signature()?;
                if self.check(&TokenKind::LBrace) {
                    self.expr_lev += 1;
                    let body = self.parse_block();
                    self.expr_lev -= 1;
                    let body = body?;
                    let span = start.merge(body.span);
                    return Ok(Expr::new(
                        ExprKind::FuncLit(Arc::new(FuncLit { ty: sig, body, span })),
                        span,
                    ));
                }
                Ok(Expr::new(
                    ExprKind::FuncType(sig),
                    start.merge(self.cursor.previous_span()),
                ))
            }
            TokenKind::LBrack
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface => self.parse_type(),
            _ => Err(self.cursor.error_expected("expression")),
        }
    }

    fn parse_postfix(&mut self, mut x: Expr) -> Result<Expr, ParseError> {
        loop {
            match self.kind() {
                TokenKind::Period => {
                    self.cursor.advance();
                    if self.cursor.eat(&TokenKind::LParen) {
                        let ty = if self.cursor.eat(&TokenKind::Type) {
                            None
                        } else {
                            Some(Box::new(self.parse_type()?))
                        };
                        let end = self.cursor.expect(&TokenKind::RParen)?;
                        let span = x.span.merge(end);
                        x = Expr::new(
                            ExprKind::TypeAssert {
                                x: Box::new(x),
                                ty,
                            },
                            span,
                        );
                    } else {
                        let sel = self.cursor.expect_ident()?;
                        let span = x.span.merge(sel.span);
                        x = Expr::new(ExprKind::Selector(Box::new(x), sel), span);
                    }
                }
                TokenKind::LBrack => {
                    self.cursor.advance();
                    self.expr_lev += 1;
                    let result = self.parse_index_or_slice(x);
                    self.expr_lev -= 1;
                    x = result?;
                }
                TokenKind::LParen => {
                    self.cursor.advance();
                    self.expr_lev += 1;
                    let result = self.parse_call_args();
                    self.expr_lev -= 1;
                    let (args, ellipsis) = result?;
                    let end = self.cursor.expect(&TokenKind::RParen)?;
                    let span = x.span.merge(end);
                    x = Expr::new(
                        ExprKind::Call {
                            fun: Box::new(x),
                            args,
                            ellipsis,
                        },
                        span,
                    );
                }
                TokenKind::LBrace if self.is_literal_type(&x) => {
                    x = self.parse_composite_lit(Some(x))?;
                }
                _ => return Ok(x),
            }
        }
    }

    /// Whether `x { ... }` here opens a composite literal.
    fn is_literal_type(&self, x: &Expr) -> bool {
        match &x.kind {
            ExprKind::Ident(_) => self.expr_lev >= 0,
            ExprKind::Selector(base, _) => {
                matches!(base.kind, ExprKind::Ident(_)) && self.expr_lev >= 0
            }
            ExprKind::ArrayType { .. } | ExprKind::MapType(..) | ExprKind::StructType(_) => true,
            _ => false,
        }
    }

    fn parse_index_or_slice(&mut self, x: Expr) -> Result<Expr, ParseError> {
        let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut colons = 0;
        if !self.check(&TokenKind::Colon) {
            parts[0] = Some(Box::new(self.parse_expr()?));
        }
        while colons < 2 && self.cursor.eat(&TokenKind::Colon) {
            colons += 1;
            if !matches!(self.kind(), TokenKind::Colon | TokenKind::RBrack) {
                parts[colons] = Some(Box::new(self.parse_expr()?));
            }
        }
        let end = self.cursor.expect(&TokenKind::RBrack)?;
        let span = x.span.merge(end);
        let [low, high, max] = parts;
        if colons == 0 {
            let index = low.ok_or_else(|| self.cursor.error_expected("index"))?;
            return Ok(Expr::new(ExprKind::Index(Box::new(x), index), span));
        }
        let slice3 = colons == 2;
        if slice3 && (high.is_none() || max.is_none()) {
            return Err(ParseError::invalid(
                "middle and final index required in 3-index slice",
                span,
            ));
        }
        Ok(Expr::new(
            ExprKind::Slice {
                x: Box::new(x),
                low,
                high,
                max,
                slice3,
            },
            span,
        ))
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, bool), ParseError> {
        let mut args = Vec::new();
        let mut ellipsis = false;
        while !self.check(&TokenKind::RParen) {
            let arg = self.parse_expr()?;
            args.push(arg);
            if self.cursor.eat(&TokenKind::Ellipsis) {
                ellipsis = true;
            }
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok((args, ellipsis))
    }

    fn parse_composite_lit(&mut self, ty: Option<Expr>) -> Result<Expr, ParseError> {
        let start = ty.as_ref().map_or_else(|| self.span(), |t| t.span);
        self.cursor.expect(&TokenKind::LBrace)?;
        self.expr_lev += 1;
        let elts = self.parse_elements();
        self.expr_lev -= 1;
        let elts = elts?;
        let end = self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                elts,
            },
            start.merge(end),
        ))
    }

    fn parse_elements(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut elts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_element()?;
            let elt = if self.cursor.eat(&TokenKind::Colon) {
                let value = self.parse_element()?;
                let span = key.span.merge(value.span);
                Expr::new(ExprKind::KeyValue(Box::new(key), Box::new(value)), span)
            } else {
                key
            };
            elts.push(elt);
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(elts)
    }

    fn parse_element(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LBrace) {
            return self.parse_composite_lit(None);
        }
        self.parse_expr()
    }
}
