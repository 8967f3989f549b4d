//! Type expressions and function signatures.

use crate::{ParseError, Parser};
use quasi_ir::{ChanDir, Expr, ExprKind, Field, FuncType, Ident, Span, TokenKind};
use quasi_stack::ensure_sufficient_stack;
use std::sync::Arc;

/// A parameter list entry before grouping: `name Type`, or a bare type/name.
struct ParamEntry {
    name: Option<Ident>,
    ty: Expr,
}

impl Parser<'_> {
    pub(crate) fn parse_type(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        match self.kind() {
            TokenKind::Ident(_) => {
                let ident = self.cursor.expect_ident()?;
                let base = Expr::ident(ident.name, ident.span);
                if self.cursor.eat(&TokenKind::Period) {
                    let sel = self.cursor.expect_ident()?;
                    let span = start.merge(sel.span);
                    return Ok(Expr::new(ExprKind::Selector(Box::new(base), sel), span));
                }
                Ok(base)
            }
            TokenKind::Mul => {
                self.cursor.advance();
                let elem = self.parse_type()?;
                let span = start.merge(elem.span);
                Ok(Expr::new(ExprKind::Star(Box::new(elem)), span))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_type()?;
                let end = self.cursor.expect(&TokenKind::RParen)?;
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), start.merge(end)))
            }
            TokenKind::LBrack => self.parse_array_type(),
            TokenKind::Map => self.parse_map_type(),
            TokenKind::Chan | TokenKind::Arrow => self.parse_chan_type(),
            TokenKind::Func => {
                self.cursor.advance();
                let sig = self.parse_signature()?;
                Ok(Expr::new(
                    ExprKind::FuncType(sig),
                    start.merge(self.cursor.previous_span()),
                ))
            }
            TokenKind::Struct => self.parse_struct_type(),
            TokenKind::Interface => self.parse_interface_type(),
            _ => Err(self.cursor.error_expected("type")),
        }
    }

    /// Whether the current token can begin a type.
    pub(crate) fn at_type_start(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Ident(_)
                | TokenKind::Mul
                | TokenKind::LParen
                | TokenKind::LBrack
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Arrow
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Interface
        )
    }

    pub(crate) fn parse_array_type(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.expect(&TokenKind::LBrack)?;
        let len = if self.cursor.eat(&TokenKind::RBrack) {
            None
        } else {
            let len = if self.check(&TokenKind::Ellipsis) {
                let span = self.cursor.advance().span;
                Expr::new(ExprKind::Ellipsis(None), span)
            } else {
                let saved = std::mem::replace(&mut self.expr_lev, 1);
                let len = self.parse_expr();
                self.expr_lev = saved;
                len?
            };
            self.cursor.expect(&TokenKind::RBrack)?;
            Some(Box::new(len))
        };
        let elem = self.parse_type()?;
        let span = start.merge(elem.span);
        Ok(Expr::new(
            ExprKind::ArrayType {
                len,
                elem: Box::new(elem),
            },
            span,
        ))
    }

    pub(crate) fn parse_map_type(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.expect(&TokenKind::Map)?;
        self.cursor.expect(&TokenKind::LBrack)?;
        let key = self.parse_type()?;
        self.cursor.expect(&TokenKind::RBrack)?;
        let value = self.parse_type()?;
        let span = start.merge(value.span);
        Ok(Expr::new(
            ExprKind::MapType(Box::new(key), Box::new(value)),
            span,
        ))
    }

    pub(crate) fn parse_chan_type(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        let dir = if self.cursor.eat(&TokenKind::Arrow) {
            self.cursor.expect(&TokenKind::Chan)?;
            ChanDir::Recv
        } else {
            self.cursor.expect(&TokenKind::Chan)?;
            if self.cursor.eat(&TokenKind::Arrow) {
                ChanDir::Send
            } else {
                ChanDir::Both
            }
        };
        let elem = self.parse_type()?;
        let span = start.merge(elem.span);
        Ok(Expr::new(ExprKind::ChanType(dir, Box::new(elem)), span))
    }

    fn parse_struct_type(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.expect(&TokenKind::Struct)?;
        self.cursor.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        loop {
            while self.cursor.eat(&TokenKind::Semicolon) {}
            if self.check(&TokenKind::RBrace) {
                break;
            }
            let field_start = self.span();
            let embedded = matches!(self.kind(), TokenKind::Mul)
                || (matches!(self.kind(), TokenKind::Ident(_))
                    && matches!(
                        self.cursor.peek(1),
                        TokenKind::Semicolon
                            | TokenKind::RBrace
                            | TokenKind::Period
                            | TokenKind::Literal(..)
                    ));
            let (names, ty) = if embedded {
                (Vec::new(), self.parse_type()?)
            } else {
                let mut names = vec![self.cursor.expect_ident()?];
                while self.cursor.eat(&TokenKind::Comma) {
                    names.push(self.cursor.expect_ident()?);
                }
                (names, self.parse_type()?)
            };
            let tag = match self.kind() {
                TokenKind::Literal(quasi_ir::LitKind::String, raw) => {
                    self.cursor.advance();
                    Some(Arc::clone(raw))
                }
                _ => None,
            };
            fields.push(Field {
                names,
                ty,
                tag,
                span: field_start.merge(self.cursor.previous_span()),
            });
            if !self.check(&TokenKind::RBrace) {
                self.cursor.expect(&TokenKind::Semicolon)?;
            }
        }
        let end = self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::StructType(fields), start.merge(end)))
    }

    fn parse_interface_type(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.expect(&TokenKind::Interface)?;
        self.cursor.expect(&TokenKind::LBrace)?;
        let mut methods = Vec::new();
        loop {
            while self.cursor.eat(&TokenKind::Semicolon) {}
            if self.check(&TokenKind::RBrace) {
                break;
            }
            let field_start = self.span();
            let field = if matches!(self.cursor.peek(1), TokenKind::LParen) {
                let name = self.cursor.expect_ident()?;
                let sig = self.parse_signature()?;
                let span = field_start.merge(self.cursor.previous_span());
                Field {
                    names: vec![name],
                    ty: Expr::new(ExprKind::FuncType(sig), span),
                    tag: None,
                    span,
                }
            } else {
                let ty = self.parse_type()?;
                let span = ty.span;
                Field {
                    names: Vec::new(),
                    ty,
                    tag: None,
                    span,
                }
            };
            methods.push(field);
            if !self.check(&TokenKind::RBrace) {
                self.cursor.expect(&TokenKind::Semicolon)?;
            }
        }
        let end = self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::InterfaceType(methods), start.merge(end)))
    }

    /// Parameters and optional results, after `func` (and the name, if any).
    pub(crate) fn parse_signature(&mut self) -> Result<FuncType, ParseError> {
        let params = self.parse_parameters()?;
        let results = if self.check(&TokenKind::LParen) {
            self.parse_parameters()?
        } else if self.at_type_start() && !self.check(&TokenKind::LParen) {
            let ty = self.parse_type()?;
            let span = ty.span;
            vec![Field {
                names: Vec::new(),
                ty,
                tag: None,
                span,
            }]
        } else {
            Vec::new()
        };
        Ok(FuncType { params, results })
    }

    /// `( [name] Type, ... )` with Go's grouping: `a, b int, c string`.
    pub(crate) fn parse_parameters(&mut self) -> Result<Vec<Field>, ParseError> {
        self.cursor.expect(&TokenKind::LParen)?;
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RParen) {
            entries.push(self.parse_param_entry()?);
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RParen)?;

        if entries.iter().all(|e| e.name.is_none()) {
            return Ok(entries
                .into_iter()
                .map(|e| {
                    let span = e.ty.span;
                    Field {
                        names: Vec::new(),
                        ty: e.ty,
                        tag: None,
                        span,
                    }
                })
                .collect());
        }

        let mut fields = Vec::new();
        let mut pending: Vec<Ident> = Vec::new();
        for entry in entries {
            match entry.name {
                Some(name) => {
                    pending.push(name);
                    let span = pending
                        .first()
                        .map_or(Span::DUMMY, |n| n.span)
                        .merge(entry.ty.span);
                    fields.push(Field {
                        names: std::mem::take(&mut pending),
                        ty: entry.ty,
                        tag: None,
                        span,
                    });
                }
                None => match entry.ty.kind {
                    ExprKind::Ident(name) => pending.push(Ident::new(name, entry.ty.span)),
                    _ => {
                        return Err(ParseError::invalid(
                            "mixed named and unnamed parameters",
                            entry.ty.span,
                        ))
                    }
                },
            }
        }
        if let Some(name) = pending.first() {
            return Err(ParseError::invalid(
                "mixed named and unnamed parameters",
                name.span,
            ));
        }
        Ok(fields)
    }

    fn parse_param_entry(&mut self) -> Result<ParamEntry, ParseError> {
        if let TokenKind::Ident(_) = self.kind() {
            match self.cursor.peek(1) {
                TokenKind::Comma | TokenKind::RParen | TokenKind::Period => {
                    return Ok(ParamEntry {
                        name: None,
                        ty: self.parse_type()?,
                    });
                }
                _ => {
                    let name = self.cursor.expect_ident()?;
                    let ty = self.parse_param_type()?;
                    return Ok(ParamEntry {
                        name: Some(name),
                        ty,
                    });
                }
            }
        }
        Ok(ParamEntry {
            name: None,
            ty: self.parse_param_type()?,
        })
    }

    fn parse_param_type(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Ellipsis) {
            let start = self.cursor.advance().span;
            let elem = self.parse_type()?;
            let span = start.merge(elem.span);
            return Ok(Expr::new(ExprKind::Ellipsis(Some(Box::new(elem))), span));
        }
        self.parse_type()
    }
}
