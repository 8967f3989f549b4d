//! Declarations.

use crate::{ParseError, Parser};
use quasi_ir::{Decl, FuncDecl, ImportSpec, Span, TokenKind, TypeSpec, ValueSpec};
use std::sync::Arc;

impl Parser<'_> {
    pub(crate) fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        match self.kind() {
            TokenKind::Var => {
                self.cursor.advance();
                Ok(Decl::Var(self.parse_group(Self::parse_value_spec)?))
            }
            TokenKind::Const => {
                self.cursor.advance();
                Ok(Decl::Const(self.parse_group(Self::parse_value_spec)?))
            }
            TokenKind::Type => {
                self.cursor.advance();
                Ok(Decl::Type(self.parse_group(Self::parse_type_spec)?))
            }
            TokenKind::Import => {
                self.cursor.advance();
                Ok(Decl::Import(self.parse_group(Self::parse_import_spec)?))
            }
            TokenKind::Func => Ok(Decl::Func(Arc::new(self.parse_func_decl()?))),
            TokenKind::Macro => Ok(Decl::Macro(Arc::new(self.parse_func_decl()?))),
            _ => Err(self.cursor.error_expected("declaration")),
        }
    }

    /// A single spec, or `( spec; spec; ... )`.
    fn parse_group<T>(
        &mut self,
        mut spec: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        if !self.cursor.eat(&TokenKind::LParen) {
            return Ok(vec![spec(self)?]);
        }
        let mut specs = Vec::new();
        loop {
            while self.cursor.eat(&TokenKind::Semicolon) {}
            if self.cursor.eat(&TokenKind::RParen) {
                break;
            }
            specs.push(spec(self)?);
            if !self.check(&TokenKind::RParen) {
                self.cursor.expect(&TokenKind::Semicolon)?;
            }
        }
        Ok(specs)
    }

    fn parse_value_spec(&mut self) -> Result<ValueSpec, ParseError> {
        let start = self.span();
        let mut names = vec![self.cursor.expect_ident()?];
        while self.cursor.eat(&TokenKind::Comma) {
            names.push(self.cursor.expect_ident()?);
        }
        let ty = if matches!(
            self.kind(),
            TokenKind::Assign | TokenKind::Semicolon | TokenKind::RParen | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_type()?)
        };
        let values = if self.cursor.eat(&TokenKind::Assign) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        Ok(ValueSpec {
            names,
            ty,
            values,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        let start = self.span();
        let name = self.cursor.expect_ident()?;
        let alias = self.cursor.eat(&TokenKind::Assign);
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            name,
            alias,
            ty,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_import_spec(&mut self) -> Result<ImportSpec, ParseError> {
        let start = self.span();
        let name = match self.kind() {
            TokenKind::Ident(_) => Some(self.cursor.expect_ident()?),
            TokenKind::Period => {
                let span = self.cursor.advance().span;
                Some(quasi_ir::Ident::new(quasi_ir::Name::intern("."), span))
            }
            _ => None,
        };
        let path = match self.kind() {
            TokenKind::Literal(quasi_ir::LitKind::String, raw) => {
                self.cursor.advance();
                Arc::from(strip_quotes(raw))
            }
            _ => return Err(self.cursor.error_expected("import path")),
        };
        Ok(ImportSpec {
            name,
            path,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `func [recv] name signature [body]` or `~macro name signature body`.
    fn parse_func_decl(&mut self) -> Result<FuncDecl, ParseError> {
        let start: Span = self.cursor.advance().span;
        let recv = if self.check(&TokenKind::LParen) {
            let mut params = self.parse_parameters()?;
            if params.len() != 1 {
                return Err(ParseError::invalid(
                    "method has multiple receivers",
                    self.cursor.previous_span(),
                ));
            }
            params.pop()
        } else {
            None
        };
        let name = self.cursor.expect_ident()?;
        let ty = self.parse_signature()?;
        let body = if self.check(&TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(FuncDecl {
            recv,
            name,
            ty,
            body,
            span: start.merge(self.cursor.previous_span()),
        })
    }
}

/// Import paths are plain or raw string literals; escapes are not expected.
fn strip_quotes(raw: &str) -> &str {
    raw.get(1..raw.len().saturating_sub(1)).unwrap_or("")
}
