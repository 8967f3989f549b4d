//! Recursive descent parser for Quasi.
//!
//! Parses a REPL-style source unit: a sequence of declarations and
//! statements, mixed freely, into a top-level [`Block`]. The grammar is Go's,
//! plus the macro forms `~quote`, `~quasiquote`, `~unquote`,
//! `~unquote_splice` (and their short spellings) and `~macro` declarations.

mod cursor;
mod error;
mod grammar;

#[cfg(test)]
mod tests;

pub use cursor::Cursor;
pub use error::ParseError;

use quasi_ir::{Block, Span, TokenKind, TokenList};

/// Parser state.
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    /// Go's expression level: negative inside control clause headers,
    /// where `T {` opens the body rather than a composite literal.
    expr_lev: i32,
}

/// Result of parsing a token list.
#[derive(Debug)]
pub struct ParseOutput {
    pub module: Block,
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The parsed block, or the first error.
    pub fn into_result(self) -> Result<Block, ParseError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.module),
        }
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a TokenList) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            expr_lev: 0,
        }
    }

    /// Parse the whole token list as a top-level statement sequence.
    pub fn parse_module(mut self) -> ParseOutput {
        let start = self.cursor.current_span();
        match self.parse_top_level() {
            Ok(stmts) => {
                let span = start.merge(self.cursor.previous_span());
                ParseOutput {
                    module: Block::new(stmts, span),
                    errors: Vec::new(),
                }
            }
            Err(err) => {
                tracing::debug!(%err, "parse failed");
                ParseOutput {
                    module: Block::default(),
                    errors: vec![err],
                }
            }
        }
    }

    fn parse_top_level(&mut self) -> Result<Vec<quasi_ir::Stmt>, ParseError> {
        // A leading package clause is accepted and ignored.
        if self.cursor.eat(&TokenKind::Package) {
            self.cursor.expect_ident()?;
            self.cursor.eat(&TokenKind::Semicolon);
        }
        let stmts = self.parse_stmt_list()?;
        if !self.cursor.is_at_end() {
            return Err(self.cursor.error_expected("statement"));
        }
        Ok(stmts)
    }

    #[inline]
    fn kind(&self) -> &'a TokenKind {
        self.cursor.current_kind()
    }

    #[inline]
    fn span(&self) -> Span {
        self.cursor.current_span()
    }

    #[inline]
    fn check(&self, kind: &TokenKind) -> bool {
        self.cursor.check(kind)
    }
}

/// Parse a token list.
pub fn parse(tokens: &TokenList) -> ParseOutput {
    Parser::new(tokens).parse_module()
}

/// Lex and parse source text.
pub fn parse_source(source: &str) -> Result<Block, ParseError> {
    let tokens = quasi_lexer::lex(source)?;
    parse(&tokens).into_result()
}
