//! Parse errors.

use quasi_ir::Span;
use quasi_lexer::LexError;

/// Parse failure. The parser stops at the first error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, found {found} at {span}")]
    Expected {
        expected: &'static str,
        found: &'static str,
        span: Span,
    },

    #[error("{message} at {span}")]
    Invalid { message: String, span: Span },
}

impl ParseError {
    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        ParseError::Invalid {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(e) => e.span(),
            ParseError::Expected { span, .. } | ParseError::Invalid { span, .. } => *span,
        }
    }
}
