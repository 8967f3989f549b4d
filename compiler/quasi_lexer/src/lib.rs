//! Lexer for Quasi using logos.
//!
//! Produces a [`TokenList`] with Go's automatic semicolon insertion applied:
//! a newline becomes `;` when the previous token can end a statement
//! (identifier, literal, `break`, `continue`, `fallthrough`, `return`, `++`,
//! `--`, `)`, `]`, `}`). The same rule applies at end of input.
//!
//! Literal tokens keep their raw text; decoding is left to the evaluator.

use logos::Logos;
use quasi_ir::{LitKind, Name, Span, Token, TokenKind, TokenList};
use std::sync::Arc;

/// Lexing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character {text:?} at {span}")]
    UnexpectedChar { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
        }
    }
}

/// Raw token from logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[token("\n")]
    Newline,

    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("chan")]
    Chan,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("defer")]
    Defer,
    #[token("else")]
    Else,
    #[token("fallthrough")]
    Fallthrough,
    #[token("for")]
    For,
    #[token("func")]
    Func,
    #[token("go")]
    Go,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("interface")]
    Interface,
    #[token("map")]
    Map,
    #[token("package")]
    Package,
    #[token("range")]
    Range,
    #[token("return")]
    Return,
    #[token("select")]
    Select,
    #[token("struct")]
    Struct,
    #[token("switch")]
    Switch,
    #[token("type")]
    Type,
    #[token("var")]
    Var,

    // Macro forms
    #[token("~quote")]
    #[token("~'")]
    Quote,
    #[token("~quasiquote")]
    #[token("~\"")]
    Quasiquote,
    #[token("~unquote")]
    #[token("~,")]
    Unquote,
    #[token("~unquote_splice")]
    #[token("~,@")]
    UnquoteSplice,
    #[token("~macro")]
    Macro,

    // Operators
    #[token("+")]
    Add,
    #[token("-")]
    Sub,
    #[token("*")]
    Mul,
    #[token("/")]
    Quo,
    #[token("%")]
    Rem,
    #[token("&")]
    And,
    #[token("|")]
    Or,
    #[token("^")]
    Xor,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&^")]
    AndNot,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    QuoAssign,
    #[token("%=")]
    RemAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&^=")]
    AndNotAssign,
    #[token("&&")]
    LAnd,
    #[token("||")]
    LOr,
    #[token("<-")]
    Arrow,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("==")]
    Eql,
    #[token("<")]
    Lss,
    #[token(">")]
    Gtr,
    #[token("=")]
    Assign,
    #[token("!")]
    Not,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Leq,
    #[token(">=")]
    Geq,
    #[token(":=")]
    Define,
    #[token("...")]
    Ellipsis,

    // Delimiters
    #[token("(")]
    LParen,
    #[token("[")]
    LBrack,
    #[token("{")]
    LBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Period,
    #[token(")")]
    RParen,
    #[token("]")]
    RBrack,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[bB][01_]+")]
    #[regex(r"0[oO][0-7_]+")]
    #[regex(r"[0-9][0-9_]*")]
    Int,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9_]+)?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9_]+")]
    Float,

    #[regex(r"[0-9][0-9_]*i")]
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9_]+)?i")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?i")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9_]+i")]
    Imag,

    #[regex(r"'([^'\\\n]|\\.)+'")]
    Char,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"`[^`]*`")]
    String,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Lex source code into a `TokenList`, inserting statement-ending semicolons.
#[tracing::instrument(level = "trace", skip_all, fields(len = source.len()))]
pub fn lex(source: &str) -> Result<TokenList, LexError> {
    let mut result = TokenList::new();
    let mut logos = RawToken::lexer(source);
    let mut can_end = false;

    while let Some(token_result) = logos.next() {
        let span = Span::from_range(logos.span());
        let slice = logos.slice();

        let raw = token_result.map_err(|()| LexError::UnexpectedChar {
            text: slice.to_owned(),
            span,
        })?;

        let line_break = match raw {
            RawToken::LineComment => false,
            RawToken::BlockComment => slice.contains('\n'),
            RawToken::Newline => true,
            _ => {
                let kind = convert_token(raw, slice);
                can_end = kind.ends_statement();
                result.push(Token::new(kind, span));
                continue;
            }
        };
        if line_break && can_end {
            result.push(Token::new(TokenKind::Semicolon, Span::new(span.start, span.start)));
            can_end = false;
        }
    }

    let eof = Span::from_range(source.len()..source.len());
    if can_end {
        result.push(Token::new(TokenKind::Semicolon, eof));
    }
    result.push(Token::new(TokenKind::Eof, eof));

    tracing::trace!(tokens = result.len(), "lexed");
    Ok(result)
}

fn literal(kind: LitKind, slice: &str) -> TokenKind {
    TokenKind::Literal(kind, Arc::from(slice))
}

/// Convert a raw token to a `TokenKind`, interning identifiers.
fn convert_token(raw: RawToken, slice: &str) -> TokenKind {
    match raw {
        RawToken::Int => literal(LitKind::Int, slice),
        RawToken::Float => literal(LitKind::Float, slice),
        RawToken::Imag => literal(LitKind::Imag, slice),
        RawToken::Char => literal(LitKind::Char, slice),
        RawToken::String => literal(LitKind::String, slice),
        RawToken::Ident => TokenKind::Ident(Name::intern(slice)),

        RawToken::Break => TokenKind::Break,
        RawToken::Case => TokenKind::Case,
        RawToken::Chan => TokenKind::Chan,
        RawToken::Const => TokenKind::Const,
        RawToken::Continue => TokenKind::Continue,
        RawToken::Default => TokenKind::Default,
        RawToken::Defer => TokenKind::Defer,
        RawToken::Else => TokenKind::Else,
        RawToken::Fallthrough => TokenKind::Fallthrough,
        RawToken::For => TokenKind::For,
        RawToken::Func => TokenKind::Func,
        RawToken::Go => TokenKind::Go,
        RawToken::Goto => TokenKind::Goto,
        RawToken::If => TokenKind::If,
        RawToken::Import => TokenKind::Import,
        RawToken::Interface => TokenKind::Interface,
        RawToken::Map => TokenKind::Map,
        RawToken::Package => TokenKind::Package,
        RawToken::Range => TokenKind::Range,
        RawToken::Return => TokenKind::Return,
        RawToken::Select => TokenKind::Select,
        RawToken::Struct => TokenKind::Struct,
        RawToken::Switch => TokenKind::Switch,
        RawToken::Type => TokenKind::Type,
        RawToken::Var => TokenKind::Var,

        RawToken::Quote => TokenKind::Quote,
        RawToken::Quasiquote => TokenKind::Quasiquote,
        RawToken::Unquote => TokenKind::Unquote,
        RawToken::UnquoteSplice => TokenKind::UnquoteSplice,
        RawToken::Macro => TokenKind::Macro,

        RawToken::Add => TokenKind::Add,
        RawToken::Sub => TokenKind::Sub,
        RawToken::Mul => TokenKind::Mul,
        RawToken::Quo => TokenKind::Quo,
        RawToken::Rem => TokenKind::Rem,
        RawToken::And => TokenKind::And,
        RawToken::Or => TokenKind::Or,
        RawToken::Xor => TokenKind::Xor,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Shr => TokenKind::Shr,
        RawToken::AndNot => TokenKind::AndNot,
        RawToken::AddAssign => TokenKind::AddAssign,
        RawToken::SubAssign => TokenKind::SubAssign,
        RawToken::MulAssign => TokenKind::MulAssign,
        RawToken::QuoAssign => TokenKind::QuoAssign,
        RawToken::RemAssign => TokenKind::RemAssign,
        RawToken::AndAssign => TokenKind::AndAssign,
        RawToken::OrAssign => TokenKind::OrAssign,
        RawToken::XorAssign => TokenKind::XorAssign,
        RawToken::ShlAssign => TokenKind::ShlAssign,
        RawToken::ShrAssign => TokenKind::ShrAssign,
        RawToken::AndNotAssign => TokenKind::AndNotAssign,
        RawToken::LAnd => TokenKind::LAnd,
        RawToken::LOr => TokenKind::LOr,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Inc => TokenKind::Inc,
        RawToken::Dec => TokenKind::Dec,
        RawToken::Eql => TokenKind::Eql,
        RawToken::Lss => TokenKind::Lss,
        RawToken::Gtr => TokenKind::Gtr,
        RawToken::Assign => TokenKind::Assign,
        RawToken::Not => TokenKind::Not,
        RawToken::Neq => TokenKind::Neq,
        RawToken::Leq => TokenKind::Leq,
        RawToken::Geq => TokenKind::Geq,
        RawToken::Define => TokenKind::Define,
        RawToken::Ellipsis => TokenKind::Ellipsis,

        RawToken::LParen => TokenKind::LParen,
        RawToken::LBrack => TokenKind::LBrack,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Period => TokenKind::Period,
        RawToken::RParen => TokenKind::RParen,
        RawToken::RBrack => TokenKind::RBrack,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Colon => TokenKind::Colon,

        // Trivia is consumed by `lex` before conversion.
        RawToken::LineComment | RawToken::BlockComment | RawToken::Newline => {
            TokenKind::Semicolon
        }
    }
}

#[cfg(test)]
mod tests;
