use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).unwrap().kinds()
}

fn lit(kind: LitKind, raw: &str) -> TokenKind {
    TokenKind::Literal(kind, Arc::from(raw))
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Ident(Name::intern(name))
}

#[test]
fn test_lex_basic() {
    assert_eq!(
        kinds("x := 42"),
        vec![
            ident("x"),
            TokenKind::Define,
            lit(LitKind::Int, "42"),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_semicolon_insertion() {
    let toks = kinds("a\nb +\nc\n");
    assert_eq!(
        toks,
        vec![
            ident("a"),
            TokenKind::Semicolon,
            ident("b"),
            TokenKind::Add,
            ident("c"),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_no_semicolon_after_open_brace() {
    let toks = kinds("if x {\n}\n");
    assert_eq!(
        toks,
        vec![
            TokenKind::If,
            ident("x"),
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_numeric_literals() {
    assert_eq!(
        kinds("0xff 1.5 .5 1e3 7i 0.5i 'A'"),
        vec![
            lit(LitKind::Int, "0xff"),
            lit(LitKind::Float, "1.5"),
            lit(LitKind::Float, ".5"),
            lit(LitKind::Float, "1e3"),
            lit(LitKind::Imag, "7i"),
            lit(LitKind::Imag, "0.5i"),
            lit(LitKind::Char, "'A'"),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_strings_keep_raw_text() {
    assert_eq!(
        kinds(r#""a\"b" `raw`"#),
        vec![
            lit(LitKind::String, r#""a\"b""#),
            lit(LitKind::String, "`raw`"),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_macro_tokens() {
    assert_eq!(
        kinds("~quote ~' ~quasiquote ~\" ~unquote ~, ~unquote_splice ~,@ ~macro"),
        vec![
            TokenKind::Quote,
            TokenKind::Quote,
            TokenKind::Quasiquote,
            TokenKind::Quasiquote,
            TokenKind::Unquote,
            TokenKind::Unquote,
            TokenKind::UnquoteSplice,
            TokenKind::UnquoteSplice,
            TokenKind::Macro,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_operators() {
    assert_eq!(
        kinds("&^= <<= <- ... &&"),
        vec![
            TokenKind::AndNotAssign,
            TokenKind::ShlAssign,
            TokenKind::Arrow,
            TokenKind::Ellipsis,
            TokenKind::LAnd,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_comments_are_trivia() {
    assert_eq!(
        kinds("x // note\ny /* a\nb */ z"),
        vec![
            ident("x"),
            TokenKind::Semicolon,
            ident("y"),
            TokenKind::Semicolon,
            ident("z"),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_keywords_vs_identifiers() {
    assert_eq!(
        kinds("func funcs"),
        vec![
            TokenKind::Func,
            ident("funcs"),
            TokenKind::Semicolon,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_unexpected_char() {
    let err = lex("a $ b").unwrap_err();
    assert_eq!(err.span(), Span::new(2, 3));
}

proptest! {
    #[test]
    fn decimal_literals_roundtrip(n in 0u64..u64::MAX) {
        let source = n.to_string();
        let toks = kinds(&source);
        prop_assert_eq!(&toks[0], &lit(LitKind::Int, &source));
    }
}
