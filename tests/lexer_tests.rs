// Lexer properties and table-driven cases

use cfront::lexer::comments::strip_comments;
use cfront::lexer::{LiteralValue, Operator, RawLexer, TokenKind};
use cfront::source::{FileId, Interner};
use proptest::prelude::*;
use rstest::rstest;

fn lex(source: &str) -> (Vec<cfront::lexer::Token>, Interner) {
    let mut interner = Interner::new();
    let mut lexer = RawLexer::new("test.c", FileId(0), source.as_bytes()).expect("lexer creation failed");
    let tokens = lexer.tokenize(&mut interner);
    (tokens, interner)
}

#[test]
fn test_longest_match_shift_assign() {
    let (tokens, _) = lex("<<=");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Operator(Operator::ShlAssign));
    assert!(tokens[1].is_eof());
}

#[rstest]
#[case("0x1F", TokenKind::Integer, LiteralValue::Int(31))]
#[case("0b101", TokenKind::Integer, LiteralValue::Int(5))]
#[case("017", TokenKind::Integer, LiteralValue::Int(15))]
#[case("1'000", TokenKind::Integer, LiteralValue::Int(1000))]
#[case("3.14", TokenKind::Float, LiteralValue::Float(3.14))]
#[case("1e-9", TokenKind::Float, LiteralValue::Float(1e-9))]
#[case("017.5", TokenKind::Float, LiteralValue::Float(17.5))]
fn test_number_literal_radix(#[case] source: &str, #[case] kind: TokenKind, #[case] value: LiteralValue) {
    let (tokens, interner) = lex(source);
    assert_eq!(tokens.len(), 2, "{source} should be one token");
    assert_eq!(tokens[0].kind, kind);
    assert_eq!(tokens[0].value, value);
    assert_eq!(interner.resolve(tokens[0].text), source);
}

#[rstest]
#[case("a+++b", vec!["a", "++", "+", "b"])]
#[case("x->y...", vec!["x", "->", "y", "..."])]
#[case("p>>=2", vec!["p", ">>=", "2"])]
#[case("a&&b||!c", vec!["a", "&&", "b", "||", "!", "c"])]
fn test_maximal_munch(#[case] source: &str, #[case] expected: Vec<&str>) {
    let (tokens, interner) = lex(source);
    let spelled: Vec<&str> = tokens
        .iter()
        .filter(|t| !t.is_eof())
        .map(|t| interner.resolve(t.text))
        .collect();
    assert_eq!(spelled, expected);
}

#[test]
fn test_comments_do_not_shift_lines() {
    let (tokens, _) = lex("/* one\n two */ a // tail\nb");
    assert_eq!(tokens[0].location.line, 2);
    assert_eq!(tokens[1].location.line, 3);
}

proptest! {
    #[test]
    fn strip_comments_is_idempotent(src in "[a-z /*\"'\\\\\n]{0,64}") {
        if let Ok(once) = strip_comments(src.as_bytes(), FileId(0)) {
            let twice = strip_comments(&once, FileId(0)).expect("stripped text has no open comment");
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn lexer_always_reaches_eof(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut interner = Interner::new();
        if let Ok(mut lexer) = RawLexer::new("fuzz.c", FileId(0), &bytes) {
            let tokens = lexer.tokenize(&mut interner);
            prop_assert!(tokens.last().is_some_and(|t| t.is_eof()));
            prop_assert!(tokens.len() <= bytes.len() + 1);
            prop_assert!(lexer.is_at_end());
            prop_assert!(lexer.next_token(&mut interner).is_eof());
        }
    }
}
