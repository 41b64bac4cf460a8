use std::path::PathBuf;

use rill_compiler::{reconstruct_source, Keyword, Lexer, LexerError, SourceFile, SourceId, TokenKind};

fn source(contents: &str) -> SourceFile {
    SourceFile::new(SourceId(0), PathBuf::from("test.rill"), contents.to_string())
}

fn kinds(contents: &str) -> Vec<TokenKind> {
    let file = source(contents);
    let mut lexer = Lexer::new(&file);
    lexer
        .tokenize()
        .expect("tokenize")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn lexes_range_between_integers() {
    assert_eq!(
        kinds("1..10"),
        vec![
            TokenKind::IntegerLiteral,
            TokenKind::DotDot,
            TokenKind::IntegerLiteral,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn backs_up_over_trailing_decimal_point() {
    assert_eq!(
        kinds("1."),
        vec![TokenKind::IntegerLiteral, TokenKind::Dot, TokenKind::Eof]
    );
}

#[test]
fn lexes_float_literals() {
    let file = source("3.25");
    let tokens = Lexer::new(&file).tokenize().expect("tokenize");
    assert_eq!(tokens[0].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[0].lexeme, "3.25");
}

#[test]
fn rejects_malformed_number() {
    let file = source("1.2.3");
    let err = Lexer::new(&file).tokenize().expect_err("two decimal points");
    assert!(matches!(err, LexerError::MalformedNumber { .. }));
}

#[test]
fn rejects_unterminated_string() {
    let file = source("\"abc");
    let err = Lexer::new(&file).tokenize().expect_err("unterminated");
    assert!(matches!(err, LexerError::UnterminatedString { .. }));
}

#[test]
fn rejects_single_ampersand_and_pipe() {
    for contents in ["a & b", "a | b"] {
        let file = source(contents);
        let err = Lexer::new(&file).tokenize().expect_err("bare operator half");
        assert!(matches!(err, LexerError::UnexpectedCharacter { .. }));
    }
}

#[test]
fn classifies_keywords() {
    assert_eq!(
        kinds("fn set true"),
        vec![
            TokenKind::Keyword(Keyword::Fn),
            TokenKind::Keyword(Keyword::Set),
            TokenKind::Keyword(Keyword::True),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn identifiers_may_contain_underscores_and_digits() {
    let file = source("my_var2");
    let tokens = Lexer::new(&file).tokenize().expect("tokenize");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].lexeme, "my_var2");
}

#[test]
fn string_lexeme_excludes_delimiters() {
    let file = source("\"a-b\"");
    let tokens = Lexer::new(&file).tokenize().expect("tokenize");
    assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    assert_eq!(tokens[0].lexeme, "a-b");
}

#[test]
fn discards_comments_and_whitespace() {
    let file = source("x // trailing note\ny");
    let tokens = Lexer::new(&file).tokenize().expect("tokenize");
    let kinds: Vec<_> = tokens.iter().map(|token| token.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
    );
}

#[test]
fn positions_are_zero_based() {
    let file = source("ab\ncd");
    let tokens = Lexer::new(&file).tokenize().expect("tokenize");
    assert_eq!((tokens[0].line, tokens[0].column), (0, 0));
    assert_eq!((tokens[1].line, tokens[1].column), (1, 0));
}

#[test]
fn raw_token_stream_reconstructs_source() {
    let contents = "fn main() {\n    x = 1..3 // note\n    s = \"hi\"\n    print(s)\n}\n";
    let file = source(contents);
    let tokens = Lexer::new(&file).tokenize_raw().expect("tokenize");
    assert_eq!(reconstruct_source(&tokens), contents);
}

#[test]
fn two_character_operators_lex_as_one_token() {
    assert_eq!(
        kinds("-> .. == != <= >= ++ -- && ||"),
        vec![
            TokenKind::Arrow,
            TokenKind::DotDot,
            TokenKind::DoubleEqual,
            TokenKind::BangEqual,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::PlusPlus,
            TokenKind::MinusMinus,
            TokenKind::AmpersandAmpersand,
            TokenKind::PipePipe,
            TokenKind::Eof,
        ]
    );
}
