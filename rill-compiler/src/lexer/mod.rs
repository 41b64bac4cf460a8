use anyhow::Result;
use thiserror::Error;

use crate::source::{SourceFile, SourceId};

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    pub file_id: SourceId,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, line: usize, column: usize, file_id: SourceId) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
            file_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    DotDot,
    Equal,
    DoubleEqual,
    Bang,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    PlusPlus,
    Minus,
    MinusMinus,
    Star,
    Slash,
    Arrow,
    AmpersandAmpersand,
    PipePipe,
    Question,
    Whitespace,
    Comment,
    Eof,
}

impl TokenKind {
    /// Stable human-readable name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerLiteral => "integer literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Keyword(_) => "keyword",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::DotDot => "'..'",
            TokenKind::Equal => "'='",
            TokenKind::DoubleEqual => "'=='",
            TokenKind::Bang => "'!'",
            TokenKind::BangEqual => "'!='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Plus => "'+'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::Minus => "'-'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Arrow => "'->'",
            TokenKind::AmpersandAmpersand => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::Question => "'?'",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of file",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Fn,
    If,
    Else,
    For,
    In,
    Print,
    Return,
    Fail,
    True,
    False,
    Continue,
    Break,
    Set,
}

#[derive(Debug, Error)]
pub enum LexerError {
    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },
    #[error("malformed number literal '{lexeme}'")]
    MalformedNumber {
        lexeme: String,
        line: usize,
        column: usize,
    },
    #[error("unterminated string literal")]
    UnterminatedString { line: usize, column: usize },
}

impl LexerError {
    pub fn line(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { line, .. }
            | LexerError::MalformedNumber { line, .. }
            | LexerError::UnterminatedString { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { column, .. }
            | LexerError::MalformedNumber { column, .. }
            | LexerError::UnterminatedString { column, .. } => *column,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    file_id: SourceId,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self {
            input: source.contents(),
            position: 0,
            line: 0,
            column: 0,
            file_id: source.id(),
        }
    }

    /// Tokenize, discarding whitespace and comment tokens.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let tokens = self.tokenize_raw()?;
        Ok(tokens
            .into_iter()
            .filter(|token| !matches!(token.kind, TokenKind::Whitespace | TokenKind::Comment))
            .collect())
    }

    /// Tokenize, keeping whitespace and comment tokens so that the
    /// original source can be reconstructed from the lexeme stream.
    pub fn tokenize_raw(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if at_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexerError> {
        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => {
                return Ok(Token::new(
                    TokenKind::Eof,
                    String::new(),
                    self.line,
                    self.column,
                    self.file_id,
                ))
            }
        };

        if ch.is_whitespace() {
            return Ok(self.lex_whitespace());
        }

        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.lex_identifier_or_keyword());
        }

        if ch.is_ascii_digit() {
            return self.lex_number();
        }

        match ch {
            '{' => Ok(self.simple_token(TokenKind::LBrace)),
            '}' => Ok(self.simple_token(TokenKind::RBrace)),
            '(' => Ok(self.simple_token(TokenKind::LParen)),
            ')' => Ok(self.simple_token(TokenKind::RParen)),
            '[' => Ok(self.simple_token(TokenKind::LBracket)),
            ']' => Ok(self.simple_token(TokenKind::RBracket)),
            ',' => Ok(self.simple_token(TokenKind::Comma)),
            '?' => Ok(self.simple_token(TokenKind::Question)),
            '*' => Ok(self.simple_token(TokenKind::Star)),
            '"' => self.lex_string(),
            '.' => Ok(self.two_char_token('.', TokenKind::DotDot, TokenKind::Dot)),
            '=' => Ok(self.two_char_token('=', TokenKind::DoubleEqual, TokenKind::Equal)),
            '!' => Ok(self.two_char_token('=', TokenKind::BangEqual, TokenKind::Bang)),
            '>' => Ok(self.two_char_token('=', TokenKind::GreaterEqual, TokenKind::Greater)),
            '<' => Ok(self.two_char_token('=', TokenKind::LessEqual, TokenKind::Less)),
            '/' => {
                if self.peek_next_char() == Some('/') {
                    Ok(self.lex_comment())
                } else {
                    Ok(self.simple_token(TokenKind::Slash))
                }
            }
            '+' => Ok(self.two_char_token('+', TokenKind::PlusPlus, TokenKind::Plus)),
            '-' => {
                if self.peek_next_char() == Some('-') {
                    Ok(self.multi_token(TokenKind::MinusMinus, 2))
                } else if self.peek_next_char() == Some('>') {
                    Ok(self.multi_token(TokenKind::Arrow, 2))
                } else {
                    Ok(self.simple_token(TokenKind::Minus))
                }
            }
            '&' => {
                if self.peek_next_char() == Some('&') {
                    Ok(self.multi_token(TokenKind::AmpersandAmpersand, 2))
                } else {
                    Err(LexerError::UnexpectedCharacter {
                        ch,
                        line: self.line,
                        column: self.column,
                    })
                }
            }
            '|' => {
                if self.peek_next_char() == Some('|') {
                    Ok(self.multi_token(TokenKind::PipePipe, 2))
                } else {
                    Err(LexerError::UnexpectedCharacter {
                        ch,
                        line: self.line,
                        column: self.column,
                    })
                }
            }
            other => Err(LexerError::UnexpectedCharacter {
                ch: other,
                line: self.line,
                column: self.column,
            }),
        }
    }

    fn lex_whitespace(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance_char();
        }
        Token::new(
            TokenKind::Whitespace,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
            self.file_id,
        )
    }

    fn lex_comment(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance_char();
        }
        Token::new(
            TokenKind::Comment,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
            self.file_id,
        )
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = match keyword_from_lexeme(&lexeme) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        };
        Token::new(kind, lexeme, start_line, start_column, self.file_id)
    }

    fn lex_number(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        let mut dot_count = 0usize;

        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' => {
                    self.advance_char();
                }
                '.' => {
                    // Two dots after an integer form a range marker, so the
                    // number ends before them.
                    if self.peek_next_char() == Some('.') {
                        break;
                    }
                    dot_count += 1;
                    self.advance_char();
                }
                _ => break,
            }
        }

        // A number may not end with a decimal point; hand it back.
        if self.slice(start, self.position).ends_with('.') {
            dot_count -= 1;
            self.position -= 1;
            self.column -= 1;
        }

        let lexeme = self.slice(start, self.position).to_string();
        match dot_count {
            0 => Ok(Token::new(
                TokenKind::IntegerLiteral,
                lexeme,
                start_line,
                start_column,
                self.file_id,
            )),
            1 => Ok(Token::new(
                TokenKind::FloatLiteral,
                lexeme,
                start_line,
                start_column,
                self.file_id,
            )),
            _ => Err(LexerError::MalformedNumber {
                lexeme,
                line: start_line,
                column: start_column,
            }),
        }
    }

    fn lex_string(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume opening quote

        let start = self.position;
        loop {
            match self.peek_char() {
                Some('"') => {
                    let lexeme = self.slice(start, self.position).to_string();
                    self.advance_char(); // consume closing quote
                    return Ok(Token::new(
                        TokenKind::StringLiteral,
                        lexeme,
                        start_line,
                        start_column,
                        self.file_id,
                    ));
                }
                Some(_) => {
                    self.advance_char();
                }
                None => {
                    return Err(LexerError::UnterminatedString {
                        line: start_line,
                        column: start_column,
                    })
                }
            }
        }
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        self.multi_token(kind, 1)
    }

    fn two_char_token(&mut self, second: char, double: TokenKind, single: TokenKind) -> Token {
        if self.peek_next_char() == Some(second) {
            self.multi_token(double, 2)
        } else {
            self.multi_token(single, 1)
        }
    }

    fn multi_token(&mut self, kind: TokenKind, nchars: usize) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        for _ in 0..nchars {
            self.advance_char();
        }
        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
            self.file_id,
        )
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme {
        "fn" => Some(Keyword::Fn),
        "if" => Some(Keyword::If),
        "else" => Some(Keyword::Else),
        "for" => Some(Keyword::For),
        "in" => Some(Keyword::In),
        "print" => Some(Keyword::Print),
        "return" => Some(Keyword::Return),
        "fail" => Some(Keyword::Fail),
        "true" => Some(Keyword::True),
        "false" => Some(Keyword::False),
        "continue" => Some(Keyword::Continue),
        "break" => Some(Keyword::Break),
        "set" => Some(Keyword::Set),
        _ => None,
    }
}
