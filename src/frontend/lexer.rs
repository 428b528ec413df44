use std::{
    collections::{BTreeMap, VecDeque},
    str::Chars,
};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::EnumString;

use crate::frontend::SourceFile;

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // while
    Identifier,       // main

    /* Literals */
    BooleanLiteral, // true
    IntegerLiteral, // 1
    StringLiteral,  // "hello, world"

    /* Delimiters */
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Semicolon,  // ;
    Comma,      // ,

    /* Unary Ops */
    Bang, // !

    /* Unary + Binary Ops */
    Minus, // -

    /* Binary Ops */
    Plus,                 // +
    Asterisk,             // *
    Divide,               // /
    Modulus,              // %
    LogicalAnd,           // &&
    LogicalOr,            // ||
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals,    // =
    Increment, // ++
    Decrement, // --

    /* Errors */
    UnterminatedString, // "hello
    Unknown,            // @
}

impl TokenKind {
    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_equality_operator(&self) -> bool {
        matches!(self, Self::DoubleEquals | Self::NotEquals)
    }

    pub fn is_term_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }

    pub fn is_factor_operator(&self) -> bool {
        matches!(self, Self::Asterisk | Self::Divide | Self::Modulus)
    }

    pub fn is_unary_operator(&self) -> bool {
        matches!(self, Self::Bang | Self::Minus)
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Keyword(Keyword::Int | Keyword::Boolean | Keyword::String | Keyword::Void)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Int,
    Boolean,
    String,
    Void,
    If,
    Else,
    While,
    Return,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        ('!', TokenKind::Bang),
        ('-', TokenKind::Minus),
        ('+', TokenKind::Plus),
        ('*', TokenKind::Asterisk),
        ('/', TokenKind::Divide),
        ('%', TokenKind::Modulus),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
        ('=', TokenKind::Equals),
    ])
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            peek_buffer: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &'source SourceFile {
        self.source
    }

    /// Byte offset just past the last consumed character
    pub fn position(&self) -> usize {
        self.position
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn next_is(&mut self, offset: usize, expected: char) -> bool {
        self.chars.peek_nth(offset).is_some_and(|c| *c == expected)
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.bump();
        }
    }

    /// Skips a `/* ... */` comment. An unterminated comment runs to the end of
    /// the file.
    fn ignore_block_comment(&mut self) {
        self.bump();
        self.bump();

        while self.chars.peek().is_some() {
            if self.next_is(0, '*') && self.next_is(1, '/') {
                self.bump();
                self.bump();
                return;
            }

            self.bump();
        }
    }

    fn read_string(&mut self) -> Token {
        let start_position = self.position;

        // Consume opening quote
        self.bump();

        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.bump();

            // Skip whatever is escaped so `\"` does not end the literal
            if c == '\\' && self.chars.peek().is_some_and(|c| *c != '\n') {
                self.bump();
                continue;
            }

            if c == '"' {
                return Token {
                    span: self.new_span(start_position),
                    kind: TokenKind::StringLiteral,
                };
            }
        }

        Token {
            span: self.new_span(start_position),
            kind: TokenKind::UnterminatedString,
        }
    }

    // Keyword, identifier, or boolean literal
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '\'') {
                break;
            }

            self.bump();
        }

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = if let Ok(keyword) = value.parse() {
            TokenKind::Keyword(keyword)
        } else {
            match value {
                "true" | "false" => TokenKind::BooleanLiteral,
                _ => TokenKind::Identifier,
            }
        };

        Token { kind, span }
    }

    fn read_number(&mut self) -> Token {
        let start_position = self.position;

        while self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }

        Token {
            kind: TokenKind::IntegerLiteral,
            span: self.new_span(start_position),
        }
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.bump();

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_double(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.bump();
        self.bump();

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    pub fn peek(&mut self) -> Option<Token> {
        if !self.peek_buffer.is_empty() {
            return self.peek_buffer.front().cloned();
        }

        if let Some(token) = self.next() {
            self.peek_buffer.push_back(token);
        }

        self.peek_buffer.front().cloned()
    }

    /// Looks `n` tokens past the next one without consuming anything
    pub fn peek_nth(&mut self, n: usize) -> Option<Token> {
        while self.peek_buffer.len() <= n {
            let token = self.lex_token()?;
            self.peek_buffer.push_back(token);
        }

        self.peek_buffer.get(n).cloned()
    }

    pub fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.peek_buffer.pop_front() {
            return Some(token);
        }

        self.lex_token()
    }

    fn lex_token(&mut self) -> Option<Token> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                // Ignore comments
                '/' if self.next_is(1, '/') => {
                    self.ignore_line();
                    continue;
                }
                '#' => {
                    self.ignore_line();
                    continue;
                }
                '/' if self.next_is(1, '*') => {
                    self.ignore_block_comment();
                    continue;
                }

                // String literals
                '"' => self.read_string(),

                // Integer literals
                n if n.is_ascii_digit() => self.read_number(),

                // Identifiers, keywords, and boolean literals
                a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                // Increment (++)
                '+' if self.next_is(1, '+') => self.read_double(TokenKind::Increment),
                // Decrement (--)
                '-' if self.next_is(1, '-') => self.read_double(TokenKind::Decrement),

                // Double Equals (==)
                '=' if self.next_is(1, '=') => self.read_double(TokenKind::DoubleEquals),
                // Not Equals (!=)
                '!' if self.next_is(1, '=') => self.read_double(TokenKind::NotEquals),
                // Less than or equal (<=)
                '<' if self.next_is(1, '=') => self.read_double(TokenKind::LessThanOrEqualTo),
                // Greater than or equal (>=)
                '>' if self.next_is(1, '=') => self.read_double(TokenKind::GreaterThanOrEqualTo),

                // Logical And (&&)
                '&' if self.next_is(1, '&') => self.read_double(TokenKind::LogicalAnd),
                // Logical Or (||)
                '|' if self.next_is(1, '|') => self.read_double(TokenKind::LogicalOr),

                s => match SINGLE_TOKENS.get(&s) {
                    Some(kind) => self.read_single(*kind),
                    None => self.read_single(TokenKind::Unknown),
                },
            };

            return Some(token);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let source = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source);

        std::iter::from_fn(|| lexer.next()).map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_declaration_with_comments() {
        assert_eq!(
            kinds("int x' = 1; // trailing\n# hash\n/* block */ x'++;"),
            vec![
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Increment,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn prefers_longest_operator() {
        assert_eq!(
            kinds("a<=b==c&&!d||e--"),
            vec![
                TokenKind::Identifier,
                TokenKind::LessThanOrEqualTo,
                TokenKind::Identifier,
                TokenKind::DoubleEquals,
                TokenKind::Identifier,
                TokenKind::LogicalAnd,
                TokenKind::Bang,
                TokenKind::Identifier,
                TokenKind::LogicalOr,
                TokenKind::Identifier,
                TokenKind::Decrement,
            ]
        );
    }

    #[test]
    fn string_literal_keeps_escaped_quote() {
        let source = SourceFile::from_memory(r#""say \"hi\"" "open"#);
        let mut lexer = Lexer::new(&source);

        let first = lexer.next().unwrap();
        assert_eq!(first.kind, TokenKind::StringLiteral);
        assert_eq!(source.value_of_span(first.span), r#""say \"hi\"""#);

        assert_eq!(lexer.next().unwrap().kind, TokenKind::UnterminatedString);
        assert!(lexer.next().is_none());
    }

    #[test]
    fn peek_nth_does_not_consume() {
        let source = SourceFile::from_memory("f ( x )");
        let mut lexer = Lexer::new(&source);

        assert_eq!(lexer.peek_nth(1).unwrap().kind, TokenKind::OpenParen);
        assert_eq!(lexer.peek().unwrap().kind, TokenKind::Identifier);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Identifier);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::OpenParen);
    }
}
