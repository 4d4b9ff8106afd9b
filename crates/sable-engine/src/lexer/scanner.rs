// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes Sable source code.
#[derive(Clone)]
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            // Operators, possibly followed by `=` or a repeat
            '+' => self.scan_doubled('+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEqual),
            '-' => self.scan_doubled(
                '-',
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusEqual,
            ),
            '*' => self.scan_with_equal(TokenKind::Star, TokenKind::StarEqual),
            '/' => self.scan_with_equal(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.scan_with_equal(TokenKind::Percent, TokenKind::PercentEqual),
            '<' => self.scan_with_equal(TokenKind::LessThan, TokenKind::LessThanEqual),
            '>' => self.scan_with_equal(TokenKind::GreaterThan, TokenKind::GreaterThanEqual),
            '=' => self.scan_with_equal(TokenKind::Equal, TokenKind::EqualEqual),
            '!' => self.scan_with_equal(TokenKind::Bang, TokenKind::NotEqual),
            '&' => self.scan_pair('&', TokenKind::AmpersandAmpersand),
            '|' => self.scan_pair('|', TokenKind::PipePipe),

            // String literals
            '"' | '\'' => self.scan_string(ch),

            // Numbers
            '0'..='9' => self.scan_number(ch),

            // Identifiers and keywords
            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid,
        };

        Token::new(kind, Span::new(start, self.current_pos))
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&self) -> Token {
        self.clone().next_token()
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\n' | '\r') => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some(ch) = self.peek() {
                            self.advance();
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    // Not a comment, it's a division operator
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn scan_with_equal(&mut self, single: TokenKind, with_equal: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with_equal
        } else {
            single
        }
    }

    fn scan_doubled(
        &mut self,
        ch: char,
        single: TokenKind,
        doubled: TokenKind,
        with_equal: TokenKind,
    ) -> TokenKind {
        match self.peek() {
            Some(next) if next == ch => {
                self.advance();
                doubled
            }
            Some('=') => {
                self.advance();
                with_equal
            }
            _ => single,
        }
    }

    fn scan_pair(&mut self, ch: char, pair: TokenKind) -> TokenKind {
        if self.peek() == Some(ch) {
            self.advance();
            pair
        } else {
            // Bitwise operators are not part of the language
            TokenKind::Invalid
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return TokenKind::Invalid, // Unterminated string
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => {
                    if let Some((_, escaped)) = self.advance() {
                        match escaped {
                            'n' => value.push('\n'),
                            'r' => value.push('\r'),
                            't' => value.push('\t'),
                            '\\' => value.push('\\'),
                            '\'' => value.push('\''),
                            '"' => value.push('"'),
                            _ => value.push(escaped),
                        }
                    }
                }
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut value = String::from(first);

        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            return self.scan_hex_number();
        }

        // Integer part
        self.scan_digits(&mut value);

        let mut decimal = false;

        // Fractional part, only when a digit follows the dot
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            decimal = true;
            value.push('.');
            self.advance();
            self.scan_digits(&mut value);
        }

        // Exponent part
        if matches!(self.peek(), Some('e' | 'E')) {
            decimal = true;
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            self.scan_digits(&mut value);
        }

        // Explicit double suffix
        if matches!(self.peek(), Some('d' | 'D')) {
            decimal = true;
            self.advance();
        }

        if decimal {
            match value.parse::<f64>() {
                Ok(n) => TokenKind::Decimal(n),
                Err(_) => TokenKind::Invalid,
            }
        } else {
            match value.parse::<i64>() {
                Ok(n) => TokenKind::Integer(n),
                Err(_) => TokenKind::Invalid,
            }
        }
    }

    fn scan_digits(&mut self, value: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_hex_number(&mut self) -> TokenKind {
        self.advance(); // consume 'x'
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_ascii_hexdigit() || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }

        match i64::from_str_radix(&value, 16) {
            Ok(n) => TokenKind::Integer(n),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "int" => TokenKind::Int,
            "double" => TokenKind::Double,
            "boolean" => TokenKind::Boolean,
            "String" => TokenKind::StringType,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(name),
        }
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        let mut scanner = Scanner::new("{ } ( ) ;");
        assert!(matches!(scanner.next_token().kind, TokenKind::LeftBrace));
        assert!(matches!(scanner.next_token().kind, TokenKind::RightBrace));
        assert!(matches!(scanner.next_token().kind, TokenKind::LeftParen));
        assert!(matches!(scanner.next_token().kind, TokenKind::RightParen));
        assert!(matches!(scanner.next_token().kind, TokenKind::Semicolon));
        assert!(matches!(scanner.next_token().kind, TokenKind::Eof));
    }

    #[test]
    fn test_numbers() {
        let mut scanner = Scanner::new("42 3.14 0xff 1e3 2d");
        assert_eq!(scanner.next_token().kind, TokenKind::Integer(42));
        assert_eq!(scanner.next_token().kind, TokenKind::Decimal(3.14));
        assert_eq!(scanner.next_token().kind, TokenKind::Integer(255));
        assert_eq!(scanner.next_token().kind, TokenKind::Decimal(1000.0));
        assert_eq!(scanner.next_token().kind, TokenKind::Decimal(2.0));
    }

    #[test]
    fn test_strings() {
        let mut scanner = Scanner::new(r#""hello" 'wor\nld'"#);
        assert_eq!(scanner.next_token().kind, TokenKind::String("hello".into()));
        assert_eq!(scanner.next_token().kind, TokenKind::String("wor\nld".into()));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(kinds("\"abc"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("if else while do for break continue return throw int boolean"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Do,
                TokenKind::For,
                TokenKind::Break,
                TokenKind::Continue,
                TokenKind::Return,
                TokenKind::Throw,
                TokenKind::Int,
                TokenKind::Boolean,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let mut scanner = Scanner::new("foo _bar baz9");
        assert_eq!(scanner.next_token().kind, TokenKind::Identifier("foo".into()));
        assert_eq!(scanner.next_token().kind, TokenKind::Identifier("_bar".into()));
        assert_eq!(scanner.next_token().kind, TokenKind::Identifier("baz9".into()));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("++ += - -- <= >= == != && || ! %="),
            vec![
                TokenKind::PlusPlus,
                TokenKind::PlusEqual,
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::LessThanEqual,
                TokenKind::GreaterThanEqual,
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::PercentEqual,
            ]
        );
    }

    #[test]
    fn test_single_ampersand_is_invalid() {
        assert_eq!(kinds("&"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("1 // line\n2 /* multi\nline */ 3"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Integer(2),
                TokenKind::Integer(3)
            ]
        );
    }

    #[test]
    fn test_division_vs_comment() {
        assert_eq!(
            kinds("6 / 2"),
            vec![TokenKind::Integer(6), TokenKind::Slash, TokenKind::Integer(2)]
        );
    }

    #[test]
    fn test_peek_token_does_not_consume() {
        let mut scanner = Scanner::new("x = 1");
        assert_eq!(scanner.peek_token().kind, TokenKind::Identifier("x".into()));
        assert_eq!(scanner.next_token().kind, TokenKind::Identifier("x".into()));
        assert_eq!(scanner.next_token().kind, TokenKind::Equal);
    }

    #[test]
    fn test_spans() {
        let mut scanner = Scanner::new("  while");
        let token = scanner.next_token();
        assert_eq!(token.span, Span::new(2, 7));
        assert_eq!(token.span.len(), 5);
    }
}
