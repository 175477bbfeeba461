//! Hand-rolled character scanner.
//!
//! Grounded in the shape of the teacher's `vais-lexer::Lexer` (a struct
//! holding scan position plus a `source` slice) but scans by hand rather
//! than through a `logos`-derive table: the spec calls for an explicit
//! imperative procedure (two-character lookahead, line counting on every
//! newline including inside strings, a trailing-dot special case for
//! numbers) that doesn't map cleanly onto a declarative token table.

use crate::sink::ErrorSink;
use crate::token::{keyword_kind, Token, TokenKind};

pub struct Scanner<'a> {
    source: &'a [u8],
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans the whole source, reporting errors through `sink` and
    /// continuing past them, and returns the token stream terminated by
    /// a single `Eof` token.
    pub fn scan_tokens(mut self, sink: &mut dyn ErrorSink) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token(sink);
        }
        self.tokens.push(Token::eof(self.line));
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn lexeme(&self) -> String {
        String::from_utf8_lossy(&self.source[self.start..self.current]).into_owned()
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, self.line));
    }

    fn scan_token(&mut self, sink: &mut dyn ErrorSink) {
        let c = self.advance();
        match c {
            b'(' => self.add_token(TokenKind::LeftParen),
            b')' => self.add_token(TokenKind::RightParen),
            b'{' => self.add_token(TokenKind::LeftBrace),
            b'}' => self.add_token(TokenKind::RightBrace),
            b',' => self.add_token(TokenKind::Comma),
            b'.' => self.add_token(TokenKind::Dot),
            b'-' => self.add_token(TokenKind::Minus),
            b'+' => self.add_token(TokenKind::Plus),
            b';' => self.add_token(TokenKind::Semicolon),
            b'*' => self.add_token(TokenKind::Star),
            b'!' => {
                let kind = if self.matches(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            b'=' => {
                let kind = if self.matches(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.matches(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.matches(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            b'/' => {
                if self.matches(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            b' ' | b'\r' | b'\t' => {}
            b'\n' => self.line += 1,
            b'"' => self.scan_string(sink),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_alpha(c) => self.scan_identifier(),
            _ => sink.error_with_line(self.line, "Unexpected character."),
        }
    }

    fn scan_string(&mut self, sink: &mut dyn ErrorSink) {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            sink.error_with_line(self.line, "Unterminated string.");
            return;
        }

        // Consume the closing quote.
        self.advance();

        let value = String::from_utf8_lossy(&self.source[self.start + 1..self.current - 1])
            .into_owned();
        self.add_token(TokenKind::String(value));
    }

    fn scan_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            // Consume the '.'.
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.lexeme();
        let value: f64 = text.parse().expect("scanner only admits digit/dot characters");
        self.add_token(TokenKind::Number(value));
    }

    fn scan_identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }

        let text = self.lexeme();
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_alphanumeric(c: u8) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<TokenKind> {
        let mut sink = RecordingSink::default();
        Scanner::new(source)
            .scan_tokens(&mut sink)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_two_char_operators_before_one_char() {
        let kinds = scan("!= == <= >= ! = < >");
        assert_eq!(
            kinds,
            vec![
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Bang,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_consumed_up_to_not_including_newline() {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new("1 // comment\n2").scan_tokens(&mut sink);
        assert_eq!(tokens[0].kind, TokenKind::Number(1.0));
        assert_eq!(tokens[1].kind, TokenKind::Number(2.0));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn trailing_dot_without_fraction_does_not_consume_dot() {
        let kinds = scan("123.");
        assert_eq!(kinds, vec![TokenKind::Number(123.0), TokenKind::Dot, TokenKind::Eof]);
    }

    #[test]
    fn string_spans_newlines_and_tracks_line() {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new("\"a\nb\" 1").scan_tokens(&mut sink);
        assert_eq!(tokens[0].kind, TokenKind::String("a\nb".to_string()));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_reports_error_and_emits_no_token() {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new("\"abc").scan_tokens(&mut sink);
        assert_eq!(tokens, vec![Token::eof(1)]);
        assert_eq!(sink.messages, vec!["[line 1] Error: Unterminated string."]);
    }

    #[test]
    fn unknown_character_reports_error_and_continues() {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new("@ 1").scan_tokens(&mut sink);
        assert_eq!(sink.messages, vec!["[line 1] Error: Unexpected character."]);
        assert_eq!(tokens[0].kind, TokenKind::Number(1.0));
    }

    #[test]
    fn keyword_and_identifier_are_distinguished() {
        let kinds = scan("class fun orchid");
        assert_eq!(
            kinds,
            vec![TokenKind::Class, TokenKind::Fun, TokenKind::Identifier, TokenKind::Eof]
        );
    }
}
