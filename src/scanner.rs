//! Lexical analyzer

use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::{Diagnostics, Position};
use crate::token::Token;

/// Turns source text into a sequence of tokens.
///
/// Lexical errors go to the diagnostics context and scanning continues, so
/// a single pass reports everything that is wrong with the input.  After
/// the end of input every call yields `Token::Eof`.
pub struct Scanner {
    chars: Vec<char>,
    current: usize,
    line: Position,
    ctx: Rc<Context>,
    diag: Rc<Diagnostics>,

    // Buffer used when scanning longer tokens.  Allocated here to reuse memory.
    buf: String,
}

impl Scanner {
    /// Creates a new scanner operating on `source`.
    pub fn new(source: &str, ctx: Rc<Context>, diag: Rc<Diagnostics>) -> Scanner {
        Scanner {
            chars: source.chars().collect(),
            current: 0,
            line: 1,
            ctx,
            diag,
            buf: String::new(),
        }
    }

    /// Scans the next token and returns it along with its line.
    pub fn get_token(&mut self) -> (Position, Token) {
        let token = self.get_raw_token();
        (self.line, token)
    }

    fn get_raw_token(&mut self) -> Token {
        loop {
            let ch = match self.advance() {
                None => return Token::Eof,
                Some(ch) => ch,
            };
            match ch {
                '\n' => self.line += 1,
                ' ' | '\t' | '\r' => (),
                '(' => return Token::LeftParen,
                ')' => return Token::RightParen,
                '{' => return Token::LeftCurly,
                '}' => return Token::RightCurly,
                ',' => return Token::Comma,
                '.' => return Token::Dot,
                '-' => return Token::Minus,
                '+' => return Token::Plus,
                ';' => return Token::Semicolon,
                '*' => return Token::Star,
                '/' => {
                    if self.matches('/') {
                        self.skip_line_comment();
                    } else if self.matches('*') {
                        self.skip_block_comment();
                    } else {
                        return Token::Slash;
                    }
                }
                '!' => {
                    return if self.matches('=') {
                        Token::BangEqual
                    } else {
                        Token::Bang
                    }
                }
                '=' => {
                    return if self.matches('=') {
                        Token::EqualEqual
                    } else {
                        Token::Equal
                    }
                }
                '<' => {
                    return if self.matches('=') {
                        Token::LessEqual
                    } else {
                        Token::Less
                    }
                }
                '>' => {
                    return if self.matches('=') {
                        Token::GreaterEqual
                    } else {
                        Token::Greater
                    }
                }
                '"' => {
                    if let Some(token) = self.scan_string() {
                        return token;
                    }
                }
                '0'..='9' => return self.scan_number(ch),
                'a'..='z' | 'A'..='Z' | '_' => return self.scan_identifier(ch),
                _ => self.diag.error(self.line, "Unexpected character."),
            };
        }
    }

    /// Scans the remainder of a string literal.  The opening quote has been
    /// consumed.  Returns `None` when the string never closes.
    fn scan_string(&mut self) -> Option<Token> {
        self.buf.clear();
        loop {
            match self.advance() {
                None => {
                    self.diag.error(self.line, "Unterminated string.");
                    return None;
                }
                Some('"') => return Some(Token::Str(Rc::from(self.buf.as_str()))),
                Some(ch) => {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    self.buf.push(ch);
                }
            }
        }
    }

    fn scan_number(&mut self, first_digit: char) -> Token {
        self.buf.clear();
        self.buf.push(first_digit);
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.buf.push(ch);
            self.current += 1;
        }

        // A fractional part needs a digit after the dot; a trailing dot is
        // left for the parser to reject.
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(ch) if ch.is_ascii_digit()) {
            self.buf.push('.');
            self.current += 1;
            while let Some(ch) = self.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                self.buf.push(ch);
                self.current += 1;
            }
        }

        let n = self
            .buf
            .parse::<f64>()
            .expect("digit sequences always parse as f64");
        Token::Number(n)
    }

    fn scan_identifier(&mut self, first_char: char) -> Token {
        self.buf.clear();
        self.buf.push(first_char);
        while let Some(ch) = self.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            self.buf.push(ch);
            self.current += 1;
        }

        let sym = self.ctx.symbol(&self.buf);
        if let Some(token) = self.ctx.keyword(&sym) {
            token
        } else {
            Token::Identifier(sym)
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.current += 1;
        }
    }

    /// Consumes a block comment up to and including the closing `*/`.
    fn skip_block_comment(&mut self) {
        loop {
            match self.advance() {
                None => {
                    self.diag.error(self.line, "Unclosed comment");
                    return;
                }
                Some('*') if self.peek() == Some('/') => {
                    self.current += 1;
                    return;
                }
                Some('\n') => self.line += 1,
                Some(_) => (),
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.current).copied();
        if ch.is_some() {
            self.current += 1;
        }
        ch
    }

    /// Consumes the next character if it equals `expected`.
    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }
}

impl Iterator for Scanner {
    type Item = (Position, Token);

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_token() {
            (_, Token::Eof) => None,
            t => Some(t),
        }
    }
}
