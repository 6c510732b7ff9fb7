//! Tokenizer for query literals
//!
//! Produces tokens for the literal subset accepted by the query parser:
//! objects, arrays, strings, numbers, regex literals, identifiers and the
//! punctuation used by method chains (`find({...}).limit(5)`).
//!
//! The lexer never fails. Characters it does not understand become `Unknown`
//! tokens and unterminated strings or regexes become `Invalid` tokens; the
//! parser turns both into syntax errors with a position.

use std::ops::Range;

/// Token types for query literals
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier (operator key, keyword, constructor or method name)
    Ident(String),
    /// Dot separator
    Dot,
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Left brace
    LBrace,
    /// Right brace
    RBrace,
    /// Left bracket
    LBracket,
    /// Right bracket
    RBracket,
    /// Comma
    Comma,
    /// Colon
    Colon,
    /// Minus sign
    Minus,
    /// Plus sign
    Plus,
    /// String literal (escapes resolved)
    String(String),
    /// Number literal (raw text)
    Number(String),
    /// Regex literal: /pattern/flags
    Regex { pattern: String, flags: String },
    /// Malformed literal with a description
    Invalid(String),
    /// End of input
    Eof,
    /// Unknown character
    Unknown(char),
}

impl TokenKind {
    /// Short human-readable description used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::String(_) => "string".to_string(),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Regex { .. } => "regex".to_string(),
            TokenKind::Invalid(msg) => msg.clone(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Unknown(ch) => format!("'{ch}'"),
        }
    }
}

/// Token with position information
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }
}

/// Query literal lexer
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    /// Create a new lexer from input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input; the last token is always `Eof`
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Self::new(input);
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token();
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        if self.is_at_end() {
            return Token::new(TokenKind::Eof, start..start);
        }

        let ch = self.current_char();

        // `.5` is a number, not member access
        if ch == '.' && self.peek_char().is_ascii_digit() {
            return self.scan_number(start);
        }

        let single = match ch {
            '.' => Some(TokenKind::Dot),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            '-' => Some(TokenKind::Minus),
            '+' => Some(TokenKind::Plus),
            _ => None,
        };

        if let Some(kind) = single {
            self.advance();
            return Token::new(kind, start..self.pos);
        }

        match ch {
            '\'' | '"' => self.scan_string(ch, start),
            '/' => self.scan_regex(start),
            '0'..='9' => self.scan_number(start),
            c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_identifier(start),
            _ => {
                self.advance();
                Token::new(TokenKind::Unknown(ch), start..self.pos)
            }
        }
    }

    /// Scan a string literal
    fn scan_string(&mut self, quote: char, start: usize) -> Token {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while !self.is_at_end() && self.current_char() != quote {
            let ch = self.current_char();
            if ch == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                match self.current_char() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'b' => value.push('\u{0008}'),
                    'f' => value.push('\u{000C}'),
                    'v' => value.push('\u{000B}'),
                    '0' => value.push('\0'),
                    'u' => match self.scan_unicode_escape() {
                        Some(decoded) => value.push(decoded),
                        None => {
                            return Token::new(
                                TokenKind::Invalid("invalid \\u escape in string".to_string()),
                                start..self.pos,
                            );
                        }
                    },
                    // \\ \' \" \/ and any other escaped character stand for themselves
                    other => value.push(other),
                }
            } else {
                value.push(ch);
            }
            self.advance();
        }

        if self.is_at_end() {
            return Token::new(
                TokenKind::Invalid("unterminated string".to_string()),
                start..self.pos,
            );
        }

        self.advance(); // Skip closing quote
        Token::new(TokenKind::String(value), start..self.pos)
    }

    /// Decode `\uXXXX`, joining a `\uD83D\uDE00` surrogate pair into one char.
    /// Leaves the cursor on the last hex digit.
    fn scan_unicode_escape(&mut self) -> Option<char> {
        let high = self.read_hex4()?;
        if !(0xD800..=0xDBFF).contains(&high) {
            return char::from_u32(high);
        }

        if self.char_at(self.pos + 1) != '\\' || self.char_at(self.pos + 2) != 'u' {
            return None;
        }
        self.advance();
        self.advance();
        let low = self.read_hex4()?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return None;
        }
        char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
    }

    fn read_hex4(&mut self) -> Option<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            self.advance();
            if self.is_at_end() {
                return None;
            }
            code = code * 16 + self.current_char().to_digit(16)?;
        }
        Some(code)
    }

    /// Scan a regex literal: /pattern/flags
    fn scan_regex(&mut self, start: usize) -> Token {
        self.advance(); // Skip opening slash

        let mut pattern = String::new();
        let mut in_class = false;

        loop {
            if self.is_at_end() || self.current_char() == '\n' {
                return Token::new(
                    TokenKind::Invalid("unterminated regex literal".to_string()),
                    start..self.pos,
                );
            }

            let ch = self.current_char();
            match ch {
                '\\' => {
                    pattern.push(ch);
                    self.advance();
                    if !self.is_at_end() {
                        pattern.push(self.current_char());
                    }
                }
                '[' => {
                    in_class = true;
                    pattern.push(ch);
                }
                ']' => {
                    in_class = false;
                    pattern.push(ch);
                }
                '/' if !in_class => {
                    self.advance();
                    break;
                }
                _ => pattern.push(ch),
            }
            self.advance();
        }

        let mut flags = String::new();
        while !self.is_at_end() && self.current_char().is_ascii_alphabetic() {
            flags.push(self.current_char());
            self.advance();
        }

        Token::new(TokenKind::Regex { pattern, flags }, start..self.pos)
    }

    /// Scan a number: integer, decimal, optional exponent
    fn scan_number(&mut self, start: usize) -> Token {
        let mut value = String::new();

        self.consume_digits(&mut value);
        if value.is_empty() {
            value.push('0');
        }

        // Decimal point only when followed by a digit, so `1.toString` stays two tokens
        if self.current_char() == '.' && self.peek_char().is_ascii_digit() {
            value.push('.');
            self.advance();
            self.consume_digits(&mut value);
        }

        if matches!(self.current_char(), 'e' | 'E') {
            let sign = self.peek_char();
            let has_sign = sign == '+' || sign == '-';
            let digit_at = if has_sign { 2 } else { 1 };
            if self.char_at(self.pos + digit_at).is_ascii_digit() {
                value.push('e');
                self.advance();
                if has_sign {
                    value.push(sign);
                    self.advance();
                }
                self.consume_digits(&mut value);
            }
        }

        Token::new(TokenKind::Number(value), start..self.pos)
    }

    fn consume_digits(&mut self, value: &mut String) {
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }
    }

    /// Scan an identifier
    fn scan_identifier(&mut self, start: usize) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Ident(value), start..self.pos)
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn current_char(&self) -> char {
        self.char_at(self.pos)
    }

    fn peek_char(&self) -> char {
        self.char_at(self.pos + 1)
    }

    fn char_at(&self, index: usize) -> char {
        self.input.get(index).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}
