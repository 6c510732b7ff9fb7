//! Recursive-descent parser for query literals
//!
//! Accepts the literal subset a MongoDB query is written in: objects, arrays,
//! strings, numbers, booleans, null, regex literals and a handful of BSON type
//! helpers. Anything that would need evaluation (variables, member access,
//! arbitrary calls, operators) is rejected with a positioned syntax error.
//!
//! Two entry points:
//! - [`LiteralParser::parse_value`] for a single literal (`{...}` or `[...]`)
//! - [`LiteralParser::parse_method_chain`] for `find({...}).sort({...}).limit(5)`

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{ParseError, Result};

/// Deepest nesting of arrays, objects and constructor calls accepted.
/// Matches the server's own document nesting limit.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Literal parser over a token stream
pub struct LiteralParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    /// Create a new parser from input string
    pub fn new(input: &str) -> Self {
        let tokens = Lexer::tokenize(input);
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse the whole input as exactly one literal value
    pub fn parse_value(input: &str) -> Result<Expr> {
        let mut parser = Self::new(input);
        let value = parser.parse_expression()?;
        parser.expect_end()?;
        Ok(value)
    }

    /// Parse the whole input as a method chain: `name(args)(.name(args))*`
    pub fn parse_method_chain(input: &str) -> Result<Vec<MethodCall>> {
        let mut parser = Self::new(input);
        let mut calls = vec![parser.parse_method_call()?];

        while parser.match_token(&TokenKind::Dot) {
            calls.push(parser.parse_method_call()?);
        }

        parser.expect_end()?;
        Ok(calls)
    }

    /// Parse `name(arg, ...)`
    fn parse_method_call(&mut self) -> Result<MethodCall> {
        let start = self.current_pos();
        let name = self.expect_identifier("method name")?;
        self.expect_token(&TokenKind::LParen, "'(' after method name")?;
        let arguments = self.parse_arguments()?;
        self.expect_token(&TokenKind::RParen, "')' after arguments")?;
        let end = self.previous_pos();
        Ok(MethodCall::new(name, arguments, start..end))
    }

    /// Parse a literal value, bounding recursion
    fn parse_expression(&mut self) -> Result<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::SyntaxError(format!(
                "nesting too deep at position {}; at most {MAX_NESTING_DEPTH} levels are allowed",
                self.current_pos()
            ))
            .into());
        }

        self.depth += 1;
        let value = self.parse_literal();
        self.depth -= 1;
        value
    }

    fn parse_literal(&mut self) -> Result<Expr> {
        let start = self.current_pos();

        // Signed numbers: -5, +3, -Infinity
        if self.check(&TokenKind::Minus) || self.check(&TokenKind::Plus) {
            let negative = self.check(&TokenKind::Minus);
            self.advance();
            let magnitude = self.parse_unsigned_number()?;
            return Ok(Expr::Number(if negative { -magnitude } else { magnitude }));
        }

        let token = self.current_token().clone();
        match token.kind {
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            TokenKind::Number(_) => Ok(Expr::Number(self.parse_unsigned_number()?)),
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Self::validate_regex_flags(&flags)?;
                Ok(Expr::Regex(RegexExpr {
                    pattern,
                    flags,
                    span: token.span,
                }))
            }
            TokenKind::LBrace => self.parse_object(start),
            TokenKind::LBracket => self.parse_array(start),
            TokenKind::Ident(name) => {
                self.advance();
                self.parse_identifier_value(name, start)
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    /// Keywords, numeric constants and BSON helpers
    fn parse_identifier_value(&mut self, name: String, start: usize) -> Result<Expr> {
        match name.as_str() {
            "true" => return Ok(Expr::Boolean(true)),
            "false" => return Ok(Expr::Boolean(false)),
            "null" | "undefined" => return Ok(Expr::Null),
            "Infinity" => return Ok(Expr::Number(f64::INFINITY)),
            "NaN" => return Ok(Expr::Number(f64::NAN)),
            _ => {}
        }

        let (name, is_new) = if name == "new" {
            (self.expect_identifier("constructor name after 'new'")?, true)
        } else {
            (name, false)
        };

        let Some(kind) = ConstructorKind::from_name(&name) else {
            return Err(ParseError::SyntaxError(format!(
                "unknown identifier '{name}' at position {start}; only literal values are allowed"
            ))
            .into());
        };

        let arguments = if self.match_token(&TokenKind::LParen) {
            let arguments = self.parse_arguments()?;
            self.expect_token(&TokenKind::RParen, "')' after arguments")?;
            arguments
        } else if is_new {
            Vec::new()
        } else {
            return Err(ParseError::SyntaxError(format!(
                "'{name}' at position {start} must be called, e.g. {name}(...)"
            ))
            .into());
        };

        let end = self.previous_pos();
        Ok(Expr::Constructor(ConstructorExpr {
            kind,
            name,
            arguments,
            span: start..end,
        }))
    }

    fn parse_unsigned_number(&mut self) -> Result<f64> {
        let token = self.current_token().clone();
        match token.kind {
            TokenKind::Number(raw) => {
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| ParseError::SyntaxError(format!("invalid number: {raw}")))?;
                self.advance();
                Ok(value)
            }
            TokenKind::Ident(ref name) if name == "Infinity" => {
                self.advance();
                Ok(f64::INFINITY)
            }
            _ => Err(self.unexpected("a number after sign")),
        }
    }

    /// Parse object literal: { key: value, ... }
    fn parse_object(&mut self, start: usize) -> Result<Expr> {
        self.expect_token(&TokenKind::LBrace, "'{'")?;

        let mut properties = Vec::new();

        if self.match_token(&TokenKind::RBrace) {
            let end = self.previous_pos();
            return Ok(Expr::Object(ObjectExpr::new(properties, start..end)));
        }

        loop {
            let prop_start = self.current_pos();
            let key = self.parse_property_key()?;
            self.expect_token(&TokenKind::Colon, "':' after property key")?;
            let value = self.parse_expression()?;
            let prop_end = self.previous_pos();
            properties.push(Property::new(key, value, prop_start..prop_end));

            if self.match_token(&TokenKind::Comma) {
                // Allow trailing comma
                if self.check(&TokenKind::RBrace) {
                    break;
                }
            } else if self.check(&TokenKind::RBrace) {
                break;
            } else {
                return Err(self.unexpected("',' or '}' after property"));
            }
        }

        self.expect_token(&TokenKind::RBrace, "'}'")?;
        let end = self.previous_pos();

        Ok(Expr::Object(ObjectExpr::new(properties, start..end)))
    }

    /// Parse property key (identifier, string, or number)
    fn parse_property_key(&mut self) -> Result<PropertyKey> {
        let key = match &self.current_token().kind {
            TokenKind::Ident(name) => PropertyKey::Ident(name.clone()),
            TokenKind::String(s) => PropertyKey::String(s.clone()),
            TokenKind::Number(n) => PropertyKey::Number(n.clone()),
            _ => return Err(self.unexpected("property key")),
        };
        self.advance();
        Ok(key)
    }

    /// Parse array literal: [elem1, elem2, ...]
    fn parse_array(&mut self, start: usize) -> Result<Expr> {
        self.expect_token(&TokenKind::LBracket, "'['")?;

        let mut elements = Vec::new();

        if self.match_token(&TokenKind::RBracket) {
            let end = self.previous_pos();
            return Ok(Expr::Array(ArrayExpr::new(elements, start..end)));
        }

        loop {
            elements.push(self.parse_expression()?);

            if self.match_token(&TokenKind::Comma) {
                if self.check(&TokenKind::RBracket) {
                    break;
                }
            } else if self.check(&TokenKind::RBracket) {
                break;
            } else {
                return Err(self.unexpected("',' or ']' after array element"));
            }
        }

        self.expect_token(&TokenKind::RBracket, "']'")?;
        let end = self.previous_pos();

        Ok(Expr::Array(ArrayExpr::new(elements, start..end)))
    }

    /// Parse call arguments up to (not including) the closing parenthesis
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut arguments = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);

            if self.match_token(&TokenKind::Comma) {
                if self.check(&TokenKind::RParen) {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(arguments)
    }

    fn validate_regex_flags(flags: &str) -> Result<()> {
        match flags.chars().find(|c| !"gimsuxy".contains(*c)) {
            Some(flag) => {
                Err(ParseError::SyntaxError(format!("invalid regex flag '{flag}'")).into())
            }
            None => Ok(()),
        }
    }

    // Token manipulation methods

    fn current_token(&self) -> &Token {
        // The stream always ends with Eof and `advance` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current_token().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect_token(&mut self, kind: &TokenKind, expected: &str) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String> {
        match &self.current_token().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn unexpected(&self, expected: &str) -> crate::error::SearchLabError {
        let token = self.current_token();
        let found = match &token.kind {
            TokenKind::Eof => "end of input".to_string(),
            kind => format!("{} at position {}", kind.describe(), token.span.start),
        };
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
        }
        .into()
    }

    fn current_pos(&self) -> usize {
        self.current_token().span.start
    }

    fn previous_pos(&self) -> usize {
        if self.pos > 0 {
            if let Some(token) = self.tokens.get(self.pos - 1) {
                return token.span.end;
            }
        }
        0
    }
}
