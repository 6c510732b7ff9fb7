//! Syntax tree for query literals
//!
//! Only data shapes are representable: there are no identifiers, member
//! accesses or arbitrary calls. The one exception is [`ConstructorExpr`],
//! which is restricted to a fixed list of BSON type helpers.

use std::ops::Range;

/// Span information for source locations
pub type Span = Range<usize>;

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Object literal: { key: value, ... }
    Object(ObjectExpr),
    /// Array literal: [1, 2, 3]
    Array(ArrayExpr),
    /// String literal: "hello" or 'world'
    String(String),
    /// Number literal, sign already applied
    Number(f64),
    /// Boolean literal: true or false
    Boolean(bool),
    /// null or undefined
    Null,
    /// Regex literal: /pattern/flags
    Regex(RegexExpr),
    /// BSON type helper: ObjectId("..."), new Date(...), NumberLong(...)
    Constructor(ConstructorExpr),
}

/// Object expression: { key: value, ... }
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpr {
    pub properties: Vec<Property>,
    pub span: Span,
}

impl ObjectExpr {
    pub fn new(properties: Vec<Property>, span: Span) -> Self {
        Self { properties, span }
    }
}

/// Object property: key: value
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub span: Span,
}

impl Property {
    pub fn new(key: PropertyKey, value: Expr, span: Span) -> Self {
        Self { key, value, span }
    }
}

/// Property key (identifier, string, or number)
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Ident(String),
    String(String),
    Number(String),
}

impl PropertyKey {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyKey::Ident(s) | PropertyKey::String(s) | PropertyKey::Number(s) => s,
        }
    }
}

/// Array expression: [1, 2, 3]
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

impl ArrayExpr {
    pub fn new(elements: Vec<Expr>, span: Span) -> Self {
        Self { elements, span }
    }
}

/// Regex literal
#[derive(Debug, Clone, PartialEq)]
pub struct RegexExpr {
    pub pattern: String,
    pub flags: String,
    pub span: Span,
}

/// Supported BSON type helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorKind {
    ObjectId,
    Date,
    NumberInt,
    NumberLong,
    NumberDecimal,
}

impl ConstructorKind {
    /// Resolve a helper name; `None` for anything outside the supported set
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ObjectId" => Some(Self::ObjectId),
            "ISODate" | "Date" => Some(Self::Date),
            "NumberInt" => Some(Self::NumberInt),
            "NumberLong" | "Long" => Some(Self::NumberLong),
            "NumberDecimal" | "Decimal128" => Some(Self::NumberDecimal),
            _ => None,
        }
    }
}

/// Constructor call: ObjectId("..."), new Date(...)
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorExpr {
    pub kind: ConstructorKind,
    pub name: String,
    pub arguments: Vec<Expr>,
    pub span: Span,
}

/// One link of a method chain: `name(arg, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub arguments: Vec<Expr>,
    pub span: Span,
}

impl MethodCall {
    pub fn new(name: String, arguments: Vec<Expr>, span: Span) -> Self {
        Self {
            name,
            arguments,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_key_as_str() {
        assert_eq!(PropertyKey::Ident("$match".to_string()).as_str(), "$match");
        assert_eq!(PropertyKey::String("title".to_string()).as_str(), "title");
        assert_eq!(PropertyKey::Number("1".to_string()).as_str(), "1");
    }

    #[test]
    fn test_constructor_aliases() {
        assert_eq!(ConstructorKind::from_name("ISODate"), Some(ConstructorKind::Date));
        assert_eq!(ConstructorKind::from_name("Long"), Some(ConstructorKind::NumberLong));
        assert_eq!(
            ConstructorKind::from_name("Decimal128"),
            Some(ConstructorKind::NumberDecimal)
        );
        assert_eq!(ConstructorKind::from_name("eval"), None);
        assert_eq!(ConstructorKind::from_name("Function"), None);
    }
}
