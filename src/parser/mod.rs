//! Query parsing for search-lab
//!
//! Turns the text a learner typed into BSON without evaluating it.
//!
//! # Architecture
//!
//! - `normalizer`: trims the raw string and classifies its shape
//! - `lexer`: error-tolerant tokenizer for literals
//! - `ast`: literal syntax tree
//! - `literal_parser`: recursive-descent parser (values and method chains)
//! - `converter`: syntax tree to BSON
//!
//! # Examples
//!
//! ```
//! use search_lab::parser::{self, ParsedQuery};
//!
//! let parsed = parser::parse_query("{ year: { $gte: 1999 } }").unwrap();
//! assert!(matches!(parsed, ParsedQuery::Filter(_)));
//!
//! let parsed = parser::parse_query("[{ $match: {} }, { $limit: 5 }]").unwrap();
//! assert!(matches!(parsed, ParsedQuery::Pipeline(ref stages) if stages.len() == 2));
//! ```

pub mod ast;
pub mod converter;
pub mod lexer;
pub mod literal_parser;
pub mod normalizer;

use mongodb::bson::{Bson, Document};

pub use ast::{Expr, MethodCall};
pub use converter::ExpressionConverter;
pub use literal_parser::LiteralParser;
pub use normalizer::{NormalizedQuery, QueryNormalizer};

use crate::error::{ParseError, Result};

/// A parsed filter or pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedQuery {
    /// A single mapping: filter semantics
    Filter(Document),

    /// An ordered sequence of stages: pipeline semantics
    Pipeline(Vec<Document>),
}

/// Parse one literal into BSON; blank input is an empty document
pub fn parse_literal(input: &str) -> Result<Bson> {
    if input.trim().is_empty() {
        return Ok(Bson::Document(Document::new()));
    }
    let expr = LiteralParser::parse_value(input)?;
    ExpressionConverter::expr_to_bson(&expr)
}

/// Parse a filter object or a pipeline array
pub fn parse_query(input: &str) -> Result<ParsedQuery> {
    match parse_literal(input)? {
        Bson::Document(doc) => Ok(ParsedQuery::Filter(doc)),
        Bson::Array(items) => Ok(ParsedQuery::Pipeline(stages_from_array(items)?)),
        other => Err(ParseError::InvalidQuery(format!(
            "expected an object or an array of stages, found {}",
            bson_type_name(&other)
        ))
        .into()),
    }
}

/// Parse a pipeline array; anything else is an error
pub fn parse_pipeline(input: &str) -> Result<Vec<Document>> {
    match parse_literal(input)? {
        Bson::Array(items) => stages_from_array(items),
        other => Err(ParseError::InvalidPipeline(format!(
            "expected an array of stages, found {}",
            bson_type_name(&other)
        ))
        .into()),
    }
}

/// Parse `name(args)(.name(args))*`
pub fn parse_method_chain(input: &str) -> Result<Vec<MethodCall>> {
    LiteralParser::parse_method_chain(input)
        .map_err(|e| ParseError::InvalidMethodCall(e.to_string()).into())
}

/// Check every pipeline element is a stage document
pub fn stages_from_array(items: Vec<Bson>) -> Result<Vec<Document>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Bson::Document(stage) => Ok(stage),
            other => Err(ParseError::InvalidPipeline(format!(
                "stage {index} must be an object, found {}",
                bson_type_name(&other)
            ))
            .into()),
        })
        .collect()
}

/// Short type name for error messages
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::String(_) => "string",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => "number",
        Bson::Boolean(_) => "boolean",
        Bson::Null | Bson::Undefined => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::DateTime(_) => "date",
        Bson::ObjectId(_) => "ObjectId",
        _ => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_input_is_empty_filter() {
        assert_eq!(parse_query("").unwrap(), ParsedQuery::Filter(Document::new()));
        assert_eq!(parse_query("   ").unwrap(), ParsedQuery::Filter(Document::new()));
    }

    #[test]
    fn test_scalar_is_rejected() {
        let err = parse_query("'The Matrix'").unwrap_err();
        assert!(err.to_string().contains("found string"));
    }

    #[test]
    fn test_pipeline_requires_documents() {
        let err = parse_pipeline("[{$match: {}}, 5]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid pipeline: stage 1 must be an object, found number"
        );
        assert!(parse_pipeline("{$match: {}}").is_err());
    }

    #[test]
    fn test_method_chain_errors_are_method_call_errors() {
        let err = parse_method_chain("find(").unwrap_err();
        assert!(err.to_string().starts_with("Invalid method call format"));
    }

    #[test]
    fn test_literal_matches_canonical_json() {
        let relaxed = "{title: 'The Matrix', year: {$gte: 1999, $lte: 2003}, tags: ['a', 'b']}";
        let canonical = r#"{"year": {"$lte": 2003, "$gte": 1999}, "tags": ["a", "b"], "title": "The Matrix"}"#;

        let from_relaxed = match parse_query(relaxed).unwrap() {
            ParsedQuery::Filter(doc) => Bson::Document(doc).into_relaxed_extjson(),
            other => panic!("Expected filter, got {other:?}"),
        };
        let from_canonical = match parse_query(canonical).unwrap() {
            ParsedQuery::Filter(doc) => Bson::Document(doc).into_relaxed_extjson(),
            other => panic!("Expected filter, got {other:?}"),
        };

        // serde_json maps compare without regard to key order
        assert_eq!(from_relaxed, from_canonical);
        assert_eq!(
            from_relaxed,
            json!({"title": "The Matrix", "year": {"$gte": 1999, "$lte": 2003}, "tags": ["a", "b"]})
        );
    }
}
