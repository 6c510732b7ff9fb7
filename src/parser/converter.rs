//! Literal to BSON conversion
//!
//! Turns parsed literals into BSON values. Numbers follow the JavaScript
//! driver's encoding: integral values that fit 32 bits become `Int32`, larger
//! integral values `Int64`, everything else `Double`.

use mongodb::bson::{self, Bson, Decimal128, Document, oid::ObjectId};

use super::ast::*;
use crate::error::{ParseError, Result};

/// Converter for literal expressions to BSON
pub struct ExpressionConverter;

impl ExpressionConverter {
    /// Convert an expression to a BSON value
    pub fn expr_to_bson(expr: &Expr) -> Result<Bson> {
        match expr {
            Expr::Object(obj) => Self::object_to_bson(obj).map(Bson::Document),
            Expr::Array(arr) => Self::array_to_bson(arr).map(Bson::Array),
            Expr::String(s) => Ok(Bson::String(s.clone())),
            Expr::Number(n) => Ok(Self::number_to_bson(*n)),
            Expr::Boolean(b) => Ok(Bson::Boolean(*b)),
            Expr::Null => Ok(Bson::Null),
            Expr::Regex(re) => Ok(Self::regex_to_bson(re)),
            Expr::Constructor(ctor) => Self::constructor_to_bson(ctor),
        }
    }

    /// Convert an object to a BSON document
    pub fn object_to_bson(obj: &ObjectExpr) -> Result<Document> {
        let mut doc = Document::new();

        for prop in &obj.properties {
            let value = Self::expr_to_bson(&prop.value)?;
            doc.insert(prop.key.as_str(), value);
        }

        Ok(doc)
    }

    /// Convert an array to a BSON array
    pub fn array_to_bson(arr: &ArrayExpr) -> Result<Vec<Bson>> {
        arr.elements.iter().map(Self::expr_to_bson).collect()
    }

    /// Convert a number using the narrowest exact integer type
    pub fn number_to_bson(n: f64) -> Bson {
        if n.is_finite() && n.fract() == 0.0 {
            if n >= i32::MIN as f64 && n <= i32::MAX as f64 {
                return Bson::Int32(n as i32);
            }
            if n >= i64::MIN as f64 && n < i64::MAX as f64 {
                return Bson::Int64(n as i64);
            }
        }
        Bson::Double(n)
    }

    fn regex_to_bson(re: &RegexExpr) -> Bson {
        // BSON requires regex options in alphabetical order
        let mut options: Vec<char> = re.flags.chars().filter(|c| *c != 'g' && *c != 'y').collect();
        options.sort_unstable();
        options.dedup();

        Bson::RegularExpression(bson::Regex {
            pattern: re.pattern.clone(),
            options: options.into_iter().collect(),
        })
    }

    fn constructor_to_bson(ctor: &ConstructorExpr) -> Result<Bson> {
        let first = ctor.arguments.first();

        match ctor.kind {
            ConstructorKind::ObjectId => match first {
                None => Ok(Bson::ObjectId(ObjectId::new())),
                Some(Expr::String(s)) => ObjectId::parse_str(s)
                    .map(Bson::ObjectId)
                    .map_err(|e| ParseError::InvalidQuery(format!("Invalid ObjectId: {e}")).into()),
                Some(_) => Err(Self::bad_argument(ctor, "a hex string")),
            },
            ConstructorKind::Date => match first {
                None => Ok(Bson::DateTime(bson::DateTime::now())),
                Some(Expr::String(s)) => Self::parse_date_string(s),
                Some(Expr::Number(n)) => Self::exact_i64(n.trunc())
                    .map(|millis| Bson::DateTime(bson::DateTime::from_millis(millis)))
                    .ok_or_else(|| {
                        ParseError::InvalidQuery(format!("Invalid date: {n} is out of range")).into()
                    }),
                Some(_) => Err(Self::bad_argument(ctor, "a date string or milliseconds")),
            },
            ConstructorKind::NumberInt => match first {
                Some(Expr::Number(n)) => Self::exact_i64(*n)
                    .and_then(|v| i32::try_from(v).ok())
                    .map(Bson::Int32)
                    .ok_or_else(|| {
                        ParseError::InvalidQuery(format!("Invalid int: {n} is not a 32-bit integer"))
                            .into()
                    }),
                Some(Expr::String(s)) => s
                    .trim()
                    .parse::<i32>()
                    .map(Bson::Int32)
                    .map_err(|e| ParseError::InvalidQuery(format!("Invalid int: {e}")).into()),
                _ => Err(Self::bad_argument(ctor, "a number or string")),
            },
            ConstructorKind::NumberLong => match first {
                Some(Expr::Number(n)) => Self::exact_i64(*n).map(Bson::Int64).ok_or_else(|| {
                    ParseError::InvalidQuery(format!("Invalid long: {n} is not a 64-bit integer"))
                        .into()
                }),
                Some(Expr::String(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(Bson::Int64)
                    .map_err(|e| ParseError::InvalidQuery(format!("Invalid long: {e}")).into()),
                _ => Err(Self::bad_argument(ctor, "a number or string")),
            },
            ConstructorKind::NumberDecimal => match first {
                Some(Expr::Number(n)) if n.is_finite() => Self::parse_decimal(&n.to_string()),
                Some(Expr::String(s)) => Self::parse_decimal(s.trim()),
                _ => Err(Self::bad_argument(ctor, "a finite number or string")),
            },
        }
    }

    /// Integral and within `i64`, or `None`
    fn exact_i64(n: f64) -> Option<i64> {
        (n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64)
            .then_some(n as i64)
    }

    fn parse_decimal(s: &str) -> Result<Bson> {
        s.parse::<Decimal128>()
            .map(Bson::Decimal128)
            .map_err(|e| ParseError::InvalidQuery(format!("Invalid decimal: {e}")).into())
    }

    /// RFC 3339 timestamps, or a bare `YYYY-MM-DD` date taken as UTC midnight
    fn parse_date_string(s: &str) -> Result<Bson> {
        let parsed = bson::DateTime::parse_rfc3339_str(s).or_else(|err| {
            if s.len() == 10 {
                bson::DateTime::parse_rfc3339_str(format!("{s}T00:00:00Z"))
            } else {
                Err(err)
            }
        });

        parsed
            .map(Bson::DateTime)
            .map_err(|e| ParseError::InvalidQuery(format!("Invalid date string: {e}")).into())
    }

    fn bad_argument(ctor: &ConstructorExpr, expected: &str) -> crate::error::SearchLabError {
        ParseError::InvalidQuery(format!("{} expects {expected}", ctor.name)).into()
    }
}
