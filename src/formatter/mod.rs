//! Output formatting
//!
//! - `json`: BSON to plain JSON, and terminal JSON rendering
//! - `colorizer`: ANSI colors for terminal messages
//!
//! [`ResultFormatter`] turns an execution result into the `results` value
//! of an API response.

pub mod colorizer;
pub mod json;

use serde_json::Value;

pub use colorizer::Colorizer;
pub use json::{JsonConverter, JsonFormatter};

use crate::executor::ResultData;

/// Converts result data to response JSON
pub struct ResultFormatter;

impl ResultFormatter {
    /// JSON value for the `results` field.
    ///
    /// Cursors and distinct values become arrays, a single document an
    /// object, a count a number, and an empty `findOne` `null`.
    pub fn to_json(data: &ResultData) -> Value {
        match data {
            ResultData::Documents(docs) => {
                Value::Array(docs.iter().map(JsonConverter::convert_document).collect())
            }
            ResultData::Document(doc) => JsonConverter::convert_document(doc),
            ResultData::Count(n) => Value::from(*n),
            ResultData::Values(values) => {
                Value::Array(values.iter().map(JsonConverter::convert).collect())
            }
            ResultData::None => Value::Null,
        }
    }
}
