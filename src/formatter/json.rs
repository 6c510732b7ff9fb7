//! BSON to JSON conversion
//!
//! Results leave the server as plain JSON rather than Extended JSON, so a
//! browser or a terminal can show them without knowing about BSON types:
//! - ObjectId → 24-char hex string
//! - DateTime → ISO 8601 string
//! - Binary → Base64 string
//! - Regex → `/pattern/options` string
//! - Decimal128 → decimal string
//! - Timestamp → `{ "t": .., "i": .. }`

use colored_json::prelude::*;
use mongodb::bson::{Binary, Bson, DateTime, Document};
use serde_json::{Map, Value as JsonValue};

/// Simplified BSON to JSON converter
pub struct JsonConverter;

impl JsonConverter {
    /// Convert one BSON value
    pub fn convert(value: &Bson) -> JsonValue {
        match value {
            Bson::String(s) => JsonValue::String(s.clone()),
            Bson::Int32(n) => JsonValue::Number((*n).into()),
            Bson::Int64(n) => JsonValue::Number((*n).into()),
            Bson::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Bson::Boolean(b) => JsonValue::Bool(*b),
            Bson::Null | Bson::Undefined => JsonValue::Null,
            Bson::ObjectId(oid) => JsonValue::String(oid.to_hex()),
            Bson::DateTime(dt) => JsonValue::String(datetime_to_iso_string(dt)),
            Bson::Decimal128(d) => JsonValue::String(d.to_string()),
            Bson::Array(arr) => JsonValue::Array(arr.iter().map(Self::convert).collect()),
            Bson::Document(doc) => Self::convert_document(doc),
            Bson::Binary(bin) => JsonValue::String(binary_to_base64(bin)),
            Bson::RegularExpression(re) => {
                JsonValue::String(format!("/{}/{}", re.pattern, re.options))
            }
            Bson::Timestamp(ts) => serde_json::json!({ "t": ts.time, "i": ts.increment }),
            Bson::MinKey => JsonValue::String("MinKey".to_string()),
            Bson::MaxKey => JsonValue::String("MaxKey".to_string()),
            other => JsonValue::String(format!("{other:?}")),
        }
    }

    /// Convert a document, preserving key order
    pub fn convert_document(doc: &Document) -> JsonValue {
        let map: Map<String, JsonValue> = doc
            .iter()
            .map(|(key, value)| (key.clone(), Self::convert(value)))
            .collect();
        JsonValue::Object(map)
    }
}

/// Render JSON for a terminal
pub struct JsonFormatter {
    pretty: bool,
    use_colors: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool, use_colors: bool) -> Self {
        Self { pretty, use_colors }
    }

    /// Format a value; colors only apply to pretty output
    pub fn format(&self, value: &JsonValue) -> String {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .unwrap_or_else(|_| value.to_string());

        if self.use_colors && self.pretty {
            text.to_colored_json_auto().unwrap_or(text)
        } else {
            text
        }
    }
}

/// ISO 8601, or the raw millisecond count when out of range
pub fn datetime_to_iso_string(dt: &DateTime) -> String {
    dt.try_to_rfc3339_string()
        .unwrap_or_else(|_| dt.timestamp_millis().to_string())
}

pub fn binary_to_base64(bin: &Binary) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(&bin.bytes)
}
