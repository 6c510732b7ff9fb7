//! Query string normalization
//!
//! Cleans up a raw query string and decides which of the three accepted
//! shapes it has. Only the syntactic checks needed for classification happen
//! here; the content is validated by the literal parser.

/// Shape of a raw query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedQuery {
    /// `[ ... ]`: an aggregation pipeline literal
    Pipeline(String),

    /// `db.<collection>.<call>`: a method call scoped to a named collection
    Scoped { collection: String, call: String },

    /// Anything else: a filter object or pipeline against the default collection
    Bare(String),
}

impl NormalizedQuery {
    /// Collection named by the query itself, if any
    pub fn scoped_collection(&self) -> Option<&str> {
        match self {
            NormalizedQuery::Scoped { collection, .. } => Some(collection),
            _ => None,
        }
    }
}

/// Query normalizer
pub struct QueryNormalizer;

impl QueryNormalizer {
    /// Trim, drop one trailing `;`, and classify
    pub fn normalize(raw: &str) -> NormalizedQuery {
        let trimmed = raw.trim();
        let cleaned = trimmed.strip_suffix(';').unwrap_or(trimmed).trim();

        if cleaned.starts_with('[') && cleaned.ends_with(']') {
            return NormalizedQuery::Pipeline(cleaned.to_string());
        }

        if let Some((collection, call)) = Self::split_scoped(cleaned) {
            return NormalizedQuery::Scoped {
                collection: collection.to_string(),
                call: call.to_string(),
            };
        }

        NormalizedQuery::Bare(cleaned.to_string())
    }

    /// Split `db.<name>.<rest>` where name is `[A-Za-z0-9_]+`
    fn split_scoped(input: &str) -> Option<(&str, &str)> {
        let rest = input.strip_prefix("db.")?;
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());

        if name_len == 0 {
            return None;
        }

        let (name, tail) = rest.split_at(name_len);
        let call = tail.strip_prefix('.')?;
        Some((name, call))
    }
}
