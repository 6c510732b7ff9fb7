//! HTTP error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::SearchLabError;

/// Failure of an API request
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No database connection
    NotConnected,

    /// Request carried no query
    QueryRequired,

    /// Query could not be parsed, planned or run
    InvalidQuery(String),

    /// Anything else
    Internal(String),
}

/// Error body: `{ error, details? }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotConnected | ApiError::QueryRequired | ApiError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::NotConnected => ErrorBody {
                error: "Not connected to database. Please connect first.",
                details: None,
            },
            ApiError::QueryRequired => ErrorBody {
                error: "Query is required",
                details: None,
            },
            ApiError::InvalidQuery(details) => ErrorBody {
                error: "Invalid query format",
                details: Some(details.clone()),
            },
            ApiError::Internal(details) => ErrorBody {
                error: "Failed to execute search query",
                details: Some(details.clone()),
            },
        }
    }
}

impl From<SearchLabError> for ApiError {
    fn from(err: SearchLabError) -> Self {
        if err.is_not_connected() {
            ApiError::NotConnected
        } else if err.is_query_error() {
            ApiError::InvalidQuery(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, ExecutionError, ParseError};

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ApiError::from(SearchLabError::from(ConnectionError::NotConnected)),
            ApiError::NotConnected
        );
        assert_eq!(
            ApiError::from(SearchLabError::from(ConnectionError::NotConfigured)),
            ApiError::NotConnected
        );
        assert_eq!(
            ApiError::from(SearchLabError::from(ParseError::SyntaxError("bad".into()))),
            ApiError::InvalidQuery("Syntax error: bad".to_string())
        );
        assert!(matches!(
            ApiError::from(SearchLabError::from(ExecutionError::UnsupportedOperation(
                "drop".into()
            ))),
            ApiError::InvalidQuery(_)
        ));
        assert_eq!(
            ApiError::from(SearchLabError::from("unexpected")),
            ApiError::Internal("unexpected".to_string())
        );
    }

    #[test]
    fn test_status_and_body() {
        assert_eq!(ApiError::QueryRequired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let body = serde_json::to_value(ApiError::NotConnected.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "Not connected to database. Please connect first." })
        );

        let body = serde_json::to_value(ApiError::InvalidQuery("x".into()).body()).unwrap();
        assert_eq!(body["details"], "x");
    }
}
