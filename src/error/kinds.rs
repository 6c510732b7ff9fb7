use std::{fmt, io};

use crate::error::mongo::extract_error_info;

/// Crate-wide `Result` type using [`SearchLabError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, SearchLabError>;

/// Top-level error type for search-lab operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum SearchLabError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// Query parsing errors.
    Parse(ParseError),

    /// Query planning and execution errors.
    Execution(ExecutionError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// HTTP client errors (exercise runner).
    Http(reqwest::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Credentials are missing from the configuration.
    NotConfigured,

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Ping command failed.
    PingFailed(String),
}

/// Parsing-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Syntax error in a literal.
    SyntaxError(String),

    /// Unexpected token while parsing.
    UnexpectedToken { expected: String, found: String },

    /// Invalid query shape or value.
    InvalidQuery(String),

    /// Invalid aggregation pipeline.
    InvalidPipeline(String),

    /// `db.<collection>.<rest>` whose rest is not a method call.
    InvalidMethodCall(String),
}

/// Execution-specific errors.
#[derive(Debug)]
pub enum ExecutionError {
    /// Query execution failed.
    QueryFailed(String),

    /// Operation not in the supported set.
    UnsupportedOperation(String),

    /// Invalid operation parameters.
    InvalidParameters(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for SearchLabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchLabError::Connection(e) => write!(f, "Connection error: {e}"),
            SearchLabError::Parse(e) => write!(f, "{e}"),
            SearchLabError::Execution(e) => write!(f, "{e}"),
            SearchLabError::Config(e) => write!(f, "Configuration error: {e}"),
            SearchLabError::Io(e) => write!(f, "I/O error: {e}"),
            SearchLabError::MongoDb(e) => {
                let info = extract_error_info(e);
                match (info.name, info.message) {
                    (Some(name), Some(message)) => write!(f, "{name}: {message}"),
                    (None, Some(message)) => write!(f, "{message}"),
                    _ => write!(f, "{e}"),
                }
            }
            SearchLabError::Http(e) => write!(f, "HTTP error: {e}"),
            SearchLabError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::NotConfigured => write!(
                f,
                "MONGODB_USERNAME, MONGODB_PASSWORD, and MONGODB_LOCATION must be set"
            ),
            ConnectionError::NotConnected => write!(f, "Not connected to database"),
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::SyntaxError(msg) => write!(f, "Syntax error: {msg}"),
            ParseError::UnexpectedToken { expected, found } => {
                write!(f, "Expected {expected}, found {found}")
            }
            ParseError::InvalidQuery(msg) => write!(f, "Invalid query: {msg}"),
            ParseError::InvalidPipeline(msg) => write!(f, "Invalid pipeline: {msg}"),
            ParseError::InvalidMethodCall(call) => {
                write!(f, "Invalid method call format: {call}")
            }
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
            ExecutionError::UnsupportedOperation(op) => {
                write!(f, "Unsupported operation: {op}")
            }
            ExecutionError::InvalidParameters(msg) => write!(f, "Invalid parameters: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for SearchLabError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ParseError {}
impl std::error::Error for ExecutionError {}
impl std::error::Error for ConfigError {}

impl SearchLabError {
    /// True for errors caused by the shape or content of the submitted query,
    /// including driver rejections of a well-formed but invalid query.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            SearchLabError::Parse(_)
                | SearchLabError::MongoDb(_)
                | SearchLabError::Execution(
                    ExecutionError::QueryFailed(_)
                        | ExecutionError::UnsupportedOperation(_)
                        | ExecutionError::InvalidParameters(_)
                )
        )
    }

    /// Structured driver error as one JSON line, for logs.
    pub fn log_details(&self) -> Option<String> {
        match self {
            SearchLabError::MongoDb(e) => extract_error_info(e).to_json_compact().ok(),
            _ => None,
        }
    }

    /// True when no database connection is available.
    pub fn is_not_connected(&self) -> bool {
        matches!(
            self,
            SearchLabError::Connection(ConnectionError::NotConnected | ConnectionError::NotConfigured)
        )
    }
}

/* ========================= Conversions to SearchLabError ========================= */

impl From<io::Error> for SearchLabError {
    fn from(err: io::Error) -> Self {
        SearchLabError::Io(err)
    }
}

impl From<mongodb::error::Error> for SearchLabError {
    fn from(err: mongodb::error::Error) -> Self {
        SearchLabError::MongoDb(err)
    }
}

impl From<reqwest::Error> for SearchLabError {
    fn from(err: reqwest::Error) -> Self {
        SearchLabError::Http(err)
    }
}

impl From<ConnectionError> for SearchLabError {
    fn from(err: ConnectionError) -> Self {
        SearchLabError::Connection(err)
    }
}

impl From<ParseError> for SearchLabError {
    fn from(err: ParseError) -> Self {
        SearchLabError::Parse(err)
    }
}

impl From<ExecutionError> for SearchLabError {
    fn from(err: ExecutionError) -> Self {
        SearchLabError::Execution(err)
    }
}

impl From<ConfigError> for SearchLabError {
    fn from(err: ConfigError) -> Self {
        SearchLabError::Config(err)
    }
}

impl From<String> for SearchLabError {
    fn from(msg: String) -> Self {
        SearchLabError::Generic(msg)
    }
}

impl From<&str> for SearchLabError {
    fn from(msg: &str) -> Self {
        SearchLabError::Generic(msg.to_owned())
    }
}
