//! Error handling for search-lab.
//!
//! This module provides:
//! - A crate-wide error enum with specific kinds for connection, parsing,
//!   execution and configuration failures
//! - Structured information extraction from MongoDB driver errors
//!
//! HTTP status mapping lives with the endpoint layer in `server::response`.

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, ExecutionError, ParseError, Result, SearchLabError,
};
pub use mongo::{ErrorInfo, extract_error_info};
