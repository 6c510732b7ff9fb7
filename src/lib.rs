//! Search Lab Library
//!
//! Backend for an interactive MongoDB Atlas Search lab: an HTTP API that
//! takes the query text a learner typed, parses it as a literal, and runs
//! it against the lab database.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management and reconnect policy
//! - `error`: Error types and handling
//! - `executor`: Query planning and dispatch
//! - `exercise`: Exercise definitions and the terminal exercise runner
//! - `formatter`: BSON to JSON conversion and terminal output
//! - `indexes`: Atlas Search index catalog
//! - `parser`: Query normalization and literal parsing
//! - `server`: HTTP endpoints and static assets
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use search_lab::{Config, ConnectionManager, QueryDispatcher, QueryPlanner};
//! use search_lab::executor::QueryBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let manager = Arc::new(ConnectionManager::new(config.connection));
//!     manager.connect().await?;
//!
//!     let dispatcher = QueryDispatcher::new(manager);
//!     let plan = QueryPlanner::plan("db.books.find({ genres: 'Fantasy' })", "movies")?;
//!     let result = dispatcher.execute(plan).await?;
//!     println!("{} result(s)", result.data.count());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod exercise;
pub mod formatter;
pub mod indexes;
pub mod parser;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{Result, SearchLabError};
pub use executor::{ExecutionResult, QueryDispatcher, QueryPlan, QueryPlanner};
pub use server::{AppState, build_router};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
