//! Execution result types
//!
//! - ExecutionResult: outcome of one dispatched query
//! - ResultData: shape of the value the database returned
//! - ExecutionStats: timing and size of the execution

use mongodb::bson::{Bson, Document};

/// Result of query execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Result data
    pub data: ResultData,

    /// Execution statistics
    pub stats: ExecutionStats,
}

/// Data returned from query execution
#[derive(Debug, Clone, PartialEq)]
pub enum ResultData {
    /// Documents from a cursor
    Documents(Vec<Document>),

    /// Single document
    Document(Document),

    /// Count result
    Count(u64),

    /// Distinct values
    Values(Vec<Bson>),

    /// findOne matched nothing
    None,
}

impl ResultData {
    /// Result count reported to the client.
    ///
    /// Sequences report their length, a missing document reports 0, and any
    /// other single value reports 1.
    pub fn count(&self) -> usize {
        match self {
            ResultData::Documents(docs) => docs.len(),
            ResultData::Values(values) => values.len(),
            ResultData::None => 0,
            ResultData::Document(_) | ResultData::Count(_) => 1,
        }
    }
}

/// Execution statistics
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Execution time in milliseconds
    pub execution_time_ms: u64,

    /// Number of documents returned
    pub documents_returned: usize,
}

impl ExecutionResult {
    /// Create a result, deriving `documents_returned` from the data
    pub fn new(data: ResultData, execution_time_ms: u64) -> Self {
        let documents_returned = data.count();
        Self {
            data,
            stats: ExecutionStats {
                execution_time_ms,
                documents_returned,
            },
        }
    }
}
