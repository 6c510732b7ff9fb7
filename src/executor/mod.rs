//! Query execution
//!
//! - `plan`: maps a raw query string onto a closed set of operations
//! - `result`: execution result types
//! - [`QueryDispatcher`]: runs a plan against the connected database
//!
//! The HTTP layer talks to execution through the [`QueryBackend`] trait so
//! it can be exercised without a cluster.

pub mod plan;
pub mod result;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::Document;
use tracing::{debug, info};

pub use plan::{FIND_RESULT_CAP, FindOptions, QueryPlan, QueryPlanner};
pub use result::{ExecutionResult, ExecutionStats, ResultData};

use crate::connection::ConnectionManager;
use crate::error::Result;

/// Something that can run planned queries
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Current connection state, without side effects
    async fn is_connected(&self) -> bool;

    /// Connection state before running a query; may attempt a reconnect
    async fn ensure_connected(&self) -> bool;

    /// Run one plan
    async fn execute(&self, plan: QueryPlan) -> Result<ExecutionResult>;
}

/// Dispatches plans to MongoDB through the shared connection
#[derive(Clone)]
pub struct QueryDispatcher {
    connection: Arc<ConnectionManager>,
}

impl QueryDispatcher {
    /// Create a dispatcher over a connection manager
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self { connection }
    }

    async fn collection(&self, name: &str) -> Result<Collection<Document>> {
        let db = self.connection.database().await?;
        Ok(db.collection::<Document>(name))
    }

    async fn run(&self, plan: QueryPlan) -> Result<ResultData> {
        match plan {
            QueryPlan::Find {
                collection,
                filter,
                options,
            } => {
                info!(
                    "Executing find on collection '{}' with filter: {:?}",
                    collection, filter
                );
                let coll = self.collection(&collection).await?;

                let find_options = mongodb::options::FindOptions::from(options);
                let cursor = coll.find(filter).with_options(find_options).await?;
                let docs: Vec<Document> = cursor.try_collect().await?;
                Ok(ResultData::Documents(docs))
            }
            QueryPlan::FindOne {
                collection,
                filter,
                projection,
            } => {
                info!(
                    "Executing findOne on collection '{}' with filter: {:?}",
                    collection, filter
                );
                let coll = self.collection(&collection).await?;

                let mut find_options = mongodb::options::FindOneOptions::default();
                find_options.projection = projection;

                match coll.find_one(filter).with_options(find_options).await? {
                    Some(doc) => Ok(ResultData::Document(doc)),
                    None => Ok(ResultData::None),
                }
            }
            QueryPlan::Aggregate {
                collection,
                pipeline,
            } => {
                info!(
                    "Executing aggregate on collection '{}' with {} stage(s)",
                    collection,
                    pipeline.len()
                );
                debug!("Pipeline: {:?}", pipeline);
                let coll = self.collection(&collection).await?;

                let cursor = coll.aggregate(pipeline).await?;
                let docs: Vec<Document> = cursor.try_collect().await?;
                Ok(ResultData::Documents(docs))
            }
            QueryPlan::CountDocuments { collection, filter } => {
                info!(
                    "Executing countDocuments on collection '{}' with filter: {:?}",
                    collection, filter
                );
                let coll = self.collection(&collection).await?;
                Ok(ResultData::Count(coll.count_documents(filter).await?))
            }
            QueryPlan::EstimatedDocumentCount { collection } => {
                info!(
                    "Executing estimatedDocumentCount on collection '{}'",
                    collection
                );
                let coll = self.collection(&collection).await?;
                Ok(ResultData::Count(coll.estimated_document_count().await?))
            }
            QueryPlan::Distinct {
                collection,
                field,
                filter,
            } => {
                info!(
                    "Executing distinct '{}' on collection '{}' with filter: {:?}",
                    field, collection, filter
                );
                let coll = self.collection(&collection).await?;
                Ok(ResultData::Values(coll.distinct(field, filter).await?))
            }
        }
    }
}

#[async_trait]
impl QueryBackend for QueryDispatcher {
    async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    async fn ensure_connected(&self) -> bool {
        self.connection.ensure_connected().await
    }

    async fn execute(&self, plan: QueryPlan) -> Result<ExecutionResult> {
        let start = Instant::now();
        let data = self.run(plan).await?;
        let elapsed = start.elapsed().as_millis() as u64;

        let result = ExecutionResult::new(data, elapsed);
        debug!(
            "Query returned {} result(s) in {}ms",
            result.stats.documents_returned, result.stats.execution_time_ms
        );
        Ok(result)
    }
}
