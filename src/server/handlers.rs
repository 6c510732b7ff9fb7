//! API request handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::SharedState;
use super::response::ApiError;
use crate::executor::QueryPlanner;
use crate::formatter::ResultFormatter;

/// Body of `POST /api/search/execute`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub collection: Option<String>,
}

/// Successful execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteResponse {
    pub success: bool,
    pub result: Value,
    pub count: usize,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub connected: bool,
    pub timestamp: String,
}

/// `POST /api/search/execute`
///
/// Checks run in order: connection, query presence, then plan and execute.
pub async fn execute_handler(
    State(state): State<SharedState>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    if !state.backend.ensure_connected().await {
        warn!(%request_id, "Rejecting query: not connected to database");
        return Err(ApiError::NotConnected);
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(%request_id, "Unreadable request body: {}", rejection);
            ExecuteRequest::default()
        }
    };

    let Some(query) = request.query.filter(|q| !q.is_empty()) else {
        return Err(ApiError::QueryRequired);
    };

    let collection = request
        .collection
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.default_collection.clone());

    info!(%request_id, collection = %collection, "Executing search query: {}", query);

    let plan = QueryPlanner::plan(&query, &collection).map_err(|e| {
        warn!(%request_id, "Query rejected: {}", e);
        ApiError::from(e)
    })?;

    let result = state.backend.execute(plan).await.map_err(|e| {
        match e.log_details() {
            Some(details) => error!(
                %request_id,
                details = %details,
                "Search execution error: {} (query: {})",
                e,
                query
            ),
            None => error!(%request_id, "Search execution error: {} (query: {})", e, query),
        }
        ApiError::from(e)
    })?;

    info!(
        %request_id,
        count = result.stats.documents_returned,
        elapsed_ms = result.stats.execution_time_ms,
        "Query completed"
    );

    Ok(Json(ExecuteResponse {
        success: true,
        result: ResultFormatter::to_json(&result.data),
        count: result.data.count(),
    }))
}

/// `GET /api/health`
pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connected: state.backend.is_connected().await,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
