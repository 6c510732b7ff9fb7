//! Router tests against an in-memory backend

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mongodb::bson::doc;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;
use crate::error::{ExecutionError, SearchLabError};
use crate::executor::{ExecutionResult, FIND_RESULT_CAP, QueryPlan, ResultData};

/// Records plans and answers with a canned result
struct FakeBackend {
    connected: bool,
    reply: std::result::Result<ResultData, String>,
    plans: Mutex<Vec<QueryPlan>>,
}

impl FakeBackend {
    fn connected(reply: ResultData) -> Arc<Self> {
        Arc::new(Self {
            connected: true,
            reply: Ok(reply),
            plans: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            connected: true,
            reply: Err(message.to_string()),
            plans: Mutex::new(Vec::new()),
        })
    }

    fn disconnected() -> Arc<Self> {
        Arc::new(Self {
            connected: false,
            reply: Ok(ResultData::None),
            plans: Mutex::new(Vec::new()),
        })
    }

    fn plans(&self) -> Vec<QueryPlan> {
        self.plans.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for FakeBackend {
    async fn is_connected(&self) -> bool {
        self.connected
    }

    async fn ensure_connected(&self) -> bool {
        self.connected
    }

    async fn execute(&self, plan: QueryPlan) -> crate::error::Result<ExecutionResult> {
        self.plans.lock().unwrap().push(plan);
        match &self.reply {
            Ok(data) => Ok(ExecutionResult::new(data.clone(), 1)),
            Err(message) => Err(SearchLabError::Execution(ExecutionError::QueryFailed(
                message.clone(),
            ))),
        }
    }
}

fn router(backend: Arc<FakeBackend>) -> Router {
    let state = Arc::new(AppState::new(backend, "movies"));
    build_router(state, &ServerConfig::default())
}

async fn post_query(router: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/search/execute")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_bare_filter_runs_uncapped_find() {
    let backend = FakeBackend::connected(ResultData::Documents(vec![
        doc! { "title": "The Matrix", "year": 1999 },
    ]));

    let (status, body) = post_query(
        router(backend.clone()),
        json!({ "query": "{\"title\": \"The Matrix\"}", "collection": "movies" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "result": [{ "title": "The Matrix", "year": 1999 }], "count": 1 })
    );
    assert_eq!(
        backend.plans(),
        vec![QueryPlan::Find {
            collection: "movies".to_string(),
            filter: doc! { "title": "The Matrix" },
            options: Default::default(),
        }]
    );
}

#[tokio::test]
async fn test_pipeline_runs_aggregate() {
    let backend = FakeBackend::connected(ResultData::Documents(vec![doc! { "total": 3 }]));

    let (status, body) = post_query(
        router(backend.clone()),
        json!({ "query": "[{\"$match\":{\"year\":1999}},{\"$count\":\"total\"}]" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["result"], json!([{ "total": 3 }]));
    assert_eq!(
        backend.plans(),
        vec![QueryPlan::Aggregate {
            collection: "movies".to_string(),
            pipeline: vec![doc! { "$match": { "year": 1999 } }, doc! { "$count": "total" }],
        }]
    );
}

#[tokio::test]
async fn test_scoped_find_uses_named_collection_and_cap() {
    let backend = FakeBackend::connected(ResultData::Documents(vec![]));

    let (status, body) = post_query(
        router(backend.clone()),
        json!({ "query": "db.books.find({\"genres\":\"Fantasy\"});", "collection": "movies" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "result": [], "count": 0 }));
    match &backend.plans()[0] {
        QueryPlan::Find {
            collection,
            filter,
            options,
        } => {
            assert_eq!(collection, "books");
            assert_eq!(filter, &doc! { "genres": "Fantasy" });
            assert_eq!(options.limit, Some(FIND_RESULT_CAP));
        }
        other => panic!("Expected find, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_connected_is_checked_first() {
    let backend = FakeBackend::disconnected();

    let (status, body) = post_query(router(backend.clone()), json!({ "query": "" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Not connected to database. Please connect first." })
    );
    assert!(backend.plans().is_empty());
}

#[tokio::test]
async fn test_query_required() {
    for payload in [json!({ "query": "" }), json!({ "collection": "books" }), json!({})] {
        let backend = FakeBackend::connected(ResultData::None);
        let (status, body) = post_query(router(backend.clone()), payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Query is required" }));
        assert!(backend.plans().is_empty());
    }
}

#[tokio::test]
async fn test_unreadable_body_is_query_required() {
    let backend = FakeBackend::connected(ResultData::None);
    let request = Request::builder()
        .method("POST")
        .uri("/api/search/execute")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(router(backend), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query is required");
}

#[tokio::test]
async fn test_invalid_query_is_bad_request() {
    let backend = FakeBackend::connected(ResultData::None);

    let (status, body) = post_query(
        router(backend.clone()),
        json!({ "query": "process.exit(1)" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query format");
    assert!(body["details"].as_str().unwrap().contains("process"));
    assert!(backend.plans().is_empty());
}

#[tokio::test]
async fn test_deeply_nested_query_is_bad_request() {
    let backend = FakeBackend::connected(ResultData::None);
    let query = format!("{}{}", "[".repeat(50_000), "]".repeat(50_000));

    let (status, body) = post_query(router(backend.clone()), json!({ "query": query })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query format");
    assert!(body["details"].as_str().unwrap().contains("nesting too deep"));
    assert!(backend.plans().is_empty());
}

#[tokio::test]
async fn test_unsupported_operation_is_bad_request() {
    let backend = FakeBackend::connected(ResultData::None);

    let (status, body) =
        post_query(router(backend.clone()), json!({ "query": "db.books.drop()" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query format");
    assert!(backend.plans().is_empty());
}

#[tokio::test]
async fn test_execution_failure_is_reported_with_details() {
    let backend = FakeBackend::failing("unknown operator: $serch");

    let (status, body) = post_query(
        router(backend),
        json!({ "query": "[{$serch: {}}]" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query format");
    assert!(body["details"].as_str().unwrap().contains("$serch"));
}

#[tokio::test]
async fn test_single_values_count_as_one() {
    let backend = FakeBackend::connected(ResultData::Count(42));
    let (_, body) = post_query(
        router(backend),
        json!({ "query": "db.books.countDocuments({})" }),
    )
    .await;
    assert_eq!(body, json!({ "success": true, "result": 42, "count": 1 }));

    let backend = FakeBackend::connected(ResultData::None);
    let (_, body) = post_query(
        router(backend),
        json!({ "query": "db.books.findOne({title: 'Nope'})" }),
    )
    .await;
    assert_eq!(body, json!({ "success": true, "result": null, "count": 0 }));
}

#[tokio::test]
async fn test_health_reports_connection() {
    for connected in [true, false] {
        let backend = if connected {
            FakeBackend::connected(ResultData::None)
        } else {
            FakeBackend::disconnected()
        };
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(router(backend), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connected"], connected);
        assert!(
            chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok()
        );
    }
}

#[tokio::test]
async fn test_static_assets_with_index_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>lab</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('lab')").unwrap();

    let config = ServerConfig {
        static_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let state = Arc::new(AppState::new(FakeBackend::disconnected(), "movies"));
    let app = build_router(state, &config);

    for (uri, expected) in [
        ("/search-lab/app.js", "console.log('lab')"),
        ("/search-lab/exercises/3", "<html>lab</html>"),
        ("/search-lab", "<html>lab</html>"),
        ("/elsewhere", "<html>lab</html>"),
    ] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), expected, "{uri}");
    }
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let backend = FakeBackend::connected(ResultData::None);
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/search/execute")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = router(backend).oneshot(request).await.unwrap();
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
