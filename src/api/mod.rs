//! Payments System of Record REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Transaction records
//! - `POST /transactionRecords` - Store a record
//! - `GET /transactionRecords/:uniqueId` - History of one unique id
//! - `POST /transactionRecords/search` - Search records
//!
//! ## Health
//! - `GET /health` - Service status
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//!
//! Every request carries an `x-request-id` (taken from the request or
//! generated), recorded on its tracing span and echoed on the response.
//!
//! # Example
//!
//! ```rust,ignore
//! use payments_sor::api::{serve, AppState};
//! use payments_sor::config::ApiConfig;
//! use payments_sor::records::RecordService;
//! use payments_sor::storage::{SessionConfig, SessionPool, SqliteRecordStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SessionPool::open("./sor.db", &SessionConfig::default());
//!     let service = RecordService::new(Arc::new(SqliteRecordStore::new(pool)?));
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(service, config.clone()), &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::ApiConfig;

/// Header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id attached to each request's extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let record_routes = Router::new()
        .route("/", post(routes::records::create_record))
        .route("/search", post(routes::records::search_records))
        .route("/:uniqueId", get(routes::records::get_by_unique_id));

    let health_routes = Router::new()
        .route("/", get(routes::health::health))
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness));

    let max_body_size = state.config.max_body_size;
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/transactionRecords", record_routes)
        .nest("/health", health_routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .extensions()
                .get::<RequestId>()
                .map(|id| id.0.as_str())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(middleware::from_fn(assign_request_id))
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Tag the request with an id and echo it on the response
async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Payments system of record listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordService;
    use crate::storage::{SessionConfig, SessionPool, SqliteRecordStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = SessionPool::open(dir.path().join("sor.db"), &SessionConfig::default());
        let store = Arc::new(SqliteRecordStore::new(pool).unwrap());
        let state = AppState::new(RecordService::new(store), ApiConfig::default());

        (build_router(state), dir)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn record(unique_id: &str, event_type: &str, data: Value) -> Value {
        json!({
            "uniqueId": unique_id,
            "eventTimestamp": "2024-01-01T00:00:00.000Z",
            "eventType": event_type,
            "data": data
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = create_test_app();

        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_health_live_and_ready() {
        let (app, _dir) = create_test_app();

        let response = app.clone().oneshot(get("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_reports_unreachable_database() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let pool = SessionPool::open(blocker.join("sor.db"), &SessionConfig::default());
        let store = Arc::new(SqliteRecordStore::deferred(pool));
        let app = build_router(AppState::new(RecordService::new(store), ApiConfig::default()));

        let response = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_echoed() {
        let (app, _dir) = create_test_app();

        let response = app.clone().oneshot(get("/health/live")).await.unwrap();
        let generated = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(generated.to_str().unwrap()).is_ok());

        let request = Request::builder()
            .uri("/health/live")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
    }

    #[tokio::test]
    async fn test_create_then_get_history() {
        let (app, _dir) = create_test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/transactionRecords",
                record("tx-1", "CREATED", json!({"amount": 10})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert!(created["transactionRecordId"].as_i64().unwrap() > 0);
        assert_eq!(created["eventTimestamp"], "2024-01-01T00:00:00.000Z");

        let response = app
            .clone()
            .oneshot(get("/transactionRecords/tx-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let history = body_json(response).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["uniqueId"], "tx-1");
        assert_eq!(history[0]["data"]["amount"], 10);
        assert!(history[0]["insertTimestamp"].is_string());

        let response = app.oneshot(get("/transactionRecords/tx-404")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_search_route() {
        let (app, _dir) = create_test_app();

        for (id, event_type) in [("tx-1", "CREATED"), ("tx-2", "COMMITTED"), ("tx-3", "ABORTED")] {
            app.clone()
                .oneshot(post_json(
                    "/transactionRecords",
                    record(id, event_type, json!({})),
                ))
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(post_json(
                "/transactionRecords/search",
                json!({"eventTypes": ["CREATED", "COMMITTED"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = app
            .oneshot(post_json("/transactionRecords/search", json!({})))
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_rejects_unsupported_operator() {
        let (app, _dir) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/transactionRecords/search",
                json!({"dataQueryExpression": {"field": "amount", "operator": "!=", "value": 1}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("!="));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_timestamp() {
        let (app, _dir) = create_test_app();

        let mut body = record("tx-1", "CREATED", json!({}));
        body["eventTimestamp"] = json!("yesterday");

        let response = app
            .oneshot(post_json("/transactionRecords", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_TIMESTAMP");
    }

    #[tokio::test]
    async fn test_create_invalid_json() {
        let (app, _dir) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transactionRecords")
                    .header("Content-Type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
