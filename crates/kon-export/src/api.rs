//! HTTP query API.
//!
//! Read-only JSON routes over the sample store. All list routes accept an
//! optional `limit` query parameter.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::processor::ProcessedMetric;
use crate::storage::MetricStore;

/// Default result count for list routes.
pub const DEFAULT_LIMIT: usize = 100;

/// Default result count for `/api/v1/metrics/latest`.
pub const DEFAULT_LATEST_LIMIT: usize = 10;

/// How long browsers may cache a CORS preflight (12 hours).
pub const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Query API state.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn MetricStore>,
}

impl ApiState {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }
}

/// Create the query API router.
///
/// `request_timeout` bounds each request end to end.
pub fn metrics_router(state: ApiState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/v1/metrics", get(handle_list))
        .route("/api/v1/metrics/latest", get(handle_latest))
        .route("/api/v1/metrics/range", get(handle_range))
        .route("/api/v1/metrics/type/{metric_type}", get(handle_by_type))
        .route("/api/v1/metrics/{agent_id}", get(handle_by_agent))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(CORS_MAX_AGE)
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal("request handler panicked".to_owned()).into_response()
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Samples currently held.
    pub metrics: usize,
}

/// Handle GET /health - liveness probe
async fn handle_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        metrics: state.store.len().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// Range query parameters, in epoch milliseconds.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    /// Inclusive lower bound; defaults to the epoch.
    pub start: Option<i64>,
    /// Inclusive upper bound; defaults to now.
    pub end: Option<i64>,
    pub limit: Option<usize>,
}

type MetricsResponse = Result<Json<Vec<ProcessedMetric>>, ApiError>;

/// Handle GET /api/v1/metrics
#[tracing::instrument(skip_all)]
async fn handle_list(
    State(state): State<ApiState>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> MetricsResponse {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.query_latest(limit).await))
}

/// Handle GET /api/v1/metrics/latest
#[tracing::instrument(skip_all)]
async fn handle_latest(
    State(state): State<ApiState>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> MetricsResponse {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LATEST_LIMIT);
    Ok(Json(state.store.query_latest(limit).await))
}

/// Handle GET /api/v1/metrics/{agent_id}
#[tracing::instrument(skip(state, params))]
async fn handle_by_agent(
    State(state): State<ApiState>,
    Path(agent_id): Path<String>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> MetricsResponse {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.query_by_agent(&agent_id, limit).await))
}

/// Handle GET /api/v1/metrics/type/{metric_type}
#[tracing::instrument(skip(state, params))]
async fn handle_by_type(
    State(state): State<ApiState>,
    Path(metric_type): Path<String>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> MetricsResponse {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.store.query_by_type(&metric_type, limit).await))
}

/// Handle GET /api/v1/metrics/range
#[tracing::instrument(skip_all)]
async fn handle_range(
    State(state): State<ApiState>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> MetricsResponse {
    let Query(params) = params?;
    let start = match params.start {
        Some(ms) => parse_millis("start", ms)?,
        None => DateTime::<Utc>::UNIX_EPOCH,
    };
    let end = match params.end {
        Some(ms) => parse_millis("end", ms)?,
        None => Utc::now(),
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    Ok(Json(
        state.store.query_by_time_range(start, end, limit).await,
    ))
}

fn parse_millis(field: &str, ms: i64) -> Result<DateTime<Utc>, ApiError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| ApiError::InvalidRequest(format!("{field} timestamp out of range: {ms}")))
}

/// Query API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_owned(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_fixtures::{memory_store, sample, T0};
    use axum::{body::Body, http::Request};
    use rstest::rstest;
    use tower::ServiceExt;

    fn router(store: Arc<MemoryStore>) -> Router {
        metrics_router(ApiState::new(store), Duration::from_secs(20))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn millis(json: &serde_json::Value) -> Vec<i64> {
        json.as_array()
            .unwrap()
            .iter()
            .map(|m| {
                DateTime::parse_from_rfc3339(m["timestamp"].as_str().unwrap())
                    .unwrap()
                    .timestamp_millis()
            })
            .collect()
    }

    #[rstest]
    #[tokio::test]
    async fn health_reports_sample_count(memory_store: Arc<MemoryStore>) {
        memory_store
            .write(vec![sample("a", "m", T0), sample("a", "m", T0 + 1)])
            .await;

        let (status, json) = get_json(router(memory_store), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["metrics"], 2);
    }

    #[rstest]
    #[tokio::test]
    async fn list_defaults_to_hundred(memory_store: Arc<MemoryStore>) {
        memory_store
            .write((0..150).map(|i| sample("a", "m", T0 + i)).collect())
            .await;

        let (status, json) = get_json(router(memory_store.clone()), "/api/v1/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let ts = millis(&json);
        assert_eq!(ts.len(), 100);
        assert_eq!(ts[0], T0 + 50);
        assert_eq!(ts[99], T0 + 149);

        let (_, json) = get_json(router(memory_store), "/api/v1/metrics/latest").await;
        assert_eq!(millis(&json), (140..150).map(|i| T0 + i).collect::<Vec<_>>());
    }

    #[rstest]
    #[tokio::test]
    async fn by_agent_is_newest_first(memory_store: Arc<MemoryStore>) {
        memory_store
            .write(vec![
                sample("a1", "m", T0),
                sample("a2", "m", T0 + 500),
                sample("a1", "m", T0 + 1000),
            ])
            .await;

        let (status, json) = get_json(router(memory_store), "/api/v1/metrics/a1?limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(millis(&json), [T0 + 1000, T0]);
        assert_eq!(json[0]["agent_id"], "a1");
        assert_eq!(json[0]["type"], "CPU_USAGE");
    }

    #[rstest]
    #[tokio::test]
    async fn by_type_matches_name(memory_store: Arc<MemoryStore>) {
        memory_store.write(vec![sample("a", "cpu", T0)]).await;

        let (_, json) = get_json(
            router(memory_store.clone()),
            "/api/v1/metrics/type/CPU_USAGE",
        )
        .await;
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (_, json) = get_json(router(memory_store), "/api/v1/metrics/type/EBPF_RAW").await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn range_is_inclusive(memory_store: Arc<MemoryStore>) {
        memory_store
            .write((0..5).map(|i| sample("a", "m", T0 + i * 1000)).collect())
            .await;

        let uri = format!(
            "/api/v1/metrics/range?start={}&end={}",
            T0 + 1000,
            T0 + 3000
        );
        let (status, json) = get_json(router(memory_store.clone()), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(millis(&json), [T0 + 3000, T0 + 2000, T0 + 1000]);

        // start defaults to the epoch and end to now
        let (_, json) = get_json(router(memory_store), "/api/v1/metrics/range?limit=2").await;
        assert_eq!(millis(&json), [T0 + 4000, T0 + 3000]);
    }

    #[rstest]
    #[case::limit_not_a_number("/api/v1/metrics?limit=ten")]
    #[case::negative_limit("/api/v1/metrics/latest?limit=-1")]
    #[case::start_not_a_number("/api/v1/metrics/range?start=yesterday")]
    #[case::end_out_of_range("/api/v1/metrics/range?end=9223372036854775807")]
    #[tokio::test]
    async fn bad_parameters_are_rejected(memory_store: Arc<MemoryStore>, #[case] uri: &str) {
        let (status, json) = get_json(router(memory_store), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[rstest]
    #[tokio::test]
    async fn cors_allows_any_origin(memory_store: Arc<MemoryStore>) {
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/metrics")
            .header(header::ORIGIN, "https://dashboard.example")
            .body(Body::empty())
            .unwrap();

        let response = router(memory_store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    /// Store whose reads never finish within a request timeout.
    struct StalledStore;

    #[async_trait::async_trait]
    impl MetricStore for StalledStore {
        async fn write(&self, _: Vec<ProcessedMetric>) {}

        async fn query_by_agent(&self, _: &str, _: usize) -> Vec<ProcessedMetric> {
            Vec::new()
        }

        async fn query_by_type(&self, _: &str, _: usize) -> Vec<ProcessedMetric> {
            Vec::new()
        }

        async fn query_by_time_range(
            &self,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
            _: usize,
        ) -> Vec<ProcessedMetric> {
            Vec::new()
        }

        async fn query_latest(&self, _: usize) -> Vec<ProcessedMetric> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Vec::new()
        }

        async fn evict_expired(&self) -> usize {
            0
        }

        async fn len(&self) -> usize {
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_request_times_out() {
        let router = metrics_router(
            ApiState::new(Arc::new(StalledStore)),
            Duration::from_secs(1),
        );
        let request = Request::builder()
            .uri("/api/v1/metrics/latest")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn internal_error_hides_detail() {
        let response = ApiError::Internal("lock poisoned".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
