//! HTTP surface: metrics exposition and a local stand-in serving endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use loadgen_core::payload::InvocationPayload;
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec};

static INVOCATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("standin_invocations_total", "Invocations received by the stand-in endpoint").unwrap()
});
static REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!("standin_rejected_total", "Stand-in invocations rejected by reason", &["reason"]).unwrap()
});

#[derive(Clone, Default)]
pub struct StandInState {
    token: Option<Arc<str>>,
}

impl StandInState {
    /// An empty token disables the bearer check.
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.filter(|t| !t.is_empty()).map(Arc::from) }
    }
}

/// `/healthz` and `/metrics` for the process it runs in.
pub fn metrics_router() -> Router {
    loadgen_obs::init();
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
}

/// Accepts the `dataframe_split` payload on
/// `/serving-endpoints/{name}/invocations` and answers like a model would.
pub fn stand_in_app(state: StandInState) -> Router {
    let _ = &*INVOCATIONS_TOTAL;
    let _ = &*REJECTED_TOTAL;
    Router::new()
        .route("/serving-endpoints/:name/invocations", post(invocations))
        .with_state(state)
        .merge(metrics_router())
}

async fn metrics() -> impl IntoResponse {
    let (content_type, buffer) = loadgen_obs::render();
    ([("content-type", content_type)], buffer)
}

fn reject(status: StatusCode, reason: &str, message: String) -> Response {
    REJECTED_TOTAL.with_label_values(&[reason]).inc();
    let code = if status == StatusCode::UNAUTHORIZED { "UNAUTHENTICATED" } else { "BAD_REQUEST" };
    (status, Json(serde_json::json!({ "error_code": code, "message": message }))).into_response()
}

async fn invocations(
    State(state): State<StandInState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    INVOCATIONS_TOTAL.inc();

    if let Some(token) = &state.token {
        let expected = format!("Bearer {}", token);
        let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return reject(StatusCode::UNAUTHORIZED, "auth", "invalid or missing bearer token".into());
        }
    }

    let payload: InvocationPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return reject(StatusCode::BAD_REQUEST, "parse", format!("malformed payload: {}", e)),
    };
    if !payload.matches_features() {
        return reject(
            StatusCode::BAD_REQUEST,
            "schema",
            format!("expected columns [pressure, flow, radius], got {:?}", payload.dataframe_split.columns),
        );
    }

    tracing::debug!(target: "api", "{}: scoring {} rows", name, payload.dataframe_split.data.len());
    // stand-in score: product of the features
    let predictions: Vec<f64> = payload.dataframe_split.data.iter().map(|row| row.iter().product()).collect();
    Json(serde_json::json!({ "predictions": predictions })).into_response()
}
