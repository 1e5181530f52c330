use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use groupwise_api::{
    openapi_v1_spec, parse_compare_request, report_to_json, ApiError, ValidationLimits,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::warn;

use crate::telemetry::metrics::{make_request_id, with_request_id};
use crate::{AppState, CRATE_NAME};

fn wants_pretty(params: &HashMap<String, String>) -> bool {
    params
        .get("pretty")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn api_error_response(err: &ApiError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": err}))).into_response()
}

/// Runs the full compare pipeline: size check, validation, then the
/// CPU-bound computation on the blocking pool under a worker permit and
/// the configured timeout.
async fn run_compare(state: &AppState, body: &Bytes) -> Result<Value, ApiError> {
    if body.len() > state.config.max_body_bytes {
        return Err(ApiError::payload_too_large(
            body.len(),
            state.config.max_body_bytes,
        ));
    }
    let limits = ValidationLimits {
        max_groups: state.config.max_groups,
        max_samples_per_group: state.config.max_samples_per_group,
    };
    let groups = parse_compare_request(body, &limits)?;
    state
        .metrics
        .observe_compare_input(groups.len(), groups.total_samples());

    let alpha = state.config.significance;
    let permit = state
        .compare_workers
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::internal("compare worker pool closed"))?;
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        groupwise_stats::compare(&groups, alpha)
    });

    let timeout_ms = u64::try_from(state.config.request_timeout.as_millis()).unwrap_or(u64::MAX);
    match tokio::time::timeout(state.config.request_timeout, task).await {
        Err(_) => Err(ApiError::timeout(timeout_ms)),
        Ok(Err(join_err)) => Err(ApiError::internal(&format!(
            "compare task failed: {join_err}"
        ))),
        Ok(Ok(Err(stats_err))) => Err(ApiError::from(stats_err)),
        Ok(Ok(Ok(report))) => Ok(report_to_json(&report)),
    }
}

pub(crate) async fn anova_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let response = match run_compare(&state, &body).await {
        Ok(value) => {
            state
                .metrics
                .observe_request("/anova", StatusCode::OK, started.elapsed())
                .await;
            if wants_pretty(&params) {
                match serde_json::to_string_pretty(&value) {
                    Ok(text) => (
                        StatusCode::OK,
                        [(header::CONTENT_TYPE, "application/json")],
                        text,
                    )
                        .into_response(),
                    Err(e) => api_error_response(&ApiError::internal(&e.to_string())),
                }
            } else {
                (StatusCode::OK, Json(value)).into_response()
            }
        }
        Err(err) => {
            warn!(code = ?err.code, status = err.status(), message = %err.message, "compare request rejected");
            let status = StatusCode::from_u16(err.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            state
                .metrics
                .observe_request("/anova", status, started.elapsed())
                .await;
            api_error_response(&err)
        }
    };
    with_request_id(response, &request_id)
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let (status, body) = if state.ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    };
    let resp = (status, body).into_response();
    state
        .metrics
        .observe_request("/readyz", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let payload = json!({
        "crate": CRATE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
    });
    let resp = Json(payload).into_response();
    state
        .metrics
        .observe_request("/v1/version", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn openapi_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = Json(openapi_v1_spec()).into_response();
    state
        .metrics
        .observe_request("/v1/openapi.json", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
