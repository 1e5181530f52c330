use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::AppState;

const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
    compare_groups_total: AtomicU64,
    compare_samples_total: AtomicU64,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX));
    }

    pub(crate) fn observe_compare_input(&self, groups: usize, samples: usize) {
        self.compare_groups_total
            .fetch_add(groups as u64, Ordering::Relaxed);
        self.compare_samples_total
            .fetch_add(samples as u64, Ordering::Relaxed);
    }
}

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let mut body = String::new();

    let counts = state.metrics.counts.lock().await;
    let mut count_rows: Vec<(&(String, u16), &u64)> = counts.iter().collect();
    count_rows.sort_by(|a, b| a.0.cmp(b.0));
    for ((route, status), count) in count_rows {
        body.push_str(&format!(
            "groupwise_requests_total{{version=\"{METRIC_VERSION}\",route=\"{route}\",status=\"{status}\"}} {count}\n"
        ));
    }
    drop(counts);

    let latency = state.metrics.latency_ns.lock().await;
    let mut latency_rows: Vec<(&String, &Vec<u64>)> = latency.iter().collect();
    latency_rows.sort_by(|a, b| a.0.cmp(b.0));
    for (route, samples) in latency_rows {
        for (quantile, pct) in [("0.5", 0.5), ("0.95", 0.95), ("0.99", 0.99)] {
            let seconds = percentile_ns(samples, pct) as f64 / 1_000_000_000.0;
            body.push_str(&format!(
                "groupwise_request_latency_seconds{{version=\"{METRIC_VERSION}\",route=\"{route}\",quantile=\"{quantile}\"}} {seconds:.9}\n"
            ));
        }
    }
    drop(latency);

    body.push_str(&format!(
        "groupwise_compare_groups_total{{version=\"{METRIC_VERSION}\"}} {}\n",
        state
            .metrics
            .compare_groups_total
            .load(Ordering::Relaxed)
    ));
    body.push_str(&format!(
        "groupwise_compare_samples_total{{version=\"{METRIC_VERSION}\"}} {}\n",
        state
            .metrics
            .compare_samples_total
            .load(Ordering::Relaxed)
    ));

    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
