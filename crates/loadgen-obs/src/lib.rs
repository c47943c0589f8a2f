//! Observability utilities: check and latency metrics for the load run

use once_cell::sync::Lazy;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Histogram, IntCounterVec, IntGauge, TextEncoder};

static CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!("loadgen_checks_total", "Status checks by outcome", &["check", "result"]).unwrap()
});
static STATUSES: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!("loadgen_responses_total", "Responses by status code", &["status"]).unwrap()
});
static LATENCY: Lazy<Histogram> = Lazy::new(|| {
    prometheus::register_histogram!("loadgen_request_duration_seconds", "Invocation round-trip time").unwrap()
});
static ACTIVE_VUS: Lazy<IntGauge> = Lazy::new(|| {
    prometheus::register_int_gauge!("loadgen_active_vus", "Virtual users currently looping").unwrap()
});

pub fn init() {
    let _ = &*CHECKS;
    let _ = &*STATUSES;
    let _ = &*LATENCY;
    let _ = &*ACTIVE_VUS;
}

pub fn record_check(name: &str, passed: bool) {
    CHECKS.with_label_values(&[name, if passed { "pass" } else { "fail" }]).inc();
}

pub fn record_status(status: &str) {
    STATUSES.with_label_values(&[status]).inc();
}

pub fn observe_latency(seconds: f64) {
    LATENCY.observe(seconds);
}

pub fn vu_started() {
    ACTIVE_VUS.inc();
}

pub fn vu_stopped() {
    ACTIVE_VUS.dec();
}

pub fn active_vus() -> i64 {
    ACTIVE_VUS.get()
}

pub fn encode(families: &[MetricFamily]) -> prometheus::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    Ok(buffer)
}

/// Text exposition of the default registry. Encoding failures are logged and
/// yield an empty body.
pub fn render() -> (String, Vec<u8>) {
    let content_type = TextEncoder::new().format_type().to_string();
    let buffer = encode(&prometheus::gather()).unwrap_or_else(|e| {
        tracing::warn!(target: "obs", "metrics encoding failed: {}", e);
        Vec::new()
    });
    (content_type, buffer)
}
