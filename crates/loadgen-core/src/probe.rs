//! Sequential SLO probe: a fixed number of randomized invocations, latency
//! percentiles and an error rate checked against thresholds.

use loadgen_client::{InvocationRequest, ServingClient};
use loadgen_common::config::{serving_url, TargetConfig};
use loadgen_common::{LoadgenError, Result};
use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;

use crate::payload::{InvocationPayload, Sample};
use crate::stats::percentile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SloThresholds {
    pub p95_ms: f64,
    pub error_rate_pct: f64,
}

impl Default for SloThresholds {
    fn default() -> Self {
        Self { p95_ms: 1500.0, error_rate_pct: 5.0 }
    }
}

impl SloThresholds {
    pub fn violations(&self, report: &ProbeReport) -> Vec<String> {
        let mut violated = Vec::new();
        if let Some(p95) = report.p95_ms {
            if p95 > self.p95_ms {
                violated.push(format!("p95_ms={:.1} > {}", p95, self.p95_ms));
            }
        }
        if report.error_rate_pct > self.error_rate_pct {
            violated.push(format!("err_rate_pct={:.2} > {}", report.error_rate_pct, self.error_rate_pct));
        }
        violated
    }

    pub fn enforce(&self, report: &ProbeReport) -> Result<()> {
        let violated = self.violations(report);
        if violated.is_empty() {
            return Ok(());
        }
        Err(LoadgenError::SloViolation(violated))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    pub samples: usize,
    pub errors: usize,
    pub error_rate_pct: f64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

/// Host, endpoint and token must all be present. Every attempt contributes a
/// latency, failed ones included.
pub async fn run_probe<R: Rng + ?Sized>(
    client: &dyn ServingClient,
    target: &TargetConfig,
    samples: usize,
    rng: &mut R,
) -> Result<ProbeReport> {
    let host = target.require_host()?;
    let endpoint = target.require_endpoint()?;
    target.require_token()?;
    let url = serving_url(host.trim_end_matches('/'), endpoint);
    tracing::info!(target: "probe", "probing {} with {} samples", url, samples);

    let mut latencies = Vec::with_capacity(samples);
    let mut errors = 0;
    for _ in 0..samples {
        let body = InvocationPayload::from_sample(&Sample::random(rng)).to_json()?;
        let request = InvocationRequest::new(url.as_str(), Some(target.authorization()), body);

        let start = Instant::now();
        let ok = match client.post(&request).await {
            Ok(resp) => resp.is_success(),
            Err(e) => {
                tracing::debug!(target: "probe", "request failed: {}", e);
                false
            }
        };
        latencies.push(start.elapsed().as_secs_f64() * 1000.0);
        if !ok {
            errors += 1;
        }
    }

    Ok(ProbeReport {
        endpoint: endpoint.to_string(),
        samples,
        errors,
        error_rate_pct: errors as f64 / samples.max(1) as f64 * 100.0,
        p50_ms: percentile(&latencies, 50.0),
        p95_ms: percentile(&latencies, 95.0),
        p99_ms: percentile(&latencies, 99.0),
    })
}
