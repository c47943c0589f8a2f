//! Single-worker, rate-paced bench with optional fault injection.

use std::str::FromStr;
use std::time::Duration;

use loadgen_client::{InvocationRequest, ServingClient};
use loadgen_common::{LoadgenError, Result};
use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;

use crate::payload::InvocationPayload;
use crate::stats::{mean, percentile};

pub const MAX_RECOVERY_ERROR_RATE_PCT: f64 = 5.0;
pub const MAX_RECOVERY_P95_MS: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchMode {
    Normal,
    /// Sends the malformed payload for a share of requests.
    Failure,
}

impl FromStr for BenchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(BenchMode::Normal),
            "failure" => Ok(BenchMode::Failure),
            _ => Err(format!("invalid mode '{}'; use 'normal' or 'failure'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchOptions {
    pub duration: Duration,
    pub rps: f64,
    pub mode: BenchMode,
    pub failure_ratio: f64,
}

impl BenchOptions {
    pub fn new(duration: Duration, rps: f64, mode: BenchMode) -> Self {
        Self { duration, rps, mode, failure_ratio: 0.7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchSummary {
    pub total: u64,
    pub ok: u64,
    pub err: u64,
    pub err_rate_pct: f64,
    pub avg_ms: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl BenchSummary {
    fn from_counts(ok: u64, err: u64, latencies: &[f64]) -> Self {
        let total = ok + err;
        let err_rate_pct = if total == 0 { 100.0 } else { err as f64 / total as f64 * 100.0 };
        Self {
            total,
            ok,
            err,
            err_rate_pct,
            avg_ms: mean(latencies),
            p50_ms: percentile(latencies, 50.0),
            p95_ms: percentile(latencies, 95.0),
            p99_ms: percentile(latencies, 99.0),
        }
    }
}

pub async fn run_bench<R: Rng + ?Sized>(
    client: &dyn ServingClient,
    url: &str,
    authorization: Option<String>,
    options: &BenchOptions,
    rng: &mut R,
) -> Result<BenchSummary> {
    if !(options.rps > 0.0) {
        return Err(LoadgenError::Config(format!("rps must be positive, got {}", options.rps)));
    }
    let interval = Duration::try_from_secs_f64(1.0 / options.rps)
        .map_err(|e| LoadgenError::Config(format!("rps {} gives an unusable interval: {}", options.rps, e)))?;
    let good = InvocationRequest::new(url, authorization.clone(), InvocationPayload::fixed().to_json()?);
    let bad = InvocationRequest::new(url, authorization, InvocationPayload::missing_radius().to_json()?);
    tracing::info!(target: "bench", "bench {:?} at {} rps for {:?} against {}", options.mode, options.rps, options.duration, url);

    let end = Instant::now() + options.duration;
    let (mut ok, mut err) = (0u64, 0u64);
    let mut latencies = Vec::new();
    while Instant::now() < end {
        let t0 = Instant::now();
        let request = match options.mode {
            BenchMode::Failure if rng.gen_bool(options.failure_ratio.clamp(0.0, 1.0)) => &bad,
            _ => &good,
        };

        match client.post(request).await {
            Ok(resp) => {
                latencies.push(t0.elapsed().as_secs_f64() * 1000.0);
                if resp.is_success() { ok += 1 } else { err += 1 }
            }
            Err(e) => {
                tracing::debug!(target: "bench", "request failed: {}", e);
                err += 1;
            }
        }

        tokio::time::sleep(interval.saturating_sub(t0.elapsed())).await;
    }

    Ok(BenchSummary::from_counts(ok, err, &latencies))
}

/// Passes when the endpoint has recovered: error rate and p95 under the gates.
pub fn assert_recovery(summary: &BenchSummary) -> Result<()> {
    if summary.err_rate_pct > MAX_RECOVERY_ERROR_RATE_PCT {
        return Err(LoadgenError::Recovery(format!("error rate too high {:.2}%", summary.err_rate_pct)));
    }
    if let Some(p95) = summary.p95_ms {
        if p95 > MAX_RECOVERY_P95_MS {
            return Err(LoadgenError::Recovery(format!("p95 too high {:.0}ms", p95)));
        }
    }
    tracing::info!(target: "bench", "Recovery OK");
    Ok(())
}
