use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use loadgen_client::ServingClient;
use loadgen_common::config::RunOptions;
use loadgen_common::Result;
use serde::Serialize;
use tokio::time::Instant;

use crate::check::{CheckRecorder, CheckSummary};
use crate::iteration::{Iteration, IterationReport};
use crate::stats::LatencySummary;

/// What a single VU saw. Merged after the VU exits so the hot loop shares
/// nothing but the check counters.
#[derive(Debug, Default)]
struct VuTally {
    iterations: u64,
    statuses: BTreeMap<String, u64>,
    latencies_ms: Vec<f64>,
}

impl VuTally {
    fn push(&mut self, report: &IterationReport) {
        self.iterations += 1;
        *self.statuses.entry(report.status_key()).or_insert(0) += 1;
        if report.status.is_some() {
            self.latencies_ms.push(report.latency.as_secs_f64() * 1000.0);
        }
    }

    fn merge(&mut self, other: VuTally) {
        self.iterations += other.iterations;
        for (status, count) in other.statuses {
            *self.statuses.entry(status).or_insert(0) += count;
        }
        self.latencies_ms.extend(other.latencies_ms);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub target: String,
    pub vus: usize,
    pub duration_secs: f64,
    pub elapsed_secs: f64,
    pub iterations: u64,
    pub checks: CheckSummary,
    pub statuses: BTreeMap<String, u64>,
    pub latency: LatencySummary,
}

impl RunSummary {
    pub fn throughput(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.iterations as f64 / self.elapsed_secs
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());
        writeln!(f, "target              : {}", self.target)?;
        writeln!(f, "vus                 : {}", self.vus)?;
        writeln!(f, "elapsed (s)         : {:.2}", self.elapsed_secs)?;
        writeln!(f, "iterations          : {}", self.iterations)?;
        writeln!(f, "iterations/s        : {:.2}", self.throughput())?;
        writeln!(
            f,
            "checks '{}'   : {} passed, {} failed ({:.2}%)",
            self.checks.name,
            self.checks.passes,
            self.checks.fails,
            self.checks.pass_rate() * 100.0
        )?;
        writeln!(f, "latency avg (ms)    : {}", ms(self.latency.avg_ms))?;
        writeln!(f, "latency p50 (ms)    : {}", ms(self.latency.p50_ms))?;
        writeln!(f, "latency p95 (ms)    : {}", ms(self.latency.p95_ms))?;
        writeln!(f, "latency p99 (ms)    : {}", ms(self.latency.p99_ms))?;
        write!(f, "statuses            :")?;
        for (status, count) in &self.statuses {
            write!(f, " {}={}", status, count)?;
        }
        Ok(())
    }
}

/// Runs `options.vus` virtual users, each looping the iteration until the
/// deadline. An iteration already in flight at the deadline runs to completion.
pub async fn run(options: &RunOptions, iteration: Arc<Iteration>, client: Arc<dyn ServingClient>) -> Result<RunSummary> {
    options.validate()?;

    let checks = Arc::new(CheckRecorder::default());
    let started = Instant::now();
    let deadline = started + options.duration;
    tracing::info!(
        target: "harness",
        "starting {} vus for {:?} against {}",
        options.vus,
        options.duration,
        iteration.request().url
    );

    let mut handles = Vec::with_capacity(options.vus);
    for _ in 0..options.vus {
        let iteration = iteration.clone();
        let client = client.clone();
        let checks = checks.clone();
        handles.push(tokio::spawn(async move {
            loadgen_obs::vu_started();
            let mut tally = VuTally::default();
            while Instant::now() < deadline {
                let report = iteration.run_once(client.as_ref(), &checks).await;
                tally.push(&report);
            }
            loadgen_obs::vu_stopped();
            tally
        }));
    }

    let mut total = VuTally::default();
    for handle in handles {
        match handle.await {
            Ok(tally) => total.merge(tally),
            Err(e) => tracing::warn!(target: "harness", "virtual user aborted: {}", e),
        }
    }
    let elapsed = started.elapsed();

    let summary = RunSummary {
        target: iteration.request().url.clone(),
        vus: options.vus,
        duration_secs: options.duration.as_secs_f64(),
        elapsed_secs: elapsed.as_secs_f64(),
        iterations: total.iterations,
        checks: checks.summary(),
        statuses: total.statuses,
        latency: LatencySummary::from_samples(&total.latencies_ms),
    };
    tracing::info!(
        target: "harness",
        "finished {} iterations in {:.1}s, {} checks failed",
        summary.iterations,
        summary.elapsed_secs,
        summary.checks.fails
    );
    Ok(summary)
}

