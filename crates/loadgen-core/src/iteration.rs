use std::time::Duration;

use loadgen_client::{InvocationRequest, ServingClient};
use loadgen_common::config::TargetConfig;
use loadgen_common::Result;
use tokio::time::Instant;

use crate::check::{status_is_200, CheckRecorder};
use crate::payload::InvocationPayload;

pub const REQUEST_ERROR: &str = "REQUEST_ERROR";

/// One request/check/pause cycle. The request is composed once from the
/// target and replayed unchanged on every call.
#[derive(Debug, Clone)]
pub struct Iteration {
    request: InvocationRequest,
    pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// `None` when the request never produced a response.
    pub status: Option<u16>,
    pub latency: Duration,
    pub passed: bool,
}

impl IterationReport {
    pub fn status_key(&self) -> String {
        match self.status {
            Some(status) => status.to_string(),
            None => REQUEST_ERROR.to_string(),
        }
    }
}

impl Iteration {
    pub fn new(target: &TargetConfig, pause: Duration) -> Result<Self> {
        let body = InvocationPayload::fixed().to_json()?;
        let request = InvocationRequest::new(target.invocations_url(), Some(target.authorization()), body);
        Ok(Self { request, pause })
    }

    pub fn request(&self) -> &InvocationRequest {
        &self.request
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub async fn run_once(&self, client: &dyn ServingClient, checks: &CheckRecorder) -> IterationReport {
        let start = Instant::now();
        let result = client.post(&self.request).await;
        let latency = start.elapsed();

        let status = match result {
            Ok(resp) => Some(resp.status),
            Err(e) => {
                tracing::debug!(target: "iteration", "request failed: {}", e);
                None
            }
        };
        let passed = status.map_or(false, status_is_200);
        checks.record(passed);

        let report = IterationReport { status, latency, passed };
        loadgen_obs::record_status(&report.status_key());
        if report.status.is_some() {
            loadgen_obs::observe_latency(latency.as_secs_f64());
        }

        tokio::time::sleep(self.pause).await;
        report
    }
}
