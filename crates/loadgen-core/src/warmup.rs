use std::time::Duration;

use loadgen_client::{InvocationRequest, ServingClient};
use loadgen_common::{LoadgenError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmupOptions {
    pub tries: u32,
    /// Wait between failed attempts.
    pub backoff: Duration,
}

impl Default for WarmupOptions {
    fn default() -> Self {
        Self { tries: 8, backoff: Duration::from_secs(5) }
    }
}

/// Posts until the endpoint answers 2xx. Returns the 1-based attempt that succeeded.
pub async fn warm_up(client: &dyn ServingClient, request: &InvocationRequest, options: &WarmupOptions) -> Result<u32> {
    for attempt in 1..=options.tries {
        match client.post(request).await {
            Ok(resp) if resp.is_success() => {
                tracing::info!(target: "warmup", "Warm-up OK on try {}", attempt);
                return Ok(attempt);
            }
            Ok(resp) => {
                let snippet: String = resp.body.chars().take(200).collect();
                tracing::warn!(target: "warmup", "Warm-up got status={}, body={:?}", resp.status, snippet);
            }
            Err(e) => tracing::warn!(target: "warmup", "Warm-up error on try {}: {}", attempt, e),
        }
        if attempt < options.tries {
            tokio::time::sleep(options.backoff).await;
        }
    }
    Err(LoadgenError::WarmupFailed)
}
