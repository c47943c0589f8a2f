//! Outbound HTTP seam: one POST to a serving endpoint per call.

use async_trait::async_trait;
use loadgen_common::Result;

/// A fully built invocation. Built once per run and reused every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub url: String,
    /// Complete header value, e.g. `Bearer abc`. `None` sends no header.
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl InvocationRequest {
    pub fn new(url: impl Into<String>, authorization: Option<String>, body: Vec<u8>) -> Self {
        Self { url: url.into(), authorization, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResponse {
    pub status: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ServingClient: Send + Sync {
    /// Sends the request with `Content-Type: application/json`. Transport
    /// failures are errors; any HTTP status is a response.
    async fn post(&self, request: &InvocationRequest) -> Result<InvocationResponse>;
}

pub mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use loadgen_common::{LoadgenError, Result};
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

    use super::{InvocationRequest, InvocationResponse, ServingClient};

    #[derive(Clone)]
    pub struct HttpServingClient {
        client: reqwest::Client,
    }

    impl HttpServingClient {
        pub fn new(timeout: Option<Duration>) -> Result<Self> {
            let mut builder = reqwest::Client::builder();
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder.build().map_err(|e| LoadgenError::Request(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl ServingClient for HttpServingClient {
        async fn post(&self, request: &InvocationRequest) -> Result<InvocationResponse> {
            let mut builder = self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/json")
                .body(request.body.clone());
            if let Some(auth) = &request.authorization {
                builder = builder.header(AUTHORIZATION, auth);
            }

            let resp = builder.send().await.map_err(|e| LoadgenError::Request(describe(&e)))?;
            let status = resp.status().as_u16();
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(target: "client", "status {} but body read failed: {}", status, e);
                    String::new()
                }
            };
            Ok(InvocationResponse { status, body })
        }
    }

    fn describe(err: &reqwest::Error) -> String {
        let kind = if err.is_builder() {
            "invalid request"
        } else if err.is_connect() {
            "connection refused or host unreachable"
        } else if err.is_timeout() {
            "timeout"
        } else {
            "network error"
        };
        format!("{}: {}", kind, err)
    }
}

#[cfg(feature = "mock")]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use loadgen_common::{LoadgenError, Result};

    use super::{InvocationRequest, InvocationResponse, ServingClient};

    /// Scripted client. Statuses are replayed in order; the last one repeats.
    /// An empty script fails every call as a transport error.
    #[derive(Default)]
    pub struct MockClient {
        script: Mutex<VecDeque<u16>>,
        last: Mutex<Option<u16>>,
        delay: Duration,
        calls: AtomicUsize,
        requests: Mutex<Vec<InvocationRequest>>,
    }

    impl MockClient {
        pub fn new(status: u16) -> Self {
            Self::sequence(vec![status])
        }

        pub fn sequence(statuses: Vec<u16>) -> Self {
            Self { script: Mutex::new(statuses.into()), ..Self::default() }
        }

        pub fn failing() -> Self {
            Self::default()
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }

        pub fn requests(&self) -> Vec<InvocationRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn next_status(&self) -> Option<u16> {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(s) = script.pop_front() {
                *last = Some(s);
            }
            *last
        }
    }

    #[async_trait]
    impl ServingClient for MockClient {
        async fn post(&self, request: &InvocationRequest) -> Result<InvocationResponse> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.requests.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.next_status() {
                Some(status) => Ok(InvocationResponse { status, body: String::new() }),
                None => Err(LoadgenError::Request("mock transport failure".into())),
            }
        }
    }
}
