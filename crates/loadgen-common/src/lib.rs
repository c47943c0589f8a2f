pub type Result<T> = core::result::Result<T, LoadgenError>;

#[derive(thiserror::Error, Debug)]
pub enum LoadgenError {
    #[error("Missing {0}")]
    MissingEnv(&'static str),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("request error: {0}")]
    Request(String),
    #[error("SLO_VIOLATION: {}", .0.join("; "))]
    SloViolation(Vec<String>),
    #[error("Recovery failed: {0}")]
    Recovery(String),
    #[error("Warm-up failed: endpoint did not respond successfully")]
    WarmupFailed,
    #[error("{0}")]
    Message(String),
}

pub mod config {
    use serde::Deserialize;
    use std::env;
    use std::time::Duration;

    use crate::{LoadgenError, Result};

    pub const HOST_ENV: &str = "DATABRICKS_HOST";
    pub const ENDPOINT_ENV: &str = "ENDPOINT_NAME";
    pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

    /// Where requests go and how they authenticate. Read once at startup.
    ///
    /// Values are taken verbatim: a missing variable becomes an empty string
    /// and ends up in the URL or header as-is.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct TargetConfig {
        pub host: String,
        pub endpoint: String,
        pub token: String,
    }

    impl TargetConfig {
        pub fn new(host: impl Into<String>, endpoint: impl Into<String>, token: impl Into<String>) -> Self {
            Self { host: host.into(), endpoint: endpoint.into(), token: token.into() }
        }

        pub fn from_env() -> Self {
            Self::from_lookup(|key| env::var(key).ok())
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            Self {
                host: lookup(HOST_ENV).unwrap_or_default(),
                endpoint: lookup(ENDPOINT_ENV).unwrap_or_default(),
                token: lookup(TOKEN_ENV).unwrap_or_default(),
            }
        }

        /// Literal `{host}/serving-endpoints/{endpoint}/invocations`, no encoding.
        pub fn invocations_url(&self) -> String {
            serving_url(&self.host, &self.endpoint)
        }

        /// Same as [`invocations_url`](Self::invocations_url) with trailing slashes
        /// stripped from the host.
        pub fn normalized_invocations_url(&self) -> String {
            serving_url(self.host.trim_end_matches('/'), &self.endpoint)
        }

        pub fn authorization(&self) -> String {
            format!("Bearer {}", self.token)
        }

        pub fn require_host(&self) -> Result<&str> {
            let host = self.host.trim();
            if host.is_empty() {
                return Err(LoadgenError::MissingEnv(HOST_ENV));
            }
            Ok(host)
        }

        pub fn require_endpoint(&self) -> Result<&str> {
            if self.endpoint.is_empty() {
                return Err(LoadgenError::MissingEnv(ENDPOINT_ENV));
            }
            Ok(&self.endpoint)
        }

        pub fn require_token(&self) -> Result<&str> {
            if self.token.is_empty() {
                return Err(LoadgenError::MissingEnv(TOKEN_ENV));
            }
            Ok(&self.token)
        }
    }

    pub fn serving_url(host: &str, endpoint: &str) -> String {
        format!("{}/serving-endpoints/{}/invocations", host, endpoint)
    }

    pub fn parse_duration(text: &str) -> Result<Duration> {
        humantime::parse_duration(text.trim())
            .map_err(|e| LoadgenError::Config(format!("invalid duration '{}': {}", text, e)))
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct RunOptions {
        pub vus: usize,
        #[serde(with = "humantime_serde")]
        pub duration: Duration,
        pub pause_ms: u64,
        pub timeout_ms: Option<u64>,
    }

    impl Default for RunOptions {
        fn default() -> Self {
            Self {
                vus: 20,
                duration: Duration::from_secs(180),
                pause_ms: 100,
                timeout_ms: None,
            }
        }
    }

    impl RunOptions {
        /// `LOADGEN_CONFIG` names a YAML file that replaces the defaults wholesale;
        /// without it, individual `LOADGEN_*` variables override the defaults.
        pub fn load() -> Result<Self> {
            Self::load_from(|key| env::var(key).ok())
        }

        pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
            if let Some(path) = lookup("LOADGEN_CONFIG") {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| LoadgenError::Config(format!("{}: {}", path, e)))?;
                return Self::from_yaml(&text);
            }
            let mut opts = Self::default();
            if let Some(v) = lookup("LOADGEN_VUS").and_then(|v| v.parse().ok()) { opts.vus = v; }
            if let Some(v) = lookup("LOADGEN_DURATION").and_then(|v| parse_duration(&v).ok()) { opts.duration = v; }
            if let Some(v) = lookup("LOADGEN_PAUSE_MS").and_then(|v| v.parse().ok()) { opts.pause_ms = v; }
            if let Some(v) = lookup("LOADGEN_TIMEOUT_MS").and_then(|v| v.parse().ok()) { opts.timeout_ms = Some(v); }
            Ok(opts)
        }

        pub fn from_yaml(text: &str) -> Result<Self> {
            serde_yaml::from_str(text).map_err(|e| LoadgenError::Config(e.to_string()))
        }

        pub fn pause(&self) -> Duration {
            Duration::from_millis(self.pause_ms)
        }

        pub fn timeout(&self) -> Option<Duration> {
            self.timeout_ms.map(Duration::from_millis)
        }

        pub fn validate(&self) -> Result<()> {
            if self.vus == 0 {
                return Err(LoadgenError::Config("vus must be at least 1".into()));
            }
            Ok(())
        }
    }
}
