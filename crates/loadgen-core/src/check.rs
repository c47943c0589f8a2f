use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub const STATUS_200: &str = "status 200";

/// The only check the load run makes.
pub fn status_is_200(status: u16) -> bool {
    status == 200
}

/// Pass/fail tallies for one named check, shared by every VU.
#[derive(Debug)]
pub struct CheckRecorder {
    name: &'static str,
    passes: AtomicU64,
    fails: AtomicU64,
}

impl CheckRecorder {
    pub fn new(name: &'static str) -> Self {
        Self { name, passes: AtomicU64::new(0), fails: AtomicU64::new(0) }
    }

    pub fn record(&self, passed: bool) {
        if passed {
            self.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fails.fetch_add(1, Ordering::Relaxed);
        }
        loadgen_obs::record_check(self.name, passed);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn fails(&self) -> u64 {
        self.fails.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> CheckSummary {
        CheckSummary { name: self.name.to_string(), passes: self.passes(), fails: self.fails() }
    }
}

impl Default for CheckRecorder {
    fn default() -> Self {
        Self::new(STATUS_200)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.passes as f64 / self.total() as f64
    }
}
