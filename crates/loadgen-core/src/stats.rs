use serde::Serialize;

/// Nearest-rank percentile over unsorted samples. Rank ties round to even,
/// so the median of two samples is the lower one.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let last = sorted.len() - 1;
    let rank = ((p / 100.0) * last as f64).round_ties_even();
    let k = (rank.max(0.0) as usize).min(last);
    Some(sorted[k])
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl LatencySummary {
    pub fn from_samples(samples_ms: &[f64]) -> Self {
        Self {
            count: samples_ms.len(),
            avg_ms: mean(samples_ms),
            min_ms: samples_ms.iter().copied().reduce(f64::min),
            max_ms: samples_ms.iter().copied().reduce(f64::max),
            p50_ms: percentile(samples_ms, 50.0),
            p95_ms: percentile(samples_ms, 95.0),
            p99_ms: percentile(samples_ms, 99.0),
        }
    }
}
