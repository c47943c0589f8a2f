//! Load generation against serving endpoints: payloads, the per-VU
//! iteration, the VU harness and the probe/warm-up/bench drivers.

pub mod bench;
pub mod check;
pub mod harness;
pub mod iteration;
pub mod payload;
pub mod probe;
pub mod stats;
pub mod warmup;
