//! Observation assembly

use crate::models::{MetricSet, State};

/// Default per-pod memory allocation used for normalization: 512 MiB.
pub const DEFAULT_MAX_MEMORY_PER_POD: u64 = 512 * 1024 * 1024;

/// Assembles the fixed-shape observation vector from raw metrics and the
/// replica count.
pub struct StateBuilder;

impl StateBuilder {
    /// Pure except for the guarded memory normalization: with zero replicas
    /// the denominator would vanish, so normalized memory clamps to 0.
    pub fn build(metrics: &MetricSet, replicas: u32, max_memory_per_pod: u64) -> State {
        let total_max_memory = max_memory_per_pod as f64 * replicas as f64;
        let memory_normalized = if total_max_memory > 0.0 {
            metrics.memory_bytes / total_max_memory
        } else {
            0.0
        };

        State {
            cpu_usage_percent: metrics.cpu_usage_percent,
            memory_normalized,
            replicas: replicas as f64,
            p95_latency_ms: metrics.p95_latency_ms,
            requests_per_second: metrics.requests_per_second,
        }
    }
}
