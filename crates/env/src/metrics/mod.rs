//! Metrics source boundary
//!
//! The environment treats the metrics backend as `query(expr) -> f64` with
//! a deterministic 0.0 fallback on any failure; a degraded backend degrades
//! the observation, never the cycle.

mod prom;

pub use prom::PrometheusSource;

use crate::models::MetricSet;
use async_trait::async_trait;

/// Scalar instant-query access to a metrics backend.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Evaluate a single instant query. Infallible by contract: transport
    /// and parse failures yield 0.0.
    async fn query(&self, expr: &str) -> f64;
}

/// PromQL construction for one namespace/workload pair.
#[derive(Debug, Clone)]
pub struct MetricQueries {
    namespace: String,
    deployment: String,
}

impl MetricQueries {
    pub fn new(namespace: &str, deployment: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            deployment: deployment.to_string(),
        }
    }

    pub fn cpu_usage_percent(&self) -> String {
        format!(
            "sum(rate(container_cpu_usage_seconds_total{{namespace=\"{}\", pod=~\"{}-.*\"}}[1m])) * 100",
            self.namespace, self.deployment
        )
    }

    pub fn memory_bytes(&self) -> String {
        format!(
            "sum(container_memory_working_set_bytes{{namespace=\"{}\", pod=~\"{}-.*\"}})",
            self.namespace, self.deployment
        )
    }

    pub fn p95_latency_ms(&self) -> String {
        format!(
            "histogram_quantile(0.95, sum(rate(istio_request_duration_milliseconds_bucket{{reporter=\"destination\", destination_workload=\"{}\"}}[5m])) by (le))",
            self.deployment
        )
    }

    pub fn requests_per_second(&self) -> String {
        format!(
            "sum(rate(istio_requests_total{{reporter=\"destination\", destination_workload=\"{}\"}}[1m]))",
            self.deployment
        )
    }

    /// Evaluate all four workload queries into one raw sample.
    pub async fn sample(&self, source: &dyn MetricsSource) -> MetricSet {
        MetricSet {
            cpu_usage_percent: source.query(&self.cpu_usage_percent()).await,
            memory_bytes: source.query(&self.memory_bytes()).await,
            p95_latency_ms: source.query(&self.p95_latency_ms()).await,
            requests_per_second: source.query(&self.requests_per_second()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedSource;

    #[async_trait]
    impl MetricsSource for CannedSource {
        async fn query(&self, expr: &str) -> f64 {
            if expr.contains("container_cpu_usage_seconds_total") {
                55.0
            } else if expr.contains("container_memory_working_set_bytes") {
                1024.0
            } else if expr.contains("istio_request_duration_milliseconds_bucket") {
                120.0
            } else if expr.contains("istio_requests_total") {
                30.0
            } else {
                f64::NAN
            }
        }
    }

    #[tokio::test]
    async fn sample_maps_queries_to_fields() {
        let queries = MetricQueries::new("default", "nginx");
        let sample = queries.sample(&CannedSource).await;

        assert_eq!(sample.cpu_usage_percent, 55.0);
        assert_eq!(sample.memory_bytes, 1024.0);
        assert_eq!(sample.p95_latency_ms, 120.0);
        assert_eq!(sample.requests_per_second, 30.0);
    }

    #[test]
    fn queries_are_scoped_to_the_workload() {
        let queries = MetricQueries::new("prod", "checkout");
        assert!(queries.cpu_usage_percent().contains("namespace=\"prod\""));
        assert!(queries.cpu_usage_percent().contains("pod=~\"checkout-.*\""));
        assert!(queries
            .p95_latency_ms()
            .contains("destination_workload=\"checkout\""));
    }
}
