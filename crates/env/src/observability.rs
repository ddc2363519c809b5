//! Prometheus metrics for the control loop

use crate::models::StepResult;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;

/// Histogram buckets for scale-operation durations (in seconds); a scale
/// includes the readiness wait, so buckets stretch to the wait timeout.
const SCALE_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 60.0, 90.0];

static GLOBAL_METRICS: OnceLock<ControlMetricsInner> = OnceLock::new();

struct ControlMetricsInner {
    cycles_total: IntCounter,
    invalid_actions_total: IntCounter,
    cluster_errors_total: IntCounter,
    faults_injected_total: IntCounter,
    episode_resets_total: IntCounter,
    scale_duration_seconds: Histogram,
    last_reward: Gauge,
    current_replicas: IntGauge,
}

impl ControlMetricsInner {
    fn new() -> Self {
        Self {
            cycles_total: register_int_counter!(
                "scaling_controller_cycles_total",
                "Decision cycles executed"
            )
            .expect("Failed to register cycles_total"),

            invalid_actions_total: register_int_counter!(
                "scaling_controller_invalid_actions_total",
                "Cycles rejected for an out-of-bounds action"
            )
            .expect("Failed to register invalid_actions_total"),

            cluster_errors_total: register_int_counter!(
                "scaling_controller_cluster_errors_total",
                "Cycles ended by a cluster API error"
            )
            .expect("Failed to register cluster_errors_total"),

            faults_injected_total: register_int_counter!(
                "scaling_controller_faults_injected_total",
                "Fault experiments created"
            )
            .expect("Failed to register faults_injected_total"),

            episode_resets_total: register_int_counter!(
                "scaling_controller_episode_resets_total",
                "Environment resets"
            )
            .expect("Failed to register episode_resets_total"),

            scale_duration_seconds: register_histogram!(
                "scaling_controller_scale_duration_seconds",
                "Time from replica patch to cluster convergence",
                SCALE_BUCKETS.to_vec()
            )
            .expect("Failed to register scale_duration_seconds"),

            last_reward: register_gauge!(
                "scaling_controller_last_reward",
                "Reward of the most recent cycle"
            )
            .expect("Failed to register last_reward"),

            current_replicas: register_int_gauge!(
                "scaling_controller_current_replicas",
                "Replica count after the most recent cycle"
            )
            .expect("Failed to register current_replicas"),
        }
    }
}

/// Lightweight handle to the global control-loop metrics. Clones share the
/// same underlying instance.
#[derive(Clone)]
pub struct ControlMetrics {
    _private: (),
}

impl Default for ControlMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControlMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControlMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record one finished decision cycle.
    pub fn observe_step(&self, result: &StepResult) {
        let inner = self.inner();
        inner.cycles_total.inc();
        inner.last_reward.set(result.reward);
        inner
            .current_replicas
            .set(result.state.replica_count() as i64);
        if result.info.invalid_action {
            inner.invalid_actions_total.inc();
        }
        if result.info.error.is_some() && !result.info.unexpected_error {
            inner.cluster_errors_total.inc();
        }
    }

    pub fn observe_scale_duration(&self, duration_secs: f64) {
        self.inner().scale_duration_seconds.observe(duration_secs);
    }

    pub fn inc_faults_injected(&self) {
        self.inner().faults_injected_total.inc();
    }

    pub fn inc_episode_resets(&self) {
        self.inner().episode_resets_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{State, StepInfo};

    #[test]
    fn handles_share_the_global_instance() {
        let a = ControlMetrics::new();
        let b = ControlMetrics::new();

        let result = StepResult {
            state: State::zeroed(),
            reward: 0.5,
            terminated: false,
            truncated: false,
            info: StepInfo::default(),
        };
        a.observe_step(&result);
        a.inc_episode_resets();
        // Registration is global and idempotent across handles; a second
        // handle observing must not re-register or panic.
        b.observe_step(&result);
    }
}
