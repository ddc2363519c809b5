//! Core data models for the scaling environment

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Annotation key for the soft latency constraint (milliseconds)
pub const LATENCY_SOFT_ANNOTATION: &str = "latencySoftConstraint";
/// Annotation key for the hard latency constraint (milliseconds)
pub const LATENCY_HARD_ANNOTATION: &str = "latencyHardConstraint";

/// Observation vector for one workload.
///
/// Field order is fixed for the lifetime of a deployment configuration and
/// matches `as_vector` exactly; consumers index into the vector by position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub cpu_usage_percent: f64,
    /// Memory usage normalized by total allocatable memory across replicas,
    /// clamped to 0 when no replicas are running.
    pub memory_normalized: f64,
    pub replicas: f64,
    pub p95_latency_ms: f64,
    pub requests_per_second: f64,
}

impl State {
    /// A fully degraded observation: every field zero.
    pub fn zeroed() -> Self {
        Self {
            cpu_usage_percent: 0.0,
            memory_normalized: 0.0,
            replicas: 0.0,
            p95_latency_ms: 0.0,
            requests_per_second: 0.0,
        }
    }

    /// The observation as a fixed-order vector.
    pub fn as_vector(&self) -> [f32; 5] {
        [
            self.cpu_usage_percent as f32,
            self.memory_normalized as f32,
            self.replicas as f32,
            self.p95_latency_ms as f32,
            self.requests_per_second as f32,
        ]
    }

    /// Replica count as the integer it was observed as.
    pub fn replica_count(&self) -> u32 {
        self.replicas as u32
    }
}

/// Raw metric sample for one workload, prior to normalization.
///
/// Every field defaults to 0.0 when the upstream query fails, so a degraded
/// metrics backend still yields a well-formed observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub cpu_usage_percent: f64,
    pub memory_bytes: f64,
    pub p95_latency_ms: f64,
    pub requests_per_second: f64,
}

/// Discrete scaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ScaleDown,
    Hold,
    ScaleUp,
}

impl Action {
    /// Decode a wire-format action index (0=down, 1=hold, 2=up).
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Action::ScaleDown),
            1 => Some(Action::Hold),
            2 => Some(Action::ScaleUp),
            _ => None,
        }
    }

    /// Wire-format action index.
    pub fn index(self) -> i64 {
        match self {
            Action::ScaleDown => 0,
            Action::Hold => 1,
            Action::ScaleUp => 2,
        }
    }

    /// Replica delta this action applies.
    pub fn replica_delta(self) -> i64 {
        self.index() - 1
    }
}

/// Latency SLO thresholds parsed from workload annotations.
///
/// A missing annotation, the `-1` sentinel, or an unparseable value all mean
/// "unset"; the latency reward term only applies when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SloConstraints {
    pub latency_soft_ms: Option<f64>,
    pub latency_hard_ms: Option<f64>,
}

impl SloConstraints {
    pub fn from_annotations(annotations: &HashMap<String, String>) -> Self {
        Self {
            latency_soft_ms: parse_constraint(annotations.get(LATENCY_SOFT_ANNOTATION)),
            latency_hard_ms: parse_constraint(annotations.get(LATENCY_HARD_ANNOTATION)),
        }
    }

    /// Both thresholds, when both are set.
    pub fn both_set(&self) -> Option<(f64, f64)> {
        match (self.latency_soft_ms, self.latency_hard_ms) {
            (Some(soft), Some(hard)) => Some((soft, hard)),
            _ => None,
        }
    }
}

fn parse_constraint(raw: Option<&String>) -> Option<f64> {
    let value: f64 = raw?.parse().ok()?;
    if value < 0.0 {
        None
    } else {
        Some(value)
    }
}

/// Diagnostic fields attached to a step result. Serializes to a JSON map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub invalid_action: bool,
    #[serde(default)]
    pub unexpected_error: bool,
}

impl StepInfo {
    /// Diagnostics derived from an observation.
    pub fn from_state(state: &State) -> Self {
        Self {
            current_replicas: Some(state.replica_count()),
            cpu_usage: Some(state.cpu_usage_percent),
            memory_usage: Some(state.memory_normalized),
            response_time_ms: Some(state.p95_latency_ms),
            ..Self::default()
        }
    }
}

/// Result of one decision cycle. Created fresh each cycle and owned by the
/// caller once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub state: State,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_roundtrip() {
        for index in 0..3 {
            let action = Action::from_index(index).unwrap();
            assert_eq!(action.index(), index);
        }
        assert!(Action::from_index(3).is_none());
        assert!(Action::from_index(-1).is_none());
    }

    #[test]
    fn action_deltas() {
        assert_eq!(Action::ScaleDown.replica_delta(), -1);
        assert_eq!(Action::Hold.replica_delta(), 0);
        assert_eq!(Action::ScaleUp.replica_delta(), 1);
    }

    #[test]
    fn state_vector_order_is_fixed() {
        let state = State {
            cpu_usage_percent: 42.0,
            memory_normalized: 0.5,
            replicas: 3.0,
            p95_latency_ms: 120.0,
            requests_per_second: 88.0,
        };
        let v = state.as_vector();
        assert_eq!(v[0], 42.0);
        assert_eq!(v[1], 0.5);
        assert_eq!(v[2], 3.0);
        assert_eq!(v[3], 120.0);
        assert_eq!(v[4], 88.0);
    }

    #[test]
    fn constraints_parse_from_annotations() {
        let mut annotations = HashMap::new();
        annotations.insert(LATENCY_SOFT_ANNOTATION.to_string(), "100".to_string());
        annotations.insert(LATENCY_HARD_ANNOTATION.to_string(), "500".to_string());

        let slo = SloConstraints::from_annotations(&annotations);
        assert_eq!(slo.both_set(), Some((100.0, 500.0)));
    }

    #[test]
    fn sentinel_and_garbage_mean_unset() {
        let mut annotations = HashMap::new();
        annotations.insert(LATENCY_SOFT_ANNOTATION.to_string(), "-1".to_string());
        annotations.insert(LATENCY_HARD_ANNOTATION.to_string(), "lots".to_string());

        let slo = SloConstraints::from_annotations(&annotations);
        assert_eq!(slo.latency_soft_ms, None);
        assert_eq!(slo.latency_hard_ms, None);
        assert_eq!(slo.both_set(), None);
    }

    #[test]
    fn missing_annotations_mean_unset() {
        let slo = SloConstraints::from_annotations(&HashMap::new());
        assert_eq!(slo.both_set(), None);
    }

    #[test]
    fn step_info_serializes_sparsely() {
        let info = StepInfo {
            current_replicas: Some(3),
            ..StepInfo::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["current_replicas"], 3);
        assert!(json.get("error").is_none());
    }
}
