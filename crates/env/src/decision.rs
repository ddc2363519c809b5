//! Decision-maker boundary
//!
//! The environment is agnostic to how an action is chosen; it only needs a
//! bounded-time `decide` call that is side-effect-free from its own
//! perspective.

use crate::error::EnvError;
use crate::models::{Action, State};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chooses a scaling action for an observation.
#[async_trait]
pub trait Decider: Send + Sync {
    async fn decide(&self, state: &State) -> Result<Action, EnvError>;
}

#[derive(Serialize)]
struct PredictRequest {
    cpu_usage: f32,
    mem_usage: f32,
    n_replicas: f32,
    latency: f32,
    rps: f32,
}

impl From<&State> for PredictRequest {
    fn from(state: &State) -> Self {
        let [cpu_usage, mem_usage, n_replicas, latency, rps] = state.as_vector();
        Self {
            cpu_usage,
            mem_usage,
            n_replicas,
            latency,
            rps,
        }
    }
}

#[derive(Deserialize)]
struct PredictResponse {
    action: i64,
}

/// Decider backed by a model server's `/predict` endpoint.
pub struct HttpDecider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDecider {
    /// `endpoint` is the full predict URL, e.g.
    /// `http://model-server:8000/predict`.
    pub fn new(endpoint: &str) -> Result<Self, EnvError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| EnvError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Decider for HttpDecider {
    async fn decide(&self, state: &State) -> Result<Action, EnvError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest::from(state))
            .send()
            .await
            .map_err(|e| EnvError::Decision(format!("predict request failed: {e}")))?
            .error_for_status()
            .map_err(|e| EnvError::Decision(format!("predict returned error: {e}")))?;

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| EnvError::Decision(format!("malformed predict response: {e}")))?;

        Action::from_index(parsed.action).ok_or(EnvError::InvalidActionIndex(parsed.action))
    }
}

/// CPU-watermark heuristic used when no model server is configured.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdDecider {
    /// Scale up above this CPU percentage.
    pub scale_up_cpu: f64,
    /// Scale down below this CPU percentage.
    pub scale_down_cpu: f64,
}

impl Default for ThresholdDecider {
    fn default() -> Self {
        Self {
            scale_up_cpu: 70.0,
            scale_down_cpu: 20.0,
        }
    }
}

#[async_trait]
impl Decider for ThresholdDecider {
    async fn decide(&self, state: &State) -> Result<Action, EnvError> {
        let action = if state.cpu_usage_percent > self.scale_up_cpu {
            Action::ScaleUp
        } else if state.cpu_usage_percent < self.scale_down_cpu {
            Action::ScaleDown
        } else {
            Action::Hold
        };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_cpu(cpu: f64) -> State {
        State {
            cpu_usage_percent: cpu,
            memory_normalized: 0.0,
            replicas: 3.0,
            p95_latency_ms: 0.0,
            requests_per_second: 0.0,
        }
    }

    #[tokio::test]
    async fn threshold_decider_watermarks() {
        let decider = ThresholdDecider::default();

        assert_eq!(
            decider.decide(&state_with_cpu(90.0)).await.unwrap(),
            Action::ScaleUp
        );
        assert_eq!(
            decider.decide(&state_with_cpu(45.0)).await.unwrap(),
            Action::Hold
        );
        assert_eq!(
            decider.decide(&state_with_cpu(5.0)).await.unwrap(),
            Action::ScaleDown
        );
    }

    #[test]
    fn predict_request_follows_vector_order() {
        let state = State {
            cpu_usage_percent: 1.0,
            memory_normalized: 2.0,
            replicas: 3.0,
            p95_latency_ms: 4.0,
            requests_per_second: 5.0,
        };
        let request = PredictRequest::from(&state);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["cpu_usage"], 1.0);
        assert_eq!(json["mem_usage"], 2.0);
        assert_eq!(json["n_replicas"], 3.0);
        assert_eq!(json["latency"], 4.0);
        assert_eq!(json["rps"], 5.0);
    }
}
