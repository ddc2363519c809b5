//! Controller configuration

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Controller configuration, loaded from `SCALER_`-prefixed environment
/// variables with serde defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Namespace of the target workload
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Deployment name of the target workload
    #[serde(default = "default_deployment")]
    pub deployment: String,

    /// Prometheus base URL
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    /// Model server predict URL; the CPU-threshold heuristic is used
    /// when unset
    #[serde(default)]
    pub decider_url: Option<String>,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between decision cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper replica bound
    #[serde(default = "default_max_replicas")]
    pub max_replicas: u32,

    /// Cycles per episode before truncation
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Fault-injection probability. Zero keeps chaos out of production;
    /// raise it only for resilience validation runs.
    #[serde(default)]
    pub fault_probability: f64,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_deployment() -> String {
    "nginx".to_string()
}

fn default_prometheus_url() -> String {
    "http://prometheus-nodeport.monitoring.svc.cluster.local:9090".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_poll_interval() -> u64 {
    60
}

fn default_max_replicas() -> u32 {
    15
}

fn default_max_steps() -> u32 {
    200
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            deployment: default_deployment(),
            prometheus_url: default_prometheus_url(),
            decider_url: None,
            api_port: default_api_port(),
            poll_interval_secs: default_poll_interval(),
            max_replicas: default_max_replicas(),
            max_steps: default_max_steps(),
            fault_probability: 0.0,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SCALER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
