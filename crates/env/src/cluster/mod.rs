//! Cluster control boundary
//!
//! Read/patch access to one namespace/workload pair, plus the scaler that
//! turns a target replica count into a converged cluster state.

mod scaler;
mod workload;

pub use scaler::{ClusterScaler, MismatchPolicy, ScaleStatus, ScalerConfig};
pub use workload::KubeWorkload;

use crate::error::EnvError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Snapshot of the deployment fields the environment cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentView {
    /// Desired replica count from the spec.
    pub spec_replicas: u32,
    pub ready_replicas: u32,
    pub available_replicas: u32,
    pub annotations: HashMap<String, String>,
}

/// Access to a single named workload.
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    /// Read the current deployment state.
    async fn get(&self) -> Result<DeploymentView, EnvError>;

    /// Patch the desired replica count.
    async fn patch_replicas(&self, replicas: u32) -> Result<(), EnvError>;
}
