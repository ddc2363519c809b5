//! Kubernetes-backed workload access

use super::{DeploymentView, WorkloadApi};
use crate::error::EnvError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;

/// `WorkloadApi` over the apps/v1 Deployment API.
pub struct KubeWorkload {
    api: Api<Deployment>,
    name: String,
}

impl KubeWorkload {
    /// Connect using the ambient configuration (in-cluster service account
    /// or local kubeconfig).
    pub async fn connect(namespace: &str, name: &str) -> Result<Self, EnvError> {
        let client = Client::try_default().await.map_err(EnvError::cluster)?;
        Ok(Self::new(client, namespace, name))
    }

    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl WorkloadApi for KubeWorkload {
    async fn get(&self) -> Result<DeploymentView, EnvError> {
        let deployment = self.api.get(&self.name).await.map_err(EnvError::cluster)?;

        let spec_replicas = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(0)
            .max(0) as u32;
        let status = deployment.status.as_ref();

        Ok(DeploymentView {
            spec_replicas,
            ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0).max(0) as u32,
            available_replicas: status
                .and_then(|s| s.available_replicas)
                .unwrap_or(0)
                .max(0) as u32,
            annotations: deployment
                .metadata
                .annotations
                .map(|a| a.into_iter().collect())
                .unwrap_or_default(),
        })
    }

    async fn patch_replicas(&self, replicas: u32) -> Result<(), EnvError> {
        let patch = json!({ "spec": { "replicas": replicas } });
        self.api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(EnvError::cluster)?;
        Ok(())
    }
}
