//! Chaos Mesh custom-object access
//!
//! The experiment kinds are CRDs, so they go through the dynamic API
//! rather than typed k8s-openapi structs.

use super::{ChaosApi, Experiment, ExperimentKind};
use crate::error::EnvError;
use async_trait::async_trait;
use kube::api::{DeleteParams, DynamicObject, PostParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Api, Client};

const CHAOS_GROUP: &str = "chaos-mesh.org";
const CHAOS_VERSION: &str = "v1alpha1";

/// `ChaosApi` over the chaos-mesh.org/v1alpha1 custom resources.
pub struct KubeChaos {
    client: Client,
    namespace: String,
}

impl KubeChaos {
    /// Connect using the ambient configuration (in-cluster service account
    /// or local kubeconfig).
    pub async fn connect(namespace: &str) -> Result<Self, EnvError> {
        let client = Client::try_default().await.map_err(EnvError::cluster)?;
        Ok(Self::new(client, namespace))
    }

    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
        }
    }

    fn api_for(&self, kind: ExperimentKind) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(CHAOS_GROUP, CHAOS_VERSION, kind.kind());
        let resource = ApiResource::from_gvk_with_plural(&gvk, kind.plural());
        Api::namespaced_with(self.client.clone(), &self.namespace, &resource)
    }
}

#[async_trait]
impl ChaosApi for KubeChaos {
    async fn create(&self, experiment: &Experiment) -> Result<(), EnvError> {
        let object: DynamicObject =
            serde_json::from_value(experiment.manifest.clone()).map_err(EnvError::cluster)?;
        self.api_for(experiment.kind)
            .create(&PostParams::default(), &object)
            .await
            .map_err(EnvError::cluster)?;
        Ok(())
    }

    async fn delete(&self, kind: ExperimentKind, name: &str) -> Result<(), EnvError> {
        self.api_for(kind)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(EnvError::cluster)?;
        Ok(())
    }

    async fn exists(&self, kind: ExperimentKind, name: &str) -> bool {
        self.api_for(kind).get(name).await.is_ok()
    }
}
