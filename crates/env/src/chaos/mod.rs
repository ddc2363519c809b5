//! Fault injection against the target workload
//!
//! Manages the lifecycle of at most one concurrent fault campaign drawn
//! from a fixed experiment catalog. The saturating CPU-stress variant
//! cascades into a paired pod-kill, surfaced to the control loop as a
//! tagged outcome rather than an error.

mod kube_api;

pub use kube_api::KubeChaos;

use crate::error::EnvError;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Name of the CPU stress experiment (both load tiers share it).
pub const CPU_STRESS_NAME: &str = "cpu-stress";
/// Name of the pod-kill experiment.
pub const POD_KILL_NAME: &str = "pod-kill";

/// Custom resource kinds the injector manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperimentKind {
    StressChaos,
    PodChaos,
}

impl ExperimentKind {
    pub fn kind(self) -> &'static str {
        match self {
            ExperimentKind::StressChaos => "StressChaos",
            ExperimentKind::PodChaos => "PodChaos",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ExperimentKind::StressChaos => "stresschaos",
            ExperimentKind::PodChaos => "podchaos",
        }
    }
}

/// One catalog entry: a named experiment manifest targeting the workload.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub kind: ExperimentKind,
    pub name: String,
    pub manifest: Value,
    /// Whether injecting this experiment triggers the paired pod-kill.
    pub cascading: bool,
}

/// Build the experiment catalog for one namespace/workload pair.
///
/// Two CPU stress tiers (moderate and saturating) plus the pod-kill used by
/// the cascade. The stress tiers share one name so at most one exists.
pub fn catalog(namespace: &str, deployment: &str) -> Vec<Experiment> {
    vec![
        Experiment {
            kind: ExperimentKind::StressChaos,
            name: CPU_STRESS_NAME.to_string(),
            manifest: stress_manifest(namespace, deployment, 50),
            cascading: false,
        },
        Experiment {
            kind: ExperimentKind::StressChaos,
            name: CPU_STRESS_NAME.to_string(),
            manifest: stress_manifest(namespace, deployment, 100),
            cascading: true,
        },
        Experiment {
            kind: ExperimentKind::PodChaos,
            name: POD_KILL_NAME.to_string(),
            manifest: pod_kill_manifest(namespace, deployment),
            cascading: false,
        },
    ]
}

fn stress_manifest(namespace: &str, deployment: &str, load: u32) -> Value {
    json!({
        "apiVersion": "chaos-mesh.org/v1alpha1",
        "kind": "StressChaos",
        "metadata": { "name": CPU_STRESS_NAME, "namespace": namespace },
        "spec": {
            "mode": "all",
            "selector": { "labelSelectors": { "app": deployment } },
            "stressors": { "cpu": { "workers": 4, "load": load } },
            "duration": "270s"
        }
    })
}

fn pod_kill_manifest(namespace: &str, deployment: &str) -> Value {
    json!({
        "apiVersion": "chaos-mesh.org/v1alpha1",
        "kind": "PodChaos",
        "metadata": { "name": POD_KILL_NAME, "namespace": namespace },
        "spec": {
            "action": "pod-kill",
            "mode": "all",
            "selector": { "labelSelectors": { "app": deployment } }
        }
    })
}

/// Create/delete/get access to chaos experiment custom resources.
#[async_trait]
pub trait ChaosApi: Send + Sync {
    async fn create(&self, experiment: &Experiment) -> Result<(), EnvError>;
    async fn delete(&self, kind: ExperimentKind, name: &str) -> Result<(), EnvError>;
    /// Whether the named experiment still exists. A failed read means gone.
    async fn exists(&self, kind: ExperimentKind, name: &str) -> bool;
}

/// Bounded wait for a target ready-replica count, supplied by the scaler.
#[async_trait]
pub trait ReadinessWaiter: Send + Sync {
    async fn await_ready(&self, target: u32) -> bool;
}

/// Outcome of an injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// Nothing injected: campaign already active, probability draw failed,
    /// or the create was rejected.
    Skipped,
    /// A single experiment is now active.
    Injected,
    /// The saturating stress tier cascaded into a pod-kill; the cycle must
    /// terminate with the cascade penalty.
    CascadingFault,
}

/// Configuration for the fault injector.
#[derive(Debug, Clone)]
pub struct FaultInjectorConfig {
    /// Probability of starting a campaign on an idle cycle (default: 0.1).
    /// Zero disables injection entirely.
    pub probability: f64,
    /// Deletion-confirmation polls before giving up (default: 10)
    pub delete_confirm_retries: u32,
    /// Interval between deletion-confirmation polls (default: 500ms)
    pub delete_confirm_interval: Duration,
}

impl Default for FaultInjectorConfig {
    fn default() -> Self {
        Self {
            probability: 0.1,
            delete_confirm_retries: 10,
            delete_confirm_interval: Duration::from_millis(500),
        }
    }
}

/// Manages at most one fault campaign against the target workload.
pub struct FaultInjector {
    api: std::sync::Arc<dyn ChaosApi>,
    catalog: Vec<Experiment>,
    active: HashSet<String>,
    config: FaultInjectorConfig,
    rng: StdRng,
}

impl FaultInjector {
    pub fn new(
        api: std::sync::Arc<dyn ChaosApi>,
        namespace: &str,
        deployment: &str,
        config: FaultInjectorConfig,
    ) -> Self {
        Self::with_rng(api, namespace, deployment, config, StdRng::from_entropy())
    }

    /// Construct with a seeded RNG for deterministic draws.
    pub fn with_rng(
        api: std::sync::Arc<dyn ChaosApi>,
        namespace: &str,
        deployment: &str,
        config: FaultInjectorConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            api,
            catalog: catalog(namespace, deployment),
            active: HashSet::new(),
            config,
            rng,
        }
    }

    /// Names of currently active experiments.
    pub fn active(&self) -> &HashSet<String> {
        &self.active
    }

    /// Maybe start a fault campaign.
    ///
    /// No-op while a campaign is active: never more than one runs against
    /// the workload. Otherwise, with the configured probability, draws one
    /// stress tier uniformly. The saturating tier additionally creates the
    /// paired pod-kill, waits (bounded) for zero ready pods through
    /// `waiter`, and reports `CascadingFault`.
    pub async fn inject_random(&mut self, waiter: &dyn ReadinessWaiter) -> InjectOutcome {
        if !self.active.is_empty() {
            return InjectOutcome::Skipped;
        }
        if self.rng.gen::<f64>() >= self.config.probability {
            return InjectOutcome::Skipped;
        }

        let stress_tiers: Vec<usize> = self
            .catalog
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == ExperimentKind::StressChaos)
            .map(|(i, _)| i)
            .collect();
        let drawn = self.catalog[stress_tiers[self.rng.gen_range(0..stress_tiers.len())]].clone();

        if let Err(e) = self.api.create(&drawn).await {
            warn!(experiment = %drawn.name, error = %e, "failed to inject fault");
            return InjectOutcome::Skipped;
        }
        self.active.insert(drawn.name.clone());
        info!(experiment = %drawn.name, cascading = drawn.cascading, "injected fault experiment");

        if !drawn.cascading {
            return InjectOutcome::Injected;
        }

        let Some(pod_kill) = self
            .catalog
            .iter()
            .find(|e| e.kind == ExperimentKind::PodChaos)
            .cloned()
        else {
            return InjectOutcome::Injected;
        };
        if let Err(e) = self.api.create(&pod_kill).await {
            warn!(error = %e, "failed to inject paired pod-kill");
            return InjectOutcome::Injected;
        }
        self.active.insert(pod_kill.name.clone());
        info!("injected paired pod-kill experiment");

        // All pods are going down; wait (bounded) for the cluster to
        // acknowledge before handing the cascade back to the control loop.
        let ready = waiter.await_ready(0).await;
        debug!(ready, "pod-kill readiness wait finished");

        InjectOutcome::CascadingFault
    }

    /// Delete every active experiment, confirming deletion with bounded
    /// polls. Identities leave the active set regardless of confirmation,
    /// trading one possible stale fault for bounded latency. Safe to call
    /// unconditionally; an empty active set issues no API traffic.
    pub async fn cleanup(&mut self) {
        for experiment in self.catalog.clone() {
            if !self.active.contains(&experiment.name) {
                continue;
            }

            if let Err(e) = self.api.delete(experiment.kind, &experiment.name).await {
                debug!(experiment = %experiment.name, error = %e, "delete failed, continuing");
            }

            for _ in 0..self.config.delete_confirm_retries {
                sleep(self.config.delete_confirm_interval).await;
                if !self.api.exists(experiment.kind, &experiment.name).await {
                    break;
                }
            }

            self.active.remove(&experiment.name);
            info!(experiment = %experiment.name, "fault experiment removed");
        }
    }

    /// Delete every catalog experiment regardless of the active set.
    ///
    /// Operator tooling uses this to recover from a run that died with
    /// faults still applied; this process never created them, so the
    /// active set does not know about them.
    pub async fn cleanup_all(&mut self) {
        let names: Vec<String> = self.catalog.iter().map(|e| e.name.clone()).collect();
        self.active.extend(names);
        self.cleanup().await;
    }
}
