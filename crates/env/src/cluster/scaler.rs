//! Replica scaling with bounded convergence waits
//!
//! `scale_to` issues the replica patch and then polls deployment status
//! until the cluster converges or the timeout elapses. An external mutation
//! of the desired count aborts the wait early instead of looping past it.

use super::{DeploymentView, WorkloadApi};
use crate::chaos::ReadinessWaiter;
use crate::error::EnvError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// How an externally mutated desired-replica count is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Report `ScaleStatus::Interfered` and continue the cycle.
    Tolerate,
    /// Promote to a cluster error, ending the cycle.
    Fail,
}

/// Outcome of a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleStatus {
    /// Ready and available counts both converged to the target.
    Ready,
    /// The timeout elapsed before convergence.
    TimedOut,
    /// Someone else changed the desired count mid-wait.
    Interfered,
}

/// Configuration for the cluster scaler.
#[derive(Debug, Clone)]
pub struct ScalerConfig {
    /// Upper bound on one readiness wait (default: 60 seconds)
    pub ready_timeout: Duration,
    /// Interval between status polls (default: 2 seconds)
    pub poll_interval: Duration,
    /// Pause after a successful scale to let traffic balancing catch up
    /// (default: 3 seconds)
    pub stabilization_pause: Duration,
    pub mismatch_policy: MismatchPolicy,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            stabilization_pause: Duration::from_secs(3),
            mismatch_policy: MismatchPolicy::Tolerate,
        }
    }
}

/// Reads and writes the replica count of one workload.
pub struct ClusterScaler {
    workload: Arc<dyn WorkloadApi>,
    config: ScalerConfig,
}

impl ClusterScaler {
    pub fn new(workload: Arc<dyn WorkloadApi>, config: ScalerConfig) -> Self {
        Self { workload, config }
    }

    /// Current desired replica count.
    pub async fn replicas(&self) -> Result<u32, EnvError> {
        Ok(self.workload.get().await?.spec_replicas)
    }

    /// Workload annotations (SLO constraints live here).
    pub async fn annotations(&self) -> Result<HashMap<String, String>, EnvError> {
        Ok(self.workload.get().await?.annotations)
    }

    /// Scale to `target` replicas and wait for the cluster to converge.
    ///
    /// Idempotent: re-issuing the same target converges without error.
    pub async fn scale_to(&self, target: u32) -> Result<ScaleStatus, EnvError> {
        self.workload.patch_replicas(target).await?;
        let status = self.wait_for_ready(target).await?;

        if status == ScaleStatus::Ready {
            sleep(self.config.stabilization_pause).await;
        }
        Ok(status)
    }

    /// Poll deployment status until `ready == available == target`, the
    /// desired count is mutated externally, or the timeout elapses.
    ///
    /// Transient read errors are retried within the same deadline.
    pub async fn wait_for_ready(&self, target: u32) -> Result<ScaleStatus, EnvError> {
        let deadline = Instant::now() + self.config.ready_timeout;

        while Instant::now() < deadline {
            match self.workload.get().await {
                Ok(view) => {
                    if view.spec_replicas != target {
                        warn!(
                            expected = target,
                            observed = view.spec_replicas,
                            "desired replica count mutated externally, aborting wait"
                        );
                        return match self.config.mismatch_policy {
                            MismatchPolicy::Tolerate => Ok(ScaleStatus::Interfered),
                            MismatchPolicy::Fail => Err(EnvError::Cluster(format!(
                                "replica count mutated externally: expected {target}, observed {}",
                                view.spec_replicas
                            ))),
                        };
                    }
                    if self.converged(&view, target) {
                        info!(replicas = target, "all replicas ready");
                        return Ok(ScaleStatus::Ready);
                    }
                    debug!(
                        ready = view.ready_replicas,
                        target, "waiting for replicas to become ready"
                    );
                }
                Err(e) => {
                    debug!(error = %e, "readiness check failed, retrying");
                }
            }
            sleep(self.config.poll_interval).await;
        }

        warn!(target, "timed out waiting for replicas to become ready");
        Ok(ScaleStatus::TimedOut)
    }

    fn converged(&self, view: &DeploymentView, target: u32) -> bool {
        view.ready_replicas == target && view.available_replicas == target
    }
}

#[async_trait]
impl ReadinessWaiter for ClusterScaler {
    async fn await_ready(&self, target: u32) -> bool {
        matches!(self.wait_for_ready(target).await, Ok(ScaleStatus::Ready))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Workload stub whose status converges after a fixed number of reads.
    struct ConvergingWorkload {
        target: AtomicU32,
        reads: AtomicUsize,
        ready_after: usize,
        patches: AtomicUsize,
    }

    impl ConvergingWorkload {
        fn new(initial: u32, ready_after: usize) -> Self {
            Self {
                target: AtomicU32::new(initial),
                reads: AtomicUsize::new(0),
                ready_after,
                patches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WorkloadApi for ConvergingWorkload {
        async fn get(&self) -> Result<DeploymentView, EnvError> {
            let reads = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            let target = self.target.load(Ordering::SeqCst);
            let ready = if reads >= self.ready_after { target } else { 0 };
            Ok(DeploymentView {
                spec_replicas: target,
                ready_replicas: ready,
                available_replicas: ready,
                annotations: HashMap::new(),
            })
        }

        async fn patch_replicas(&self, replicas: u32) -> Result<(), EnvError> {
            self.patches.fetch_add(1, Ordering::SeqCst);
            self.target.store(replicas, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Workload stub that reports a different desired count than requested,
    /// as if another controller had written it concurrently.
    struct HijackedWorkload;

    #[async_trait]
    impl WorkloadApi for HijackedWorkload {
        async fn get(&self) -> Result<DeploymentView, EnvError> {
            Ok(DeploymentView {
                spec_replicas: 7,
                ready_replicas: 7,
                available_replicas: 7,
                annotations: HashMap::new(),
            })
        }

        async fn patch_replicas(&self, _replicas: u32) -> Result<(), EnvError> {
            Ok(())
        }
    }

    fn fast_config() -> ScalerConfig {
        ScalerConfig {
            ready_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
            stabilization_pause: Duration::from_millis(0),
            mismatch_policy: MismatchPolicy::Tolerate,
        }
    }

    #[tokio::test]
    async fn scale_to_waits_for_convergence() {
        let workload = Arc::new(ConvergingWorkload::new(1, 3));
        let scaler = ClusterScaler::new(workload.clone(), fast_config());

        let status = scaler.scale_to(4).await.unwrap();

        assert_eq!(status, ScaleStatus::Ready);
        assert_eq!(workload.patches.load(Ordering::SeqCst), 1);
        assert_eq!(scaler.replicas().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn external_mutation_aborts_wait_early() {
        let scaler = ClusterScaler::new(Arc::new(HijackedWorkload), fast_config());

        let start = Instant::now();
        let status = scaler.scale_to(3).await.unwrap();

        assert_eq!(status, ScaleStatus::Interfered);
        // Early exit, not a full timeout worth of polling.
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn external_mutation_fails_under_fail_policy() {
        let config = ScalerConfig {
            mismatch_policy: MismatchPolicy::Fail,
            ..fast_config()
        };
        let scaler = ClusterScaler::new(Arc::new(HijackedWorkload), config);

        let result = scaler.scale_to(3).await;
        assert!(matches!(result, Err(EnvError::Cluster(_))));
    }

    #[tokio::test]
    async fn wait_times_out_without_convergence() {
        let workload = Arc::new(ConvergingWorkload::new(2, usize::MAX));
        let scaler = ClusterScaler::new(workload, fast_config());

        let status = scaler.wait_for_ready(2).await.unwrap();
        assert_eq!(status, ScaleStatus::TimedOut);
    }
}
