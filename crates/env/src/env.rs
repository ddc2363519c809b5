//! Step/episode control loop
//!
//! One decision cycle: observe, validate the action, execute the scale,
//! defuse and maybe inject faults, re-observe, score, emit. Every failure
//! mode below this loop resolves to a well-formed penalty result; callers
//! always receive a step result, never an error.

use crate::chaos::{FaultInjector, FaultInjectorConfig, InjectOutcome, KubeChaos};
use crate::cluster::{ClusterScaler, KubeWorkload, ScalerConfig};
use crate::error::EnvError;
use crate::metrics::{MetricQueries, MetricsSource, PrometheusSource};
use crate::models::{Action, SloConstraints, State, StepInfo, StepResult};
use crate::reward::RewardEvaluator;
use crate::state::{StateBuilder, DEFAULT_MAX_MEMORY_PER_POD};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Environment configuration, fixed per deployment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Upper replica bound; the lower bound is always 1.
    pub max_replicas: u32,
    /// Episode length before truncation.
    pub max_steps: u32,
    /// Stabilization interval used by reset.
    pub action_interval: Duration,
    /// Per-pod memory allocation for normalization.
    pub max_memory_per_pod: u64,
    pub invalid_action_penalty: f64,
    pub cluster_error_penalty: f64,
    pub cascade_penalty: f64,
    pub unexpected_penalty: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_replicas: 15,
            max_steps: 200,
            action_interval: Duration::from_secs(30),
            max_memory_per_pod: DEFAULT_MAX_MEMORY_PER_POD,
            invalid_action_penalty: -1.0,
            cluster_error_penalty: -50.0,
            cascade_penalty: -50.0,
            unexpected_penalty: -10.0,
        }
    }
}

/// The environment contract: an episodic step/reset loop over one workload.
#[async_trait]
pub trait Environment: Send {
    /// Start a new episode and return its first observation.
    async fn reset(&mut self) -> Result<(State, StepInfo), EnvError>;

    /// Run one decision cycle. Infallible by contract.
    async fn step(&mut self, action: Action) -> StepResult;
}

/// Concrete environment over one namespace/workload pair.
pub struct MicroserviceEnv {
    scaler: ClusterScaler,
    metrics: Arc<dyn MetricsSource>,
    queries: MetricQueries,
    injector: FaultInjector,
    evaluator: RewardEvaluator,
    config: EnvConfig,
    current_step: u32,
    pod_history: Vec<(u32, u32)>,
}

impl MicroserviceEnv {
    pub fn builder() -> MicroserviceEnvBuilder {
        MicroserviceEnvBuilder::new()
    }

    /// Connect to a live cluster and metrics backend.
    pub async fn connect(
        namespace: &str,
        deployment: &str,
        prometheus_url: &str,
        config: EnvConfig,
        injector_config: FaultInjectorConfig,
    ) -> Result<Self, EnvError> {
        let client = kube::Client::try_default()
            .await
            .map_err(EnvError::cluster)?;
        let workload = Arc::new(KubeWorkload::new(client.clone(), namespace, deployment));
        let chaos = Arc::new(KubeChaos::new(client, namespace));

        Ok(Self::builder()
            .scaler(ClusterScaler::new(workload, ScalerConfig::default()))
            .metrics(Arc::new(PrometheusSource::new(prometheus_url)?))
            .queries(MetricQueries::new(namespace, deployment))
            .injector(FaultInjector::new(chaos, namespace, deployment, injector_config))
            .config(config)
            .build()?)
    }

    /// Steps taken in the current episode.
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Per-step replica counts recorded this episode.
    pub fn pod_history(&self) -> &[(u32, u32)] {
        &self.pod_history
    }

    pub fn fault_injector_mut(&mut self) -> &mut FaultInjector {
        &mut self.injector
    }

    /// Build the current observation. Infallible: a failed replica read
    /// degrades to zero, as metric failures already do upstream.
    pub async fn observe(&self) -> State {
        let sample = self.queries.sample(self.metrics.as_ref()).await;
        let replicas = match self.scaler.replicas().await {
            Ok(replicas) => replicas,
            Err(e) => {
                warn!(error = %e, "replica read failed during observation, degrading to 0");
                0
            }
        };
        StateBuilder::build(&sample, replicas, self.config.max_memory_per_pod)
    }

    async fn run_cycle(&mut self, action: Action) -> Result<StepResult, EnvError> {
        let state = self.observe().await;
        let replicas = state.replica_count();
        let delta = action.replica_delta();
        let target = replicas as i64 + delta;

        // Validation happens before any cluster mutation.
        if delta != 0 && (target < 1 || target > self.config.max_replicas as i64) {
            debug!(replicas, ?action, "rejecting out-of-bounds action");
            let info = StepInfo {
                action: Some(action.index()),
                invalid_action: true,
                ..StepInfo::from_state(&state)
            };
            return Ok(StepResult {
                state,
                reward: self.config.invalid_action_penalty,
                terminated: true,
                truncated: false,
                info,
            });
        }

        if delta != 0 {
            let status = self.scaler.scale_to(target as u32).await?;
            info!(replicas = target, ?status, "scaled workload");
        } else {
            debug!(replicas, "holding replica count");
        }

        // Defuse leftovers from a previous cycle first, then maybe perturb.
        self.injector.cleanup().await;
        if self.injector.inject_random(&self.scaler).await == InjectOutcome::CascadingFault {
            let state = self.observe().await;
            let info = StepInfo {
                action: Some(action.index()),
                error: Some("all pods killed".to_string()),
                ..StepInfo::from_state(&state)
            };
            return Ok(StepResult {
                state,
                reward: self.config.cascade_penalty,
                terminated: true,
                truncated: false,
                info,
            });
        }

        let new_state = self.observe().await;
        if delta != 0 {
            debug!(
                from = state.p95_latency_ms,
                to = new_state.p95_latency_ms,
                "latency across scale"
            );
        }

        let annotations = self.scaler.annotations().await?;
        let constraints = SloConstraints::from_annotations(&annotations);
        let (reward, terminated) =
            self.evaluator
                .score(&new_state, &constraints, self.config.max_replicas);

        self.pod_history.push((self.current_step, new_state.replica_count()));
        let truncated = self.current_step >= self.config.max_steps;

        let info = StepInfo {
            action: Some(action.index()),
            reward: Some(reward),
            ..StepInfo::from_state(&new_state)
        };
        Ok(StepResult {
            state: new_state,
            reward,
            terminated,
            truncated,
            info,
        })
    }
}

#[async_trait]
impl Environment for MicroserviceEnv {
    async fn reset(&mut self) -> Result<(State, StepInfo), EnvError> {
        info!("resetting environment");
        sleep(self.config.action_interval).await;

        // Clear fault state and self-heal any replica drift before the
        // first observation of the new episode.
        self.injector.cleanup().await;
        let replicas = self.scaler.replicas().await?;
        self.scaler.scale_to(replicas).await?;
        sleep(self.config.action_interval).await;

        self.current_step = 0;
        self.pod_history.clear();
        Ok((self.observe().await, StepInfo::default()))
    }

    async fn step(&mut self, action: Action) -> StepResult {
        self.current_step += 1;

        match self.run_cycle(action).await {
            Ok(result) => {
                debug!(
                    step = self.current_step,
                    reward = result.reward,
                    terminated = result.terminated,
                    truncated = result.truncated,
                    "cycle complete"
                );
                result
            }
            Err(EnvError::Cluster(reason)) => {
                warn!(reason = %reason, "cluster error, ending episode");
                let state = self.observe().await;
                let info = StepInfo {
                    action: Some(action.index()),
                    error: Some(reason),
                    ..StepInfo::from_state(&state)
                };
                StepResult {
                    state,
                    reward: self.config.cluster_error_penalty,
                    terminated: true,
                    truncated: false,
                    info,
                }
            }
            Err(e) => {
                warn!(error = %e, "unexpected error in cycle, ending episode");
                let state = self.observe().await;
                let info = StepInfo {
                    action: Some(action.index()),
                    error: Some(e.to_string()),
                    unexpected_error: true,
                    ..StepInfo::from_state(&state)
                };
                StepResult {
                    state,
                    reward: self.config.unexpected_penalty,
                    terminated: true,
                    truncated: false,
                    info,
                }
            }
        }
    }
}

/// Builder wiring the environment's collaborators together.
pub struct MicroserviceEnvBuilder {
    scaler: Option<ClusterScaler>,
    metrics: Option<Arc<dyn MetricsSource>>,
    queries: Option<MetricQueries>,
    injector: Option<FaultInjector>,
    evaluator: RewardEvaluator,
    config: EnvConfig,
}

impl MicroserviceEnvBuilder {
    pub fn new() -> Self {
        Self {
            scaler: None,
            metrics: None,
            queries: None,
            injector: None,
            evaluator: RewardEvaluator::default(),
            config: EnvConfig::default(),
        }
    }

    pub fn scaler(mut self, scaler: ClusterScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSource>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn queries(mut self, queries: MetricQueries) -> Self {
        self.queries = Some(queries);
        self
    }

    pub fn injector(mut self, injector: FaultInjector) -> Self {
        self.injector = Some(injector);
        self
    }

    pub fn evaluator(mut self, evaluator: RewardEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(mut self, config: EnvConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<MicroserviceEnv, EnvError> {
        let missing = |what: &str| EnvError::Config(format!("{what} is required"));
        Ok(MicroserviceEnv {
            scaler: self.scaler.ok_or_else(|| missing("scaler"))?,
            metrics: self.metrics.ok_or_else(|| missing("metrics source"))?,
            queries: self.queries.ok_or_else(|| missing("metric queries"))?,
            injector: self.injector.ok_or_else(|| missing("fault injector"))?,
            evaluator: self.evaluator,
            config: self.config,
            current_step: 0,
            pod_history: Vec::new(),
        })
    }
}

impl Default for MicroserviceEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
