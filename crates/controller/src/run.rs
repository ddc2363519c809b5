//! Production control loop
//!
//! Reuses the environment contract online: observe, ask the decider for an
//! action, step, and reset whenever an episode ends. A failed decision
//! degrades to a hold; a failed reset retries on the next cycle. The loop
//! itself never exits.

use scaling_env::health::components;
use scaling_env::{
    Action, ControlMetrics, Decider, Environment, HealthRegistry, MicroserviceEnv, State,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

pub async fn control_loop(
    mut env: MicroserviceEnv,
    decider: Arc<dyn Decider>,
    poll_interval: Duration,
    metrics: ControlMetrics,
    health: HealthRegistry,
) {
    loop {
        let mut state = start_episode(&mut env, &metrics, &health, poll_interval).await;

        loop {
            let action = match decider.decide(&state).await {
                Ok(action) => {
                    health.set_healthy(components::DECIDER).await;
                    action
                }
                Err(e) => {
                    warn!(error = %e, "decision failed, holding replica count");
                    health.set_degraded(components::DECIDER, e.to_string()).await;
                    Action::Hold
                }
            };

            let started = Instant::now();
            let result = env.step(action).await;
            metrics.observe_step(&result);
            if action != Action::Hold && !result.info.invalid_action {
                metrics.observe_scale_duration(started.elapsed().as_secs_f64());
            }

            info!(
                action = action.index(),
                reward = result.reward,
                replicas = result.state.replica_count(),
                terminated = result.terminated,
                truncated = result.truncated,
                "cycle complete"
            );

            if result.terminated || result.truncated {
                warn!("episode ended, resetting");
                break;
            }

            state = result.state;
            sleep(poll_interval).await;
        }
    }
}

/// Reset until it succeeds; the cluster API being down must not kill the
/// controller.
async fn start_episode(
    env: &mut MicroserviceEnv,
    metrics: &ControlMetrics,
    health: &HealthRegistry,
    poll_interval: Duration,
) -> State {
    loop {
        match env.reset().await {
            Ok((state, _info)) => {
                metrics.inc_episode_resets();
                health.set_healthy(components::CLUSTER).await;
                return state;
            }
            Err(e) => {
                error!(error = %e, "reset failed, retrying");
                health.set_unhealthy(components::CLUSTER, e.to_string()).await;
                sleep(poll_interval).await;
            }
        }
    }
}
