//! Scaling controller - chaos-validated autoscaling control loop
//!
//! This binary runs the production side of the scaling environment:
//! it observes one workload, asks the configured decider for an action,
//! and applies it through the same step/reset contract the trainer uses.

use anyhow::Result;
use scaling_env::chaos::FaultInjectorConfig;
use scaling_env::health::components;
use scaling_env::{
    ControlMetrics, Decider, EnvConfig, HealthRegistry, HttpDecider, MicroserviceEnv,
    ThresholdDecider,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod run;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting scaling-controller");

    let config = config::ControllerConfig::load()?;
    info!(
        namespace = %config.namespace,
        deployment = %config.deployment,
        "Controller configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLUSTER).await;
    health_registry.register(components::METRICS).await;
    health_registry.register(components::CHAOS).await;
    health_registry.register(components::DECIDER).await;

    let metrics = ControlMetrics::new();

    let env = MicroserviceEnv::connect(
        &config.namespace,
        &config.deployment,
        &config.prometheus_url,
        EnvConfig {
            max_replicas: config.max_replicas,
            max_steps: config.max_steps,
            ..EnvConfig::default()
        },
        FaultInjectorConfig {
            probability: config.fault_probability,
            ..FaultInjectorConfig::default()
        },
    )
    .await?;

    let decider: Arc<dyn Decider> = match &config.decider_url {
        Some(url) => {
            info!(endpoint = %url, "Using model-server decider");
            Arc::new(HttpDecider::new(url)?)
        }
        None => {
            info!("No decider URL configured, using CPU-threshold heuristic");
            Arc::new(ThresholdDecider::default())
        }
    };

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));
    tokio::spawn(api::serve(config.api_port, app_state));

    health_registry.set_ready(true).await;

    tokio::select! {
        _ = run::control_loop(
            env,
            decider,
            config.poll_interval(),
            metrics,
            health_registry.clone(),
        ) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, shutting down");
        }
    }

    Ok(())
}
