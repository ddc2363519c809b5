//! Construction of live collaborators from CLI arguments

use crate::Cli;
use anyhow::{Context, Result};
use scaling_env::chaos::FaultInjectorConfig;
use scaling_env::cluster::{ClusterScaler, KubeWorkload, ScalerConfig};
use scaling_env::env::EnvConfig;
use scaling_env::metrics::{MetricQueries, PrometheusSource};
use scaling_env::MicroserviceEnv;
use std::sync::Arc;

pub async fn scaler(cli: &Cli) -> Result<ClusterScaler> {
    let workload = KubeWorkload::connect(&cli.namespace, &cli.deployment)
        .await
        .context("failed to connect to the cluster")?;
    Ok(ClusterScaler::new(
        Arc::new(workload),
        ScalerConfig::default(),
    ))
}

pub fn metrics_source(cli: &Cli) -> Result<PrometheusSource> {
    PrometheusSource::new(&cli.prometheus_url).context("failed to build metrics source")
}

pub fn queries(cli: &Cli) -> MetricQueries {
    MetricQueries::new(&cli.namespace, &cli.deployment)
}

pub async fn environment(
    cli: &Cli,
    max_steps: u32,
    fault_probability: f64,
) -> Result<MicroserviceEnv> {
    MicroserviceEnv::connect(
        &cli.namespace,
        &cli.deployment,
        &cli.prometheus_url,
        EnvConfig {
            max_steps,
            ..EnvConfig::default()
        },
        FaultInjectorConfig {
            probability: fault_probability,
            ..FaultInjectorConfig::default()
        },
    )
    .await
    .context("failed to build environment")
}
