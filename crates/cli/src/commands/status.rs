//! Show the current observation for the workload

use crate::{context, output, Cli};
use anyhow::Result;
use scaling_env::state::{StateBuilder, DEFAULT_MAX_MEMORY_PER_POD};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct StatusRow {
    deployment: String,
    replicas: u32,
    #[tabled(rename = "cpu %")]
    cpu_usage_percent: f64,
    #[tabled(rename = "memory (norm)")]
    memory_normalized: f64,
    #[tabled(rename = "p95 latency (ms)")]
    p95_latency_ms: f64,
    rps: f64,
}

pub async fn run(cli: &Cli) -> Result<()> {
    let scaler = context::scaler(cli).await?;
    let source = context::metrics_source(cli)?;
    let queries = context::queries(cli);

    let sample = queries.sample(&source).await;
    let replicas = scaler.replicas().await?;
    let state = StateBuilder::build(&sample, replicas, DEFAULT_MAX_MEMORY_PER_POD);

    let rows = vec![StatusRow {
        deployment: format!("{}/{}", cli.namespace, cli.deployment),
        replicas: state.replica_count(),
        cpu_usage_percent: state.cpu_usage_percent,
        memory_normalized: state.memory_normalized,
        p95_latency_ms: state.p95_latency_ms,
        rps: state.requests_per_second,
    }];
    output::print_table(&rows, cli.format);

    Ok(())
}
