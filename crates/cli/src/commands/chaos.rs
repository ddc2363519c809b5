//! Fault experiment maintenance

use crate::{output, Cli};
use anyhow::{Context, Result};
use scaling_env::chaos::{FaultInjector, FaultInjectorConfig, KubeChaos};
use std::sync::Arc;

pub async fn run(cli: &Cli) -> Result<()> {
    let chaos = KubeChaos::connect(&cli.namespace)
        .await
        .context("failed to connect to the cluster")?;
    let mut injector = FaultInjector::new(
        Arc::new(chaos),
        &cli.namespace,
        &cli.deployment,
        FaultInjectorConfig::default(),
    );

    output::print_info(&format!(
        "sweeping fault experiments in namespace {}",
        cli.namespace
    ));
    injector.cleanup_all().await;
    output::print_success("fault experiments cleaned up");

    Ok(())
}
