//! Manual scale-to with convergence wait

use crate::{context, output, Cli};
use anyhow::{bail, Result};
use scaling_env::cluster::ScaleStatus;

pub async fn run(cli: &Cli, replicas: u32, max_replicas: u32) -> Result<()> {
    if replicas < 1 || replicas > max_replicas {
        bail!("target {replicas} outside the replica bound [1, {max_replicas}]");
    }

    let scaler = context::scaler(cli).await?;
    let current = scaler.replicas().await?;
    output::print_info(&format!(
        "scaling {}/{} from {} to {} replicas",
        cli.namespace, cli.deployment, current, replicas
    ));

    match scaler.scale_to(replicas).await? {
        ScaleStatus::Ready => {
            output::print_success(&format!("all {replicas} replicas ready"));
        }
        ScaleStatus::TimedOut => {
            output::print_warning("timed out waiting for replicas to become ready");
        }
        ScaleStatus::Interfered => {
            output::print_warning("desired replica count was changed by someone else mid-wait");
        }
    }

    Ok(())
}
