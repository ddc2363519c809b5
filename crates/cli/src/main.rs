//! Operator CLI for the chaos-aware autoscaler
//!
//! A command-line tool for inspecting the observed workload state,
//! scaling manually, running bounded episodes, and cleaning up leftover
//! fault experiments.

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{chaos, episode, scale, status};

/// Operator CLI for the chaos-aware autoscaler
#[derive(Parser)]
#[command(name = "scalectl")]
#[command(author, version, about = "Operator CLI for the chaos-aware autoscaler", long_about = None)]
pub struct Cli {
    /// Namespace of the target workload
    #[arg(long, short, env = "SCALECTL_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Deployment name of the target workload
    #[arg(long, short, env = "SCALECTL_DEPLOYMENT", default_value = "nginx")]
    pub deployment: String,

    /// Prometheus base URL
    #[arg(
        long,
        env = "SCALECTL_PROMETHEUS_URL",
        default_value = "http://prometheus-nodeport.monitoring.svc.cluster.local:9090"
    )]
    pub prometheus_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current observation for the workload
    Status,

    /// Scale the workload to an exact replica count and wait for convergence
    Scale {
        /// Target replica count
        replicas: u32,

        /// Upper replica bound
        #[arg(long, default_value_t = 15)]
        max_replicas: u32,
    },

    /// Run a bounded episode against the live cluster
    Episode {
        /// Number of decision cycles
        #[arg(long, default_value_t = 10)]
        steps: u32,

        /// Model server predict URL; the CPU-threshold heuristic is used
        /// when unset
        #[arg(long, env = "SCALECTL_DECIDER_URL")]
        decider_url: Option<String>,

        /// Fault-injection probability for the episode
        #[arg(long, default_value_t = 0.0)]
        fault_probability: f64,
    },

    /// Fault experiment maintenance
    #[command(subcommand)]
    Chaos(ChaosCommands),
}

#[derive(Subcommand)]
pub enum ChaosCommands {
    /// Delete leftover fault experiments, including ones created by a
    /// previous run
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Status => status::run(&cli).await,
        Commands::Scale {
            replicas,
            max_replicas,
        } => scale::run(&cli, *replicas, *max_replicas).await,
        Commands::Episode {
            steps,
            decider_url,
            fault_probability,
        } => episode::run(&cli, *steps, decider_url.as_deref(), *fault_probability).await,
        Commands::Chaos(ChaosCommands::Cleanup) => chaos::run(&cli).await,
    }
}
