//! Run a bounded episode against the live cluster

use crate::{context, output, Cli};
use anyhow::Result;
use scaling_env::{Action, Decider, Environment, HttpDecider, ThresholdDecider};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct EpisodeRow {
    step: u32,
    action: &'static str,
    replicas: u32,
    reward: f64,
    terminated: bool,
    truncated: bool,
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::ScaleDown => "down",
        Action::Hold => "hold",
        Action::ScaleUp => "up",
    }
}

pub async fn run(
    cli: &Cli,
    steps: u32,
    decider_url: Option<&str>,
    fault_probability: f64,
) -> Result<()> {
    let mut env = context::environment(cli, steps, fault_probability).await?;
    let decider: Box<dyn Decider> = match decider_url {
        Some(url) => Box::new(HttpDecider::new(url)?),
        None => Box::new(ThresholdDecider::default()),
    };

    output::print_info(&format!(
        "running {steps}-step episode against {}/{}",
        cli.namespace, cli.deployment
    ));

    let (mut state, _info) = env.reset().await?;
    let mut rows = Vec::new();

    for step in 1..=steps {
        let action = decider.decide(&state).await?;
        let result = env.step(action).await;

        rows.push(EpisodeRow {
            step,
            action: action_label(action),
            replicas: result.state.replica_count(),
            reward: result.reward,
            terminated: result.terminated,
            truncated: result.truncated,
        });

        if result.terminated || result.truncated {
            break;
        }
        state = result.state;
    }

    output::print_table(&rows, cli.format);
    Ok(())
}
