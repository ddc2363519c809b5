//! Scaling environment for Kubernetes workloads
//!
//! This crate provides the core functionality for:
//! - Observing a workload's metrics and replica count as a fixed-shape state
//! - Executing scaling actions with bounded convergence waits
//! - Injecting and defusing fault experiments against the workload
//! - Scoring outcomes against service-level constraints
//! - Running the step/episode control loop that ties these together

pub mod chaos;
pub mod cluster;
pub mod decision;
pub mod env;
pub mod error;
pub mod health;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod reward;
pub mod state;

pub use decision::{Decider, HttpDecider, ThresholdDecider};
pub use env::{EnvConfig, Environment, MicroserviceEnv};
pub use error::EnvError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::ControlMetrics;
