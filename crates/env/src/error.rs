//! Error taxonomy for the scaling environment
//!
//! Nothing in this crate lets an error escape the control loop boundary:
//! every variant here is mapped to a penalty step result before a caller
//! sees it, except during reset where no observation exists yet.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    /// The cluster API rejected or failed an operation.
    #[error("cluster API error: {0}")]
    Cluster(String),

    /// The decision boundary failed to produce an action.
    #[error("decision error: {0}")]
    Decision(String),

    /// A wire-format action index outside {0, 1, 2}.
    #[error("invalid action index: {0}")]
    InvalidActionIndex(i64),

    /// Construction-time configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EnvError {
    pub fn cluster(err: impl std::fmt::Display) -> Self {
        EnvError::Cluster(err.to_string())
    }
}
