//! Prometheus HTTP API metrics source

use super::MetricsSource;
use crate::error::EnvError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// `MetricsSource` over the Prometheus instant-query HTTP API.
pub struct PrometheusSource {
    client: reqwest::Client,
    base_url: String,
}

impl PrometheusSource {
    pub fn new(base_url: &str) -> Result<Self, EnvError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EnvError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn query_value(&self, expr: &str) -> Result<f64> {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", expr)])
            .send()
            .await
            .context("query request failed")?
            .error_for_status()
            .context("query returned error status")?;

        let body: serde_json::Value = response.json().await.context("malformed query response")?;
        // Instant query result: data.result[0].value == [timestamp, "scalar"]
        let scalar = body["data"]["result"][0]["value"][1]
            .as_str()
            .context("empty query result")?;
        scalar.parse().context("non-numeric query result")
    }
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn query(&self, expr: &str) -> f64 {
        match self.query_value(expr).await {
            Ok(value) => value,
            Err(e) => {
                debug!(query = expr, error = %e, "metrics query failed, defaulting to 0");
                0.0
            }
        }
    }
}
