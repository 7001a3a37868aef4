//! System metrics snapshot source.
//!
//! The admin dashboard's counters come from an HTTP endpoint rather than the
//! change feed. Response bodies have been wrapped differently over time, so
//! the payload is looked up under each known envelope before normalizing.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use choices_core::defaults::METRICS_ENVELOPE_PATHS;
use choices_core::{normalize_system_metrics, Error, Result, SystemMetrics};

use crate::config::RealtimeConfig;

/// Fetches a fresh metrics snapshot.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch_metrics(&self) -> Result<SystemMetrics>;
}

/// Find the metrics object inside a response body.
///
/// Tries `data.metrics`, then `data`, then `metrics`; the first one that is
/// a JSON object wins.
pub fn unwrap_metrics_envelope(body: &Value) -> Option<&Value> {
    METRICS_ENVELOPE_PATHS
        .iter()
        .filter_map(|path| body.pointer(path))
        .find(|candidate| candidate.is_object())
}

/// [`MetricsSource`] backed by the Choices API.
#[derive(Debug, Clone)]
pub struct HttpMetricsSource {
    client: reqwest::Client,
    url: String,
}

impl HttpMetricsSource {
    pub fn new(config: &RealtimeConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.metrics_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.metrics_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_metrics(&self) -> Result<SystemMetrics> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Request(format!(
                "metrics endpoint returned {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        let metrics = unwrap_metrics_envelope(&body).ok_or_else(|| {
            Error::InvalidPayload("response has no metrics object".to_string())
        })?;

        debug!("Fetched metrics snapshot");
        Ok(normalize_system_metrics(metrics))
    }
}
