//! Realtime configuration.

use std::time::Duration;

use choices_core::defaults::{API_BASE_URL, DELIVERY_BUFFER, METRICS_PATH, METRICS_TIMEOUT_SECS};
use choices_core::{Error, Result};

/// Environment variable for the API base URL.
pub const ENV_API_BASE_URL: &str = "CHOICES_API_BASE_URL";
/// Environment variable for the metrics endpoint path.
pub const ENV_METRICS_PATH: &str = "CHOICES_METRICS_PATH";
/// Environment variable for the metrics HTTP timeout, in seconds.
pub const ENV_METRICS_TIMEOUT_SECS: &str = "CHOICES_METRICS_TIMEOUT_SECS";
/// Environment variable for the periodic metrics refresh interval, in ms.
pub const ENV_METRICS_POLL_INTERVAL_MS: &str = "CHOICES_METRICS_POLL_INTERVAL_MS";
/// Environment variable that forces headless (no network) operation.
pub const ENV_REALTIME_HEADLESS: &str = "CHOICES_REALTIME_HEADLESS";
/// Environment variable for the per-subscription delivery buffer.
pub const ENV_REALTIME_BUFFER: &str = "CHOICES_REALTIME_BUFFER";

/// Where the subscription manager is running.
///
/// Headless contexts (server-side rendering, batch jobs) never open channels
/// or fetch metrics; subscribing there yields an id and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    #[default]
    Interactive,
    Headless,
}

/// Configuration for the subscription manager and metrics source.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Base URL of the Choices API.
    pub api_base_url: String,
    /// Path of the metrics snapshot endpoint.
    pub metrics_path: String,
    /// Timeout for one metrics fetch.
    pub metrics_timeout: Duration,
    /// Periodic refresh for admin subscriptions. `None` disables polling.
    pub metrics_poll_interval: Option<Duration>,
    pub execution_context: ExecutionContext,
    /// Buffered changes per subscription before the transport waits.
    pub delivery_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            metrics_path: METRICS_PATH.to_string(),
            metrics_timeout: Duration::from_secs(METRICS_TIMEOUT_SECS),
            metrics_poll_interval: None,
            execution_context: ExecutionContext::Interactive,
            delivery_buffer: DELIVERY_BUFFER,
        }
    }
}

impl RealtimeConfig {
    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_env()
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CHOICES_API_BASE_URL` | `http://localhost:3000` | API base URL |
    /// | `CHOICES_METRICS_PATH` | `/api/admin/system-metrics` | Metrics endpoint path |
    /// | `CHOICES_METRICS_TIMEOUT_SECS` | `10` | Metrics fetch timeout |
    /// | `CHOICES_METRICS_POLL_INTERVAL_MS` | `0` | Periodic refresh (0 = off) |
    /// | `CHOICES_REALTIME_HEADLESS` | `false` | Skip all network setup |
    /// | `CHOICES_REALTIME_BUFFER` | `256` | Delivery buffer per subscription |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base_url = std::env::var(ENV_API_BASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.api_base_url);

        let metrics_path = std::env::var(ENV_METRICS_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.metrics_path);

        let metrics_timeout = std::env::var(ENV_METRICS_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.metrics_timeout);

        let metrics_poll_interval = std::env::var(ENV_METRICS_POLL_INTERVAL_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let headless = std::env::var(ENV_REALTIME_HEADLESS)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let delivery_buffer = std::env::var(ENV_REALTIME_BUFFER)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.delivery_buffer)
            .max(1);

        Self {
            api_base_url,
            metrics_path,
            metrics_timeout,
            metrics_poll_interval,
            execution_context: if headless {
                ExecutionContext::Headless
            } else {
                ExecutionContext::Interactive
            },
            delivery_buffer,
        }
    }

    /// Set the API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the metrics endpoint path.
    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    pub fn with_metrics_timeout(mut self, timeout: Duration) -> Self {
        self.metrics_timeout = timeout;
        self
    }

    /// Enable periodic metrics refresh for admin subscriptions.
    pub fn with_metrics_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.metrics_poll_interval = interval;
        self
    }

    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.execution_context = context;
        self
    }

    pub fn with_delivery_buffer(mut self, buffer: usize) -> Self {
        self.delivery_buffer = buffer;
        self
    }

    pub fn is_headless(&self) -> bool {
        self.execution_context == ExecutionContext::Headless
    }

    /// Full URL of the metrics snapshot endpoint.
    pub fn metrics_url(&self) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        if self.metrics_path.starts_with('/') {
            format!("{}{}", base, self.metrics_path)
        } else {
            format!("{}/{}", base, self.metrics_path)
        }
    }

    /// Check the values a manager or HTTP source depends on.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(Error::Config("api_base_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL, got {}",
                url
            )));
        }
        if self.delivery_buffer == 0 {
            return Err(Error::Config("delivery_buffer must be at least 1".to_string()));
        }
        if self.metrics_timeout.is_zero() {
            return Err(Error::Config("metrics_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}
