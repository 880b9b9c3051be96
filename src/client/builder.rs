//! Builder for configuring clients

use std::sync::Arc;
use std::time::Duration;

use super::{ClientLimits, MetricsClient};
use crate::api::{DEFAULT_BASE_URL, DEFAULT_DATASET, DEFAULT_REQUEST_TIMEOUT, TelemetryApi};
use crate::cache::{DEFAULT_DESCRIPTOR_TTL, DescriptorCache};
use crate::traits::MetricSource;
use crate::{MetricsError, Result};

/// Builder for [`MetricsClient`].
///
/// Either supply credentials (the client talks to the Metrics API over
/// HTTP) or a custom [`MetricSource`].
pub struct MetricsClientBuilder {
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: String,
    dataset: String,
    request_timeout: Duration,
    descriptor_ttl: Duration,
    limits: ClientLimits,
    source: Option<Arc<dyn MetricSource>>,
}

impl MetricsClientBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            descriptor_ttl: DEFAULT_DESCRIPTOR_TTL,
            limits: ClientLimits::default(),
            source: None,
        }
    }

    /// Cloud API key and secret used for basic auth.
    pub fn credentials(mut self, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.api_secret = Some(api_secret.into());
        self
    }

    /// Override the API base URL (default: the public Metrics API).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Dataset to query (default: `cloud`).
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Use a custom source instead of the HTTP API. Credentials are ignored.
    pub fn source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Ceiling on concurrent queries per batch (default: 10).
    pub fn max_workers(mut self, n: usize) -> Self {
        self.limits.max_workers = n;
        self
    }

    /// Points requested per query (default: 1000). `None` leaves it to the API.
    pub fn page_limit(mut self, limit: Option<u32>) -> Self {
        self.limits.page_limit = limit;
        self
    }

    /// Deadline used by `query_metrics_default` (default: 60s).
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.limits.default_timeout = timeout;
        self
    }

    /// Per-request HTTP timeout (default: 30s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// How long descriptor listings are cached (default: 15 minutes).
    pub fn descriptor_ttl(mut self, ttl: Duration) -> Self {
        self.descriptor_ttl = ttl;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<MetricsClient> {
        if self.limits.page_limit == Some(0) {
            return Err(MetricsError::Configuration(
                "page limit must be positive".into(),
            ));
        }

        let source: Arc<dyn MetricSource> = match self.source {
            Some(source) => source,
            None => {
                let (Some(key), Some(secret)) = (self.api_key, self.api_secret) else {
                    return Err(MetricsError::Configuration(
                        "no API credentials configured".into(),
                    ));
                };
                let http = reqwest::Client::builder()
                    .timeout(self.request_timeout)
                    .build()
                    .map_err(|e| {
                        MetricsError::Configuration(format!("failed to build HTTP client: {e}"))
                    })?;
                Arc::new(
                    TelemetryApi::with_http_client(key, secret, self.base_url, http)
                        .dataset(self.dataset),
                )
            }
        };

        Ok(MetricsClient::new(
            source,
            self.limits,
            DescriptorCache::new(self.descriptor_ttl),
        ))
    }
}

impl Default for MetricsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
