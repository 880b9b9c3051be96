//! Confluent Cloud Metrics API client.
//!
//! See: <https://api.telemetry.confluent.cloud/docs>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{Level, debug};

use crate::traits::MetricSource;
use crate::types::{DataEnvelope, Metric, Query, QueryResponse, ResourceType};
use crate::{MetricsError, Result};

/// Default base URL for the Metrics API
pub const DEFAULT_BASE_URL: &str = "https://api.telemetry.confluent.cloud";

/// Default dataset queried under `/v2/metrics/{dataset}`.
pub const DEFAULT_DATASET: &str = "cloud";

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Metrics API.
///
/// Authenticates with a Cloud API key and secret (HTTP basic auth).
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct TelemetryApi {
    api_key: String,
    api_secret: String,
    http: Client,
    base_url: String,
    dataset: String,
}

impl TelemetryApi {
    /// Create a client against the public Metrics API.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, api_secret, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MetricsError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(api_key, api_secret, base_url, http))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dataset: DEFAULT_DATASET.to_string(),
        }
    }

    /// Query a dataset other than `cloud`.
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/metrics/{}/{}", self.base_url, self.dataset, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.api_key, Some(&self.api_secret))
    }

    /// Execute a metrics query.
    ///
    /// The query is validated locally first; an invalid query never reaches
    /// the network.
    pub async fn query(&self, query: &Query) -> Result<QueryResponse> {
        query.validate()?;
        let url = self.url("query");

        let response = self
            .authed(self.http.post(&url))
            .json(query)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: QueryResponse = response.json().await?;

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                url = %url,
                query = %serde_json::to_string(query).unwrap_or_default(),
                points = body.data.len(),
                "query response"
            );
        }

        Ok(body)
    }

    /// List metric descriptors, optionally restricted to one resource type.
    pub async fn metric_descriptors(&self, resource_type: Option<&str>) -> Result<Vec<Metric>> {
        let mut request = self.http.get(self.url("descriptors/metrics"));
        if let Some(resource_type) = resource_type {
            request = request.query(&[("resource_type", resource_type)]);
        }
        self.get_data(request).await
    }

    /// List resource type descriptors.
    pub async fn resource_descriptors(&self) -> Result<Vec<ResourceType>> {
        self.get_data(self.http.get(self.url("descriptors/resources")))
            .await
    }

    async fn get_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>> {
        let response = self.authed(request).send().await?;
        let response = check_status(response).await?;
        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

/// Map non-success statuses to errors, consuming the body for the message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 | 403 => Err(MetricsError::AuthenticationFailed),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(MetricsError::RateLimited { retry_after })
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(MetricsError::Api {
                status: code,
                message: error_message(&body).unwrap_or_else(|| format!("Metrics API error: {status}")),
            })
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Pull the first `detail` (or `title`) out of an API error body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .errors
        .into_iter()
        .find_map(|e| e.detail.or(e.title))
        .filter(|m| !m.is_empty())
}

// ============================================================================
// MetricSource implementation
// ============================================================================

#[async_trait]
impl MetricSource for TelemetryApi {
    fn name(&self) -> &str {
        "confluent"
    }

    async fn post_query(&self, query: &Query) -> Result<QueryResponse> {
        TelemetryApi::query(self, query).await
    }

    async fn available_metrics(&self, resource_type: Option<&str>) -> Result<Vec<Metric>> {
        self.metric_descriptors(resource_type).await
    }

    async fn available_resources(&self) -> Result<Vec<ResourceType>> {
        self.resource_descriptors().await
    }
}
