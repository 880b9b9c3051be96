//! The query facade.
//!
//! [`MetricsClient`] owns a [`MetricSource`] plus the limits that shape a
//! batch (worker ceiling, page limit, default deadline). It is built once
//! and shared; nothing about one query leaks into the next.

mod builder;

pub use builder::MetricsClientBuilder;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::Result;
use crate::cache::DescriptorCache;
use crate::dispatch::{self, BatchResult, Dispatch};
use crate::traits::MetricSource;
use crate::types::{Metric, MetricLabel, Query, QueryScope, ResourceType, Telemetry};

/// Default ceiling on concurrent queries per batch.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Default maximum number of points requested per query.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Default deadline for [`MetricsClient::query_metrics_default`].
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Limits applied to every query issued by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLimits {
    /// Ceiling on concurrent queries per batch. Values below 1 behave as 1.
    pub max_workers: usize,
    /// `limit` sent with each query, `None` to use the API default.
    pub page_limit: Option<u32>,
    /// Deadline used by [`MetricsClient::query_metrics_default`].
    pub default_timeout: Duration,
}

impl Default for ClientLimits {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            page_limit: Some(DEFAULT_PAGE_LIMIT),
            default_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }
}

/// Client for querying metrics, one at a time or in concurrent batches.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use ccloud_metrics::{Granularity, Interval, Metric, MetricsClient, QueryScope, Resource};
///
/// # async fn example() -> ccloud_metrics::Result<()> {
/// let client = MetricsClient::builder()
///     .credentials("API_KEY", "API_SECRET")
///     .max_workers(4)
///     .build()?;
///
/// let scope = QueryScope::new(
///     Resource::KAFKA,
///     "lkc-abc123",
///     Granularity::OneHour,
///     Interval::last(Duration::from_secs(6 * 3600))?,
/// );
/// let batch = client
///     .query_metrics(
///         &scope,
///         Duration::from_secs(10),
///         &[
///             Metric::new("io.confluent.kafka.server/received_bytes"),
///             Metric::new("io.confluent.kafka.server/sent_bytes"),
///         ],
///     )
///     .await;
///
/// for (metric, points) in &batch.results {
///     println!("{metric}: {} points", points.len());
/// }
/// for (metric, error) in &batch.errors {
///     eprintln!("{metric}: {error}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MetricsClient {
    source: Arc<dyn MetricSource>,
    limits: ClientLimits,
    descriptors: DescriptorCache,
}

impl MetricsClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> MetricsClientBuilder {
        MetricsClientBuilder::new()
    }

    /// Wrap an arbitrary source with default limits.
    pub fn with_source(source: Arc<dyn MetricSource>) -> Self {
        Self::new(source, ClientLimits::default(), DescriptorCache::default())
    }

    pub(crate) fn new(
        source: Arc<dyn MetricSource>,
        limits: ClientLimits,
        descriptors: DescriptorCache,
    ) -> Self {
        Self {
            source,
            limits,
            descriptors,
        }
    }

    pub fn limits(&self) -> &ClientLimits {
        &self.limits
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// All points for one metric in the scope's window, summed per bucket.
    pub async fn query_metric(&self, scope: &QueryScope, metric: &Metric) -> Result<Vec<Telemetry>> {
        let query = Query::for_metric(scope, metric, self.limits.page_limit);
        dispatch::fetch(self.source.as_ref(), query, &metric.name).await
    }

    /// Like [`query_metric`](Self::query_metric), restricted to points where
    /// `label == value` and grouped by resource and then by `label`.
    pub async fn query_metric_and_label(
        &self,
        scope: &QueryScope,
        metric: &Metric,
        label: &MetricLabel,
        value: &str,
    ) -> Result<Vec<Telemetry>> {
        let query =
            Query::for_metric_and_label(scope, metric, label, value, self.limits.page_limit);
        dispatch::fetch(self.source.as_ref(), query, &metric.name).await
    }

    /// Query many metrics concurrently, waiting at most `timeout`.
    ///
    /// At most `max(1, min(metrics.len(), max_workers))` queries run at once.
    /// Each metric ends up in `results`, in `errors`, or (if it had not
    /// finished when `timeout` elapsed) in neither. Failures never affect
    /// other metrics and are not retried. Queries still running at the
    /// deadline are not cancelled; their results are discarded.
    #[instrument(skip_all, fields(resource_id = %scope.resource_id, metrics = metrics.len()))]
    pub async fn query_metrics(
        &self,
        scope: &QueryScope,
        timeout: Duration,
        metrics: &[Metric],
    ) -> BatchResult {
        if metrics.is_empty() {
            debug!("empty batch");
            return BatchResult::default();
        }

        let dispatch = Dispatch {
            source: self.source.clone(),
            scope: scope.clone(),
            page_limit: self.limits.page_limit,
        };
        dispatch::run_batch(dispatch, metrics, self.limits.max_workers, timeout).await
    }

    /// [`query_metrics`](Self::query_metrics) with the client's default timeout.
    pub async fn query_metrics_default(&self, scope: &QueryScope, metrics: &[Metric]) -> BatchResult {
        self.query_metrics(scope, self.limits.default_timeout, metrics)
            .await
    }

    /// Metrics available for a resource type (`"kafka"`, ...), or all metrics.
    pub async fn available_metrics(&self, resource_type: Option<&str>) -> Result<Vec<Metric>> {
        if let Some(cached) = self.descriptors.metrics(resource_type).await {
            return Ok(cached);
        }
        let metrics = self.source.available_metrics(resource_type).await?;
        self.descriptors
            .insert_metrics(resource_type, metrics.clone())
            .await;
        Ok(metrics)
    }

    /// Resource types the API reports metrics for.
    pub async fn available_resources(&self) -> Result<Vec<ResourceType>> {
        if let Some(cached) = self.descriptors.resources().await {
            return Ok(cached);
        }
        let resources = self.source.available_resources().await?;
        self.descriptors.insert_resources(resources.clone()).await;
        Ok(resources)
    }
}
