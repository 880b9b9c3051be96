//! The remote side of a metrics query.
//!
//! [`MetricSource`] is the seam between the concurrent query machinery in
//! [`MetricsClient`](crate::MetricsClient) and whatever actually answers
//! queries. [`TelemetryApi`](crate::TelemetryApi) implements it over HTTP;
//! tests implement it in-process to control latency and failures.
//!
//! # Example
//!
//! ```ignore
//! struct Fixed;
//!
//! #[async_trait]
//! impl MetricSource for Fixed {
//!     fn name(&self) -> &str {
//!         "fixed"
//!     }
//!
//!     async fn post_query(&self, _query: &Query) -> Result<QueryResponse> {
//!         Ok(QueryResponse::default())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::types::{Metric, Query, QueryResponse, ResourceType};
use crate::{MetricsError, Result};

/// Something that can execute metric queries.
///
/// Implementations must be safe to call from many tasks at once: a batch
/// query issues up to `max_workers` calls concurrently against one source.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Source name for logging/telemetry.
    fn name(&self) -> &str;

    /// Execute one query. Called once per metric per batch; never retried.
    async fn post_query(&self, query: &Query) -> Result<QueryResponse>;

    /// Metrics available for a resource type, or for every resource when `None`.
    async fn available_metrics(&self, _resource_type: Option<&str>) -> Result<Vec<Metric>> {
        Err(MetricsError::NotImplemented("available_metrics"))
    }

    /// Resource types metrics are reported for.
    async fn available_resources(&self) -> Result<Vec<ResourceType>> {
        Err(MetricsError::NotImplemented("available_resources"))
    }
}
