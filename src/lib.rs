//! ccloud-metrics - Concurrent client for the Confluent Cloud Metrics API
//!
//! This crate queries many metrics for one resource in parallel, bounding
//! the number of in-flight requests and returning whatever has arrived when
//! a caller-supplied deadline elapses. Single-metric queries are available
//! too, and the [`MetricSource`] trait lets callers swap the HTTP transport
//! for their own.
//!
//! # Batch Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ccloud_metrics::{Granularity, Interval, Metric, MetricsClient, QueryScope, Resource};
//!
//! #[tokio::main]
//! async fn main() -> ccloud_metrics::Result<()> {
//!     let client = MetricsClient::builder()
//!         .credentials("API_KEY", "API_SECRET")
//!         .build()?;
//!
//!     let scope = QueryScope::new(
//!         Resource::KAFKA,
//!         "lkc-abc123",
//!         Granularity::FiveMinutes,
//!         Interval::last(Duration::from_secs(3600))?,
//!     );
//!
//!     let metrics = [
//!         Metric::new("io.confluent.kafka.server/received_bytes"),
//!         Metric::new("io.confluent.kafka.server/sent_bytes"),
//!         Metric::new("io.confluent.kafka.server/request_count"),
//!     ];
//!     let batch = client
//!         .query_metrics(&scope, Duration::from_secs(5), &metrics)
//!         .await;
//!
//!     println!("{} ok, {} failed", batch.results.len(), batch.errors.len());
//!     for name in batch.missing(&metrics) {
//!         println!("{name}: no answer before the deadline");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Single Metric Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ccloud_metrics::{Granularity, Interval, Metric, MetricLabel, MetricsClient, QueryScope, Resource};
//!
//! # async fn example(client: MetricsClient) -> ccloud_metrics::Result<()> {
//! let scope = QueryScope::new(
//!     Resource::KAFKA,
//!     "lkc-abc123",
//!     Granularity::OneHour,
//!     Interval::last(Duration::from_secs(24 * 3600))?,
//! );
//! let points = client
//!     .query_metric_and_label(
//!         &scope,
//!         &Metric::new("io.confluent.kafka.server/received_bytes"),
//!         &MetricLabel::TOPIC,
//!         "orders",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod client;
#[cfg(feature = "cli")]
pub mod config;
pub mod dispatch;
pub mod error;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use api::TelemetryApi;
pub use client::{ClientLimits, MetricsClient, MetricsClientBuilder};
pub use dispatch::{BatchResult, MetricStatus};
pub use error::{MetricsError, Result};
pub use traits::MetricSource;

// Re-export all types
pub use types::{
    Aggregation, AggregationKind, CompoundOp, FieldOp, Filter, Granularity, Interval,
    LabelDescriptor, Metric, MetricLabel, Query, QueryResponse, QueryScope, Resource,
    ResourceType, Telemetry,
};
