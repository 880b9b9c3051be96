//! Telemetry metric name constants.
//!
//! These describe the client itself (how many queries it issued, how long
//! they took), not the Confluent metrics it fetches. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `ccloud_metrics_`. Counters end in
//! `_total`, histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `source`: name of the [`MetricSource`](crate::MetricSource) (e.g. "confluent")
//! - `status`: outcome: "ok" or "error" for queries; "complete",
//!   "timed_out" or "incomplete" for batches

/// Total remote queries issued.
///
/// Labels: `source`, `status` ("ok" | "error").
pub const QUERIES_TOTAL: &str = "ccloud_metrics_queries_total";

/// Remote query duration in seconds.
///
/// Labels: `source`.
pub const QUERY_DURATION_SECONDS: &str = "ccloud_metrics_query_duration_seconds";

/// Total batches aggregated by `query_metrics`.
///
/// Labels: `status` ("complete" | "timed_out" | "incomplete").
pub const BATCHES_TOTAL: &str = "ccloud_metrics_batches_total";

/// Metrics that had no outcome when their batch returned, either because
/// the deadline fired or because every worker exited early.
pub const BATCH_INCOMPLETE_TOTAL: &str = "ccloud_metrics_batch_incomplete_total";

/// Descriptor cache hits.
///
/// Labels: `kind` ("metrics" | "resources").
pub const DESCRIPTOR_CACHE_HITS_TOTAL: &str = "ccloud_metrics_descriptor_cache_hits_total";

/// Descriptor cache misses.
///
/// Labels: `kind` ("metrics" | "resources").
pub const DESCRIPTOR_CACHE_MISSES_TOTAL: &str = "ccloud_metrics_descriptor_cache_misses_total";
