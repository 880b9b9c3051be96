//! Batch and single-metric query behaviour against an in-process source.
//!
//! Most tests run with tokio's clock paused so latencies and deadlines are
//! exact and the suite stays fast.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;

use ccloud_metrics::{
    Granularity, Interval, Metric, MetricLabel, MetricStatus, MetricsClient, MetricsError,
    MetricSource, Query, QueryResponse, QueryScope, Resource, Result, Telemetry,
};

// ============================================================================
// Scripted source
// ============================================================================

/// Answers every query after a per-metric delay, failing the metrics it is
/// told to fail, and records how it was called.
#[derive(Default)]
struct ScriptedSource {
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    failures: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    queries: Mutex<Vec<Query>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self::default()
    }

    fn delay(mut self, metric: &str, delay: Duration) -> Self {
        self.delays.insert(metric.to_string(), delay);
        self
    }

    fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    fn fail(mut self, metric: &str) -> Self {
        self.failures.insert(metric.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn recorded(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn post_query(&self, query: &Query) -> Result<QueryResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let metric = query.metric_name().unwrap_or_default().to_string();
        let delay = self
            .delays
            .get(&metric)
            .copied()
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(&metric) {
            return Err(MetricsError::Api {
                status: 500,
                message: format!("{metric} exploded"),
            });
        }
        Ok(QueryResponse {
            data: vec![point(1.0), point(2.0)],
        })
    }
}

fn point(value: f64) -> Telemetry {
    let mut labels = BTreeMap::new();
    labels.insert("resource.kafka.id".to_string(), json!("lkc-1"));
    Telemetry {
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        value,
        metric: String::new(),
        labels,
    }
}

fn scope() -> QueryScope {
    let interval = Interval::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
    )
    .unwrap();
    QueryScope::new(Resource::KAFKA, "lkc-1", Granularity::OneMinute, interval)
}

fn metrics(names: &[&str]) -> Vec<Metric> {
    names.iter().copied().map(Metric::new).collect()
}

fn client(source: Arc<ScriptedSource>, max_workers: usize) -> MetricsClient {
    MetricsClient::builder()
        .source(source)
        .max_workers(max_workers)
        .build()
        .unwrap()
}

// ============================================================================
// Batch queries
// ============================================================================

#[tokio::test(start_paused = true)]
async fn all_metrics_succeed_within_deadline() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_millis(100)));
    let client = client(source.clone(), 10);
    let batch_metrics = metrics(&["bytes_in", "bytes_out", "request_count"]);

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(60), &batch_metrics)
        .await;

    assert_eq!(batch.results.len(), 3);
    assert!(batch.errors.is_empty());
    assert!(batch.is_complete(&batch_metrics));
    assert_eq!(source.calls(), 3);

    let points = &batch.results["bytes_out"];
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.metric == "bytes_out"));
}

#[tokio::test(start_paused = true)]
async fn failure_lands_in_errors_only() {
    let source = Arc::new(ScriptedSource::new().fail("bytes_out"));
    let client = client(source.clone(), 10);
    let batch_metrics = metrics(&["bytes_in", "bytes_out", "request_count"]);

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(60), &batch_metrics)
        .await;

    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.errors.len(), 1);
    assert!(!batch.results.contains_key("bytes_out"));
    assert!(matches!(
        batch.errors["bytes_out"],
        MetricsError::Api { status: 500, .. }
    ));
    assert_eq!(batch.status("bytes_out"), MetricStatus::Failed);
    assert_eq!(batch.status("bytes_in"), MetricStatus::Succeeded);
    // Every metric accounted for, even though one failed.
    assert!(batch.is_complete(&batch_metrics));

    let (results, errors) = batch.into_parts();
    assert_eq!((results.len(), errors.len()), (2, 1));
}

#[tokio::test(start_paused = true)]
async fn in_flight_queries_never_exceed_max_workers() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_millis(50)));
    let client = client(source.clone(), 3);
    let names: Vec<String> = (0..8).map(|i| format!("metric_{i}")).collect();
    let batch_metrics: Vec<Metric> = names.iter().map(|n| Metric::new(n.as_str())).collect();

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(60), &batch_metrics)
        .await;

    assert_eq!(batch.results.len(), 8);
    assert_eq!(source.calls(), 8);
    assert_eq!(source.peak(), 3);
}

#[tokio::test(start_paused = true)]
async fn small_batch_uses_one_worker_per_metric() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_millis(50)));
    let client = client(source.clone(), 10);

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(60), &metrics(&["a", "b"]))
        .await;

    assert_eq!(batch.results.len(), 2);
    assert_eq!(source.peak(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_max_workers_still_runs_one() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_millis(10)));
    let client = client(source.clone(), 0);

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(60), &metrics(&["a", "b", "c"]))
        .await;

    assert_eq!(batch.results.len(), 3);
    assert_eq!(source.peak(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_returns_partial_results() {
    let source = Arc::new(
        ScriptedSource::new()
            .delay("bytes_in", Duration::from_secs(1))
            .delay("bytes_out", Duration::from_secs(1))
            .delay("request_count", Duration::from_secs(10)),
    );
    let client = client(source.clone(), 2);
    let batch_metrics = metrics(&["bytes_in", "bytes_out", "request_count"]);

    let started = tokio::time::Instant::now();
    let batch = client
        .query_metrics(&scope(), Duration::from_secs(5), &batch_metrics)
        .await;
    let elapsed = started.elapsed();

    assert!(batch.results.contains_key("bytes_in"));
    assert!(batch.results.contains_key("bytes_out"));
    assert!(!batch.results.contains_key("request_count"));
    assert!(batch.errors.is_empty());
    assert_eq!(batch.status("request_count"), MetricStatus::Incomplete);
    assert_eq!(batch.missing(&batch_metrics), vec!["request_count"]);

    assert!(elapsed >= Duration::from_secs(5), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "returned late: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn abandoned_batch_starts_no_new_queries() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_secs(10)));
    let client = client(source.clone(), 2);
    let names: Vec<String> = (0..10).map(|i| format!("metric_{i}")).collect();
    let batch_metrics: Vec<Metric> = names.iter().map(|n| Metric::new(n.as_str())).collect();

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(1), &batch_metrics)
        .await;
    assert!(batch.is_empty());
    let at_return = source.calls();
    assert_eq!(at_return, 2);

    // Let the in-flight calls finish and give workers every chance to continue.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(source.calls(), at_return);
}

#[tokio::test(start_paused = true)]
async fn deadline_before_any_outcome_is_empty() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_secs(30)));
    let client = client(source.clone(), 4);
    let batch_metrics = metrics(&["a", "b", "c"]);

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(1), &batch_metrics)
        .await;

    assert!(batch.is_empty());
    assert_eq!(batch.missing(&batch_metrics).len(), 3);
    // The queries were issued; only their answers were too slow.
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn returns_as_soon_as_every_outcome_arrives() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_secs(1)));
    let client = client(source.clone(), 4);

    let started = tokio::time::Instant::now();
    let batch = client
        .query_metrics(&scope(), Duration::from_secs(3600), &metrics(&["a", "b"]))
        .await;

    assert_eq!(batch.len(), 2);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn empty_batch_issues_no_queries() {
    let source = Arc::new(ScriptedSource::new());
    let client = client(source.clone(), 4);

    let batch = client
        .query_metrics(&scope(), Duration::from_secs(5), &[])
        .await;

    assert!(batch.results.is_empty());
    assert!(batch.errors.is_empty());
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_metrics_are_queried_once() {
    let source = Arc::new(ScriptedSource::new());
    let client = client(source.clone(), 4);

    let batch = client
        .query_metrics(
            &scope(),
            Duration::from_secs(5),
            &metrics(&["bytes_in", "bytes_in", "bytes_out"]),
        )
        .await;

    assert_eq!(source.calls(), 2);
    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.results["bytes_in"].len(), 2);
}

#[tokio::test(start_paused = true)]
async fn batch_queries_share_the_scope() {
    let source = Arc::new(ScriptedSource::new());
    let client = MetricsClient::builder()
        .source(source.clone())
        .page_limit(Some(250))
        .build()
        .unwrap();

    client
        .query_metrics(&scope(), Duration::from_secs(5), &metrics(&["a", "b"]))
        .await;

    let queries = source.recorded();
    assert_eq!(queries.len(), 2);
    for query in &queries {
        assert_eq!(query.granularity, Granularity::OneMinute);
        assert_eq!(query.group_by, vec!["resource.kafka.id".to_string()]);
        assert_eq!(query.intervals, vec![scope().interval]);
        assert_eq!(query.limit, Some(250));
    }
    let mut names: Vec<_> = queries
        .iter()
        .filter_map(|q| q.metric_name().map(str::to_string))
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn default_timeout_comes_from_builder() {
    let source = Arc::new(ScriptedSource::new().default_delay(Duration::from_secs(10)));
    let client = MetricsClient::builder()
        .source(source.clone())
        .default_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let batch = client.query_metrics_default(&scope(), &metrics(&["a"])).await;

    assert!(batch.is_empty());
    assert!(started.elapsed() < Duration::from_secs(3));
}

// ============================================================================
// Single-metric queries
// ============================================================================

#[tokio::test]
async fn query_metric_tags_points_and_is_repeatable() {
    let source = Arc::new(ScriptedSource::new());
    let client = client(source.clone(), 4);
    let metric = Metric::new("bytes_in");

    let first = client.query_metric(&scope(), &metric).await.unwrap();
    let second = client.query_metric(&scope(), &metric).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|p| p.metric == "bytes_in"));
    assert_eq!(first[0].label("resource.kafka.id").as_deref(), Some("lkc-1"));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn query_metric_propagates_source_error() {
    let source = Arc::new(ScriptedSource::new().fail("bytes_in"));
    let client = client(source.clone(), 4);

    let err = client
        .query_metric(&scope(), &Metric::new("bytes_in"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn query_metric_rejects_blank_name_locally() {
    let source = Arc::new(ScriptedSource::new());
    let client = client(source.clone(), 4);

    let err = client
        .query_metric(&scope(), &Metric::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, MetricsError::InvalidQuery(_)));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn query_metric_and_label_filters_and_groups_by_label() {
    let source = Arc::new(ScriptedSource::new());
    let client = client(source.clone(), 4);

    let points = client
        .query_metric_and_label(
            &scope(),
            &Metric::new("bytes_in"),
            &MetricLabel::TOPIC,
            "orders",
        )
        .await
        .unwrap();
    assert!(points.iter().all(|p| p.metric == "bytes_in"));

    let queries = source.recorded();
    assert_eq!(queries.len(), 1);
    let body = serde_json::to_value(&queries[0]).unwrap();
    assert_eq!(
        body["filter"],
        json!({
            "op": "AND",
            "filters": [
                {"field": "resource.kafka.id", "op": "EQ", "value": "lkc-1"},
                {"field": "metric.topic", "op": "EQ", "value": "orders"}
            ]
        })
    );
    assert_eq!(body["group_by"], json!(["resource.kafka.id", "metric.topic"]));
}
