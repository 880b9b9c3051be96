//! Descriptor lookups through MetricsClient are cached; failures are not.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use ccloud_metrics::{
    LabelDescriptor, Metric, MetricSource, MetricsClient, MetricsError, Query, QueryResponse,
    ResourceType, Result,
};

#[derive(Default)]
struct DescriptorSource {
    metric_calls: AtomicUsize,
    resource_calls: AtomicUsize,
    failing: AtomicBool,
}

#[async_trait]
impl MetricSource for DescriptorSource {
    fn name(&self) -> &str {
        "descriptors"
    }

    async fn post_query(&self, _query: &Query) -> Result<QueryResponse> {
        Ok(QueryResponse::default())
    }

    async fn available_metrics(&self, resource_type: Option<&str>) -> Result<Vec<Metric>> {
        self.metric_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MetricsError::Http("connection refused".into()));
        }
        let name = match resource_type {
            Some(kind) => format!("io.confluent.{kind}.server/received_bytes"),
            None => "io.confluent.kafka.server/received_bytes".to_string(),
        };
        Ok(vec![Metric {
            labels: vec![LabelDescriptor {
                key: "topic".into(),
                description: String::new(),
            }],
            ..Metric::new(name)
        }])
    }

    async fn available_resources(&self) -> Result<Vec<ResourceType>> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ResourceType {
            kind: "kafka".into(),
            ..Default::default()
        }])
    }
}

/// Only implements queries.
struct QueryOnlySource;

#[async_trait]
impl MetricSource for QueryOnlySource {
    fn name(&self) -> &str {
        "query-only"
    }

    async fn post_query(&self, _query: &Query) -> Result<QueryResponse> {
        Ok(QueryResponse::default())
    }
}

#[tokio::test]
async fn metric_listing_is_fetched_once() {
    let source = Arc::new(DescriptorSource::default());
    let client = MetricsClient::with_source(source.clone());

    let first = client.available_metrics(Some("kafka")).await.unwrap();
    let second = client.available_metrics(Some("kafka")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.metric_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listings_are_cached_per_resource_type() {
    let source = Arc::new(DescriptorSource::default());
    let client = MetricsClient::with_source(source.clone());

    let kafka = client.available_metrics(Some("kafka")).await.unwrap();
    let connector = client.available_metrics(Some("connector")).await.unwrap();
    let all = client.available_metrics(None).await.unwrap();
    client.available_metrics(Some("connector")).await.unwrap();

    assert_ne!(kafka, connector);
    assert_eq!(all[0].name, "io.confluent.kafka.server/received_bytes");
    assert_eq!(source.metric_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let source = Arc::new(DescriptorSource::default());
    source.failing.store(true, Ordering::SeqCst);
    let client = MetricsClient::with_source(source.clone());

    assert!(client.available_metrics(None).await.is_err());
    assert!(client.available_metrics(None).await.is_err());
    assert_eq!(source.metric_calls.load(Ordering::SeqCst), 2);

    source.failing.store(false, Ordering::SeqCst);
    assert_eq!(client.available_metrics(None).await.unwrap().len(), 1);
    client.available_metrics(None).await.unwrap();
    assert_eq!(source.metric_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn resource_listing_is_fetched_once() {
    let source = Arc::new(DescriptorSource::default());
    let client = MetricsClient::with_source(source.clone());

    client.available_resources().await.unwrap();
    let resources = client.available_resources().await.unwrap();

    assert_eq!(resources[0].kind, "kafka");
    assert_eq!(source.resource_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_listing_is_refetched() {
    let source = Arc::new(DescriptorSource::default());
    let client = MetricsClient::builder()
        .source(source.clone())
        .descriptor_ttl(Duration::from_millis(50))
        .build()
        .unwrap();

    client.available_resources().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    client.available_resources().await.unwrap();

    assert_eq!(source.resource_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn sources_without_descriptors_report_not_implemented() {
    let client = MetricsClient::with_source(Arc::new(QueryOnlySource));

    let err = client.available_metrics(None).await.unwrap_err();
    assert!(matches!(err, MetricsError::NotImplemented("available_metrics")));

    let err = client.available_resources().await.unwrap_err();
    assert!(matches!(err, MetricsError::NotImplemented("available_resources")));
}
