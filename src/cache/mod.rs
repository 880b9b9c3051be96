//! Descriptor caching.
//!
//! Metric and resource descriptors change rarely but every `ccm metrics`
//! call (and any caller validating metric names before a batch) would
//! otherwise hit the descriptors endpoint. [`DescriptorCache`] keeps
//! successful lookups for a fixed TTL. Failures are never cached.

use std::time::Duration;

use moka::future::Cache;

use crate::telemetry;
use crate::types::{Metric, ResourceType};

/// Default time a descriptor listing stays cached.
pub const DEFAULT_DESCRIPTOR_TTL: Duration = Duration::from_secs(15 * 60);

/// Upper bound on cached metric listings (one per resource type, plus "all").
const MAX_METRIC_LISTINGS: u64 = 64;

/// TTL cache for descriptor listings.
///
/// Metric listings are keyed on resource type; the unfiltered listing is
/// stored under the empty key.
#[derive(Clone)]
pub struct DescriptorCache {
    metrics: Cache<String, Vec<Metric>>,
    resources: Cache<(), Vec<ResourceType>>,
}

impl DescriptorCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            metrics: Cache::builder()
                .max_capacity(MAX_METRIC_LISTINGS)
                .time_to_live(ttl)
                .build(),
            resources: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn metrics(&self, resource_type: Option<&str>) -> Option<Vec<Metric>> {
        let hit = self.metrics.get(resource_type.unwrap_or_default()).await;
        record_lookup("metrics", hit.is_some());
        hit
    }

    pub async fn insert_metrics(&self, resource_type: Option<&str>, metrics: Vec<Metric>) {
        self.metrics
            .insert(resource_type.unwrap_or_default().to_string(), metrics)
            .await;
    }

    pub async fn resources(&self) -> Option<Vec<ResourceType>> {
        let hit = self.resources.get(&()).await;
        record_lookup("resources", hit.is_some());
        hit
    }

    pub async fn insert_resources(&self, resources: Vec<ResourceType>) {
        self.resources.insert((), resources).await;
    }

    /// Evict everything.
    pub fn clear(&self) {
        self.metrics.invalidate_all();
        self.resources.invalidate_all();
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTOR_TTL)
    }
}

fn record_lookup(kind: &'static str, hit: bool) {
    let name = if hit {
        telemetry::DESCRIPTOR_CACHE_HITS_TOTAL
    } else {
        telemetry::DESCRIPTOR_CACHE_MISSES_TOTAL
    };
    metrics::counter!(name, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listings_are_keyed_by_resource_type() {
        let cache = DescriptorCache::default();
        assert!(cache.metrics(Some("kafka")).await.is_none());

        cache
            .insert_metrics(Some("kafka"), vec![Metric::new("received_bytes")])
            .await;
        assert_eq!(cache.metrics(Some("kafka")).await.unwrap().len(), 1);
        assert!(cache.metrics(Some("connector")).await.is_none());
        assert!(cache.metrics(None).await.is_none());
    }

    #[tokio::test]
    async fn clear_evicts_everything() {
        let cache = DescriptorCache::default();
        cache.insert_metrics(None, vec![Metric::new("a")]).await;
        cache.insert_resources(vec![ResourceType::default()]).await;

        cache.clear();
        assert!(cache.metrics(None).await.is_none());
        assert!(cache.resources().await.is_none());
    }
}
