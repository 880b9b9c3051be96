//! Metric and resource descriptors

use serde::{Deserialize, Serialize};

/// A metric that can be queried.
///
/// Only `name` is needed to build a query. The remaining fields are filled
/// in when the metric comes from the descriptors endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Fully qualified metric name, e.g. `io.confluent.kafka.server/received_bytes`.
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Value type, e.g. `COUNTER_INT64` or `GAUGE_INT64`.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lifecycle_stage: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelDescriptor>,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this metric can be grouped by the given label key.
    pub fn has_label(&self, key: &str) -> bool {
        let key = key.strip_prefix("metric.").unwrap_or(key);
        self.labels.iter().any(|l| l.key == key)
    }
}

impl From<&str> for Metric {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Metric {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A label a metric or resource can be filtered or grouped by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDescriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A kind of resource metrics are reported for (kafka, connector, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelDescriptor>,
}
