//! Response types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One data point returned by a metrics query.
///
/// The API does not echo the metric name back; the client fills `metric`
/// in after the call returns. Group-by label values (e.g.
/// `resource.kafka.id`, `metric.topic`) land in `labels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric: String,
    #[serde(flatten)]
    pub labels: BTreeMap<String, serde_json::Value>,
}

impl Telemetry {
    /// A label value rendered as a string (numbers are formatted, not quoted).
    pub fn label(&self, key: &str) -> Option<String> {
        self.labels.get(key).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Body of a successful query response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Vec<Telemetry>,
}

/// `{"data": [...]}` wrapper used by the descriptor endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}
