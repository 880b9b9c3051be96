//! Query bodies for the metrics query endpoint

use serde::Serialize;

use super::{Granularity, Interval, Metric, MetricLabel, Resource};
use crate::{MetricsError, Result};

/// The parameters shared by every metric in a batch: which resource, how
/// finely to bucket, and over what window.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryScope {
    pub resource: Resource,
    pub resource_id: String,
    pub granularity: Granularity,
    pub interval: Interval,
}

impl QueryScope {
    pub fn new(
        resource: Resource,
        resource_id: impl Into<String>,
        granularity: Granularity,
        interval: Interval,
    ) -> Self {
        Self {
            resource,
            resource_id: resource_id.into(),
            granularity,
            interval,
        }
    }
}

/// Comparison operator for a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldOp {
    Eq,
}

/// Boolean operator joining compound filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompoundOp {
    And,
}

/// A query filter: a single field comparison or a conjunction of filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Filter {
    Field {
        field: String,
        op: FieldOp,
        value: String,
    },
    Compound {
        op: CompoundOp,
        filters: Vec<Filter>,
    },
}

impl Filter {
    pub fn equal_to(field: impl AsRef<str>, value: impl Into<String>) -> Self {
        Filter::Field {
            field: field.as_ref().to_string(),
            op: FieldOp::Eq,
            value: value.into(),
        }
    }

    /// AND another equality onto this filter, flattening into an existing conjunction.
    pub fn and_equal_to(self, field: impl AsRef<str>, value: impl Into<String>) -> Self {
        let next = Filter::equal_to(field, value);
        match self {
            Filter::Compound {
                op: CompoundOp::And,
                mut filters,
            } => {
                filters.push(next);
                Filter::Compound {
                    op: CompoundOp::And,
                    filters,
                }
            }
            field => Filter::Compound {
                op: CompoundOp::And,
                filters: vec![field, next],
            },
        }
    }
}

/// How data points within a bucket are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationKind {
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub metric: String,
    pub agg: AggregationKind,
}

impl Aggregation {
    pub fn sum_of(metric: &Metric) -> Self {
        Self {
            metric: metric.name.clone(),
            agg: AggregationKind::Sum,
        }
    }
}

/// Request body for `POST /v2/metrics/{dataset}/query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub aggregations: Vec<Aggregation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    pub granularity: Granularity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    pub intervals: Vec<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Query {
    /// Sum of `metric` for one resource, grouped by that resource.
    pub fn for_metric(scope: &QueryScope, metric: &Metric, limit: Option<u32>) -> Self {
        Self {
            aggregations: vec![Aggregation::sum_of(metric)],
            filter: Some(Filter::equal_to(&scope.resource, scope.resource_id.clone())),
            granularity: scope.granularity,
            group_by: vec![scope.resource.to_string()],
            intervals: vec![scope.interval],
            limit,
        }
    }

    /// Like [`for_metric`](Self::for_metric), additionally restricted to
    /// `label == value` and grouped by resource then label.
    pub fn for_metric_and_label(
        scope: &QueryScope,
        metric: &Metric,
        label: &MetricLabel,
        value: impl Into<String>,
        limit: Option<u32>,
    ) -> Self {
        let mut query = Self::for_metric(scope, metric, limit);
        query.filter = query.filter.map(|f| f.and_equal_to(label, value));
        query.group_by.push(label.to_string());
        query
    }

    /// Name of the first aggregated metric.
    pub fn metric_name(&self) -> Option<&str> {
        self.aggregations.first().map(|a| a.metric.as_str())
    }

    /// Reject queries the API would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.aggregations.is_empty() {
            return Err(MetricsError::InvalidQuery(
                "at least one aggregation is required".into(),
            ));
        }
        if self.aggregations.iter().any(|a| a.metric.trim().is_empty()) {
            return Err(MetricsError::InvalidQuery("metric name is empty".into()));
        }
        if self.intervals.is_empty() {
            return Err(MetricsError::InvalidQuery(
                "at least one interval is required".into(),
            ));
        }
        if self.limit == Some(0) {
            return Err(MetricsError::InvalidQuery("limit must be positive".into()));
        }
        Ok(())
    }
}
