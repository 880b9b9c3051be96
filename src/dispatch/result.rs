//! Per-batch results

use std::collections::HashMap;

use crate::MetricsError;
use crate::types::{Metric, Telemetry};

/// What happened to one dispatched metric.
#[derive(Debug)]
pub(crate) enum Outcome {
    Success {
        metric: String,
        points: Vec<Telemetry>,
    },
    Failure {
        metric: String,
        error: MetricsError,
    },
}

/// Where a requested metric ended up in a [`BatchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricStatus {
    Succeeded,
    Failed,
    /// No outcome arrived before the deadline. Not an error: the query may
    /// still be running and its result is simply not part of this batch.
    Incomplete,
}

/// Results and errors of a batch query, keyed by metric name.
///
/// A metric appears in at most one of the two maps. A requested metric in
/// neither map did not finish before the deadline; see
/// [`status`](Self::status) and [`missing`](Self::missing).
#[derive(Debug, Default)]
pub struct BatchResult {
    pub results: HashMap<String, Vec<Telemetry>>,
    pub errors: HashMap<String, MetricsError>,
}

impl BatchResult {
    pub(crate) fn merge(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success { metric, points } => {
                self.results.entry(metric).or_default().extend(points);
            }
            Outcome::Failure { metric, error } => {
                self.errors.insert(metric, error);
            }
        }
    }

    pub fn status(&self, metric: &str) -> MetricStatus {
        if self.errors.contains_key(metric) {
            MetricStatus::Failed
        } else if self.results.contains_key(metric) {
            MetricStatus::Succeeded
        } else {
            MetricStatus::Incomplete
        }
    }

    /// Requested metrics with no outcome in this result.
    pub fn missing<'a>(&self, requested: &'a [Metric]) -> Vec<&'a str> {
        requested
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| self.status(name) == MetricStatus::Incomplete)
            .collect()
    }

    /// Whether every requested metric has an outcome (success or failure).
    pub fn is_complete(&self, requested: &[Metric]) -> bool {
        self.missing(requested).is_empty()
    }

    /// Number of metrics with an outcome.
    pub fn len(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(
        self,
    ) -> (
        HashMap<String, Vec<Telemetry>>,
        HashMap<String, MetricsError>,
    ) {
        (self.results, self.errors)
    }
}
