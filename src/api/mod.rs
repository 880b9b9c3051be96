//! HTTP implementations of [`MetricSource`](crate::MetricSource).

pub mod confluent;

pub use confluent::{DEFAULT_BASE_URL, DEFAULT_DATASET, DEFAULT_REQUEST_TIMEOUT, TelemetryApi};
