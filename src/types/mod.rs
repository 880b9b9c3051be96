//! Public types for the metrics API.

mod granularity;
mod interval;
mod labels;
mod metric;
mod query;
mod response;

pub use granularity::Granularity;
pub use interval::{Interval, parse_timestamp};
pub use labels::{MetricLabel, Resource};
pub use metric::{LabelDescriptor, Metric, ResourceType};
pub use query::{Aggregation, AggregationKind, CompoundOp, FieldOp, Filter, Query, QueryScope};
pub use response::{QueryResponse, Telemetry};

pub(crate) use response::DataEnvelope;
