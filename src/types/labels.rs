//! Label names used in filters and group-bys

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! label_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            pub fn new(label: impl Into<String>) -> Self {
                Self(Cow::Owned(label.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(label: &str) -> Self {
                Self::new(label)
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                Self::new(label)
            }
        }
    };
}

label_type!(
    /// A resource label identifying what is being measured, e.g. `resource.kafka.id`.
    ///
    /// Used as the primary filter and first group-by of every query.
    Resource
);

label_type!(
    /// A metric-level label such as `metric.topic`.
    MetricLabel
);

impl Resource {
    pub const KAFKA: Resource = Resource(Cow::Borrowed("resource.kafka.id"));
    pub const CONNECTOR: Resource = Resource(Cow::Borrowed("resource.connector.id"));
    pub const KSQL: Resource = Resource(Cow::Borrowed("resource.ksql.id"));
    pub const SCHEMA_REGISTRY: Resource = Resource(Cow::Borrowed("resource.schema_registry.id"));

    /// Resource label for a descriptor resource type, e.g. `kafka` -> `resource.kafka.id`.
    pub fn for_type(resource_type: &str) -> Self {
        Self::new(format!("resource.{resource_type}.id"))
    }

    /// The resource type this label belongs to (`kafka` for `resource.kafka.id`).
    pub fn resource_type(&self) -> Option<&str> {
        self.0
            .strip_prefix("resource.")
            .and_then(|rest| rest.strip_suffix(".id"))
    }
}

impl MetricLabel {
    pub const TOPIC: MetricLabel = MetricLabel(Cow::Borrowed("metric.topic"));
    pub const PARTITION: MetricLabel = MetricLabel(Cow::Borrowed("metric.partition"));
    pub const TYPE: MetricLabel = MetricLabel(Cow::Borrowed("metric.type"));
    pub const PRINCIPAL_ID: MetricLabel = MetricLabel(Cow::Borrowed("metric.principal_id"));

    /// Label for a descriptor key, adding the `metric.` prefix when missing.
    pub fn for_key(key: &str) -> Self {
        if key.starts_with("metric.") {
            Self::new(key)
        } else {
            Self::new(format!("metric.{key}"))
        }
    }
}
