//! ISO-8601 time intervals

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{MetricsError, Result};

/// A half-open window of time, `[start, end)`.
///
/// Rendered the way the API expects it: `2024-05-01T10:00:00Z/2024-05-01T11:00:00Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Create an interval; `start` must be strictly before `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(MetricsError::InvalidInterval(format!(
                "start {} is not before end {}",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end.to_rfc3339_opts(SecondsFormat::Secs, true),
            )));
        }
        Ok(Self { start, end })
    }

    /// The window of `length` ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, length: Duration) -> Result<Self> {
        let length = chrono::Duration::from_std(length)
            .map_err(|e| MetricsError::InvalidInterval(e.to_string()))?;
        let start = end
            .checked_sub_signed(length)
            .ok_or_else(|| MetricsError::InvalidInterval("interval start out of range".into()))?;
        Self::new(start, end)
    }

    /// The window of `length` ending now (truncated to whole seconds).
    pub fn last(length: Duration) -> Result<Self> {
        Self::ending_at(Utc::now().trunc_subsecs(0), length)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn length(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

impl FromStr for Interval {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| MetricsError::InvalidInterval(format!("expected start/end, got '{s}'")))?;
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MetricsError::InvalidInterval(format!("bad timestamp '{s}': {e}")))
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
