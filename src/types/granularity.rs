//! Time bucket sizes accepted by the query endpoint

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::MetricsError;

/// Width of the time buckets data points are aggregated into.
///
/// Serialized as the ISO-8601 duration string the API expects (`PT1M`,
/// `PT1H`, ...). `All` collapses the whole interval into a single point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "PT1M")]
    OneMinute,
    #[serde(rename = "PT5M")]
    FiveMinutes,
    #[serde(rename = "PT15M")]
    FifteenMinutes,
    #[serde(rename = "PT30M")]
    ThirtyMinutes,
    #[default]
    #[serde(rename = "PT1H")]
    OneHour,
    #[serde(rename = "PT4H")]
    FourHours,
    #[serde(rename = "PT6H")]
    SixHours,
    #[serde(rename = "PT12H")]
    TwelveHours,
    #[serde(rename = "P1D")]
    OneDay,
    #[serde(rename = "ALL")]
    All,
}

impl Granularity {
    /// Every granularity the API accepts, finest first.
    pub const VALUES: [Granularity; 10] = [
        Granularity::OneMinute,
        Granularity::FiveMinutes,
        Granularity::FifteenMinutes,
        Granularity::ThirtyMinutes,
        Granularity::OneHour,
        Granularity::FourHours,
        Granularity::SixHours,
        Granularity::TwelveHours,
        Granularity::OneDay,
        Granularity::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "PT1M",
            Granularity::FiveMinutes => "PT5M",
            Granularity::FifteenMinutes => "PT15M",
            Granularity::ThirtyMinutes => "PT30M",
            Granularity::OneHour => "PT1H",
            Granularity::FourHours => "PT4H",
            Granularity::SixHours => "PT6H",
            Granularity::TwelveHours => "PT12H",
            Granularity::OneDay => "P1D",
            Granularity::All => "ALL",
        }
    }

    /// Bucket width, or `None` for [`Granularity::All`].
    pub fn bucket(&self) -> Option<Duration> {
        let minutes = match self {
            Granularity::OneMinute => 1,
            Granularity::FiveMinutes => 5,
            Granularity::FifteenMinutes => 15,
            Granularity::ThirtyMinutes => 30,
            Granularity::OneHour => 60,
            Granularity::FourHours => 4 * 60,
            Granularity::SixHours => 6 * 60,
            Granularity::TwelveHours => 12 * 60,
            Granularity::OneDay => 24 * 60,
            Granularity::All => return None,
        };
        Some(Duration::from_secs(minutes * 60))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Granularity::VALUES
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MetricsError::InvalidGranularity(s.to_string()))
    }
}
