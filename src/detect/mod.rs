//! Critical-burst detection and alert bookkeeping.

pub mod anomaly;
pub mod engine;
pub mod incident;

pub use self::engine::EventAnalyzer;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Number of critical events that make up a burst.
pub const BURST_SIZE: usize = 3;

/// Maximum span, in seconds, between the first and last event of a burst (inclusive).
pub const BURST_WINDOW_SECS: i64 = 30;

pub const BURST_DETAILS: &str = "3 critical events detected within 30 seconds";

/// A detected critical burst.
///
/// Two alerts are equal when both `time` and `details` match; `time` compares
/// as an instant, so the same moment written with different offsets is one alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    #[serde(with = "iso8601")]
    pub time: DateTime<FixedOffset>,
    pub details: String,
}

impl Alert {
    pub fn critical_burst(time: DateTime<FixedOffset>) -> Self {
        Self {
            time,
            details: BURST_DETAILS.to_string(),
        }
    }
}

/// ISO-8601 text for an alert time: whole seconds when there is no
/// fractional part, microseconds otherwise, and always a numeric offset.
pub fn format_time(time: &DateTime<FixedOffset>) -> String {
    let precision = if time.timestamp_subsec_nanos() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    time.to_rfc3339_opts(precision, false)
}

mod iso8601 {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        crate::event::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
