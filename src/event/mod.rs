//! Event records -- decoding, timestamp parsing, and severity levels.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed event record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unknown event level '{0}'")]
    UnknownLevel(String),
}

/// Severity level of an event.
///
/// Names are matched case-sensitively. Anything outside the fixed set is kept
/// verbatim as `Other` and never counts as critical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Info,
    Warn,
    Error,
    Critical,
    Other(String),
}

impl Level {
    pub fn as_str(&self) -> &str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Other(s) => s,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Level::Critical)
    }

    /// ERROR and CRITICAL both count as "serious" in the summary report.
    pub fn is_error_or_critical(&self) -> bool {
        matches!(self, Level::Error | Level::Critical)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Level::Other(_))
    }
}

impl From<String> for Level {
    fn from(s: String) -> Self {
        match s.as_str() {
            "INFO" => Level::Info,
            "WARN" => Level::Warn,
            "ERROR" => Level::Error,
            "CRITICAL" => Level::Critical,
            _ => Level::Other(s),
        }
    }
}

impl From<&str> for Level {
    fn from(s: &str) -> Self {
        Level::from(s.to_string())
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        match level {
            Level::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation from the input feed. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    pub message: String,
}

/// Wire shape of one input line.
#[derive(Debug, Deserialize)]
struct RawRecord {
    timestamp: String,
    level: String,
    message: String,
}

impl Event {
    pub fn new(
        timestamp: &str,
        level: impl Into<Level>,
        message: impl Into<String>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            timestamp: parse_timestamp(timestamp)?,
            level: level.into(),
            message: message.into(),
        })
    }

    /// Decode a single newline-delimited JSON record.
    ///
    /// With `strict_levels` set, a level outside INFO/WARN/ERROR/CRITICAL is
    /// rejected instead of being carried as `Level::Other`.
    pub fn from_json_line(line: &str, strict_levels: bool) -> Result<Self, DecodeError> {
        let raw: RawRecord = serde_json::from_str(line.trim())?;
        let event = Self::new(&raw.timestamp, raw.level, raw.message)?;
        if strict_levels && !event.level.is_known() {
            return Err(DecodeError::UnknownLevel(event.level.to_string()));
        }
        Ok(event)
    }
}

/// ISO-8601 forms accepted besides RFC 3339. All of them carry an offset.
const ISO8601_FALLBACKS: [&str; 4] = [
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

/// Parse an ISO-8601 timestamp with an explicit offset. A trailing `Z` is read
/// as `+00:00`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, DecodeError> {
    let normalized = match value.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => value.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalized).or_else(|rfc_err| {
        ISO8601_FALLBACKS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
            .ok_or_else(|| DecodeError::InvalidTimestamp {
                value: value.to_string(),
                source: rfc_err,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_suffix_matches_utc_offset() {
        let z = parse_timestamp("2025-06-30T12:00:00Z").unwrap();
        let offset = parse_timestamp("2025-06-30T12:00:00+00:00").unwrap();
        assert_eq!(z, offset);
        assert_eq!(z.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_non_utc_offset_is_same_instant() {
        let paris = parse_timestamp("2025-06-30T14:00:00+02:00").unwrap();
        let utc = parse_timestamp("2025-06-30T12:00:00Z").unwrap();
        assert_eq!(paris, utc);
    }

    #[test]
    fn test_fractional_seconds() {
        let ts = parse_timestamp("2025-06-30T12:00:00.250Z").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_malformed_timestamp_fails() {
        let err = Event::new("30/06/2025 12:00", "INFO", "boot").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTimestamp { .. }));
        assert!(err.to_string().contains("30/06/2025 12:00"));
    }

    #[test]
    fn test_missing_offset_fails() {
        assert!(parse_timestamp("2025-06-30T12:00:00").is_err());
        assert!(parse_timestamp("2025-06-30T12:00").is_err());
    }

    #[test]
    fn test_minutes_precision_accepted() {
        let short = Event::new("2025-06-30T12:00Z", "INFO", "x").unwrap();
        let full = parse_timestamp("2025-06-30T12:00:00+00:00").unwrap();
        assert_eq!(short.timestamp, full);
        assert_eq!(parse_timestamp("2025-06-30 14:00+02:00").unwrap(), full);
    }

    #[test]
    fn test_compact_offset_accepted() {
        let compact = parse_timestamp("2025-06-30T12:00:00+0000").unwrap();
        assert_eq!(compact, parse_timestamp("2025-06-30T12:00:00Z").unwrap());
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(Level::from("CRITICAL"), Level::Critical);
        assert_eq!(Level::from("WARN"), Level::Warn);
        assert_eq!(Level::from("critical"), Level::Other("critical".to_string()));
        assert!(!Level::from("critical").is_critical());
        assert!(Level::Error.is_error_or_critical());
        assert!(!Level::Warn.is_error_or_critical());
    }

    #[test]
    fn test_from_json_line() {
        let line = r#"{"timestamp": "2025-06-30T12:00:05Z", "level": "ERROR", "message": "disk full"}"#;
        let event = Event::from_json_line(line, false).unwrap();
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.message, "disk full");
        assert_eq!(event.timestamp, parse_timestamp("2025-06-30T12:00:05+00:00").unwrap());
    }

    #[test]
    fn test_from_json_line_extra_fields_ignored() {
        let line = r#"{"timestamp": "2025-06-30T12:00:05Z", "level": "INFO", "message": "ok", "host": "db1"}"#;
        assert!(Event::from_json_line(line, false).is_ok());
    }

    #[test]
    fn test_from_json_line_missing_field() {
        let line = r#"{"timestamp": "2025-06-30T12:00:05Z", "level": "INFO"}"#;
        let err = Event::from_json_line(line, false).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_unknown_level_tolerated_unless_strict() {
        let line = r#"{"timestamp": "2025-06-30T12:00:05Z", "level": "FATAL", "message": "x"}"#;
        let event = Event::from_json_line(line, false).unwrap();
        assert_eq!(event.level, Level::Other("FATAL".to_string()));

        let err = Event::from_json_line(line, true).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownLevel(ref l) if l == "FATAL"));
    }

    #[test]
    fn test_level_serde_roundtrip_keeps_raw_string() {
        let json = serde_json::to_string(&Level::Other("NOTICE".to_string())).unwrap();
        assert_eq!(json, "\"NOTICE\"");
        let parsed: Level = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(parsed, Level::Critical);
    }
}
