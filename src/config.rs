//! TOML configuration.
//!
//! Every section has defaults, so an empty or partial file is valid. The file
//! is found via `--config`, then `LOGSENTINEL_CONFIG`, then `./logsentinel.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CONFIG_ENV: &str = "LOGSENTINEL_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "logsentinel.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration file.
    ///
    /// An explicitly requested file must load; a file named by the environment
    /// variable or found in the working directory falls back to defaults on error.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "LOGSENTINEL_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// What to do with a record that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Stop the run at the first bad record.
    #[default]
    Fail,
    /// Log the bad record and continue with the next one.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Newline-delimited JSON event file; `-` reads stdin.
    pub path: PathBuf,
    /// Pause before each record, in milliseconds.
    pub delay_ms: u64,
    pub on_decode_error: DecodePolicy,
    /// Reject levels outside INFO/WARN/ERROR/CRITICAL.
    pub strict_levels: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("events.log"),
            delay_ms: 2000,
            on_decode_error: DecodePolicy::Fail,
            strict_levels: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Destination of the alert snapshot.
    pub path: PathBuf,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("alerts.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Append-only operator log with one line per processed event.
    pub trace_log_path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            trace_log_path: PathBuf::from("traceback.log"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.input.path, PathBuf::from("events.log"));
        assert_eq!(cfg.input.delay_ms, 2000);
        assert_eq!(cfg.input.on_decode_error, DecodePolicy::Fail);
        assert!(!cfg.input.strict_levels);

        assert_eq!(cfg.alerts.path, PathBuf::from("alerts.json"));

        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert_eq!(cfg.logging.trace_log_path, PathBuf::from("traceback.log"));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[input]
path = "/var/log/app/events.jsonl"
delay_ms = 0
on_decode_error = "skip"
strict_levels = true

[alerts]
path = "/var/lib/logsentinel/alerts.json"

[logging]
level = "debug"
format = "json"
trace_log_path = "/var/log/logsentinel/trace.log"
"#;

        let cfg: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.input.path, PathBuf::from("/var/log/app/events.jsonl"));
        assert_eq!(cfg.input.delay_ms, 0);
        assert_eq!(cfg.input.on_decode_error, DecodePolicy::Skip);
        assert!(cfg.input.strict_levels);
        assert_eq!(cfg.alerts.path, PathBuf::from("/var/lib/logsentinel/alerts.json"));
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(
            cfg.logging.trace_log_path,
            PathBuf::from("/var/log/logsentinel/trace.log")
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("[input]\ndelay_ms = 250\n").unwrap();
        assert_eq!(cfg.input.delay_ms, 250);
        assert_eq!(cfg.input.path, PathBuf::from("events.log"));
        assert_eq!(cfg.alerts.path, PathBuf::from("alerts.json"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_bad_policy_rejected() {
        assert!(toml::from_str::<AppConfig>("[input]\non_decode_error = \"retry\"\n").is_err());
    }

    #[test]
    fn test_explicit_path_must_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logsentinel.toml");
        std::fs::write(&path, "[alerts]\npath = \"out/alerts.json\"\n").unwrap();

        let cfg = AppConfig::resolve(Some(&path)).unwrap();
        assert_eq!(cfg.alerts.path, PathBuf::from("out/alerts.json"));

        assert!(AppConfig::resolve(Some(Path::new("/nonexistent/logsentinel.toml"))).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let back: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.input.delay_ms, cfg.input.delay_ms);
        assert_eq!(back.alerts.path, cfg.alerts.path);
        assert_eq!(back.logging.format, cfg.logging.format);
    }
}
