//! Alert snapshot persistence -- full-overwrite JSON dump of the alert history.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use crate::detect::Alert;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize alert snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write alert snapshot to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for the alert history. Every call receives the complete
/// sequence and replaces whatever was stored before.
pub trait AlertSink: Send {
    fn persist(&self, alerts: &[Alert]) -> Result<(), PersistError>;
}

/// Writes the alert history as a pretty-printed JSON array.
///
/// The snapshot is written to a sibling `.tmp` file and renamed over the
/// destination, so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AlertSink for JsonFileSink {
    fn persist(&self, alerts: &[Alert]) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(alerts)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.io_err(e));
        }

        debug!(path = %self.path.display(), alerts = alerts.len(), "alert snapshot written");
        Ok(())
    }
}

/// In-memory sink that keeps the latest snapshot. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Vec<Alert>,
    writes: usize,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail = fail;
    }

    pub fn last_snapshot(&self) -> Vec<Alert> {
        self.lock().snapshot.clone()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a panicking test thread held it.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl AlertSink for MemorySink {
    fn persist(&self, alerts: &[Alert]) -> Result<(), PersistError> {
        let mut state = self.lock();
        if state.fail {
            return Err(PersistError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "simulated write failure"),
            });
        }
        state.snapshot = alerts.to_vec();
        state.writes += 1;
        Ok(())
    }
}

/// Read a snapshot written by [`JsonFileSink`]. A missing file is an empty history.
pub fn load_alerts(path: &Path) -> anyhow::Result<Vec<Alert>> {
    use anyhow::Context;

    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read alert snapshot: {}", path.display()))?;
    let alerts = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse alert snapshot: {}", path.display()))?;
    Ok(alerts)
}
