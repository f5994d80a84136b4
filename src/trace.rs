//! Operator trace log.
//!
//! One human-readable line per processed event, appended to a text file and
//! never read back. Writes go through a `tokio::sync::Mutex` so the log can
//! be shared across tasks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::event::Event;

pub struct TraceLog {
    path: PathBuf,
    writer: Mutex<tokio::fs::File>,
}

impl TraceLog {
    /// Open (or create) the trace log at `path` in append mode.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create trace log directory: {}", parent.display()))?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open trace log: {}", path.display()))?;

        debug!(path = %path.display(), "trace log opened");

        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Append `msg` prefixed with the local wall-clock time.
    pub async fn log(&self, msg: &str) -> Result<()> {
        let line = format!("{} - {}\n", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"), msg);

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to write to trace log: {}", self.path.display()))?;
        writer
            .flush()
            .await
            .with_context(|| format!("failed to flush trace log: {}", self.path.display()))?;
        Ok(())
    }

    /// Append the "Event processed" line for one event.
    pub async fn log_event(&self, event: &Event) -> Result<()> {
        self.log(&event_line(event)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn event_line(event: &Event) -> String {
    format!("Event processed: {} - {}", event.level, event.message)
}
