//! logsentinel -- critical-burst detection over structured event logs.
//!
//! Events are read one at a time from a newline-delimited JSON feed, stored in
//! arrival order, and checked for bursts of CRITICAL events. Each new alert is
//! written to a JSON snapshot as soon as it is detected.

pub mod config;
pub mod detect;
pub mod event;
pub mod ingest;
pub mod report;
pub mod storage;
pub mod trace;

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncRead;

use crate::config::AppConfig;
use crate::detect::EventAnalyzer;
use crate::ingest::{IngestOptions, IngestSummary, IngestionPipeline, ProgressObserver};
use crate::storage::JsonFileSink;
use crate::trace::TraceLog;

/// Open the configured input. `-` means stdin.
pub async fn open_source(path: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open event source: {}", path.display()))?;
    Ok(Box::new(file))
}

/// Run one ingestion pass as configured: events from `config.input`, alert
/// snapshot to `config.alerts.path`, trace lines to the configured log.
///
/// The analyzer is returned alongside the run result so callers can report on
/// partial progress after a failed run.
pub async fn ingest<O>(
    config: &AppConfig,
    observer: &mut O,
) -> Result<(EventAnalyzer, Result<IngestSummary>)>
where
    O: ProgressObserver + ?Sized,
{
    tracing::info!(
        input = %config.input.path.display(),
        alerts = %config.alerts.path.display(),
        "Starting ingestion"
    );

    let sink = JsonFileSink::new(&config.alerts.path);
    let trace = TraceLog::open(&config.logging.trace_log_path).await?;
    let source = open_source(&config.input.path).await?;

    let mut analyzer = EventAnalyzer::new(Box::new(sink));
    let result = IngestionPipeline::new(&mut analyzer, IngestOptions::from(&config.input))
        .with_trace(&trace)
        .run(source, observer)
        .await
        .context("ingestion run failed");

    Ok((analyzer, result))
}
