//! Time-paced ingestion of newline-delimited JSON events into the analyzer.
//!
//! Records are handled strictly one at a time in source order: wait the
//! configured delay, decode, `add_event`, write the trace line, report
//! progress. A run goes `Idle -> Running -> Completed | Failed` exactly once.

pub mod progress;

use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{DecodePolicy, InputConfig};
use crate::detect::EventAnalyzer;
use crate::event::{DecodeError, Event};
use crate::storage::PersistError;
use crate::trace::TraceLog;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: DecodeError,
    },

    #[error("line {line}: {source}")]
    Persist {
        line: usize,
        #[source]
        source: PersistError,
    },

    #[error("event source unreadable: {0}")]
    SourceIo(#[source] std::io::Error),

    #[error("pipeline already used (state: {0:?})")]
    NotIdle(RunState),
}

impl From<LinesCodecError> for IngestError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::Io(io) => IngestError::SourceIo(io),
            LinesCodecError::MaxLineLengthExceeded => IngestError::SourceIo(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "line length limit exceeded",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Receives the number of events processed so far after each record.
pub trait ProgressObserver {
    fn on_progress(&mut self, processed: usize);
}

impl<F: FnMut(usize)> ProgressObserver for F {
    fn on_progress(&mut self, processed: usize) {
        self(processed)
    }
}

/// Observer that ignores progress.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _processed: usize) {}
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delay: Duration,
    pub on_decode_error: DecodePolicy,
    pub strict_levels: bool,
    /// Longest accepted input line, in bytes.
    pub max_line_length: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&InputConfig::default())
    }
}

impl From<&InputConfig> for IngestOptions {
    fn from(cfg: &InputConfig) -> Self {
        Self {
            delay: Duration::from_millis(cfg.delay_ms),
            on_decode_error: cfg.on_decode_error,
            strict_levels: cfg.strict_levels,
            max_line_length: 1024 * 1024,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub run_id: Uuid,
    pub processed: usize,
    pub skipped: usize,
    pub alerts_raised: usize,
}

pub struct IngestionPipeline<'a> {
    analyzer: &'a mut EventAnalyzer,
    trace: Option<&'a TraceLog>,
    options: IngestOptions,
    state: RunState,
    processed: usize,
    skipped: usize,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(analyzer: &'a mut EventAnalyzer, options: IngestOptions) -> Self {
        Self {
            analyzer,
            trace: None,
            options,
            state: RunState::Idle,
            processed: 0,
            skipped: 0,
        }
    }

    pub fn with_trace(mut self, trace: &'a TraceLog) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Events added to the analyzer so far, including during a failed run.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consume `source` to the end or until the first fatal error.
    pub async fn run<R, O>(&mut self, source: R, observer: &mut O) -> Result<IngestSummary, IngestError>
    where
        R: AsyncRead + Unpin,
        O: ProgressObserver + ?Sized,
    {
        if self.state != RunState::Idle {
            return Err(IngestError::NotIdle(self.state));
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("ingest", %run_id);
        self.state = RunState::Running;
        let alerts_before = self.analyzer.alerts().len();

        let result = self.drive(source, observer).instrument(span.clone()).await;

        match result {
            Ok(()) => {
                self.state = RunState::Completed;
                let summary = IngestSummary {
                    run_id,
                    processed: self.processed,
                    skipped: self.skipped,
                    alerts_raised: self.analyzer.alerts().len() - alerts_before,
                };
                span.in_scope(|| {
                    info!(
                        processed = summary.processed,
                        skipped = summary.skipped,
                        alerts = summary.alerts_raised,
                        "ingestion completed"
                    )
                });
                Ok(summary)
            }
            Err(e) => {
                self.state = RunState::Failed;
                span.in_scope(|| error!(processed = self.processed, error = %e, "ingestion failed"));
                Err(e)
            }
        }
    }

    async fn drive<R, O>(&mut self, source: R, observer: &mut O) -> Result<(), IngestError>
    where
        R: AsyncRead + Unpin,
        O: ProgressObserver + ?Sized,
    {
        info!(delay_ms = self.options.delay.as_millis() as u64, "ingestion started");
        let codec = LinesCodec::new_with_max_length(self.options.max_line_length);
        let mut lines = FramedRead::new(source, codec);
        let mut line_no = 0usize;

        while let Some(line) = lines.next().await {
            let line = line?;
            line_no += 1;
            if line.trim().is_empty() {
                debug!(line = line_no, "skipping blank line");
                continue;
            }

            tokio::time::sleep(self.options.delay).await;

            let event = match Event::from_json_line(&line, self.options.strict_levels) {
                Ok(event) => event,
                Err(source) => match self.options.on_decode_error {
                    DecodePolicy::Fail => {
                        return Err(IngestError::Decode { line: line_no, source });
                    }
                    DecodePolicy::Skip => {
                        warn!(line = line_no, error = %source, "skipping undecodable record");
                        self.skipped += 1;
                        continue;
                    }
                },
            };

            debug!(line = line_no, level = %event.level, "event decoded");

            // The event is stored even when persisting its alert fails, so it
            // is still counted, traced and reported before the error surfaces.
            let persisted = self.analyzer.add_event(event);
            self.processed += 1;

            if let (Some(trace), Some(event)) = (self.trace, self.analyzer.events().last()) {
                if let Err(e) = trace.log_event(event).await {
                    warn!(error = %e, "failed to write trace line");
                }
            }

            observer.on_progress(self.processed);
            persisted.map_err(|source| IngestError::Persist { line: line_no, source })?;
        }

        Ok(())
    }
}
