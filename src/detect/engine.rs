use tracing::{info, warn};

use crate::detect::anomaly::CriticalWindow;
use crate::detect::incident::AlertLedger;
use crate::detect::Alert;
use crate::event::{Event, Level};
use crate::storage::{AlertSink, PersistError};

/// Append-only event store with an online critical-burst detector.
///
/// Every `add_event` re-evaluates the last three critical events; a new
/// alert is written to the sink before `add_event` returns. Not designed for
/// concurrent mutation: hold it behind `&mut` in a single task.
pub struct EventAnalyzer {
    events: Vec<Event>,
    criticals: CriticalWindow,
    ledger: AlertLedger,
}

impl EventAnalyzer {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            events: Vec::new(),
            criticals: CriticalWindow::new(),
            ledger: AlertLedger::new(sink),
        }
    }

    /// Append an event and run detection.
    ///
    /// The event is kept even if persisting a resulting alert fails.
    pub fn add_event(&mut self, event: Event) -> Result<(), PersistError> {
        if event.level.is_critical() {
            self.criticals.push(event.timestamp);
        }
        self.events.push(event);
        self.detect_anomaly()?;
        Ok(())
    }

    /// Check the last three critical events and record an alert if they fall
    /// within the burst window. Returns the alert only when it is new.
    pub fn detect_anomaly(&mut self) -> Result<Option<Alert>, PersistError> {
        let Some(end) = self.criticals.burst_end() else {
            return Ok(None);
        };

        let alert = Alert::critical_burst(end);
        if self.ledger.record(alert.clone())? {
            warn!(time = %super::format_time(&alert.time), "{}", alert.details);
            return Ok(Some(alert));
        }
        Ok(None)
    }

    /// Retry writing the alert snapshot after an earlier failure.
    pub fn flush(&mut self) -> Result<(), PersistError> {
        self.ledger.flush()?;
        info!(alerts = self.ledger.alerts().len(), "alert snapshot flushed");
        Ok(())
    }

    pub fn is_unpersisted(&self) -> bool {
        self.ledger.is_unpersisted()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn alerts(&self) -> &[Alert] {
        self.ledger.alerts()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn error_or_critical_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.level.is_error_or_critical())
            .count()
    }

    /// Event counts per level, in order of first appearance.
    pub fn level_counts(&self) -> Vec<(Level, usize)> {
        let mut counts: Vec<(Level, usize)> = Vec::new();
        for event in &self.events {
            match counts.iter_mut().find(|(level, _)| *level == event.level) {
                Some((_, n)) => *n += 1,
                None => counts.push((event.level.clone(), 1)),
            }
        }
        counts
    }
}
