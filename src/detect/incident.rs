use std::collections::HashSet;

use tracing::{debug, warn};

use crate::detect::Alert;
use crate::storage::{AlertSink, PersistError};

/// Ordered, deduplicated alert history backed by a snapshot sink.
pub struct AlertLedger {
    alerts: Vec<Alert>,
    seen: HashSet<Alert>,
    sink: Box<dyn AlertSink>,
    unpersisted: bool,
}

impl AlertLedger {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            alerts: Vec::new(),
            seen: HashSet::new(),
            sink,
            unpersisted: false,
        }
    }

    /// Append `alert` unless an equal one is already recorded, then write the
    /// full snapshot.
    ///
    /// Returns `Ok(false)` for a duplicate (nothing is written). On a write
    /// failure the alert stays recorded and the ledger is marked unpersisted.
    pub fn record(&mut self, alert: Alert) -> Result<bool, PersistError> {
        if self.seen.contains(&alert) {
            debug!(time = %super::format_time(&alert.time), "duplicate alert suppressed");
            return Ok(false);
        }
        self.seen.insert(alert.clone());
        self.alerts.push(alert);
        self.flush()?;
        Ok(true)
    }

    /// Write the current snapshot to the sink.
    pub fn flush(&mut self) -> Result<(), PersistError> {
        match self.sink.persist(&self.alerts) {
            Ok(()) => {
                self.unpersisted = false;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, alerts = self.alerts.len(), "alert snapshot not persisted");
                self.unpersisted = true;
                Err(e)
            }
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// True when the last snapshot write failed and no later write succeeded.
    pub fn is_unpersisted(&self) -> bool {
        self.unpersisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_timestamp;
    use crate::storage::MemorySink;

    #[test]
    fn test_record_dedups_and_snapshots() {
        let sink = MemorySink::new();
        let mut ledger = AlertLedger::new(Box::new(sink.clone()));

        let a = Alert::critical_burst(parse_timestamp("2025-06-30T12:00:29Z").unwrap());
        let b = Alert::critical_burst(parse_timestamp("2025-06-30T12:05:00Z").unwrap());

        assert!(ledger.record(a.clone()).unwrap());
        assert!(!ledger.record(a.clone()).unwrap());
        assert!(ledger.record(b.clone()).unwrap());

        assert_eq!(ledger.alerts(), &[a.clone(), b.clone()]);
        // Duplicate did not trigger a write.
        assert_eq!(sink.writes(), 2);
        assert_eq!(sink.last_snapshot(), vec![a, b]);
    }

    #[test]
    fn test_failed_write_keeps_alert_and_marks_unpersisted() {
        let sink = MemorySink::new();
        sink.fail_writes(true);
        let mut ledger = AlertLedger::new(Box::new(sink.clone()));

        let a = Alert::critical_burst(parse_timestamp("2025-06-30T12:00:29Z").unwrap());
        assert!(ledger.record(a.clone()).is_err());
        assert_eq!(ledger.alerts().len(), 1);
        assert!(ledger.is_unpersisted());

        sink.fail_writes(false);
        ledger.flush().unwrap();
        assert!(!ledger.is_unpersisted());
        assert_eq!(sink.last_snapshot(), vec![a]);
    }
}
