use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset};

use crate::detect::{BURST_SIZE, BURST_WINDOW_SECS};

/// The most recent critical timestamps, in insertion order.
///
/// Only the last `BURST_SIZE` entries can ever decide a burst, so older ones
/// are dropped as new critical events arrive.
#[derive(Debug, Default, Clone)]
pub struct CriticalWindow {
    recent: VecDeque<DateTime<FixedOffset>>,
}

impl CriticalWindow {
    pub fn new() -> Self {
        Self {
            recent: VecDeque::with_capacity(BURST_SIZE),
        }
    }

    pub fn push(&mut self, timestamp: DateTime<FixedOffset>) {
        if self.recent.len() == BURST_SIZE {
            self.recent.pop_front();
        }
        self.recent.push_back(timestamp);
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Returns the timestamp of the last critical event when the last
    /// `BURST_SIZE` critical events span at most `BURST_WINDOW_SECS`.
    ///
    /// The span is signed: events that arrive out of chronological order give
    /// a negative span, which is within the window.
    pub fn burst_end(&self) -> Option<DateTime<FixedOffset>> {
        if self.recent.len() < BURST_SIZE {
            return None;
        }
        let first = *self.recent.front()?;
        let last = *self.recent.back()?;
        let span = last.signed_duration_since(first);
        if span <= chrono::Duration::seconds(BURST_WINDOW_SECS) {
            Some(last)
        } else {
            None
        }
    }
}
