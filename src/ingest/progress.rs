//! Terminal progress display: a spinner task and a processed-event counter.
//!
//! The spinner shares nothing with the pipeline except the one-shot signal
//! that stops it.

use std::io::Write;
use std::time::Duration;

use tokio::sync::oneshot;

use super::ProgressObserver;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];

pub const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

/// Redraw the spinner every `interval` until `done` fires (or its sender is
/// dropped), then print the completion line. Returns the writer.
pub async fn run_spinner<W: Write>(
    mut out: W,
    mut done: oneshot::Receiver<()>,
    interval: Duration,
) -> W {
    let mut frames = FRAMES.iter().cycle();
    loop {
        if let Some(c) = frames.next() {
            let _ = write!(out, "\r Processing... {c}");
            let _ = out.flush();
        }
        tokio::select! {
            _ = &mut done => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    let _ = writeln!(out, "\r Processing complete.            ");
    let _ = out.flush();
    out
}

/// Rewrites a single "events processed" line on every update.
pub struct CounterDisplay<W: Write> {
    out: W,
}

impl<W: Write> CounterDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressObserver for CounterDisplay<W> {
    fn on_progress(&mut self, processed: usize) {
        let _ = write!(self.out, "\rEvents processed: {processed}");
        let _ = self.out.flush();
    }
}
