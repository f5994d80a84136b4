//! Plain-text summary of an analyzed event stream.

use std::fmt::Write;

use crate::detect::{format_time, Alert, EventAnalyzer};
use crate::event::Level;

const BAR_WIDTH: usize = 40;

/// Render totals, the alert list and a per-level histogram.
pub fn format_summary(analyzer: &EventAnalyzer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Event Analysis Report ===");
    let _ = writeln!(out, "Total events:          {}", analyzer.event_count());
    let _ = writeln!(out, "ERROR/CRITICAL events: {}", analyzer.error_or_critical_count());
    let _ = writeln!(out, "Total alerts:          {}", analyzer.alerts().len());
    if analyzer.is_unpersisted() {
        let _ = writeln!(out, "(latest alerts were not written to disk)");
    }
    out.push('\n');

    let _ = writeln!(out, "Alerts:");
    out.push_str(&format_alerts(analyzer.alerts()));
    out.push('\n');

    let _ = writeln!(out, "Events per level:");
    out.push_str(&format_histogram(&analyzer.level_counts()));
    out
}

/// One `- <time> : <details>` line per alert.
pub fn format_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No alerts detected.\n".to_string();
    }
    let mut out = String::new();
    for alert in alerts {
        let _ = writeln!(out, "- {} : {}", format_time(&alert.time), alert.details);
    }
    out
}

/// Horizontal bar chart scaled so the largest bucket spans `BAR_WIDTH`.
pub fn format_histogram(counts: &[(Level, usize)]) -> String {
    let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if max == 0 {
        return "(no events)\n".to_string();
    }
    let label_width = counts
        .iter()
        .map(|(level, _)| level.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (level, n) in counts {
        let bar = (n * BAR_WIDTH).div_ceil(max);
        let _ = writeln!(
            out,
            "{:<width$} | {} {}",
            level.as_str(),
            "#".repeat(bar),
            n,
            width = label_width
        );
    }
    out
}
