//! Text sinks for the change log (stdout) and the status line (stderr).

use crate::metrics::MetricsRegistry;
use chrono::{DateTime, Local};
use conncheck::{ChangeLogger, StatusRecord, StatusReporter};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Indentation of detail lines under a change log heading
const DETAIL_INDENT: &str = "        ";

/// Format one change log entry.
///
/// The heading is prefixed with a local timestamp, every detail line is
/// indented, and the entry ends with a blank line.
pub fn format_entry(timestamp: DateTime<Local>, heading: &str, detail: &str) -> String {
    let mut entry = format!("{} > {}\n", timestamp.format("%y-%m-%d %H:%M:%S"), heading);
    for line in detail.lines() {
        entry.push_str(DETAIL_INDENT);
        entry.push_str(line);
        entry.push('\n');
    }
    entry.push('\n');
    entry
}

fn lock<W>(writer: &Mutex<W>) -> MutexGuard<'_, W> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Change logger writing formatted entries to any writer
pub struct TextChangeLogger<W: Write + Send> {
    writer: Mutex<W>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl TextChangeLogger<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TextChangeLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            metrics: None,
        }
    }

    /// Count every written entry in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume the logger and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> ChangeLogger for TextChangeLogger<W> {
    fn log(&self, heading: &str, detail: &str) {
        let entry = format_entry(Local::now(), heading, detail);
        let mut writer = lock(&self.writer);
        if let Err(e) = writer
            .write_all(entry.as_bytes())
            .and_then(|_| writer.flush())
        {
            warn!(error = %e, heading, "Failed to write change log entry");
            return;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_change_event();
        }
    }
}

/// Status reporter writing one line per tick
pub struct TextStatusReporter<W: Write + Send> {
    writer: Mutex<W>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl TextStatusReporter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TextStatusReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            metrics: None,
        }
    }

    /// Update tick and target gauges in `metrics` on every report
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> StatusReporter for TextStatusReporter<W> {
    fn report(&self, record: &StatusRecord) {
        if let Some(metrics) = &self.metrics {
            for (group, render) in record.slots() {
                metrics.update_group(group, render);
            }
            metrics.record_tick();
        }

        let mut writer = lock(&self.writer);
        if let Err(e) = writeln!(writer, "{}", record).and_then(|_| writer.flush()) {
            warn!(error = %e, "Failed to write status line");
        }
    }
}
