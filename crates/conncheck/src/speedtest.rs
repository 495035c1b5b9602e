//! Bandwidth speedtest monitor.

use crate::checkers::Probe;
use crate::report::ChangeLogger;
use std::sync::Arc;
use tracing::{debug, warn};

/// Heading used for speedtest change entries.
pub const SPEEDTEST_HEADING: &str = "Speedtest";

/// Placeholder for a throughput figure missing from the tool output.
pub const MISSING_FIGURE: &str = "n/a";

/// What a speedtest run wrote to the change log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedtestOutcome {
    /// Success state flipped; the full output was logged.
    Transition { success: bool },
    /// Still succeeding; the throughput summary was logged.
    Summary,
    /// Still succeeding but the output lacked throughput figures.
    DegradedSummary,
    /// Still failing; nothing was logged.
    StillFailing,
}

/// Single-target monitor that reports throughput on every successful run.
pub struct SpeedtestMonitor {
    probe: Arc<dyn Probe>,
    succeeded_last_time: bool,
}

impl SpeedtestMonitor {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            succeeded_last_time: false,
        }
    }

    pub fn succeeded_last_time(&self) -> bool {
        self.succeeded_last_time
    }

    /// Run the speedtest once and log according to the state change rules.
    pub async fn run(&mut self, change_log: &dyn ChangeLogger) -> SpeedtestOutcome {
        let result = self.probe.invoke("").await;
        let success = result.is_success();
        debug!(
            status = %result.status,
            duration_ms = result.duration.as_millis(),
            "Speedtest finished"
        );

        if success != self.succeeded_last_time {
            change_log.log(SPEEDTEST_HEADING, &result.output);
            self.succeeded_last_time = success;
            return SpeedtestOutcome::Transition { success };
        }

        if !success {
            return SpeedtestOutcome::StillFailing;
        }

        let figures = throughput_lines(&result.output);
        let heading = summary_heading(&figures);
        if figures.len() < 2 {
            warn!(found = figures.len(), "Speedtest output lacks throughput figures");
            change_log.log(&heading, &result.output);
            SpeedtestOutcome::DegradedSummary
        } else {
            change_log.log(&heading, "");
            SpeedtestOutcome::Summary
        }
    }
}

/// Throughput line prefixes reported by speedtest-cli
const THROUGHPUT_PREFIXES: [&str; 2] = ["Download", "Upload"];

/// First `Download` line and first `Upload` line, in output order.
///
/// A figure missing from the output is simply absent from the result.
pub fn throughput_lines(output: &str) -> Vec<&str> {
    let mut figures: Vec<(usize, &str)> = THROUGHPUT_PREFIXES
        .iter()
        .filter_map(|prefix| {
            output
                .lines()
                .enumerate()
                .find(|(_, line)| line.starts_with(prefix))
        })
        .collect();
    figures.sort_by_key(|(position, _)| *position);
    figures.into_iter().map(|(_, line)| line).collect()
}

fn summary_heading(figures: &[&str]) -> String {
    let first = figures.first().copied().unwrap_or(MISSING_FIGURE);
    let second = figures.get(1).copied().unwrap_or(MISSING_FIGURE);
    format!("{} => {} / {}", SPEEDTEST_HEADING, first, second)
}
