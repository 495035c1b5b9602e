//! Rotating check groups.
//!
//! A group owns a fixed pool of interchangeable targets and probes exactly
//! one of them per call, round-robin. It remembers the last result of every
//! target and reports an entry to the change log only when a target's result
//! differs from the previous one (the first probe of a target always counts
//! as a change).

use crate::checkers::Probe;
use crate::report::ChangeLogger;
use crate::types::ProbeResult;
use std::sync::Arc;
use tracing::debug;

/// Render character for a target that answered, not probed this call.
pub const MARK_UP: char = '+';
/// Render character for a failed or never probed target, not probed this call.
pub const MARK_DOWN: char = '_';
/// Render character for the target probed this call, answered.
pub const MARK_PROBED_UP: char = '*';
/// Render character for the target probed this call, failed.
pub const MARK_PROBED_DOWN: char = '-';

/// Round-robin check group
pub struct CheckGroup {
    label: String,
    targets: Vec<String>,
    observed: Vec<Option<bool>>,
    /// Index probed last; `None` before the first probe.
    cursor: Option<usize>,
    probe: Arc<dyn Probe>,
}

impl CheckGroup {
    /// Create a new check group. The target pool must not be empty.
    pub fn new(
        label: impl Into<String>,
        targets: Vec<String>,
        probe: Arc<dyn Probe>,
    ) -> common::Result<Self> {
        let label = label.into();
        if targets.is_empty() {
            return Err(common::Error::probe(format!(
                "check group '{}' has no targets",
                label
            )));
        }

        Ok(Self {
            label,
            observed: vec![None; targets.len()],
            targets,
            cursor: None,
            probe,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Last known result of the target at `index`, `None` if never probed.
    pub fn observed(&self, index: usize) -> Option<bool> {
        self.observed.get(index).copied().flatten()
    }

    fn advance(&mut self) -> usize {
        let next = match self.cursor {
            Some(index) => (index + 1) % self.targets.len(),
            None => 0,
        };
        self.cursor = Some(next);
        next
    }

    fn change_heading(&self, target: &str, result: &ProbeResult) -> String {
        let verdict = if result.is_success() { "OK" } else { "FAILED" };
        match result.status.infrastructure_tag() {
            Some(tag) => format!("{}({}) {} [{}]", self.label, target, verdict, tag),
            None => format!("{}({}) {}", self.label, target, verdict),
        }
    }

    /// Probe the next target and return the render with that target marked.
    pub async fn probe_and_update(&mut self, change_log: &dyn ChangeLogger) -> String {
        let index = self.advance();
        let target = &self.targets[index];
        let result = self.probe.invoke(target).await;
        let success = result.is_success();

        debug!(
            group = %self.label,
            target = %target,
            status = %result.status,
            duration_ms = result.duration.as_millis(),
            "Probe finished"
        );

        if self.observed[index] != Some(success) {
            change_log.log(&self.change_heading(target, &result), &result.output);
            self.observed[index] = Some(success);
        }

        self.render(Some(index))
    }

    /// Render without probing; no target is marked.
    pub fn render_only(&self) -> String {
        self.render(None)
    }

    fn render(&self, probed: Option<usize>) -> String {
        let mut line = String::with_capacity(self.label.len() + 1 + self.targets.len());
        line.push_str(&self.label);
        line.push(':');
        for (index, state) in self.observed.iter().enumerate() {
            let up = *state == Some(true);
            line.push(match (Some(index) == probed, up) {
                (true, true) => MARK_PROBED_UP,
                (true, false) => MARK_PROBED_DOWN,
                (false, true) => MARK_UP,
                (false, false) => MARK_DOWN,
            });
        }
        line
    }

    /// True iff every target has been probed and its last result was success.
    pub fn all_ok(&self) -> bool {
        self.observed.iter().all(|state| *state == Some(true))
    }

    /// True iff at least one target has been probed and every probed target
    /// last failed. Never-probed targets are ignored.
    pub fn all_fail(&self) -> bool {
        let mut known = self.observed.iter().flatten().peekable();
        known.peek().is_some() && known.all(|up| !*up)
    }
}
