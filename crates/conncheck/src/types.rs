//! Probe result types.

use std::fmt;
use std::time::Duration;

/// Outcome class of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStatus {
    /// Target answered
    Success,
    /// Target did not answer or the tool reported failure
    Failure,
    /// Probe exceeded its time budget
    Timeout,
    /// Probe could not be carried out (missing tool, spawn failure, bad URL)
    Error,
}

impl ProbeStatus {
    /// Tag appended to change headings for failures that are not network failures.
    pub fn infrastructure_tag(&self) -> Option<&'static str> {
        match self {
            ProbeStatus::Timeout => Some("timeout"),
            ProbeStatus::Error => Some("probe error"),
            ProbeStatus::Success | ProbeStatus::Failure => None,
        }
    }

    /// Lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Success => "success",
            ProbeStatus::Failure => "failure",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Success => write!(f, "OK"),
            ProbeStatus::Failure => write!(f, "FAILED"),
            ProbeStatus::Timeout => write!(f, "TIMEOUT"),
            ProbeStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of one probe invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Outcome class
    pub status: ProbeStatus,

    /// Wall time spent on the probe
    pub duration: Duration,

    /// Raw textual output of the probe (stdout and stderr for commands)
    pub output: String,
}

impl ProbeResult {
    /// Create a successful result
    pub fn success(duration: Duration, output: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Success,
            duration,
            output: output.into(),
        }
    }

    /// Create a failed result
    pub fn failure(duration: Duration, output: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Failure,
            duration,
            output: output.into(),
        }
    }

    /// Create a timeout result
    pub fn timeout(duration: Duration) -> Self {
        Self {
            status: ProbeStatus::Timeout,
            duration,
            output: format!("Probe timed out after {}s", duration.as_secs_f64()),
        }
    }

    /// Create an infrastructure error result
    pub fn error(duration: Duration, message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Error,
            duration,
            output: message.into(),
        }
    }

    /// The boolean signal tracked by check groups.
    pub fn is_success(&self) -> bool {
        self.status == ProbeStatus::Success
    }
}
