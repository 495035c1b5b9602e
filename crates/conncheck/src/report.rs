//! Output seams: change log entries and per-tick status records.

use chrono::{DateTime, Local, SecondsFormat};
use std::fmt;

/// Sink for state transitions and other noteworthy events
pub trait ChangeLogger: Send + Sync {
    /// Write one entry: a heading and an optional multi-line detail block.
    fn log(&self, heading: &str, detail: &str);
}

/// Sink for the compact per-tick status line
pub trait StatusReporter: Send + Sync {
    fn report(&self, record: &StatusRecord);
}

/// Aggregated renders of all check groups at the end of a tick.
///
/// A slot that was never computed holds the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub timestamp: DateTime<Local>,
    pub ping4: String,
    pub ping6: String,
    pub ping_dns: String,
    pub http: String,
    pub www: String,
}

impl StatusRecord {
    pub fn new(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            ping4: String::new(),
            ping6: String::new(),
            ping_dns: String::new(),
            http: String::new(),
            www: String::new(),
        }
    }

    /// Group slots in status line order, keyed by group name.
    pub fn slots(&self) -> [(&'static str, &str); 5] {
        [
            ("ping4", &self.ping4),
            ("ping6", &self.ping6),
            ("ping_dns", &self.ping_dns),
            ("http", &self.http),
            ("www", &self.www),
        ]
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
        )?;
        for (_, render) in self.slots() {
            write!(f, " {}", render)?;
        }
        Ok(())
    }
}
