//! Connectivity checking with rotating target pools.
//!
//! This crate provides the core of the connectivity agent:
//! - Probe invokers: external commands (ping, speedtest-cli) and native
//!   HTTP HEAD/GET probes
//! - Rotating check groups that probe one target per call and report
//!   state transitions
//! - A speedtest monitor that summarizes throughput on every run
//! - The tick scheduler that decides what runs on every tick
//!
//! # Example
//!
//! ```no_run
//! use conncheck::{CheckGroup, CommandProbe, ChangeLogger};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Stdout;
//!
//! impl ChangeLogger for Stdout {
//!     fn log(&self, heading: &str, detail: &str) {
//!         println!("{heading}\n{detail}");
//!     }
//! }
//!
//! # async fn example() -> common::Result<()> {
//! let probe = Arc::new(CommandProbe::from_template("ping -c 1 {target}", Duration::from_secs(10))?);
//! let mut group = CheckGroup::new("ping", vec!["8.8.8.8".into(), "8.8.4.4".into()], probe)?;
//!
//! let line = group.probe_and_update(&Stdout).await;
//! println!("{line}");
//! # Ok(())
//! # }
//! ```

pub mod checkers;
pub mod group;
pub mod report;
pub mod scheduler;
pub mod speedtest;
pub mod types;

pub use checkers::{CommandProbe, HttpProbe, Probe, StatusPolicy};
pub use group::CheckGroup;
pub use report::{ChangeLogger, StatusRecord, StatusReporter};
pub use scheduler::{Action, CheckGroups, Scheduler, TickPlan, plan};
pub use speedtest::{SpeedtestMonitor, SpeedtestOutcome};
pub use types::{ProbeResult, ProbeStatus};
