//! Connectivity agent
//!
//! Long-running process that watches a host's internet connectivity by
//! rotating through pools of ping, HTTP and speedtest targets.
//!
//! # Outputs
//!
//! - **Change log** (stdout): timestamped entries for every state
//!   transition and every speedtest summary
//! - **Status line** (stderr): one compact line per tick showing every
//!   group's last render
//! - **Metrics** (optional): Prometheus endpoint at `/metrics`
//!
//! # Components
//!
//! - **Config**: YAML configuration with validation
//! - **Agent**: builds probes and groups, drives the scheduler
//! - **Reporter**: text sinks for the change log and status line

pub mod agent;
pub mod config;
pub mod http_server;
pub mod metrics;
pub mod reporter;
pub mod telemetry;

pub use agent::ConnCheckAgent;
pub use config::{Config, ConfigError};
pub use http_server::MetricsServer;
pub use metrics::{InstrumentedProbe, MetricsRegistry};
pub use reporter::{TextChangeLogger, TextStatusReporter, format_entry};
pub use telemetry::{TelemetryGuard, init_telemetry, setup_tracing_with_otel};
