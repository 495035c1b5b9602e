//! Configuration loading and validation for the connectivity agent

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: TargetSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,

    #[serde(default)]
    pub probes: ProbeSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.targets.validate()?;
        self.schedule.validate()?;
        self.probes.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

/// Target pools, one per check group. Order is the probing order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TargetSettings {
    #[validate(length(min = 1), custom = "validate_target_list")]
    pub ipv4: Vec<String>,

    #[validate(length(min = 1), custom = "validate_target_list")]
    pub ipv6: Vec<String>,

    #[validate(length(min = 1), custom = "validate_target_list")]
    pub dns: Vec<String>,

    #[validate(length(min = 1), custom = "validate_target_list")]
    pub http: Vec<String>,

    #[validate(length(min = 1), custom = "validate_target_list")]
    pub www: Vec<String>,
}

/// Tick timing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScheduleSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_tick_interval")]
    pub tick_interval: Duration,
}

/// Probe commands and time budgets
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProbeSettings {
    /// Budget for ping and HTTP probes
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_probe_timeout")]
    pub timeout: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_probe_timeout")]
    pub speedtest_timeout: Duration,

    /// Command template; `{target}` is replaced by the probed host
    #[validate(custom = "validate_command")]
    pub ping: String,

    #[validate(custom = "validate_command")]
    pub speedtest: String,
}

/// Prometheus endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,

    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl LoggingSettings {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

// Default implementations

fn default_dns_hosts() -> Vec<String> {
    [
        "www.google.com",
        "www.wikipedia.org",
        "www.amazon.com",
        "www.whatismyip.com",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

impl Default for TargetSettings {
    fn default() -> Self {
        let dns = default_dns_hosts();
        Self {
            ipv4: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
            ipv6: vec![
                "2001:4860:4860::8888".to_string(),
                "2001:4860:4860::8844".to_string(),
            ],
            http: dns.clone(),
            www: dns.iter().map(|h| format!("https://{}", h)).collect(),
            dns,
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            tick_interval: conncheck::scheduler::TICK_INTERVAL,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            speedtest_timeout: Duration::from_secs(120),
            ping: "ping -c 1 {target}".to_string(),
            speedtest: "speedtest-cli".to_string(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9464".to_string(),
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "conncheck-agent".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

// Custom validators

fn validate_target_list(targets: &[String]) -> Result<(), ValidationError> {
    if targets.iter().any(|t| t.trim().is_empty() || t.contains(char::is_whitespace)) {
        return Err(ValidationError::new("target_invalid"));
    }
    Ok(())
}

fn validate_tick_interval(interval: &Duration) -> Result<(), ValidationError> {
    let secs = interval.as_secs();
    if !(1..=3600).contains(&secs) {
        return Err(ValidationError::new("tick_interval_out_of_range"));
    }
    Ok(())
}

fn validate_probe_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if !(100..=600_000).contains(&millis) {
        return Err(ValidationError::new("probe_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_command(template: &str) -> Result<(), ValidationError> {
    if template.trim().is_empty() {
        return Err(ValidationError::new("command_empty"));
    }
    Ok(())
}

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/conncheck/agent.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./conncheck-agent.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/conncheck/agent.yaml"))
    }
}
