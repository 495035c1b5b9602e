//! Probe implementations.

use crate::types::ProbeResult;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Placeholder replaced by the probed target in command templates.
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Probe invoker trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probe one target. Never fails: problems are reported through the result status.
    async fn invoke(&self, target: &str) -> ProbeResult;

    /// Get the name of this probe
    fn name(&self) -> &'static str;
}

/// Probe that runs an external command and reports its exit status
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    timeout_duration: Duration,
}

impl CommandProbe {
    /// Create a new command probe
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout_duration: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout_duration,
        }
    }

    /// Build a probe from a whitespace separated command line such as
    /// `ping -c 1 {target}`.
    pub fn from_template(template: &str, timeout_duration: Duration) -> common::Result<Self> {
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| common::Error::config("empty probe command"))?;
        Ok(Self::new(program, words.collect(), timeout_duration))
    }

    /// Arguments with the target substituted.
    pub fn args_for(&self, target: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(TARGET_PLACEHOLDER, target))
            .collect()
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Concatenate stdout and stderr the way `2>&1` would for tools that write
/// one of them at a time.
fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(stderr));
    text
}

#[async_trait]
impl Probe for CommandProbe {
    async fn invoke(&self, target: &str) -> ProbeResult {
        let start = Instant::now();

        let mut command = Command::new(&self.program);
        command
            .args(self.args_for(target))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match timeout(self.timeout_duration, command.output()).await {
            Ok(Ok(output)) => {
                let duration = start.elapsed();
                let text = combined_output(&output.stdout, &output.stderr);
                if output.status.success() {
                    debug!(
                        program = %self.program,
                        target = %target,
                        duration_ms = duration.as_millis(),
                        "Probe command succeeded"
                    );
                    ProbeResult::success(duration, text)
                } else {
                    debug!(
                        program = %self.program,
                        target = %target,
                        status = %output.status,
                        "Probe command failed"
                    );
                    ProbeResult::failure(duration, text)
                }
            }
            Ok(Err(e)) => {
                let duration = start.elapsed();
                warn!(
                    program = %self.program,
                    target = %target,
                    error = %e,
                    "Failed to run probe command"
                );
                ProbeResult::error(duration, format!("Failed to run {}: {}", self.program, e))
            }
            Err(_) => {
                let duration = start.elapsed();
                warn!(program = %self.program, target = %target, "Probe command timed out");
                ProbeResult::timeout(duration)
            }
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Which HTTP responses count as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Any HTTP response means the target is reachable (curl without `--fail`)
    AnyResponse,
    /// Only 2xx after redirects counts (wget)
    SuccessOnly,
}

/// HTTP probe issuing HEAD or GET requests
pub struct HttpProbe {
    method: reqwest::Method,
    policy: StatusPolicy,
    timeout_duration: Duration,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Create a new HTTP probe
    pub fn new(
        method: reqwest::Method,
        policy: StatusPolicy,
        timeout_duration: Duration,
    ) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(common::Error::probe)?;

        Ok(Self {
            method,
            policy,
            timeout_duration,
            client,
        })
    }

    /// HEAD probe, any response counts as reachable.
    pub fn head(timeout_duration: Duration) -> common::Result<Self> {
        Self::new(reqwest::Method::HEAD, StatusPolicy::AnyResponse, timeout_duration)
    }

    /// Full GET probe, only successful responses count.
    pub fn get(timeout_duration: Duration) -> common::Result<Self> {
        Self::new(reqwest::Method::GET, StatusPolicy::SuccessOnly, timeout_duration)
    }

    fn accepts(&self, status: reqwest::StatusCode) -> bool {
        match self.policy {
            StatusPolicy::AnyResponse => true,
            StatusPolicy::SuccessOnly => status.is_success(),
        }
    }
}

/// Bare host names are probed over plain http, like curl does.
pub fn normalize_url(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

/// Render an error with its source chain on one line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

struct HttpReply {
    version: reqwest::Version,
    status: reqwest::StatusCode,
    headers: String,
    body_len: Option<usize>,
}

impl HttpReply {
    fn describe(&self) -> String {
        let mut text = format!("{:?} {}\n{}", self.version, self.status, self.headers);
        if let Some(len) = self.body_len {
            text.push_str(&format!("{} bytes received\n", len));
        }
        text
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn invoke(&self, target: &str) -> ProbeResult {
        let start = Instant::now();
        let url = normalize_url(target);

        let exchange = async {
            let response = self.client.request(self.method.clone(), &url).send().await?;
            let version = response.version();
            let status = response.status();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    format!("{}: {}\n", name, String::from_utf8_lossy(value.as_bytes()))
                })
                .collect::<String>();
            let body_len = if self.method == reqwest::Method::GET {
                Some(response.bytes().await?.len())
            } else {
                None
            };
            Ok::<_, reqwest::Error>(HttpReply {
                version,
                status,
                headers,
                body_len,
            })
        };

        match timeout(self.timeout_duration, exchange).await {
            Ok(Ok(reply)) => {
                let duration = start.elapsed();
                if self.accepts(reply.status) {
                    debug!(
                        url = %url,
                        status = reply.status.as_u16(),
                        duration_ms = duration.as_millis(),
                        "HTTP probe successful"
                    );
                    ProbeResult::success(duration, reply.describe())
                } else {
                    debug!(
                        url = %url,
                        status = reply.status.as_u16(),
                        "HTTP probe failed: unexpected status code"
                    );
                    ProbeResult::failure(duration, reply.describe())
                }
            }
            Ok(Err(e)) if e.is_builder() => {
                let duration = start.elapsed();
                warn!(url = %url, error = %e, "Invalid HTTP probe target");
                ProbeResult::error(duration, error_chain(&e))
            }
            Ok(Err(e)) if e.is_timeout() => {
                let duration = start.elapsed();
                warn!(url = %url, "HTTP probe timed out");
                ProbeResult::timeout(duration)
            }
            Ok(Err(e)) => {
                let duration = start.elapsed();
                debug!(url = %url, error = %e, "HTTP probe failed");
                ProbeResult::failure(duration, error_chain(&e))
            }
            Err(_) => {
                let duration = start.elapsed();
                warn!(url = %url, "HTTP probe timed out");
                ProbeResult::timeout(duration)
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
