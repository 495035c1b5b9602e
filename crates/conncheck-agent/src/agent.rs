//! Agent assembly: probes, check groups, sinks and the scheduler loop.

use crate::config::Config;
use crate::http_server::MetricsServer;
use crate::metrics::{MetricsRegistry, instrument};
use crate::reporter::{TextChangeLogger, TextStatusReporter};
use conncheck::{
    ChangeLogger, CheckGroup, CheckGroups, CommandProbe, HttpProbe, Probe, Scheduler,
    SpeedtestMonitor, StatusReporter,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Change log label shared by the three ping groups
pub const PING_LABEL: &str = "ping";
/// Change log label of the HTTP HEAD group
pub const HTTP_LABEL: &str = "curl http HEAD";
/// Change log label of the HTTP GET group
pub const WWW_LABEL: &str = "wget";

/// Connectivity agent
pub struct ConnCheckAgent {
    config: Config,
}

impl ConnCheckAgent {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the five check groups from configured pools and probes
    pub fn build_groups(
        &self,
        metrics: Option<&Arc<MetricsRegistry>>,
    ) -> common::Result<CheckGroups> {
        let targets = &self.config.targets;
        let probes = &self.config.probes;

        let ping: Arc<dyn Probe> =
            Arc::new(CommandProbe::from_template(&probes.ping, probes.timeout)?);
        let head: Arc<dyn Probe> = Arc::new(HttpProbe::head(probes.timeout)?);
        let get: Arc<dyn Probe> = Arc::new(HttpProbe::get(probes.timeout)?);

        Ok(CheckGroups {
            ping4: CheckGroup::new(
                PING_LABEL,
                targets.ipv4.clone(),
                instrument(ping.clone(), "ping4", metrics),
            )?,
            ping6: CheckGroup::new(
                PING_LABEL,
                targets.ipv6.clone(),
                instrument(ping.clone(), "ping6", metrics),
            )?,
            ping_dns: CheckGroup::new(
                PING_LABEL,
                targets.dns.clone(),
                instrument(ping, "ping_dns", metrics),
            )?,
            http: CheckGroup::new(
                HTTP_LABEL,
                targets.http.clone(),
                instrument(head, "http", metrics),
            )?,
            www: CheckGroup::new(WWW_LABEL, targets.www.clone(), instrument(get, "www", metrics))?,
        })
    }

    /// Build the speedtest monitor
    pub fn build_speedtest(
        &self,
        metrics: Option<&Arc<MetricsRegistry>>,
    ) -> common::Result<SpeedtestMonitor> {
        let probes = &self.config.probes;
        let probe = CommandProbe::from_template(&probes.speedtest, probes.speedtest_timeout)?;
        Ok(SpeedtestMonitor::new(instrument(Arc::new(probe), "speedtest", metrics)))
    }

    /// Build a scheduler writing to stdout and stderr
    pub fn build_scheduler(
        &self,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> common::Result<Scheduler> {
        let mut change_log = TextChangeLogger::stdout();
        let mut reporter = TextStatusReporter::stderr();
        if let Some(m) = &metrics {
            change_log = change_log.with_metrics(m.clone());
            reporter = reporter.with_metrics(m.clone());
        }

        self.build_scheduler_with(metrics.as_ref(), Arc::new(change_log), Arc::new(reporter))
    }

    /// Build a scheduler writing to the given sinks
    pub fn build_scheduler_with(
        &self,
        metrics: Option<&Arc<MetricsRegistry>>,
        change_log: Arc<dyn ChangeLogger>,
        reporter: Arc<dyn StatusReporter>,
    ) -> common::Result<Scheduler> {
        let groups = self.build_groups(metrics)?;
        let speedtest = self.build_speedtest(metrics)?;
        Ok(Scheduler::new(groups, speedtest, change_log, reporter)
            .with_interval(self.config.schedule.tick_interval))
    }

    /// Run until SIGINT or SIGTERM
    pub async fn run(self) -> common::Result<()> {
        let shutdown = CancellationToken::new();
        tokio::spawn(wait_for_signal(shutdown.clone()));
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` is cancelled
    pub async fn run_until(self, shutdown: CancellationToken) -> common::Result<()> {
        info!("Starting connectivity agent");

        let metrics = if self.config.metrics.enabled {
            info!("Metrics enabled on {}", self.config.metrics.listen_addr);
            Some(Arc::new(MetricsRegistry::new()))
        } else {
            info!("Metrics disabled");
            None
        };

        let scheduler = self.build_scheduler(metrics.clone())?;

        let metrics_handle = metrics.map(|registry| {
            let server = MetricsServer::new(registry, self.config.metrics.listen_addr.clone());
            let token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = server.run(token).await {
                    warn!(error = %e, "Metrics server error");
                }
            })
        });

        scheduler.run(shutdown.clone()).await;

        shutdown.cancel();
        if let Some(handle) = metrics_handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Metrics server task failed");
            }
        }

        info!("Connectivity agent stopped");
        Ok(())
    }
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = term.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received SIGINT");
    }

    shutdown.cancel();
}
