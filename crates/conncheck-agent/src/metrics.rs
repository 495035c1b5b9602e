//! Prometheus metrics for the connectivity agent.

use async_trait::async_trait;
use conncheck::{Probe, ProbeResult, ProbeStatus};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Labels for per-group metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct GroupLabels {
    /// Group name (ping4, ping6, ping_dns, http, www, speedtest)
    pub group: String,
}

/// Labels for probe result metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    /// Group name
    pub group: String,
    /// Result (success, failure, timeout, error)
    pub result: String,
}

/// Metrics registry with all agent metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Probes performed
    probes_total: Family<ProbeLabels, Counter>,
    /// Probe wall time
    probe_duration_seconds: Family<GroupLabels, Histogram>,
    /// Targets whose last probe succeeded
    targets_up: Family<GroupLabels, Gauge>,
    /// Targets in the pool
    targets_total: Family<GroupLabels, Gauge>,
    /// Change log entries written
    change_events_total: Counter,
    /// Ticks completed
    ticks_total: Counter,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<ProbeLabels, Counter>::default();
        registry.register(
            "conncheck_probes",
            "Total probes performed",
            probes_total.clone(),
        );

        // Exponential buckets from 10ms to ~160s, speedtests included
        let probe_duration_seconds =
            Family::<GroupLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.01, 2.0, 15))
            });
        registry.register(
            "conncheck_probe_duration_seconds",
            "Probe duration in seconds",
            probe_duration_seconds.clone(),
        );

        let targets_up = Family::<GroupLabels, Gauge>::default();
        registry.register(
            "conncheck_targets_up",
            "Targets whose last probe succeeded",
            targets_up.clone(),
        );

        let targets_total = Family::<GroupLabels, Gauge>::default();
        registry.register(
            "conncheck_targets",
            "Targets in the group pool",
            targets_total.clone(),
        );

        let change_events_total = Counter::default();
        registry.register(
            "conncheck_change_events",
            "Total change log entries written",
            change_events_total.clone(),
        );

        let ticks_total = Counter::default();
        registry.register(
            "conncheck_ticks",
            "Total scheduler ticks completed",
            ticks_total.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            targets_up,
            targets_total,
            change_events_total,
            ticks_total,
        }
    }

    /// Record a probe result
    pub fn record_probe(&self, group: &str, status: ProbeStatus, duration: Duration) {
        self.probes_total
            .get_or_create(&ProbeLabels {
                group: group.to_string(),
                result: status.as_str().to_string(),
            })
            .inc();

        self.probe_duration_seconds
            .get_or_create(&GroupLabels {
                group: group.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    /// Update the up/total gauges of a group from its render
    pub fn update_group(&self, group: &str, render: &str) {
        let Some((_, marks)) = render.rsplit_once(':') else {
            return;
        };
        let up = marks.chars().filter(|c| *c == '+' || *c == '*').count();
        let labels = GroupLabels {
            group: group.to_string(),
        };

        self.targets_up.get_or_create(&labels).set(up as i64);
        self.targets_total
            .get_or_create(&labels)
            .set(marks.chars().count() as i64);
    }

    /// Record a change log entry
    pub fn record_change_event(&self) {
        self.change_events_total.inc();
    }

    /// Record a completed tick
    pub fn record_tick(&self) {
        self.ticks_total.inc();
    }
}

/// Probe decorator that records every result
pub struct InstrumentedProbe {
    inner: Arc<dyn Probe>,
    group: String,
    metrics: Arc<MetricsRegistry>,
}

impl InstrumentedProbe {
    pub fn new(
        inner: Arc<dyn Probe>,
        group: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            inner,
            group: group.into(),
            metrics,
        }
    }
}

#[async_trait]
impl Probe for InstrumentedProbe {
    async fn invoke(&self, target: &str) -> ProbeResult {
        let result = self.inner.invoke(target).await;
        self.metrics
            .record_probe(&self.group, result.status, result.duration);
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Wrap `probe` with metrics recording when a registry is present
pub fn instrument(
    probe: Arc<dyn Probe>,
    group: &str,
    metrics: Option<&Arc<MetricsRegistry>>,
) -> Arc<dyn Probe> {
    match metrics {
        Some(m) => Arc::new(InstrumentedProbe::new(probe, group, m.clone())),
        None => probe,
    }
}
