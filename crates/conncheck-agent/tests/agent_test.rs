use conncheck::{ChangeLogger, StatusRecord, StatusReporter};
use conncheck_agent::agent::{HTTP_LABEL, PING_LABEL, WWW_LABEL};
use conncheck_agent::metrics::MetricsRegistry;
use conncheck_agent::{Config, ConnCheckAgent};
use prometheus_client::encoding::text::encode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingLogger {
    entries: Mutex<Vec<String>>,
}

impl ChangeLogger for RecordingLogger {
    fn log(&self, heading: &str, _detail: &str) {
        self.entries.lock().unwrap().push(heading.to_string());
    }
}

#[derive(Default)]
struct RecordingReporter {
    records: Mutex<Vec<StatusRecord>>,
}

impl StatusReporter for RecordingReporter {
    fn report(&self, record: &StatusRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

#[test]
fn test_groups_follow_configured_pools() {
    let agent = ConnCheckAgent::new(Config::default());
    let groups = agent.build_groups(None).unwrap();
    let targets = &agent.config().targets;

    assert_eq!(groups.ping4.label(), PING_LABEL);
    assert_eq!(groups.ping6.label(), PING_LABEL);
    assert_eq!(groups.ping_dns.label(), PING_LABEL);
    assert_eq!(groups.http.label(), HTTP_LABEL);
    assert_eq!(groups.www.label(), WWW_LABEL);

    assert_eq!(groups.ping4.targets(), targets.ipv4.as_slice());
    assert_eq!(groups.ping6.targets(), targets.ipv6.as_slice());
    assert_eq!(groups.ping_dns.targets(), targets.dns.as_slice());
    assert_eq!(groups.http.targets(), targets.http.as_slice());
    assert_eq!(groups.www.targets(), targets.www.as_slice());
}

#[test]
fn test_scheduler_uses_configured_interval() {
    let config = Config::from_yaml("schedule:\n  tick_interval: 45s\n").unwrap();
    let agent = ConnCheckAgent::new(config);

    let scheduler = agent
        .build_scheduler_with(
            None,
            Arc::new(RecordingLogger::default()),
            Arc::new(RecordingReporter::default()),
        )
        .unwrap();

    assert_eq!(scheduler.interval(), Duration::from_secs(45));
    assert_eq!(scheduler.tick_counter(), 0);
}

#[test]
fn test_empty_ping_template_is_rejected() {
    let mut config = Config::default();
    config.probes.ping = "   ".to_string();
    let agent = ConnCheckAgent::new(config);

    assert!(agent.build_groups(None).is_err());
}

#[tokio::test]
async fn test_cancelled_scheduler_only_logs_banner() {
    let agent = ConnCheckAgent::new(Config::default());
    let logger = Arc::new(RecordingLogger::default());
    let reporter = Arc::new(RecordingReporter::default());
    let scheduler = agent
        .build_scheduler_with(None, logger.clone(), reporter.clone())
        .unwrap();

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    scheduler.run(shutdown).await;

    let entries = logger.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("Start Internet Connection Logging at "));
    assert!(reporter.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_until_with_metrics_stops_on_cancel() {
    let mut config = Config::default();
    config.metrics.enabled = true;
    config.metrics.listen_addr = "127.0.0.1:0".to_string();
    let agent = ConnCheckAgent::new(config);

    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), agent.run_until(shutdown))
        .await
        .unwrap();
    tokio_test::assert_ok!(result);
}

#[cfg(unix)]
#[tokio::test]
async fn test_instrumented_groups_record_into_registry() {
    let registry = Arc::new(MetricsRegistry::new());
    let mut config = Config::default();
    config.probes.ping = "false {target}".to_string();
    let agent = ConnCheckAgent::new(config);

    let mut groups = agent.build_groups(Some(&registry)).unwrap();
    let logger = RecordingLogger::default();
    let render = groups.ping6.probe_and_update(&logger).await;
    assert_eq!(render, "ping:-_");

    let mut text = String::new();
    encode(&mut text, &registry.registry).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&r#"conncheck_probes_total{group="ping6",result="failure"} 1"#));
    assert!(!text.contains(r#"group="ping4""#));
}
