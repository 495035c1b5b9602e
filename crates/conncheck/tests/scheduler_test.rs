//! Integration tests for the tick scheduler

use async_trait::async_trait;
use conncheck::{
    ChangeLogger, CheckGroup, CheckGroups, Probe, ProbeResult, Scheduler, SpeedtestMonitor,
    StatusRecord, StatusReporter,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Probe answering from a script; defaults to success once the script runs out.
#[derive(Default)]
struct ScriptedProbe {
    script: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<String>>,
    output: String,
}

impl ScriptedProbe {
    fn new(script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            ..Default::default()
        })
    }

    fn with_output(output: &str) -> Arc<Self> {
        Arc::new(Self {
            output: output.to_string(),
            ..Default::default()
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn invoke(&self, target: &str) -> ProbeResult {
        self.calls.lock().unwrap().push(target.to_string());
        let up = self.script.lock().unwrap().pop_front().unwrap_or(true);
        if up {
            ProbeResult::success(Duration::from_millis(1), self.output.clone())
        } else {
            ProbeResult::failure(Duration::from_millis(1), "unreachable")
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
struct RecordingLogger {
    headings: Mutex<Vec<String>>,
}

impl ChangeLogger for RecordingLogger {
    fn log(&self, heading: &str, _detail: &str) {
        self.headings.lock().unwrap().push(heading.to_string());
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

struct Harness {
    ping4: Arc<ScriptedProbe>,
    ping6: Arc<ScriptedProbe>,
    ping_dns: Arc<ScriptedProbe>,
    http: Arc<ScriptedProbe>,
    www: Arc<ScriptedProbe>,
    speedtest: Arc<ScriptedProbe>,
    log: Arc<RecordingLogger>,
    reporter: Arc<RecordingReporter>,
}

impl Harness {
    fn new() -> Self {
        Self {
            ping4: ScriptedProbe::new(&[]),
            ping6: ScriptedProbe::new(&[]),
            ping_dns: ScriptedProbe::new(&[]),
            http: ScriptedProbe::new(&[]),
            www: ScriptedProbe::new(&[]),
            speedtest: ScriptedProbe::with_output("Download: 50.00 Mbit/s\nUpload: 10.00 Mbit/s\n"),
            log: Arc::new(RecordingLogger::default()),
            reporter: Arc::new(RecordingReporter::default()),
        }
    }

    fn scheduler(&self) -> Scheduler {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let groups = CheckGroups {
            ping4: CheckGroup::new("ping", names(&["8.8.8.8", "8.8.4.4"]), self.ping4.clone()).unwrap(),
            ping6: CheckGroup::new("ping", names(&["2001:4860:4860::8888"]), self.ping6.clone()).unwrap(),
            ping_dns: CheckGroup::new("ping", names(&["a.example", "b.example", "c.example"]), self.ping_dns.clone())
                .unwrap(),
            http: CheckGroup::new("curl http HEAD", names(&["a.example", "b.example"]), self.http.clone()).unwrap(),
            www: CheckGroup::new("wget", names(&["https://a.example"]), self.www.clone()).unwrap(),
        };
        Scheduler::new(
            groups,
            SpeedtestMonitor::new(self.speedtest.clone()),
            self.log.clone(),
            self.reporter.clone(),
        )
        .with_interval(Duration::from_millis(10))
    }

    fn records(&self) -> Vec<StatusRecord> {
        self.reporter.records.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_first_tick() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();

    scheduler.run_tick().await;

    assert_eq!(harness.ping4.calls(), vec!["8.8.8.8"]);
    assert!(harness.ping6.calls().is_empty());
    assert!(harness.ping_dns.calls().is_empty());
    assert_eq!(harness.http.calls(), vec!["a.example"]);
    assert!(harness.www.calls().is_empty());
    assert_eq!(harness.speedtest.calls().len(), 1);

    let records = harness.records();
    assert_eq!(records.len(), 1);
    let first = &records[0];
    assert_eq!(first.ping4, "ping:*_");
    assert_eq!(first.ping6, "ping:_");
    assert_eq!(first.ping_dns, "ping:___");
    assert_eq!(first.http, "curl http HEAD:*_");
    assert_eq!(first.www, "");

    assert_eq!(
        *harness.log.headings.lock().unwrap(),
        vec!["ping(8.8.8.8) OK", "curl http HEAD(a.example) OK", "Speedtest"]
    );
    assert_eq!(scheduler.tick_counter(), 1);
}

#[tokio::test]
async fn test_idle_slots_carry_over() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();

    for _ in 0..8 {
        scheduler.run_tick().await;
    }

    let records = harness.records();
    // tick 1 re-renders http without the probe mark
    assert_eq!(records[1].http, "curl http HEAD:+_");
    // ticks 2..=4 leave http untouched
    for record in &records[2..=4] {
        assert_eq!(record.http, "curl http HEAD:+_");
        assert_eq!(record.www, "");
    }
    // tick 5 probes www, tick 6 re-renders it, tick 7 carries it over
    assert_eq!(records[5].www, "wget:*");
    assert_eq!(records[6].www, "wget:+");
    assert_eq!(records[7].www, "wget:+");
}

#[tokio::test]
async fn test_ping_groups_rotate() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();

    for _ in 0..9 {
        scheduler.run_tick().await;
    }

    assert_eq!(harness.ping4.calls(), vec!["8.8.8.8", "8.8.4.4", "8.8.8.8"]);
    assert_eq!(harness.ping6.calls().len(), 3);
    assert_eq!(harness.ping_dns.calls(), vec!["a.example", "b.example", "c.example"]);
}

#[tokio::test]
async fn test_rollover_runs_speedtest_and_resets() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();

    for _ in 0..30 {
        scheduler.run_tick().await;
    }
    assert_eq!(scheduler.tick_counter(), 30);
    assert_eq!(harness.speedtest.calls().len(), 1);

    let plan = scheduler.run_tick().await;
    assert!(plan.speedtest);
    assert_eq!(harness.speedtest.calls().len(), 2);
    assert_eq!(scheduler.tick_counter(), 1);

    let headings = harness.log.headings.lock().unwrap();
    assert_eq!(
        headings.last().map(String::as_str),
        Some("Speedtest => Download: 50.00 Mbit/s / Upload: 10.00 Mbit/s")
    );
}

#[tokio::test]
async fn test_transitions_logged_once() {
    let mut harness = Harness::new();
    // ping6 has a single target: up, down, down, up
    harness.ping6 = ScriptedProbe::new(&[true, false, false, true]);
    let mut scheduler = harness.scheduler();

    // ping6 is probed on ticks 1, 4, 7, 10
    for _ in 0..11 {
        scheduler.run_tick().await;
    }

    let headings = harness.log.headings.lock().unwrap();
    let ping6: Vec<&str> = headings
        .iter()
        .map(String::as_str)
        .filter(|h| h.starts_with("ping(2001:"))
        .collect();
    assert_eq!(
        ping6,
        vec![
            "ping(2001:4860:4860::8888) OK",
            "ping(2001:4860:4860::8888) FAILED",
            "ping(2001:4860:4860::8888) OK",
        ]
    );
}

#[tokio::test]
async fn test_run_stops_on_cancellation() {
    let harness = Harness::new();
    let scheduler = harness.scheduler();
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(scheduler.run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(35)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(!harness.records().is_empty());
    let headings = harness.log.headings.lock().unwrap();
    assert!(headings[0].starts_with("Start Internet Connection Logging at "));
}

#[tokio::test]
async fn test_cancelled_before_start_runs_no_tick() {
    let harness = Harness::new();
    let scheduler = harness.scheduler();
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    scheduler.run(shutdown).await;

    assert!(harness.records().is_empty());
    assert!(harness.speedtest.calls().is_empty());
}
