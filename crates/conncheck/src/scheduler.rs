//! Tick scheduler.
//!
//! Every tick runs three independent dispatches keyed off the tick counter:
//! the ping groups rotate with period 3, the HTTP groups with period 10 and
//! the speedtest with period 30. The speedtest tick also resets the counter.
//! Probes run strictly one after another.

use crate::group::CheckGroup;
use crate::report::{ChangeLogger, StatusRecord, StatusReporter};
use crate::speedtest::SpeedtestMonitor;
use chrono::{Local, SecondsFormat};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default wall-clock length of one tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(120);
/// Ping groups take turns over this many ticks.
pub const PING_ROTATION: u64 = 3;
/// HTTP groups cycle over this many ticks.
pub const HTTP_ROTATION: u64 = 10;
/// Speedtest cadence; the tick counter resets on this boundary.
pub const ROLLOVER_PERIOD: u64 = 30;

/// What a group does on a given tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Probe one target and refresh the render.
    Probe,
    /// Refresh the render without probing.
    Render,
    /// Leave the previous render in place.
    Idle,
}

/// Per-group actions for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub ping4: Action,
    pub ping6: Action,
    pub ping_dns: Action,
    pub http: Action,
    pub www: Action,
    pub speedtest: bool,
}

/// Decide what runs on tick `tick`.
pub fn plan(tick: u64) -> TickPlan {
    use Action::{Idle, Probe, Render};

    let (ping4, ping6, ping_dns) = match tick % PING_ROTATION {
        0 => (Probe, Render, Render),
        1 => (Render, Probe, Render),
        _ => (Render, Render, Probe),
    };

    let (http, www) = match tick % HTTP_ROTATION {
        0 => (Probe, Idle),
        1 => (Render, Idle),
        5 => (Idle, Probe),
        6 => (Idle, Render),
        _ => (Idle, Idle),
    };

    TickPlan {
        ping4,
        ping6,
        ping_dns,
        http,
        www,
        speedtest: tick % ROLLOVER_PERIOD == 0,
    }
}

/// The five rotating groups driven by the scheduler
pub struct CheckGroups {
    pub ping4: CheckGroup,
    pub ping6: CheckGroup,
    pub ping_dns: CheckGroup,
    pub http: CheckGroup,
    pub www: CheckGroup,
}

async fn dispatch(
    group: &mut CheckGroup,
    action: Action,
    slot: &mut String,
    change_log: &dyn ChangeLogger,
) {
    match action {
        Action::Probe => {
            *slot = group.probe_and_update(change_log).await;
            debug!(
                group = %group.label(),
                all_ok = group.all_ok(),
                all_fail = group.all_fail(),
                "Group probed"
            );
        }
        Action::Render => *slot = group.render_only(),
        Action::Idle => {}
    }
}

/// Sequential polling loop over all check groups and the speedtest
pub struct Scheduler {
    groups: CheckGroups,
    speedtest: SpeedtestMonitor,
    change_log: Arc<dyn ChangeLogger>,
    reporter: Arc<dyn StatusReporter>,
    interval: Duration,
    tick: u64,
    status: StatusRecord,
}

impl Scheduler {
    /// Create a new scheduler with the default tick interval
    pub fn new(
        groups: CheckGroups,
        speedtest: SpeedtestMonitor,
        change_log: Arc<dyn ChangeLogger>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            groups,
            speedtest,
            change_log,
            reporter,
            interval: TICK_INTERVAL,
            tick: 0,
            status: StatusRecord::new(Local::now()),
        }
    }

    /// Override the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick counter value the next tick will be planned with.
    pub fn tick_counter(&self) -> u64 {
        self.tick
    }

    /// Status record emitted by the last tick.
    pub fn status(&self) -> &StatusRecord {
        &self.status
    }

    pub fn groups(&self) -> &CheckGroups {
        &self.groups
    }

    pub fn speedtest(&self) -> &SpeedtestMonitor {
        &self.speedtest
    }

    /// Execute one tick without sleeping and return the plan that ran.
    pub async fn run_tick(&mut self) -> TickPlan {
        let plan = plan(self.tick);
        let change_log = self.change_log.as_ref();
        debug!(tick = self.tick, ?plan, "Running tick");

        dispatch(&mut self.groups.ping4, plan.ping4, &mut self.status.ping4, change_log).await;
        dispatch(&mut self.groups.ping6, plan.ping6, &mut self.status.ping6, change_log).await;
        dispatch(
            &mut self.groups.ping_dns,
            plan.ping_dns,
            &mut self.status.ping_dns,
            change_log,
        )
        .await;
        dispatch(&mut self.groups.http, plan.http, &mut self.status.http, change_log).await;
        dispatch(&mut self.groups.www, plan.www, &mut self.status.www, change_log).await;

        if plan.speedtest {
            let outcome = self.speedtest.run(change_log).await;
            debug!(?outcome, "Speedtest ran, resetting tick counter");
            self.tick = 0;
        }

        self.status.timestamp = Local::now();
        self.reporter.report(&self.status);

        self.tick += 1;
        plan
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Cancellation is checked before every tick and interrupts the sleep
    /// between ticks. A probe already in flight runs to completion.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        self.change_log.log(
            &format!(
                "Start Internet Connection Logging at {}",
                Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
            ),
            "",
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.run_tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Action::{Idle, Probe, Render};

    #[test]
    fn test_plan_tick_zero() {
        assert_eq!(
            plan(0),
            TickPlan {
                ping4: Probe,
                ping6: Render,
                ping_dns: Render,
                http: Probe,
                www: Idle,
                speedtest: true,
            }
        );
    }

    #[test]
    fn test_plan_full_cycle() {
        for tick in 0..ROLLOVER_PERIOD {
            let p = plan(tick);

            let pings = [p.ping4, p.ping6, p.ping_dns];
            let probing = (tick % 3) as usize;
            for (index, action) in pings.iter().enumerate() {
                let expected = if index == probing { Probe } else { Render };
                assert_eq!(*action, expected, "ping slot {} at tick {}", index, tick);
            }

            let (http, www) = match tick % 10 {
                0 => (Probe, Idle),
                1 => (Render, Idle),
                5 => (Idle, Probe),
                6 => (Idle, Render),
                _ => (Idle, Idle),
            };
            assert_eq!(p.http, http, "http at tick {}", tick);
            assert_eq!(p.www, www, "www at tick {}", tick);
            assert_eq!(p.speedtest, tick == 0, "speedtest at tick {}", tick);
        }
    }

    #[test]
    fn test_rollover_tick_matches_tick_zero() {
        assert_eq!(plan(ROLLOVER_PERIOD), plan(0));
    }

    #[test]
    fn test_probe_counts_per_cycle() {
        let plans: Vec<TickPlan> = (0..ROLLOVER_PERIOD).map(plan).collect();
        let count = |f: fn(&TickPlan) -> Action| plans.iter().filter(|p| f(p) == Probe).count();

        assert_eq!(count(|p| p.ping4), 10);
        assert_eq!(count(|p| p.ping6), 10);
        assert_eq!(count(|p| p.ping_dns), 10);
        assert_eq!(count(|p| p.http), 3);
        assert_eq!(count(|p| p.www), 3);
        assert_eq!(plans.iter().filter(|p| p.speedtest).count(), 1);
    }
}
