//! Interval-aligned tick loop.
//!
//! Two states, strictly alternating:
//! - Waiting: sleep until the next wall-clock boundary (recomputed every time).
//! - Running: execute one tick to completion.
//!
//! A tick that fails or panics is logged and counted; the loop always returns
//! to Waiting. Shutdown is only honoured between ticks, or after the grace
//! period once a tick has been interrupted.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::logger::{TraceId, tick_span};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::metrics::counters::TickCounters;
use crate::scheduler::boundary::ScheduleState;
use crate::time::Clock;

/// How a completed tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A snapshot was built and the sink accepted it.
    Dispatched,
    /// One or both sides were empty; nothing was built.
    Skipped,
    /// A snapshot was built but the sink reported failure.
    NotPersisted,
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickOutcome::Dispatched => "dispatched",
            TickOutcome::Skipped => "skipped",
            TickOutcome::NotPersisted => "not_persisted",
        }
    }
}

/// The work performed on each boundary.
#[async_trait]
pub trait TickWork: Send + Sync {
    async fn run_tick(&self, now: DateTime<Utc>) -> anyhow::Result<TickOutcome>;
}

pub struct AlignedScheduler<C> {
    clock: C,
    state: ScheduleState,
    grace: Duration,
    counters: TickCounters,
}

impl<C: Clock> AlignedScheduler<C> {
    pub fn new(clock: C, interval_minutes: u32, grace: Duration, counters: TickCounters) -> Self {
        Self {
            clock,
            state: ScheduleState::new(interval_minutes.clamp(1, 60)),
            grace,
            counters,
        }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Runs ticks until `shutdown` is cancelled.
    pub async fn run<W: TickWork>(&mut self, work: &W, shutdown: CancellationToken) {
        info!(
            interval_minutes = self.state.interval_minutes,
            grace_secs = self.grace.as_secs(),
            "aligned scheduler started"
        );

        loop {
            // Waiting
            let now = self.clock.now();
            let fire_at = self.state.next_fire(now);
            let wait = (fire_at - now).to_std().unwrap_or(Duration::ZERO);

            debug!(fire_at = %fire_at, wait_ms = wait.as_millis() as u64, "waiting for next boundary");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested while waiting");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            // Running
            self.state.record_fire(fire_at);
            if !self.execute_tick(work, fire_at, &shutdown).await {
                break;
            }

            if shutdown.is_cancelled() {
                info!("shutdown requested; last tick completed");
                break;
            }
        }

        let totals = self.counters.totals();
        info!(
            ticks_fired = totals.ticks_fired,
            dispatched = totals.snapshots_dispatched,
            skipped = totals.ticks_skipped,
            sink_failures = totals.sink_failures,
            faults = totals.tick_faults,
            "aligned scheduler stopped"
        );
    }

    /// Executes one tick. Returns `false` only when the tick was abandoned
    /// after the shutdown grace period ran out.
    async fn execute_tick<W: TickWork>(
        &self,
        work: &W,
        fire_at: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> bool {
        TickCounters::bump(&self.counters.ticks_fired);

        let trace_id = TraceId::new();
        let span = tick_span(&trace_id, &fire_at.to_rfc3339());
        let now = self.clock.now();

        let tick = AssertUnwindSafe(work.run_tick(now))
            .catch_unwind()
            .instrument(span.clone());
        tokio::pin!(tick);

        let grace = self.grace;
        let result = tokio::select! {
            r = &mut tick => Some(r),
            _ = async {
                shutdown.cancelled().await;
                tokio::time::sleep(grace).await;
            } => None,
        };

        let _entered = span.enter();
        match result {
            Some(Ok(Ok(outcome))) => {
                span.record("outcome", outcome.as_str());
                let counter = match outcome {
                    TickOutcome::Dispatched => &self.counters.snapshots_dispatched,
                    TickOutcome::Skipped => &self.counters.ticks_skipped,
                    TickOutcome::NotPersisted => &self.counters.sink_failures,
                };
                TickCounters::bump(counter);
                info!(outcome = outcome.as_str(), "tick finished");
                true
            }
            Some(Ok(Err(e))) => {
                span.record("outcome", "fault");
                TickCounters::bump(&self.counters.tick_faults);
                error!(error = ?e, "tick failed; waiting for next boundary");
                true
            }
            Some(Err(panic)) => {
                span.record("outcome", "panic");
                TickCounters::bump(&self.counters.tick_faults);
                error!(panic = %panic_message(panic.as_ref()), "tick panicked; waiting for next boundary");
                true
            }
            None => {
                span.record("outcome", "abandoned");
                TickCounters::bump(&self.counters.tick_faults);
                warn!(
                    grace_secs = grace.as_secs(),
                    "in-flight tick abandoned after shutdown grace period"
                );
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use tracing_test::traced_test;

    use crate::time::TokioClock;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, s).unwrap()
    }

    /// Scripted work: per tick, optionally sleep, then return or fail.
    struct ScriptedWork {
        fired: Mutex<Vec<DateTime<Utc>>>,
        script: Mutex<Vec<Step>>,
        stop_after: usize,
        shutdown: CancellationToken,
    }

    #[derive(Clone, Copy)]
    enum Step {
        Ok(Duration),
        Fail,
        Panic,
    }

    impl ScriptedWork {
        fn new(script: Vec<Step>, stop_after: usize, shutdown: CancellationToken) -> Self {
            Self {
                fired: Mutex::new(Vec::new()),
                script: Mutex::new(script),
                stop_after,
                shutdown,
            }
        }

        fn fired(&self) -> Vec<DateTime<Utc>> {
            self.fired.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TickWork for ScriptedWork {
        async fn run_tick(&self, now: DateTime<Utc>) -> anyhow::Result<TickOutcome> {
            let step = {
                let mut fired = self.fired.lock().unwrap();
                fired.push(now);
                if fired.len() >= self.stop_after {
                    self.shutdown.cancel();
                }
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    Step::Ok(Duration::ZERO)
                } else {
                    script.remove(0)
                }
            };

            match step {
                Step::Ok(d) => {
                    tokio::time::sleep(d).await;
                    Ok(TickOutcome::Dispatched)
                }
                Step::Fail => Err(anyhow::anyhow!("store unreachable")),
                Step::Panic => panic!("boom"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_lands_on_boundary_and_overrun_does_not_drift() {
        let shutdown = CancellationToken::new();
        let work = ScriptedWork::new(
            vec![Step::Ok(Duration::from_secs(100)), Step::Ok(Duration::ZERO)],
            3,
            shutdown.clone(),
        );

        let counters = TickCounters::default();
        let mut scheduler = AlignedScheduler::new(
            TokioClock::starting_at(at(12, 3, 27)),
            10,
            Duration::from_secs(5),
            counters.clone(),
        );

        scheduler.run(&work, shutdown).await;

        // 12:10 tick runs until 12:11:40; next fire is still 12:20, not 12:21:40.
        assert_eq!(work.fired(), vec![at(12, 10, 0), at(12, 20, 0), at(12, 30, 0)]);
        assert_eq!(counters.totals().ticks_fired, 3);
        assert_eq!(counters.totals().snapshots_dispatched, 3);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn failing_and_panicking_ticks_do_not_stop_the_loop() {
        let shutdown = CancellationToken::new();
        let work = ScriptedWork::new(vec![Step::Fail, Step::Panic], 3, shutdown.clone());

        let counters = TickCounters::default();
        let mut scheduler = AlignedScheduler::new(
            TokioClock::starting_at(at(8, 0, 1)),
            15,
            Duration::from_secs(5),
            counters.clone(),
        );

        scheduler.run(&work, shutdown).await;

        assert_eq!(work.fired(), vec![at(8, 15, 0), at(8, 30, 0), at(8, 45, 0)]);
        let totals = counters.totals();
        assert_eq!(totals.tick_faults, 2);
        assert_eq!(totals.snapshots_dispatched, 1);
        assert!(logs_contain("tick failed"));
        assert!(logs_contain("tick panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_waiting_fires_nothing() {
        let shutdown = CancellationToken::new();
        let work = ScriptedWork::new(vec![], usize::MAX, shutdown.clone());

        let mut scheduler = AlignedScheduler::new(
            TokioClock::starting_at(at(12, 0, 30)),
            10,
            Duration::from_secs(5),
            TickCounters::default(),
        );

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            canceller.cancel();
        });

        scheduler.run(&work, shutdown).await;

        assert!(work.fired().is_empty());
        assert_eq!(scheduler.state().last_fire, None);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_tick_completes_within_grace() {
        let shutdown = CancellationToken::new();
        // Cancels during the first tick, which still needs 20s to finish.
        let work = ScriptedWork::new(vec![Step::Ok(Duration::from_secs(20))], 1, shutdown.clone());

        let counters = TickCounters::default();
        let mut scheduler = AlignedScheduler::new(
            TokioClock::starting_at(at(12, 9, 0)),
            10,
            Duration::from_secs(30),
            counters.clone(),
        );

        scheduler.run(&work, shutdown).await;

        let totals = counters.totals();
        assert_eq!(totals.ticks_fired, 1);
        assert_eq!(totals.snapshots_dispatched, 1);
        assert_eq!(totals.tick_faults, 0);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn in_flight_tick_is_abandoned_after_grace() {
        let shutdown = CancellationToken::new();
        let work = ScriptedWork::new(vec![Step::Ok(Duration::from_secs(600))], 1, shutdown.clone());

        let counters = TickCounters::default();
        let mut scheduler = AlignedScheduler::new(
            TokioClock::starting_at(at(12, 9, 0)),
            10,
            Duration::from_secs(30),
            counters.clone(),
        );

        scheduler.run(&work, shutdown).await;

        let totals = counters.totals();
        assert_eq!(totals.snapshots_dispatched, 0);
        assert_eq!(totals.tick_faults, 1);
        assert!(logs_contain("abandoned after shutdown grace period"));
    }
}
