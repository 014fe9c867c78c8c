use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal tick counters for operational visibility. Clones share state.
#[derive(Clone, Default, Debug)]
pub struct TickCounters {
    pub ticks_fired: Arc<AtomicU64>,
    pub snapshots_dispatched: Arc<AtomicU64>,

    // non-dispatch outcomes
    pub ticks_skipped: Arc<AtomicU64>,
    pub sink_failures: Arc<AtomicU64>,
    pub tick_faults: Arc<AtomicU64>,
}

/// Point-in-time copy of `TickCounters`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TickTotals {
    pub ticks_fired: u64,
    pub snapshots_dispatched: u64,
    pub ticks_skipped: u64,
    pub sink_failures: u64,
    pub tick_faults: u64,
}

impl TickCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn totals(&self) -> TickTotals {
        TickTotals {
            ticks_fired: self.ticks_fired.load(Ordering::Relaxed),
            snapshots_dispatched: self.snapshots_dispatched.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            tick_faults: self.tick_faults.load(Ordering::Relaxed),
        }
    }
}
