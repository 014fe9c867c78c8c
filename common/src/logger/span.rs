use std::time::{Duration, Instant};

use tracing::{Span, field};

use super::TraceId;

/// Root span for one scheduler tick.
pub fn tick_span(trace_id: &TraceId, fire_at: &str) -> Span {
    tracing::info_span!(
        "tick",
        trace_id = %trace_id,
        fire_at = %fire_at,
        outcome = field::Empty
    )
}

/// Child span for a single side fetch; inherits the tick's trace id.
pub fn side_span(side: &'static str, trans_amount: u64) -> Span {
    tracing::info_span!(
        "side_fetch",
        side = side,
        trans_amount = trans_amount,
        observations = field::Empty
    )
}

pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
