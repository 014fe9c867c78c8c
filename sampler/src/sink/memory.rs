use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sink::{Sink, SinkError};
use crate::snapshot::Snapshot;

/// Buffers snapshots in memory for later batch rendering.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<Snapshot>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.inner.lock().clone()
    }

    /// Takes everything buffered so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Snapshot> {
        std::mem::take(&mut *self.inner.lock())
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        self.inner.lock().push(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::stats::{DiffMetrics, SideMetrics};

    fn snapshot(minute: u32) -> Snapshot {
        let side = SideMetrics {
            price_median: Decimal::TEN,
            price_min: Decimal::TEN,
            price_max: Decimal::TEN,
            quantity_median: Decimal::ONE,
            volume_total: Decimal::ONE,
        };
        Snapshot {
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 12, minute, 0).unwrap(),
            buy_side: side,
            sell_side: side,
            diff: DiffMetrics {
                price_spread_percent: Decimal::ZERO,
                volume_percent: Decimal::ZERO,
            },
        }
    }

    #[tokio::test]
    async fn clones_share_buffer_and_drain_empties_it() {
        let sink = MemorySink::new();
        let reader = sink.clone();

        sink.accept(snapshot(0)).await.unwrap();
        sink.accept(snapshot(15)).await.unwrap();

        assert_eq!(reader.len(), 2);
        let drained = reader.drain();
        assert_eq!(drained[1].timestamp.format("%M").to_string(), "15");
        assert!(sink.is_empty());
    }
}
