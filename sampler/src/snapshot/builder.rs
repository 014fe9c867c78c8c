use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::market::sampler::SideSource;
use crate::market::types::TradeSide;
use crate::snapshot::types::Snapshot;
use crate::stats::{DiffMetrics, SideStats};

/// Turns one fetch per side into a `Snapshot`.
///
/// One call is one attempt: there is no retry inside `build`.
pub struct SnapshotBuilder<S> {
    source: S,
    buy_trans_amount: u64,
    sell_trans_amount: u64,
}

impl<S: SideSource> SnapshotBuilder<S> {
    pub fn new(source: S, buy_trans_amount: u64, sell_trans_amount: u64) -> Self {
        Self {
            source,
            buy_trans_amount,
            sell_trans_amount,
        }
    }

    /// Fetches both sides concurrently and reduces them.
    ///
    /// Returns `None` when either side came back empty; the tick is then
    /// skipped rather than recorded with half the data.
    #[instrument(skip_all, fields(now = %now), level = "debug")]
    pub async fn build(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        let (buy, sell) = tokio::join!(
            self.source.fetch(TradeSide::Buy, self.buy_trans_amount),
            self.source.fetch(TradeSide::Sell, self.sell_trans_amount),
        );

        debug!(buy = buy.len(), sell = sell.len(), "sides fetched");

        let (Some(buy_stats), Some(sell_stats)) = (
            SideStats::from_observations(&buy),
            SideStats::from_observations(&sell),
        ) else {
            info!(
                buy_empty = buy.is_empty(),
                sell_empty = sell.is_empty(),
                "partial tick: one or both sides returned no listings"
            );
            return None;
        };

        Some(Snapshot {
            timestamp: now,
            buy_side: buy_stats.finalize(),
            sell_side: sell_stats.finalize(),
            diff: DiffMetrics::between(&buy_stats, &sell_stats),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::market::types::Observation;

    struct FixedSource {
        buy: Vec<Observation>,
        sell: Vec<Observation>,
        calls: Mutex<Vec<(TradeSide, u64)>>,
    }

    impl FixedSource {
        fn new(buy: Vec<Observation>, sell: Vec<Observation>) -> Self {
            Self {
                buy,
                sell,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SideSource for FixedSource {
        async fn fetch(&self, side: TradeSide, trans_amount: u64) -> Vec<Observation> {
            self.calls.lock().unwrap().push((side, trans_amount));
            match side {
                TradeSide::Buy => self.buy.clone(),
                TradeSide::Sell => self.sell.clone(),
            }
        }
    }

    fn o(price: Decimal, qty: Decimal) -> Observation {
        Observation::new(price, qty)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 10, 0).unwrap()
    }

    #[tokio::test]
    async fn builds_snapshot_from_both_sides() {
        let source = FixedSource::new(
            vec![o(dec!(100), dec!(50)), o(dec!(102), dec!(30))],
            vec![o(dec!(98), dec!(40))],
        );
        let builder = SnapshotBuilder::new(source, 32_000, 3_200);

        let snap = builder.build(noon()).await.expect("snapshot");

        assert_eq!(snap.timestamp, noon());
        assert_eq!(snap.buy_side.price_median, dec!(101));
        assert_eq!(snap.buy_side.price_min, dec!(100));
        assert_eq!(snap.buy_side.price_max, dec!(102));
        assert_eq!(snap.buy_side.quantity_median, dec!(40));
        assert_eq!(snap.buy_side.volume_total, dec!(80));
        assert_eq!(snap.sell_side.price_median, dec!(98));
        assert_eq!(snap.diff.price_spread_percent, dec!(3.06));
        assert_eq!(snap.diff.volume_percent, dec!(100));
    }

    #[tokio::test]
    async fn each_side_gets_its_own_amount() {
        let source = FixedSource::new(vec![o(dec!(1), dec!(1))], vec![o(dec!(1), dec!(1))]);
        let builder = SnapshotBuilder::new(source, 32_000, 3_200);

        builder.build(noon()).await.unwrap();

        let mut calls = builder.source.calls.lock().unwrap().clone();
        calls.sort_by_key(|(side, _)| side.as_str());
        assert_eq!(calls, vec![(TradeSide::Buy, 32_000), (TradeSide::Sell, 3_200)]);
    }

    #[tokio::test]
    async fn empty_buy_side_skips_tick() {
        let source = FixedSource::new(vec![], vec![o(dec!(98), dec!(40))]);
        let builder = SnapshotBuilder::new(source, 1, 1);

        assert!(builder.build(noon()).await.is_none());
    }

    #[tokio::test]
    async fn empty_sell_side_skips_tick() {
        let source = FixedSource::new(vec![o(dec!(98), dec!(40))], vec![]);
        let builder = SnapshotBuilder::new(source, 1, 1);

        assert!(builder.build(noon()).await.is_none());
    }

    #[tokio::test]
    async fn both_sides_empty_skips_tick() {
        let builder = SnapshotBuilder::new(FixedSource::new(vec![], vec![]), 1, 1);
        assert!(builder.build(noon()).await.is_none());
    }

    #[tokio::test]
    async fn snapshot_document_has_expected_shape() {
        let source = FixedSource::new(vec![o(dec!(36.5), dec!(10))], vec![o(dec!(36), dec!(20))]);
        let snap = SnapshotBuilder::new(source, 1, 1).build(noon()).await.unwrap();

        let v = serde_json::to_value(&snap).unwrap();
        let top = v.as_object().unwrap();

        assert_eq!(top.len(), 4);
        assert_eq!(v["timestamp"], "2025-03-14T12:10:00Z");
        assert_eq!(v["buy_side"].as_object().unwrap().len(), 5);
        assert_eq!(v["sell_side"].as_object().unwrap().len(), 5);
        assert_eq!(v["diff"].as_object().unwrap().len(), 2);
        assert_eq!(v["diff"]["volume_percent"], serde_json::json!(-50.0));
    }
}
