use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::{AnyPool, Row};
use tracing::{debug, warn};

use crate::sink::{Sink, SinkError};
use crate::snapshot::Snapshot;
use crate::stats::{DiffMetrics, SideMetrics, round2};

/// SQLx-backed durable sink. `accept` returns only after the insert is done.
#[derive(Clone)]
pub struct SqlxSnapshotStore {
    pool: Arc<AnyPool>,
}

impl SqlxSnapshotStore {
    pub fn new(pool: Arc<AnyPool>) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, s: &Snapshot) -> Result<(), SinkError> {
        let result = sqlx::query(
            r#"
INSERT INTO snapshots (
  ts_ms,
  buy_price_median, buy_price_min, buy_price_max, buy_quantity_median, buy_volume_total,
  sell_price_median, sell_price_min, sell_price_max, sell_quantity_median, sell_volume_total,
  diff_price_spread_percent, diff_volume_percent
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(s.timestamp.timestamp_millis())
        .bind(to_f64(s.buy_side.price_median)?)
        .bind(to_f64(s.buy_side.price_min)?)
        .bind(to_f64(s.buy_side.price_max)?)
        .bind(to_f64(s.buy_side.quantity_median)?)
        .bind(to_f64(s.buy_side.volume_total)?)
        .bind(to_f64(s.sell_side.price_median)?)
        .bind(to_f64(s.sell_side.price_min)?)
        .bind(to_f64(s.sell_side.price_max)?)
        .bind(to_f64(s.sell_side.quantity_median)?)
        .bind(to_f64(s.sell_side.volume_total)?)
        .bind(to_f64(s.diff.price_spread_percent)?)
        .bind(to_f64(s.diff.volume_percent)?)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() != 1 {
            return Err(SinkError::Rejected(format!(
                "expected 1 row inserted, got {}",
                result.rows_affected()
            )));
        }

        Ok(())
    }

    /// Snapshots with `timestamp >= since`, oldest first.
    pub async fn fetch_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Snapshot>> {
        let rows = sqlx::query(
            r#"
SELECT
  ts_ms,
  buy_price_median, buy_price_min, buy_price_max, buy_quantity_median, buy_volume_total,
  sell_price_median, sell_price_min, sell_price_max, sell_quantity_median, sell_volume_total,
  diff_price_spread_percent, diff_volume_percent
FROM snapshots
WHERE ts_ms >= ?
ORDER BY ts_ms ASC;
"#,
        )
        .bind(since.timestamp_millis())
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_snapshot(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the report
                    warn!(error = %e, "skipping malformed snapshot row");
                }
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl Sink for SqlxSnapshotStore {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        self.insert(&snapshot).await?;
        debug!(ts = %snapshot.timestamp, "snapshot persisted");
        Ok(())
    }
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_snapshot(r: &sqlx::any::AnyRow) -> anyhow::Result<Snapshot> {
    let ts_ms: i64 = r.try_get("ts_ms")?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .with_context(|| format!("timestamp out of range: {ts_ms}"))?;

    Ok(Snapshot {
        timestamp,
        buy_side: side_from_row(r, "buy")?,
        sell_side: side_from_row(r, "sell")?,
        diff: DiffMetrics {
            price_spread_percent: dec_col(r, "diff_price_spread_percent")?,
            volume_percent: dec_col(r, "diff_volume_percent")?,
        },
    })
}

fn side_from_row(r: &sqlx::any::AnyRow, prefix: &str) -> anyhow::Result<SideMetrics> {
    Ok(SideMetrics {
        price_median: dec_col(r, &format!("{prefix}_price_median"))?,
        price_min: dec_col(r, &format!("{prefix}_price_min"))?,
        price_max: dec_col(r, &format!("{prefix}_price_max"))?,
        quantity_median: dec_col(r, &format!("{prefix}_quantity_median"))?,
        volume_total: dec_col(r, &format!("{prefix}_volume_total"))?,
    })
}

/// Stored values are already two-decimal; re-rounding strips binary float noise.
fn dec_col(r: &sqlx::any::AnyRow, col: &str) -> anyhow::Result<Decimal> {
    let v: f64 = r.try_get(col)?;
    let d = Decimal::from_f64_retain(v).with_context(|| format!("{col} is not finite: {v}"))?;
    Ok(round2(d))
}

fn to_f64(d: Decimal) -> Result<f64, SinkError> {
    d.to_f64()
        .ok_or_else(|| SinkError::Rejected(format!("value not representable as REAL: {d}")))
}
