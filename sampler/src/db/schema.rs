use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // One row per snapshot; columns mirror the flat snapshot document.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS snapshots (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  ts_ms BIGINT NOT NULL,
  buy_price_median REAL NOT NULL,
  buy_price_min REAL NOT NULL,
  buy_price_max REAL NOT NULL,
  buy_quantity_median REAL NOT NULL,
  buy_volume_total REAL NOT NULL,
  sell_price_median REAL NOT NULL,
  sell_price_min REAL NOT NULL,
  sell_price_max REAL NOT NULL,
  sell_quantity_median REAL NOT NULL,
  sell_volume_total REAL NOT NULL,
  diff_price_spread_percent REAL NOT NULL,
  diff_volume_percent REAL NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_snapshots_ts ON snapshots(ts_ms);"#)
        .execute(pool)
        .await?;

    Ok(())
}
