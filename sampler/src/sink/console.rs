use std::fmt::Write as _;

use async_trait::async_trait;

use crate::sink::{Sink, SinkError};
use crate::snapshot::Snapshot;
use crate::stats::SideMetrics;

/// Prints each snapshot as a small fixed-width table on stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        println!("{}", render_table(&snapshot));
        Ok(())
    }
}

pub fn render_table(s: &Snapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "P2P snapshot @ {}", s.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(
        out,
        "{:<5} | {:>12} | {:>12} | {:>12} | {:>12} | {:>14}",
        "side", "price_med", "price_min", "price_max", "qty_med", "volume"
    );
    let _ = writeln!(out, "{}", "-".repeat(83));
    write_row(&mut out, "BUY", &s.buy_side);
    write_row(&mut out, "SELL", &s.sell_side);
    let _ = write!(
        out,
        "spread: {:.2}%   volume diff: {:.2}%",
        s.diff.price_spread_percent, s.diff.volume_percent
    );

    out
}

fn write_row(out: &mut String, label: &str, m: &SideMetrics) {
    let _ = writeln!(
        out,
        "{:<5} | {:>12.2} | {:>12.2} | {:>12.2} | {:>12.2} | {:>14.2}",
        label, m.price_median, m.price_min, m.price_max, m.quantity_median, m.volume_total
    );
}
