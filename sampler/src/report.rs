//! Aggregates stored snapshots into time-of-day and day-of-week averages.

use std::fmt::Write as _;

use chrono::{Datelike, FixedOffset, Timelike, Weekday};
use rust_decimal::Decimal;

use crate::snapshot::Snapshot;
use crate::stats::round2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyRow {
    pub hour: u32,
    pub samples: usize,
    pub avg_spread_percent: Option<Decimal>,
    pub avg_buy_volume: Option<Decimal>,
    pub avg_sell_volume: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdayRow {
    pub weekday: Weekday,
    pub samples: usize,
    pub avg_spread_percent: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub samples: usize,
    /// Always 24 rows, hour 0 first.
    pub hourly: Vec<HourlyRow>,
    /// Always 7 rows, Monday first.
    pub weekdays: Vec<WeekdayRow>,
}

#[derive(Default, Clone, Copy)]
struct Acc {
    n: usize,
    spread: Decimal,
    buy_volume: Decimal,
    sell_volume: Decimal,
}

impl Acc {
    fn add(&mut self, s: &Snapshot) {
        self.n += 1;
        self.spread += s.diff.price_spread_percent;
        self.buy_volume += s.buy_side.volume_total;
        self.sell_volume += s.sell_side.volume_total;
    }

    fn mean(&self, total: Decimal) -> Option<Decimal> {
        if self.n == 0 {
            return None;
        }
        Some(round2(total / Decimal::from(self.n)))
    }
}

/// Groups snapshots by local hour and weekday in the given offset.
pub fn build_report(snapshots: &[Snapshot], offset: FixedOffset) -> Report {
    let mut hours = [Acc::default(); 24];
    let mut days = [Acc::default(); 7];

    for s in snapshots {
        let local = s.timestamp.with_timezone(&offset);
        hours[local.hour() as usize].add(s);
        days[local.weekday().num_days_from_monday() as usize].add(s);
    }

    let hourly = hours
        .iter()
        .enumerate()
        .map(|(h, a)| HourlyRow {
            hour: h as u32,
            samples: a.n,
            avg_spread_percent: a.mean(a.spread),
            avg_buy_volume: a.mean(a.buy_volume),
            avg_sell_volume: a.mean(a.sell_volume),
        })
        .collect();

    let mut weekday = Weekday::Mon;
    let mut weekdays = Vec::with_capacity(7);
    for a in &days {
        weekdays.push(WeekdayRow {
            weekday,
            samples: a.n,
            avg_spread_percent: a.mean(a.spread),
        });
        weekday = weekday.succ();
    }

    Report {
        samples: snapshots.len(),
        hourly,
        weekdays,
    }
}

/// 24h hour to a 12h label: 0 -> "12 AM", 13 -> "1 PM".
pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{hour} AM"),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

pub fn render_report(r: &Report, days: i64) -> String {
    let mut out = String::new();

    if r.samples == 0 {
        let _ = write!(out, "no snapshots in the last {days} days");
        return out;
    }

    let _ = writeln!(out, "{} snapshots over the last {days} days", r.samples);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<6} | {:>7} | {:>10} | {:>12} | {:>12}",
        "hour", "samples", "spread %", "buy volume", "sell volume"
    );
    let _ = writeln!(out, "{}", "-".repeat(59));
    for row in &r.hourly {
        let _ = writeln!(
            out,
            "{:<6} | {:>7} | {:>10} | {:>12} | {:>12}",
            hour_label(row.hour),
            row.samples,
            fmt_opt(row.avg_spread_percent),
            fmt_opt(row.avg_buy_volume),
            fmt_opt(row.avg_sell_volume),
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{:<10} | {:>7} | {:>10}", "weekday", "samples", "spread %");
    let _ = writeln!(out, "{}", "-".repeat(33));
    for row in &r.weekdays {
        let _ = writeln!(
            out,
            "{:<10} | {:>7} | {:>10}",
            format!("{:?}", row.weekday),
            row.samples,
            fmt_opt(row.avg_spread_percent),
        );
    }

    out
}

fn fmt_opt(v: Option<Decimal>) -> String {
    match v {
        Some(d) => format!("{d:.2}"),
        None => "-".to_string(),
    }
}
