use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::market::types::Observation;
use crate::stats::reducer::{median, percent_diff, round2};

/// Unrounded per-side statistics. The spread is computed from these so
/// rounding error does not leak into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideStats {
    pub price_median: Decimal,
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub quantity_median: Decimal,
    pub volume_total: Decimal,
}

impl SideStats {
    /// `None` for an empty side: extrema and medians are undefined there.
    /// Also `None` when the quantities do not sum within `Decimal` range.
    pub fn from_observations(observations: &[Observation]) -> Option<Self> {
        let first = observations.first()?;

        let prices: Vec<Decimal> = observations.iter().map(|o| o.price).collect();
        let quantities: Vec<Decimal> = observations.iter().map(|o| o.tradable_quantity).collect();

        let (price_min, price_max) = prices
            .iter()
            .fold((first.price, first.price), |(lo, hi), &p| (lo.min(p), hi.max(p)));

        let Some(volume_total) = quantities
            .iter()
            .try_fold(Decimal::ZERO, |acc, &q| acc.checked_add(q))
        else {
            warn!(count = quantities.len(), "side volume overflows; dropping side");
            return None;
        };

        Some(Self {
            price_median: median(&prices),
            price_min,
            price_max,
            quantity_median: median(&quantities),
            volume_total,
        })
    }

    pub fn finalize(&self) -> SideMetrics {
        SideMetrics {
            price_median: round2(self.price_median),
            price_min: round2(self.price_min),
            price_max: round2(self.price_max),
            quantity_median: round2(self.quantity_median),
            volume_total: round2(self.volume_total),
        }
    }
}

/// Finalized statistics for one side, two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub price_median: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_min: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_max: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_median: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume_total: Decimal,
}

/// Cross-side comparison, buy relative to sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub price_spread_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume_percent: Decimal,
}

impl DiffMetrics {
    pub fn between(buy: &SideStats, sell: &SideStats) -> Self {
        Self {
            price_spread_percent: round2(percent_diff(buy.price_median, sell.price_median)),
            volume_percent: round2(percent_diff(buy.volume_total, sell.volume_total)),
        }
    }
}
