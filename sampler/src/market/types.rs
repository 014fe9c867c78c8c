use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

/// Perspective of the order book being sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ad on the first page of a side. Lives only for the duration of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub price: Decimal,
    pub tradable_quantity: Decimal,
}

impl Observation {
    pub fn new(price: Decimal, tradable_quantity: Decimal) -> Self {
        Self {
            price,
            tradable_quantity,
        }
    }
}
