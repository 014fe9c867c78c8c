use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::types::{Observation, TradeSide};

/// Body of one first-page search against the P2P ad listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub fiat: &'a str,
    pub asset: &'a str,
    pub pay_types: &'a [String],
    pub countries: &'a [String],
    pub pro_merchant_ads: bool,
    pub shield_merchant_ads: bool,
    pub publisher_type: Option<&'a str>,
    pub page: u32,
    pub rows: u32,
    pub trade_type: TradeSide,
    pub trans_amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub data: Option<Vec<AdRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct AdRecord {
    pub adv: Adv,
}

/// Only the fields the reducer needs; the listing carries many more.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adv {
    #[serde(default)]
    pub price: Option<String>,

    #[serde(default)]
    pub tradable_quantity: Option<String>,
}

impl AdRecord {
    /// `None` when price or quantity is missing or not a decimal.
    pub fn to_observation(&self) -> Option<Observation> {
        let price = Decimal::from_str(self.adv.price.as_deref()?.trim()).ok()?;
        let quantity = Decimal::from_str(self.adv.tradable_quantity.as_deref()?.trim()).ok()?;
        Some(Observation::new(price, quantity))
    }
}
