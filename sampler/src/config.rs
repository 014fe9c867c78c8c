use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// What one side search asks the market for. Shared by both sides of a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketQuery {
    pub fiat: String,
    pub asset: String,

    /// Payment methods the ads must accept (`payTypes` upstream).
    pub pay_methods: Vec<String>,

    /// Ads per request. Only the first page is ever fetched, so this also
    /// bounds how many observations a side can contribute.
    pub page_size: u32,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string for the durable snapshot store.
    pub database_url: String,

    /// Scheme and host of the P2P market, without the search path.
    pub base_url: String,

    pub market: MarketQuery,

    // =========================
    // Sampling
    // =========================
    /// Transaction amount (fiat) sent with the BUY side search.
    ///
    /// The two sides probe different ticket sizes on purpose; no ratio
    /// between them is assumed or enforced.
    pub buy_trans_amount: u64,

    /// Transaction amount (fiat) sent with the SELL side search.
    pub sell_trans_amount: u64,

    /// Tick spacing. Ticks land on multiples of this many minutes past the hour.
    pub interval_minutes: u32,

    /// Per-request bound for one side search. A timeout counts as an empty side.
    pub request_timeout: Duration,

    /// How long shutdown waits for an in-flight tick before giving up on it.
    pub shutdown_grace: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let interval_minutes = parse_in_range(&lookup, "P2P_INTERVAL_MINUTES", 15u32, 1..=60)?;
        let page_size = parse_in_range(&lookup, "P2P_PAGE_SIZE", 7u32, 1..=20)?;
        let buy_trans_amount = parse_in_range(&lookup, "P2P_BUY_TRANS_AMOUNT", 32_000u64, 1..=u64::MAX)?;
        let sell_trans_amount = parse_in_range(&lookup, "P2P_SELL_TRANS_AMOUNT", 3_200u64, 1..=u64::MAX)?;
        let timeout_secs = parse_in_range(&lookup, "P2P_REQUEST_TIMEOUT_SECS", 10u64, 1..=300)?;
        let grace_secs = parse_in_range(&lookup, "P2P_SHUTDOWN_GRACE_SECS", 30u64, 0..=3_600)?;

        let pay_methods: Vec<String> = text("P2P_PAY_METHODS", "Banesco")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let fiat = text("P2P_FIAT", "VES").to_uppercase();
        let asset = text("P2P_ASSET", "USDT").to_uppercase();

        Ok(Self {
            database_url: text("DATABASE_URL", "sqlite://p2p_sampler.db?mode=rwc"),
            base_url: text("P2P_BASE_URL", "https://p2p.binance.com"),
            market: MarketQuery {
                fiat,
                asset,
                pay_methods,
                page_size,
            },
            buy_trans_amount,
            sell_trans_amount,
            interval_minutes,
            request_timeout: Duration::from_secs(timeout_secs),
            shutdown_grace: Duration::from_secs(grace_secs),
        })
    }
}

fn parse_in_range<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Copy,
{
    let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };

    let value: T = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: "not a number",
    })?;

    if !range.contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "out of range",
        });
    }

    Ok(value)
}
