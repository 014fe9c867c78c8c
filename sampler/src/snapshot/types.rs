use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::{DiffMetrics, SideMetrics};

/// Result of one successful tick.
///
/// Serializes to the flat document downstream reporting reads:
/// `{timestamp, buy_side: {..5 fields}, sell_side: {..5 fields}, diff: {..2 fields}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub buy_side: SideMetrics,
    pub sell_side: SideMetrics,
    pub diff: DiffMetrics,
}
