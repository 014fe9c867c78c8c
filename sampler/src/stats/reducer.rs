//! Pure reductions over one side's observations.
//!
//! Nothing here rounds intermediate values; `round2` is applied once when a
//! metric is finalized into `SideMetrics` / `DiffMetrics`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Median of `values`. Even counts average the two central elements.
///
/// Returns zero for an empty slice. Callers that act on the median must
/// check for emptiness themselves.
pub fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let mid = n / 2;

    if n % 2 == 1 {
        sorted[mid]
    } else {
        let (lo, hi) = (sorted[mid - 1], sorted[mid]);
        match lo.checked_add(hi) {
            Some(sum) => sum / Decimal::TWO,
            // Only same-sign pairs overflow, so `hi - lo` is in range.
            None => lo + (hi - lo) / Decimal::TWO,
        }
    }
}

/// `(a - b) / b * 100`. A zero baseline means "no baseline" and yields zero.
pub fn percent_diff(a: Decimal, b: Decimal) -> Decimal {
    if b.is_zero() {
        return Decimal::ZERO;
    }

    a.checked_sub(b)
        .and_then(|d| d.checked_div(b))
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Two decimal places, half away from zero.
pub fn round2(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
