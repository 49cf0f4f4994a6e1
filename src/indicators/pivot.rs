// =============================================================================
// Classic Pivot Points
// =============================================================================
//
// Floor-trader pivot levels from the most recent completed bar:
//
//   pivot = (H + L + C) / 3
//   r1 = 2*pivot - L        s1 = 2*pivot - H
//   r2 = pivot + (H - L)    s2 = pivot - (H - L)
//
// Only `pivot` feeds the support/resistance estimator; r1/s1/r2/s2 are
// informational outputs surfaced for charting parity.
// =============================================================================

use serde::Serialize;

use crate::market_data::BarSeries;

/// The full pivot ladder computed from a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub s1: f64,
    pub r2: f64,
    pub s2: f64,
}

/// Compute pivot levels from the most recent bar of `series`.
///
/// Returns `None` on an empty series.
pub fn compute_pivots(series: &BarSeries) -> Option<PivotLevels> {
    if series.is_empty() {
        return None;
    }

    let last = series.len() - 1;
    let high = series.highs()[last];
    let low = series.lows()[last];
    let close = series.closes()[last];

    let pivot = (high + low + close) / 3.0;
    Some(PivotLevels {
        pivot,
        r1: 2.0 * pivot - low,
        s1: 2.0 * pivot - high,
        r2: pivot + (high - low),
        s2: pivot - (high - low),
    })
}
