// =============================================================================
// Support / Resistance Estimator
// =============================================================================
//
// Combines the pivot point with an ATR distance into an asymmetric band:
//
//   support    = pivot - 1.5 * ATR
//   resistance = pivot + 1.3 * ATR
//
// The asymmetric multipliers are a fixed policy of the stop-placement model,
// not a tunable. Unavailable pivot or ATR yields `None`; a NaN level never
// leaves this function.
// =============================================================================

use crate::indicators::{atr::compute_atr, pivot::compute_pivots};
use crate::market_data::BarSeries;

/// ATR multiplier below the pivot.
pub const SUPPORT_ATR_MULTIPLIER: f64 = 1.5;

/// ATR multiplier above the pivot.
pub const RESISTANCE_ATR_MULTIPLIER: f64 = 1.3;

/// Compute `(support, resistance)` from the series, or `None` when the
/// series is empty or too short for the ATR window.
pub fn compute_support_resistance(series: &BarSeries, atr_period: usize) -> Option<(f64, f64)> {
    let pivot = compute_pivots(series)?.pivot;
    let atr = compute_atr(series, atr_period)?;

    let support = pivot - SUPPORT_ATR_MULTIPLIER * atr;
    let resistance = pivot + RESISTANCE_ATR_MULTIPLIER * atr;

    if support.is_finite() && resistance.is_finite() {
        Some((support, resistance))
    } else {
        None
    }
}
