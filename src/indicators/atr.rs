// =============================================================================
// Average True Range (ATR): arithmetic mean of the true-range window
// =============================================================================
//
// ATR condenses recent volatility into a single price distance.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// This estimator takes the plain arithmetic mean of the last `period` TR
// values. No Wilder smoothing: the stop-distance policy built on top of it
// expects the unsmoothed window mean.
//
// Default period: 14
// =============================================================================

use crate::market_data::BarSeries;

/// Compute the ATR over the most recent `period` true ranges.
///
/// # Arguments
/// - `series` - OHLCV series, oldest first.
/// - `period` - number of true-range values to average.
///
/// # Returns
/// `None` when:
/// - `period` is zero.
/// - There are fewer than `period + 1` bars (each TR needs a previous close).
/// - Any intermediate value is non-finite.
pub fn compute_atr(series: &BarSeries, period: usize) -> Option<f64> {
    if period == 0 || series.len() < period + 1 {
        return None;
    }

    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();

    // Window covers the last `period` bars plus the bar before them.
    let start = series.len() - period;

    let mut sum = 0.0;
    for i in start..series.len() {
        let prev_close = closes[i - 1];
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - prev_close).abs();
        let lc = (lows[i] - prev_close).abs();
        // f64::max ignores NaN, so a poisoned bar must be caught here or it
        // would yield a finite but wrong average.
        if !hl.is_finite() || !hc.is_finite() || !lc.is_finite() {
            return None;
        }
        sum += hl.max(hc).max(lc);
    }

    let atr = sum / period as f64;
    if atr.is_finite() {
        Some(atr)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;

    /// Build a test bar with the given OHLC values.
    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            time: 0,
            open,
            high,
            low,
            close,
            tick_volume: Some(1000.0),
        }
    }

    fn series(bars: &[Bar]) -> BarSeries {
        BarSeries::from_bars(bars)
    }

    #[test]
    fn atr_period_zero() {
        let bars = vec![bar(100.0, 105.0, 95.0, 102.0); 20];
        assert!(compute_atr(&series(&bars), 0).is_none());
    }

    #[test]
    fn atr_insufficient_history() {
        // Need period + 1 = 15 bars for period=14, only have 14.
        let bars = vec![bar(100.0, 105.0, 95.0, 102.0); 14];
        assert!(compute_atr(&series(&bars), 14).is_none());
    }

    #[test]
    fn atr_exact_minimum_history() {
        let bars = vec![
            bar(100.0, 102.0, 98.0, 101.0),
            bar(101.0, 104.0, 99.0, 103.0),
            bar(103.0, 106.0, 100.0, 105.0),
            bar(105.0, 108.0, 102.0, 107.0),
        ];
        let atr = compute_atr(&series(&bars), 3);
        assert!(atr.is_some());
        assert!(atr.unwrap() > 0.0);
    }

    #[test]
    fn atr_degenerate_bars_give_zero() {
        // high == low == close on every bar: every TR is 0, so ATR is 0.
        let bars = vec![bar(50.0, 50.0, 50.0, 50.0); 20];
        let atr = compute_atr(&series(&bars), 14).unwrap();
        assert_eq!(atr, 0.0);
    }

    #[test]
    fn atr_matches_hand_computed_window_mean() {
        // 101 deterministic bars: linearly increasing close, fixed bar shape.
        let bars: Vec<Bar> = (0..101)
            .map(|i| {
                let close = 1.0 + i as f64 * 0.5;
                bar(close - 0.1, close + 0.3, close - 0.2, close)
            })
            .collect();
        let s = series(&bars);

        // Expected: mean of the last 14 true ranges, computed by the
        // definition directly.
        let n = bars.len();
        let mut expected = 0.0;
        for i in (n - 14)..n {
            let prev_close = bars[i - 1].close;
            let hl = bars[i].high - bars[i].low;
            let hc = (bars[i].high - prev_close).abs();
            let lc = (bars[i].low - prev_close).abs();
            expected += hl.max(hc).max(lc);
        }
        expected /= 14.0;

        let atr = compute_atr(&s, 14).unwrap();
        assert!(
            (atr - expected).abs() < 1e-12,
            "expected {expected}, got {atr}"
        );
        // Each TR here is |high_i - close_{i-1}| = 0.3 + 0.5 = 0.8.
        assert!((atr - 0.8).abs() < 1e-12);
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        // Gap scenario: |H - prevClose| dominates H - L.
        let bars = vec![
            bar(100.0, 105.0, 95.0, 95.0),
            bar(110.0, 115.0, 108.0, 112.0), // |115 - 95| = 20 > 115 - 108 = 7
            bar(112.0, 118.0, 110.0, 115.0),
            bar(115.0, 120.0, 113.0, 118.0),
        ];
        let atr = compute_atr(&series(&bars), 3).unwrap();
        assert!(atr > 7.0, "ATR should reflect the gap, got {atr}");
    }

    #[test]
    fn atr_only_reads_the_requested_window() {
        // A wild bar outside the window must not affect the result.
        let mut bars = vec![bar(1.0, 900.0, 0.5, 1.0)];
        for i in 0..10 {
            let close = 2.0 + i as f64 * 0.01;
            bars.push(bar(close, close + 0.05, close - 0.05, close));
        }
        let atr = compute_atr(&series(&bars), 5).unwrap();
        assert!(atr < 1.0, "window leak: got {atr}");
    }

    #[test]
    fn atr_nan_input_returns_none() {
        let bars = vec![
            bar(100.0, 105.0, 95.0, 100.0),
            bar(100.0, f64::NAN, 95.0, 100.0),
            bar(100.0, 105.0, 95.0, 100.0),
            bar(100.0, 105.0, 95.0, 100.0),
        ];
        assert!(compute_atr(&series(&bars), 3).is_none());
    }
}
