// =============================================================================
// Klinger Volume Oscillator (KVO)
// =============================================================================
//
// A volume-weighted momentum oscillator. Per bar:
//
//   momentum = close - prevClose
//   trend    = +1 / -1 by momentum sign; a zero-momentum bar keeps the
//              previous trend (sticky state, so the scan is sequential)
//   dm       = high - low
//   cm       = cm + dm while the trend holds; dm + prevDm on a trend flip
//   vf       = 100 * volume * trend * |2*dm/cm - 1|   (0 when cm == 0)
//
//   kvo    = EWMA(vf, fast_span) - EWMA(vf, slow_span)
//   signal = EWMA(kvo, signal_span)   (or trailing SMA, by configuration)
//   hist   = kvo - signal
//
// The EWMA is the adjusted (warm-up-weighted) convention with
// alpha = 2 / (span + 1):
//
//   y_t = num_t / den_t,  num_t = x_t + (1-a)*num_{t-1},
//                         den_t = 1   + (1-a)*den_{t-1}
//
// Early samples diverge between this and the unadjusted recursion; the
// adjusted form is pinned because historical values were produced with it.
//
// The trend/cm recursion is loop-carried and cannot be expressed as an
// elementwise map; it is an explicit scan over scalar accumulators.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::BarSeries;

// =============================================================================
// Parameters & output
// =============================================================================

fn default_fast_span() -> usize {
    35
}

fn default_slow_span() -> usize {
    50
}

fn default_signal_span() -> usize {
    16
}

/// Smoothing applied to the signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSmoothing {
    Ema,
    Sma,
}

impl Default for SignalSmoothing {
    fn default() -> Self {
        Self::Ema
    }
}

/// Oscillator spans. All spans must be at least 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvoParams {
    #[serde(default = "default_fast_span")]
    pub fast_span: usize,

    #[serde(default = "default_slow_span")]
    pub slow_span: usize,

    #[serde(default = "default_signal_span")]
    pub signal_span: usize,

    #[serde(default)]
    pub smoothing: SignalSmoothing,
}

impl Default for KvoParams {
    fn default() -> Self {
        Self {
            fast_span: default_fast_span(),
            slow_span: default_slow_span(),
            signal_span: default_signal_span(),
            smoothing: SignalSmoothing::default(),
        }
    }
}

/// Three parallel series, each the length of the input window.
///
/// All three are empty when the input carried no volume column; that case is
/// distinguishable from a NaN-bearing numeric result.
#[derive(Debug, Clone, PartialEq)]
pub struct KvoOutput {
    pub kvo: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
}

impl KvoOutput {
    fn empty() -> Self {
        Self {
            kvo: Vec::new(),
            signal: Vec::new(),
            hist: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kvo.is_empty()
    }

    /// Most recent `(kvo, signal, hist)` triple, with non-finite entries
    /// mapped to `None` so a NaN never escapes as a valid reading.
    pub fn latest(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        let tail = |s: &[f64]| s.last().copied().filter(|v| v.is_finite());
        (tail(&self.kvo), tail(&self.signal), tail(&self.hist))
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Compute the oscillator, its signal line, and the histogram.
///
/// Stateless: repeated calls on the same input are bit-identical.
///
/// # Edge cases
/// - No volume column => three empty series.
/// - Any span of zero => three empty series (nothing sensible to smooth).
/// - Zero volume everywhere => all-zero output, not NaN.
/// - SMA signal mode leaves the first `signal_span - 1` signal/hist entries
///   NaN, mirroring a trailing window that is not yet full.
pub fn compute_kvo(series: &BarSeries, params: &KvoParams) -> KvoOutput {
    let Some(volumes) = series.volumes() else {
        return KvoOutput::empty();
    };
    if params.fast_span == 0 || params.slow_span == 0 || params.signal_span == 0 {
        return KvoOutput::empty();
    }

    let vf = volume_force(series, volumes);

    let fast = ewma_adjusted(&vf, params.fast_span);
    let slow = ewma_adjusted(&vf, params.slow_span);
    let kvo: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

    let signal = match params.smoothing {
        SignalSmoothing::Ema => ewma_adjusted(&kvo, params.signal_span),
        SignalSmoothing::Sma => trailing_mean(&kvo, params.signal_span),
    };

    let hist = kvo.iter().zip(&signal).map(|(k, s)| k - s).collect();

    KvoOutput { kvo, signal, hist }
}

/// Single-pass volume force scan.
///
/// Index 0 has no prior state: trend and cm seed at 0, which zeroes the
/// force through the cm guard.
fn volume_force(series: &BarSeries, volumes: &[f64]) -> Vec<f64> {
    let n = series.len();
    let mut vf = vec![0.0; n];
    if n == 0 {
        return vf;
    }

    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();

    let mut prev_trend = 0.0_f64;
    let mut prev_cm = 0.0_f64;
    let mut prev_dm = highs[0] - lows[0];

    for i in 1..n {
        let momentum = closes[i] - closes[i - 1];
        let trend = if momentum > 0.0 {
            1.0
        } else if momentum < 0.0 {
            -1.0
        } else {
            prev_trend
        };

        let dm = highs[i] - lows[i];
        let cm = if trend == prev_trend {
            prev_cm + dm
        } else {
            dm + prev_dm
        };

        // cm == 0 guard; a zero trend also zeroes the force outright.
        if cm != 0.0 {
            vf[i] = 100.0 * volumes[i] * trend * (2.0 * dm / cm - 1.0).abs();
        }

        prev_trend = trend;
        prev_cm = cm;
        prev_dm = dm;
    }

    vf
}

/// Adjusted exponentially weighted mean, alpha = 2 / (span + 1).
fn ewma_adjusted(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut out = Vec::with_capacity(values.len());
    let mut num = 0.0;
    let mut den = 0.0;
    for &x in values {
        num = x + decay * num;
        den = 1.0 + decay * den;
        out.push(num / den);
    }
    out
}

/// Trailing simple moving average; NaN until the window fills.
fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(sum / window as f64);
        } else {
            out.push(f64::NAN);
        }
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;

    fn bar(high: f64, low: f64, close: f64, volume: Option<f64>) -> Bar {
        Bar {
            time: 0,
            open: close,
            high,
            low,
            close,
            tick_volume: volume,
        }
    }

    /// A mildly wiggly but deterministic OHLCV sequence.
    fn sample_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + ((i * 7) % 13) as f64 * 0.5 - ((i * 3) % 5) as f64 * 0.3;
                let spread = 0.4 + ((i * 11) % 7) as f64 * 0.1;
                bar(
                    base + spread,
                    base - spread,
                    base,
                    Some(500.0 + ((i * 17) % 23) as f64 * 10.0),
                )
            })
            .collect()
    }

    /// Reference volume force built from full trend/cm arrays, written
    /// directly from the indicator definition. The production scan must
    /// agree with it exactly.
    fn reference_volume_force(bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut trend = vec![0.0; n];
        let mut cm = vec![0.0; n];
        let mut vf = vec![0.0; n];

        for i in 1..n {
            let momentum = bars[i].close - bars[i - 1].close;
            trend[i] = if momentum > 0.0 {
                1.0
            } else if momentum < 0.0 {
                -1.0
            } else {
                trend[i - 1]
            };
        }
        for i in 1..n {
            let dm = bars[i].high - bars[i].low;
            let prev_dm = bars[i - 1].high - bars[i - 1].low;
            cm[i] = if trend[i] == trend[i - 1] {
                cm[i - 1] + dm
            } else {
                dm + prev_dm
            };
        }
        for i in 0..n {
            let dm = bars[i].high - bars[i].low;
            if cm[i] != 0.0 {
                vf[i] = 100.0 * bars[i].tick_volume.unwrap() * trend[i]
                    * (2.0 * dm / cm[i] - 1.0).abs();
            }
        }
        vf
    }

    #[test]
    fn scan_matches_reference_arrays() {
        let bars = sample_bars(80);
        let series = BarSeries::from_bars(&bars);
        let got = volume_force(&series, series.volumes().unwrap());
        let expected = reference_volume_force(&bars);
        assert_eq!(got.len(), expected.len());
        for (i, (g, e)) in got.iter().zip(&expected).enumerate() {
            assert!((g - e).abs() < 1e-9, "vf mismatch at {i}: {g} vs {e}");
        }
    }

    #[test]
    fn trend_never_flips_on_constant_positive_momentum() {
        // Close strictly rises: trend is +1 from index 1 on, so cm only ever
        // accumulates and the force carries the volume sign (non-negative).
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let close = 1.0 + i as f64 * 0.01;
                bar(close + 0.005, close - 0.005, close, Some(1000.0))
            })
            .collect();
        let series = BarSeries::from_bars(&bars);
        let vf = volume_force(&series, series.volumes().unwrap());

        // Index 1 transitions 0 -> +1 (a flip), so cm starts at dm + prevDm;
        // from then on the trend holds and cm only accumulates.
        let dm: f64 = 0.01;
        let mut cm = dm;
        for (i, &v) in vf.iter().enumerate().skip(1) {
            cm += dm;
            let expected = 100.0 * 1000.0 * (2.0 * dm / cm - 1.0).abs();
            assert!((v - expected).abs() < 1e-6, "index {i}: {v} vs {expected}");
            assert!(v >= 0.0);
        }
    }

    #[test]
    fn zero_momentum_bars_keep_the_prior_trend() {
        // Up, then flat: the flat bars inherit trend +1, so cm keeps
        // accumulating instead of resetting on every flat bar.
        let mut bars = vec![
            bar(1.01, 0.99, 1.00, Some(1000.0)),
            bar(1.03, 1.01, 1.02, Some(1000.0)),
        ];
        for _ in 0..5 {
            bars.push(bar(1.03, 1.01, 1.02, Some(1000.0)));
        }
        let series = BarSeries::from_bars(&bars);
        let got = volume_force(&series, series.volumes().unwrap());
        let expected = reference_volume_force(&bars);
        for (g, e) in got.iter().zip(&expected) {
            assert!((g - e).abs() < 1e-9);
        }
        // The sticky trend means no flip-reset occurred after index 1: cm
        // grows monotonically, so |2*dm/cm - 1| approaches 1 from below and
        // the force stays strictly positive on the flat stretch.
        for v in &got[2..] {
            assert!(*v > 0.0);
        }
    }

    #[test]
    fn all_zero_volume_yields_all_zero_series() {
        let bars: Vec<Bar> = (0..60)
            .map(|i| {
                let close = 1.0 + (i % 7) as f64 * 0.01;
                bar(close + 0.01, close - 0.01, close, Some(0.0))
            })
            .collect();
        let out = compute_kvo(&BarSeries::from_bars(&bars), &KvoParams::default());
        assert_eq!(out.kvo.len(), bars.len());
        for i in 0..bars.len() {
            assert_eq!(out.kvo[i], 0.0);
            assert_eq!(out.signal[i], 0.0);
            assert_eq!(out.hist[i], 0.0);
        }
    }

    #[test]
    fn missing_volume_column_yields_empty_series() {
        let mut bars = sample_bars(30);
        bars[17].tick_volume = None;
        let out = compute_kvo(&BarSeries::from_bars(&bars), &KvoParams::default());
        assert!(out.is_empty());
        assert_eq!(out.kvo.len(), 0);
        assert_eq!(out.signal.len(), 0);
        assert_eq!(out.hist.len(), 0);
    }

    #[test]
    fn output_length_matches_input_length() {
        for n in [0, 1, 2, 10, 101] {
            let out = compute_kvo(&BarSeries::from_bars(&sample_bars(n)), &KvoParams::default());
            assert_eq!(out.kvo.len(), n);
            assert_eq!(out.signal.len(), n);
            assert_eq!(out.hist.len(), n);
        }
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let series = BarSeries::from_bars(&sample_bars(101));
        let params = KvoParams::default();
        let a = compute_kvo(&series, &params);
        let b = compute_kvo(&series, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn ewma_matches_adjusted_convention() {
        // span=3 -> alpha=0.5. Adjusted weights: 1, 0.5, 0.25, ...
        //   y0 = 1
        //   y1 = (2 + 0.5*1) / 1.5        = 5/3
        //   y2 = (3 + 0.5*2 + 0.25*1)/1.75 = 17/7
        let out = ewma_adjusted(&[1.0, 2.0, 3.0], 3);
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!((out[1] - 5.0 / 3.0).abs() < 1e-12);
        assert!((out[2] - 17.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn ewma_spans_longer_than_data_still_compute() {
        let out = ewma_adjusted(&[4.0, 6.0], 50);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
        assert!((out[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_signal_mode_has_nan_warmup() {
        let bars = sample_bars(40);
        let params = KvoParams {
            smoothing: SignalSmoothing::Sma,
            ..KvoParams::default()
        };
        let out = compute_kvo(&BarSeries::from_bars(&bars), &params);
        for i in 0..params.signal_span - 1 {
            assert!(out.signal[i].is_nan(), "signal[{i}] should be NaN");
            assert!(out.hist[i].is_nan(), "hist[{i}] should be NaN");
        }
        for i in params.signal_span - 1..bars.len() {
            assert!(out.signal[i].is_finite());
            assert!(out.hist[i].is_finite());
        }
        // The filled window is the plain mean of the trailing signal_span
        // oscillator values.
        let i = 20;
        let w = params.signal_span;
        let mean: f64 = out.kvo[i + 1 - w..=i].iter().sum::<f64>() / w as f64;
        assert!((out.signal[i] - mean).abs() < 1e-9);
    }

    #[test]
    fn latest_filters_non_finite_tails() {
        let bars = sample_bars(10);
        let params = KvoParams {
            smoothing: SignalSmoothing::Sma,
            ..KvoParams::default()
        };
        // 10 bars < signal_span of 16: every SMA signal entry is NaN.
        let out = compute_kvo(&BarSeries::from_bars(&bars), &params);
        let (kvo, signal, hist) = out.latest();
        assert!(kvo.is_some());
        assert!(signal.is_none());
        assert!(hist.is_none());
    }

    #[test]
    fn zero_span_is_rejected() {
        let params = KvoParams {
            signal_span: 0,
            ..KvoParams::default()
        };
        let out = compute_kvo(&BarSeries::from_bars(&sample_bars(30)), &params);
        assert!(out.is_empty());
    }
}
