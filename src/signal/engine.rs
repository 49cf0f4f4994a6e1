// =============================================================================
// Analysis Engine: per-request composition of the signal pipeline
// =============================================================================
//
// One analysis request = one pass: resolve SL/TP from a short ATR window,
// then run the Klinger oscillator over a longer window, and bundle the
// results into an `AnalysisReport`. The two sides are independent; the
// oscillator degrades to absent readings without failing the SL/TP side.
// =============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::indicators::kvo::{compute_kvo, KvoParams};
use crate::market_data::{MarketDataSource, SymbolInfo, Timeframe};
use crate::signal::report::AnalysisReport;
use crate::signal::resolver::{resolve_sl_tp, AnalysisError, DEFAULT_ATR_PERIOD};
use crate::types::Direction;

/// Currency suffixes that mark a tradable forex major/cross.
pub const MAJOR_CURRENCIES: [&str; 8] = ["USD", "EUR", "JPY", "GBP", "AUD", "NZD", "CAD", "CHF"];

fn default_timeframe() -> Timeframe {
    Timeframe::H1
}

fn default_kvo_bar_count() -> usize {
    100
}

fn default_atr_period() -> usize {
    DEFAULT_ATR_PERIOD
}

fn default_order_volume() -> f64 {
    0.05
}

/// Tunable parameters for one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Timeframe both fetches run on.
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,

    /// Bars fetched for the oscillator window.
    #[serde(default = "default_kvo_bar_count")]
    pub kvo_bar_count: usize,

    /// ATR look-back for stop placement.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Nominal order size carried through the resolver contract.
    #[serde(default = "default_order_volume")]
    pub order_volume: f64,

    /// Oscillator spans and signal smoothing.
    #[serde(default)]
    pub kvo: KvoParams,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            timeframe: default_timeframe(),
            kvo_bar_count: default_kvo_bar_count(),
            atr_period: default_atr_period(),
            order_volume: default_order_volume(),
            kvo: KvoParams::default(),
        }
    }
}

/// Run the full analysis for one symbol through `source`.
pub async fn analyze_symbol<S: MarketDataSource>(
    source: &S,
    params: &AnalysisParams,
    symbol: &str,
    direction: Direction,
) -> Result<AnalysisReport, AnalysisError> {
    let resolved = resolve_sl_tp(
        source,
        symbol,
        params.order_volume,
        direction,
        params.timeframe,
        params.atr_period,
    )
    .await?;

    let series = source
        .fetch_bars(symbol, params.timeframe, params.kvo_bar_count)
        .await
        .map_err(|e| AnalysisError::unavailable(symbol, "bars", e))?;

    let oscillator = compute_kvo(&series, &params.kvo);
    if oscillator.is_empty() {
        warn!(symbol, "volume column absent; oscillator readings omitted");
    }
    let (kvo, signal, hist) = oscillator.latest();

    debug!(symbol, bars = series.len(), "analysis complete");

    Ok(AnalysisReport {
        id: Uuid::new_v4().to_string(),
        symbol: symbol.to_string(),
        direction,
        sl_price: resolved.sl_price,
        tp_price: resolved.tp_price,
        kvo,
        signal,
        hist,
        generated_at: Utc::now().to_rfc3339(),
    })
}

/// List tradable forex symbols known to the gateway.
pub async fn list_forex_symbols<S: MarketDataSource>(
    source: &S,
    suffixes: &[String],
) -> Result<Vec<String>, AnalysisError> {
    let symbols = source
        .fetch_symbols()
        .await
        .map_err(|e| AnalysisError::unavailable("*", "symbols", e))?;
    Ok(filter_forex(&symbols, suffixes))
}

/// Keep instruments from the broker's forex tree whose name ends with a
/// recognised currency suffix.
fn filter_forex(symbols: &[SymbolInfo], suffixes: &[String]) -> Vec<String> {
    symbols
        .iter()
        .filter(|s| s.path.contains("Forex"))
        .filter(|s| suffixes.iter().any(|suffix| s.name.ends_with(suffix.as_str())))
        .map(|s| s.name.clone())
        .collect()
}
