// =============================================================================
// Stop-Loss / Take-Profit Resolver
// =============================================================================
//
// Turns the ATR volatility estimate and a live quote into directional SL/TP
// prices:
//
//   LONG:  sl = bid - distance   tp = ask + distance
//   SHORT: sl = ask + distance   tp = bid - distance
//
// `distance` is the raw ATR, degraded to 0.0 when the history window is too
// short. The support/resistance band is computed alongside as a charting
// anchor but does not enter the arithmetic; see the note on `resolve_sl_tp`.
//
// Unfetchable bars or quotes surface as `AnalysisError::DataUnavailable`.
// A NaN never leaves this module as a price.
// =============================================================================

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::indicators::{atr::compute_atr, levels::compute_support_resistance};
use crate::market_data::{MarketDataSource, Quote, Timeframe};
use crate::types::Direction;

/// Default ATR look-back for stop placement.
pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Failure at the signal boundary. Insufficient history is not a failure
/// (it degrades the distance to zero); only unfetchable data is.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("market data unavailable: {what} for {symbol}: {source}")]
    DataUnavailable {
        symbol: String,
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AnalysisError {
    pub(crate) fn unavailable(symbol: &str, what: &'static str, source: anyhow::Error) -> Self {
        Self::DataUnavailable {
            symbol: symbol.to_string(),
            what,
            source,
        }
    }
}

/// Resolved stop-loss / take-profit pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlTp {
    pub sl_price: f64,
    pub tp_price: f64,
}

/// Pure directional arithmetic over a quote and a distance.
pub fn directional_levels(quote: Quote, distance: f64, direction: Direction) -> SlTp {
    match direction {
        Direction::Long => SlTp {
            sl_price: quote.bid - distance,
            tp_price: quote.ask + distance,
        },
        Direction::Short => SlTp {
            sl_price: quote.ask + distance,
            tp_price: quote.bid - distance,
        },
    }
}

/// Resolve SL/TP prices for `symbol`.
///
/// Fetches `atr_period + 1` bars and the live quote through `source`. The
/// `volume` argument is the intended order size; it is part of the call
/// contract and logged, but the current placement policy prices stops purely
/// by ATR distance, independent of size.
///
/// The support/resistance band is likewise computed and logged but unused in
/// the final arithmetic. That mirrors the shipped placement policy; do not
/// fold the band into the prices without a product decision.
pub async fn resolve_sl_tp<S: MarketDataSource>(
    source: &S,
    symbol: &str,
    volume: f64,
    direction: Direction,
    timeframe: Timeframe,
    atr_period: usize,
) -> Result<SlTp, AnalysisError> {
    let series = source
        .fetch_bars(symbol, timeframe, atr_period + 1)
        .await
        .map_err(|e| AnalysisError::unavailable(symbol, "bars", e))?;

    match compute_support_resistance(&series, atr_period) {
        Some((support, resistance)) => {
            debug!(symbol, support, resistance, "support/resistance band");
        }
        None => {
            debug!(symbol, "support/resistance band unavailable");
        }
    }

    let distance = match compute_atr(&series, atr_period) {
        Some(atr) => atr,
        None => {
            warn!(
                symbol,
                bars = series.len(),
                atr_period,
                "insufficient history for ATR; degrading stop distance to 0"
            );
            0.0
        }
    };

    let quote = source
        .fetch_quote(symbol)
        .await
        .map_err(|e| AnalysisError::unavailable(symbol, "quote", e))?;

    let resolved = directional_levels(quote, distance, direction);
    debug!(
        symbol,
        %direction,
        volume,
        distance,
        sl = resolved.sl_price,
        tp = resolved.tp_price,
        "sl/tp resolved"
    );
    Ok(resolved)
}
