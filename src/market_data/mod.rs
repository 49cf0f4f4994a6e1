// =============================================================================
// Market Data: OHLCV bars, live quotes, and the gateway source seam
// =============================================================================
//
// Bars arrive from the gateway as an ordered, oldest-first sequence and are
// wrapped once into a column-oriented `BarSeries` for the indicator engine.
// A series is built per analysis request and discarded afterwards; nothing in
// this module caches or mutates fetched data.
//
// OHLC sanity (high >= low, high >= open/close, low <= open/close) is assumed
// from the source and deliberately not validated here; garbage in propagates.

pub mod gateway;

pub use gateway::{GatewayClient, GatewaySession, SymbolInfo};

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bar & quote types
// ---------------------------------------------------------------------------

/// A single OHLCV bar as delivered by the gateway.
///
/// `tick_volume` is optional: some feeds (and some gateway builds) do not
/// report tick volume at all. Its absence is meaningful downstream, so it is
/// carried as `Option` instead of being defaulted to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    /// Bar-open timestamp, UNIX seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub tick_volume: Option<f64>,
}

/// Live bid/ask quote, fetched at resolution time and never cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

/// Chart timeframe understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Wire name used in gateway query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "M1",
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BarSeries: column view over an ordered bar sequence
// ---------------------------------------------------------------------------

/// Fixed-width numeric columns over an oldest-first bar sequence.
///
/// The volume column is `Some` only when every bar in the sequence carried a
/// tick volume. A single bar without volume means the feed does not provide
/// the column, which the KVO engine treats as a distinct "no output" case
/// rather than a numeric failure.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    opens: Vec<f64>,
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
    volumes: Option<Vec<f64>>,
}

impl BarSeries {
    /// Wrap an ordered bar slice into numeric columns.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut opens = Vec::with_capacity(bars.len());
        let mut highs = Vec::with_capacity(bars.len());
        let mut lows = Vec::with_capacity(bars.len());
        let mut closes = Vec::with_capacity(bars.len());
        let mut volumes = Some(Vec::with_capacity(bars.len()));

        for bar in bars {
            opens.push(bar.open);
            highs.push(bar.high);
            lows.push(bar.low);
            closes.push(bar.close);
            match (bar.tick_volume, volumes.as_mut()) {
                (Some(v), Some(col)) => col.push(v),
                // One missing value and the whole column is gone.
                _ => volumes = None,
            }
        }

        Self {
            opens,
            highs,
            lows,
            closes,
            volumes,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn opens(&self) -> &[f64] {
        &self.opens
    }

    pub fn highs(&self) -> &[f64] {
        &self.highs
    }

    pub fn lows(&self) -> &[f64] {
        &self.lows
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Volume column, or `None` when the feed supplied no tick volume.
    pub fn volumes(&self) -> Option<&[f64]> {
        self.volumes.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

/// Read-only market data source the signal engine runs against.
///
/// The production implementation is [`GatewaySession`]; tests substitute an
/// in-memory fake. Implementations must return strictly time-ordered,
/// oldest-first bars or an explicit error; an empty or partial response is a
/// failure, never a silent success.
pub trait MarketDataSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> impl std::future::Future<Output = Result<BarSeries>> + Send;

    fn fetch_quote(&self, symbol: &str) -> impl std::future::Future<Output = Result<Quote>> + Send;

    fn fetch_symbols(&self) -> impl std::future::Future<Output = Result<Vec<SymbolInfo>>> + Send;
}
