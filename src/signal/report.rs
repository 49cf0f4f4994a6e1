// =============================================================================
// Analysis Report & Sink Boundary
// =============================================================================
//
// An `AnalysisReport` is the complete result of one analysis request. The
// engine hands finished reports to a caller-supplied `ReportSink`; it never
// formats, persists, or transmits them itself. The bundled `LogSink` writes
// a structured log line.
// =============================================================================

use serde::Serialize;
use tracing::info;

use crate::types::Direction;

/// Result of a single symbol analysis.
///
/// The oscillator fields are `None` when the volume column was absent (empty
/// oscillator output) or when the latest value was not a finite number; a
/// NaN is never serialized as a reading.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Request id (UUID v4).
    pub id: String,

    pub symbol: String,
    pub direction: Direction,

    pub sl_price: f64,
    pub tp_price: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kvo: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hist: Option<f64>,

    /// ISO 8601 timestamp of when the report was generated.
    pub generated_at: String,
}

/// Where finished reports go. Implementations must not block.
pub trait ReportSink: Send + Sync {
    fn publish(&self, report: &AnalysisReport);
}

/// Default sink: one structured log line per report.
pub struct LogSink;

impl ReportSink for LogSink {
    fn publish(&self, report: &AnalysisReport) {
        info!(
            id = %report.id,
            symbol = %report.symbol,
            direction = %report.direction,
            sl = report.sl_price,
            tp = report.tp_price,
            kvo = report.kvo,
            signal = report.signal,
            hist = report.hist,
            "analysis report"
        );
    }
}
