// =============================================================================
// Signal Pipeline
// =============================================================================
//
// Request-scoped composition of the indicator engine: the SL/TP resolver,
// the analysis orchestration, and the report/sink boundary. Everything here
// is stateless across requests.

pub mod engine;
pub mod report;
pub mod resolver;

pub use engine::{analyze_symbol, list_forex_symbols, AnalysisParams};
pub use report::{AnalysisReport, LogSink, ReportSink};
pub use resolver::{resolve_sl_tp, AnalysisError, SlTp, DEFAULT_ATR_PERIOD};
