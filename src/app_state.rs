// =============================================================================
// Central Application State
// =============================================================================
//
// Shared across all request handlers via `Arc<AppState>`. Mutable pieces sit
// behind `parking_lot::RwLock`; the version counter is lock-free. Analysis
// itself is stateless per request, so this holds only configuration, the
// gateway client, the report sink, and a bounded error log.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::GatewayClient;
use crate::runtime_config::RuntimeConfig;
use crate::signal::report::ReportSink;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event, surfaced through the API for operators.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across all request handlers.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    pub runtime_config: RwLock<RuntimeConfig>,

    /// Gateway client; sessions are opened from it per request.
    pub gateway: GatewayClient,

    /// Destination for finished analysis reports.
    pub sink: Arc<dyn ReportSink>,

    /// Bounded ring of recent errors.
    pub recent_errors: RwLock<VecDeque<ErrorRecord>>,
}

impl AppState {
    pub fn new(config: RuntimeConfig, gateway: GatewayClient, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: RwLock::new(config),
            gateway,
            sink,
            recent_errors: RwLock::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
        }
    }

    pub fn increment_version(&self) {
        self.state_version.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Record an error for the operator log, trimming the ring to capacity.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut errors = self.recent_errors.write();
        errors.push_back(ErrorRecord {
            message: message.into(),
            at: Utc::now().to_rfc3339(),
        });
        while errors.len() > MAX_RECENT_ERRORS {
            errors.pop_front();
        }
        drop(errors);
        self.increment_version();
    }
}
