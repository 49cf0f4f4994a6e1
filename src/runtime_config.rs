// =============================================================================
// Runtime Configuration
// =============================================================================
//
// Central configuration for the Tidemark service. Persistence uses an atomic
// tmp + rename pattern to prevent corruption on crash. Every field carries
// `#[serde(default)]` so that adding new fields never breaks loading an
// older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::signal::engine::{AnalysisParams, MAJOR_CURRENCIES};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:4600".to_string()
}

fn default_gateway_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

fn default_symbol_suffixes() -> Vec<String> {
    MAJOR_CURRENCIES.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Root URL of the market data gateway.
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    /// Optional bearer token for the gateway. Usually supplied via the
    /// TIDEMARK_GATEWAY_TOKEN environment variable instead of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_api_token: Option<String>,

    /// Currency suffixes accepted by the symbol listing filter.
    #[serde(default = "default_symbol_suffixes")]
    pub symbol_suffixes: Vec<String>,

    /// Analysis parameters (timeframe, windows, oscillator spans).
    #[serde(default)]
    pub analysis: AnalysisParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            gateway_base_url: default_gateway_base_url(),
            gateway_api_token: None,
            symbol_suffixes: default_symbol_suffixes(),
            analysis: AnalysisParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            gateway = %config.gateway_base_url,
            timeframe = %config.analysis.timeframe,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
