// =============================================================================
// MetaTrader Gateway Client: explicit session lifecycle over HTTP
// =============================================================================
//
// The gateway is a local bridge in front of the broker terminal. A session
// must be opened before any data can be fetched and released afterwards;
// there is no process-global terminal state anywhere in this crate. Callers
// open one session per batch of fetches (typically one analysis request),
// run their fetches through it, and close it.
//
// Authentication is a static bearer token sent on every request when
// configured. The token is never logged.
// =============================================================================

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::{Bar, BarSeries, MarketDataSource, Quote, Timeframe};

/// Hard timeout on every gateway request (seconds).
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Instrument descriptor returned by the gateway symbol listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    /// Broker tree path, e.g. "Forex\\Majors\\EURUSD".
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
struct SessionHandle {
    session_id: String,
}

// ---------------------------------------------------------------------------
// GatewayClient
// ---------------------------------------------------------------------------

/// HTTP client for the market data gateway. Cheap to clone; owns no session.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl GatewayClient {
    /// Create a new `GatewayClient`.
    ///
    /// # Arguments
    /// * `base_url`  - gateway root, e.g. "http://127.0.0.1:8787".
    /// * `api_token` - optional bearer token sent with every request.
    pub fn new(base_url: impl Into<String>, api_token: Option<&str>) -> Self {
        let mut default_headers = HeaderMap::new();
        if let Some(token) = api_token {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
                default_headers.insert(AUTHORIZATION, val);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        let base_url = base_url.into();
        debug!(base_url = %base_url, "GatewayClient initialised");

        Self { base_url, client }
    }

    /// Open a data session with the gateway terminal.
    ///
    /// The session must be released with [`GatewaySession::close`] once the
    /// current batch of fetches is done.
    #[instrument(skip(self), name = "gateway::open_session")]
    pub async fn open_session(&self) -> Result<GatewaySession> {
        let url = format!("{}/api/v1/session", self.base_url);
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .context("POST /api/v1/session request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("gateway session open returned {status}: {body}");
        }

        let handle: SessionHandle = resp
            .json()
            .await
            .context("failed to parse session handle")?;

        debug!(session_id = %handle.session_id, "gateway session opened");

        Ok(GatewaySession {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            session_id: handle.session_id,
        })
    }
}

// ---------------------------------------------------------------------------
// GatewaySession
// ---------------------------------------------------------------------------

/// An open gateway session. All data fetches go through a session; dropping
/// one without calling [`close`](Self::close) leaks the terminal slot until
/// the gateway reaps it.
pub struct GatewaySession {
    base_url: String,
    client: reqwest::Client,
    session_id: String,
}

impl GatewaySession {
    /// Release the session. Best effort: a failed release is logged, not
    /// propagated, since the fetched data is already in hand.
    #[instrument(skip(self), fields(session_id = %self.session_id), name = "gateway::close")]
    pub async fn close(self) {
        let url = format!("{}/api/v1/session/{}", self.base_url, self.session_id);
        match self.client.delete(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("gateway session released");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "gateway session release rejected");
            }
            Err(e) => {
                warn!(error = %e, "gateway session release failed");
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .header("X-Session-Id", &self.session_id)
            .send()
            .await
            .with_context(|| format!("GET {what} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("gateway {what} returned {status}: {body}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("failed to parse {what} response"))
    }
}

impl MarketDataSource for GatewaySession {
    /// Fetch the most recent `count` bars, oldest first.
    ///
    /// An empty response or an out-of-order sequence is an error: the
    /// indicator engine depends on strict oldest-first ordering and a silent
    /// partial success would skew every downstream value.
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<BarSeries> {
        let url = format!(
            "{}/api/v1/bars?symbol={symbol}&timeframe={}&count={count}",
            self.base_url,
            timeframe.as_str(),
        );
        let bars: Vec<Bar> = self.get_json(&url, "bars").await?;

        if bars.is_empty() {
            anyhow::bail!("gateway returned no bars for {symbol} {timeframe}");
        }
        if bars.windows(2).any(|w| w[1].time <= w[0].time) {
            anyhow::bail!("gateway returned out-of-order bars for {symbol} {timeframe}");
        }

        debug!(symbol, %timeframe, received = bars.len(), "bars fetched");
        Ok(BarSeries::from_bars(&bars))
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/api/v1/quote?symbol={symbol}", self.base_url);
        let quote: Quote = self.get_json(&url, "quote").await?;
        debug!(symbol, bid = quote.bid, ask = quote.ask, "quote fetched");
        Ok(quote)
    }

    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>> {
        let url = format!("{}/api/v1/symbols", self.base_url);
        let symbols: Vec<SymbolInfo> = self.get_json(&url, "symbols").await?;
        debug!(received = symbols.len(), "symbol list fetched");
        Ok(symbols)
    }
}
