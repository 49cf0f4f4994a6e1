// =============================================================================
// REST API Endpoints (Axum 0.7)
// =============================================================================
//
// All endpoints live under `/api/v1/`. The service is a read-only analysis
// surface, so no endpoint mutates anything beyond the operator error log.
//
// CORS is configured permissively for development; tighten `allow_origin`
// in production.
//
// Every analysis request opens its own gateway session and releases it
// before responding, success or not.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::signal::engine::{analyze_symbol, list_forex_symbols};
use crate::types::Direction;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/symbols", get(symbols))
        .route("/api/v1/analysis", post(analysis))
        .route("/api/v1/errors", get(recent_errors))
        .layer(cors)
        .with_state(state)
}

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message.into() }))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Symbol listing
// =============================================================================

#[derive(Serialize)]
struct SymbolsResponse {
    symbols: Vec<String>,
}

async fn symbols(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let suffixes = state.runtime_config.read().symbol_suffixes.clone();

    let session = match state.gateway.open_session().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "gateway session open failed");
            state.record_error(format!("session open failed: {e:#}"));
            return (StatusCode::BAD_GATEWAY, error_body("failed to reach the market data gateway"))
                .into_response();
        }
    };

    let result = list_forex_symbols(&session, &suffixes).await;
    session.close().await;

    match result {
        Ok(names) => Json(SymbolsResponse { symbols: names }).into_response(),
        Err(e) => {
            warn!(error = %e, "symbol listing failed");
            state.record_error(format!("symbol listing failed: {e}"));
            (StatusCode::BAD_GATEWAY, error_body("failed to fetch symbols")).into_response()
        }
    }
}

// =============================================================================
// Symbol analysis
// =============================================================================

#[derive(Deserialize)]
struct AnalysisRequest {
    symbol: String,
    #[serde(default)]
    direction: Option<Direction>,
}

async fn analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> impl IntoResponse {
    let symbol = request.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            error_body("symbol must not be empty"),
        )
            .into_response();
    }
    let direction = request.direction.unwrap_or_default();

    let params = state.runtime_config.read().analysis.clone();

    let session = match state.gateway.open_session().await {
        Ok(s) => s,
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "gateway session open failed");
            state.record_error(format!("session open failed: {e:#}"));
            return (StatusCode::BAD_GATEWAY, error_body("failed to reach the market data gateway"))
                .into_response();
        }
    };

    let result = analyze_symbol(&session, &params, &symbol, direction).await;
    session.close().await;

    match result {
        Ok(report) => {
            state.sink.publish(&report);
            state.increment_version();
            info!(symbol = %symbol, id = %report.id, "analysis served");
            Json(report).into_response()
        }
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "analysis failed");
            state.record_error(format!("analysis failed: {e}"));
            (
                StatusCode::BAD_GATEWAY,
                error_body(format!("failed to analyse {symbol}")),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Operator error log
// =============================================================================

async fn recent_errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors: Vec<_> = state.recent_errors.read().iter().cloned().collect();
    Json(errors)
}
