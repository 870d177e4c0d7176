use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::info;

use engine::CycleOutcome;
use paper::BacktestResult;

use crate::{ApiError, AppState};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/screen", get(get_screen))
        .route("/api/backtest/:symbol", get(get_backtest))
}

// ─── Screen ───────────────────────────────────────────────────────────────────

/// Runs one full cycle. The gate is checked against the current local time.
async fn get_screen(State(state): State<AppState>) -> Json<CycleOutcome> {
    Json(state.orchestrator.run_now().await)
}

// ─── Backtest ─────────────────────────────────────────────────────────────────

async fn get_backtest(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<(StatusCode, Json<BacktestResult>), ApiError> {
    let symbol = symbol.trim().to_uppercase();
    info!(symbol = %symbol, "On-demand backtest requested");
    let result = state.orchestrator.backtest_symbol(&symbol).await?;
    let status = match result {
        BacktestResult::Completed(_) => StatusCode::OK,
        BacktestResult::NoData { .. } => StatusCode::NOT_FOUND,
    };
    Ok((status, Json(result)))
}
