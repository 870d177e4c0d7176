use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness plus the price data source in use.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let settings = state.orchestrator.settings();
    Json(json!({
        "status": "ok",
        "data_source": state.orchestrator.provider_name(),
        "trading_window": settings.trading_window.to_string(),
        "within_window": settings.trading_window.contains(screener::local_time()),
        "ledgers": state.ledgers.keys().collect::<Vec<_>>(),
    }))
}
