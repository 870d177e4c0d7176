use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use common::Error;
use ledger::{Ledger, ProfitSelection, ViewMode};

use crate::{ApiError, AppState};

pub fn ledger_router() -> Router<AppState> {
    Router::new()
        .route("/api/ledger/:name/rankings", get(get_rankings))
        .route("/api/ledger/:name/profit", get(get_profit))
        .route("/api/ledger/:name/export", get(get_export))
}

/// Statements are re-read on every request so edits on disk show up.
fn open_ledger(state: &AppState, name: &str) -> Result<Ledger, ApiError> {
    let path = state
        .ledgers
        .get(name)
        .ok_or_else(|| Error::NoData(format!("no ledger named '{name}'")))?;
    Ok(Ledger::from_path(path)?)
}

#[derive(Deserialize)]
struct RankingsQuery {
    n: Option<usize>,
}

async fn get_rankings(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<RankingsQuery>,
) -> Result<Json<Value>, ApiError> {
    let ledger = open_ledger(&state, &name)?;
    let n = q.n.unwrap_or(10);
    Ok(Json(json!({
        "ledger": name,
        "symbols": ledger.symbols(),
        "top": ledger.top(n),
        "bottom": ledger.bottom(n),
    })))
}

#[derive(Deserialize)]
struct ProfitQuery {
    symbol: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    #[serde(default)]
    mode: ViewMode,
}

impl ProfitQuery {
    /// Without an explicit symbol the first one in the statement is used.
    fn select(&self, ledger: &Ledger) -> ProfitSelection {
        let symbol = match &self.symbol {
            Some(s) => s.clone(),
            None => ledger.symbols().into_iter().next().unwrap_or_default(),
        };
        ledger.profit_series(&symbol, self.start, self.end, self.mode)
    }
}

async fn get_profit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<ProfitQuery>,
) -> Result<Json<Value>, ApiError> {
    let ledger = open_ledger(&state, &name)?;
    let selection = q.select(&ledger);
    let summary = match &selection {
        ProfitSelection::Series(series) => series.summary(),
        ProfitSelection::NoData { message } => message.clone(),
    };
    Ok(Json(json!({
        "ledger": name,
        "summary": summary,
        "selection": selection,
    })))
}

/// The filtered series as a CSV download.
async fn get_export(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<ProfitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ledger = open_ledger(&state, &name)?;
    let ProfitSelection::Series(series) = q.select(&ledger) else {
        return Err(Error::NoData("no data for selected range".into()).into());
    };
    let mut body = Vec::new();
    ledger::write_csv(&series, &mut body)?;
    let filename = format!("attachment; filename=\"{name}_{}.csv\"", series.symbol);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}
