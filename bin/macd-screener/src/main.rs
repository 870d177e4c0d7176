use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, DataSource, PriceHistoryProvider};
use engine::{CsvProvider, CycleOutcome, Orchestrator, Settings, YahooClient};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let settings = Settings::load(&cfg.settings_path);
    info!(
        source = %cfg.data_source,
        settings = %cfg.settings_path,
        universe = settings.universe.len(),
        "MACD screener starting"
    );

    // ── Price history provider (selected by DATA_SOURCE) ─────────────────────
    let provider: Arc<dyn PriceHistoryProvider> = match cfg.data_source {
        DataSource::Yahoo => {
            info!(
                base_url = %cfg.yahoo_base_url,
                timeout = ?cfg.provider_timeout,
                "Using Yahoo Finance chart API"
            );
            let client = YahooClient::new(
                cfg.yahoo_base_url.clone(),
                cfg.provider_timeout,
                cfg.provider_max_retries,
            )
            .unwrap_or_else(|e| panic!("Failed to create Yahoo client: {e}"));
            Arc::new(client)
        }
        DataSource::Csv => {
            info!(dir = %cfg.csv_data_dir, "Using CSV price history");
            Arc::new(CsvProvider::new(&cfg.csv_data_dir))
        }
    };

    // ── Orchestrator ──────────────────────────────────────────────────────────
    let orchestrator = Orchestrator::new(provider, settings, cfg.screen_concurrency)
        .unwrap_or_else(|e| panic!("Failed to build orchestrator: {e}"));
    let orchestrator = Arc::new(orchestrator);

    // ── JSON API ──────────────────────────────────────────────────────────────
    let api_state = api::AppState::new(orchestrator.clone());
    let port = cfg.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "JSON API terminated");
        }
    });

    // ── Startup cycle ─────────────────────────────────────────────────────────
    match orchestrator.run_now().await {
        CycleOutcome::OutsideWindow { now, window } => {
            info!(now = %now.format("%H:%M"), window = %window, "Not within trading window");
        }
        CycleOutcome::Completed(report) => {
            for bucket in &report.buckets {
                let symbols: Vec<&str> =
                    bucket.candidates.iter().map(|c| c.symbol.as_str()).collect();
                info!(bucket = %bucket.bucket, candidates = ?symbols, "Screen result");
                match bucket.backtest.as_ref().and_then(|b| b.report()) {
                    Some(r) => info!(
                        symbol = %r.symbol,
                        trades = r.trades.len(),
                        final_cash = r.final_cash,
                        total_value = r.total_value,
                        return_pct = r.return_pct,
                        "Backtest result"
                    ),
                    None => warn!(bucket = %bucket.bucket, "No backtest result for bucket"),
                }
            }
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "Could not render cycle report"),
            }
        }
    }

    // Keep main alive for the API
    info!("Startup cycle finished. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
}
