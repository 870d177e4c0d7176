use std::time::Duration;

/// Where price history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Yahoo,
    Csv,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Yahoo => write!(f, "yahoo"),
            DataSource::Csv => write!(f, "csv"),
        }
    }
}

/// Process-level configuration loaded from environment variables at startup.
/// Screening and backtest parameters live in the TOML settings file instead.
#[derive(Debug, Clone)]
pub struct Config {
    // Price data
    pub data_source: DataSource,
    pub csv_data_dir: String,
    pub yahoo_base_url: String,
    pub provider_timeout: Duration,
    pub provider_max_retries: u32,

    // Screening
    pub screen_concurrency: usize,

    // JSON API
    pub api_port: u16,

    // Settings file path
    pub settings_path: String,
}

impl Config {
    pub const DEFAULT_YAHOO_BASE_URL: &'static str = "https://query1.finance.yahoo.com";

    /// Load configuration from environment variables.
    /// Loads `.env` if present. Panics on a malformed value.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let data_source = match optional_env("DATA_SOURCE")
            .unwrap_or_else(|| "yahoo".to_string())
            .to_lowercase()
            .as_str()
        {
            "yahoo" => DataSource::Yahoo,
            "csv" => DataSource::Csv,
            other => panic!("ERROR: DATA_SOURCE must be 'yahoo' or 'csv', got: '{other}'"),
        };

        Config {
            data_source,
            csv_data_dir: optional_env("CSV_DATA_DIR").unwrap_or_else(|| "data".to_string()),
            yahoo_base_url: optional_env("YAHOO_BASE_URL")
                .unwrap_or_else(|| Self::DEFAULT_YAHOO_BASE_URL.to_string()),
            provider_timeout: Duration::from_secs(parsed_env("PROVIDER_TIMEOUT_SECS", 10)),
            provider_max_retries: parsed_env("PROVIDER_MAX_RETRIES", 2),
            screen_concurrency: parsed_env::<usize>("SCREEN_CONCURRENCY", 8).max(1),
            api_port: parsed_env("API_PORT", 8080),
            settings_path: optional_env("SETTINGS_PATH")
                .unwrap_or_else(|| "config/screener.toml".to_string()),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match optional_env(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            panic!("Environment variable '{key}' has an invalid value: '{raw}'")
        }),
        None => default,
    }
}
