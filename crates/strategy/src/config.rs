use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The `[strategy]` table of the settings file.
///
/// ```toml
/// [strategy]
/// type = "macd"
/// name = "MACD 12/26/9"
///
/// [strategy.params]
/// fast = 12
/// slow = 26
/// signal = 9
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier. Only "macd" is known.
    #[serde(rename = "type", default = "default_type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs and API output.
    #[serde(default = "default_name")]
    pub name: String,
    /// Indicator-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            strategy_type: default_type(),
            name: default_name(),
            params: HashMap::new(),
        }
    }
}

fn default_type() -> String {
    "macd".to_string()
}

fn default_name() -> String {
    "MACD crossover".to_string()
}
