// src/config.rs
// Application configuration: YAML file with environment overrides

use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::domain::errors::{AppError, AppResult};
use crate::exchange::client::ExchangeConfig;
use crate::risk::RiskConfig;
use crate::strategy::imbalance::ObiConfig;
use crate::strategy::signal_filter::SignalFilterConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Master switch; with trading disabled signals are generated and logged
    /// but no orders leave the process.
    pub enabled: bool,
    pub symbols: Vec<String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            enabled: false,
            symbols: vec!["BTCUSDT".to_string()],
        }
    }
}

impl TradingConfig {
    pub fn primary_symbol(&self) -> &str {
        self.symbols.first().map(String::as_str).unwrap_or("BTCUSDT")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub obi: ObiConfig,
    pub filter: SignalFilterConfig,
    pub risk: RiskConfig,
}

impl AppConfig {
    /// Load from a YAML file, then apply environment overrides for the API
    /// credentials so secrets can stay out of the config file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut config: AppConfig = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment-only configuration, used when no config file is present.
    pub fn from_env() -> Self {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        dotenv::dotenv().ok();

        if let Ok(key) = env::var("BINANCE_API_KEY") {
            self.exchange.api_key = key;
        }
        if let Ok(secret) = env::var("BINANCE_API_SECRET") {
            self.exchange.secret_key = secret;
        }
    }

    /// Live trading needs credentials before the loop starts.
    pub fn validate_for_live(&self) -> AppResult<()> {
        if self.exchange.api_key.is_empty() || self.exchange.secret_key.is_empty() {
            return Err(AppError::Config(
                "api_key and secret_key are required for live mode (set them in the \
                 config file or via BINANCE_API_KEY / BINANCE_API_SECRET)"
                    .to_string(),
            ));
        }
        if self.trading.symbols.is_empty() {
            return Err(AppError::Config("at least one trading symbol is required".to_string()));
        }
        Ok(())
    }
}
