//! Configuration types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{CoreError, CoreResult, Exchange, Symbol};

/// Scan and detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub threshold_percent: Decimal,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    /// Symbols aggregated at once inside a batch; 1 keeps the scan sequential
    pub symbol_concurrency: usize,
    /// Upper bound on a single exchange call, retries included
    pub call_timeout_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            threshold_percent: Decimal::from(5),
            batch_size: 10,
            batch_pause_ms: 200,
            symbol_concurrency: 1,
            call_timeout_ms: 60_000,
        }
    }
}

impl ScannerConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Exponential backoff for exchange calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Delay after the failed attempt `attempt` (zero-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Worst-case time spent sleeping between attempts
    pub fn backoff_ceiling(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|a| self.delay_for(a))
            .sum()
    }
}

/// Per-venue overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub base_url: Option<String>,
}

/// Exchange connectivity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangesConfig {
    pub enabled: Vec<Exchange>,
    pub request_timeout_ms: u64,
    /// How long a venue's market list is trusted before reloading
    pub markets_ttl_secs: u64,
    pub venues: HashMap<Exchange, VenueConfig>,
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            enabled: Exchange::ALL.to_vec(),
            request_timeout_ms: 10_000,
            markets_ttl_secs: 3_600,
            venues: HashMap::new(),
        }
    }
}

impl ExchangesConfig {
    pub fn base_url(&self, exchange: Exchange) -> String {
        self.venues
            .get(&exchange)
            .and_then(|v| v.base_url.clone())
            .unwrap_or_else(|| exchange.default_base_url().to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn markets_ttl(&self) -> Duration {
        Duration::from_secs(self.markets_ttl_secs)
    }
}

/// Alert channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub cooldown_secs: u64,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 3_600,
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Where the symbol universe comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseSource {
    CoinMarketCap,
    Static,
}

/// Symbol universe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub source: UniverseSource,
    pub api_url: String,
    pub api_key: Option<String>,
    pub start: u32,
    pub limit: u32,
    pub convert: String,
    pub quote_asset: String,
    pub symbols: Vec<Symbol>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            source: UniverseSource::CoinMarketCap,
            api_url: "https://pro-api.coinmarketcap.com".to_string(),
            api_key: None,
            start: 100,
            limit: 1_500,
            convert: "USD".to_string(),
            quote_asset: "USDT".to_string(),
            symbols: vec![],
        }
    }
}

/// Console presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub reference_url_base: String,
    /// Periodic trigger; manual triggers only when unset
    pub scan_interval_secs: Option<u64>,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            reference_url_base: "https://coinmarketcap.com/currencies".to_string(),
            scan_interval_secs: None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub retry: RetryConfig,
    pub exchanges: ExchangesConfig,
    pub alerts: AlertConfig,
    pub universe: UniverseConfig,
    pub presentation: PresentationConfig,
}

impl AppConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.scanner.batch_size == 0 {
            return Err(CoreError::InvalidConfig("scanner.batch_size must be > 0".into()));
        }
        if self.scanner.symbol_concurrency == 0 {
            return Err(CoreError::InvalidConfig(
                "scanner.symbol_concurrency must be > 0".into(),
            ));
        }
        if self.scanner.threshold_percent < Decimal::ZERO {
            return Err(CoreError::InvalidConfig(
                "scanner.threshold_percent must not be negative".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(CoreError::InvalidConfig("retry.max_attempts must be > 0".into()));
        }
        if self.exchanges.enabled.is_empty() {
            return Err(CoreError::InvalidConfig("exchanges.enabled is empty".into()));
        }
        if self.universe.source == UniverseSource::Static && self.universe.symbols.is_empty() {
            return Err(CoreError::InvalidConfig(
                "universe.symbols is required for the static source".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.scanner.threshold_percent, Decimal::from(5));
        assert_eq!(config.scanner.batch_size, 10);
        assert_eq!(config.scanner.batch_pause(), Duration::from_millis(200));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 5_000);
        assert_eq!(config.alerts.cooldown(), Duration::from_secs(3_600));
        assert_eq!(config.exchanges.enabled.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_schedule() {
        let retry = RetryConfig::default();

        assert_eq!(retry.delay_for(0), Duration::from_secs(5));
        assert_eq!(retry.delay_for(1), Duration::from_secs(10));
        assert_eq!(retry.delay_for(2), Duration::from_secs(20));
        assert_eq!(retry.backoff_ceiling(), Duration::from_secs(15));
    }

    #[test]
    fn test_validation_rejects_zero_batch() {
        let mut config = AppConfig::default();
        config.scanner.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"scanner": {"threshold_percent": "2.5"}, "exchanges": {"enabled": ["binance", "xt"]}}"#,
        )
        .unwrap();

        assert_eq!(config.scanner.threshold_percent, Decimal::new(25, 1));
        assert_eq!(config.scanner.batch_size, 10);
        assert_eq!(config.exchanges.enabled, vec![Exchange::Binance, Exchange::Xt]);
        assert_eq!(
            config.exchanges.base_url(Exchange::Xt),
            "https://sapi.xt.com"
        );
    }

    #[test]
    fn test_static_universe_requires_symbols() {
        let mut config = AppConfig::default();
        config.universe.source = UniverseSource::Static;
        assert!(config.validate().is_err());

        config.universe.symbols = vec!["BTC/USDT".parse().unwrap()];
        assert!(config.validate().is_ok());
    }
}
