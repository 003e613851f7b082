//! Symbol universe providers

use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

use arb_core::{Symbol, UniverseConfig, UniverseError, UniverseResult};

/// Supplies the ordered symbols to scan and their display references
#[async_trait::async_trait]
pub trait SymbolUniverseProvider: Send + Sync {
    async fn list_symbols(&self) -> UniverseResult<Vec<Symbol>>;

    /// Opaque display reference, e.g. a listing slug
    fn resolve_reference(&self, symbol: &Symbol) -> String;
}

/// Reference used when the provider knows nothing about a symbol
pub fn fallback_reference(symbol: &Symbol) -> String {
    symbol.base().to_lowercase()
}

/// Fixed, configured symbol list
pub struct StaticUniverse {
    symbols: Vec<Symbol>,
}

impl StaticUniverse {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }
}

#[async_trait::async_trait]
impl SymbolUniverseProvider for StaticUniverse {
    async fn list_symbols(&self) -> UniverseResult<Vec<Symbol>> {
        Ok(self.symbols.clone())
    }

    fn resolve_reference(&self, symbol: &Symbol) -> String {
        fallback_reference(symbol)
    }
}

/// Ranked listing from the CoinMarketCap API
pub struct CoinMarketCapUniverse {
    http: Client,
    config: UniverseConfig,
    /// Base asset to listing slug, accumulated across loads
    slugs: RwLock<HashMap<String, String>>,
}

impl CoinMarketCapUniverse {
    pub fn new(config: UniverseConfig, http: Client) -> Self {
        Self {
            http,
            config,
            slugs: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: UniverseConfig) -> UniverseResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| UniverseError::Request(e.to_string()))?;
        Ok(Self::new(config, http))
    }

    pub fn known_references(&self) -> usize {
        self.slugs.read().len()
    }
}

#[async_trait::async_trait]
impl SymbolUniverseProvider for CoinMarketCapUniverse {
    async fn list_symbols(&self) -> UniverseResult<Vec<Symbol>> {
        let url = format!(
            "{}/v1/cryptocurrency/listings/latest",
            self.config.api_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .header("X-CMC_PRO_API_KEY", self.config.api_key.as_deref().unwrap_or_default())
            .query(&[
                ("start", self.config.start.to_string()),
                ("limit", self.config.limit.to_string()),
                ("convert", self.config.convert.clone()),
            ])
            .send()
            .await
            .map_err(|e| UniverseError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UniverseError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let listings: CmcListings = response
            .json()
            .await
            .map_err(|e| UniverseError::Malformed(e.to_string()))?;

        let (symbols, slugs) = parse_listings(listings, &self.config.quote_asset);
        info!("Loaded {} symbols from CoinMarketCap", symbols.len());

        self.slugs.write().extend(slugs);
        Ok(symbols)
    }

    fn resolve_reference(&self, symbol: &Symbol) -> String {
        self.slugs
            .read()
            .get(symbol.base())
            .cloned()
            .unwrap_or_else(|| fallback_reference(symbol))
    }
}

/// `/v1/cryptocurrency/listings/latest` response body
#[derive(Debug, Deserialize)]
pub struct CmcListings {
    pub data: Vec<CmcListing>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CmcListing {
    pub symbol: String,
    pub slug: Option<String>,
}

/// Turn a listings payload into `COIN/<quote>` symbols in rank order plus a
/// base-asset to slug map. The first (highest ranked) coin wins a ticker clash.
pub fn parse_listings(
    listings: CmcListings,
    quote_asset: &str,
) -> (Vec<Symbol>, HashMap<String, String>) {
    let mut seen = HashSet::new();
    let mut symbols = Vec::with_capacity(listings.data.len());
    let mut slugs = HashMap::new();

    for coin in listings.data {
        let symbol = match Symbol::new(&coin.symbol, quote_asset) {
            Ok(symbol) => symbol,
            Err(e) => {
                debug!("Skipping listing entry: {}", e);
                continue;
            }
        };

        if !seen.insert(symbol.clone()) {
            continue;
        }

        if let Some(slug) = coin.slug {
            slugs.insert(symbol.base().to_string(), slug);
        }
        symbols.push(symbol);
    }

    (symbols, slugs)
}
