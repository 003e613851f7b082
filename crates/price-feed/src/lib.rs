//! Exchange price feeds and per-symbol aggregation
//!
//! Features:
//! - REST adapters for Binance, Crypto.com, Gate.io, HTX and XT
//! - Exponential-backoff retries and lazily cached market listings
//! - Concurrent per-symbol fan-out with per-call timeouts
//! - Symbol universe providers (CoinMarketCap, static list)

pub mod aggregator;
pub mod feeds;
pub mod state;
pub mod universe;
pub mod venues;

pub use aggregator::{AggregatorConfig, PriceAggregator};
pub use feeds::{with_retry, ExchangeClient, MarketDataSource, RetryExhausted, RetryingExchange};
pub use state::MarketCache;
pub use universe::{
    fallback_reference, CoinMarketCapUniverse, StaticUniverse, SymbolUniverseProvider,
};
pub use venues::{build_clients, HttpVenue};
