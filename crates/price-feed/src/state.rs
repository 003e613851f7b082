//! Cached market listings per exchange
//!
//! Venues are asked for their spot market list lazily; the list is trusted for
//! a TTL and then reloaded on the next price request.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

use arb_core::Symbol;

/// Supported-symbol set of one venue, timestamped at load
#[derive(Debug, Clone)]
pub struct MarketCache {
    markets: HashSet<Symbol>,
    loaded_at: Instant,
}

impl MarketCache {
    pub fn new(markets: HashSet<Symbol>) -> Self {
        Self {
            markets,
            loaded_at: Instant::now(),
        }
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.markets.contains(symbol)
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// Keep trusting the current listing for another TTL
    pub fn touch(&mut self) {
        self.loaded_at = Instant::now();
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}
