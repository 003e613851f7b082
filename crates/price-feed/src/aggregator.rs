//! Price aggregator - fans one symbol out to every exchange

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use arb_core::{PriceSnapshot, Symbol};
use crate::feeds::ExchangeClient;

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Budget for one exchange call, retries and backoff included
    pub call_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Queries all configured exchanges for one symbol at a time
pub struct PriceAggregator {
    config: AggregatorConfig,
    clients: Vec<Arc<dyn ExchangeClient>>,
}

impl PriceAggregator {
    pub fn new(config: AggregatorConfig, clients: Vec<Arc<dyn ExchangeClient>>) -> Self {
        Self { config, clients }
    }

    pub fn exchange_count(&self) -> usize {
        self.clients.len()
    }

    pub fn exchange_names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    /// Fetch the symbol from every exchange concurrently.
    ///
    /// Each call runs under its own timeout; failed or late exchanges are left
    /// out of the snapshot, which may end up empty.
    pub async fn aggregate(&self, symbol: &Symbol) -> PriceSnapshot {
        let calls = self.clients.iter().cloned().map(|client| async move {
            match tokio::time::timeout(self.config.call_timeout, client.fetch_last_price(symbol))
                .await
            {
                Ok(Ok(quote)) => Some(quote),
                Ok(Err(e)) if e.is_unsupported() => {
                    debug!("{}", e);
                    None
                }
                Ok(Err(e)) => {
                    warn!("{}", e);
                    None
                }
                Err(_) => {
                    warn!(
                        "{} timed out for {} after {:?}",
                        client.name(),
                        symbol,
                        self.config.call_timeout
                    );
                    None
                }
            }
        });

        let quotes = join_all(calls).await;
        let snapshot = PriceSnapshot::from_quotes(symbol.clone(), quotes.into_iter().flatten());

        debug!(
            "{}: {}/{} exchanges quoted",
            symbol,
            snapshot.len(),
            self.clients.len()
        );
        snapshot
    }
}
