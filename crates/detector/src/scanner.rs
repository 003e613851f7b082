//! Batched opportunity scanner

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info};

use arb_core::{Opportunity, ScannerConfig, Symbol};
use arb_price_feed::PriceAggregator;

/// Result of one pass over the symbol universe
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// In input symbol order
    pub opportunities: Vec<Opportunity>,
    pub batch_sizes: Vec<usize>,
    pub symbols_scanned: usize,
    /// Symbols with at least two quotes
    pub symbols_priced: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }
}

/// Walks the universe in throttled batches and keeps the spreads above the
/// threshold
pub struct OpportunityScanner {
    config: ScannerConfig,
    aggregator: PriceAggregator,
}

impl OpportunityScanner {
    pub fn new(config: ScannerConfig, aggregator: PriceAggregator) -> Self {
        Self { config, aggregator }
    }

    pub fn aggregator(&self) -> &PriceAggregator {
        &self.aggregator
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan every symbol once.
    ///
    /// Symbols whose exchanges all fail simply yield nothing. The pause between
    /// batches only spaces out requests.
    pub async fn scan(&self, symbols: &[Symbol]) -> ScanReport {
        let start = Instant::now();
        let started_at = Utc::now();
        let batch_size = self.config.batch_size.max(1);
        let concurrency = self.config.symbol_concurrency.max(1);

        let mut opportunities = Vec::new();
        let mut batch_sizes = Vec::new();
        let mut symbols_priced = 0;

        for (index, batch) in symbols.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_pause().is_zero() {
                tokio::time::sleep(self.config.batch_pause()).await;
            }

            let snapshots: Vec<_> = stream::iter(batch.iter().cloned())
                .map(|symbol| async move { self.aggregator.aggregate(&symbol).await })
                .buffered(concurrency)
                .collect()
                .await;

            for snapshot in &snapshots {
                if snapshot.len() >= 2 {
                    symbols_priced += 1;
                }

                if let Some(opp) =
                    Opportunity::detect(snapshot, self.config.threshold_percent, Utc::now())
                {
                    info!(
                        "Opportunity: {} buy {}@{} sell {}@{} spread={}%",
                        opp.symbol,
                        opp.buy_exchange,
                        opp.display_buy_price(),
                        opp.sell_exchange,
                        opp.display_sell_price(),
                        opp.display_spread()
                    );
                    opportunities.push(opp);
                }
            }

            debug!(
                "Batch {} done: {} symbols, {} opportunities so far",
                index + 1,
                batch.len(),
                opportunities.len()
            );
            batch_sizes.push(batch.len());
        }

        info!(
            "Scanned {} symbols in {} batches, {} priced, {} opportunities in {:?}",
            symbols.len(),
            batch_sizes.len(),
            symbols_priced,
            opportunities.len(),
            start.elapsed()
        );

        ScanReport {
            opportunities,
            batch_sizes,
            symbols_scanned: symbols.len(),
            symbols_priced,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
