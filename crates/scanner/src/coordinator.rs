//! Single-flight scan cycles: universe → scan → dedup → alerts

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use arb_core::{AppConfig, Opportunity, UniverseError, UniverseSource};
use arb_detector::{AlertDeduplicator, OpportunityScanner, ScanReport};
use arb_notifier::{AlertSink, LogSink, Notifier, TelegramConfig, TelegramSink};
use arb_price_feed::{
    build_clients, AggregatorConfig, CoinMarketCapUniverse, PriceAggregator, StaticUniverse,
    SymbolUniverseProvider,
};

/// Why a cycle produced no report
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("a scan is already in progress")]
    AlreadyRunning,

    #[error("failed to load symbol universe: {0}")]
    Universe(#[from] UniverseError),
}

/// An opportunity that passed the cooldown gate
#[derive(Debug, Clone)]
pub struct AlertedOpportunity {
    pub opportunity: Opportunity,
    pub reference: String,
    pub reference_url: String,
    /// False when the alert sink failed; the cooldown is recorded regardless
    pub delivered: bool,
}

/// Everything the presentation layer needs about one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub alerts: Vec<AlertedOpportunity>,
    /// Opportunities held back by the cooldown
    pub suppressed: usize,
    pub scan: ScanReport,
}

/// Runs full scan cycles, never more than one at a time.
///
/// The deduplicator lives behind the cycle lock, so only the running cycle can
/// touch it.
pub struct ScanCoordinator {
    universe: Arc<dyn SymbolUniverseProvider>,
    scanner: OpportunityScanner,
    notifier: Notifier,
    reference_url_base: String,
    dedup: Mutex<AlertDeduplicator>,
}

impl ScanCoordinator {
    pub fn new(
        universe: Arc<dyn SymbolUniverseProvider>,
        scanner: OpportunityScanner,
        notifier: Notifier,
        dedup: AlertDeduplicator,
        reference_url_base: impl Into<String>,
    ) -> Self {
        Self {
            universe,
            scanner,
            notifier,
            reference_url_base: reference_url_base.into().trim_end_matches('/').to_string(),
            dedup: Mutex::new(dedup),
        }
    }

    /// Wire exchanges, universe and alert sink from configuration
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let clients = build_clients(&config.exchanges, &config.retry)?;
        let aggregator = PriceAggregator::new(
            AggregatorConfig {
                call_timeout: config.scanner.call_timeout(),
            },
            clients,
        );
        let scanner = OpportunityScanner::new(config.scanner.clone(), aggregator);

        let universe: Arc<dyn SymbolUniverseProvider> = match config.universe.source {
            UniverseSource::CoinMarketCap => {
                Arc::new(CoinMarketCapUniverse::from_config(config.universe.clone())?)
            }
            UniverseSource::Static => Arc::new(StaticUniverse::new(config.universe.symbols.clone())),
        };

        let sink: Arc<dyn AlertSink> = match TelegramConfig::from_alerts(&config.alerts) {
            Some(telegram) => Arc::new(TelegramSink::new(telegram)?),
            None => {
                warn!("Telegram credentials not set, alerts go to the log only");
                Arc::new(LogSink)
            }
        };

        Ok(Self::new(
            universe,
            scanner,
            Notifier::new(sink),
            AlertDeduplicator::new(config.alerts.cooldown()),
            config.presentation.reference_url_base.clone(),
        ))
    }

    pub fn is_running(&self) -> bool {
        self.dedup.try_lock().is_err()
    }

    pub fn threshold(&self) -> rust_decimal::Decimal {
        self.scanner.config().threshold_percent
    }

    /// Run one cycle, or fail fast with `AlreadyRunning` if one is active.
    ///
    /// A universe failure ends the cycle before any dedup state changes.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let mut dedup = self
            .dedup
            .try_lock()
            .map_err(|_| CycleError::AlreadyRunning)?;

        info!("Scanning for arbitrage opportunities");
        let symbols = self.universe.list_symbols().await?;
        let scan = self.scanner.scan(&symbols).await;

        let mut alerts = Vec::new();
        let mut suppressed = 0;

        for opp in scan.opportunities.clone() {
            if !dedup.should_alert(&opp.symbol, Utc::now()) {
                suppressed += 1;
                continue;
            }

            let reference = self.universe.resolve_reference(&opp.symbol);
            let reference_url = format!("{}/{}", self.reference_url_base, reference);
            let delivered = self.notifier.emit(&opp).await.is_ok();

            alerts.push(AlertedOpportunity {
                opportunity: opp,
                reference,
                reference_url,
                delivered,
            });
        }

        info!(
            "Cycle done: {} alerted, {} suppressed by cooldown",
            alerts.len(),
            suppressed
        );

        Ok(CycleReport {
            alerts,
            suppressed,
            scan,
        })
    }

    /// Run one cycle unless `cancel` resolves first. In-flight exchange calls
    /// are dropped on cancellation and `None` is returned.
    pub async fn run_until<F>(&self, cancel: F) -> Option<Result<CycleReport, CycleError>>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run_cycle() => Some(result),
            _ = cancel => {
                info!("Scan cancelled");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_core::{
        DeliveryError, DeliveryResult, FetchError, FetchResult, PriceQuote, ScannerConfig, Symbol,
        UniverseResult,
    };
    use arb_price_feed::{fallback_reference, ExchangeClient};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestUniverse {
        symbols: Vec<Symbol>,
        fail: AtomicBool,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl SymbolUniverseProvider for TestUniverse {
        async fn list_symbols(&self) -> UniverseResult<Vec<Symbol>> {
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(UniverseError::Status {
                    status: 401,
                    body: "invalid api key".into(),
                });
            }
            Ok(self.symbols.clone())
        }

        fn resolve_reference(&self, symbol: &Symbol) -> String {
            if symbol.base() == "XYZ" {
                "xyz-network".to_string()
            } else {
                fallback_reference(symbol)
            }
        }
    }

    struct PriceTable {
        name: &'static str,
        prices: HashMap<String, i64>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ExchangeClient for PriceTable {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_last_price(&self, symbol: &Symbol) -> FetchResult<PriceQuote> {
            tokio::time::sleep(self.delay).await;
            match self.prices.get(&symbol.to_string()) {
                Some(p) => Ok(PriceQuote::new(self.name, symbol.clone(), Decimal::from(*p))),
                None => Err(FetchError::Unsupported {
                    exchange: self.name.into(),
                    symbol: symbol.to_string(),
                }),
            }
        }
    }

    struct CountingSink {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl AlertSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&self, _message: &str) -> DeliveryResult<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DeliveryError::Rejected("chat not found".into()));
            }
            Ok(())
        }
    }

    struct Fixture {
        coordinator: ScanCoordinator,
        universe: Arc<TestUniverse>,
        sink: Arc<CountingSink>,
    }

    fn fixture(universe_delay: Duration, exchange_delay: Duration, sink_fails: bool) -> Fixture {
        let table = |name: &'static str, xyz: i64, abc: i64| -> Arc<dyn ExchangeClient> {
            Arc::new(PriceTable {
                name,
                prices: [("XYZ/USDT".to_string(), xyz), ("ABC/USDT".to_string(), abc)]
                    .into_iter()
                    .collect(),
                delay: exchange_delay,
            })
        };

        let universe = Arc::new(TestUniverse {
            symbols: vec!["XYZ/USDT".parse().unwrap(), "ABC/USDT".parse().unwrap()],
            fail: AtomicBool::new(false),
            delay: universe_delay,
        });
        let sink = Arc::new(CountingSink {
            sent: AtomicUsize::new(0),
            fail: sink_fails,
        });

        let aggregator = PriceAggregator::new(
            AggregatorConfig::default(),
            vec![table("A", 100, 100), table("B", 104, 120), table("C", 106, 101)],
        );

        let coordinator = ScanCoordinator::new(
            universe.clone(),
            OpportunityScanner::new(ScannerConfig::default(), aggregator),
            Notifier::new(sink.clone()),
            AlertDeduplicator::new(Duration::from_secs(3_600)),
            "https://coinmarketcap.com/currencies/",
        );

        Fixture {
            coordinator,
            universe,
            sink,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_alerts_with_reference_links() {
        let f = fixture(Duration::ZERO, Duration::ZERO, false);

        let report = f.coordinator.run_cycle().await.unwrap();

        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.suppressed, 0);
        assert_eq!(
            report.alerts[0].reference_url,
            "https://coinmarketcap.com/currencies/xyz-network"
        );
        assert_eq!(report.alerts[1].reference, "abc");
        assert_eq!(report.alerts[1].opportunity.sell_exchange, "B");
        assert!(report.alerts.iter().all(|a| a.delivered));
        assert_eq!(f.sink.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_runs_on_spawned_worker() {
        let f = fixture(Duration::ZERO, Duration::from_millis(10), false);
        let coordinator = Arc::new(f.coordinator);

        let worker = coordinator.clone();
        let report = tokio::spawn(async move { worker.run_cycle().await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.alerts.len(), 2);

        let worker = coordinator.clone();
        let outcome = tokio::spawn(async move { worker.run_until(std::future::pending()).await })
            .await
            .unwrap();
        assert_eq!(outcome.unwrap().unwrap().suppressed, 2);
        assert_eq!(f.sink.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_cycle_is_suppressed_by_cooldown() {
        let f = fixture(Duration::ZERO, Duration::ZERO, false);

        f.coordinator.run_cycle().await.unwrap();
        let second = f.coordinator.run_cycle().await.unwrap();

        assert!(second.alerts.is_empty());
        assert_eq!(second.suppressed, 2);
        assert_eq!(second.scan.opportunities.len(), 2);
        assert_eq!(f.sink.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_trigger_is_rejected() {
        let f = fixture(Duration::from_secs(5), Duration::ZERO, false);

        let (first, second) = tokio::join!(f.coordinator.run_cycle(), async {
            tokio::task::yield_now().await;
            f.coordinator.run_cycle().await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(CycleError::AlreadyRunning)));
        assert!(!f.coordinator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_universe_failure_leaves_dedup_untouched() {
        let f = fixture(Duration::ZERO, Duration::ZERO, false);
        f.universe.fail.store(true, Ordering::SeqCst);

        let err = f.coordinator.run_cycle().await.unwrap_err();
        assert!(matches!(err, CycleError::Universe(_)));
        assert!(err.to_string().contains("invalid api key"));

        f.universe.fail.store(false, Ordering::SeqCst);
        let report = f.coordinator.run_cycle().await.unwrap();
        assert_eq!(report.alerts.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_failure_still_starts_cooldown() {
        let f = fixture(Duration::ZERO, Duration::ZERO, true);

        let report = f.coordinator.run_cycle().await.unwrap();
        assert_eq!(report.alerts.len(), 2);
        assert!(report.alerts.iter().all(|a| !a.delivered));

        let second = f.coordinator.run_cycle().await.unwrap();
        assert_eq!(second.suppressed, 2);
        assert_eq!(f.sink.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_abandons_cycle() {
        let f = fixture(Duration::ZERO, Duration::from_secs(30), false);

        let outcome = f
            .coordinator
            .run_until(tokio::time::sleep(Duration::from_secs(1)))
            .await;

        assert!(outcome.is_none());
        assert!(!f.coordinator.is_running());
        assert_eq!(f.sink.sent.load(Ordering::SeqCst), 0);
    }
}
