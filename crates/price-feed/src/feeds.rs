//! Exchange price feeds with retry and lazy market discovery

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use arb_core::{
    FetchError, FetchResult, PriceQuote, RetryConfig, SourceError, SourceResult, Symbol,
};
use crate::state::MarketCache;

/// Uniform last-price capability of one exchange.
///
/// Failures are expected outcomes: callers drop the exchange from the snapshot.
#[async_trait::async_trait]
pub trait ExchangeClient: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_last_price(&self, symbol: &Symbol) -> FetchResult<PriceQuote>;
}

/// Raw market data access for one venue, without retries
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;
    async fn load_markets(&self) -> SourceResult<HashSet<Symbol>>;
    async fn last_price(&self, symbol: &Symbol) -> SourceResult<Decimal>;
}

/// Retries ran out
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: SourceError,
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached, sleeping
/// `base * 2^attempt` between attempts. There is no sleep after the last one.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryConfig,
    what: &str,
    mut op: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;

                if attempt >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }

                let delay = policy.delay_for(attempt - 1);
                debug!(
                    "{} failed: {}; retrying in {:?} (attempt {}/{})",
                    what, e, delay, attempt, max_attempts
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// `ExchangeClient` over any `MarketDataSource`, adding the retry policy and
/// a lazily refreshed supported-symbol cache
pub struct RetryingExchange<S> {
    source: S,
    retry: RetryConfig,
    markets_ttl: Duration,
    markets: Mutex<Option<MarketCache>>,
}

impl<S: MarketDataSource> RetryingExchange<S> {
    pub fn new(source: S, retry: RetryConfig, markets_ttl: Duration) -> Self {
        Self {
            source,
            retry,
            markets_ttl,
            markets: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Check the symbol against the cached listing, loading it first if it is
    /// missing or stale. Concurrent callers wait on the same load.
    async fn supports(&self, symbol: &Symbol) -> FetchResult<bool> {
        let mut guard = self.markets.lock().await;

        let needs_load = guard
            .as_ref()
            .map_or(true, |cache| cache.is_stale(self.markets_ttl));

        if needs_load {
            let what = format!("{} market list", self.source.name());
            match with_retry(&self.retry, &what, || self.source.load_markets()).await {
                Ok(markets) => {
                    info!("Loaded {} markets from {}", markets.len(), self.source.name());
                    *guard = Some(MarketCache::new(markets));
                }
                Err(exhausted) => match guard.as_mut() {
                    Some(cache) => {
                        warn!(
                            "Refreshing {} markets failed ({}), keeping {} cached",
                            self.source.name(),
                            exhausted.last_error,
                            cache.len()
                        );
                        cache.touch();
                    }
                    None => {
                        return Err(FetchError::Unavailable {
                            exchange: self.source.name().to_string(),
                            symbol: symbol.to_string(),
                            attempts: exhausted.attempts,
                            reason: exhausted.last_error.to_string(),
                        });
                    }
                },
            }
        }

        Ok(guard.as_ref().map_or(false, |cache| cache.contains(symbol)))
    }
}

#[async_trait::async_trait]
impl<S: MarketDataSource> ExchangeClient for RetryingExchange<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn fetch_last_price(&self, symbol: &Symbol) -> FetchResult<PriceQuote> {
        if !self.supports(symbol).await? {
            return Err(FetchError::Unsupported {
                exchange: self.name().to_string(),
                symbol: symbol.to_string(),
            });
        }

        let what = format!("{} price of {}", self.name(), symbol);
        match with_retry(&self.retry, &what, || self.source.last_price(symbol)).await {
            Ok(price) => Ok(PriceQuote::new(self.name(), symbol.clone(), price)),
            Err(exhausted) => Err(FetchError::Unavailable {
                exchange: self.name().to_string(),
                symbol: symbol.to_string(),
                attempts: exhausted.attempts,
                reason: exhausted.last_error.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Source that replays scripted price results
    struct ScriptedSource {
        markets: HashSet<Symbol>,
        market_failures: AtomicU32,
        prices: SyncMutex<VecDeque<SourceResult<Decimal>>>,
        market_calls: AtomicU32,
        price_calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(prices: Vec<SourceResult<Decimal>>) -> Self {
            Self {
                markets: [symbol()].into_iter().collect(),
                market_failures: AtomicU32::new(0),
                prices: SyncMutex::new(prices.into()),
                market_calls: AtomicU32::new(0),
                price_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn load_markets(&self) -> SourceResult<HashSet<Symbol>> {
            self.market_calls.fetch_add(1, Ordering::SeqCst);
            if self.market_failures.load(Ordering::SeqCst) > 0 {
                self.market_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SourceError::Timeout);
            }
            Ok(self.markets.clone())
        }

        async fn last_price(&self, _symbol: &Symbol) -> SourceResult<Decimal> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            self.prices
                .lock()
                .pop_front()
                .unwrap_or(Err(SourceError::Http("script exhausted".into())))
        }
    }

    fn symbol() -> Symbol {
        "BTC/USDT".parse().unwrap()
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    fn exchange(source: ScriptedSource) -> RetryingExchange<ScriptedSource> {
        RetryingExchange::new(source, RetryConfig::default(), Duration::from_secs(3_600))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let client = exchange(ScriptedSource::new(vec![Ok(Decimal::from(42))]));

        let quote = client.fetch_last_price(&symbol()).await.unwrap();
        assert_eq!(quote.exchange, "scripted");
        assert_eq!(quote.last_price, Decimal::from(42));
        assert_eq!(client.source().price_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_backoff_then_success() {
        let client = exchange(ScriptedSource::new(vec![
            Err(SourceError::RateLimited(429)),
            Err(SourceError::Timeout),
            Ok(Decimal::from(7)),
        ]));

        let start = Instant::now();
        let quote = client.fetch_last_price(&symbol()).await.unwrap();

        assert_eq!(quote.last_price, Decimal::from(7));
        // 5s after the first failure, 10s after the second
        assert_elapsed(start, Duration::from_secs(15));
        assert_eq!(client.source().price_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_after_exhausting_attempts() {
        let client = exchange(ScriptedSource::new(vec![
            Err(SourceError::Http("reset".into())),
            Err(SourceError::Http("reset".into())),
            Err(SourceError::Http("reset".into())),
            Ok(Decimal::ONE),
        ]));

        let start = Instant::now();
        let err = client.fetch_last_price(&symbol()).await.unwrap_err();

        match err {
            FetchError::Unavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_elapsed(start, Duration::from_secs(15));
        assert_eq!(client.source().price_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_skips_price_calls() {
        let client = exchange(ScriptedSource::new(vec![Ok(Decimal::ONE)]));
        let unlisted: Symbol = "DOGE/USDT".parse().unwrap();

        let start = Instant::now();
        let err = client.fetch_last_price(&unlisted).await.unwrap_err();

        assert!(err.is_unsupported());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(client.source().price_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_markets_loaded_once_within_ttl() {
        let client = exchange(ScriptedSource::new(vec![Ok(Decimal::ONE), Ok(Decimal::TWO)]));

        client.fetch_last_price(&symbol()).await.unwrap();
        client.fetch_last_price(&symbol()).await.unwrap();

        assert_eq!(client.source().market_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_market_load_failure_is_unavailable() {
        let source = ScriptedSource::new(vec![Ok(Decimal::ONE)]);
        source.market_failures.store(3, Ordering::SeqCst);
        let client = exchange(source);

        let err = client.fetch_last_price(&symbol()).await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable { .. }));
        assert_eq!(client.source().price_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_cached_markets() {
        let client = RetryingExchange::new(
            ScriptedSource::new(vec![Ok(Decimal::ONE), Ok(Decimal::TWO)]),
            RetryConfig { max_attempts: 1, base_delay_ms: 10 },
            Duration::from_secs(60),
        );

        client.fetch_last_price(&symbol()).await.unwrap();
        client.source().market_failures.store(1, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(61)).await;

        let quote = client.fetch_last_price(&symbol()).await.unwrap();
        assert_eq!(quote.last_price, Decimal::TWO);
        assert_eq!(client.source().market_calls.load(Ordering::SeqCst), 2);
    }
}
