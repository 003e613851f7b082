//! Price quote and snapshot types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Symbol;

/// Last traded price of a symbol on one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub exchange: String,
    pub symbol: Symbol,
    pub last_price: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(exchange: impl Into<String>, symbol: Symbol, last_price: Decimal) -> Self {
        Self {
            exchange: exchange.into(),
            symbol,
            last_price,
            fetched_at: Utc::now(),
        }
    }
}

/// Successful quotes for one symbol at one scan instant, keyed by exchange name.
///
/// Ordered by exchange name so that every walk over the snapshot, and thus the
/// min/max tie-break, is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: Symbol,
    quotes: BTreeMap<String, PriceQuote>,
}

impl PriceSnapshot {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quotes: BTreeMap::new(),
        }
    }

    /// Build a snapshot from quotes; quotes for other symbols are ignored
    pub fn from_quotes(symbol: Symbol, quotes: impl IntoIterator<Item = PriceQuote>) -> Self {
        let mut snapshot = Self::new(symbol);
        for quote in quotes {
            snapshot.insert(quote);
        }
        snapshot
    }

    pub fn insert(&mut self, quote: PriceQuote) {
        if quote.symbol != self.symbol {
            return;
        }
        self.quotes.insert(quote.exchange.clone(), quote);
    }

    pub fn get(&self, exchange: &str) -> Option<&PriceQuote> {
        self.quotes.get(exchange)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn quotes(&self) -> impl Iterator<Item = &PriceQuote> {
        self.quotes.values()
    }

    /// Cheapest quote; ties go to the lexicographically first exchange
    pub fn lowest(&self) -> Option<&PriceQuote> {
        self.quotes.values().fold(None, |best, q| match best {
            Some(b) if b.last_price <= q.last_price => Some(b),
            _ => Some(q),
        })
    }

    /// Most expensive quote; ties go to the lexicographically first exchange
    pub fn highest(&self) -> Option<&PriceQuote> {
        self.quotes.values().fold(None, |best, q| match best {
            Some(b) if b.last_price >= q.last_price => Some(b),
            _ => Some(q),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(exchange: &str, price: i64) -> PriceQuote {
        PriceQuote::new(exchange, "XYZ/USDT".parse().unwrap(), Decimal::from(price))
    }

    #[test]
    fn test_snapshot_ignores_foreign_symbols() {
        let mut snapshot = PriceSnapshot::new("XYZ/USDT".parse().unwrap());
        snapshot.insert(quote("a", 1));
        snapshot.insert(PriceQuote::new("b", "ABC/USDT".parse().unwrap(), Decimal::ONE));

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("b").is_none());
    }

    #[test]
    fn test_extremes_tie_break_by_name() {
        let snapshot = PriceSnapshot::from_quotes(
            "XYZ/USDT".parse().unwrap(),
            vec![quote("gateio", 10), quote("binance", 10), quote("xt", 12), quote("htx", 12)],
        );

        assert_eq!(snapshot.lowest().unwrap().exchange, "binance");
        assert_eq!(snapshot.highest().unwrap().exchange, "htx");
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PriceSnapshot::new("XYZ/USDT".parse().unwrap());
        assert!(snapshot.is_empty());
        assert!(snapshot.lowest().is_none());
        assert!(snapshot.highest().is_none());
    }
}
