//! Arbitrage opportunity types and spread detection

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PriceSnapshot, Symbol};

/// Decimal places used when showing a spread
pub const SPREAD_DISPLAY_DP: u32 = 2;
/// Decimal places used when showing a price
pub const PRICE_DISPLAY_DP: u32 = 4;

/// Best buy/sell pair found across a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub buy_exchange: String,
    pub buy_price: Decimal,
    pub sell_exchange: String,
    pub sell_price: Decimal,
    /// Unrounded `(sell - buy) / buy * 100`
    pub percent: Decimal,
}

impl Spread {
    /// Compute the widest spread in a snapshot.
    ///
    /// Returns `None` with fewer than two quotes, when every quote has the same
    /// price, when the lowest price is not positive, or when the ratio does not
    /// fit in a `Decimal`.
    pub fn from_snapshot(snapshot: &PriceSnapshot) -> Option<Self> {
        if snapshot.len() < 2 {
            return None;
        }

        let low = snapshot.lowest()?;
        let high = snapshot.highest()?;

        if low.last_price <= Decimal::ZERO || high.last_price <= low.last_price {
            return None;
        }

        let percent = high
            .last_price
            .checked_sub(low.last_price)?
            .checked_div(low.last_price)?
            .checked_mul(Decimal::ONE_HUNDRED)?;

        Some(Self {
            buy_exchange: low.exchange.clone(),
            buy_price: low.last_price,
            sell_exchange: high.exchange.clone(),
            sell_price: high.last_price,
            percent,
        })
    }
}

/// Detected cross-exchange divergence above the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub symbol: Symbol,
    pub buy_exchange: String,
    pub buy_price: Decimal,
    pub sell_exchange: String,
    pub sell_price: Decimal,
    pub spread_percent: Decimal,
    pub discovered_at: DateTime<Utc>,
}

impl Opportunity {
    /// Detect an opportunity in a snapshot, comparing the unrounded spread
    /// against `threshold_percent`
    pub fn detect(
        snapshot: &PriceSnapshot,
        threshold_percent: Decimal,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let spread = Spread::from_snapshot(snapshot)?;

        if spread.percent < threshold_percent {
            return None;
        }

        Some(Self {
            symbol: snapshot.symbol.clone(),
            buy_exchange: spread.buy_exchange,
            buy_price: spread.buy_price,
            sell_exchange: spread.sell_exchange,
            sell_price: spread.sell_price,
            spread_percent: spread.percent,
            discovered_at: now,
        })
    }

    pub fn display_spread(&self) -> Decimal {
        self.spread_percent.round_dp(SPREAD_DISPLAY_DP)
    }

    pub fn display_buy_price(&self) -> Decimal {
        self.buy_price.round_dp(PRICE_DISPLAY_DP)
    }

    pub fn display_sell_price(&self) -> Decimal {
        self.sell_price.round_dp(PRICE_DISPLAY_DP)
    }
}
