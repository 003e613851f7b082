//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Normalized trading pair, e.g. `BTC/USDT`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    base: String,
    quote: String,
}

impl Symbol {
    pub fn new(base: &str, quote: &str) -> Result<Self, CoreError> {
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();

        if base.is_empty() || quote.is_empty() {
            return Err(CoreError::InvalidSymbol(format!("{}/{}", base, quote)));
        }

        Ok(Self { base, quote })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Format the pair the way a venue expects it in its REST API
    pub fn venue_format(&self, format: SymbolFormat) -> String {
        match format {
            SymbolFormat::Concat => format!("{}{}", self.base, self.quote),
            SymbolFormat::Underscore => format!("{}_{}", self.base, self.quote),
            SymbolFormat::LowerConcat => {
                format!("{}{}", self.base, self.quote).to_lowercase()
            }
            SymbolFormat::LowerUnderscore => {
                format!("{}_{}", self.base, self.quote).to_lowercase()
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) => Symbol::new(base, quote),
            _ => Err(CoreError::InvalidSymbol(s.to_string())),
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

/// How a venue spells a trading pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFormat {
    /// `BTCUSDT`
    Concat,
    /// `BTC_USDT`
    Underscore,
    /// `btcusdt`
    LowerConcat,
    /// `btc_usdt`
    LowerUnderscore,
}

/// Supported spot exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    #[serde(rename = "crypto.com")]
    CryptoCom,
    GateIo,
    Htx,
    Xt,
}

impl Exchange {
    pub const ALL: [Exchange; 5] = [
        Exchange::Binance,
        Exchange::CryptoCom,
        Exchange::GateIo,
        Exchange::Htx,
        Exchange::Xt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::CryptoCom => "crypto.com",
            Exchange::GateIo => "gateio",
            Exchange::Htx => "htx",
            Exchange::Xt => "xt",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Exchange::Binance => "https://api.binance.com",
            Exchange::CryptoCom => "https://api.crypto.com",
            Exchange::GateIo => "https://api.gateio.ws",
            Exchange::Htx => "https://api.huobi.pro",
            Exchange::Xt => "https://sapi.xt.com",
        }
    }

    pub fn symbol_format(&self) -> SymbolFormat {
        match self {
            Exchange::Binance => SymbolFormat::Concat,
            Exchange::CryptoCom => SymbolFormat::Underscore,
            Exchange::GateIo => SymbolFormat::Underscore,
            Exchange::Htx => SymbolFormat::LowerConcat,
            Exchange::Xt => SymbolFormat::LowerUnderscore,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
