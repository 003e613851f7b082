//! REST adapters for the supported spot exchanges

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use arb_core::{
    Exchange, ExchangesConfig, RetryConfig, SourceError, SourceResult, Symbol,
};
use crate::feeds::{ExchangeClient, MarketDataSource, RetryingExchange};

/// Public market-data endpoints of one venue
#[derive(Debug, Clone)]
pub struct HttpVenue {
    exchange: Exchange,
    base_url: String,
    http: Client,
}

impl HttpVenue {
    pub fn new(exchange: Exchange, base_url: impl Into<String>, http: Client) -> Self {
        Self {
            exchange,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn markets_path(&self) -> &'static str {
        match self.exchange {
            Exchange::Binance => "/api/v3/exchangeInfo",
            Exchange::CryptoCom => "/exchange/v1/public/get-instruments",
            Exchange::GateIo => "/api/v4/spot/currency_pairs",
            Exchange::Htx => "/v1/common/symbols",
            Exchange::Xt => "/v4/public/symbol",
        }
    }

    fn ticker_request(&self, symbol: &Symbol) -> (&'static str, &'static str, String) {
        let venue_symbol = symbol.venue_format(self.exchange.symbol_format());
        match self.exchange {
            Exchange::Binance => ("/api/v3/ticker/price", "symbol", venue_symbol),
            Exchange::CryptoCom => ("/exchange/v1/public/get-tickers", "instrument_name", venue_symbol),
            Exchange::GateIo => ("/api/v4/spot/tickers", "currency_pair", venue_symbol),
            Exchange::Htx => ("/market/detail/merged", "symbol", venue_symbol),
            Exchange::Xt => ("/v4/public/ticker/price", "symbol", venue_symbol),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> SourceResult<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout
                } else {
                    SourceError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(SourceError::RateLimited(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MarketDataSource for HttpVenue {
    fn name(&self) -> &str {
        self.exchange.name()
    }

    async fn load_markets(&self) -> SourceResult<HashSet<Symbol>> {
        let json = self.get_json(self.markets_path(), &[]).await?;
        parse_markets(self.exchange, &json)
    }

    async fn last_price(&self, symbol: &Symbol) -> SourceResult<Decimal> {
        let (path, param, venue_symbol) = self.ticker_request(symbol);
        let json = self.get_json(path, &[(param, venue_symbol.as_str())]).await?;
        let price = parse_last_price(self.exchange, &json)?;

        debug!("{} {} last={}", self.exchange, symbol, price);
        Ok(price)
    }
}

/// Build one retrying client per enabled exchange
pub fn build_clients(
    exchanges: &ExchangesConfig,
    retry: &RetryConfig,
) -> SourceResult<Vec<Arc<dyn ExchangeClient>>> {
    let http = Client::builder()
        .timeout(exchanges.request_timeout())
        .build()
        .map_err(|e| SourceError::Http(e.to_string()))?;

    let clients = exchanges
        .enabled
        .iter()
        .map(|exchange| {
            let venue = HttpVenue::new(*exchange, exchanges.base_url(*exchange), http.clone());
            info!("Configured {} at {}", exchange, venue.base_url);
            Arc::new(RetryingExchange::new(venue, retry.clone(), exchanges.markets_ttl()))
                as Arc<dyn ExchangeClient>
        })
        .collect();

    Ok(clients)
}

#[derive(Debug, Deserialize)]
struct BinanceExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BinanceSymbol {
    base_asset: String,
    quote_asset: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct CryptoComResponse<T> {
    result: CryptoComResult<T>,
}

#[derive(Debug, Deserialize)]
struct CryptoComResult<T> {
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CryptoComInstrument {
    inst_type: String,
    base_ccy: String,
    quote_ccy: String,
    tradable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CryptoComTicker {
    #[serde(rename = "a")]
    last: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GateCurrencyPair {
    base: String,
    quote: String,
    trade_status: String,
}

#[derive(Debug, Deserialize)]
struct GateTicker {
    last: Decimal,
}

#[derive(Debug, Deserialize)]
struct HtxResponse<T> {
    status: String,
    #[serde(rename = "err-msg")]
    err_msg: Option<String>,
    #[serde(alias = "tick")]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct HtxSymbol {
    base_currency: String,
    quote_currency: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct HtxTick {
    close: Decimal,
}

#[derive(Debug, Deserialize)]
struct XtResponse<T> {
    rc: i64,
    mc: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct XtSymbols {
    symbols: Vec<XtSymbol>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct XtSymbol {
    base_currency: String,
    quote_currency: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct XtTicker {
    #[serde(rename = "p")]
    price: Decimal,
}

/// Extract the tradable spot pairs from a venue's market listing
pub fn parse_markets(exchange: Exchange, json: &Value) -> SourceResult<HashSet<Symbol>> {
    let pairs: Vec<(String, String)> = match exchange {
        Exchange::Binance => decode::<BinanceExchangeInfo>(exchange, json)?
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| (s.base_asset, s.quote_asset))
            .collect(),
        Exchange::CryptoCom => decode::<CryptoComResponse<CryptoComInstrument>>(exchange, json)?
            .result
            .data
            .into_iter()
            .filter(|i| i.inst_type == "CCY_PAIR" && i.tradable.unwrap_or(true))
            .map(|i| (i.base_ccy, i.quote_ccy))
            .collect(),
        Exchange::GateIo => decode::<Vec<GateCurrencyPair>>(exchange, json)?
            .into_iter()
            .filter(|p| p.trade_status == "tradable")
            .map(|p| (p.base, p.quote))
            .collect(),
        Exchange::Htx => {
            let response = decode::<HtxResponse<Vec<HtxSymbol>>>(exchange, json)?;
            htx_payload(response)?
                .into_iter()
                .filter(|s| s.state == "online")
                .map(|s| (s.base_currency, s.quote_currency))
                .collect()
        }
        Exchange::Xt => {
            let response = decode::<XtResponse<XtSymbols>>(exchange, json)?;
            xt_payload(response)?
                .symbols
                .into_iter()
                .filter(|s| s.state == "ONLINE")
                .map(|s| (s.base_currency, s.quote_currency))
                .collect()
        }
    };

    Ok(pairs
        .into_iter()
        .filter_map(|(base, quote)| Symbol::new(&base, &quote).ok())
        .collect())
}

/// Extract the last traded price from a venue's ticker response
pub fn parse_last_price(exchange: Exchange, json: &Value) -> SourceResult<Decimal> {
    let price = match exchange {
        Exchange::Binance => Some(decode::<BinanceTicker>(exchange, json)?.price),
        Exchange::CryptoCom => decode::<CryptoComResponse<CryptoComTicker>>(exchange, json)?
            .result
            .data
            .into_iter()
            .next()
            .map(|t| t.last),
        Exchange::GateIo => decode::<Vec<GateTicker>>(exchange, json)?
            .into_iter()
            .next()
            .map(|t| t.last),
        Exchange::Htx => {
            let response = decode::<HtxResponse<HtxTick>>(exchange, json)?;
            Some(htx_payload(response)?.close)
        }
        Exchange::Xt => {
            let response = decode::<XtResponse<Vec<XtTicker>>>(exchange, json)?;
            xt_payload(response)?.into_iter().next().map(|t| t.price)
        }
    };

    let price = price.ok_or_else(|| {
        SourceError::InvalidResponse(format!("{} ticker has no last price", exchange))
    })?;

    if price <= Decimal::ZERO {
        return Err(SourceError::InvalidResponse(format!(
            "{} returned non-positive price {}",
            exchange, price
        )));
    }
    Ok(price)
}

fn decode<'a, T: Deserialize<'a>>(exchange: Exchange, json: &'a Value) -> SourceResult<T> {
    T::deserialize(json)
        .map_err(|e| SourceError::InvalidResponse(format!("{} payload: {}", exchange, e)))
}

fn htx_payload<T>(response: HtxResponse<T>) -> SourceResult<T> {
    if response.status != "ok" {
        return Err(SourceError::InvalidResponse(
            response
                .err_msg
                .unwrap_or_else(|| format!("htx status {}", response.status)),
        ));
    }
    response
        .data
        .ok_or_else(|| SourceError::InvalidResponse("htx response has no payload".into()))
}

fn xt_payload<T>(response: XtResponse<T>) -> SourceResult<T> {
    if response.rc != 0 {
        return Err(SourceError::InvalidResponse(
            response.mc.unwrap_or_else(|| format!("xt rc {}", response.rc)),
        ));
    }
    response
        .result
        .ok_or_else(|| SourceError::InvalidResponse("xt response has no result".into()))
}
