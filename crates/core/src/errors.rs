//! Error types

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Raw venue errors, before the retry policy classifies them
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited (status {0})")]
    RateLimited(u16),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Outcome of a failed `fetch_last_price`
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{symbol} not listed on {exchange}")]
    Unsupported { exchange: String, symbol: String },

    #[error("{exchange} unavailable for {symbol} after {attempts} attempts: {reason}")]
    Unavailable {
        exchange: String,
        symbol: String,
        attempts: u32,
        reason: String,
    },
}

impl FetchError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, FetchError::Unsupported { .. })
    }
}

/// Symbol universe errors
#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("Symbol list request failed: {0}")]
    Request(String),

    #[error("Symbol list rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed symbol list: {0}")]
    Malformed(String),
}

/// Alert delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Alert transport failed: {0}")]
    Transport(String),

    #[error("Alert rejected: {0}")]
    Rejected(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type SourceResult<T> = Result<T, SourceError>;
pub type FetchResult<T> = Result<T, FetchError>;
pub type UniverseResult<T> = Result<T, UniverseError>;
pub type DeliveryResult<T> = Result<T, DeliveryError>;
