//! Error types shared by the catalog, the finance facade and the publisher.

use thiserror::Error;

/// Errors raised while loading or querying the ticker and peer catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to open catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read catalog: {0}")]
    Csv(#[from] csv::Error),

    /// A row (or the header) could not be parsed. `line` is 1-based and
    /// counts the header row.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("ticker not found: {0}")]
    NotFound(String),

    #[error("invalid page request: page {page}, size {size}")]
    InvalidPage { page: i64, size: i64 },
}

/// Errors raised by the market-data provider and the financial facade.
#[derive(Error, Debug)]
pub enum FinanceError {
    #[error("upstream failure for {ticker}: {message}")]
    Upstream { ticker: String, message: String },

    #[error("no data returned for {0}")]
    NotFound(String),

    #[error("no price data for {ticker} on or before {date}")]
    NoData { ticker: String, date: chrono::NaiveDate },

    #[error("request to provider timed out for {0}")]
    Timeout(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

impl FinanceError {
    pub fn upstream(ticker: &str, message: impl Into<String>) -> Self {
        FinanceError::Upstream {
            ticker: ticker.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while handing a message to the publisher. These never reach
/// callers of `UpdatePublisher::publish`; they are logged instead.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("publisher is closed")]
    Closed,
}
