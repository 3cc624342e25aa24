use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Core ticker information loaded from the catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerRecord {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub market_cap_billions: f64,
}

/// One row of the peer/company file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerCompany {
    pub sector: String,
    pub industry: String,
    pub symbol: String,
    pub short_name: String,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
}

/// Which label a peer group is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerKind {
    Sector,
    Industry,
}

/// Financial statement keyed by period end date (`YYYY-MM-DD`), each period
/// holding its line items rendered as strings.
pub type Statement = BTreeMap<String, BTreeMap<String, String>>;

/// Statement families the provider exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    BalanceSheet,
    Cashflow,
    IncomeStatement,
}

/// Aggregated per-ticker financials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    #[serde(rename = "company-overview")]
    pub overview: Map<String, Value>,
    #[serde(rename = "balance-sheet")]
    pub balance_sheet: Statement,
    pub cashflow: Statement,
    #[serde(rename = "income-statement")]
    pub income_statement: Statement,
}

/// Ownership breakdown and the largest institutional positions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shareholders {
    #[serde(rename = "major-holders")]
    pub major_holders: Map<String, Value>,
    #[serde(rename = "institutional-holders")]
    pub institutional_holders: Vec<Map<String, Value>>,
}

/// Price history bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<i64>,
}

/// Windows of history the provider is asked for
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRange {
    /// Four years sampled quarterly
    FourYearQuarterly,
    /// Most recent trading day
    LatestDay,
    /// Daily bars between two dates (inclusive)
    Window { start: NaiveDate, end: NaiveDate },
}

/// Long-range and latest price history for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "combined-history")]
    pub combined: Vec<PriceBar>,
    #[serde(rename = "latest-history")]
    pub latest: Vec<PriceBar>,
}

/// Closing price resolved for a requested date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub ticker: String,
    pub requested_date: NaiveDate,
    pub trading_date: NaiveDate,
    pub close: f64,
    pub volume: Option<i64>,
}

/// Summary metrics shown for a peer company. Numeric values are carried as
/// strings so the payload shape does not depend on the provider's typing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerProfile {
    pub symbol: String,
    pub market_cap: Option<String>,
    pub open: Option<String>,
    pub price_to_book: Option<String>,
    pub beta: Option<String>,
    pub earnings_growth: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub book_value: Option<String>,
    pub net_income_to_common: Option<String>,
    pub shares_outstanding: Option<String>,
    pub enterprise_value: Option<String>,
    pub ebitda: Option<String>,
    pub current_price: Option<String>,
    pub debt_to_equity: Option<String>,
    pub current_ratio: Option<String>,
    pub total_revenue: Option<String>,
    pub return_on_assets: Option<String>,
    pub return_on_equity: Option<String>,
    pub five_year_avg_dividend_yield: Option<String>,
}

/// Message republished for downstream consumers after a ticker update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub financials: Financials,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub ticker_csv_path: String,
    pub peers_csv_path: String,
    pub listen_addr: SocketAddr,
    pub page_size: usize,
    pub provider_base_url: String,
    pub provider_cookie_url: String,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub facade_workers: usize,
    pub kafka_rest_url: String,
    pub kafka_client_id: String,
    pub update_topic: String,
    pub update_workers: usize,
    pub publish_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ticker_csv_path: "data/nasdaq.csv".to_string(),
            peers_csv_path: "data/sp500_companies.csv".to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            page_size: 10,
            provider_base_url: "https://query1.finance.yahoo.com".to_string(),
            provider_cookie_url: "https://fc.yahoo.com".to_string(),
            rate_limit_per_minute: 120,
            request_timeout_secs: 30,
            facade_workers: 4,
            kafka_rest_url: "http://localhost:8082".to_string(),
            kafka_client_id: "rust-stocks-producer".to_string(),
            update_topic: "stock-updates".to_string(),
            update_workers: 4,
            publish_buffer: 1000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        let defaults = Config::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(addr) => addr
                .parse()
                .map_err(|e| anyhow::anyhow!("LISTEN_ADDR '{}' is not a socket address: {}", addr, e))?,
            Err(_) => defaults.listen_addr,
        };

        Ok(Config {
            ticker_csv_path: env_or("TICKER_CSV_PATH", defaults.ticker_csv_path),
            peers_csv_path: env_or("PEERS_CSV_PATH", defaults.peers_csv_path),
            listen_addr,
            page_size: parsed_or("PAGE_SIZE", defaults.page_size).max(1),
            provider_base_url: env_or("PROVIDER_BASE_URL", defaults.provider_base_url),
            provider_cookie_url: env_or("PROVIDER_COOKIE_URL", defaults.provider_cookie_url),
            rate_limit_per_minute: parsed_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            facade_workers: parsed_or("FACADE_WORKERS", defaults.facade_workers).clamp(4, 5),
            kafka_rest_url: env_or("KAFKA_REST_URL", defaults.kafka_rest_url),
            kafka_client_id: env_or("KAFKA_CLIENT_ID", defaults.kafka_client_id),
            update_topic: env_or("UPDATE_TOPIC", defaults.update_topic),
            update_workers: parsed_or("UPDATE_WORKERS", defaults.update_workers).max(1),
            publish_buffer: parsed_or("PUBLISH_BUFFER", defaults.publish_buffer).max(1),
        })
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
