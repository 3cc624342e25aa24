use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::{Map, Value};
use std::num::NonZeroU32;

use crate::error::FinanceError;
use crate::models::{HistoryRange, PriceBar, Shareholders, StatementKind};

pub mod yahoo_client;
pub use yahoo_client::YahooClient;

/// Client-side rate limiter for provider requests
pub struct ApiRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl ApiRateLimiter {
    /// Bursts are capped at one second's worth of requests.
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(requests_per_minute / 60).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(per_minute).allow_burst(burst)),
        }
    }

    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

/// Remote market-data source. Payloads are kept loosely typed; the facade
/// decides which fields it exposes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FinanceProvider: Send + Sync {
    /// Flat company profile and key statistics
    async fn company_info(&self, symbol: &str) -> Result<Map<String, Value>, FinanceError>;

    /// Annual statements, newest first, one object per period
    async fn statements(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<Map<String, Value>>, FinanceError>;

    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<PriceBar>, FinanceError>;

    /// Ownership breakdown plus one entry per institutional holder
    async fn holders(&self, symbol: &str) -> Result<Shareholders, FinanceError>;
}
