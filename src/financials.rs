//! Per-ticker fan-out to the market-data provider.
//!
//! Each facade operation gets its own semaphore, so a single request never
//! has more than `workers` provider calls in flight. The process-wide request
//! rate is the provider's rate limiter's concern.
//! Multi-part results are all-or-nothing: the first failing sub-call fails
//! the whole request.

use chrono::{DateTime, NaiveDate};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::api::FinanceProvider;
use crate::error::FinanceError;
use crate::models::{
    Financials, History, HistoryRange, PeerProfile, PricePoint, Shareholders, Statement,
    StatementKind,
};
use crate::utils::MarketCalendar;

/// Company overview fields passed through from the provider profile
pub const OVERVIEW_FIELDS: &[&str] = &[
    "symbol",
    "shortName",
    "longName",
    "longBusinessSummary",
    "sector",
    "industry",
    "country",
    "city",
    "state",
    "website",
    "fullTimeEmployees",
    "currency",
    "exchange",
    "quoteType",
    "marketCap",
    "enterpriseValue",
    "currentPrice",
    "previousClose",
    "open",
    "dayLow",
    "dayHigh",
    "fiftyTwoWeekLow",
    "fiftyTwoWeekHigh",
    "volume",
    "averageVolume",
    "beta",
    "trailingPE",
    "forwardPE",
    "trailingEps",
    "forwardEps",
    "priceToBook",
    "bookValue",
    "dividendRate",
    "dividendYield",
    "payoutRatio",
    "fiveYearAvgDividendYield",
    "sharesOutstanding",
    "totalRevenue",
    "revenueGrowth",
    "earningsGrowth",
    "grossMargins",
    "operatingMargins",
    "profitMargins",
    "ebitda",
    "netIncomeToCommon",
    "totalCash",
    "totalDebt",
    "debtToEquity",
    "currentRatio",
    "returnOnAssets",
    "returnOnEquity",
    "recommendationKey",
    "targetMeanPrice",
];

/// Holder entry keys dropped from the shareholders payload
const DROPPED_HOLDER_FIELDS: &[&str] = &["reportDate", "maxAge"];

pub struct FinancialFacade {
    provider: Arc<dyn FinanceProvider>,
    workers: usize,
}

impl FinancialFacade {
    /// `workers` bounds the outbound calls of a single facade operation;
    /// concurrent operations each get their own pool.
    pub fn new(provider: Arc<dyn FinanceProvider>, workers: usize) -> Self {
        Self {
            provider,
            workers: workers.max(1),
        }
    }

    fn pool(&self) -> Semaphore {
        Semaphore::new(self.workers)
    }

    async fn bounded<T, F>(pool: &Semaphore, call: F) -> Result<T, FinanceError>
    where
        F: Future<Output = Result<T, FinanceError>>,
    {
        let _permit = pool
            .acquire()
            .await
            .map_err(|_| FinanceError::upstream("pool", "worker pool closed"))?;
        call.await
    }

    /// Overview, balance sheet, cashflow and income statement in one go
    pub async fn fetch_financials(&self, ticker: &str) -> Result<Financials, FinanceError> {
        info!("📊 Fetching financials for {}", ticker);
        let pool = self.pool();
        let (overview, balance_sheet, cashflow, income_statement) = tokio::try_join!(
            self.overview_in(&pool, ticker),
            self.statement_in(&pool, ticker, StatementKind::BalanceSheet),
            self.statement_in(&pool, ticker, StatementKind::Cashflow),
            self.statement_in(&pool, ticker, StatementKind::IncomeStatement),
        )?;

        Ok(Financials {
            overview,
            balance_sheet,
            cashflow,
            income_statement,
        })
    }

    pub async fn company_overview(&self, ticker: &str) -> Result<Map<String, Value>, FinanceError> {
        self.overview_in(&self.pool(), ticker).await
    }

    async fn overview_in(
        &self,
        pool: &Semaphore,
        ticker: &str,
    ) -> Result<Map<String, Value>, FinanceError> {
        let info = Self::bounded(pool, self.provider.company_info(ticker)).await?;
        if info.is_empty() {
            return Err(FinanceError::NotFound(ticker.to_string()));
        }
        Ok(project(&info, OVERVIEW_FIELDS))
    }

    pub async fn statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Statement, FinanceError> {
        self.statement_in(&self.pool(), ticker, kind).await
    }

    async fn statement_in(
        &self,
        pool: &Semaphore,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Statement, FinanceError> {
        let periods = Self::bounded(pool, self.provider.statements(ticker, kind)).await?;
        Ok(to_statement(&periods))
    }

    pub async fn balance_sheet(&self, ticker: &str) -> Result<Statement, FinanceError> {
        self.statement(ticker, StatementKind::BalanceSheet).await
    }

    pub async fn cashflow(&self, ticker: &str) -> Result<Statement, FinanceError> {
        self.statement(ticker, StatementKind::Cashflow).await
    }

    pub async fn income_statement(&self, ticker: &str) -> Result<Statement, FinanceError> {
        self.statement(ticker, StatementKind::IncomeStatement).await
    }

    /// Major holders breakdown and institutional holders, without report dates
    pub async fn shareholders(&self, ticker: &str) -> Result<Shareholders, FinanceError> {
        let holders = Self::bounded(&self.pool(), self.provider.holders(ticker)).await?;
        if holders.major_holders.is_empty() && holders.institutional_holders.is_empty() {
            return Err(FinanceError::NotFound(ticker.to_string()));
        }

        let strip = |mut entry: Map<String, Value>| {
            for key in DROPPED_HOLDER_FIELDS {
                entry.remove(*key);
            }
            entry
        };
        Ok(Shareholders {
            major_holders: strip(holders.major_holders),
            institutional_holders: holders.institutional_holders.into_iter().map(strip).collect(),
        })
    }

    /// Four years of quarterly bars plus the latest session
    pub async fn history(&self, ticker: &str) -> Result<History, FinanceError> {
        let pool = self.pool();
        let (combined, latest) = tokio::try_join!(
            Self::bounded(
                &pool,
                self.provider
                    .price_history(ticker, HistoryRange::FourYearQuarterly)
            ),
            Self::bounded(&pool, self.provider.price_history(ticker, HistoryRange::LatestDay)),
        )?;
        Ok(History { combined, latest })
    }

    /// Close on the last trading day on or before `date`
    pub async fn price_on(&self, ticker: &str, date: NaiveDate) -> Result<PricePoint, FinanceError> {
        let no_data = || FinanceError::NoData {
            ticker: ticker.to_string(),
            date,
        };
        let (start, end) = MarketCalendar::last_trading_day(date)
            .and_then(MarketCalendar::lookback_window)
            .ok_or_else(no_data)?;

        let bars = Self::bounded(
            &self.pool(),
            self.provider
                .price_history(ticker, HistoryRange::Window { start, end }),
        )
        .await?;

        let bar = bars
            .into_iter()
            .filter(|bar| bar.date <= date)
            .max_by_key(|bar| bar.date)
            .ok_or_else(no_data)?;

        debug!("Resolved {} on {} to {} close {}", ticker, date, bar.date, bar.close);
        Ok(PricePoint {
            ticker: ticker.to_string(),
            requested_date: date,
            trading_date: bar.date,
            close: bar.close,
            volume: bar.volume,
        })
    }

    /// Summary metrics for each ticker, in input order
    pub async fn peer_profiles(&self, tickers: &[String]) -> Result<Vec<PeerProfile>, FinanceError> {
        let pool = self.pool();
        try_join_all(tickers.iter().map(|ticker| self.peer_profile(&pool, ticker))).await
    }

    async fn peer_profile(&self, pool: &Semaphore, ticker: &str) -> Result<PeerProfile, FinanceError> {
        let info = Self::bounded(pool, self.provider.company_info(ticker)).await?;
        let field = |key: &str| info.get(key).and_then(render_optional);

        Ok(PeerProfile {
            symbol: ticker.to_string(),
            market_cap: field("marketCap"),
            open: field("open"),
            price_to_book: field("priceToBook"),
            beta: field("beta"),
            earnings_growth: field("earningsGrowth"),
            short_name: field("shortName"),
            long_name: field("longName"),
            book_value: field("bookValue"),
            net_income_to_common: field("netIncomeToCommon"),
            shares_outstanding: field("sharesOutstanding"),
            enterprise_value: field("enterpriseValue"),
            ebitda: field("ebitda"),
            current_price: field("currentPrice"),
            debt_to_equity: field("debtToEquity"),
            current_ratio: field("currentRatio"),
            total_revenue: field("totalRevenue"),
            return_on_assets: field("returnOnAssets"),
            return_on_equity: field("returnOnEquity"),
            five_year_avg_dividend_yield: field("fiveYearAvgDividendYield"),
        })
    }
}

/// Keep only the allow-listed keys; missing keys are skipped
pub fn project(info: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|&key| info.get(key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

/// Key periods by end date and render every line item as a string.
/// Periods without a readable end date are dropped.
fn to_statement(periods: &[Map<String, Value>]) -> Statement {
    periods
        .iter()
        .filter_map(|period| {
            let end_date = period_end_date(period.get("endDate")?)?;
            let items = period
                .iter()
                .filter(|(key, _)| key.as_str() != "endDate")
                .map(|(key, value)| (key.clone(), render_value(value)))
                .collect();
            Some((end_date, items))
        })
        .collect()
}

fn period_end_date(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let date = DateTime::from_timestamp(n.as_i64()?, 0)?.date_naive();
            Some(date.format("%Y-%m-%d").to_string())
        }
        Value::String(s) => NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "nan".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_optional(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(render_value(other)),
    }
}
