//! Canned finance provider for tests that run above the HTTP client

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use rust_stocks_api::{
    api::FinanceProvider,
    error::FinanceError,
    models::{HistoryRange, PriceBar, Shareholders, StatementKind},
    utils::MarketCalendar,
};

/// Serves fixed data for AAPL, MSFT and NVDA. `FAIL` always errors upstream;
/// everything else is not found.
#[derive(Default)]
pub struct StaticProvider {
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, symbol: &str) -> Result<(), FinanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match symbol {
            "AAPL" | "MSFT" | "NVDA" => Ok(()),
            "FAIL" => Err(FinanceError::upstream(symbol, "provider unavailable")),
            other => Err(FinanceError::NotFound(other.to_string())),
        }
    }
}

fn bar(date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: Some(close - 1.0),
        high: Some(close + 2.0),
        low: Some(close - 2.0),
        close,
        volume: Some(1_000_000),
    }
}

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[async_trait]
impl FinanceProvider for StaticProvider {
    async fn company_info(&self, symbol: &str) -> Result<Map<String, Value>, FinanceError> {
        self.check(symbol)?;
        let info = json!({
            "symbol": symbol,
            "shortName": format!("{} Corp", symbol),
            "longName": format!("{} Corporation", symbol),
            "sector": "Technology",
            "marketCap": 2_000_000_000_000_i64,
            "beta": 1.25,
            "open": 100.5,
            "priceToBook": null,
            "companyOfficers": [],
        });
        Ok(info.as_object().cloned().unwrap_or_default())
    }

    async fn statements(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<Map<String, Value>>, FinanceError> {
        self.check(symbol)?;
        let item = match kind {
            StatementKind::BalanceSheet => "totalAssets",
            StatementKind::Cashflow => "freeCashFlow",
            StatementKind::IncomeStatement => "totalRevenue",
        };
        let period = json!({
            "endDate": 1_703_980_800_i64, // 2023-12-31
            item: 1_000_000,
            "netIncome": null,
        });
        Ok(vec![period.as_object().cloned().unwrap_or_default()])
    }

    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<PriceBar>, FinanceError> {
        self.check(symbol)?;
        let bars = match range {
            HistoryRange::FourYearQuarterly => vec![
                bar(ymd(2023, 10, 1), 170.0),
                bar(ymd(2024, 1, 1), 185.0),
            ],
            HistoryRange::LatestDay => vec![bar(ymd(2024, 5, 3), 183.38)],
            HistoryRange::Window { start, end } => start
                .iter_days()
                .take_while(|date| *date <= end)
                .filter(|date| MarketCalendar::is_trading_day(*date))
                .map(|date| bar(date, 100.0 + (date - start).num_days() as f64))
                .collect(),
        };
        Ok(bars)
    }

    async fn holders(&self, symbol: &str) -> Result<Shareholders, FinanceError> {
        self.check(symbol)?;
        let major = json!({
            "insidersPercentHeld": 0.0207,
            "institutionsPercentHeld": 0.6187,
            "maxAge": 1,
        });
        let vanguard = json!({
            "organization": "Vanguard Group Inc",
            "pctHeld": 0.0843,
            "position": 1_293_789_000_i64,
            "reportDate": 1_711_843_200_i64,
        });
        Ok(Shareholders {
            major_holders: major.as_object().cloned().unwrap_or_default(),
            institutional_holders: vec![vanguard.as_object().cloned().unwrap_or_default()],
        })
    }
}
