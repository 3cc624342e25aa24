use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use reqwest::{header, Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::{ApiRateLimiter, FinanceProvider};
use crate::error::FinanceError;
use crate::models::{Config, HistoryRange, PriceBar, Shareholders, StatementKind};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const PROFILE_MODULES: [&str; 5] = [
    "assetProfile",
    "summaryDetail",
    "price",
    "defaultKeyStatistics",
    "financialData",
];

const HOLDER_MODULES: [&str; 2] = ["majorHoldersBreakdown", "institutionOwnership"];

/// Cookie and crumb pair Yahoo requires on quoteSummary calls
#[derive(Debug, Clone)]
struct Session {
    cookie: Option<String>,
    crumb: String,
}

/// Yahoo Finance client
pub struct YahooClient {
    client: Client,
    base_url: Url,
    cookie_url: String,
    rate_limiter: ApiRateLimiter,
    session: Mutex<Option<Session>>,
}

impl YahooClient {
    pub fn new(config: &Config) -> Result<Self, FinanceError> {
        Self::with_endpoints(
            &config.provider_base_url,
            &config.provider_cookie_url,
            config.rate_limit_per_minute,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_endpoints(
        base_url: &str,
        cookie_url: &str,
        rate_limit_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self, FinanceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            cookie_url: cookie_url.to_string(),
            rate_limiter: ApiRateLimiter::new(rate_limit_per_minute),
            session: Mutex::new(None),
        })
    }

    /// Get the cached session, establishing one if needed
    async fn session(&self) -> Result<Session, FinanceError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let cookie = match self.client.get(&self.cookie_url).send().await {
            Ok(response) => response
                .headers()
                .get(header::SET_COOKIE)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(';').next())
                .map(str::to_string),
            Err(e) => {
                warn!("Failed to get Yahoo cookie: {}", e);
                None
            }
        };

        let crumb_url = self.endpoint(&["v1", "test", "getcrumb"])?;
        let mut request = self.client.get(crumb_url);
        if let Some(cookie) = &cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FinanceError::upstream(
                "session",
                format!("crumb request failed with status {}", response.status()),
            ));
        }
        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() {
            return Err(FinanceError::upstream("session", "empty crumb"));
        }

        debug!("Established Yahoo session");
        let session = Session { cookie, crumb };
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn clear_session(&self) {
        *self.session.lock().await = None;
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FinanceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FinanceError::upstream("provider", "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET with session headers; one retry with a fresh session on 401
    async fn make_request(&self, symbol: &str, url: Url) -> Result<Value, FinanceError> {
        for attempt in 0..2 {
            let session = self.session().await?;
            let mut request_url = url.clone();
            request_url
                .query_pairs_mut()
                .append_pair("crumb", &session.crumb);

            let mut request = self.client.get(request_url);
            if let Some(cookie) = &session.cookie {
                request = request.header(header::COOKIE, cookie);
            }

            self.rate_limiter.wait().await;
            debug!("Making request to: {}", url);

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    FinanceError::Timeout(symbol.to_string())
                } else {
                    FinanceError::upstream(symbol, e.to_string())
                }
            })?;

            match response.status() {
                StatusCode::UNAUTHORIZED if attempt == 0 => {
                    warn!("Yahoo session rejected, refreshing");
                    self.clear_session().await;
                    continue;
                }
                StatusCode::NOT_FOUND => return Err(FinanceError::NotFound(symbol.to_string())),
                status if !status.is_success() => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(FinanceError::upstream(
                        symbol,
                        format!("API request failed with status {}: {}", status, body),
                    ));
                }
                _ => {}
            }

            return response
                .json::<Value>()
                .await
                .map_err(|e| FinanceError::upstream(symbol, format!("invalid JSON: {}", e)));
        }

        Err(FinanceError::upstream(symbol, "authentication failed"))
    }

    async fn quote_summary(
        &self,
        symbol: &str,
        modules: &[&str],
    ) -> Result<Map<String, Value>, FinanceError> {
        let mut url = self.endpoint(&["v10", "finance", "quoteSummary", symbol])?;
        url.query_pairs_mut()
            .append_pair("modules", &modules.join(","))
            .append_pair("formatted", "false");

        let data = self.make_request(symbol, url).await?;
        unwrap_envelope(symbol, &data, "quoteSummary")
    }
}

#[async_trait]
impl FinanceProvider for YahooClient {
    async fn company_info(&self, symbol: &str) -> Result<Map<String, Value>, FinanceError> {
        let result = self.quote_summary(symbol, &PROFILE_MODULES).await?;
        Ok(merge_modules(&result, &PROFILE_MODULES))
    }

    async fn statements(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<Map<String, Value>>, FinanceError> {
        let (module, list_key) = statement_module(kind);
        let result = self.quote_summary(symbol, &[module]).await?;

        let statements = result
            .get(module)
            .and_then(|m| m.get(list_key))
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_object)
                    .map(flatten_module)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        debug!("Retrieved {} {:?} periods for {}", statements.len(), kind, symbol);
        Ok(statements)
    }

    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<PriceBar>, FinanceError> {
        let mut url = self.endpoint(&["v8", "finance", "chart", symbol])?;
        {
            let mut query = url.query_pairs_mut();
            match &range {
                HistoryRange::FourYearQuarterly => {
                    query.append_pair("range", "4y").append_pair("interval", "3mo");
                }
                HistoryRange::LatestDay => {
                    query.append_pair("range", "1d").append_pair("interval", "1d");
                }
                HistoryRange::Window { start, end } => {
                    let end = end.checked_add_days(Days::new(1)).unwrap_or(*end);
                    query
                        .append_pair("period1", &midnight_timestamp(*start).to_string())
                        .append_pair("period2", &midnight_timestamp(end).to_string())
                        .append_pair("interval", "1d");
                }
            }
        }

        let data = self.make_request(symbol, url).await?;
        let result = unwrap_envelope(symbol, &data, "chart")?;
        let bars = parse_chart(&result);

        debug!("Retrieved {} price bars for {} ({:?})", bars.len(), symbol, range);
        Ok(bars)
    }

    async fn holders(&self, symbol: &str) -> Result<Shareholders, FinanceError> {
        let result = self.quote_summary(symbol, &HOLDER_MODULES).await?;

        let major_holders = result
            .get("majorHoldersBreakdown")
            .and_then(Value::as_object)
            .map(flatten_module)
            .unwrap_or_default();
        let institutional_holders = result
            .get("institutionOwnership")
            .and_then(|m| m.get("ownershipList"))
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_object)
                    .map(flatten_module)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        debug!("Retrieved {} institutional holders for {}", institutional_holders.len(), symbol);
        Ok(Shareholders {
            major_holders,
            institutional_holders,
        })
    }
}

fn statement_module(kind: StatementKind) -> (&'static str, &'static str) {
    match kind {
        StatementKind::BalanceSheet => ("balanceSheetHistory", "balanceSheetStatements"),
        StatementKind::Cashflow => ("cashflowStatementHistory", "cashflowStatements"),
        StatementKind::IncomeStatement => ("incomeStatementHistory", "incomeStatementHistory"),
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Pull `{root: {result: [..], error: ..}}` apart, returning the first result
fn unwrap_envelope(
    symbol: &str,
    data: &Value,
    root: &str,
) -> Result<Map<String, Value>, FinanceError> {
    let envelope = data
        .get(root)
        .ok_or_else(|| FinanceError::upstream(symbol, format!("response missing '{}'", root)))?;

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        if code.eq_ignore_ascii_case("Not Found") {
            return Err(FinanceError::NotFound(symbol.to_string()));
        }
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or(code);
        return Err(FinanceError::upstream(symbol, description.to_string()));
    }

    envelope
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| FinanceError::NotFound(symbol.to_string()))
}

/// Merge the listed modules into one flat map. Earlier modules win on
/// conflicting keys.
fn merge_modules(result: &Map<String, Value>, modules: &[&str]) -> Map<String, Value> {
    let mut merged = Map::new();
    for module in modules {
        if let Some(fields) = result.get(*module).and_then(Value::as_object) {
            for (key, value) in flatten_module(fields) {
                merged.entry(key).or_insert(value);
            }
        }
    }
    merged
}

/// Replace `{raw, fmt}` wrappers with the raw value and drop empty wrappers
/// and bookkeeping keys.
fn flatten_module(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != "maxAge")
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Object(inner) if inner.is_empty() => return None,
                Value::Object(inner) if inner.contains_key("raw") => inner["raw"].clone(),
                other => other.clone(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

fn series<'a>(quote: Option<&'a Value>, name: &str, index: usize) -> Option<&'a Value> {
    quote
        .and_then(|q| q.get(name))
        .and_then(Value::as_array)
        .and_then(|values| values.get(index))
}

fn parse_chart(result: &Map<String, Value>) -> Vec<PriceBar> {
    let timestamps = match result.get("timestamp").and_then(Value::as_array) {
        Some(ts) => ts,
        None => return Vec::new(),
    };
    let quote = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(Value::as_array)
        .and_then(|q| q.first());

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(index, ts)| {
            let date = DateTime::from_timestamp(ts.as_i64()?, 0)?.date_naive();
            let close = series(quote, "close", index).and_then(Value::as_f64)?;
            Some(PriceBar {
                date,
                open: series(quote, "open", index).and_then(Value::as_f64),
                high: series(quote, "high", index).and_then(Value::as_f64),
                low: series(quote, "low", index).and_then(Value::as_f64),
                close,
                volume: series(quote, "volume", index).and_then(Value::as_i64),
            })
        })
        .collect()
}
