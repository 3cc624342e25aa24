use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{ApiError, ApiJson, ApiQuery, ApiResult, AppState};
use crate::{
    catalog::{TickerGroup, TickerPage},
    models::{Financials, History, PricePoint, Shareholders, Statement, TickerRecord},
};

const DEFAULT_SEARCH_LIMIT: usize = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks", get(list_stocks))
        .route("/stocks/tickers", get(list_tickers))
        .route("/stocks/search", get(search_stocks))
        .route("/stocks/price", post(price_on_date))
        .route("/stocks/{ticker}", get(get_stock))
        .route("/stocks/sector/{sector}", get(stocks_by_sector))
        .route("/stocks/industry/{industry}", get(stocks_by_industry))
        .route("/stocks/company-overview/{ticker}", get(company_overview))
        .route("/stocks/financials/{ticker}", get(financials))
        .route("/stocks/balance-sheet/{ticker}", get(balance_sheet))
        .route("/stocks/cashflow/{ticker}", get(cashflow))
        .route("/stocks/income-statement/{ticker}", get(income_statement))
        .route("/stocks/shareholders/{ticker}", get(shareholders))
        .route("/stocks/history/{ticker}", get(history))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

async fn list_stocks(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<TickerPage>> {
    let page = state
        .catalog
        .page(query.page.unwrap_or(1), state.config.page_size as i64)?;
    Ok(Json(page))
}

async fn list_tickers(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .catalog
            .list_symbols()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

async fn search_stocks(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<TickerRecord>>> {
    if query.q.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let matches = state
        .catalog
        .search(&query.q, limit)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(matches))
}

async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<TickerRecord>> {
    Ok(Json(state.catalog.get(&ticker)?.clone()))
}

async fn stocks_by_sector(
    State(state): State<Arc<AppState>>,
    Path(sector): Path<String>,
) -> Json<TickerGroup> {
    Json(state.catalog.group_by_sector(&sector))
}

async fn stocks_by_industry(
    State(state): State<Arc<AppState>>,
    Path(industry): Path<String>,
) -> Json<TickerGroup> {
    Json(state.catalog.group_by_industry(&industry))
}

async fn company_overview(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(state.facade.company_overview(&ticker).await?))
}

async fn financials(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Financials>> {
    Ok(Json(state.facade.fetch_financials(&ticker).await?))
}

async fn balance_sheet(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Statement>> {
    Ok(Json(state.facade.balance_sheet(&ticker).await?))
}

async fn cashflow(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Statement>> {
    Ok(Json(state.facade.cashflow(&ticker).await?))
}

async fn income_statement(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Statement>> {
    Ok(Json(state.facade.income_statement(&ticker).await?))
}

async fn shareholders(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Shareholders>> {
    Ok(Json(state.facade.shareholders(&ticker).await?))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<History>> {
    Ok(Json(state.facade.history(&ticker).await?))
}

#[derive(Debug, Deserialize)]
struct PriceRequest {
    ticker: String,
    date: NaiveDate,
}

async fn price_on_date(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PriceRequest>,
) -> ApiResult<Json<PricePoint>> {
    let ticker = request.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ApiError::BadRequest("ticker must not be empty".to_string()));
    }
    Ok(Json(state.facade.price_on(&ticker, request.date).await?))
}
