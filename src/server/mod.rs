//! HTTP surface over the catalog, the peer groups and the financial facade.

mod error;
mod extract;
mod peers;
mod stocks;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiQuery};

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{FinanceProvider, YahooClient},
    bulk_update::UpdateContext,
    catalog::TickerCatalog,
    financials::FinancialFacade,
    models::Config,
    peers::PeerGrouper,
    publisher::{MessageTransport, RestProxyTransport, UpdatePublisher},
};

/// Shared, read-only state handed to every handler
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<TickerCatalog>,
    pub peers: Arc<PeerGrouper>,
    pub facade: Arc<FinancialFacade>,
    pub publisher: Arc<UpdatePublisher>,
}

impl AppState {
    /// Must be called inside a Tokio runtime (the publisher spawns its task)
    pub fn new(
        config: Config,
        catalog: TickerCatalog,
        peers: PeerGrouper,
        provider: Arc<dyn FinanceProvider>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let facade = FinancialFacade::new(provider, config.facade_workers);
        let publisher = UpdatePublisher::new(transport, config.publish_buffer);
        Self {
            catalog: Arc::new(catalog),
            peers: Arc::new(peers),
            facade: Arc::new(facade),
            publisher: Arc::new(publisher),
            config,
        }
    }

    pub fn update_context(&self) -> UpdateContext {
        UpdateContext {
            catalog: Arc::clone(&self.catalog),
            facade: Arc::clone(&self.facade),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

/// Load both CSV files and wire up the production provider and transport
pub fn build_state(config: Config) -> Result<Arc<AppState>> {
    let catalog = TickerCatalog::load(&config.ticker_csv_path)
        .with_context(|| format!("loading ticker catalog {}", config.ticker_csv_path))?;
    info!("📋 Loaded {} tickers from {}", catalog.len(), config.ticker_csv_path);

    let peers = PeerGrouper::load(&config.peers_csv_path)
        .with_context(|| format!("loading peer file {}", config.peers_csv_path))?;
    info!("👥 Loaded {} peer companies from {}", peers.len(), config.peers_csv_path);

    let provider = YahooClient::new(&config)?;
    let transport = RestProxyTransport::new(
        &config.kafka_rest_url,
        &config.kafka_client_id,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    Ok(Arc::new(AppState::new(
        config,
        catalog,
        peers,
        Arc::new(provider),
        Arc::new(transport),
    )))
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(stocks::router())
        .merge(peers::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("🚀 Listening on http://{}", addr);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("🛑 Shutdown signal received");
    }
}

/// `RUST_LOG` filtering, JSON output when `LOG_FORMAT=json`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rust_stocks_api=info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}
