use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{ApiError, ApiQuery, ApiResult, AppState};
use crate::{
    bulk_update::{bulk_update, UpdateConfig},
    models::{PeerKind, PeerProfile},
    peers::DEFAULT_PEER_COUNT,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks/peers/sector/{sector}", get(sector_peers))
        .route("/stocks/peers/industry/{industry}", get(industry_peers))
        .route(
            "/stocks/peers/industry/{industry}/profiles",
            get(industry_peer_profiles),
        )
        .route("/stocks/update", post(trigger_update))
}

#[derive(Debug, Deserialize)]
struct PeerQuery {
    n: Option<usize>,
}

impl PeerQuery {
    fn count(&self) -> usize {
        self.n.unwrap_or(DEFAULT_PEER_COUNT)
    }
}

async fn sector_peers(
    State(state): State<Arc<AppState>>,
    Path(sector): Path<String>,
    ApiQuery(query): ApiQuery<PeerQuery>,
) -> Json<Vec<String>> {
    Json(state.peers.top_peers(&sector, PeerKind::Sector, query.count()))
}

async fn industry_peers(
    State(state): State<Arc<AppState>>,
    Path(industry): Path<String>,
    ApiQuery(query): ApiQuery<PeerQuery>,
) -> Json<Vec<String>> {
    Json(state.peers.top_peers(&industry, PeerKind::Industry, query.count()))
}

async fn industry_peer_profiles(
    State(state): State<Arc<AppState>>,
    Path(industry): Path<String>,
    ApiQuery(query): ApiQuery<PeerQuery>,
) -> ApiResult<Json<Vec<PeerProfile>>> {
    let tickers = state
        .peers
        .top_peers(&industry, PeerKind::Industry, query.count());
    Ok(Json(state.facade.peer_profiles(&tickers).await?))
}

#[derive(Debug, Default, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    tickers: Option<Vec<String>>,
}

/// Acknowledgement for an update running in the background
#[derive(Debug, Serialize)]
struct UpdateAccepted {
    queued: usize,
    topic: String,
}

/// Queues the update on a background task and answers `202 Accepted` right
/// away. An empty body or ticker list means the whole catalog.
async fn trigger_update(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UpdateAccepted>)> {
    let request: UpdateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UpdateRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid update request: {}", e)))?
    };
    let tickers: Vec<String> = request
        .tickers
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();

    let queued = if tickers.is_empty() {
        state.catalog.len()
    } else {
        tickers.len()
    };
    let config = UpdateConfig {
        topic: state.config.update_topic.clone(),
        num_workers: state.config.update_workers,
        max_tickers: None,
    };
    let accepted = UpdateAccepted {
        queued,
        topic: config.topic.clone(),
    };

    info!("🔄 Update queued for {} tickers", queued);
    let context = state.update_context();
    tokio::spawn(async move {
        match bulk_update(context, tickers, config).await {
            Ok(result) => info!(
                "✅ Background update finished: {} published, {} failed",
                result.published, result.failed
            ),
            Err(e) => error!("❌ Background update failed: {}", e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
