//! Bulk ticker update
//!
//! Fetches financials for many tickers with a fixed number of worker tasks
//! and republishes each result as a `TickerSnapshot`. A failing ticker is
//! logged and counted; it never stops the batch.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::{
    catalog::TickerCatalog,
    financials::FinancialFacade,
    models::TickerSnapshot,
    publisher::UpdatePublisher,
};

/// Configuration for a bulk update run
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub topic: String,
    pub num_workers: usize,
    pub max_tickers: Option<usize>, // Optional limit for testing
}

/// Result of a bulk update run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateResult {
    pub total: usize,
    pub published: usize,
    pub failed: usize,
}

/// Shared services a run needs
#[derive(Clone)]
pub struct UpdateContext {
    pub catalog: Arc<TickerCatalog>,
    pub facade: Arc<FinancialFacade>,
    pub publisher: Arc<UpdatePublisher>,
}

/// Update `tickers`, or the whole catalog when `tickers` is empty
pub async fn bulk_update(
    context: UpdateContext,
    tickers: Vec<String>,
    config: UpdateConfig,
) -> Result<UpdateResult> {
    let tickers = if tickers.is_empty() {
        context
            .catalog
            .list_symbols()
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        tickers
    };

    let tickers: VecDeque<String> = match config.max_tickers {
        Some(max) => {
            info!("🔢 Limiting update to {} tickers", max);
            tickers.into_iter().take(max).collect()
        }
        None => tickers.into_iter().collect(),
    };

    let total = tickers.len();
    let num_workers = config.num_workers.clamp(1, total.max(1));
    info!("🚀 Starting bulk update of {} tickers with {} workers", total, num_workers);

    let queue = Arc::new(Mutex::new(tickers));
    let counters = Arc::new(Mutex::new(UpdateResult {
        total,
        ..UpdateResult::default()
    }));

    let mut handles = Vec::new();
    for worker_id in 0..num_workers {
        let queue = Arc::clone(&queue);
        let counters = Arc::clone(&counters);
        let context = context.clone();
        let topic = config.topic.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, queue, counters, context, topic).await
        }));
    }

    // Wait for all workers to complete
    for handle in handles {
        handle.await?;
    }

    let result = counters
        .lock()
        .map_err(|_| anyhow::anyhow!("update counters poisoned"))?
        .clone();

    info!(
        "✅ Bulk update completed: {} published, {} failed of {}",
        result.published, result.failed, result.total
    );
    Ok(result)
}

async fn worker(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<String>>>,
    counters: Arc<Mutex<UpdateResult>>,
    context: UpdateContext,
    topic: String,
) {
    loop {
        // Get next ticker from queue
        let ticker = match queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(_) => None,
        };
        let Some(ticker) = ticker else {
            break; // No more tickers to process
        };

        let outcome = update_one(&context, &topic, &ticker).await;

        if let Ok(mut counters) = counters.lock() {
            match &outcome {
                Ok(()) => counters.published += 1,
                Err(_) => counters.failed += 1,
            }
        }

        match outcome {
            Ok(()) => info!("✅ Worker {}: published {}", worker_id, ticker),
            Err(e) => error!("❌ Worker {}: failed {} - {}", worker_id, ticker, e),
        }
    }
}

async fn update_one(context: &UpdateContext, topic: &str, ticker: &str) -> Result<()> {
    context.catalog.get(ticker)?;

    let financials = context.facade.fetch_financials(ticker).await?;
    let snapshot = TickerSnapshot {
        ticker: ticker.to_string(),
        timestamp: Utc::now(),
        financials,
    };

    context.publisher.publish(topic, Some(ticker), &snapshot).await;
    Ok(())
}
