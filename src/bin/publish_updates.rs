//! Publish financial snapshots for catalog tickers once and exit

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rust_stocks_api::{
    bulk_update::{bulk_update, UpdateConfig},
    models::Config,
    server,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated tickers (defaults to the whole catalog)
    #[arg(short, long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Maximum number of tickers to update
    #[arg(short, long)]
    max: Option<usize>,

    /// Number of concurrent workers (defaults to UPDATE_WORKERS)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Topic to publish to (defaults to UPDATE_TOPIC)
    #[arg(long)]
    topic: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok(); // RUST_LOG may come from .env
    server::init_tracing();

    info!("📤 Ticker Snapshot Publisher");
    info!("===========================");

    let config = Config::from_env()?;
    let update_config = UpdateConfig {
        topic: args.topic.unwrap_or_else(|| config.update_topic.clone()),
        num_workers: args.workers.unwrap_or(config.update_workers).max(1),
        max_tickers: args.max,
    };
    let tickers: Vec<String> = args
        .tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();

    info!("🧵 Workers: {}", update_config.num_workers);
    info!("📬 Topic: {}", update_config.topic);

    let state = server::build_state(config)?;
    let result = bulk_update(state.update_context(), tickers, update_config).await?;

    info!("✅ Update Results:");
    info!("   - Total tickers: {}", result.total);
    info!("   - Published: {}", result.published);
    info!("   - Failed: {}", result.failed);
    info!(
        "   - Delivery: {} delivered, {} failed",
        state.publisher.stats().delivered(),
        state.publisher.stats().failed()
    );

    println!(
        "{} published, {} failed of {}",
        result.published, result.failed, result.total
    );
    Ok(())
}
