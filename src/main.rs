use anyhow::Result;
use tracing::{error, info};

use rust_stocks_api::models::Config;
use rust_stocks_api::server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // RUST_LOG may come from .env
    server::init_tracing();
    info!("🚀 Starting Rust Stocks API");

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("📋 Configuration loaded, serving on {}", config.listen_addr);

    let state = match server::build_state(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {:#}", e);
            eprintln!("❌ Startup Error: {:#}", e);
            std::process::exit(1);
        }
    };

    server::serve(state).await
}
