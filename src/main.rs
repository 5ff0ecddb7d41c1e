//! Flashgen API Server
//!
//! Usage:
//!   cargo run --bin flashgen
//!
//! Environment:
//!   ONE_INCH_API_KEY                  - Aggregator credential (quotes fail without it)
//!   TREASURY_WALLET / DEV_WALLET      - Payout addresses (+ *_LAST_DIGITS)
//!   KEYRING_PATH                      - JSON map of userId → private key
//!   PORT / FLASHGEN_PORT              - Server port (default: 8080)
//!   RUST_LOG                          - Log level (default: info)

use flashgen::api::{create_router, start_cleanup_task, AppState};
use flashgen::core::oracle::{CachedPriceOracle, PriceOracle};
use flashgen::providers::aggregator::OneInchClient;
use flashgen::providers::ledger::JsonlLedger;
use flashgen::providers::rpc::RpcProvider;
use flashgen::providers::signer::Keyring;
use flashgen::FlashConfig;

use eyre::{eyre, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Arc::new(FlashConfig::from_env().map_err(|e| eyre!("{}", e))?);
    info!(
        "⚙️ Chain {} ({}), {} RPC endpoints",
        config.chain_id,
        config.native_symbol,
        config.rpc_endpoints.len()
    );

    // ============================================
    // Providers
    // ============================================
    let chain = Arc::new(
        RpcProvider::new(config.rpc_endpoints.clone(), config.chain_id)?
            .with_request_timeout(config.rpc_timeout)?
            .with_receipt_timeout(config.receipt_timeout),
    );

    if config.aggregator.api_key.is_none() {
        warn!("⚠️ ONE_INCH_API_KEY not set: quotes will fail with CONFIG_MISSING");
    }
    let aggregator = Arc::new(OneInchClient::new(
        config.aggregator.base_url.clone(),
        config.aggregator.api_key.clone().unwrap_or_default(),
    ));

    let oracle = Arc::new(CachedPriceOracle::new(
        PriceOracle::from_config(&config),
        config.price.cache_ttl,
    ));

    let ledger = Arc::new(JsonlLedger::open(config.ledger_dir.clone())?);
    info!("💾 Ledger at {}", ledger.dir().display());

    let keyring = match &config.keyring_path {
        Some(path) => Keyring::load(path)?,
        None => {
            warn!("⚠️ KEYRING_PATH not set: execute and manual orders will be rejected");
            Keyring::new()
        }
    };
    info!("🔑 {} signer(s) loaded", keyring.len());

    let state = Arc::new(AppState::new(
        config.clone(),
        chain,
        aggregator,
        oracle,
        ledger,
        Arc::new(keyring),
    ));
    let telemetry = state.telemetry.clone();

    start_cleanup_task();

    // ============================================
    // Server
    // ============================================
    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("🚀 Flashgen API starting on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /v1/price          - Native coin price (cached)");
    info!("  POST /v1/quote          - Build a swap quote");
    info!("  POST /v1/execute        - Execute a quote");
    info!("  POST /v1/orders/manual  - Submit a manual order");
    info!("  GET  /v1/stats          - Flow statistics");
    info!("  GET  /v1/health         - Health check");
    if config.server.api_keys.is_empty() {
        warn!("⚠️ FLASHGEN_API_KEYS not set: API key check disabled");
    }

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("🛑 Shutdown signal received");
    let stats = telemetry.get_stats();
    info!("   Quotes built: {}", stats.quotes_built);
    info!(
        "   Executions: {} ok / {} failed ({} reverted)",
        stats.executions_succeeded, stats.executions_failed, stats.swaps_reverted
    );
    info!("   Fee legs failed: {}", stats.fee_legs_failed);
    info!("   Manual orders: {}", stats.manual_orders_submitted);
    info!("👋 Flashgen shutdown complete");

    Ok(())
}
