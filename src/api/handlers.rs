//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::*;
use crate::core::executor::{ExecuteRequest, ExecutionEngine};
use crate::core::manual::{ManualOrderRequest, ManualOrderService};
use crate::core::oracle::CachedPriceOracle;
use crate::core::quote::QuoteBuilder;
use crate::core::quote_book::QuoteBook;
use crate::models::config::FlashConfig;
use crate::models::errors::{AppError, ErrorCode};
use crate::models::types::{ExecutionResult, SwapQuote, TransactionRecord, TxStatus, TxType};
use crate::providers::traits::{
    ChainClient, LedgerStore, SignerSource, SwapAggregator, TransactionSigner,
};
use crate::utils::telemetry::{FlowEvent, FlowTelemetry};

type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

/// Shared application state
pub struct AppState {
    pub config: Arc<FlashConfig>,
    pub oracle: Arc<CachedPriceOracle>,
    pub quotes: QuoteBuilder,
    pub engine: ExecutionEngine,
    pub manual: ManualOrderService,
    pub quote_book: Arc<QuoteBook>,
    pub signers: Arc<dyn SignerSource>,
    pub ledger: Arc<dyn LedgerStore>,
    pub telemetry: Arc<FlowTelemetry>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<FlashConfig>,
        chain: Arc<dyn ChainClient>,
        aggregator: Arc<dyn SwapAggregator>,
        oracle: Arc<CachedPriceOracle>,
        ledger: Arc<dyn LedgerStore>,
        signers: Arc<dyn SignerSource>,
    ) -> Self {
        let telemetry = Arc::new(FlowTelemetry::new());
        let quote_book = Arc::new(QuoteBook::new());
        let quotes = QuoteBuilder::new(
            config.clone(),
            oracle.clone(),
            aggregator,
            chain.clone(),
            quote_book.clone(),
        );
        let engine = ExecutionEngine::new(
            config.clone(),
            chain.clone(),
            ledger.clone(),
            telemetry.clone(),
            quote_book.clone(),
        );
        let manual = ManualOrderService::new(
            config.clone(),
            oracle.clone(),
            chain,
            ledger.clone(),
            telemetry.clone(),
        );

        Self {
            config,
            oracle,
            quotes,
            engine,
            manual,
            quote_book,
            signers,
            ledger,
            telemetry,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn status_for(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Wrap an `ExecutionResult` with the status its error code maps to
fn execution_response(
    result: ExecutionResult,
    start: Instant,
) -> (StatusCode, Json<ApiResponse<ExecutionResult>>) {
    match result.error.as_ref().map(ApiError::from) {
        None => (
            StatusCode::OK,
            Json(ApiResponse::success(result, elapsed_ms(start))),
        ),
        Some(error) => {
            let status = status_for(ErrorCode::from_code_str(&error.code));
            (status, Json(ApiResponse::failure(result, error, elapsed_ms(start))))
        }
    }
}

/// Wallet given in the request, else the signer's own address
fn resolve_wallet(given: Option<&str>, signer: Option<&Arc<dyn TransactionSigner>>) -> String {
    given
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(String::from)
        .or_else(|| signer.map(|s| s.address().to_string()))
        .unwrap_or_default()
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        chain_id: state.config.chain_id,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let cache = state.oracle.cache_stats();

    let data = StatsData {
        flow: state.telemetry.get_stats(),
        price_cache: PriceCacheData {
            entries: cache.entries,
            hits: cache.hits,
            misses: cache.misses,
            hit_rate: cache.hit_rate,
            ttl_secs: cache.ttl_secs,
        },
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Price
// ============================================

pub async fn get_price(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PriceData>>, ApiFailure> {
    let start = Instant::now();

    match state.oracle.fetch_quote().await {
        Some(quote) => Ok(Json(ApiResponse::success(
            PriceData {
                symbol: state.config.native_symbol.clone(),
                price_usd: quote.price_usd,
                source: quote.source,
                fetched_at: quote.fetched_at.timestamp(),
            },
            elapsed_ms(start),
        ))),
        None => {
            let err = AppError::price_unavailable();
            Err((
                status_for(err.code),
                Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))),
            ))
        }
    }
}

// ============================================
// Quote
// ============================================

pub async fn create_quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<SwapQuote>>, ApiFailure> {
    let start = Instant::now();

    match state
        .quotes
        .build_quote(&req.user_id, &req.user_wallet, &req.token, req.usd_amount)
        .await
    {
        Ok(quote) => {
            state.telemetry.record(FlowEvent::QuoteBuilt);
            Ok(Json(ApiResponse::success(quote, elapsed_ms(start))))
        }
        Err(err) => {
            state.telemetry.record(FlowEvent::QuoteFailed);
            warn!("⚠️ Quote failed for user {}: {}", req.user_id, err);
            Err((
                status_for(err.code),
                Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))),
            ))
        }
    }
}

// ============================================
// Execute
// ============================================

pub async fn execute_quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteApiRequest>,
) -> (StatusCode, Json<ApiResponse<ExecutionResult>>) {
    let start = Instant::now();

    let signer = state.signers.signer_for(&req.user_id);
    let request = ExecuteRequest {
        user_id: req.user_id,
        user_email: req.user_email,
        user_wallet: resolve_wallet(req.user_wallet.as_deref(), signer.as_ref()),
        token: req.token,
        quote_id: req.quote_id,
        recipient: req.recipient_address,
    };

    info!(
        "⚡ Execute: user {} quote {} ({})",
        request.user_id, request.quote_id, request.token.symbol
    );
    // Read before execution removes the quote from the book
    let attempted_usd = state.quote_book.usd_amount(&request.quote_id).unwrap_or(0.0);
    let result = state.engine.execute(&request, signer.as_deref()).await;

    if !result.success {
        // Failed attempts are visible in the user's history
        let record = TransactionRecord::new(
            &request.user_id,
            TxType::Generate,
            attempted_usd,
            &request.token.symbol,
            "",
            TxStatus::Failed,
            &request.recipient,
        );
        if let Err(e) = state.ledger.append_transaction(&record).await {
            warn!("⚠️ Could not record failed attempt for {}: {}", request.user_id, e);
        }
    }

    execution_response(result, start)
}

// ============================================
// Manual order
// ============================================

pub async fn submit_manual_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ManualOrderApiRequest>,
) -> (StatusCode, Json<ApiResponse<ExecutionResult>>) {
    let start = Instant::now();

    let signer = state.signers.signer_for(&req.user_id);
    let request = ManualOrderRequest {
        user_id: req.user_id,
        user_email: req.user_email,
        user_wallet: resolve_wallet(req.user_wallet.as_deref(), signer.as_ref()),
        token: req.token,
        usd_to_spend: req.usd_amount,
        recipient: req.recipient_address,
    };

    info!(
        "📝 Manual order: user {} for ${:.2} of {}",
        request.user_id, request.usd_to_spend, request.token.symbol
    );
    let result = state.manual.submit(&request, signer.as_deref()).await;

    execution_response(result, start)
}
