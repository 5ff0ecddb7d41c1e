//! Quote Builder
//!
//! USD amount → native sell amount → aggregator swap payload → total cost
//! with flat fees → affordability. Produces an immutable `SwapQuote` valid
//! for the configured window (30 s by default) and records it in the
//! `QuoteBook` under a fresh id.

use std::sync::Arc;

use alloy_primitives::U256;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::fees::FeePolicy;
use crate::core::oracle::CachedPriceOracle;
use crate::core::quote_book::QuoteBook;
use crate::models::config::FlashConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{OrderType, SwapQuote, TokenDetails};
use crate::providers::traits::{ChainClient, SwapAggregator, SwapRequest};
use crate::utils::constants::{NATIVE_DECIMALS, NATIVE_TOKEN_SENTINEL};
use crate::utils::units::{parse_address, smallest_unit_to_f64, usd_to_native_wei, wei_to_native};

pub struct QuoteBuilder {
    config: Arc<FlashConfig>,
    oracle: Arc<CachedPriceOracle>,
    aggregator: Arc<dyn SwapAggregator>,
    chain: Arc<dyn ChainClient>,
    quotes: Arc<QuoteBook>,
    fees: FeePolicy,
}

impl QuoteBuilder {
    pub fn new(
        config: Arc<FlashConfig>,
        oracle: Arc<CachedPriceOracle>,
        aggregator: Arc<dyn SwapAggregator>,
        chain: Arc<dyn ChainClient>,
        quotes: Arc<QuoteBook>,
    ) -> Self {
        let fees = FeePolicy::from_config(&config);
        Self {
            config,
            oracle,
            aggregator,
            chain,
            quotes,
            fees,
        }
    }

    pub fn quote_book(&self) -> &Arc<QuoteBook> {
        &self.quotes
    }

    pub async fn build_quote(
        &self,
        user_id: &str,
        user_wallet: &str,
        token: &TokenDetails,
        usd_to_spend: f64,
    ) -> AppResult<SwapQuote> {
        // ============================================
        // Preconditions (no network)
        // ============================================
        let wallet = parse_address(user_wallet)
            .ok_or_else(|| AppError::bad_input("Bad input: wallet address missing or malformed"))?;
        if !(usd_to_spend.is_finite() && usd_to_spend > 0.0) {
            return Err(AppError::bad_input("Bad input: USD amount must be positive"));
        }
        let contract = token
            .contract()
            .and_then(parse_address)
            .ok_or_else(|| AppError::bad_input("Bad input: token contract address missing"))?;
        if self.config.aggregator.api_key.is_none() {
            return Err(AppError::config_missing("1inch API key"));
        }

        info!(
            "📝 Quote for user {}: ${:.2} of {} ({})",
            user_id, usd_to_spend, token.symbol, contract
        );

        // ============================================
        // 1-2. Price and sell amount
        // ============================================
        let price = self.oracle.fetch_price().await;
        if price <= 0.0 {
            return Err(AppError::price_unavailable());
        }
        let sell_wei = usd_to_native_wei(usd_to_spend, price)
            .map_err(|e| AppError::bad_input(e.to_string()))?;

        // ============================================
        // 3. Aggregator swap payload
        // ============================================
        let request = SwapRequest {
            src: NATIVE_TOKEN_SENTINEL,
            dst: contract,
            amount: sell_wei,
            from: wallet,
            slippage_percent: self.config.aggregator.slippage_percent,
        };
        let swap = self
            .aggregator
            .swap_quote(&request)
            .await
            .map_err(|e| AppError::aggregator(e.to_string()))?;

        // ============================================
        // 4. Balances (wrapped is display-only)
        // ============================================
        let (native, wrapped) = tokio::join!(
            self.chain.native_balance(wallet),
            self.chain.token_balance(self.config.wrapped_native, wallet),
        );
        let native = native.map_err(|e| AppError::rpc(format!("Failed to read native balance: {}", e)))?;
        let wrapped = wrapped.unwrap_or_else(|e| {
            warn!("⚠️ Wrapped balance unavailable for {}: {}", wallet, e);
            U256::ZERO
        });

        // ============================================
        // 5-8. Totals and affordability
        // ============================================
        let flat = self.fees.flat_fees_usd(OrderType::Auto);
        let flat_fee_wei = usd_to_native_wei(flat.total(), price)
            .map_err(|e| AppError::bad_input(e.to_string()))?;
        let total_required = swap.tx.swap_cost_wei().saturating_add(flat_fee_wei);
        let can_afford = native >= total_required;

        let quote = SwapQuote {
            quote_id: Uuid::new_v4().to_string(),
            usd_amount_to_spend: usd_to_spend,
            token_symbol: token.symbol.clone(),
            recipient_address: user_wallet.trim().to_string(),
            estimated_bnb_required: wei_to_native(total_required),
            total_required_wei: total_required.to_string(),
            estimated_usd_cost: usd_to_spend + flat.total(),
            estimated_tokens_received: smallest_unit_to_f64(swap.dst_amount, token.decimals),
            treasury_flat_fee_usd: flat.treasury,
            dev_fee_usd: flat.operator,
            treasury_token_fee_percent: self.fees.token_fee_percent(),
            can_afford,
            user_native_balance: smallest_unit_to_f64(native, NATIVE_DECIMALS),
            user_wrapped_balance: smallest_unit_to_f64(wrapped, NATIVE_DECIMALS),
            native_price_usd: price,
            expiry: Utc::now() + chrono::Duration::milliseconds(self.config.quote_validity.as_millis() as i64),
            sell_amount: swap.tx.value_wei().to_string(),
            buy_amount: swap.buy_amount().to_string(),
            tx: swap.tx,
        };

        info!(
            "✅ Quote ready: ~{:.4} {} for {:.6} {} (canAfford={})",
            quote.estimated_tokens_received,
            quote.token_symbol,
            quote.estimated_bnb_required,
            self.config.native_symbol,
            quote.can_afford
        );
        self.quotes.issue(user_id, contract, quote.clone());
        Ok(quote)
    }
}
