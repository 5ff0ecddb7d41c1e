//! Execution Engine
//!
//! Consumes an issued `SwapQuote` exactly once, looked up by id in the
//! `QuoteBook` so the signed payload is always the one the server built:
//!
//!   Pending → SwapSubmitted → SwapConfirmed → FeesSettling → Persisted
//!      └──────────┴─→ Aborted (precondition, broadcast or revert failure)
//!
//! Only the swap leg is fatal. Fee legs are settled best-effort after the
//! swap confirms and each produces a `LegOutcome` in the report.

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::{Address, Bytes, U256};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::fees::{proportional_token_fee, PayoutCheck};
use crate::core::quote_book::QuoteBook;
use crate::core::transfer::{broadcast, transfer_native, transfer_token};
use crate::models::config::FlashConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{
    ExecutionReport, ExecutionResult, ExecutionStage, FeeLeg, LegOutcome, OrderRecord, OrderStatus,
    OrderType, SwapQuote, TokenDetails, TransactionRecord, TxStatus, TxType,
};
use crate::providers::traits::{ChainClient, LedgerStore, TransactionSigner, TxRequest};
use crate::utils::constants::NATIVE_DECIMALS;
use crate::utils::telemetry::{FlowEvent, FlowTelemetry};
use crate::utils::units::{parse_address, smallest_unit_to_f64, usd_to_native_wei};

pub const SUCCESS_MESSAGE: &str = "Flash token generated!";

/// Everything an execute call needs besides the signer
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub user_id: String,
    pub user_email: String,
    pub user_wallet: String,
    pub token: TokenDetails,
    /// Id returned by the Quote Builder
    pub quote_id: String,
    pub recipient: String,
}

/// Inputs that passed validation
struct Validated {
    contract: Address,
    recipient: Address,
}

pub struct ExecutionEngine {
    config: Arc<FlashConfig>,
    chain: Arc<dyn ChainClient>,
    ledger: Arc<dyn LedgerStore>,
    telemetry: Arc<FlowTelemetry>,
    quotes: Arc<QuoteBook>,
}

impl ExecutionEngine {
    pub fn new(
        config: Arc<FlashConfig>,
        chain: Arc<dyn ChainClient>,
        ledger: Arc<dyn LedgerStore>,
        telemetry: Arc<FlowTelemetry>,
        quotes: Arc<QuoteBook>,
    ) -> Self {
        Self {
            config,
            chain,
            ledger,
            telemetry,
            quotes,
        }
    }

    pub async fn execute(
        &self,
        request: &ExecuteRequest,
        signer: Option<&dyn TransactionSigner>,
    ) -> ExecutionResult {
        let started = Instant::now();
        let mut report = ExecutionReport::new();

        let result = self.run(request, signer, &mut report).await;
        self.telemetry
            .record_execution_latency(started.elapsed().as_millis() as u64);

        match result {
            Ok(tx_hash) => {
                self.telemetry.record(FlowEvent::ExecutionSucceeded);
                if !report.is_clean() {
                    warn!("⚠️ Swap {} succeeded with incomplete fee settlement", tx_hash);
                }
                ExecutionResult::succeeded(SUCCESS_MESSAGE, tx_hash, report)
            }
            Err(err) => {
                self.telemetry.record(FlowEvent::ExecutionFailed);
                if err.code == ErrorCode::SwapReverted {
                    self.telemetry.record(FlowEvent::SwapReverted);
                }
                error!("❌ Execution for user {} aborted: {}", request.user_id, err);
                ExecutionResult::failed(&err, report)
            }
        }
    }

    /// Request-only checks; nothing is taken from the quote book yet
    fn validate(&self, request: &ExecuteRequest, has_signer: bool) -> AppResult<Validated> {
        if parse_address(&request.user_wallet).is_none() || !has_signer {
            return Err(AppError::bad_input("Bad input"));
        }
        let recipient = parse_address(&request.recipient)
            .ok_or_else(|| AppError::bad_input("Bad input: recipient address missing or malformed"))?;
        let contract = request
            .token
            .contract()
            .and_then(parse_address)
            .ok_or_else(|| AppError::bad_input("Bad input: token contract address missing"))?;
        Ok(Validated { contract, recipient })
    }

    /// Take the issued quote out of the book and check it still applies
    fn claim_quote(
        &self,
        request: &ExecuteRequest,
        contract: Address,
        signer: &dyn TransactionSigner,
    ) -> AppResult<SwapQuote> {
        let issued = self.quotes.take(&request.quote_id, &request.user_id)?;
        if issued.token != contract {
            return Err(AppError::bad_input("Bad input: quote was built for a different token"));
        }
        let quote = issued.quote;
        if quote.is_expired() {
            return Err(AppError::quote_expired());
        }
        if !quote.can_afford {
            return Err(AppError::insufficient_balance("Insufficient balance"));
        }
        if parse_address(&quote.tx.from) != Some(signer.address()) {
            return Err(AppError::bad_input(
                "Bad input: quote transaction sender does not match the signing wallet",
            ));
        }
        Ok(quote)
    }

    async fn run(
        &self,
        request: &ExecuteRequest,
        signer: Option<&dyn TransactionSigner>,
        report: &mut ExecutionReport,
    ) -> AppResult<String> {
        let Validated { contract, recipient } = self.validate(request, signer.is_some())?;
        let signer = signer.ok_or_else(|| AppError::bad_input("Bad input"))?;
        let quote = self.claim_quote(request, contract, signer)?;
        let quote = &quote;

        // ============================================
        // 1. Swap leg (fatal)
        // ============================================
        let swap_tx = swap_request(quote, signer.address())?;
        let pre_balance = self.chain.token_balance(contract, recipient).await.ok();

        info!(
            "🚀 Submitting swap for user {} (quote {}, ${} of {})",
            request.user_id, quote.quote_id, quote.usd_amount_to_spend, quote.token_symbol
        );
        let swap_hash = broadcast(
            self.chain.as_ref(),
            signer,
            swap_tx,
            self.config.swap_gas_buffer_percent,
        )
        .await
        .map_err(|e| AppError::swap_broadcast_failed(format!("1inch swap failed: {}", e)))?;
        report.stage = ExecutionStage::SwapSubmitted;

        let receipt = self
            .chain
            .wait_for_receipt(swap_hash)
            .await
            .map_err(|e| AppError::swap_broadcast_failed(format!("Swap receipt unavailable: {}", e)))?;
        if !receipt.success {
            return Err(AppError::swap_reverted(swap_hash));
        }
        report.stage = ExecutionStage::SwapConfirmed;
        let swap_hash = swap_hash.to_string();
        info!("✅ Swap confirmed: {}", swap_hash);

        // ============================================
        // 2-3. Fee legs (best-effort)
        // ============================================
        report.stage = ExecutionStage::FeesSettling;
        let realized = self.realized_amount(contract, recipient, pre_balance, quote).await;
        report.realized_amount = Some(realized.to_string());

        self.settle_fees(signer, contract, realized, quote, report).await;
        for leg in report.legs.iter().filter(|l| l.outcome.is_failed()) {
            warn!("⚠️ Fee leg {} failed: {:?}", leg.leg.as_str(), leg.outcome);
            self.telemetry.record(FlowEvent::FeeLegFailed);
        }

        // ============================================
        // 4. Persistence (best-effort)
        // ============================================
        match self.persist(request, quote, &swap_hash, realized).await {
            Ok(()) => report.persisted = true,
            Err(e) => warn!("⚠️ Ledger write failed for {}: {}", swap_hash, e),
        }
        report.stage = ExecutionStage::Persisted;

        Ok(swap_hash)
    }

    /// Post − pre balance delta, or the quote's estimate if a read failed
    async fn realized_amount(
        &self,
        contract: Address,
        recipient: Address,
        pre_balance: Option<U256>,
        quote: &SwapQuote,
    ) -> U256 {
        let post_balance = self.chain.token_balance(contract, recipient).await;
        match (pre_balance, post_balance) {
            (Some(pre), Ok(post)) if post > pre => post - pre,
            (_, Err(e)) => {
                warn!("⚠️ Post-swap balance read failed, using quote estimate: {}", e);
                quote.buy_amount_raw()
            }
            _ => {
                warn!("⚠️ No measurable balance delta, using quote estimate");
                quote.buy_amount_raw()
            }
        }
    }

    async fn settle_fees(
        &self,
        signer: &dyn TransactionSigner,
        contract: Address,
        realized: U256,
        quote: &SwapQuote,
        report: &mut ExecutionReport,
    ) {
        let buffer = self.config.swap_gas_buffer_percent;
        let treasury = PayoutCheck::of(&self.config.treasury);

        // Token fee → treasury
        let token_fee = proportional_token_fee(realized, quote.treasury_token_fee_percent);
        let token_leg = if token_fee.is_zero() {
            LegOutcome::skipped("no token fee due")
        } else {
            match payout_target(&treasury, "Treasury") {
                Err(skip) => skip,
                Ok(Err(err)) => LegOutcome::failed(&err),
                Ok(Ok(to)) => {
                    match transfer_token(self.chain.as_ref(), signer, contract, to, token_fee, buffer).await {
                        Ok(receipt) => LegOutcome::Settled {
                            tx_hash: receipt.tx_hash.to_string(),
                            amount: token_fee.to_string(),
                        },
                        Err(e) => LegOutcome::failed(&AppError::fee_leg_failed(format!(
                            "Token fee transfer failed: {}",
                            e
                        ))),
                    }
                }
            }
        };
        let aborted = is_suffix_mismatch(&token_leg);
        report.record(FeeLeg::TreasuryToken, token_leg);
        if aborted {
            skip_remaining(report, &[FeeLeg::TreasuryNative, FeeLeg::OperatorNative]);
            return;
        }

        // Flat treasury fee → treasury
        let treasury_leg = self
            .native_fee_leg(signer, &treasury, "Treasury", quote.treasury_flat_fee_usd, quote.native_price_usd)
            .await;
        let aborted = is_suffix_mismatch(&treasury_leg);
        report.record(FeeLeg::TreasuryNative, treasury_leg);
        if aborted {
            skip_remaining(report, &[FeeLeg::OperatorNative]);
            return;
        }

        // Flat operator fee → operator
        let operator = PayoutCheck::of(&self.config.operator);
        let operator_leg = self
            .native_fee_leg(signer, &operator, "Developer", quote.dev_fee_usd, quote.native_price_usd)
            .await;
        report.record(FeeLeg::OperatorNative, operator_leg);
    }

    async fn native_fee_leg(
        &self,
        signer: &dyn TransactionSigner,
        payout: &PayoutCheck,
        wallet: &str,
        fee_usd: f64,
        price_usd: f64,
    ) -> LegOutcome {
        if fee_usd <= 0.0 {
            return LegOutcome::skipped("no flat fee configured");
        }
        let to = match payout_target(payout, wallet) {
            Err(skip) => return skip,
            Ok(Err(err)) => return LegOutcome::failed(&err),
            Ok(Ok(to)) => to,
        };
        let amount = match usd_to_native_wei(fee_usd, price_usd) {
            Ok(amount) if !amount.is_zero() => amount,
            _ => return LegOutcome::skipped("fee converts to zero native"),
        };

        match transfer_native(
            self.chain.as_ref(),
            signer,
            to,
            amount,
            self.config.swap_gas_buffer_percent,
        )
        .await
        {
            Ok(receipt) => LegOutcome::Settled {
                tx_hash: receipt.tx_hash.to_string(),
                amount: amount.to_string(),
            },
            Err(e) => LegOutcome::failed(&AppError::fee_leg_failed(format!(
                "{} fee transfer failed: {}",
                wallet, e
            ))),
        }
    }

    async fn persist(
        &self,
        request: &ExecuteRequest,
        quote: &SwapQuote,
        swap_hash: &str,
        realized: U256,
    ) -> AppResult<()> {
        let token_amount = smallest_unit_to_f64(realized, request.token.decimals);
        let now = Utc::now();

        let order = OrderRecord {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            user_email: request.user_email.clone(),
            user_wallet_address: request.user_wallet.clone(),
            token_id: request.token.contract().unwrap_or_default().to_string(),
            token_name: request.token.name.clone(),
            token_symbol: request.token.symbol.clone(),
            usd_amount_to_spend: quote.usd_amount_to_spend,
            token_amount,
            recipient_address: request.recipient.clone(),
            bnb_amount: smallest_unit_to_f64(quote.sell_amount_raw(), NATIVE_DECIMALS),
            bnb_price: quote.native_price_usd,
            payment_hash: swap_hash.to_string(),
            dev_payment_hash: None,
            status: OrderStatus::Completed,
            order_type: OrderType::Auto,
            created_at: now,
            completed_at: Some(now),
            treasury_flat_fee_usd: quote.treasury_flat_fee_usd,
            dev_fee_usd: quote.dev_fee_usd,
            treasury_token_fee_percent: quote.treasury_token_fee_percent,
        };
        self.ledger
            .append_order(&order)
            .await
            .map_err(|e| AppError::ledger(format!("Order write failed: {}", e)))?;

        let record = TransactionRecord::new(
            &request.user_id,
            TxType::Generate,
            token_amount,
            &request.token.symbol,
            swap_hash,
            TxStatus::Success,
            &request.recipient,
        );
        self.ledger
            .append_transaction(&record)
            .await
            .map_err(|e| AppError::ledger(format!("Transaction write failed: {}", e)))?;

        info!("💾 Order {} persisted", order.id);
        Ok(())
    }
}

/// Swap transaction from the quote's opaque payload. Gas limit is left
/// unset so it is estimated live; the declared gas price is kept.
fn swap_request(quote: &SwapQuote, from: Address) -> AppResult<TxRequest> {
    let to = parse_address(&quote.tx.to)
        .ok_or_else(|| AppError::bad_input("Bad input: quote transaction has no target"))?;
    let data: Bytes = quote
        .tx
        .data
        .parse()
        .map_err(|_| AppError::bad_input("Bad input: quote transaction data is not hex"))?;

    let mut tx = TxRequest::call(from, to, data);
    tx.value = quote.tx.value_wei();
    let gas_price = quote.tx.gas_price_wei();
    if !gas_price.is_zero() {
        tx.gas_price = u128::try_from(gas_price).ok();
    }
    Ok(tx)
}

/// `Err(skip)` for a leg that does not apply, `Ok(Err)` for a guard
/// failure, `Ok(Ok(address))` when the transfer may proceed
fn payout_target(check: &PayoutCheck, wallet: &str) -> Result<AppResult<Address>, LegOutcome> {
    match check {
        PayoutCheck::Unconfigured => Err(LegOutcome::skipped(format!("{} wallet not configured", wallet))),
        PayoutCheck::ZeroAddress => Err(LegOutcome::skipped(format!("{} wallet is the zero address", wallet))),
        other => Ok(other.clone().require(wallet)),
    }
}

fn is_suffix_mismatch(outcome: &LegOutcome) -> bool {
    matches!(outcome, LegOutcome::Failed { code, .. } if code == ErrorCode::AddressSuffixMismatch.as_str())
}

fn skip_remaining(report: &mut ExecutionReport, legs: &[FeeLeg]) {
    for leg in legs {
        report.record(*leg, LegOutcome::skipped("aborted after address suffix mismatch"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::AggregatorTx;

    fn quote_with_tx(tx: AggregatorTx) -> SwapQuote {
        SwapQuote {
            quote_id: "q-test".into(),
            usd_amount_to_spend: 100.0,
            token_symbol: "TKN".into(),
            recipient_address: String::new(),
            estimated_bnb_required: 0.0,
            total_required_wei: "0".into(),
            estimated_usd_cost: 0.0,
            estimated_tokens_received: 0.0,
            treasury_flat_fee_usd: 0.0,
            dev_fee_usd: 0.0,
            treasury_token_fee_percent: 0.0,
            can_afford: true,
            user_native_balance: 0.0,
            user_wrapped_balance: 0.0,
            native_price_usd: 600.0,
            expiry: Utc::now(),
            tx,
            sell_amount: "0".into(),
            buy_amount: "0".into(),
        }
    }

    #[test]
    fn test_swap_request_keeps_payload() {
        let quote = quote_with_tx(AggregatorTx {
            from: "0x1111111111111111111111111111111111111111".into(),
            to: "0x111111125421ca6dc452d289314280a0f8842a65".into(),
            data: "0x07ed2379".into(),
            value: "166700000000000000".into(),
            gas: "200000".into(),
            gas_price: "5000000000".into(),
        });
        let tx = swap_request(&quote, Address::ZERO).unwrap();
        assert_eq!(tx.data.as_ref(), &[0x07, 0xed, 0x23, 0x79]);
        assert_eq!(tx.value, U256::from(166_700_000_000_000_000u128));
        assert_eq!(tx.gas_price, Some(5_000_000_000));
        // declared gas is not trusted for the send
        assert_eq!(tx.gas_limit, None);
    }

    #[test]
    fn test_swap_request_rejects_bad_payload() {
        let mut tx = AggregatorTx {
            from: String::new(),
            to: "not-an-address".into(),
            data: "0x".into(),
            value: "0".into(),
            gas: "0".into(),
            gas_price: "0".into(),
        };
        assert!(swap_request(&quote_with_tx(tx.clone()), Address::ZERO).is_err());
        tx.to = "0x111111125421ca6dc452d289314280a0f8842a65".into();
        tx.data = "zz".into();
        assert!(swap_request(&quote_with_tx(tx), Address::ZERO).is_err());
    }

    #[test]
    fn test_suffix_mismatch_detection() {
        assert!(is_suffix_mismatch(&LegOutcome::failed(&AppError::suffix_mismatch("Treasury"))));
        assert!(!is_suffix_mismatch(&LegOutcome::failed(&AppError::fee_leg_failed("x"))));
        assert!(!is_suffix_mismatch(&LegOutcome::skipped("x")));
    }
}
