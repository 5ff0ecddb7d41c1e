//! Manual-Order Path
//!
//! Tokens without on-chain automation: the user pays
//! (usd + treasury flat fee) / price in native coin to the treasury in a
//! single transaction, an optional operator fee follows, and a pending
//! order is logged for an administrator to fulfil.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::fees::{FeePolicy, PayoutCheck};
use crate::core::oracle::CachedPriceOracle;
use crate::core::transfer::transfer_native;
use crate::models::config::FlashConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    ExecutionReport, ExecutionResult, ExecutionStage, FeeLeg, LegOutcome, OrderRecord, OrderStatus,
    OrderType, TokenDetails, TransactionRecord, TxStatus, TxType,
};
use crate::providers::traits::{ChainClient, LedgerStore, TransactionSigner};
use crate::utils::telemetry::{FlowEvent, FlowTelemetry};
use crate::utils::units::{parse_address, usd_to_native_wei, wei_to_native};

pub const MANUAL_SUCCESS_MESSAGE: &str =
    "Manual order placed successfully! Your tokens will be sent shortly by an administrator.";

/// Manual order submission
#[derive(Debug, Clone)]
pub struct ManualOrderRequest {
    pub user_id: String,
    pub user_email: String,
    pub user_wallet: String,
    pub token: TokenDetails,
    pub usd_to_spend: f64,
    /// Free-form destination (may live on another chain)
    pub recipient: String,
}

/// Amounts resolved before any transfer
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCosts {
    pub price_usd: f64,
    pub treasury_fee_usd: f64,
    pub operator_fee_usd: f64,
    /// Paid to treasury: usd + treasury fee
    pub treasury_payment_wei: U256,
    /// Paid to operator, zero when not applicable
    pub operator_payment_wei: U256,
}

impl ManualCosts {
    pub fn total_wei(&self) -> U256 {
        self.treasury_payment_wei.saturating_add(self.operator_payment_wei)
    }
}

/// Cost breakdown for `usd` at `price_usd` under `fees`
pub fn manual_costs(fees: &FeePolicy, usd: f64, price_usd: f64) -> AppResult<ManualCosts> {
    let flat = fees.flat_fees_usd(OrderType::Manual);
    let treasury_payment_wei = usd_to_native_wei(usd + flat.treasury, price_usd)
        .map_err(|e| AppError::bad_input(e.to_string()))?;
    let operator_payment_wei = usd_to_native_wei(flat.operator, price_usd)
        .map_err(|e| AppError::bad_input(e.to_string()))?;
    Ok(ManualCosts {
        price_usd,
        treasury_fee_usd: flat.treasury,
        operator_fee_usd: flat.operator,
        treasury_payment_wei,
        operator_payment_wei,
    })
}

pub struct ManualOrderService {
    config: Arc<FlashConfig>,
    oracle: Arc<CachedPriceOracle>,
    chain: Arc<dyn ChainClient>,
    ledger: Arc<dyn LedgerStore>,
    telemetry: Arc<FlowTelemetry>,
    fees: FeePolicy,
}

impl ManualOrderService {
    pub fn new(
        config: Arc<FlashConfig>,
        oracle: Arc<CachedPriceOracle>,
        chain: Arc<dyn ChainClient>,
        ledger: Arc<dyn LedgerStore>,
        telemetry: Arc<FlowTelemetry>,
    ) -> Self {
        let fees = FeePolicy::from_config(&config);
        Self {
            config,
            oracle,
            chain,
            ledger,
            telemetry,
            fees,
        }
    }

    pub async fn submit(
        &self,
        request: &ManualOrderRequest,
        signer: Option<&dyn TransactionSigner>,
    ) -> ExecutionResult {
        let mut report = ExecutionReport::new();
        match self.run(request, signer, &mut report).await {
            Ok(hash) => {
                self.telemetry.record(FlowEvent::ManualOrderSubmitted);
                ExecutionResult::succeeded(MANUAL_SUCCESS_MESSAGE, hash, report)
            }
            Err(err) => {
                self.telemetry.record(FlowEvent::ManualOrderFailed);
                error!("❌ Manual order for user {} failed: {}", request.user_id, err);
                ExecutionResult::failed(&err, report)
            }
        }
    }

    /// Treasury must be verified; operator, when configured, must verify too
    fn preflight_payouts(&self) -> AppResult<(Address, Option<Address>)> {
        let treasury = match PayoutCheck::of(&self.config.treasury) {
            PayoutCheck::Unconfigured | PayoutCheck::ZeroAddress => {
                return Err(AppError::config_missing(
                    "Treasury wallet address (unset or zero address)",
                ))
            }
            check => check.require("Treasury")?,
        };
        let operator = match PayoutCheck::of(&self.config.operator) {
            PayoutCheck::Unconfigured | PayoutCheck::ZeroAddress => None,
            check => Some(check.require("Developer")?),
        };
        Ok((treasury, operator))
    }

    async fn run(
        &self,
        request: &ManualOrderRequest,
        signer: Option<&dyn TransactionSigner>,
        report: &mut ExecutionReport,
    ) -> AppResult<String> {
        // ============================================
        // Pre-flight (nothing sent yet)
        // ============================================
        let signer = signer.ok_or_else(|| AppError::bad_input("Bad input"))?;
        if parse_address(&request.user_wallet).is_none() || request.recipient.trim().is_empty() {
            return Err(AppError::bad_input("Bad input"));
        }
        if !(request.usd_to_spend.is_finite() && request.usd_to_spend > 0.0) {
            return Err(AppError::bad_input("Bad input: USD amount must be positive"));
        }
        let (treasury, operator) = self.preflight_payouts()?;

        let price = self.oracle.fetch_price().await;
        if price <= 0.0 {
            return Err(AppError::price_unavailable());
        }
        let mut costs = manual_costs(&self.fees, request.usd_to_spend, price)?;
        if operator.is_none() {
            costs.operator_payment_wei = U256::ZERO;
        }

        let balance = self
            .chain
            .native_balance(signer.address())
            .await
            .map_err(|e| AppError::rpc(format!("Failed to read native balance: {}", e)))?;
        if balance < costs.total_wei() {
            return Err(AppError::insufficient_balance(format!(
                "Insufficient balance: need {:.6} {}, have {:.6}",
                wei_to_native(costs.total_wei()),
                self.config.native_symbol,
                wei_to_native(balance)
            )));
        }

        // ============================================
        // Treasury payment (fatal)
        // ============================================
        info!(
            "💸 Manual order: paying {:.6} {} to treasury",
            wei_to_native(costs.treasury_payment_wei),
            self.config.native_symbol
        );
        let buffer = self.config.swap_gas_buffer_percent;
        let payment = transfer_native(
            self.chain.as_ref(),
            signer,
            treasury,
            costs.treasury_payment_wei,
            buffer,
        )
        .await
        .map_err(|e| {
            AppError::payment_failed(format!("Payment to treasury failed for manual order: {}", e))
        })?;
        let payment_hash = payment.tx_hash.to_string();
        report.record(
            FeeLeg::TreasuryNative,
            LegOutcome::Settled {
                tx_hash: payment_hash.clone(),
                amount: costs.treasury_payment_wei.to_string(),
            },
        );

        // ============================================
        // Operator fee (non-fatal)
        // ============================================
        report.stage = ExecutionStage::FeesSettling;
        let operator_leg = match operator {
            Some(to) if !costs.operator_payment_wei.is_zero() => {
                let sent = transfer_native(
                    self.chain.as_ref(),
                    signer,
                    to,
                    costs.operator_payment_wei,
                    buffer,
                )
                .await;
                match sent {
                    Ok(receipt) => LegOutcome::Settled {
                        tx_hash: receipt.tx_hash.to_string(),
                        amount: costs.operator_payment_wei.to_string(),
                    },
                    Err(e) => {
                        warn!("⚠️ Failed to send developer fee: {}", e);
                        self.telemetry.record(FlowEvent::FeeLegFailed);
                        LegOutcome::failed(&AppError::fee_leg_failed(format!(
                            "Developer fee transfer failed: {}",
                            e
                        )))
                    }
                }
            }
            Some(_) => LegOutcome::skipped("no flat fee configured"),
            None => LegOutcome::skipped("Developer wallet not configured"),
        };
        let dev_payment_hash = match &operator_leg {
            LegOutcome::Settled { tx_hash, .. } => Some(tx_hash.clone()),
            _ => None,
        };
        report.record(FeeLeg::OperatorNative, operator_leg);

        // ============================================
        // Persistence (best-effort)
        // ============================================
        match self
            .persist(request, &costs, &payment_hash, dev_payment_hash)
            .await
        {
            Ok(()) => report.persisted = true,
            Err(e) => warn!("⚠️ Ledger write failed for manual order {}: {}", payment_hash, e),
        }
        report.stage = ExecutionStage::Persisted;

        Ok(payment_hash)
    }

    async fn persist(
        &self,
        request: &ManualOrderRequest,
        costs: &ManualCosts,
        payment_hash: &str,
        dev_payment_hash: Option<String>,
    ) -> AppResult<()> {
        let operator_fee_usd = if costs.operator_payment_wei.is_zero() {
            0.0
        } else {
            costs.operator_fee_usd
        };
        let order = OrderRecord {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            user_email: request.user_email.clone(),
            user_wallet_address: request.user_wallet.clone(),
            token_id: request.token.token_id(),
            token_name: request.token.name.clone(),
            token_symbol: request.token.symbol.clone(),
            usd_amount_to_spend: request.usd_to_spend,
            token_amount: 0.0,
            recipient_address: request.recipient.clone(),
            bnb_amount: wei_to_native(costs.total_wei()),
            bnb_price: costs.price_usd,
            payment_hash: payment_hash.to_string(),
            dev_payment_hash,
            status: OrderStatus::Pending,
            order_type: OrderType::Manual,
            created_at: Utc::now(),
            completed_at: None,
            treasury_flat_fee_usd: costs.treasury_fee_usd,
            dev_fee_usd: operator_fee_usd,
            treasury_token_fee_percent: self.fees.token_fee_percent(),
        };
        self.ledger
            .append_order(&order)
            .await
            .map_err(|e| AppError::ledger(format!("Order write failed: {}", e)))?;

        let record = TransactionRecord::new(
            &request.user_id,
            TxType::VendorPayment,
            request.usd_to_spend,
            &request.token.symbol,
            payment_hash,
            TxStatus::Success,
            &request.recipient,
        );
        self.ledger
            .append_transaction(&record)
            .await
            .map_err(|e| AppError::ledger(format!("Transaction write failed: {}", e)))?;

        info!("💾 Manual order {} logged as pending", order.id);
        Ok(())
    }
}
