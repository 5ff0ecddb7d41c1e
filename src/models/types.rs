//! Type definitions for the flash generation pipeline
//!
//! Wire names are camelCase: order and transaction records are read by
//! other services (admin UI, order history) by these exact field names.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::errors::{AppError, ErrorBody};
use crate::utils::units::parse_u256_lenient;

// ============================================
// Token catalog entry
// ============================================

/// Token being bought, as listed in the store catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetails {
    /// Catalog id (manual tokens); falls back to the contract address
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Catalog display price, not used for pricing
    #[serde(default)]
    pub price: Option<f64>,
}

fn default_decimals() -> u8 {
    18
}

impl TokenDetails {
    /// Contract address if present and non-blank
    pub fn contract(&self) -> Option<&str> {
        self.contract_address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Identifier written to `tokenId` on orders
    pub fn token_id(&self) -> String {
        self.id
            .clone()
            .or_else(|| self.contract().map(String::from))
            .unwrap_or_default()
    }
}

// ============================================
// Price
// ============================================

/// A positive USD reference price for the native coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub price_usd: f64,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

// ============================================
// Aggregator payload
// ============================================

/// Accept either a JSON string or a JSON number and keep it as text
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Pre-built swap transaction, relayed verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorTx {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(deserialize_with = "string_or_number", default)]
    pub value: String,
    #[serde(deserialize_with = "string_or_number", default)]
    pub gas: String,
    #[serde(deserialize_with = "string_or_number", default)]
    pub gas_price: String,
}

impl AggregatorTx {
    pub fn value_wei(&self) -> U256 {
        parse_u256_lenient(&self.value)
    }

    pub fn gas_limit(&self) -> U256 {
        parse_u256_lenient(&self.gas)
    }

    pub fn gas_price_wei(&self) -> U256 {
        parse_u256_lenient(&self.gas_price)
    }

    /// Declared value plus declared gas × gas price
    pub fn swap_cost_wei(&self) -> U256 {
        self.value_wei()
            .saturating_add(self.gas_limit().saturating_mul(self.gas_price_wei()))
    }
}

// ============================================
// Swap quote
// ============================================

/// Short-lived quote shown to the caller between quote and execute.
/// Never mutated after creation; execution goes through `quote_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub quote_id: String,
    pub usd_amount_to_spend: f64,
    pub token_symbol: String,
    pub recipient_address: String,
    /// Swap cost plus flat fees, in native coin
    pub estimated_bnb_required: f64,
    /// Same total as an exact wei string
    pub total_required_wei: String,
    pub estimated_usd_cost: f64,
    pub estimated_tokens_received: f64,
    pub treasury_flat_fee_usd: f64,
    pub dev_fee_usd: f64,
    pub treasury_token_fee_percent: f64,
    pub can_afford: bool,
    pub user_native_balance: f64,
    pub user_wrapped_balance: f64,
    pub native_price_usd: f64,
    pub expiry: DateTime<Utc>,
    pub tx: AggregatorTx,
    /// Native amount sold, smallest units
    pub sell_amount: String,
    /// Target token amount bought, smallest units
    pub buy_amount: String,
}

impl SwapQuote {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn buy_amount_raw(&self) -> U256 {
        parse_u256_lenient(&self.buy_amount)
    }

    pub fn sell_amount_raw(&self) -> U256 {
        parse_u256_lenient(&self.sell_amount)
    }

    pub fn total_required_raw(&self) -> U256 {
        parse_u256_lenient(&self.total_required_wei)
    }
}

// ============================================
// Ledger records
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Manual,
    Auto,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Manual => "manual",
            OrderType::Auto => "auto",
        }
    }
}

/// Persisted order. Field names are the storage contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_wallet_address: String,
    pub token_id: String,
    pub token_name: String,
    pub token_symbol: String,
    pub usd_amount_to_spend: f64,
    pub token_amount: f64,
    pub recipient_address: String,
    pub bnb_amount: f64,
    pub bnb_price: f64,
    pub payment_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_payment_hash: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub treasury_flat_fee_usd: f64,
    pub dev_fee_usd: f64,
    pub treasury_token_fee_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Send,
    Receive,
    Generate,
    VendorPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
}

/// User-facing ledger entry, written once per attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: f64,
    pub token: String,
    pub hash: String,
    pub status: TxStatus,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        user_id: &str,
        tx_type: TxType,
        amount: f64,
        token: &str,
        hash: &str,
        status: TxStatus,
        recipient: &str,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            tx_type,
            amount,
            token: token.to_string(),
            hash: hash.to_string(),
            status,
            recipient: recipient.to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================
// Execution outcome
// ============================================

/// Per-attempt lifecycle. `Aborted` is reachable only before the swap
/// confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStage {
    Pending,
    SwapSubmitted,
    SwapConfirmed,
    FeesSettling,
    Persisted,
    Aborted,
}

/// Fee transfers attempted after the value-carrying transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeLeg {
    TreasuryToken,
    TreasuryNative,
    OperatorNative,
}

impl FeeLeg {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeLeg::TreasuryToken => "treasury_token",
            FeeLeg::TreasuryNative => "treasury_native",
            FeeLeg::OperatorNative => "operator_native",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LegOutcome {
    Settled {
        #[serde(rename = "txHash")]
        tx_hash: String,
        /// Smallest units transferred
        amount: String,
    },
    Skipped {
        reason: String,
    },
    Failed {
        code: String,
        message: String,
    },
}

impl LegOutcome {
    pub fn failed(err: &AppError) -> Self {
        LegOutcome::Failed {
            code: err.code_str().to_string(),
            message: err.message.clone(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        LegOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LegOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLegReport {
    pub leg: FeeLeg,
    #[serde(flatten)]
    pub outcome: LegOutcome,
}

/// Structured account of what happened after the fatal checks passed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub stage: ExecutionStage,
    pub legs: Vec<FeeLegReport>,
    /// Smallest units actually received by the recipient, when measured
    pub realized_amount: Option<String>,
    pub persisted: bool,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self {
            stage: ExecutionStage::Pending,
            legs: Vec::new(),
            realized_amount: None,
            persisted: false,
        }
    }

    pub fn record(&mut self, leg: FeeLeg, outcome: LegOutcome) {
        self.legs.push(FeeLegReport { leg, outcome });
    }

    pub fn leg(&self, leg: FeeLeg) -> Option<&LegOutcome> {
        self.legs.iter().find(|r| r.leg == leg).map(|r| &r.outcome)
    }

    /// No leg failed and the records were written
    pub fn is_clean(&self) -> bool {
        self.persisted && !self.legs.iter().any(|r| r.outcome.is_failed())
    }
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Result returned to the caller of execute / submit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub report: ExecutionReport,
}

impl ExecutionResult {
    pub fn succeeded(message: impl Into<String>, tx_hash: String, report: ExecutionReport) -> Self {
        Self {
            success: true,
            message: message.into(),
            tx_hash: Some(tx_hash),
            error: None,
            report,
        }
    }

    pub fn failed(err: &AppError, mut report: ExecutionReport) -> Self {
        report.stage = ExecutionStage::Aborted;
        Self {
            success: false,
            message: err.message.clone(),
            tx_hash: None,
            error: Some(err.body()),
            report,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_tx_accepts_numeric_gas() {
        let json = r#"{
            "from": "0x1",
            "to": "0x2",
            "data": "0x",
            "value": "166700000000000000",
            "gas": 200000,
            "gasPrice": "5000000000"
        }"#;
        let tx: AggregatorTx = serde_json::from_str(json).unwrap();
        assert_eq!(tx.gas, "200000");
        assert_eq!(
            tx.swap_cost_wei(),
            U256::from(166_700_000_000_000_000u128 + 1_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_order_record_wire_names() {
        let order = OrderRecord {
            id: "o1".into(),
            user_id: "u1".into(),
            user_email: "a@b.c".into(),
            user_wallet_address: "0xabc".into(),
            token_id: "t".into(),
            token_name: "Token".into(),
            token_symbol: "TKN".into(),
            usd_amount_to_spend: 100.0,
            token_amount: 250.0,
            recipient_address: "0xdef".into(),
            bnb_amount: 0.1667,
            bnb_price: 600.0,
            payment_hash: "0x01".into(),
            dev_payment_hash: None,
            status: OrderStatus::Completed,
            order_type: OrderType::Auto,
            created_at: Utc::now(),
            completed_at: None,
            treasury_flat_fee_usd: 1.0,
            dev_fee_usd: 0.0,
            treasury_token_fee_percent: 2.5,
        };
        let value = serde_json::to_value(&order).unwrap();
        for key in [
            "userId",
            "userEmail",
            "userWalletAddress",
            "tokenId",
            "tokenName",
            "tokenSymbol",
            "usdAmountToSpend",
            "tokenAmount",
            "recipientAddress",
            "bnbAmount",
            "bnbPrice",
            "paymentHash",
            "status",
            "type",
            "createdAt",
            "completedAt",
            "treasuryFlatFeeUsd",
            "devFeeUsd",
            "treasuryTokenFeePercent",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["status"], "completed");
        assert_eq!(value["type"], "auto");
        assert!(value.get("devPaymentHash").is_none());
    }

    #[test]
    fn test_transaction_record_wire_names() {
        let record = TransactionRecord::new(
            "u1",
            TxType::VendorPayment,
            10.0,
            "TKN",
            "0x01",
            TxStatus::Success,
            "0xdef",
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "vendor_payment");
        assert_eq!(value["status"], "success");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_report_cleanliness() {
        let mut report = ExecutionReport::new();
        report.record(FeeLeg::TreasuryNative, LegOutcome::skipped("no fee"));
        report.persisted = true;
        assert!(report.is_clean());

        report.record(
            FeeLeg::OperatorNative,
            LegOutcome::failed(&AppError::fee_leg_failed("boom")),
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_token_id_fallback() {
        let token = TokenDetails {
            id: None,
            name: "T".into(),
            symbol: "T".into(),
            decimals: 18,
            contract_address: Some(" 0xabc ".into()),
            price: None,
        };
        assert_eq!(token.contract(), Some("0xabc"));
        assert_eq!(token.token_id(), "0xabc");
    }
}
