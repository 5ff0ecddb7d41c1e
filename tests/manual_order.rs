//! Manual-Order Path: treasury payment, operator fee, pending order

mod common;

use alloy_primitives::U256;
use std::sync::Arc;

use common::*;
use flashgen::core::manual::{ManualOrderRequest, ManualOrderService, MANUAL_SUCCESS_MESSAGE};
use flashgen::models::types::{OrderStatus, OrderType, TxStatus, TxType};
use flashgen::providers::ledger::MemoryLedger;
use flashgen::{FeeLeg, FlashConfig, FlowTelemetry, LegOutcome};

const ONE_BNB: u128 = 1_000_000_000_000_000_000;

struct Harness {
    chain: Arc<MockChain>,
    ledger: Arc<MemoryLedger>,
    telemetry: Arc<FlowTelemetry>,
    service: ManualOrderService,
}

fn harness(config: Arc<FlashConfig>, price: f64) -> Harness {
    let chain = MockChain::new();
    chain.set_native(U256::from(ONE_BNB));
    let ledger = Arc::new(MemoryLedger::new());
    let telemetry = Arc::new(FlowTelemetry::new());
    let service = ManualOrderService::new(
        config,
        oracle(price),
        chain.clone(),
        ledger.clone(),
        telemetry.clone(),
    );
    Harness {
        chain,
        ledger,
        telemetry,
        service,
    }
}

/// $2 treasury fee and $1 operator fee on manual orders
fn manual_config(overrides: &[(&str, &str)]) -> Arc<FlashConfig> {
    let mut vars = vec![("TREASURY_FLAT_FEE_USD", "2"), ("DEV_FEE_USD", "1")];
    vars.extend_from_slice(overrides);
    config(&vars)
}

fn request() -> ManualOrderRequest {
    ManualOrderRequest {
        user_id: "u1".to_string(),
        user_email: "u1@example.com".to_string(),
        user_wallet: USER.to_string(),
        token: token(),
        usd_to_spend: 100.0,
        recipient: "TRX:TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE".to_string(),
    }
}

#[tokio::test]
async fn test_manual_order_happy_path() {
    let h = harness(manual_config(&[]), 600.0);

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.message, MANUAL_SUCCESS_MESSAGE);

    let sent = h.chain.sent();
    assert_eq!(sent.len(), 2);
    // (100 + 2) / 600
    assert_eq!(sent[0].to, addr(TREASURY));
    assert_eq!(sent[0].value, U256::from(170_000_000_000_000_000u128));
    // 1 / 600
    assert_eq!(sent[1].to, addr(OPERATOR));
    assert_eq!(sent[1].value, U256::from(1_666_670_000_000_000u128));

    let orders = h.ledger.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.order_type, OrderType::Manual);
    assert_eq!(order.token_amount, 0.0);
    assert_eq!(order.token_id, "catalog-7");
    assert_eq!(order.recipient_address, request().recipient);
    assert!((order.bnb_amount - 0.17166667).abs() < 1e-12);
    assert_eq!(order.bnb_price, 600.0);
    assert_eq!(order.treasury_flat_fee_usd, 2.0);
    assert_eq!(order.dev_fee_usd, 1.0);
    assert_eq!(order.payment_hash, result.tx_hash.clone().unwrap());
    assert!(order.dev_payment_hash.is_some());
    assert!(order.completed_at.is_none());

    let records = h.ledger.transactions();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tx_type, TxType::VendorPayment);
    assert_eq!(records[0].status, TxStatus::Success);
    assert_eq!(records[0].amount, 100.0);

    assert_eq!(h.telemetry.get_stats().manual_orders_submitted, 1);
}

#[tokio::test]
async fn test_treasury_unconfigured_sends_nothing() {
    let h = harness(manual_config(&[("TREASURY_WALLET", "")]), 600.0);

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("CONFIG_MISSING"));
    assert!(h.chain.sent().is_empty());
    assert!(h.ledger.orders().is_empty());
}

#[tokio::test]
async fn test_zero_treasury_sends_nothing() {
    let h = harness(
        manual_config(&[
            ("TREASURY_WALLET", "0x0000000000000000000000000000000000000000"),
            ("TREASURY_WALLET_LAST_DIGITS", "000"),
        ]),
        600.0,
    );

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("CONFIG_MISSING"));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_treasury_suffix_mismatch_sends_nothing() {
    let h = harness(manual_config(&[("TREASURY_WALLET_LAST_DIGITS", "999")]), 600.0);

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("ADDRESS_SUFFIX_MISMATCH"));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_operator_suffix_mismatch_sends_nothing() {
    let h = harness(manual_config(&[("DEV_WALLET_LAST_DIGITS", "999")]), 600.0);

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("ADDRESS_SUFFIX_MISMATCH"));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_insufficient_balance_checked_upfront() {
    let h = harness(manual_config(&[]), 600.0);
    // covers the treasury payment but not the operator fee
    h.chain.set_native(U256::from(170_000_000_000_000_000u128));

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("INSUFFICIENT_BALANCE"));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_price_unavailable() {
    let h = harness(manual_config(&[]), 0.0);

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("PRICE_UNAVAILABLE"));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn test_treasury_payment_failure_is_fatal() {
    let h = harness(manual_config(&[]), 600.0);
    h.chain.fail_sends_to(addr(TREASURY));

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert!(!result.success);
    assert_eq!(result.error_code(), Some("PAYMENT_FAILED"));
    assert!(result
        .message
        .starts_with("Payment to treasury failed for manual order"));
    assert!(h.chain.sent_to(addr(OPERATOR)).is_empty());
    assert!(h.ledger.orders().is_empty());
    assert!(h.ledger.transactions().is_empty());
    assert_eq!(h.telemetry.get_stats().manual_orders_failed, 1);
}

#[tokio::test]
async fn test_operator_fee_failure_is_not_fatal() {
    let h = harness(manual_config(&[]), 600.0);
    h.chain.fail_sends_to(addr(OPERATOR));

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert!(result.success);
    assert!(result.report.leg(FeeLeg::OperatorNative).map(LegOutcome::is_failed).unwrap_or(false));
    let orders = h.ledger.orders();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].dev_payment_hash.is_none());
}

#[tokio::test]
async fn test_operator_unconfigured_pays_treasury_only() {
    let h = harness(manual_config(&[("DEV_WALLET", "")]), 600.0);

    let result = h.service.submit(&request(), Some(&*MockSigner::new())).await;

    assert!(result.success);
    assert_eq!(h.chain.sent().len(), 1);
    let order = &h.ledger.orders()[0];
    assert_eq!(order.dev_fee_usd, 0.0);
    assert!((order.bnb_amount - 0.17).abs() < 1e-12);
}

#[tokio::test]
async fn test_non_positive_amount_rejected() {
    let h = harness(manual_config(&[]), 600.0);
    let mut req = request();
    req.usd_to_spend = -5.0;

    let result = h.service.submit(&req, Some(&*MockSigner::new())).await;

    assert_eq!(result.error_code(), Some("BAD_INPUT"));
    assert!(h.chain.sent().is_empty());
}
