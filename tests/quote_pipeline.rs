//! Quote Builder against in-memory chain, aggregator and price feed

mod common;

use alloy_primitives::U256;
use chrono::Utc;
use std::sync::Arc;

use common::*;
use flashgen::core::quote::QuoteBuilder;
use flashgen::core::quote_book::QuoteBook;
use flashgen::utils::constants::NATIVE_TOKEN_SENTINEL;
use flashgen::{ErrorCode, FlashConfig};

const TOTAL_WEI: u128 = 170_200_000_000_000_000;

fn builder(
    config: Arc<FlashConfig>,
    price: f64,
    chain: &Arc<MockChain>,
    aggregator: &Arc<MockAggregator>,
) -> QuoteBuilder {
    QuoteBuilder::new(
        config,
        oracle(price),
        aggregator.clone(),
        chain.clone(),
        Arc::new(QuoteBook::new()),
    )
}

#[tokio::test]
async fn test_quote_totals_and_fees() {
    let chain = MockChain::new();
    chain.set_native(U256::from(1_000_000_000_000_000_000u128));
    let aggregator = MockAggregator::new(sample_swap());
    let quotes = builder(config(&[]), 600.0, &chain, &aggregator);

    let quote = quotes.build_quote("u1", USER, &token(), 100.0).await.unwrap();

    // value + gas × gasPrice + ($1 + $0.5) / 600
    assert_eq!(quote.total_required_raw(), U256::from(TOTAL_WEI));
    assert!((quote.estimated_bnb_required - 0.1702).abs() < 1e-12);
    assert_eq!(quote.estimated_tokens_received, 250.0);
    assert_eq!(quote.treasury_flat_fee_usd, 1.0);
    assert_eq!(quote.dev_fee_usd, 0.5);
    assert_eq!(quote.treasury_token_fee_percent, 2.5);
    assert_eq!(quote.estimated_usd_cost, 101.5);
    assert_eq!(quote.sell_amount, "166700000000000000");
    assert_eq!(quote.buy_amount, "250000000000000000000");
    assert_eq!(quote.native_price_usd, 600.0);
    assert!(quote.can_afford);
    assert_eq!(quote.user_native_balance, 1.0);
    // wrapped balance read failed, shown as zero
    assert_eq!(quote.user_wrapped_balance, 0.0);

    let requests = aggregator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].src, NATIVE_TOKEN_SENTINEL);
    assert_eq!(requests[0].dst, addr(TOKEN));
    assert_eq!(requests[0].from, addr(USER));
    // 100 / 600 rounded to 8 decimals
    assert_eq!(requests[0].amount, U256::from(166_666_670_000_000_000u128));
}

#[tokio::test]
async fn test_can_afford_boundary() {
    let aggregator = MockAggregator::new(sample_swap());

    let chain = MockChain::new();
    chain.set_native(U256::from(TOTAL_WEI));
    let quote = builder(config(&[]), 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap();
    assert!(quote.can_afford);

    let chain = MockChain::new();
    chain.set_native(U256::from(TOTAL_WEI - 1));
    let quote = builder(config(&[]), 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap();
    assert!(!quote.can_afford);
}

#[tokio::test]
async fn test_quote_expires_after_validity_window() {
    let chain = MockChain::new();
    let aggregator = MockAggregator::new(sample_swap());
    let before = Utc::now();
    let quote = builder(config(&[]), 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap();

    let window = (quote.expiry - before).num_milliseconds();
    assert!((29_000..=31_000).contains(&window), "window was {}ms", window);
    assert!(!quote.is_expired());
    assert!(quote.is_expired_at(quote.expiry + chrono::Duration::milliseconds(1)));
}

#[tokio::test]
async fn test_missing_api_key_fails_before_network() {
    let chain = MockChain::new();
    let aggregator = MockAggregator::new(sample_swap());
    let config = config(&[("ONE_INCH_API_KEY", "")]);

    let err = builder(config, 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissing);
    assert!(aggregator.requests().is_empty());
}

#[tokio::test]
async fn test_bad_input_rejected() {
    let chain = MockChain::new();
    let aggregator = MockAggregator::new(sample_swap());
    let quotes = builder(config(&[]), 600.0, &chain, &aggregator);

    let err = quotes.build_quote("u1", "", &token(), 100.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadInput);
    assert!(quotes.quote_book().is_empty());

    let err = quotes.build_quote("u1", USER, &token(), 0.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadInput);

    let mut no_contract = token();
    no_contract.contract_address = None;
    let err = quotes.build_quote("u1", USER, &no_contract, 10.0).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadInput);

    assert!(aggregator.requests().is_empty());
}

#[tokio::test]
async fn test_price_unavailable() {
    let chain = MockChain::new();
    let aggregator = MockAggregator::new(sample_swap());

    let err = builder(config(&[]), 0.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PriceUnavailable);
    assert!(aggregator.requests().is_empty());
}

#[tokio::test]
async fn test_aggregator_message_propagates() {
    let chain = MockChain::new();
    let aggregator = MockAggregator::failing("insufficient liquidity");

    let err = builder(config(&[]), 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AggregatorError);
    assert!(err.message.contains("insufficient liquidity"));
}

#[tokio::test]
async fn test_operator_fee_zero_when_unconfigured() {
    let chain = MockChain::new();
    chain.set_native(U256::from(TOTAL_WEI));
    let aggregator = MockAggregator::new(sample_swap());
    let config = config(&[("DEV_WALLET", "")]);

    let quote = builder(config, 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap();
    assert_eq!(quote.dev_fee_usd, 0.0);
    // only the $1 treasury fee on top of the swap
    assert_eq!(
        quote.total_required_raw(),
        U256::from(167_700_000_000_000_000u128 + 1_666_670_000_000_000u128)
    );
}

#[tokio::test]
async fn test_to_token_amount_preferred_for_buy_amount() {
    let chain = MockChain::new();
    let mut swap = sample_swap();
    swap.to_token_amount = Some(U256::from(249_000_000_000_000_000_000u128));
    let aggregator = MockAggregator::new(swap);

    let quote = builder(config(&[]), 600.0, &chain, &aggregator)
        .build_quote("u1", USER, &token(), 100.0)
        .await
        .unwrap();
    assert_eq!(quote.buy_amount, "249000000000000000000");
    assert_eq!(quote.estimated_tokens_received, 250.0);
}

#[tokio::test]
async fn test_quote_is_issued_to_requesting_user() {
    let chain = MockChain::new();
    chain.set_native(U256::from(TOTAL_WEI));
    let aggregator = MockAggregator::new(sample_swap());
    let quotes = builder(config(&[]), 600.0, &chain, &aggregator);

    let first = quotes.build_quote("u1", USER, &token(), 100.0).await.unwrap();
    let second = quotes.build_quote("u1", USER, &token(), 100.0).await.unwrap();
    assert!(!first.quote_id.is_empty());
    assert_ne!(first.quote_id, second.quote_id);
    assert_eq!(quotes.quote_book().len(), 2);

    let issued = quotes.quote_book().take(&first.quote_id, "u1").unwrap();
    assert_eq!(issued.user_id, "u1");
    assert_eq!(issued.token, addr(TOKEN));
    assert_eq!(issued.quote, first);
}

#[tokio::test]
async fn test_failed_quote_is_not_issued() {
    let chain = MockChain::new();
    let aggregator = MockAggregator::failing("insufficient liquidity");
    let quotes = builder(config(&[]), 600.0, &chain, &aggregator);

    assert!(quotes.build_quote("u1", USER, &token(), 100.0).await.is_err());
    assert!(quotes.quote_book().is_empty());
}
