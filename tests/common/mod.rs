//! In-memory fakes shared by the pipeline tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use chrono::Utc;
use eyre::{eyre, Result};

use flashgen::core::oracle::{CachedPriceOracle, PriceOracle};
use flashgen::models::types::AggregatorTx;
use flashgen::providers::traits::{
    AggregatorSwap, ChainClient, PriceSource, SwapAggregator, SwapRequest, TransactionSigner,
    TxReceipt, TxRequest,
};
use flashgen::{FlashConfig, SwapQuote, TokenDetails};

pub const TREASURY: &str = "0x1111111111111111111111111111111111111abc";
pub const OPERATOR: &str = "0x2222222222222222222222222222222222222def";
pub const TOKEN: &str = "0x3333333333333333333333333333333333333333";
pub const ROUTER: &str = "0x4444444444444444444444444444444444444444";
pub const USER: &str = "0x5555555555555555555555555555555555555555";

pub const GAS_ESTIMATE: u64 = 100_000;

pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

// ============================================
// Chain
// ============================================

#[derive(Default)]
pub struct MockChain {
    native: Mutex<U256>,
    /// Per-token balance reads, consumed front to back; the last one sticks
    token_balances: Mutex<HashMap<Address, VecDeque<U256>>>,
    fail_sends_to: Mutex<HashSet<Address>>,
    revert_sends_to: Mutex<HashSet<Address>>,
    sent: Mutex<Vec<TxRequest>>,
    destinations: Mutex<HashMap<B256, Address>>,
    nonce: AtomicU64,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_native(&self, wei: U256) {
        *self.native.lock().unwrap() = wei;
    }

    pub fn push_token_balance(&self, token: Address, amount: U256) {
        self.token_balances
            .lock()
            .unwrap()
            .entry(token)
            .or_default()
            .push_back(amount);
    }

    pub fn fail_sends_to(&self, to: Address) {
        self.fail_sends_to.lock().unwrap().insert(to);
    }

    pub fn revert_sends_to(&self, to: Address) {
        self.revert_sends_to.lock().unwrap().insert(to);
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: Address) -> Vec<TxRequest> {
        self.sent().into_iter().filter(|tx| tx.to == to).collect()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        56
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256> {
        Ok(*self.native.lock().unwrap())
    }

    async fn token_balance(&self, token: Address, _owner: Address) -> Result<U256> {
        let mut balances = self.token_balances.lock().unwrap();
        let queue = balances
            .get_mut(&token)
            .ok_or_else(|| eyre!("balanceOf reverted"))?;
        match queue.len() {
            0 => Err(eyre!("balanceOf reverted")),
            1 => Ok(queue[0]),
            _ => Ok(queue.pop_front().unwrap_or_default()),
        }
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64> {
        Ok(GAS_ESTIMATE)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(3_000_000_000)
    }

    async fn send_transaction(&self, _signer: &dyn TransactionSigner, tx: TxRequest) -> Result<B256> {
        if self.fail_sends_to.lock().unwrap().contains(&tx.to) {
            return Err(eyre!("insufficient funds for gas"));
        }
        let n = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = B256::left_padding_from(&n.to_be_bytes());
        self.destinations.lock().unwrap().insert(hash, tx.to);
        self.sent.lock().unwrap().push(tx);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let to = self
            .destinations
            .lock()
            .unwrap()
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| eyre!("unknown transaction"))?;
        let success = !self.revert_sends_to.lock().unwrap().contains(&to);
        Ok(TxReceipt {
            tx_hash,
            success,
            block_number: Some(1),
            gas_used: Some(GAS_ESTIMATE),
        })
    }
}

// ============================================
// Signer
// ============================================

pub struct MockSigner {
    address: Address,
}

impl MockSigner {
    pub fn new() -> Arc<dyn TransactionSigner> {
        Arc::new(Self { address: addr(USER) })
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, _tx: &TxRequest, _chain_id: u64) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}

// ============================================
// Aggregator
// ============================================

pub struct MockAggregator {
    response: Mutex<Result<AggregatorSwap, String>>,
    requests: Mutex<Vec<SwapRequest>>,
}

impl MockAggregator {
    pub fn new(swap: AggregatorSwap) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(swap)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(message.to_string())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<SwapRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapAggregator for MockAggregator {
    async fn swap_quote(&self, request: &SwapRequest) -> Result<AggregatorSwap> {
        self.requests.lock().unwrap().push(request.clone());
        self.response.lock().unwrap().clone().map_err(|e| eyre!(e))
    }
}

/// 166.7e15 wei value, 200k gas at 5 gwei, 250 tokens out
pub fn sample_swap() -> AggregatorSwap {
    AggregatorSwap {
        tx: sample_tx(),
        dst_amount: U256::from(250_000_000_000_000_000_000u128),
        to_token_amount: None,
    }
}

pub fn sample_tx() -> AggregatorTx {
    AggregatorTx {
        from: USER.to_string(),
        to: ROUTER.to_string(),
        data: "0x12345678".to_string(),
        value: "166700000000000000".to_string(),
        gas: "200000".to_string(),
        gas_price: "5000000000".to_string(),
    }
}

// ============================================
// Price
// ============================================

pub struct FixedPrice(pub f64);

#[async_trait]
impl PriceSource for FixedPrice {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch_usd(&self) -> Result<f64> {
        if self.0 > 0.0 {
            Ok(self.0)
        } else {
            Err(eyre!("no price"))
        }
    }
}

pub fn oracle(price: f64) -> Arc<CachedPriceOracle> {
    let sources: Vec<Arc<dyn PriceSource>> = vec![Arc::new(FixedPrice(price))];
    Arc::new(CachedPriceOracle::new(
        PriceOracle::new(sources),
        std::time::Duration::from_secs(60),
    ))
}

// ============================================
// Config & fixtures
// ============================================

/// Verified treasury and operator, 1inch key set, plus `overrides`
pub fn config(overrides: &[(&str, &str)]) -> Arc<FlashConfig> {
    let mut vars: HashMap<String, String> = [
        ("ONE_INCH_API_KEY", "test-key"),
        ("TREASURY_WALLET", TREASURY),
        ("TREASURY_WALLET_LAST_DIGITS", "abc"),
        ("DEV_WALLET", OPERATOR),
        ("DEV_WALLET_LAST_DIGITS", "def"),
        ("DEV_AUTO_FEE_USD", "0.5"),
        ("TREASURY_TOKEN_FEE_PERCENT", "2.5"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    Arc::new(FlashConfig::from_vars(&vars).unwrap())
}

pub fn token() -> TokenDetails {
    TokenDetails {
        id: Some("catalog-7".to_string()),
        name: "Flash Token".to_string(),
        symbol: "FLT".to_string(),
        decimals: 18,
        contract_address: Some(TOKEN.to_string()),
        price: None,
    }
}

/// Affordable quote for $100 at $600, valid for 30 s
pub fn sample_quote() -> SwapQuote {
    SwapQuote {
        quote_id: "quote-1".to_string(),
        usd_amount_to_spend: 100.0,
        token_symbol: "FLT".to_string(),
        recipient_address: USER.to_string(),
        estimated_bnb_required: 0.1702,
        total_required_wei: "170200000000000000".to_string(),
        estimated_usd_cost: 101.5,
        estimated_tokens_received: 250.0,
        treasury_flat_fee_usd: 1.0,
        dev_fee_usd: 0.5,
        treasury_token_fee_percent: 2.5,
        can_afford: true,
        user_native_balance: 1.0,
        user_wrapped_balance: 0.0,
        native_price_usd: 600.0,
        expiry: Utc::now() + chrono::Duration::seconds(30),
        tx: sample_tx(),
        sell_amount: "166700000000000000".to_string(),
        buy_amount: "250000000000000000000".to_string(),
    }
}
