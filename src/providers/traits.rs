//! Provider seams
//!
//! Everything the pipeline needs from the outside world sits behind one of
//! these traits, so the core modules can be driven by in-memory fakes.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use eyre::Result;
use serde::Serialize;

use crate::models::types::{AggregatorTx, OrderRecord, TransactionRecord};

/// Unsigned EVM transaction as the pipeline sees it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
}

impl TxRequest {
    /// Plain native transfer
    pub fn native(from: Address, to: Address, value: U256) -> Self {
        Self {
            from,
            to,
            value,
            ..Default::default()
        }
    }

    /// Contract call with calldata
    pub fn call(from: Address, to: Address, data: Bytes) -> Self {
        Self {
            from,
            to,
            data,
            ..Default::default()
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Mined transaction status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

/// Holds a user's key and signs on their behalf
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign a fully populated request and return the raw EIP-2718 bytes
    async fn sign(&self, tx: &TxRequest, chain_id: u64) -> Result<Bytes>;
}

/// Looks up the signing identity for a user
pub trait SignerSource: Send + Sync {
    fn signer_for(&self, user_id: &str) -> Option<Arc<dyn TransactionSigner>>;
}

/// Chain reads and writes
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn native_balance(&self, owner: Address) -> Result<U256>;

    /// ERC-20 `balanceOf`
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    /// Fill nonce and gas price when absent, sign, broadcast
    async fn send_transaction(&self, signer: &dyn TransactionSigner, tx: TxRequest) -> Result<B256>;

    /// Block until the transaction is mined or the receipt timeout elapses
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt>;
}

/// Aggregator swap request: sell `amount` of `src` for `dst`
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub src: Address,
    pub dst: Address,
    pub amount: U256,
    pub from: Address,
    pub slippage_percent: f64,
}

/// Aggregator answer with a ready-to-sign transaction
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSwap {
    pub tx: AggregatorTx,
    /// Expected output, smallest units of `dst`
    pub dst_amount: U256,
    /// Some aggregator versions report this instead of `dst_amount`
    pub to_token_amount: Option<U256>,
}

impl AggregatorSwap {
    /// Amount bought; prefers `to_token_amount` when reported
    pub fn buy_amount(&self) -> U256 {
        self.to_token_amount
            .filter(|a| !a.is_zero())
            .unwrap_or(self.dst_amount)
    }
}

#[async_trait]
pub trait SwapAggregator: Send + Sync {
    async fn swap_quote(&self, request: &SwapRequest) -> Result<AggregatorSwap>;
}

/// One independent USD price feed for the native coin
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Non-positive or absent prices are reported as errors
    async fn fetch_usd(&self) -> Result<f64>;
}

/// Append-only store for orders and user transaction records
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append_order(&self, order: &OrderRecord) -> Result<()>;

    async fn append_transaction(&self, record: &TransactionRecord) -> Result<()>;
}
