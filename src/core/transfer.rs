//! Estimate → buffer → sign → broadcast → receipt
//!
//! Shared by the swap leg, every fee leg and the manual payment. Sends are
//! sequential per signer; callers never run two of these concurrently for
//! the same account.

use alloy_primitives::{Address, B256, U256};
use eyre::{eyre, Result};
use tracing::debug;

use crate::providers::rpc::encode_erc20_transfer;
use crate::providers::traits::{ChainClient, TransactionSigner, TxReceipt, TxRequest};

/// Gas limit with a percentage safety margin on top
pub fn apply_gas_buffer(estimate: u64, buffer_percent: u64) -> u64 {
    estimate.saturating_mul(100 + buffer_percent) / 100
}

/// Live-estimate gas, add the buffer, sign and broadcast
pub async fn broadcast(
    chain: &dyn ChainClient,
    signer: &dyn TransactionSigner,
    mut tx: TxRequest,
    buffer_percent: u64,
) -> Result<B256> {
    tx.from = signer.address();
    let estimate = chain.estimate_gas(&tx).await?;
    let gas_limit = apply_gas_buffer(estimate, buffer_percent);
    debug!("⛽ Gas estimate {} → limit {} (+{}%)", estimate, gas_limit, buffer_percent);

    chain
        .send_transaction(signer, tx.with_gas_limit(gas_limit))
        .await
}

/// Broadcast and wait; a failed receipt status is an error
pub async fn send_and_confirm(
    chain: &dyn ChainClient,
    signer: &dyn TransactionSigner,
    tx: TxRequest,
    buffer_percent: u64,
) -> Result<TxReceipt> {
    let hash = broadcast(chain, signer, tx, buffer_percent).await?;
    let receipt = chain.wait_for_receipt(hash).await?;
    if !receipt.success {
        return Err(eyre!("Transaction {} reverted", hash));
    }
    Ok(receipt)
}

/// Native coin transfer, confirmed
pub async fn transfer_native(
    chain: &dyn ChainClient,
    signer: &dyn TransactionSigner,
    to: Address,
    amount: U256,
    buffer_percent: u64,
) -> Result<TxReceipt> {
    let tx = TxRequest::native(signer.address(), to, amount);
    send_and_confirm(chain, signer, tx, buffer_percent).await
}

/// ERC-20 transfer, confirmed
pub async fn transfer_token(
    chain: &dyn ChainClient,
    signer: &dyn TransactionSigner,
    token: Address,
    to: Address,
    amount: U256,
    buffer_percent: u64,
) -> Result<TxReceipt> {
    let tx = TxRequest::call(signer.address(), token, encode_erc20_transfer(to, amount));
    send_and_confirm(chain, signer, tx, buffer_percent).await
}
