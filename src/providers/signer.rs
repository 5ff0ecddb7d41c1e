//! Local key signing and the per-user keyring
//!
//! Keys never leave this module; callers only see `TransactionSigner`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::{info, warn};

use crate::providers::traits::{SignerSource, TransactionSigner, TxRequest};

/// Signs legacy transactions with an in-memory private key
#[derive(Clone)]
pub struct LocalSigner {
    address: Address,
    wallet: EthereumWallet,
}

impl LocalSigner {
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        Ok(Self {
            address: signer.address(),
            wallet: EthereumWallet::from(signer),
        })
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, tx: &TxRequest, chain_id: u64) -> Result<Bytes> {
        let nonce = tx.nonce.ok_or_else(|| eyre!("Nonce not set"))?;
        let gas_limit = tx.gas_limit.ok_or_else(|| eyre!("Gas limit not set"))?;
        let gas_price = tx.gas_price.ok_or_else(|| eyre!("Gas price not set"))?;

        let request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(tx.to)
            .with_input(tx.data.clone())
            .with_value(tx.value)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .with_chain_id(chain_id);

        let envelope = request
            .build(&self.wallet)
            .await
            .map_err(|e| eyre!("Failed to sign transaction: {}", e))?;

        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

/// In-memory map of user id to signer, loaded from a JSON file
/// of the form `{ "<userId>": "<hex private key>" }`
#[derive(Default)]
pub struct Keyring {
    signers: HashMap<String, Arc<dyn TransactionSigner>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read keyring {}: {}", path.display(), e))?;
        let entries: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| eyre!("Invalid keyring {}: {}", path.display(), e))?;

        let mut keyring = Self::new();
        for (user_id, key) in entries {
            match LocalSigner::from_hex(&key) {
                Ok(signer) => keyring.insert(user_id, Arc::new(signer)),
                Err(e) => warn!("⚠️ Skipping keyring entry for {}: {}", user_id, e),
            }
        }
        info!("🔐 Loaded {} signer(s) from keyring", keyring.len());
        Ok(keyring)
    }

    pub fn insert(&mut self, user_id: impl Into<String>, signer: Arc<dyn TransactionSigner>) {
        self.signers.insert(user_id.into(), signer);
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

impl SignerSource for Keyring {
    fn signer_for(&self, user_id: &str) -> Option<Arc<dyn TransactionSigner>> {
        self.signers.get(user_id).cloned()
    }
}
