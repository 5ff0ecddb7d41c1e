//! RPC Client Module - Multi-endpoint JSON-RPC with failover
//!
//! 1. Ordered endpoint list (configured first, public dataseeds after)
//! 2. Rotation on rate-limit / bad-data / transport errors, retried once per call
//! 3. Jittered delay before the retry to avoid hammering the next node
//! 4. User-Agent header & key masking in logs
//!
//! Rotation never mutates shared state: `rotate()` returns a new client
//! bound to the next endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::providers::traits::{ChainClient, TransactionSigner, TxReceipt, TxRequest};
use crate::utils::constants::{
    DEFAULT_RECEIPT_TIMEOUT_SECS, DEFAULT_RPC_TIMEOUT_SECS, RECEIPT_POLL_INTERVAL_MS,
    USER_AGENT as USER_AGENT_CONST,
};
use crate::utils::units::{parse_hex_u256, parse_hex_u64};

sol! {
    function balanceOf(address account) external view returns (uint256);
    function transfer(address to, uint256 amount) external returns (bool);
}

/// Base delay before retrying on the next endpoint (milliseconds)
pub const ROTATE_BASE_DELAY_MS: u64 = 300;

/// Jitter percentage for the retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// ERC-20 `transfer(to, amount)` calldata
pub fn encode_erc20_transfer(to: Address, amount: U256) -> Bytes {
    Bytes::from(transferCall { to, amount }.abi_encode())
}

/// ERC-20 `balanceOf(account)` calldata
pub fn encode_balance_of(account: Address) -> Bytes {
    Bytes::from(balanceOfCall { account }.abi_encode())
}

/// Why a single call against one endpoint failed
#[derive(Debug)]
enum CallFailure {
    /// Connection, timeout, HTTP 5xx
    Transport(String),
    /// HTTP 429 or JSON-RPC rate-limit code
    RateLimited(String),
    /// Body did not parse as a JSON-RPC response
    BadData(String),
    /// Node answered with a JSON-RPC error
    Rpc(RpcError),
}

impl CallFailure {
    /// Worth retrying on another endpoint
    fn should_rotate(&self) -> bool {
        match self {
            CallFailure::Transport(_) | CallFailure::RateLimited(_) | CallFailure::BadData(_) => true,
            CallFailure::Rpc(err) => err.is_rate_limit(),
        }
    }

    fn into_report(self, method: &str) -> eyre::Report {
        match self {
            CallFailure::Transport(msg) => eyre!("{} failed: {}", method, msg),
            CallFailure::RateLimited(msg) => eyre!("{} rate limited: {}", method, msg),
            CallFailure::BadData(msg) => eyre!("{} returned bad data: {}", method, msg),
            CallFailure::Rpc(err) if err.is_execution_reverted() => {
                eyre!("{} reverted: {}", method, err.message)
            }
            CallFailure::Rpc(err) => {
                eyre!("{} RPC error: {} (code: {})", method, err.message, err.code)
            }
        }
    }
}

/// RPC provider bound to one endpoint of an ordered candidate list
#[derive(Clone)]
pub struct RpcProvider {
    endpoints: Arc<Vec<String>>,
    index: usize,
    client: reqwest::Client,
    chain_id: u64,
    receipt_timeout: Duration,
}

impl RpcProvider {
    pub fn new(endpoints: Vec<String>, chain_id: u64) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(eyre!("No RPC endpoints configured"));
        }

        let provider = Self {
            endpoints: Arc::new(endpoints),
            index: 0,
            client: Self::build_client(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))?,
            chain_id,
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        };
        info!(
            "✅ RPC ready for chain {} ({} endpoints, primary {})",
            chain_id,
            provider.endpoints.len(),
            provider.masked_url()
        );
        Ok(provider)
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Rebuild the HTTP client with a different per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Self::build_client(timeout)?;
        Ok(self)
    }

    fn build_client(timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    pub fn current_url(&self) -> &str {
        &self.endpoints[self.index]
    }

    /// Index of the endpoint this client is bound to
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// New client bound to the next endpoint (wraps around)
    pub fn rotate(&self) -> Self {
        let mut next = self.clone();
        next.index = (self.index + 1) % self.endpoints.len();
        next
    }

    /// URL with any path-embedded key hidden
    pub fn masked_url(&self) -> String {
        mask_url(self.current_url())
    }

    /// JSON-RPC call that must return a non-null result
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| eyre!("{} returned no result", method))
    }

    /// JSON-RPC call where `null` is a valid answer
    pub async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let failure = match self.execute_call::<T>(self.current_url(), &payload).await {
            Ok(result) => return Ok(result),
            Err(failure) => failure,
        };

        if !failure.should_rotate() || self.endpoints.len() < 2 {
            return Err(failure.into_report(method));
        }

        let next = self.rotate();
        let delay = jittered_delay(ROTATE_BASE_DELAY_MS);
        if method == "eth_sendRawTransaction" {
            debug!("🔁 Resending identical signed bytes, tx hash unchanged");
        }
        warn!(
            "🔄 {} failed on {} ({:?}), retrying on {} after {}ms",
            method,
            self.masked_url(),
            failure,
            next.masked_url(),
            delay
        );
        tokio::time::sleep(Duration::from_millis(delay)).await;

        next.execute_call::<T>(next.current_url(), &payload)
            .await
            .map_err(|e| e.into_report(method))
    }

    async fn execute_call<T: DeserializeOwned>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<Option<T>, CallFailure> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| CallFailure::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CallFailure::RateLimited("HTTP 429".to_string()));
        }
        if !status.is_success() {
            return Err(CallFailure::Transport(format!("HTTP error: {}", status)));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| CallFailure::BadData(e.to_string()))?;

        if let Some(error) = json.error {
            if error.is_rate_limit() {
                return Err(CallFailure::RateLimited(error.message));
            }
            return Err(CallFailure::Rpc(error));
        }

        Ok(json.result)
    }

    /// Execute eth_call against latest state
    pub async fn eth_call(&self, to: Address, data: &Bytes) -> Result<Bytes> {
        let params = serde_json::json!([{ "to": to, "data": data }, "latest"]);
        self.call::<Bytes>("eth_call", params).await
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        let params = serde_json::json!([address, "pending"]);
        let hex: String = self.call("eth_getTransactionCount", params).await?;
        parse_hex_u64(&hex)
    }
}

/// Jittered delay (±RETRY_JITTER_PERCENT) around `base_ms`
fn jittered_delay(base_ms: u64) -> u64 {
    let jitter_range = (base_ms * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (base_ms as i64 + jitter).max(50) as u64
}

fn mask_url(url: &str) -> String {
    for marker in ["/v2/", "/v3/"] {
        if let Some((head, _)) = url.split_once(marker) {
            return format!("{}{}***HIDDEN***", head, marker);
        }
    }
    url.to_string()
}

#[async_trait]
impl ChainClient for RpcProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        let hex: String = self
            .call("eth_getBalance", serde_json::json!([owner, "latest"]))
            .await?;
        parse_hex_u256(&hex)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let output = self.eth_call(token, &encode_balance_of(owner)).await?;
        if output.len() < 32 {
            return Err(eyre!("balanceOf returned {} bytes", output.len()));
        }
        Ok(U256::from_be_slice(&output[output.len() - 32..]))
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        let params = serde_json::json!([{
            "from": tx.from,
            "to": tx.to,
            "data": tx.data,
            "value": format!("{:#x}", tx.value),
        }]);
        let hex: String = self.call("eth_estimateGas", params).await?;
        parse_hex_u64(&hex)
    }

    async fn gas_price(&self) -> Result<u128> {
        let hex: String = self.call("eth_gasPrice", serde_json::json!([])).await?;
        let price = parse_hex_u256(&hex)?;
        u128::try_from(price).map_err(|_| eyre!("Gas price out of range: {}", hex))
    }

    async fn send_transaction(&self, signer: &dyn TransactionSigner, mut tx: TxRequest) -> Result<B256> {
        if tx.nonce.is_none() {
            tx.nonce = Some(self.pending_nonce(signer.address()).await?);
        }
        if tx.gas_price.is_none() {
            tx.gas_price = Some(self.gas_price().await?);
        }
        if tx.gas_limit.is_none() {
            tx.gas_limit = Some(self.estimate_gas(&tx).await?);
        }

        let raw = signer.sign(&tx, self.chain_id).await?;
        let raw_hex = format!("0x{}", hex::encode(&raw));
        let hash: B256 = self
            .call("eth_sendRawTransaction", serde_json::json!([raw_hex]))
            .await?;
        debug!("📤 Broadcast {} (nonce {:?})", hash, tx.nonce);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        poll_receipt(
            tx_hash,
            self.receipt_timeout,
            Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
            move || async move {
                let raw: Option<RawReceipt> = self
                    .call_optional("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
                    .await?;
                Ok(raw.map(|r| r.into_receipt(tx_hash)))
            },
        )
        .await
    }
}

/// Poll `fetch` until it yields a receipt. The transaction is already out,
/// so a failed poll is logged and retried; only `timeout` ends the wait.
pub async fn poll_receipt<F, Fut>(
    tx_hash: B256,
    timeout: Duration,
    interval: Duration,
    mut fetch: F,
) -> Result<TxReceipt>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<TxReceipt>>>,
{
    let started = Instant::now();
    let mut failed_polls = 0u32;
    loop {
        match fetch().await {
            Ok(Some(receipt)) => return Ok(receipt),
            Ok(None) => {}
            Err(e) => {
                failed_polls += 1;
                warn!("⚠️ Receipt poll for {} failed ({} so far): {}", tx_hash, failed_polls, e);
            }
        }
        if started.elapsed() >= timeout {
            return Err(eyre!(
                "Timed out after {}s waiting for receipt of {} ({} failed polls)",
                timeout.as_secs(),
                tx_hash,
                failed_polls
            ));
        }
        tokio::time::sleep(interval).await;
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
    gas_used: Option<String>,
}

impl RawReceipt {
    fn into_receipt(self, tx_hash: B256) -> TxReceipt {
        TxReceipt {
            tx_hash,
            success: self.status.as_deref() == Some("0x1"),
            block_number: self.block_number.and_then(|b| parse_hex_u64(&b).ok()),
            gas_used: self.gas_used.and_then(|g| parse_hex_u64(&g).ok()),
        }
    }
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Rate limit (code -32005 or message)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }

    /// Execution reverted during eth_call / eth_estimateGas
    pub fn is_execution_reverted(&self) -> bool {
        self.code == 3 || self.message.to_lowercase().contains("execution reverted")
    }
}
