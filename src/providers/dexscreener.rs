//! DexScreener API Client
//!
//! Used as an on-chain reference price: the USD price of the native coin
//! read from a deep wrapped-native/stablecoin pair.
//!
//! API: https://api.dexscreener.com/latest/dex/pairs/{chain}/{pairAddress}
//! Free, no API key required

use std::time::Duration;

use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::Deserialize;
use tracing::debug;

use crate::providers::traits::PriceSource;
use crate::utils::constants::{DEFAULT_RPC_TIMEOUT_SECS, DEXSCREENER_API_URL};

/// DexScreener pair endpoint response
#[derive(Debug, Deserialize)]
pub struct DexScreenerPairResponse {
    #[serde(default)]
    pub pair: Option<DexPair>,
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// A trading pair from DexScreener
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    /// Chain slug (e.g., "bsc")
    pub chain_id: String,
    /// DEX identifier (e.g., "pancakeswap")
    pub dex_id: String,
    pub pair_address: String,
    pub base_token: DexToken,
    pub quote_token: DexToken,
    pub liquidity: Option<DexLiquidity>,
    /// Price of the base token in USD
    pub price_usd: Option<String>,
}

impl DexPair {
    /// Parsed positive USD price, if any
    pub fn usd_price(&self) -> Option<f64> {
        self.price_usd
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexLiquidity {
    pub usd: Option<f64>,
}

/// Extract the price from a pair response; `pair` wins over `pairs[0]`
pub fn parse_pair_price(response: &DexScreenerPairResponse) -> Result<f64> {
    let pair = response
        .pair
        .as_ref()
        .or_else(|| response.pairs.as_ref().and_then(|p| p.first()))
        .ok_or_else(|| eyre!("Invalid DexScreener response format"))?;

    pair.usd_price()
        .ok_or_else(|| eyre!("DexScreener pair {} has no USD price", pair.pair_address))
}

/// DexScreener API client
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
    chain: String,
    pair_address: String,
}

impl DexScreenerClient {
    pub fn new(chain: impl Into<String>, pair_address: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEXSCREENER_API_URL.to_string(),
            chain: chain.into(),
            pair_address: pair_address.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch one pair by chain and address
    pub async fn get_pair(&self) -> Result<DexScreenerPairResponse> {
        let url = format!("{}/pairs/{}/{}", self.base_url, self.chain, self.pair_address);
        debug!("🔍 DexScreener: Fetching pair {}", self.pair_address);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| eyre!("DexScreener request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(eyre!("DexScreener API error: {}", response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse DexScreener response: {}", e))
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    fn name(&self) -> &str {
        "DexScreener"
    }

    async fn fetch_usd(&self) -> Result<f64> {
        let response = self.get_pair().await?;
        parse_pair_price(&response)
    }
}
