//! 1inch swap API client
//!
//! GET {base}/swap?fromTokenAddress=..&toTokenAddress=..&amount=..
//!     &fromAddress=..&slippage=..&enableEstimate=true
//! Authorization: Bearer <key>
//!
//! Error bodies carry `statusCode` + `description`; the description is
//! surfaced verbatim.

use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::Deserialize;
use tracing::debug;

use crate::models::types::AggregatorTx;
use crate::providers::traits::{AggregatorSwap, SwapAggregator, SwapRequest};
use crate::utils::constants::{DEFAULT_RPC_TIMEOUT_SECS, USER_AGENT};
use crate::utils::units::parse_u256_lenient;

/// Successful /swap payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    #[serde(default)]
    dst_amount: Option<String>,
    #[serde(default)]
    to_token_amount: Option<String>,
    tx: AggregatorTx,
}

/// Build the /swap URL for a request
pub fn build_swap_url(base_url: &str, request: &SwapRequest) -> String {
    format!(
        "{}/swap?fromTokenAddress={}&toTokenAddress={}&amount={}&fromAddress={}&slippage={}&enableEstimate=true",
        base_url.trim_end_matches('/'),
        request.src,
        request.dst,
        request.amount,
        request.from,
        request.slippage_percent
    )
}

/// Parse a raw /swap response body
pub fn parse_swap_response(status: u16, raw: &str) -> Result<AggregatorSwap> {
    let json: serde_json::Value = serde_json::from_str(raw).map_err(|_| {
        let snippet: String = raw.chars().take(120).collect();
        eyre!("API response {}: {}…", status, snippet)
    })?;

    if let Some(code) = json.get("statusCode").and_then(|c| c.as_u64()) {
        if code != 200 {
            let description = json
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("1inch swap failed");
            return Err(eyre!("{}", description));
        }
    }
    if !(200..300).contains(&status) {
        return Err(eyre!("1inch API error: HTTP {}", status));
    }

    let body: SwapResponse =
        serde_json::from_value(json).map_err(|e| eyre!("Malformed 1inch swap payload: {}", e))?;

    Ok(AggregatorSwap {
        tx: body.tx,
        dst_amount: body
            .dst_amount
            .as_deref()
            .map(parse_u256_lenient)
            .unwrap_or(U256::ZERO),
        to_token_amount: body.to_token_amount.as_deref().map(parse_u256_lenient),
    })
}

pub struct OneInchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OneInchClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SwapAggregator for OneInchClient {
    async fn swap_quote(&self, request: &SwapRequest) -> Result<AggregatorSwap> {
        let url = build_swap_url(&self.base_url, request);
        debug!("🔍 1inch swap: {} -> {} amount {}", request.src, request.dst, request.amount);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| eyre!("1inch request failed: {}", e))?;

        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| eyre!("Failed to read 1inch response: {}", e))?;

        parse_swap_response(status, &raw)
    }
}
