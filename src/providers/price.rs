//! Centralized and exchange price feeds for the native coin
//!
//! Each source maps one public endpoint to a positive USD price. Parsing is
//! kept in free functions so payload handling is testable offline.

use std::time::Duration;

use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use crate::providers::traits::PriceSource;
use crate::utils::constants::{
    BINANCE_TICKER_URL, COINGECKO_API_URL, COINPAPRIKA_TICKER_URL, DEFAULT_RPC_TIMEOUT_SECS,
    USER_AGENT,
};

fn positive(price: f64, source: &str) -> Result<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(eyre!("{} returned no usable price", source))
    }
}

async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str, source: &str) -> Result<T> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| eyre!("{} request failed: {}", source, e))?;

    if !response.status().is_success() {
        return Err(eyre!("{} API error: {}", source, response.status()));
    }

    response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse {} response: {}", source, e))
}

// ============================================
// CoinGecko
// ============================================

/// `{"binancecoin": {"usd": 598.1}}`
pub fn parse_coingecko(body: &HashMap<String, HashMap<String, f64>>, coin_id: &str) -> Result<f64> {
    let price = body
        .get(coin_id)
        .and_then(|quotes| quotes.get("usd"))
        .copied()
        .unwrap_or(0.0);
    positive(price, "CoinGecko")
}

pub struct CoinGeckoSource {
    client: reqwest::Client,
    coin_id: String,
}

impl CoinGeckoSource {
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            coin_id: coin_id.into(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch_usd(&self) -> Result<f64> {
        let url = format!("{}?ids={}&vs_currencies=usd", COINGECKO_API_URL, self.coin_id);
        let body: HashMap<String, HashMap<String, f64>> =
            get_json(&self.client, &url, self.name()).await?;
        parse_coingecko(&body, &self.coin_id)
    }
}

// ============================================
// Binance
// ============================================

#[derive(Debug, Deserialize)]
pub struct BinanceTicker {
    pub symbol: String,
    pub price: String,
}

/// `{"symbol": "BNBUSDT", "price": "598.10000000"}`
pub fn parse_binance(ticker: &BinanceTicker) -> Result<f64> {
    positive(ticker.price.parse().unwrap_or(0.0), "Binance")
}

pub struct BinanceSource {
    client: reqwest::Client,
    symbol: String,
}

impl BinanceSource {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            symbol: symbol.into(),
        }
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn name(&self) -> &str {
        "Binance"
    }

    async fn fetch_usd(&self) -> Result<f64> {
        let url = format!("{}?symbol={}", BINANCE_TICKER_URL, self.symbol);
        let ticker: BinanceTicker = get_json(&self.client, &url, self.name()).await?;
        parse_binance(&ticker)
    }
}

// ============================================
// CoinPaprika
// ============================================

#[derive(Debug, Deserialize)]
pub struct PaprikaTicker {
    #[serde(default)]
    pub quotes: HashMap<String, PaprikaQuote>,
}

#[derive(Debug, Deserialize)]
pub struct PaprikaQuote {
    pub price: Option<f64>,
}

/// `{"quotes": {"USD": {"price": 598.1}}}`
pub fn parse_coinpaprika(ticker: &PaprikaTicker) -> Result<f64> {
    let price = ticker
        .quotes
        .get("USD")
        .and_then(|q| q.price)
        .unwrap_or(0.0);
    positive(price, "CoinPaprika")
}

pub struct CoinPaprikaSource {
    client: reqwest::Client,
    coin_id: String,
}

impl CoinPaprikaSource {
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            coin_id: coin_id.into(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinPaprikaSource {
    fn name(&self) -> &str {
        "CoinPaprika"
    }

    async fn fetch_usd(&self) -> Result<f64> {
        let url = format!("{}/{}", COINPAPRIKA_TICKER_URL, self.coin_id);
        let ticker: PaprikaTicker = get_json(&self.client, &url, self.name()).await?;
        parse_coinpaprika(&ticker)
    }
}
