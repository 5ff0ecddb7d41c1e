//! Configuration module for the flash generation pipeline
//!
//! `FlashConfig` is built once at process start and shared by reference.
//! Defaults come from utils/constants.rs; no other module reads the
//! environment.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    get_native_symbol, get_public_rpc_endpoints, get_wrapped_native, BINANCE_BNB_SYMBOL,
    CHAIN_ID_BSC, COINGECKO_BNB_ID, COINPAPRIKA_BNB_ID, DEFAULT_AUTO_TREASURY_FEE_USD,
    DEFAULT_PRICE_CACHE_TTL_SECS, DEFAULT_QUOTE_VALIDITY_SECS, DEFAULT_RECEIPT_TIMEOUT_SECS,
    DEFAULT_RPC_TIMEOUT_SECS, DEFAULT_SLIPPAGE_PERCENT, DEFAULT_SWAP_GAS_BUFFER_PERCENT,
    DEXSCREENER_BNB_PAIR, ONE_INCH_API_ROOT, WBNB_ADDRESS,
};
use alloy_primitives::Address;

/// Payout wallet plus the suffix it is expected to end with
#[derive(Debug, Clone, Default)]
pub struct PayoutAddress {
    /// Empty when unconfigured
    pub address: String,
    pub expected_suffix: String,
}

impl PayoutAddress {
    pub fn new(address: impl Into<String>, expected_suffix: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
            expected_suffix: expected_suffix.into().trim().to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.address.is_empty()
    }
}

/// Flat USD fees for one order type
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeSchedule {
    pub treasury_usd: f64,
    pub operator_usd: f64,
}

#[derive(Debug, Clone)]
pub struct FeeConfig {
    /// Applied to aggregator-backed (auto) orders
    pub auto: FeeSchedule,
    /// Applied to admin-fulfilled (manual) orders
    pub manual: FeeSchedule,
    /// Proportional fee on delivered tokens, in percent
    pub token_fee_percent: f64,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// API credential; `None` makes every quote fail with ConfigMissing
    pub api_key: Option<String>,
    /// Chain-specific base URL, e.g. https://api.1inch.dev/swap/v6.0/56
    pub base_url: String,
    pub slippage_percent: f64,
}

#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub cache_ttl: Duration,
    pub coingecko_id: String,
    pub binance_symbol: String,
    pub dexscreener_chain: String,
    pub dexscreener_pair: String,
    pub coinpaprika_id: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted `X-API-Key` values; empty list disables the check
    pub api_keys: Vec<String>,
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct FlashConfig {
    pub chain_id: u64,
    pub native_symbol: String,
    pub wrapped_native: Address,
    /// Ordered RPC candidates, preferred first
    pub rpc_endpoints: Vec<String>,
    pub rpc_timeout: Duration,
    pub receipt_timeout: Duration,
    pub aggregator: AggregatorConfig,
    pub treasury: PayoutAddress,
    pub operator: PayoutAddress,
    pub fees: FeeConfig,
    pub price: PriceConfig,
    pub quote_validity: Duration,
    pub swap_gas_buffer_percent: u64,
    pub ledger_dir: PathBuf,
    pub keyring_path: Option<PathBuf>,
    pub server: ServerConfig,
}

impl FlashConfig {
    /// Load from the process environment
    pub fn from_env() -> AppResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build from an explicit key/value map
    pub fn from_vars(vars: &HashMap<String, String>) -> AppResult<Self> {
        let get = |key: &str| -> Option<String> {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let chain_id = parse_or(vars, "CHAIN_ID", CHAIN_ID_BSC)?;

        let mut rpc_endpoints: Vec<String> = Vec::new();
        if let Some(url) = get("BSC_RPC_URL") {
            rpc_endpoints.push(url);
        }
        if let Some(list) = get("RPC_ENDPOINTS") {
            rpc_endpoints.extend(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }
        for url in get_public_rpc_endpoints(chain_id) {
            if !rpc_endpoints.iter().any(|u| u == url) {
                rpc_endpoints.push((*url).to_string());
            }
        }

        let api_key = get("ONE_INCH_API_KEY");
        if api_key.is_some() {
            info!("🔑 ONE_INCH_API_KEY configured (key hidden)");
        }

        let operator_auto_default: f64 = parse_or(vars, "DEV_FEE_USD", 0.0)?;

        let fees = FeeConfig {
            auto: FeeSchedule {
                treasury_usd: parse_or(vars, "AUTO_TREASURY_FLAT_FEE_USD", DEFAULT_AUTO_TREASURY_FEE_USD)?,
                operator_usd: parse_or(vars, "DEV_AUTO_FEE_USD", operator_auto_default)?,
            },
            manual: FeeSchedule {
                treasury_usd: parse_or(vars, "TREASURY_FLAT_FEE_USD", 0.0)?,
                operator_usd: operator_auto_default,
            },
            token_fee_percent: parse_or(vars, "TREASURY_TOKEN_FEE_PERCENT", 0.0)?,
        };
        for (key, value) in [
            ("AUTO_TREASURY_FLAT_FEE_USD", fees.auto.treasury_usd),
            ("DEV_AUTO_FEE_USD", fees.auto.operator_usd),
            ("TREASURY_FLAT_FEE_USD", fees.manual.treasury_usd),
            ("DEV_FEE_USD", fees.manual.operator_usd),
            ("TREASURY_TOKEN_FEE_PERCENT", fees.token_fee_percent),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AppError::config_invalid(key, &value.to_string()));
            }
        }
        if fees.token_fee_percent > 100.0 {
            return Err(AppError::config_invalid(
                "TREASURY_TOKEN_FEE_PERCENT",
                &fees.token_fee_percent.to_string(),
            ));
        }

        let port = match get("PORT").or_else(|| get("FLASHGEN_PORT")) {
            Some(p) => p
                .parse()
                .map_err(|_| AppError::config_invalid("PORT", &p))?,
            None => 8080,
        };

        Ok(Self {
            chain_id,
            native_symbol: get_native_symbol(chain_id).to_string(),
            wrapped_native: get_wrapped_native(chain_id).unwrap_or(WBNB_ADDRESS),
            rpc_endpoints,
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            receipt_timeout: Duration::from_secs(parse_or(
                vars,
                "RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )?),
            aggregator: AggregatorConfig {
                api_key,
                base_url: get("ONE_INCH_BASE_URL")
                    .unwrap_or_else(|| format!("{}/{}", ONE_INCH_API_ROOT, chain_id)),
                slippage_percent: parse_or(vars, "SWAP_SLIPPAGE_PERCENT", DEFAULT_SLIPPAGE_PERCENT)?,
            },
            treasury: PayoutAddress::new(
                get("TREASURY_WALLET").unwrap_or_default(),
                get("TREASURY_WALLET_LAST_DIGITS").unwrap_or_default(),
            ),
            operator: PayoutAddress::new(
                get("DEV_WALLET").unwrap_or_default(),
                get("DEV_WALLET_LAST_DIGITS").unwrap_or_default(),
            ),
            fees,
            price: PriceConfig {
                cache_ttl: Duration::from_secs(parse_or(
                    vars,
                    "PRICE_CACHE_TTL_SECS",
                    DEFAULT_PRICE_CACHE_TTL_SECS,
                )?),
                coingecko_id: COINGECKO_BNB_ID.to_string(),
                binance_symbol: BINANCE_BNB_SYMBOL.to_string(),
                dexscreener_chain: crate::utils::constants::chain_id_to_dexscreener_name(chain_id)
                    .to_string(),
                dexscreener_pair: DEXSCREENER_BNB_PAIR.to_string(),
                coinpaprika_id: COINPAPRIKA_BNB_ID.to_string(),
            },
            quote_validity: Duration::from_secs(parse_or(
                vars,
                "QUOTE_VALIDITY_SECS",
                DEFAULT_QUOTE_VALIDITY_SECS,
            )?),
            swap_gas_buffer_percent: parse_or(
                vars,
                "SWAP_GAS_BUFFER_PERCENT",
                DEFAULT_SWAP_GAS_BUFFER_PERCENT,
            )?,
            ledger_dir: PathBuf::from(get("LEDGER_DIR").unwrap_or_else(|| "./ledger".to_string())),
            keyring_path: get("KEYRING_PATH").map(PathBuf::from),
            server: ServerConfig {
                host: get("FLASHGEN_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                api_keys: get("FLASHGEN_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(str::trim)
                            .filter(|k| !k.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }

    /// Defaults only, as if the environment were empty
    pub fn defaults() -> Self {
        match Self::from_vars(&HashMap::new()) {
            Ok(config) => config,
            Err(_) => unreachable!("defaults always parse"),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|_| AppError::config_invalid(key, raw)),
        None => Ok(default),
    }
}
