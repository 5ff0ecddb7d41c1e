//! Constants Module - Single Source of Truth
//!
//! Chain metadata, sentinel addresses, external endpoints and the policy
//! constants of the quote/execute pipeline. Other modules read these
//! through `FlashConfig` defaults; nothing else hardcodes them.

use alloy_primitives::{address, Address};

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "FlashGen";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = "FlashGen/0.1.0";

// ============================================
// RPC CONSTANTS
// ============================================

/// Default timeout for RPC and HTTP requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// How long to wait for a transaction receipt before giving up (seconds)
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

/// Poll interval while waiting for a receipt (milliseconds)
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 1500;

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;

/// Decimals of the native coin on every supported chain
pub const NATIVE_DECIMALS: u8 = 18;

/// Sentinel "token address" aggregators use for the native coin
pub const NATIVE_TOKEN_SENTINEL: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Wrapped BNB on BSC mainnet
pub const WBNB_ADDRESS: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");

/// Get wrapped-native address for a chain
pub fn get_wrapped_native(chain_id: u64) -> Option<Address> {
    match chain_id {
        CHAIN_ID_BSC => Some(WBNB_ADDRESS),
        CHAIN_ID_ETHEREUM => Some(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
        _ => None,
    }
}

/// Public RPC endpoints appended after any configured endpoint
pub fn get_public_rpc_endpoints(chain_id: u64) -> &'static [&'static str] {
    match chain_id {
        CHAIN_ID_BSC => &[
            "https://bsc-dataseed.binance.org/",
            "https://bsc-dataseed1.defibit.io/",
            "https://bsc-dataseed1.ninicoin.io/",
        ],
        CHAIN_ID_ETHEREUM => &["https://eth.llamarpc.com"],
        _ => &[],
    }
}

/// Get native token symbol
pub fn get_native_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "ETH",
        CHAIN_ID_BSC => "BNB",
        _ => "ETH",
    }
}

/// Get chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_BSC => "BNB Smart Chain",
        _ => "Unknown",
    }
}

// ============================================
// SWAP AGGREGATOR
// ============================================

/// 1inch swap API root (chain id is appended)
pub const ONE_INCH_API_ROOT: &str = "https://api.1inch.dev/swap/v6.0";

/// Default slippage tolerance passed to the aggregator (percent)
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 1.0;

/// Quote validity window; matches the aggregator's own short quote lifetime
pub const DEFAULT_QUOTE_VALIDITY_SECS: u64 = 30;

/// Safety margin added on top of the live gas estimate for the swap leg
pub const DEFAULT_SWAP_GAS_BUFFER_PERCENT: u64 = 20;

// ============================================
// FEES
// ============================================

/// Treasury flat fee charged on automatic orders when not configured
pub const DEFAULT_AUTO_TREASURY_FEE_USD: f64 = 1.0;

/// Proportional fee scale: parts per hundred thousand (1% = 1_000)
pub const FEE_SCALE_PPHT: u64 = 100_000;

// ============================================
// PRICE SOURCES
// ============================================

/// Native price cache lifetime (seconds)
pub const DEFAULT_PRICE_CACHE_TTL_SECS: u64 = 60;

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
pub const BINANCE_TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/price";
pub const DEXSCREENER_API_URL: &str = "https://api.dexscreener.com/latest/dex";
pub const COINPAPRIKA_TICKER_URL: &str = "https://api.coinpaprika.com/v1/tickers";

/// CoinGecko id of the native coin
pub const COINGECKO_BNB_ID: &str = "binancecoin";
/// Binance spot ticker of the native coin against USDT
pub const BINANCE_BNB_SYMBOL: &str = "BNBUSDT";
/// WBNB/BUSD PancakeSwap pair used as the on-chain reference
pub const DEXSCREENER_BNB_PAIR: &str = "0x58f876857a02d6762e0101bb5c46a8c1ed44dc16";
/// CoinPaprika id of the native coin
pub const COINPAPRIKA_BNB_ID: &str = "bnb-binance-coin";

/// Map chain id to DexScreener chain slug
pub fn chain_id_to_dexscreener_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "ethereum",
        CHAIN_ID_BSC => "bsc",
        _ => "ethereum",
    }
}
