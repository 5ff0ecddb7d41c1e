//! Smallest-unit conversions and address helpers.
//!
//! On-chain quantities stay `U256` end to end; floats only appear at the
//! USD boundary and in display fields.

use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::{Address, U256};
use eyre::{eyre, Result};

use crate::utils::constants::NATIVE_DECIMALS;

/// Fractional digits kept when turning a float amount into smallest units
const FLOAT_PRECISION: usize = 8;

/// Parse a decimal string (e.g. "0.1667") into smallest units.
/// Fraction digits beyond `decimals` are truncated.
pub fn to_smallest_unit(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let normalized = match amount.split_once('.') {
        Some((int, frac)) if frac.len() > decimals as usize => {
            if decimals == 0 {
                int.to_string()
            } else {
                format!("{}.{}", int, &frac[..decimals as usize])
            }
        }
        _ => amount.to_string(),
    };

    parse_units(&normalized, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| eyre!("Invalid amount '{}': {}", amount, e))
}

/// Convert a float amount into smallest units, rounded to 8 decimals first
/// so float noise never reaches the integer domain.
pub fn float_to_smallest_unit(amount: f64, decimals: u8) -> Result<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(eyre!("Amount must be a finite non-negative number, got {}", amount));
    }
    to_smallest_unit(&format!("{:.*}", FLOAT_PRECISION, amount), decimals)
}

/// Format smallest units as a decimal string
pub fn from_smallest_unit(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| "0".to_string())
}

/// Smallest units to a display float
pub fn smallest_unit_to_f64(amount: U256, decimals: u8) -> f64 {
    from_smallest_unit(amount, decimals).parse().unwrap_or(0.0)
}

/// Native wei to a display float
#[inline]
pub fn wei_to_native(wei: U256) -> f64 {
    smallest_unit_to_f64(wei, NATIVE_DECIMALS)
}

/// Convert a USD amount into native wei at `price_usd` per coin.
/// A non-positive price yields zero.
pub fn usd_to_native_wei(usd: f64, price_usd: f64) -> Result<U256> {
    if price_usd <= 0.0 || !price_usd.is_finite() {
        return Ok(U256::ZERO);
    }
    float_to_smallest_unit(usd / price_usd, NATIVE_DECIMALS)
}

/// Lenient integer parse used for aggregator payload fields: decimal or
/// 0x-hex, empty/invalid yields zero.
pub fn parse_u256_lenient(value: &str) -> U256 {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x") {
        return U256::from_str_radix(hex, 16).unwrap_or(U256::ZERO);
    }
    U256::from_str_radix(value, 10).unwrap_or(U256::ZERO)
}

/// Parse a 0x-prefixed hex quantity returned by JSON-RPC
pub fn parse_hex_u256(value: &str) -> Result<U256> {
    let hex = value.trim().trim_start_matches("0x");
    if hex.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(hex, 16).map_err(|e| eyre!("Invalid hex quantity '{}': {}", value, e))
}

/// Parse a 0x-prefixed hex quantity that must fit in u64
pub fn parse_hex_u64(value: &str) -> Result<u64> {
    let hex = value.trim().trim_start_matches("0x");
    if hex.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(hex, 16).map_err(|e| eyre!("Invalid hex quantity '{}': {}", value, e))
}

/// Parse a user supplied address, rejecting empty strings
pub fn parse_address(value: &str) -> Option<Address> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

/// Case-insensitive suffix match on the textual address.
/// An empty address or empty expected suffix never verifies.
pub fn verify_address_suffix(address: &str, expected_suffix: &str) -> bool {
    if address.is_empty() || expected_suffix.is_empty() {
        return false;
    }
    address
        .to_lowercase()
        .ends_with(&expected_suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_smallest_unit() {
        assert_eq!(
            to_smallest_unit("0.1667", 18).unwrap(),
            U256::from(166_700_000_000_000_000u128)
        );
        assert_eq!(to_smallest_unit("250", 18).unwrap(), U256::from(250u128) * U256::from(10u128.pow(18)));
        // truncates beyond token precision
        assert_eq!(to_smallest_unit("1.1234567", 6).unwrap(), U256::from(1_123_456u64));
    }

    #[test]
    fn test_usd_to_native_wei() {
        // $1.50 at $600 = 0.0025 BNB
        assert_eq!(
            usd_to_native_wei(1.5, 600.0).unwrap(),
            U256::from(2_500_000_000_000_000u128)
        );
        assert_eq!(usd_to_native_wei(10.0, 0.0).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_float_rejects_negative() {
        assert!(float_to_smallest_unit(-1.0, 18).is_err());
        assert!(float_to_smallest_unit(f64::NAN, 18).is_err());
    }

    #[test]
    fn test_format_roundtrip_display() {
        let raw = U256::from_str_radix("250000000000000000000", 10).unwrap();
        assert_eq!(smallest_unit_to_f64(raw, 18), 250.0);
        assert_eq!(smallest_unit_to_f64(U256::from(1_500_000u64), 6), 1.5);
    }

    #[test]
    fn test_parse_u256_lenient() {
        assert_eq!(parse_u256_lenient("5000000000"), U256::from(5_000_000_000u64));
        assert_eq!(parse_u256_lenient("0x10"), U256::from(16u64));
        assert_eq!(parse_u256_lenient(""), U256::ZERO);
        assert_eq!(parse_u256_lenient("garbage"), U256::ZERO);
    }

    #[test]
    fn test_hex_quantities() {
        assert_eq!(parse_hex_u64("0x5208").unwrap(), 21_000);
        assert_eq!(parse_hex_u256("0x0").unwrap(), U256::ZERO);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_verify_address_suffix() {
        let addr = "0x1234567890abcdef1234567890ABCDEF12345678";
        assert!(verify_address_suffix(addr, "5678"));
        assert!(verify_address_suffix(addr, "ef12345678"));
        assert!(!verify_address_suffix(addr, "9999"));
        assert!(!verify_address_suffix(addr, ""));
        assert!(!verify_address_suffix("", "5678"));
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("").is_none());
        assert!(parse_address("not-an-address").is_none());
        assert!(parse_address("0x0000000000000000000000000000000000000001").is_some());
    }
}
