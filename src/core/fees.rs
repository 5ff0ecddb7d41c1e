//! Fee Policy
//!
//! Pure functions over configuration: flat USD fees per order type, the
//! proportional in-kind token fee, and the payout address guard run
//! before any fee transfer.
//!
//! Proportional fee math is integer-only on smallest units:
//!   ppht = round(percent × 1000)          (parts per hundred thousand)
//!   fee  = round(received × ppht / 100_000)

use alloy_primitives::{Address, U256};

use crate::models::config::{FeeSchedule, FlashConfig, PayoutAddress};
use crate::models::errors::{AppError, AppResult};
use crate::models::types::OrderType;
use crate::utils::constants::FEE_SCALE_PPHT;
use crate::utils::units::{parse_address, verify_address_suffix};

/// Flat fees resolved for one order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatFees {
    pub treasury: f64,
    pub operator: f64,
}

impl FlatFees {
    pub fn total(&self) -> f64 {
        self.treasury + self.operator
    }
}

#[derive(Debug, Clone)]
pub struct FeePolicy {
    auto: FeeSchedule,
    manual: FeeSchedule,
    token_fee_percent: f64,
    operator_configured: bool,
}

impl FeePolicy {
    pub fn new(auto: FeeSchedule, manual: FeeSchedule, token_fee_percent: f64, operator_configured: bool) -> Self {
        Self {
            auto,
            manual,
            token_fee_percent,
            operator_configured,
        }
    }

    pub fn from_config(config: &FlashConfig) -> Self {
        Self::new(
            config.fees.auto,
            config.fees.manual,
            config.fees.token_fee_percent,
            config.operator.is_configured(),
        )
    }

    /// Flat USD fees; operator is zero when no operator address is configured
    pub fn flat_fees_usd(&self, order_type: OrderType) -> FlatFees {
        let schedule = match order_type {
            OrderType::Auto => self.auto,
            OrderType::Manual => self.manual,
        };
        FlatFees {
            treasury: schedule.treasury_usd,
            operator: if self.operator_configured {
                schedule.operator_usd
            } else {
                0.0
            },
        }
    }

    pub fn token_fee_percent(&self) -> f64 {
        self.token_fee_percent
    }

    /// Fee owed on `received` at the configured percent
    pub fn token_fee(&self, received: U256) -> U256 {
        proportional_token_fee(received, self.token_fee_percent)
    }
}

/// Percent to parts-per-hundred-thousand, clamped to [0, 100%]
pub fn percent_to_ppht(percent: f64) -> u64 {
    if !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    ((percent * 1000.0).round() as u64).min(FEE_SCALE_PPHT)
}

/// `received × percent`, integer math, half-up rounding
pub fn proportional_token_fee(received: U256, percent: f64) -> U256 {
    let ppht = percent_to_ppht(percent);
    if ppht == 0 || received.is_zero() {
        return U256::ZERO;
    }
    let scale = U256::from(FEE_SCALE_PPHT);
    received
        .saturating_mul(U256::from(ppht))
        .saturating_add(scale / U256::from(2u64))
        / scale
}

/// Result of validating a payout address before a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutCheck {
    Unconfigured,
    ZeroAddress,
    Invalid,
    SuffixMismatch,
    Verified(Address),
}

impl PayoutCheck {
    /// Validate `payout`: configured, parseable, non-zero, suffix match
    pub fn of(payout: &PayoutAddress) -> Self {
        if !payout.is_configured() {
            return PayoutCheck::Unconfigured;
        }
        let address = match parse_address(&payout.address) {
            Some(address) => address,
            None => return PayoutCheck::Invalid,
        };
        if address.is_zero() {
            return PayoutCheck::ZeroAddress;
        }
        if !verify_address_suffix(&payout.address, &payout.expected_suffix) {
            return PayoutCheck::SuffixMismatch;
        }
        PayoutCheck::Verified(address)
    }

    /// Address ready for a transfer, or the error naming why not
    pub fn require(self, wallet: &str) -> AppResult<Address> {
        match self {
            PayoutCheck::Verified(address) => Ok(address),
            PayoutCheck::SuffixMismatch => Err(AppError::suffix_mismatch(wallet)),
            PayoutCheck::Unconfigured => Err(AppError::config_missing(&format!("{} wallet", wallet))),
            PayoutCheck::ZeroAddress => Err(AppError::config_missing(&format!(
                "{} wallet (zero address)",
                wallet
            ))),
            PayoutCheck::Invalid => Err(AppError::bad_input(format!(
                "{} wallet address is malformed",
                wallet
            ))),
        }
    }
}
