//! Centralized Error Handling Module
//!
//! Every failure that crosses a component boundary carries a unique code
//! so logs and API clients can tell them apart.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - input / config errors are rejected before any network call
//! - quote errors (price, aggregator) are reported, never retried here
//! - execution errors distinguish fatal swap failures from fee-leg failures

use serde::Serialize;
use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Serializable view without the source chain
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Code + message pair as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input / Configuration
    // ============================================
    /// Missing wallet/recipient, non-positive amount, malformed address
    BadInput,
    /// Required credential or payout address absent
    ConfigMissing,
    /// Configuration value present but unparseable
    ConfigInvalidValue,

    // ============================================
    // Quote phase
    // ============================================
    /// Every price source failed
    PriceUnavailable,
    /// Swap aggregator returned an error or malformed payload
    AggregatorError,

    // ============================================
    // Execution phase
    // ============================================
    /// Quote validity window elapsed
    QuoteExpired,
    /// Affordability check failed
    InsufficientBalance,
    /// Swap receipt reported failure
    SwapReverted,
    /// Swap could not be estimated, signed or broadcast
    SwapBroadcastFailed,
    /// Manual order payment to treasury failed
    PaymentFailed,
    /// A treasury/operator fee transfer failed (non-fatal)
    FeeLegFailed,
    /// Payout address does not end with its configured suffix
    AddressSuffixMismatch,

    // ============================================
    // Infrastructure
    // ============================================
    /// RPC read failed on every endpoint tried
    RpcError,
    /// Ledger append failed
    LedgerWriteFailed,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadInput => "BAD_INPUT",
            Self::ConfigMissing => "CONFIG_MISSING",
            Self::ConfigInvalidValue => "CONFIG_INVALID_VALUE",
            Self::PriceUnavailable => "PRICE_UNAVAILABLE",
            Self::AggregatorError => "AGGREGATOR_ERROR",
            Self::QuoteExpired => "QUOTE_EXPIRED",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::SwapReverted => "SWAP_REVERTED",
            Self::SwapBroadcastFailed => "SWAP_BROADCAST_FAILED",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::FeeLegFailed => "FEE_LEG_FAILED",
            Self::AddressSuffixMismatch => "ADDRESS_SUFFIX_MISMATCH",
            Self::RpcError => "RPC_ERROR",
            Self::LedgerWriteFailed => "LEDGER_WRITE_FAILED",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Reverse of `as_str`; unknown strings map to `Unknown`
    pub fn from_code_str(code: &str) -> Self {
        const ALL: [ErrorCode; 15] = [
            ErrorCode::BadInput,
            ErrorCode::ConfigMissing,
            ErrorCode::ConfigInvalidValue,
            ErrorCode::PriceUnavailable,
            ErrorCode::AggregatorError,
            ErrorCode::QuoteExpired,
            ErrorCode::InsufficientBalance,
            ErrorCode::SwapReverted,
            ErrorCode::SwapBroadcastFailed,
            ErrorCode::PaymentFailed,
            ErrorCode::FeeLegFailed,
            ErrorCode::AddressSuffixMismatch,
            ErrorCode::RpcError,
            ErrorCode::LedgerWriteFailed,
            ErrorCode::Unknown,
        ];
        ALL.into_iter()
            .find(|c| c.as_str() == code)
            .unwrap_or(ErrorCode::Unknown)
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadInput => 400,
            Self::QuoteExpired => 409,
            Self::InsufficientBalance => 402,
            Self::AggregatorError | Self::PriceUnavailable | Self::RpcError => 502,
            Self::ConfigMissing | Self::ConfigInvalidValue | Self::AddressSuffixMismatch => 503,
            _ => 500,
        }
    }

    /// Check if re-invoking the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PriceUnavailable | Self::AggregatorError | Self::RpcError | Self::QuoteExpired
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn bad_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadInput, msg)
    }

    pub fn config_missing(what: &str) -> Self {
        Self::new(ErrorCode::ConfigMissing, format!("{} is not configured", what))
    }

    pub fn config_invalid(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: '{}'", key, value),
        )
    }

    pub fn price_unavailable() -> Self {
        Self::new(
            ErrorCode::PriceUnavailable,
            "Couldn't fetch native coin price from any source",
        )
    }

    pub fn aggregator(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AggregatorError, msg)
    }

    pub fn quote_expired() -> Self {
        Self::new(
            ErrorCode::QuoteExpired,
            "Quote expired. Please refresh and try again.",
        )
    }

    pub fn insufficient_balance(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientBalance, msg)
    }

    pub fn swap_reverted(tx_hash: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SwapReverted,
            format!("Swap transaction reverted ({})", tx_hash),
        )
    }

    pub fn swap_broadcast_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SwapBroadcastFailed, msg)
    }

    pub fn payment_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PaymentFailed, msg)
    }

    pub fn fee_leg_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FeeLegFailed, msg)
    }

    pub fn suffix_mismatch(wallet: &str) -> Self {
        Self::new(
            ErrorCode::AddressSuffixMismatch,
            format!("{} wallet address suffix mismatch", wallet),
        )
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::LedgerWriteFailed, msg)
    }
}

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "JSON error", err)
    }
}
