//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::errors::{AppError, ErrorBody, ErrorCode};
use crate::models::types::TokenDetails;
use crate::utils::telemetry::FlowStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Failure that still carries a payload (execution report)
    pub fn failure(data: T, error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Same request may succeed later (re-quote, price or RPC hiccup)
    pub retryable: bool,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            code: "UNAUTHORIZED".to_string(),
            message: "Invalid or missing API key".to_string(),
            details: None,
            retryable: false,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
            retryable: true,
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
            retryable: err.code.is_retryable(),
        }
    }
}

impl From<&ErrorBody> for ApiError {
    fn from(body: &ErrorBody) -> Self {
        Self {
            code: body.code.clone(),
            message: body.message.clone(),
            details: None,
            retryable: ErrorCode::from_code_str(&body.code).is_retryable(),
        }
    }
}

// ============================================
// Quote
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub user_id: String,
    pub user_wallet: String,
    pub token: TokenDetails,
    pub usd_amount: f64,
}

// ============================================
// Execute
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteApiRequest {
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    /// Defaults to the address derived from the user's key
    #[serde(default)]
    pub user_wallet: Option<String>,
    pub token: TokenDetails,
    /// `quoteId` from a previous `/v1/quote` response
    pub quote_id: String,
    pub recipient_address: String,
}

// ============================================
// Manual order
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderApiRequest {
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_wallet: Option<String>,
    pub token: TokenDetails,
    pub usd_amount: f64,
    /// Free-form, may be an address on another chain
    pub recipient_address: String,
}

// ============================================
// Health & Stats & Price
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub chain_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceData {
    pub symbol: String,
    pub price_usd: f64,
    pub source: String,
    pub fetched_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCacheData {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    #[serde(flatten)]
    pub flow: FlowStats,
    pub price_cache: PriceCacheData,
    pub uptime_seconds: u64,
    pub api_version: String,
}
