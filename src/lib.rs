//! Flashgen Library
//!
//! Quote-and-execute pipeline for buying tokens from a custodial BSC wallet:
//! - Native coin price with ordered fallback sources and a TTL cache
//! - 1inch swap quotes with flat fees and affordability
//! - Swap execution with best-effort treasury/operator fee legs
//! - Manual orders paid to the treasury and fulfilled by an administrator

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::executor::{ExecuteRequest, ExecutionEngine};
pub use crate::core::fees::{FeePolicy, PayoutCheck};
pub use crate::core::manual::{ManualOrderRequest, ManualOrderService};
pub use crate::core::oracle::{CachedPriceOracle, PriceOracle};
pub use crate::core::quote::QuoteBuilder;
pub use crate::core::quote_book::{IssuedQuote, QuoteBook};
pub use models::config::FlashConfig;
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    ExecutionReport, ExecutionResult, ExecutionStage, FeeLeg, LegOutcome, OrderRecord, SwapQuote,
    TokenDetails, TransactionRecord,
};
pub use providers::traits::{
    ChainClient, LedgerStore, PriceSource, SignerSource, SwapAggregator, TransactionSigner,
};
pub use utils::telemetry::{FlowStats, FlowTelemetry};
