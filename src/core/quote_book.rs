//! Issued-Quote Book
//!
//! Every quote handed to a caller is kept here under its `quote_id` until
//! it is executed. Execution takes the quote out with an atomic remove, so
//! a quote runs at most once and only for the user it was built for. The
//! caller only ever sends the id back; the payload that gets signed is the
//! one stored at issue time.

use alloy_primitives::Address;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::SwapQuote;

/// Quote plus the identity it was issued to
#[derive(Debug, Clone)]
pub struct IssuedQuote {
    pub user_id: String,
    /// Token contract the aggregator payload buys
    pub token: Address,
    pub quote: SwapQuote,
}

#[derive(Default)]
pub struct QuoteBook {
    issued: DashMap<String, IssuedQuote>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly built quote. Expired entries are dropped first.
    pub fn issue(&self, user_id: &str, token: Address, quote: SwapQuote) {
        let purged = self.purge_expired();
        if purged > 0 {
            debug!("🧹 Dropped {} expired quote(s)", purged);
        }
        self.issued.insert(
            quote.quote_id.clone(),
            IssuedQuote {
                user_id: user_id.to_string(),
                token,
                quote,
            },
        );
    }

    /// Remove and return the quote for `user_id`.
    ///
    /// Unknown or already executed ids are `QUOTE_EXPIRED` (re-quote).
    /// An id owned by someone else is `BAD_INPUT` and stays in the book.
    pub fn take(&self, quote_id: &str, user_id: &str) -> AppResult<IssuedQuote> {
        if let Some((_, issued)) = self.issued.remove_if(quote_id, |_, q| q.user_id == user_id) {
            return Ok(issued);
        }
        if self.issued.contains_key(quote_id) {
            warn!("🚫 User {} tried to execute quote {} issued to someone else", user_id, quote_id);
            return Err(AppError::bad_input("Bad input: quote was issued to another user"));
        }
        Err(AppError::quote_expired())
    }

    /// USD amount of a still-open quote
    pub fn usd_amount(&self, quote_id: &str) -> Option<f64> {
        self.issued.get(quote_id).map(|q| q.quote.usd_amount_to_spend)
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.issued.len();
        self.issued.retain(|_, q| !q.quote.is_expired());
        before.saturating_sub(self.issued.len())
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
