//! Providers Module - External Data Sources
//!
//! Jalur data: RPC, signer, 1inch, price feeds, dan ledger.
//! Core hanya melihat trait di `traits`.

pub mod aggregator;
pub mod dexscreener;
pub mod ledger;
pub mod price;
pub mod rpc;
pub mod signer;
pub mod traits;

pub use aggregator::OneInchClient;
pub use dexscreener::{DexPair, DexScreenerClient};
pub use ledger::{JsonlLedger, MemoryLedger};
pub use price::{BinanceSource, CoinGeckoSource, CoinPaprikaSource};
pub use rpc::RpcProvider;
pub use signer::{Keyring, LocalSigner};
pub use traits::*;
