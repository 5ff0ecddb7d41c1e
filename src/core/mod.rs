//! Core Module - Flash Generation Pipeline
//!
//! Otak aplikasi: price oracle, quote, eksekusi swap, fee legs, manual order.
//! Semua I/O lewat trait di providers/, jadi bisa dites dengan fake.

pub mod executor;
pub mod fees;
pub mod manual;
pub mod oracle;
pub mod quote;
pub mod quote_book;
pub mod transfer;

pub use executor::*;
pub use fees::*;
pub use manual::*;
pub use oracle::*;
pub use quote::*;
pub use quote_book::*;
pub use transfer::*;
