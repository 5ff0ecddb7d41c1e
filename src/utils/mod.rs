//! Utils Module - Helper Functions & Shared Utilities
//!
//! Berisi fungsi-fungsi pembantu yang digunakan di seluruh aplikasi.

pub mod cache;
pub mod constants;
pub mod telemetry;
pub mod units;

pub use cache::*;
pub use constants::*;
pub use telemetry::*;
pub use units::*;
