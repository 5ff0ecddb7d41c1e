//! Models Module - Data Structures & Configuration
//!
//! Single source of truth untuk semua tipe data dan konfigurasi.
//! Tidak ada hardcoded values di luar modul ini dan utils/constants.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
