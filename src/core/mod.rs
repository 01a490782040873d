//! Core business logic abstractions

pub mod config;
pub mod holdings;
pub mod log;

// Re-export main types for cleaner imports
pub use holdings::{Holding, HoldingsError, HoldingsProvider, HoldingsResponse};
