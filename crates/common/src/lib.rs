//! Lendrate Common Library
//!
//! Shared code for the Lendrate services including:
//! - Interest-rate range model and resolver
//! - Storage backends (Postgres via SeaORM, in-memory)
//! - Loan calculator
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod calculator;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod rates;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{RateStore, MemoryRateStore, PgRateStore};
pub use rates::{Category, RateService};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lowest vehicle model year a range may cover
pub const MIN_MODEL_YEAR: i32 = 1900;

/// Highest vehicle model year a range may cover
pub const MAX_MODEL_YEAR: i32 = 2050;
