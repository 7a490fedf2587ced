//! Shared domain types for the Solstice LOB simulation
//!
//! This library provides the type definitions used across the simulation
//! workspace: instruments and sampled pools, fixed-point prices, orders
//! (spot and option), per-symbol market statistics, fill transactions,
//! runtime configuration, and the error taxonomy.
//!
//! # Modules
//! - `instrument`: Asset families, symbols, and the sampled instrument registry
//! - `numeric`: Fixed-point `Price` type
//! - `order`: Order lifecycle types (spot orders plus option details)
//! - `market`: Per-symbol running market statistics
//! - `transaction`: Immutable fill records
//! - `config`: Run configuration and validation
//! - `errors`: Error taxonomy

pub mod config;
pub mod errors;
pub mod instrument;
pub mod market;
pub mod numeric;
pub mod order;
pub mod transaction;

pub use config::{Config, LogLevel};
pub use errors::{ConfigError, OrderError, RegistryError};
pub use instrument::{
    AssetClass, Equity, ExpiryMonth, Future, FutureTicker, Instrument, InstrumentRegistry,
    OptionContract, OptionKind, OptionTicker,
};
pub use market::PriceData;
pub use numeric::Price;
pub use order::{Greeks, OptionDetails, Order, OrderId, Side};
pub use transaction::Transaction;

/// Current wall-clock time as Unix nanoseconds.
pub fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
