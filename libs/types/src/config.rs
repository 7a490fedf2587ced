//! Run configuration and validation
//!
//! All knobs live here with their defaults; validation rejects negative
//! numeric fields (the infinite-orders sentinel excepted) before the run
//! starts.

use crate::errors::ConfigError;
use crate::instrument::AssetClass;

/// Verbosity of simulation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// The corresponding tracing filter.
    pub fn as_filter(&self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Sim log level.
    pub log_level: LogLevel,
    /// Asset class to simulate.
    pub asset_class: AssetClass,
    /// Number of orders to generate; -1 for an infinite run.
    pub orders_to_generate: i64,
    /// How many instruments to sample into the active pool.
    pub underlying_pool_count: usize,
    /// Quantity bounds for randomly generated orders (pricer disabled).
    pub min_qnty: i64,
    pub max_qnty: i64,
    /// Price bounds for randomly generated orders (pricer disabled).
    pub min_price: f64,
    pub max_price: f64,
    /// Expiry bounds in days for randomly generated options.
    pub min_expiry_days: i64,
    pub max_expiry_days: i64,
    /// Synthesize orders from market state instead of uniform randoms.
    pub use_pricer: bool,
    /// Enable the outbound WebSocket broadcaster.
    pub enable_broadcaster: bool,
    /// Broadcast one book snapshot per this many processed orders.
    pub broadcast_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Debug,
            asset_class: AssetClass::Equity,
            orders_to_generate: 10_000,
            underlying_pool_count: 10,
            min_qnty: 1,
            max_qnty: 20,
            min_price: 9.0,
            max_price: 10.0,
            min_expiry_days: 30,
            max_expiry_days: 365,
            use_pricer: true,
            enable_broadcaster: false,
            broadcast_interval: 10,
        }
    }
}

impl Config {
    /// Validated defaults; the single entry point the binary uses.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Reject negative numeric fields. `orders_to_generate == -1` is the
    /// infinite-run sentinel and is exempt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, f64); 8] = [
            ("minQnty", self.min_qnty as f64),
            ("maxQnty", self.max_qnty as f64),
            ("minPrice", self.min_price),
            ("maxPrice", self.max_price),
            ("underlyingPoolCount", self.underlying_pool_count as f64),
            ("minExpiryDays", self.min_expiry_days as f64),
            ("maxExpiryDays", self.max_expiry_days as f64),
            ("broadcastInterval", self.broadcast_interval as f64),
        ];

        if self.orders_to_generate != -1 && self.orders_to_generate < 0 {
            return Err(ConfigError::Invalid {
                field: "ordersToGenerate",
                value: self.orders_to_generate as f64,
            });
        }

        for (field, value) in checks {
            if value < 0.0 {
                return Err(ConfigError::Invalid { field, value });
            }
        }

        Ok(())
    }
}
