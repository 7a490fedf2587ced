//! Error taxonomy shared across the workspace
//!
//! Fatal errors (configuration, empty pools, invalid synthesized orders)
//! propagate to the orchestrator's top-level return; the matcher's
//! non-fatal failures live in the matching crate.

use thiserror::Error;

use crate::instrument::{AssetClass, Instrument};
use crate::order::OrderId;

/// Configuration validation failures. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: '{value}'")]
    Invalid { field: &'static str, value: f64 },
}

/// Order construction failures. Fatal for the producing side.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Order {0} has not been fulfilled yet")]
    NotFulfilled(OrderId),
}

/// Instrument pool failures. Fatal at orchestration start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Underlying pool is empty for asset class {asset_class}")]
    EmptyPool { asset_class: AssetClass },

    #[error("No market data registered for {instrument}")]
    MissingSymbolData { instrument: Instrument },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Equity;

    #[test]
    fn test_messages_carry_context() {
        let err = ConfigError::Invalid { field: "maxQnty", value: -3.0 };
        assert_eq!(err.to_string(), "Invalid config value for maxQnty: '-3'");

        let err = RegistryError::MissingSymbolData {
            instrument: crate::instrument::Instrument::Equity(Equity::GS),
        };
        assert!(err.to_string().contains("GS"));
    }
}
