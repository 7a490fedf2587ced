//! Fixed-point price type
//!
//! Uses rust_decimal so prices can key ordered book structures without
//! floating-point comparison hazards. The stochastic pricing math runs in
//! `f64`; conversion happens here, rounding to cents the way the order
//! generators quote.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places carried by a quoted price.
const PRICE_DP: u32 = 2;

/// Price with fixed-point decimal representation.
///
/// Always strictly positive. `Ord` so it can serve as a `BTreeMap` key for
/// price levels. Serialized as a string to prevent JSON number precision
/// loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price from a Decimal.
    ///
    /// # Panics
    /// Panics if the price is negative or zero.
    pub fn new(value: Decimal) -> Self {
        assert!(value > Decimal::ZERO, "Price must be positive");
        Self(value)
    }

    /// Try to create a Price, returning None if invalid.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Convert from the pricer's f64 domain, rounding to cents.
    ///
    /// Returns None for non-finite or non-positive values.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let decimal = Decimal::from_f64(value)?
            .round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointAwayFromZero);
        Self::try_new(decimal)
    }

    /// Create from integer (for testing/convenience).
    pub fn from_u64(value: u64) -> Self {
        Self::new(Decimal::from(value))
    }

    /// Get the inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Convert back to the pricer's f64 domain.
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let decimal = Decimal::from_str(&s).map_err(serde::de::Error::custom)?;
        Self::try_new(decimal).ok_or_else(|| serde::de::Error::custom("Price must be positive"))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
