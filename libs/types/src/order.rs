//! Order lifecycle types
//!
//! A single `Order` struct covers all families; option orders carry an
//! optional `OptionDetails` with strike, call/put tag, expiry and Greeks.
//! Orders are immutable once placed apart from their fill state: only the
//! outstanding quantity and the matched/fulfilled fields ever change.

use std::fmt;

use crate::errors::OrderError;
use crate::instrument::{Instrument, OptionKind};
use crate::numeric::Price;

/// Unique order identifier assigned by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Bid => "Bid",
            Side::Ask => "Ask",
        };
        write!(f, "{s}")
    }
}

/// Black-Scholes sensitivities, fixed at order creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Option-specific attributes attached to an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionDetails {
    pub strike: f64,
    pub kind: OptionKind,
    /// Time to expiry in years at placement.
    pub expiry_years: f64,
    pub greeks: Greeks,
}

/// A limit order resting in or matching against the book.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    instrument: Instrument,
    side: Side,
    limit_price: Price,
    quantity: u32,
    outstanding: u32,
    placed_at: i64,
    matched: bool,
    matched_price: Option<Price>,
    fulfilled_at: Option<i64>,
    option: Option<OptionDetails>,
}

impl Order {
    /// Validate raw generator output and build a spot order.
    pub fn create(
        id: OrderId,
        instrument: Instrument,
        side: Side,
        price: f64,
        quantity: i64,
        placed_at: i64,
    ) -> Result<Self, OrderError> {
        let limit_price = Price::from_f64(price).ok_or(OrderError::InvalidPrice(price))?;
        if quantity < 0 {
            return Err(OrderError::InvalidQuantity(quantity));
        }

        Ok(Self {
            id,
            instrument,
            side,
            limit_price,
            quantity: quantity as u32,
            outstanding: quantity as u32,
            placed_at,
            matched: false,
            matched_price: None,
            fulfilled_at: None,
            option: None,
        })
    }

    /// Build an option order; validation is the same as for spot orders.
    #[allow(clippy::too_many_arguments)]
    pub fn create_option(
        id: OrderId,
        instrument: Instrument,
        side: Side,
        price: f64,
        quantity: i64,
        placed_at: i64,
        details: OptionDetails,
    ) -> Result<Self, OrderError> {
        let mut order = Self::create(id, instrument, side, price, quantity, placed_at)?;
        order.option = Some(details);
        Ok(order)
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// The effective price: the matched price once matched, the limit until
    /// then.
    pub fn price(&self) -> Price {
        match (self.matched, self.matched_price) {
            (true, Some(price)) => price,
            _ => self.limit_price,
        }
    }

    pub fn limit_price(&self) -> Price {
        self.limit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    pub fn placed_at(&self) -> i64 {
        self.placed_at
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub fn matched_price(&self) -> Option<Price> {
        self.matched_price
    }

    /// Fulfillment time exists only once the order has matched.
    pub fn fulfilled_at(&self) -> Result<i64, OrderError> {
        self.fulfilled_at.ok_or(OrderError::NotFulfilled(self.id))
    }

    pub fn option(&self) -> Option<&OptionDetails> {
        self.option.as_ref()
    }

    /// Reduce the outstanding quantity by a fill.
    ///
    /// # Panics
    /// Panics if the fill exceeds what is outstanding; outstanding quantity
    /// is monotone non-increasing.
    pub fn reduce_outstanding(&mut self, quantity: u32) {
        assert!(
            quantity <= self.outstanding,
            "fill {} exceeds outstanding {} on order {}",
            quantity,
            self.outstanding,
            self.id
        );
        self.outstanding -= quantity;
    }

    /// Record the match outcome. The matched price may differ from the limit.
    pub fn mark_fulfilled(&mut self, matched_price: Price, at: i64) {
        debug_assert_eq!(self.outstanding, 0, "order {} fulfilled with quantity outstanding", self.id);
        self.matched = true;
        self.matched_price = Some(matched_price);
        self.fulfilled_at = Some(at);
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order {} | {} | {} | Price: ${} | Qnty: {} | Remaining: {}",
            self.id,
            self.instrument,
            self.side,
            self.price(),
            self.quantity,
            self.outstanding
        )
    }
}
