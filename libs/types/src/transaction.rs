//! Immutable fill records
//!
//! One `Transaction` per executed fill, kept in the owning book's log for
//! the life of the run and mirrored onto the broadcaster's trade stream.

use rand::Rng;
use std::fmt;

use crate::instrument::Instrument;
use crate::numeric::Price;
use crate::order::OrderId;

/// Record of a single fill between a bid and an ask.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    uid: String,
    bid_id: OrderId,
    ask_id: OrderId,
    instrument: Instrument,
    price: Price,
    quantity: u32,
    executed_at: i64,
}

impl Transaction {
    pub fn new(
        bid_id: OrderId,
        ask_id: OrderId,
        instrument: Instrument,
        price: Price,
        quantity: u32,
        executed_at: i64,
    ) -> Self {
        Self {
            uid: random_uid(&mut rand::thread_rng()),
            bid_id,
            ask_id,
            instrument,
            price,
            quantity,
            executed_at,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn bid_id(&self) -> OrderId {
        self.bid_id
    }

    pub fn ask_id(&self) -> OrderId {
        self.ask_id
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn executed_at(&self) -> i64 {
        self.executed_at
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction {} | Bid: {} | Ask: {} | Ticker: {} | Price: ${} | Qnty: {}",
            self.uid, self.bid_id, self.ask_id, self.instrument, self.price, self.quantity
        )
    }
}

/// Random 20-digit identifier, zero-padded on the left.
fn random_uid<R: Rng>(rng: &mut R) -> String {
    format!("{:020}", rng.gen::<u64>())
}
