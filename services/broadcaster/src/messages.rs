//! Wire messages
//!
//! Serialized JSON frames fanned out to subscribers: one per trade, plus
//! sampled top-of-book snapshots. Prices go out as numbers and timestamps
//! as Unix nanoseconds.

use serde::{Deserialize, Serialize};

use types::instrument::Instrument;
use types::transaction::Transaction;

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BroadcastMessage {
    Trade {
        transaction_id: String,
        symbol: String,
        price: f64,
        quantity: u32,
        timestamp: i64,
    },
    Book {
        symbol: String,
        best_bid: Option<f64>,
        best_ask: Option<f64>,
        timestamp: i64,
    },
}

impl BroadcastMessage {
    pub fn trade(transaction: &Transaction) -> Self {
        BroadcastMessage::Trade {
            transaction_id: transaction.uid().to_string(),
            symbol: transaction.instrument().symbol(),
            price: transaction.price().as_f64(),
            quantity: transaction.quantity(),
            timestamp: transaction.executed_at(),
        }
    }

    pub fn book(
        instrument: Instrument,
        best_bid: Option<f64>,
        best_ask: Option<f64>,
        timestamp: i64,
    ) -> Self {
        BroadcastMessage::Book { symbol: instrument.symbol(), best_bid, best_ask, timestamp }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
