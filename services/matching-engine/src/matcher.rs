//! Price-time-priority matching
//!
//! The incoming order is already resting in the book when matching starts;
//! the walk repeatedly takes the front of the most aggressive crossable
//! opposite level, transfers the overlapping quantity, and either continues
//! at the same level, steps to the next crossable one, or finishes. Every
//! executed fill is logged as a transaction even when a later step fails;
//! on failure the incoming order simply stays resting with whatever
//! quantity it has left.

use std::cmp::Ordering;

use thiserror::Error;
use types::now_nanos;
use types::numeric::Price;
use types::order::{OrderId, Side};
use types::transaction::Transaction;

use crate::book::{BookError, SymbolBook};

/// Matching failures. All non-fatal for the run: the order rests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error(transparent)]
    Book(#[from] BookError),

    #[error("Orders cannot match themselves")]
    SelfTrade,

    #[error("Insufficient orders available to fulfill incoming order")]
    InsufficientLiquidity,

    #[error("All other orders out of price range")]
    OutOfRange,

    #[error("Order {0} is not present in the book")]
    UnknownOrder(OrderId),
}

/// One executed fill between the incoming order and a resting order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub resting_id: OrderId,
    pub incoming_id: OrderId,
    pub price: Price,
    pub quantity: u32,
    pub resting_fulfilled: bool,
    pub incoming_fulfilled: bool,
}

/// Whether an opposite-side price is still crossable by the incoming limit.
fn within_price_range(price: Price, incoming_side: Side, limit: Price) -> bool {
    match incoming_side {
        Side::Bid => price <= limit,
        Side::Ask => price >= limit,
    }
}

/// Match an incoming order against the opposite side of its book.
///
/// `hinted_price` skips best-price discovery and starts the walk at a known
/// level. Returns the fills in execution order, or the reason no complete
/// match was possible.
pub fn match_order(
    book: &mut SymbolBook,
    incoming_id: OrderId,
    hinted_price: Option<Price>,
) -> Result<Vec<Fill>, MatchError> {
    let (incoming_side, incoming_limit) = {
        let incoming = book
            .order(incoming_id)
            .ok_or(MatchError::UnknownOrder(incoming_id))?;
        (incoming.side(), incoming.limit_price())
    };
    let opposite = incoming_side.opposite();

    let mut price = match hinted_price {
        Some(price) => price,
        None => book.best_opposite(incoming_side, incoming_limit)?,
    };

    let mut fills = Vec::new();

    loop {
        let level = book
            .level(opposite, price)
            .ok_or(MatchError::InsufficientLiquidity)?;
        let resting_id = level.front().ok_or(MatchError::InsufficientLiquidity)?;

        if level.len() == 1 && resting_id == incoming_id {
            return Err(MatchError::SelfTrade);
        }

        let resting_outstanding = book
            .order(resting_id)
            .ok_or(MatchError::UnknownOrder(resting_id))?
            .outstanding();
        let incoming_outstanding = book
            .order(incoming_id)
            .ok_or(MatchError::UnknownOrder(incoming_id))?
            .outstanding();

        // Fills settle at the level being walked, which is the resting
        // order's own quote.
        let fill_price = price;
        let executed_at = now_nanos();

        match resting_outstanding.cmp(&incoming_outstanding) {
            // Resting order exhausted; the walk continues.
            Ordering::Less => {
                let quantity = resting_outstanding;
                reduce(book, resting_id, quantity)?;
                reduce(book, incoming_id, quantity)?;

                fills.push(Fill {
                    resting_id,
                    incoming_id,
                    price: fill_price,
                    quantity,
                    resting_fulfilled: true,
                    incoming_fulfilled: false,
                });
                record_fill(book, resting_id, incoming_id, fill_price, quantity, executed_at)?;
                book.mark_fulfilled(resting_id, fill_price, executed_at);

                if book.level(opposite, price).is_some_and(|l| !l.is_empty()) {
                    continue;
                }

                let next = book
                    .next_opposite_level(incoming_side, price)
                    .ok_or(MatchError::InsufficientLiquidity)?;
                if !within_price_range(next, incoming_side, incoming_limit) {
                    return Err(MatchError::OutOfRange);
                }
                price = next;
            }

            // Exact overlap: both sides complete.
            Ordering::Equal => {
                let quantity = resting_outstanding;
                reduce(book, resting_id, quantity)?;
                reduce(book, incoming_id, quantity)?;

                fills.push(Fill {
                    resting_id,
                    incoming_id,
                    price: fill_price,
                    quantity,
                    resting_fulfilled: true,
                    incoming_fulfilled: true,
                });
                record_fill(book, resting_id, incoming_id, fill_price, quantity, executed_at)?;
                book.mark_fulfilled(resting_id, fill_price, executed_at);
                book.mark_fulfilled(incoming_id, fill_price, executed_at);

                return Ok(fills);
            }

            // Incoming exhausted; the resting order keeps its remainder.
            Ordering::Greater => {
                let quantity = incoming_outstanding;
                reduce(book, resting_id, quantity)?;
                reduce(book, incoming_id, quantity)?;

                fills.push(Fill {
                    resting_id,
                    incoming_id,
                    price: fill_price,
                    quantity,
                    resting_fulfilled: false,
                    incoming_fulfilled: true,
                });
                record_fill(book, resting_id, incoming_id, fill_price, quantity, executed_at)?;
                book.mark_fulfilled(incoming_id, fill_price, executed_at);

                return Ok(fills);
            }
        }
    }
}

fn reduce(book: &mut SymbolBook, order_id: OrderId, quantity: u32) -> Result<(), MatchError> {
    book.order_mut(order_id)
        .ok_or(MatchError::UnknownOrder(order_id))?
        .reduce_outstanding(quantity);
    Ok(())
}

fn record_fill(
    book: &mut SymbolBook,
    resting_id: OrderId,
    incoming_id: OrderId,
    price: Price,
    quantity: u32,
    executed_at: i64,
) -> Result<(), MatchError> {
    let resting_side = book
        .order(resting_id)
        .ok_or(MatchError::UnknownOrder(resting_id))?
        .side();
    let (bid_id, ask_id) = match resting_side {
        Side::Bid => (resting_id, incoming_id),
        Side::Ask => (incoming_id, resting_id),
    };

    let transaction =
        Transaction::new(bid_id, ask_id, book.instrument(), price, quantity, executed_at);
    book.record_transaction(transaction);
    Ok(())
}
