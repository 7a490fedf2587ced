//! Order book infrastructure
//!
//! One `SymbolBook` per pooled instrument: a central order store for O(1)
//! lookup by id, two price-keyed level maps (bids and asks), the symbol's
//! running market statistics, and the fill log. `BTreeMap` keys double as
//! the sorted price index, so the best quote on either side is a borrow of
//! the first or last key.

pub mod price_level;

pub use price_level::PriceLevel;

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use thiserror::Error;
use types::instrument::Instrument;
use types::market::PriceData;
use types::numeric::Price;
use types::order::{Order, OrderId, Side};
use types::transaction::Transaction;

/// Book-level failures surfaced to the matcher. All non-fatal: the incoming
/// order simply rests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("No {side} orders found for ticker {instrument}")]
    NoOppositeOrders { instrument: Instrument, side: Side },

    #[error("No matching ask orders lower than or equal to bid price")]
    NoCrossableAsk,

    #[error("No matching bid orders higher than or equal to ask price")]
    NoCrossableBid,
}

/// Read-only depth view of one side: (price, resting quantity) per level,
/// best first.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub instrument: Instrument,
    pub bids: Vec<(Price, u32)>,
    pub asks: Vec<(Price, u32)>,
}

/// The complete book for a single instrument.
#[derive(Debug)]
pub struct SymbolBook {
    instrument: Instrument,
    /// All orders ever added, including filled ones, indexed by id.
    pub(crate) orders: HashMap<OrderId, Order>,
    /// Buy levels; best bid is the last key.
    pub(crate) bids: BTreeMap<Price, PriceLevel>,
    /// Sell levels; best ask is the first key.
    pub(crate) asks: BTreeMap<Price, PriceLevel>,
    /// Running statistics, mutated by the pricer under the symbol lock.
    pub stats: PriceData,
    transactions: Vec<Transaction>,
}

impl SymbolBook {
    pub fn new(instrument: Instrument, stats: PriceData) -> Self {
        Self {
            instrument,
            orders: HashMap::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            stats,
            transactions: Vec::new(),
        }
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    // === Order access ===

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn order_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&order_id)
    }

    /// Number of orders ever added (including filled).
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Orders still resting with quantity outstanding.
    pub fn active_order_count(&self) -> usize {
        self.orders.values().filter(|o| !o.is_matched()).count()
    }

    // === Book mutation ===

    /// Add an order to its side's FIFO level, creating the level if this is
    /// the first order at that price.
    ///
    /// # Panics
    /// Panics if an order with the same id was already added.
    pub fn insert_order(&mut self, order: Order) {
        assert!(
            !self.orders.contains_key(&order.id()),
            "order {} already exists in {} book",
            order.id(),
            self.instrument
        );

        let side = order.side();
        let price = order.limit_price();
        let order_id = order.id();
        self.orders.insert(order_id, order);

        self.side_mut(side).entry(price).or_default().push_back(order_id);
    }

    /// Remove a resting order from its price level, dropping the level when
    /// it empties. The order stays in the central store.
    pub fn remove_from_level(&mut self, order_id: OrderId) -> bool {
        let Some(order) = self.orders.get(&order_id) else {
            return false;
        };
        let side = order.side();
        let price = order.limit_price();

        let levels = self.side_mut(side);
        let Some(level) = levels.get_mut(&price) else {
            return false;
        };

        let removed = level.remove(order_id);
        if level.is_empty() {
            levels.remove(&price);
        }
        removed
    }

    /// Record the match outcome on an order and take it out of the book.
    ///
    /// The matched price may differ from the limit; removal is keyed by the
    /// limit price the order rested at.
    pub fn mark_fulfilled(&mut self, order_id: OrderId, matched_price: Price, at: i64) -> bool {
        if !self.orders.contains_key(&order_id) {
            return false;
        }
        self.remove_from_level(order_id);
        if let Some(order) = self.orders.get_mut(&order_id) {
            order.mark_fulfilled(matched_price, at);
        }
        true
    }

    pub fn record_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    // === Level access ===

    pub(crate) fn side(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    pub fn level(&self, side: Side, price: Price) -> Option<&PriceLevel> {
        self.side(side).get(&price)
    }

    /// Next opposite-side level strictly beyond `price`, walking away from
    /// the incoming order: higher asks for a bid, lower bids for an ask.
    pub fn next_opposite_level(&self, incoming_side: Side, price: Price) -> Option<Price> {
        match incoming_side {
            Side::Bid => self
                .asks
                .range((Excluded(price), Unbounded))
                .next()
                .map(|(p, _)| *p),
            Side::Ask => self
                .bids
                .range((Unbounded, Excluded(price)))
                .next_back()
                .map(|(p, _)| *p),
        }
    }

    // === Best quotes ===

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// The most aggressive opposite-side price crossable by an order with
    /// this side and limit.
    pub fn best_opposite(&self, side: Side, limit: Price) -> Result<Price, BookError> {
        match side {
            Side::Bid => {
                let lowest_ask = self.best_ask().ok_or(BookError::NoOppositeOrders {
                    instrument: self.instrument,
                    side: Side::Ask,
                })?;
                if lowest_ask > limit {
                    return Err(BookError::NoCrossableAsk);
                }
                Ok(lowest_ask)
            }
            Side::Ask => {
                let highest_bid = self.best_bid().ok_or(BookError::NoOppositeOrders {
                    instrument: self.instrument,
                    side: Side::Bid,
                })?;
                if highest_bid < limit {
                    return Err(BookError::NoCrossableBid);
                }
                Ok(highest_bid)
            }
        }
    }

    /// Whether the best bid meets or exceeds the best ask. Transiently true
    /// while a newly inserted order awaits matching; never true after a
    /// completed match.
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Top of book for broadcasting: the best price on each side with any
    /// quantity still outstanding.
    pub fn top_of_book(&self) -> (Option<f64>, Option<f64>) {
        let best_bid = self
            .bids
            .iter()
            .rev()
            .find(|(_, level)| self.level_has_outstanding(level))
            .map(|(price, _)| price.as_f64());
        let best_ask = self
            .asks
            .iter()
            .find(|(_, level)| self.level_has_outstanding(level))
            .map(|(price, _)| price.as_f64());
        (best_bid, best_ask)
    }

    /// Read-only view of both sides for broadcasting and diagnostics,
    /// truncated to `depth` levels per side.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let level_quantity = |level: &PriceLevel| {
            level
                .iter()
                .filter_map(|id| self.orders.get(&id))
                .map(|o| o.outstanding())
                .sum::<u32>()
        };

        BookSnapshot {
            instrument: self.instrument,
            bids: self
                .bids
                .iter()
                .rev()
                .take(depth)
                .map(|(price, level)| (*price, level_quantity(level)))
                .collect(),
            asks: self
                .asks
                .iter()
                .take(depth)
                .map(|(price, level)| (*price, level_quantity(level)))
                .collect(),
        }
    }

    fn level_has_outstanding(&self, level: &PriceLevel) -> bool {
        level
            .iter()
            .any(|id| self.orders.get(&id).map_or(false, |o| o.outstanding() > 0))
    }

    /// Sorted bid prices, descending (diagnostics and tests).
    pub fn bid_prices(&self) -> Vec<Price> {
        self.bids.keys().rev().copied().collect()
    }

    /// Sorted ask prices, ascending (diagnostics and tests).
    pub fn ask_prices(&self) -> Vec<Price> {
        self.asks.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::instrument::Equity;

    fn book() -> SymbolBook {
        SymbolBook::new(
            Instrument::Equity(Equity::AAPL),
            PriceData::with_seed(100.0, 0.0),
        )
    }

    fn order(id: u64, side: Side, price: f64, qty: i64) -> Order {
        Order::create(
            OrderId(id),
            Instrument::Equity(Equity::AAPL),
            side,
            price,
            qty,
            id as i64,
        )
        .unwrap()
    }

    #[test]
    fn test_new_book_is_empty() {
        let book = book();
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_insert_updates_best_quotes() {
        let mut book = book();
        book.insert_order(order(1, Side::Bid, 100.0, 10));
        book.insert_order(order(2, Side::Ask, 101.0, 10));

        assert_eq!(book.best_bid(), Some(Price::from_u64(100)));
        assert_eq!(book.best_ask(), Some(Price::from_u64(101)));
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_price_key_exists_iff_level_non_empty() {
        let mut book = book();
        book.insert_order(order(1, Side::Bid, 100.0, 10));
        book.insert_order(order(2, Side::Bid, 100.0, 5));
        assert_eq!(book.bid_prices().len(), 1);

        book.remove_from_level(OrderId(1));
        assert_eq!(book.bid_prices().len(), 1);

        book.remove_from_level(OrderId(2));
        assert!(book.bid_prices().is_empty());
        assert!(book.bids.is_empty());
    }

    #[test]
    fn test_best_opposite_requires_a_cross() {
        let mut book = book();
        book.insert_order(order(1, Side::Ask, 110.0, 10));

        let err = book
            .best_opposite(Side::Bid, Price::from_u64(100))
            .unwrap_err();
        assert_eq!(err, BookError::NoCrossableAsk);

        let best = book.best_opposite(Side::Bid, Price::from_u64(110)).unwrap();
        assert_eq!(best, Price::from_u64(110));
    }

    #[test]
    fn test_best_opposite_errors_on_empty_side() {
        let book = book();
        let err = book
            .best_opposite(Side::Bid, Price::from_u64(100))
            .unwrap_err();
        assert!(matches!(err, BookError::NoOppositeOrders { side: Side::Ask, .. }));
    }

    #[test]
    fn test_next_opposite_level_walks_away_from_incoming() {
        let mut book = book();
        book.insert_order(order(1, Side::Ask, 101.0, 10));
        book.insert_order(order(2, Side::Ask, 103.0, 10));
        book.insert_order(order(3, Side::Bid, 99.0, 10));
        book.insert_order(order(4, Side::Bid, 97.0, 10));

        assert_eq!(
            book.next_opposite_level(Side::Bid, Price::from_u64(101)),
            Some(Price::from_u64(103))
        );
        assert_eq!(book.next_opposite_level(Side::Bid, Price::from_u64(103)), None);
        assert_eq!(
            book.next_opposite_level(Side::Ask, Price::from_u64(99)),
            Some(Price::from_u64(97))
        );
    }

    #[test]
    fn test_mark_fulfilled_removes_at_limit_price() {
        let mut book = book();
        book.insert_order(order(1, Side::Bid, 105.0, 10));
        if let Some(o) = book.order_mut(OrderId(1)) {
            o.reduce_outstanding(10);
        }

        // Matched at a different price than the limit it rested at.
        assert!(book.mark_fulfilled(OrderId(1), Price::from_u64(103), 99));
        assert!(book.bids.is_empty());

        let o = book.order(OrderId(1)).unwrap();
        assert!(o.is_matched());
        assert_eq!(o.price(), Price::from_u64(103));
    }

    #[test]
    fn test_top_of_book_skips_exhausted_orders() {
        let mut book = book();
        book.insert_order(order(1, Side::Bid, 100.0, 10));
        book.insert_order(order(2, Side::Bid, 99.0, 10));

        if let Some(o) = book.order_mut(OrderId(1)) {
            o.reduce_outstanding(10);
        }

        let (best_bid, best_ask) = book.top_of_book();
        assert_eq!(best_bid, Some(99.0));
        assert_eq!(best_ask, None);
    }

    #[test]
    fn test_snapshot_orders_sides_best_first() {
        let mut book = book();
        book.insert_order(order(1, Side::Bid, 100.0, 10));
        book.insert_order(order(2, Side::Bid, 99.0, 5));
        book.insert_order(order(3, Side::Bid, 99.0, 5));
        book.insert_order(order(4, Side::Ask, 101.0, 7));

        let snap = book.snapshot(10);
        assert_eq!(snap.bids, vec![
            (Price::from_u64(100), 10),
            (Price::from_u64(99), 10),
        ]);
        assert_eq!(snap.asks, vec![(Price::from_u64(101), 7)]);

        // Depth truncation keeps the most aggressive levels.
        let shallow = book.snapshot(1);
        assert_eq!(shallow.bids.len(), 1);
        assert_eq!(shallow.bids[0].0, Price::from_u64(100));
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn test_duplicate_insert_panics() {
        let mut book = book();
        book.insert_order(order(1, Side::Bid, 100.0, 10));
        book.insert_order(order(1, Side::Bid, 100.0, 10));
    }
}
