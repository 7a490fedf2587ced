//! Matching engine service
//!
//! Per-symbol limit order books with price-time-priority matching:
//! FIFO levels keyed by price, partial fills, walk-through of crossable
//! levels, self-trade prevention, and per-symbol locking for the worker
//! pool.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced within a symbol
//! - The book is uncrossed (or one-sided) after every completed match
//! - Outstanding quantity is monotone non-increasing
//! - No self-trades

pub mod book;
pub mod engine;
pub mod matcher;

pub use book::{BookError, BookSnapshot, SymbolBook};
pub use engine::MarketBooks;
pub use matcher::{match_order, Fill, MatchError};
