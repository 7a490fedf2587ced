//! Book registry with per-symbol locking
//!
//! One mutex-guarded `SymbolBook` per pooled instrument, allocated once at
//! pool initialization and never extended afterward, so lock references
//! stay stable for the lifetime of the run. Within one instrument the
//! add-match-update sequence is atomic under its lock; across instruments
//! workers proceed independently.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::Rng;
use types::errors::RegistryError;
use types::instrument::Instrument;
use types::market::PriceData;

use crate::book::SymbolBook;

/// All per-symbol books for a run.
pub struct MarketBooks {
    books: HashMap<Instrument, Mutex<SymbolBook>>,
}

impl MarketBooks {
    /// Build one seeded book per instrument. Each symbol's statistics start
    /// with a random seed price and demand factor.
    pub fn build<R, I>(instruments: I, rng: &mut R) -> Self
    where
        R: Rng,
        I: IntoIterator<Item = Instrument>,
    {
        let books = instruments
            .into_iter()
            .map(|instrument| {
                let stats = PriceData::seeded(rng);
                (instrument, Mutex::new(SymbolBook::new(instrument, stats)))
            })
            .collect();
        Self { books }
    }

    /// The lock guarding an instrument's book and statistics.
    pub fn book(&self, instrument: Instrument) -> Result<&Mutex<SymbolBook>, RegistryError> {
        self.books
            .get(&instrument)
            .ok_or(RegistryError::MissingSymbolData { instrument })
    }

    pub fn instruments(&self) -> impl Iterator<Item = Instrument> + '_ {
        self.books.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use types::instrument::Equity;

    #[test]
    fn test_builds_one_book_per_instrument() {
        let mut rng = StdRng::seed_from_u64(2);
        let instruments = [
            Instrument::Equity(Equity::AAPL),
            Instrument::Equity(Equity::MSFT),
        ];
        let books = MarketBooks::build(instruments, &mut rng);

        assert_eq!(books.len(), 2);
        for instrument in instruments {
            let book = books.book(instrument).unwrap().lock();
            assert_eq!(book.instrument(), instrument);
            assert!(book.stats.last_price > 0.0);
        }
    }

    #[test]
    fn test_unknown_instrument_is_an_error() {
        let mut rng = StdRng::seed_from_u64(2);
        let books = MarketBooks::build([Instrument::Equity(Equity::AAPL)], &mut rng);

        let missing = books.book(Instrument::Equity(Equity::GS));
        assert!(matches!(missing, Err(RegistryError::MissingSymbolData { .. })));
    }
}
