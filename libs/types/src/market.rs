//! Per-symbol running market statistics
//!
//! One `PriceData` instance per pooled instrument, regardless of family;
//! family-specific behavior (spread maintenance, carry, Black-Scholes
//! anchoring) lives in the pricer. Mutated only under the same per-symbol
//! lock that guards the order book.

use rand::Rng;

/// Moving-average window length in executions.
pub const MA_RANGE: u32 = 10;

/// EWMA decay for the log-return variance.
pub const EWMA_LAMBDA: f64 = 0.94;

/// Seed price bounds for a freshly pooled instrument.
const SEED_PRICE_MIN: f64 = 10.0;
const SEED_PRICE_MAX: f64 = 200.0;

/// Running statistics for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceData {
    /// Last traded (matched) price.
    pub last_price: f64,
    /// Best bid seen, if any quote has arrived yet.
    pub highest_bid: Option<f64>,
    /// Best ask seen, if any quote has arrived yet.
    pub lowest_ask: Option<f64>,
    /// Side/quantity bias in [-1, 1].
    pub demand_factor: f64,
    /// Smoothed moving average over the last `MA_RANGE` executions.
    pub moving_average: f64,
    /// Count of matched orders folded in so far.
    pub executions: u32,
    /// Running sum of matched prices (population moments).
    pub prices_sum: f64,
    /// Running sum of squared matched prices.
    pub prices_sum_squared: f64,
    /// Previous matched price for the log-return.
    previous_price: f64,
    /// EWMA variance of log returns.
    pub ewma_variance: f64,
}

impl PriceData {
    /// Construct with explicit seeds (tests and replay).
    pub fn with_seed(last_price: f64, demand_factor: f64) -> Self {
        Self {
            last_price,
            highest_bid: None,
            lowest_ask: None,
            demand_factor,
            moving_average: last_price,
            executions: 0,
            prices_sum: 0.0,
            prices_sum_squared: 0.0,
            previous_price: 0.0,
            ewma_variance: 0.0,
        }
    }

    /// Construct with a random seed price and demand factor, as happens when
    /// an instrument's pool is activated.
    pub fn seeded<R: Rng>(rng: &mut R) -> Self {
        let price = (rng.gen_range(SEED_PRICE_MIN..=SEED_PRICE_MAX) * 100.0).round() / 100.0;
        let demand = (rng.gen_range(-1.0..=1.0_f64) * 100.0).round() / 100.0;
        Self::with_seed(price, demand)
    }

    /// Population standard deviation of matched prices from the running
    /// moments. Zero until at least two executions.
    pub fn std_deviation(&self) -> f64 {
        let n = self.executions as f64;
        if self.executions < 2 {
            return 0.0;
        }
        let variance = self.prices_sum_squared / n - (self.prices_sum / n).powi(2);
        variance.max(0.0).sqrt()
    }

    /// Fold a matched price into the EWMA log-return variance.
    ///
    /// The first observation only primes the previous price.
    pub fn update_volatility(&mut self, new_price: f64) {
        if self.previous_price == 0.0 {
            self.previous_price = new_price;
            return;
        }

        let log_return = (new_price / self.previous_price).ln();
        self.ewma_variance =
            EWMA_LAMBDA * self.ewma_variance + (1.0 - EWMA_LAMBDA) * log_return * log_return;
        self.previous_price = new_price;
    }

    /// Annualized volatility from the EWMA variance (252 trading days).
    pub fn volatility(&self) -> f64 {
        (self.ewma_variance * 252.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seeded_values_fall_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..64 {
            let data = PriceData::seeded(&mut rng);
            assert!((SEED_PRICE_MIN..=SEED_PRICE_MAX).contains(&data.last_price));
            assert!((-1.0..=1.0).contains(&data.demand_factor));
            assert_eq!(data.moving_average, data.last_price);
            assert_eq!(data.executions, 0);
        }
    }

    #[test]
    fn test_std_deviation_needs_two_executions() {
        let mut data = PriceData::with_seed(100.0, 0.0);
        data.prices_sum = 100.0;
        data.prices_sum_squared = 10_000.0;
        data.executions = 1;
        assert_eq!(data.std_deviation(), 0.0);
    }

    #[test]
    fn test_std_deviation_from_running_moments() {
        let mut data = PriceData::with_seed(100.0, 0.0);
        // Prices 99, 101: mean 100, population variance 1.
        data.prices_sum = 200.0;
        data.prices_sum_squared = 99.0_f64.powi(2) + 101.0_f64.powi(2);
        data.executions = 2;
        assert!((data.std_deviation() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_volatility_update_only_primes() {
        let mut data = PriceData::with_seed(100.0, 0.0);
        data.update_volatility(100.0);
        assert_eq!(data.ewma_variance, 0.0);
        assert_eq!(data.volatility(), 0.0);
    }

    #[test]
    fn test_ewma_variance_decays_and_stays_non_negative() {
        let mut data = PriceData::with_seed(100.0, 0.0);
        data.update_volatility(100.0);
        data.update_volatility(105.0);
        let after_jump = data.ewma_variance;
        assert!(after_jump > 0.0);

        // Flat prices decay the variance toward zero.
        for _ in 0..50 {
            data.update_volatility(105.0);
            assert!(data.ewma_variance >= 0.0);
        }
        assert!(data.ewma_variance < after_jump);
    }

    #[test]
    fn test_volatility_annualizes_variance() {
        let mut data = PriceData::with_seed(100.0, 0.0);
        data.ewma_variance = 0.0001;
        assert!((data.volatility() - (0.0001_f64 * 252.0).sqrt()).abs() < 1e-12);
    }
}
