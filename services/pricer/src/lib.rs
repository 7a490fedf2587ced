//! Pricer service
//!
//! Synthesizes realistic order attributes from per-symbol market state and
//! folds match outcomes back into that state. Spot instruments draw against
//! a maintained spread; options are valued with Black-Scholes off their
//! underlying equity and quoted around the theoretical price. A uniform
//! random generation path exists for runs with the pricer disabled.
//!
//! All synthesis and update calls operate on `PriceData` borrowed under the
//! owning symbol's lock; option synthesis takes a snapshot of the
//! underlying equity's statistics taken under that symbol's own lock.

pub mod black_scholes;
pub mod random_orders;
pub mod strike;
pub mod synth;

use rand::Rng;

use types::instrument::{Future, OptionContract};
use types::market::{PriceData, MA_RANGE};
use types::order::{OptionDetails, Order, Side};

pub use black_scholes::{MIN_VOL, RISK_FREE_RATE};
pub use random_orders::{random_option_quote, random_spot_quote};

/// Synthesized attributes for a spot (equity or future) order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotQuote {
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
}

/// Synthesized attributes for an option order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionQuote {
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
    pub details: OptionDetails,
}

/// Synthesize an equity order from the symbol's market state.
pub fn synthesize_equity<R: Rng>(rng: &mut R, data: &mut PriceData) -> SpotQuote {
    let side = synth::sample_side(rng, data);
    let (adjusted_ask, adjusted_bid) = synth::equity_adjusted_quotes(rng, data);
    let price = synth::sample_price(rng, side, adjusted_ask, adjusted_bid, data.demand_factor);
    let quantity = synth::sample_quantity(rng, data, price);

    SpotQuote { side, price, quantity }
}

/// Synthesize a futures order: the equity pipeline with a recomputed spread
/// and cost-of-carry shifted quotes.
pub fn synthesize_future<R: Rng>(rng: &mut R, future: Future, data: &mut PriceData) -> SpotQuote {
    let side = synth::sample_side(rng, data);
    let carry = synth::carry_adjustment(data.last_price, future.month.years_to_expiry());
    let (adjusted_ask, adjusted_bid) = synth::future_adjusted_quotes(data, carry);
    let price = synth::sample_price(rng, side, adjusted_ask, adjusted_bid, data.demand_factor);
    let quantity = synth::sample_quantity(rng, data, price);

    SpotQuote { side, price, quantity }
}

/// Synthesize an option order.
///
/// `underlying` is a snapshot of the underlying equity's statistics; the
/// option's own `data` feeds side, spread, and quantity sampling. The
/// Black-Scholes value anchors the quoted spread, and the Greeks are fixed
/// into the order at creation.
pub fn synthesize_option<R: Rng>(
    rng: &mut R,
    contract: OptionContract,
    data: &mut PriceData,
    underlying: &PriceData,
) -> OptionQuote {
    let spot = underlying.last_price;
    let sigma = underlying.volatility().max(MIN_VOL);
    let expiry_years = contract.month.years_to_expiry();
    let kind = contract.kind;

    let strike = strike::select_strike(rng, kind, spot);
    let theoretical = black_scholes::price(kind, spot, strike, sigma, expiry_years);
    let greeks = black_scholes::greeks(kind, spot, strike, sigma, expiry_years);

    let side = synth::sample_side(rng, data);
    let (adjusted_ask, adjusted_bid) = synth::option_adjusted_quotes(rng, data, theoretical);
    let price = synth::sample_price(rng, side, adjusted_ask, adjusted_bid, data.demand_factor);
    let quantity = synth::sample_quantity(rng, data, price);

    OptionQuote {
        side,
        price,
        quantity,
        details: OptionDetails { strike, kind, expiry_years, greeks },
    }
}

/// Fold a processed order back into the symbol's statistics.
///
/// Called exactly once per order, under the symbol lock. A matched order
/// updates last price, EWMA variance, the moving average and price moments,
/// the execution count, the demand factor, and improves the stored quotes.
/// An unmatched order can only widen the stored quotes with its resting
/// price.
pub fn update_market_data<R: Rng>(rng: &mut R, data: &mut PriceData, order: &Order) {
    let is_bid = order.side() == Side::Bid;

    if order.is_matched() {
        let matched_price = order.price().as_f64();

        if is_bid && data.highest_bid.map_or(true, |bid| bid < matched_price) {
            data.highest_bid = Some(matched_price);
        }
        if !is_bid && data.lowest_ask.map_or(true, |ask| ask > matched_price) {
            data.lowest_ask = Some(matched_price);
        }

        data.last_price = matched_price;
        data.update_volatility(matched_price);

        if data.executions >= MA_RANGE {
            data.prices_sum += matched_price;
            data.prices_sum_squared += matched_price * matched_price;

            // Slide the window average in O(1).
            let n = data.executions.min(MA_RANGE) as f64;
            data.moving_average = (data.moving_average * n + matched_price) / (n + 1.0);
        } else if data.executions == 0 {
            data.moving_average = matched_price;
        }

        data.executions += 1;
        data.demand_factor = synth::updated_demand_factor(rng, data);
    } else {
        let order_price = order.price().as_f64();

        if is_bid && data.highest_bid.map_or(true, |bid| bid < order_price) {
            data.highest_bid = Some(order_price);
        }
        if !is_bid && data.lowest_ask.map_or(true, |ask| ask > order_price) {
            data.lowest_ask = Some(order_price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use types::instrument::{
        Equity, ExpiryMonth, FutureTicker, Instrument, OptionKind, OptionTicker,
    };
    use types::numeric::Price;
    use types::order::OrderId;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(404)
    }

    fn matched_order(id: u64, side: Side, price: f64) -> Order {
        let mut order = Order::create(
            OrderId(id),
            Instrument::Equity(Equity::AAPL),
            side,
            price,
            10,
            id as i64,
        )
        .unwrap();
        order.reduce_outstanding(10);
        order.mark_fulfilled(Price::from_f64(price).unwrap(), id as i64 + 1);
        order
    }

    fn resting_order(id: u64, side: Side, price: f64) -> Order {
        Order::create(
            OrderId(id),
            Instrument::Equity(Equity::AAPL),
            side,
            price,
            10,
            id as i64,
        )
        .unwrap()
    }

    #[test]
    fn test_equity_synthesis_produces_valid_attributes() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.3);

        for _ in 0..100 {
            let quote = synthesize_equity(&mut rng, &mut data);
            assert!(quote.price >= 1.0);
            assert!(quote.quantity >= 1);
        }
    }

    #[test]
    fn test_future_synthesis_shifts_by_carry() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);
        let future = Future { ticker: FutureTicker::AAPL, month: ExpiryMonth::Dec26 };

        let mut sum = 0.0;
        let n = 200;
        for _ in 0..n {
            let mut fresh = data.clone();
            sum += synthesize_future(&mut rng, future, &mut fresh).price;
        }
        // Carry lifts the average quote above spot.
        assert!(sum / n as f64 > 100.0);
    }

    #[test]
    fn test_option_synthesis_fixes_contract_details() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(5.0, 0.0);
        let mut underlying = PriceData::with_seed(150.0, 0.0);
        underlying.ewma_variance = 0.0002;

        let contract = OptionContract {
            ticker: OptionTicker::AAPL,
            month: ExpiryMonth::Sep26,
            kind: OptionKind::Put,
        };

        for _ in 0..50 {
            let quote = synthesize_option(&mut rng, contract, &mut data, &underlying);
            assert_eq!(quote.details.kind, OptionKind::Put);
            assert_eq!(quote.details.expiry_years, contract.month.years_to_expiry());
            assert!(quote.details.strike > 0.0);
            assert!((-1.0..=0.0).contains(&quote.details.greeks.delta));
            assert!(quote.details.greeks.gamma > 0.0);
            assert!(quote.price >= 1.0);
            assert!(quote.quantity >= 1);
        }
    }

    #[test]
    fn test_matched_update_advances_statistics() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);

        update_market_data(&mut rng, &mut data, &matched_order(1, Side::Bid, 101.0));

        assert_eq!(data.last_price, 101.0);
        assert_eq!(data.executions, 1);
        assert_eq!(data.moving_average, 101.0);
        assert_eq!(data.highest_bid, Some(101.0));
        assert_eq!(data.lowest_ask, None);
    }

    #[test]
    fn test_moving_average_slides_after_window_fills() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);

        for i in 0..MA_RANGE {
            update_market_data(&mut rng, &mut data, &matched_order(i as u64 + 1, Side::Bid, 100.0));
        }
        assert_eq!(data.executions, MA_RANGE);
        assert_eq!(data.moving_average, 100.0);
        assert_eq!(data.prices_sum, 0.0);

        update_market_data(&mut rng, &mut data, &matched_order(99, Side::Bid, 111.0));
        assert_eq!(data.executions, MA_RANGE + 1);
        assert_eq!(data.prices_sum, 111.0);
        // (100 * 10 + 111) / 11
        assert!((data.moving_average - 1111.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_update_only_widens_quotes() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.25);
        let before_demand = data.demand_factor;

        update_market_data(&mut rng, &mut data, &resting_order(1, Side::Bid, 99.0));
        assert_eq!(data.highest_bid, Some(99.0));
        assert_eq!(data.executions, 0);
        assert_eq!(data.demand_factor, before_demand);

        // A lower bid does not displace the stored best.
        update_market_data(&mut rng, &mut data, &resting_order(2, Side::Bid, 95.0));
        assert_eq!(data.highest_bid, Some(99.0));

        update_market_data(&mut rng, &mut data, &resting_order(3, Side::Ask, 104.0));
        assert_eq!(data.lowest_ask, Some(104.0));
    }

    #[test]
    fn test_ewma_volatility_tracks_matched_prices() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);

        update_market_data(&mut rng, &mut data, &matched_order(1, Side::Bid, 100.0));
        assert_eq!(data.ewma_variance, 0.0);

        update_market_data(&mut rng, &mut data, &matched_order(2, Side::Ask, 104.0));
        assert!(data.ewma_variance > 0.0);
        assert!(data.volatility() > 0.0);
    }

    /// Put-call parity with volatility accumulated from small price moves.
    #[test]
    fn test_parity_with_accumulated_volatility() {
        let mut rng = rng();
        let mut underlying = PriceData::with_seed(150.0, 0.0);
        let mut price = 150.0;
        for i in 0..40 {
            price += if i % 2 == 0 { 0.4 } else { -0.4 };
            update_market_data(&mut rng, &mut underlying, &matched_order(i + 1, Side::Bid, price));
        }
        underlying.last_price = 150.0;

        let sigma = underlying.volatility().max(MIN_VOL);
        assert!(sigma > 0.0);

        let spot = 150.0;
        let strike = 150.0;
        let expiry = 0.25;
        let call = black_scholes::price(OptionKind::Call, spot, strike, sigma, expiry);
        let put = black_scholes::price(OptionKind::Put, spot, strike, sigma, expiry);
        let forward = spot - strike * (-RISK_FREE_RATE * expiry).exp();

        assert!((call - put - forward).abs() < 0.01);
    }
}
