//! Quote and quantity synthesis from market state
//!
//! The sampled side follows the demand factor, the drawn price follows the
//! maintained spread (cross, inside, or at the quoted prices), and the
//! quantity scales with demand and inversely with price and volatility.
//! Equity spreads blend toward a moving-average target; futures recompute
//! theirs each call and carry a cost-of-carry shift; options anchor the
//! same maintenance on the Black-Scholes theoretical price.

use rand::Rng;

use types::market::PriceData;
use types::order::Side;

use crate::black_scholes::RISK_FREE_RATE;

/// Notional budget a synthesized order sizes against.
const BASE_ORDER_VALUE: f64 = 10_000.0;

/// Order placement style probabilities; the remainder rests at the quote.
const CROSS_SPREAD_PROB: f64 = 0.3;
const INSIDE_SPREAD_PROB: f64 = 0.2;

// Equity spread maintenance.
const EQUITY_INITIAL_SPREAD_PCT: f64 = 0.002;
const EQUITY_BASE_SPREAD_PCT: f64 = 0.002;
const EQUITY_VOL_SPREAD_MULTIPLIER: f64 = 0.0015;
const EQUITY_SPREAD_ADJUSTMENT_WEIGHT: f64 = 0.95;
const EQUITY_TARGET_ADJUSTMENT_WEIGHT: f64 = 0.05;
const EQUITY_MIN_EXECS_FOR_SPREAD: u32 = 10;
const EQUITY_TRANSIENT_DRIFT_PCT: f64 = 0.025;

// Future spread maintenance.
const FUTURE_INITIAL_SPREAD_PCT: f64 = 0.01;
const FUTURE_BASE_SPREAD_PCT: f64 = 0.005;
const FUTURE_VOL_SPREAD_MULTIPLIER: f64 = 0.01;

// Price draws relative to the half-spread.
const INSIDE_SPREAD_SHIFT_FACTOR: f64 = 0.5;
const INSIDE_SPREAD_RANGE_FACTOR: f64 = 0.3;
const CROSS_SPREAD_OFFSET_FACTOR: f64 = 0.5;

// Quantity scaling.
const MIN_DEMAND_SCALE: f64 = 0.3;
const MAX_DEMAND_SCALE: f64 = 0.7;
const MAX_VOL_ADJUSTMENT: f64 = 0.5;
const MIN_QUANTITY_THRESHOLD: i64 = 10;
const MIN_QUANTITY: i64 = 1;

/// Quoted prices carry two decimals; random draws are rounded the same way.
pub fn uniform_2dp<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let value = rng.gen_range(low..=high);
    (value * 100.0).round() / 100.0
}

/// Placement of a synthesized order relative to the maintained spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStyle {
    CrossSpread,
    InsideSpread,
    AtSpread,
}

pub fn draw_order_style<R: Rng>(rng: &mut R) -> OrderStyle {
    let roll = uniform_2dp(rng, 0.0, 1.0);
    if roll < CROSS_SPREAD_PROB {
        OrderStyle::CrossSpread
    } else if roll < CROSS_SPREAD_PROB + INSIDE_SPREAD_PROB {
        OrderStyle::InsideSpread
    } else {
        OrderStyle::AtSpread
    }
}

/// Side for a draw `u` in (-1, 1) given the squared demand factor `p`:
/// bids in (0, p), asks in (-p, 0), everything else undecided.
pub(crate) fn side_for_draw(u: f64, p: f64) -> Option<Side> {
    if u > 0.0 && u < p {
        Some(Side::Bid)
    } else if u < 0.0 && u > -p {
        Some(Side::Ask)
    } else {
        None
    }
}

/// Sample the market side: a stronger demand factor biases toward the
/// dominant side, the rest is a coin flip.
pub fn sample_side<R: Rng>(rng: &mut R, data: &PriceData) -> Side {
    let p = data.demand_factor * data.demand_factor;
    let u = uniform_2dp(rng, -1.0, 1.0);

    match side_for_draw(u, p) {
        Some(side) => side,
        None => {
            if rng.gen_bool(0.5) {
                Side::Bid
            } else {
                Side::Ask
            }
        }
    }
}

/// Draw an order price against the adjusted quotes.
///
/// Bids follow bullish momentum (cross lifts the ask and beyond), asks the
/// mirror image. Collapses to the anchor quote when the spread is shut.
/// Never returns below $1.
pub fn sample_price<R: Rng>(
    rng: &mut R,
    side: Side,
    lowest_ask: f64,
    highest_bid: f64,
    demand_factor: f64,
) -> f64 {
    let style = draw_order_style(rng);

    let spread = lowest_ask - highest_bid;
    let mid = (lowest_ask + highest_bid) / 2.0;
    let half_spread = mid - highest_bid;

    let price = match (side, style) {
        (Side::Bid, OrderStyle::AtSpread) => highest_bid,
        (Side::Ask, OrderStyle::AtSpread) => lowest_ask,

        (side, OrderStyle::InsideSpread) => {
            if spread > 0.0 {
                let shift = half_spread * demand_factor * INSIDE_SPREAD_SHIFT_FACTOR;
                let target = mid + shift;
                let range = half_spread * INSIDE_SPREAD_RANGE_FACTOR;

                let lower = highest_bid.max(target - range);
                let upper = lowest_ask.min(target + range);
                uniform_2dp(rng, lower, upper)
            } else if side == Side::Bid {
                highest_bid
            } else {
                lowest_ask
            }
        }

        (Side::Bid, OrderStyle::CrossSpread) => {
            if spread > 0.0 {
                let offset = half_spread * demand_factor.abs() * CROSS_SPREAD_OFFSET_FACTOR;
                uniform_2dp(rng, lowest_ask, lowest_ask + offset)
            } else {
                lowest_ask
            }
        }

        (Side::Ask, OrderStyle::CrossSpread) => {
            if spread > 0.0 {
                let offset = half_spread * demand_factor.abs() * CROSS_SPREAD_OFFSET_FACTOR;
                uniform_2dp(rng, (highest_bid - offset).max(1.0), highest_bid)
            } else {
                highest_bid
            }
        }
    };

    price.max(1.0)
}

/// Maintain the equity spread and return drifted (ask, bid) quotes.
///
/// A fresh symbol widens a narrow band around the seed price. Once enough
/// executions have accumulated, the stored quotes blend slowly toward a
/// volatility-scaled target around the moving average. Each call then adds
/// an independent transient drift to either side.
pub fn equity_adjusted_quotes<R: Rng>(rng: &mut R, data: &mut PriceData) -> (f64, f64) {
    if data.highest_bid.is_none() && data.lowest_ask.is_none() {
        let initial = data.last_price;
        let width = initial * EQUITY_INITIAL_SPREAD_PCT;
        data.highest_bid = Some(initial - width / 2.0);
        data.lowest_ask = Some(initial + width / 2.0);
    } else if data.executions >= EQUITY_MIN_EXECS_FOR_SPREAD {
        let base = data.moving_average;
        let sigma = data.std_deviation();
        let width = base * (EQUITY_BASE_SPREAD_PCT + sigma * EQUITY_VOL_SPREAD_MULTIPLIER);

        let target_bid = base - width / 2.0;
        let target_ask = base + width / 2.0;

        let bid = data.highest_bid.unwrap_or(target_bid);
        let ask = data.lowest_ask.unwrap_or(target_ask);
        data.highest_bid = Some(
            bid * EQUITY_SPREAD_ADJUSTMENT_WEIGHT + target_bid * EQUITY_TARGET_ADJUSTMENT_WEIGHT,
        );
        data.lowest_ask = Some(
            ask * EQUITY_SPREAD_ADJUSTMENT_WEIGHT + target_ask * EQUITY_TARGET_ADJUSTMENT_WEIGHT,
        );
    }

    let bid_drift = uniform_2dp(rng, -EQUITY_TRANSIENT_DRIFT_PCT, EQUITY_TRANSIENT_DRIFT_PCT);
    let ask_drift = uniform_2dp(rng, -EQUITY_TRANSIENT_DRIFT_PCT, EQUITY_TRANSIENT_DRIFT_PCT);

    let adjusted_bid = data.highest_bid.unwrap_or(data.last_price) * (1.0 + bid_drift);
    let adjusted_ask = data.lowest_ask.unwrap_or(data.last_price) * (1.0 + ask_drift);
    (adjusted_ask, adjusted_bid)
}

/// Cost of carry for a future: `spot * (e^{rT} - 1)`.
pub fn carry_adjustment(spot: f64, years_to_expiry: f64) -> f64 {
    spot * (RISK_FREE_RATE * years_to_expiry).exp() - spot
}

/// Recompute the future's spread around its base price and return carry-
/// shifted (ask, bid) quotes.
pub fn future_adjusted_quotes(data: &mut PriceData, carry: f64) -> (f64, f64) {
    let base = if data.executions > 0 {
        data.moving_average
    } else {
        data.last_price
    };

    let width = if data.executions > 1 {
        base * (FUTURE_BASE_SPREAD_PCT + data.std_deviation() * FUTURE_VOL_SPREAD_MULTIPLIER)
    } else {
        base * FUTURE_INITIAL_SPREAD_PCT
    };

    let bid = base - width / 2.0;
    let ask = base + width / 2.0;
    data.highest_bid = Some(bid);
    data.lowest_ask = Some(ask);

    (ask + carry, bid + carry)
}

/// Maintain the option's spread around the Black-Scholes theoretical price
/// and return drifted (ask, bid) quotes. Same shape as the equity pipeline,
/// anchored on the model value instead of the moving average.
pub fn option_adjusted_quotes<R: Rng>(
    rng: &mut R,
    data: &mut PriceData,
    theoretical: f64,
) -> (f64, f64) {
    let anchor = theoretical.max(1.0);

    if data.highest_bid.is_none() && data.lowest_ask.is_none() {
        let width = anchor * EQUITY_INITIAL_SPREAD_PCT;
        data.highest_bid = Some(anchor - width / 2.0);
        data.lowest_ask = Some(anchor + width / 2.0);
    } else if data.executions >= EQUITY_MIN_EXECS_FOR_SPREAD {
        let sigma = data.std_deviation();
        let width = anchor * (EQUITY_BASE_SPREAD_PCT + sigma * EQUITY_VOL_SPREAD_MULTIPLIER);

        let target_bid = anchor - width / 2.0;
        let target_ask = anchor + width / 2.0;

        let bid = data.highest_bid.unwrap_or(target_bid);
        let ask = data.lowest_ask.unwrap_or(target_ask);
        data.highest_bid = Some(
            bid * EQUITY_SPREAD_ADJUSTMENT_WEIGHT + target_bid * EQUITY_TARGET_ADJUSTMENT_WEIGHT,
        );
        data.lowest_ask = Some(
            ask * EQUITY_SPREAD_ADJUSTMENT_WEIGHT + target_ask * EQUITY_TARGET_ADJUSTMENT_WEIGHT,
        );
    }

    let bid_drift = uniform_2dp(rng, -EQUITY_TRANSIENT_DRIFT_PCT, EQUITY_TRANSIENT_DRIFT_PCT);
    let ask_drift = uniform_2dp(rng, -EQUITY_TRANSIENT_DRIFT_PCT, EQUITY_TRANSIENT_DRIFT_PCT);

    let adjusted_bid = data.highest_bid.unwrap_or(anchor) * (1.0 + bid_drift);
    let adjusted_ask = data.lowest_ask.unwrap_or(anchor) * (1.0 + ask_drift);
    (adjusted_ask, adjusted_bid)
}

/// Sample an order quantity for a price: demand scales the notional budget
/// up, price and capped volatility scale the share count down.
pub fn sample_quantity<R: Rng>(rng: &mut R, data: &PriceData, price: f64) -> i64 {
    let demand_scale = MIN_DEMAND_SCALE + MAX_DEMAND_SCALE * data.demand_factor.abs();

    let sigma = if data.executions > 1 { data.std_deviation() } else { 0.0 };
    let vol_adjustment = sigma.min(MAX_VOL_ADJUSTMENT);

    let max_quantity = (BASE_ORDER_VALUE * demand_scale / (price * (1.0 + vol_adjustment))) as i64;
    if max_quantity < MIN_QUANTITY_THRESHOLD {
        rng.gen_range(MIN_QUANTITY..=MIN_QUANTITY_THRESHOLD)
    } else {
        rng.gen_range(MIN_QUANTITY..=max_quantity)
    }
}

/// Demand factor after a processed execution: random noise plus a pull back
/// toward the mean when price strays beyond 1.5 sigma of the moving
/// average, then gentle mean reversion toward zero. Randomized outright
/// until two executions exist.
pub fn updated_demand_factor<R: Rng>(rng: &mut R, data: &PriceData) -> f64 {
    if data.executions < 2 {
        return uniform_2dp(rng, -0.3, 0.3);
    }

    let mut df = data.demand_factor + uniform_2dp(rng, -0.05, 0.05);

    let sigma = data.std_deviation();
    let deviation = data.last_price - data.moving_average;
    if deviation > 1.5 * sigma {
        df -= 0.15;
    } else if deviation < -1.5 * sigma {
        df += 0.15;
    }

    df *= 0.95;
    df.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    #[test]
    fn test_side_draw_bands_are_symmetric() {
        assert_eq!(side_for_draw(0.3, 0.5), Some(Side::Bid));
        assert_eq!(side_for_draw(-0.3, 0.5), Some(Side::Ask));
        assert_eq!(side_for_draw(0.7, 0.5), None);
        assert_eq!(side_for_draw(-0.7, 0.5), None);
        assert_eq!(side_for_draw(0.0, 0.5), None);
        // Zero demand factor leaves every draw undecided.
        assert_eq!(side_for_draw(0.4, 0.0), None);
    }

    #[test]
    fn test_order_style_distribution_covers_all_bands() {
        let mut rng = rng();
        let mut seen = [false; 3];
        for _ in 0..500 {
            match draw_order_style(&mut rng) {
                OrderStyle::CrossSpread => seen[0] = true,
                OrderStyle::InsideSpread => seen[1] = true,
                OrderStyle::AtSpread => seen[2] = true,
            }
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn test_sampled_price_never_drops_below_one() {
        let mut rng = rng();
        for _ in 0..500 {
            let price = sample_price(&mut rng, Side::Ask, 1.02, 0.98, -1.0);
            assert!(price >= 1.0, "price {price} below floor");
        }
    }

    #[test]
    fn test_sampled_price_stays_near_the_quotes() {
        let mut rng = rng();
        let (ask, bid) = (101.0, 100.0);
        for side in [Side::Bid, Side::Ask] {
            for _ in 0..500 {
                let price = sample_price(&mut rng, side, ask, bid, 0.5);
                // Cross orders can reach half the half-spread beyond a quote.
                assert!(price >= bid - 1.0, "price {price} far below bid");
                assert!(price <= ask + 1.0, "price {price} far above ask");
            }
        }
    }

    #[test]
    fn test_shut_spread_collapses_to_anchor() {
        let mut rng = rng();
        for _ in 0..50 {
            let bid_price = sample_price(&mut rng, Side::Bid, 100.0, 100.0, 0.4);
            let ask_price = sample_price(&mut rng, Side::Ask, 100.0, 100.0, 0.4);
            assert_eq!(bid_price, 100.0);
            assert_eq!(ask_price, 100.0);
        }
    }

    #[test]
    fn test_fresh_equity_gets_seed_spread() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);

        let (ask, bid) = equity_adjusted_quotes(&mut rng, &mut data);
        assert!((data.highest_bid.unwrap() - 99.9).abs() < 1e-9);
        assert!((data.lowest_ask.unwrap() - 100.1).abs() < 1e-9);
        // Transient drift is bounded at 2.5% either way.
        assert!(bid > 99.9 * 0.97 && bid < 99.9 * 1.03);
        assert!(ask > 100.1 * 0.97 && ask < 100.1 * 1.03);
    }

    #[test]
    fn test_seasoned_equity_blends_toward_moving_average() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);
        data.highest_bid = Some(90.0);
        data.lowest_ask = Some(110.0);
        data.moving_average = 100.0;
        data.executions = 20;

        equity_adjusted_quotes(&mut rng, &mut data);
        let bid = data.highest_bid.unwrap();
        let ask = data.lowest_ask.unwrap();
        // One blend step moves five percent of the way to the target.
        assert!(bid > 90.0 && bid < 91.0);
        assert!(ask < 110.0 && ask > 109.0);
    }

    #[test]
    fn test_future_quotes_carry_the_carry() {
        let mut data = PriceData::with_seed(100.0, 0.0);
        let carry = carry_adjustment(100.0, 0.25);
        assert!(carry > 0.0);

        let (ask, bid) = future_adjusted_quotes(&mut data, carry);
        let half_width = 100.0 * FUTURE_INITIAL_SPREAD_PCT / 2.0;
        assert!((bid - (100.0 - half_width + carry)).abs() < 1e-9);
        assert!((ask - (100.0 + half_width + carry)).abs() < 1e-9);
        // The stored quotes remain unshifted.
        assert_eq!(data.highest_bid, Some(100.0 - half_width));
        assert_eq!(data.lowest_ask, Some(100.0 + half_width));
    }

    #[test]
    fn test_option_quotes_anchor_on_theoretical_price() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 0.0);

        option_adjusted_quotes(&mut rng, &mut data, 12.0);
        let bid = data.highest_bid.unwrap();
        let ask = data.lowest_ask.unwrap();
        assert!(bid < 12.0 && ask > 12.0);
        assert!((ask - bid - 12.0 * EQUITY_INITIAL_SPREAD_PCT).abs() < 1e-9);
    }

    #[test]
    fn test_quantity_respects_bounds() {
        let mut rng = rng();
        let data = PriceData::with_seed(100.0, 0.5);

        for _ in 0..500 {
            let qty = sample_quantity(&mut rng, &data, 100.0);
            assert!(qty >= MIN_QUANTITY);
            // demand_scale = 0.65, so the cap is 65 shares at $100.
            assert!(qty <= 65, "quantity {qty} above cap");
        }
    }

    #[test]
    fn test_tiny_budget_falls_back_to_small_lots() {
        let mut rng = rng();
        let data = PriceData::with_seed(100.0, 0.0);

        for _ in 0..200 {
            // At $10,000 a share the cap collapses below the threshold.
            let qty = sample_quantity(&mut rng, &data, 10_000.0);
            assert!((MIN_QUANTITY..=MIN_QUANTITY_THRESHOLD).contains(&qty));
        }
    }

    #[test]
    fn test_young_symbols_randomize_demand() {
        let mut rng = rng();
        let data = PriceData::with_seed(100.0, 0.9);
        for _ in 0..100 {
            let df = updated_demand_factor(&mut rng, &data);
            assert!((-0.3..=0.3).contains(&df));
        }
    }

    #[test]
    fn test_demand_factor_stays_clamped_and_reverts() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(100.0, 1.0);
        data.executions = 50;
        data.prices_sum = 5_000.0;
        data.prices_sum_squared = 500_100.0;
        data.moving_average = 100.0;

        for _ in 0..200 {
            data.demand_factor = updated_demand_factor(&mut rng, &data);
            assert!((-1.0..=1.0).contains(&data.demand_factor));
        }
        // Mean reversion keeps it from pinning at the rail.
        assert!(data.demand_factor.abs() < 1.0);
    }

    #[test]
    fn test_high_price_pushes_demand_down() {
        let mut rng = rng();
        let mut data = PriceData::with_seed(200.0, 0.0);
        data.executions = 30;
        data.moving_average = 100.0;
        // Tight history: sigma near zero, price far above the average.
        data.prices_sum = 3_000.0;
        data.prices_sum_squared = 300_000.0;
        data.last_price = 200.0;

        let mut sum = 0.0;
        for _ in 0..100 {
            sum += updated_demand_factor(&mut rng, &data);
        }
        assert!(sum / 100.0 < 0.0, "correction should push demand negative");
    }
}
