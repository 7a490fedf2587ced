//! Uniform-random order generation
//!
//! Fallback generation path used when the pricer is disabled: attributes
//! are drawn from the config bounds with no reference to market state.
//! Option Greeks are drawn inside plausible static bounds rather than
//! computed.

use rand::Rng;

use types::config::Config;
use types::instrument::{OptionContract, OptionKind};
use types::order::{Greeks, OptionDetails, Side};

use crate::synth::uniform_2dp;
use crate::{OptionQuote, SpotQuote};

/// Random option premium and strike as fractions of the configured mid.
const PRICE_PCT_OF_UNDERLYING: (f64, f64) = (0.01, 0.1);
const STRIKE_PCT_OF_UNDERLYING: (f64, f64) = (0.8, 1.2);

const DELTA_BOUNDS: (f64, f64) = (0.05, 0.95);
const GAMMA_BOUNDS: (f64, f64) = (0.001, 0.15);
const THETA_BOUNDS: (f64, f64) = (0.01, 0.5);
const VEGA_BOUNDS: (f64, f64) = (0.01, 0.8);

fn random_side<R: Rng>(rng: &mut R) -> Side {
    if rng.gen_bool(0.5) {
        Side::Bid
    } else {
        Side::Ask
    }
}

/// Uniform price, quantity, and side from the config bounds.
pub fn random_spot_quote<R: Rng>(rng: &mut R, config: &Config) -> SpotQuote {
    SpotQuote {
        side: random_side(rng),
        price: uniform_2dp(rng, config.min_price, config.max_price),
        quantity: rng.gen_range(config.min_qnty..=config.max_qnty.max(config.min_qnty)),
    }
}

fn random_option_price<R: Rng>(rng: &mut R, config: &Config) -> f64 {
    let pct = uniform_2dp(rng, PRICE_PCT_OF_UNDERLYING.0, PRICE_PCT_OF_UNDERLYING.1);
    let mid = (config.min_price + config.max_price) / 2.0;
    ((mid * pct) * 100.0).round() / 100.0
}

fn random_strike<R: Rng>(rng: &mut R, config: &Config) -> f64 {
    let pct = uniform_2dp(rng, STRIKE_PCT_OF_UNDERLYING.0, STRIKE_PCT_OF_UNDERLYING.1);
    let mid = (config.min_price + config.max_price) / 2.0;
    ((mid * pct) * 100.0).round() / 100.0
}

/// Expiry in years from a uniform draw over the configured day range,
/// floored at one month.
fn random_expiry<R: Rng>(rng: &mut R, config: &Config) -> f64 {
    let days = rng.gen_range(config.min_expiry_days..=config.max_expiry_days.max(config.min_expiry_days));
    let months = (days as f64 / 30.0).max(1.0);
    months / 12.0
}

fn random_greeks<R: Rng>(rng: &mut R, kind: OptionKind) -> Greeks {
    let delta = uniform_2dp(rng, DELTA_BOUNDS.0, DELTA_BOUNDS.1);
    Greeks {
        delta: if kind == OptionKind::Call { delta } else { -delta },
        gamma: uniform_2dp(rng, GAMMA_BOUNDS.0, GAMMA_BOUNDS.1),
        theta: -uniform_2dp(rng, THETA_BOUNDS.0, THETA_BOUNDS.1),
        vega: uniform_2dp(rng, VEGA_BOUNDS.0, VEGA_BOUNDS.1),
    }
}

/// Random option attributes for a contract; the call/put tag comes from the
/// contract symbol.
pub fn random_option_quote<R: Rng>(
    rng: &mut R,
    config: &Config,
    contract: OptionContract,
) -> OptionQuote {
    let kind = contract.kind;
    OptionQuote {
        side: random_side(rng),
        price: random_option_price(rng, config),
        quantity: rng.gen_range(config.min_qnty..=config.max_qnty.max(config.min_qnty)),
        details: OptionDetails {
            strike: random_strike(rng, config),
            kind,
            expiry_years: random_expiry(rng, config),
            greeks: random_greeks(rng, kind),
        },
    }
}
