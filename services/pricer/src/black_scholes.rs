//! Black-Scholes valuation and Greeks
//!
//! European option pricing from the underlying equity's spot and EWMA
//! volatility. Volatility is floored so freshly seeded underlyings (whose
//! variance is still zero) produce finite prices and sensitivities.

use libm::erf;
use std::f64::consts::SQRT_2;

use types::instrument::OptionKind;
use types::order::Greeks;

/// Risk-free rate used for derivatives pricing.
pub const RISK_FREE_RATE: f64 = 0.05;

/// Floor applied to volatility inputs.
pub const MIN_VOL: f64 = 1e-4;

const INV_SQRT_TWO_PI: f64 = 0.3989422804014327;

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal density.
fn normal_pdf(x: f64) -> f64 {
    INV_SQRT_TWO_PI * (-x * x / 2.0).exp()
}

fn d1_d2(spot: f64, strike: f64, sigma: f64, expiry: f64) -> (f64, f64) {
    let d1 = ((spot / strike).ln() + (RISK_FREE_RATE + sigma * sigma / 2.0) * expiry)
        / (sigma * expiry.sqrt());
    let d2 = d1 - sigma * expiry.sqrt();
    (d1, d2)
}

/// Theoretical option price.
pub fn price(kind: OptionKind, spot: f64, strike: f64, sigma: f64, expiry: f64) -> f64 {
    let sigma = sigma.max(MIN_VOL);
    let (d1, d2) = d1_d2(spot, strike, sigma, expiry);
    let discounted_strike = strike * (-RISK_FREE_RATE * expiry).exp();

    match kind {
        OptionKind::Call => spot * normal_cdf(d1) - discounted_strike * normal_cdf(d2),
        OptionKind::Put => discounted_strike * (1.0 - normal_cdf(d2)) - spot * (1.0 - normal_cdf(d1)),
    }
}

/// Sensitivities of the theoretical price.
pub fn greeks(kind: OptionKind, spot: f64, strike: f64, sigma: f64, expiry: f64) -> Greeks {
    let sigma = sigma.max(MIN_VOL);
    let (d1, d2) = d1_d2(spot, strike, sigma, expiry);

    let n_d1 = normal_pdf(d1);
    let big_n_d1 = normal_cdf(d1);
    let big_n_d2 = normal_cdf(d2);
    let discounted_strike = strike * (-RISK_FREE_RATE * expiry).exp();

    let (delta, theta) = match kind {
        OptionKind::Call => (
            big_n_d1,
            -(spot * n_d1 * sigma) / (2.0 * expiry.sqrt())
                - RISK_FREE_RATE * discounted_strike * big_n_d2,
        ),
        OptionKind::Put => (
            big_n_d1 - 1.0,
            -(spot * n_d1 * sigma) / (2.0 * expiry.sqrt())
                + RISK_FREE_RATE * discounted_strike * (1.0 - big_n_d2),
        ),
    };

    Greeks {
        delta,
        gamma: n_d1 / (spot * sigma * expiry.sqrt()),
        theta,
        vega: spot * expiry.sqrt() * n_d1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-3;

    /// Reference values: S=100, K=100, sigma=0.2, T=1, r=0.05.
    #[test]
    fn test_matches_reference_values() {
        let call = price(OptionKind::Call, 100.0, 100.0, 0.2, 1.0);
        let put = price(OptionKind::Put, 100.0, 100.0, 0.2, 1.0);

        assert!((call - 10.4506).abs() < TOL, "call was {call}");
        assert!((put - 5.5735).abs() < TOL, "put was {put}");
    }

    #[test]
    fn test_put_call_parity_holds() {
        for (spot, strike, sigma, expiry) in [
            (100.0, 100.0, 0.2, 1.0),
            (150.0, 140.0, 0.35, 0.25),
            (80.0, 95.0, 0.1, 0.5),
        ] {
            let call = price(OptionKind::Call, spot, strike, sigma, expiry);
            let put = price(OptionKind::Put, spot, strike, sigma, expiry);
            let forward = spot - strike * (-RISK_FREE_RATE * expiry).exp();
            assert!(
                (call - put - forward).abs() < 1e-9,
                "parity violated at S={spot} K={strike}"
            );
        }
    }

    #[test]
    fn test_prices_are_non_negative() {
        for strike in [50.0, 100.0, 200.0] {
            for sigma in [0.01, 0.2, 0.8] {
                for expiry in [1.0 / 12.0, 0.5, 2.0] {
                    assert!(price(OptionKind::Call, 100.0, strike, sigma, expiry) >= 0.0);
                    assert!(price(OptionKind::Put, 100.0, strike, sigma, expiry) >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_call_price_decreases_with_strike() {
        let mut previous = f64::MAX;
        for strike in [80.0, 90.0, 100.0, 110.0, 120.0] {
            let call = price(OptionKind::Call, 100.0, strike, 0.25, 0.5);
            assert!(call < previous);
            previous = call;
        }
    }

    #[test]
    fn test_put_price_increases_with_strike() {
        let mut previous = f64::MIN;
        for strike in [80.0, 90.0, 100.0, 110.0, 120.0] {
            let put = price(OptionKind::Put, 100.0, strike, 0.25, 0.5);
            assert!(put > previous);
            previous = put;
        }
    }

    #[test]
    fn test_greek_signs_and_ranges() {
        for (strike, sigma, expiry) in [(90.0, 0.2, 0.5), (100.0, 0.35, 1.0), (115.0, 0.1, 0.25)] {
            let call = greeks(OptionKind::Call, 100.0, strike, sigma, expiry);
            assert!((0.0..=1.0).contains(&call.delta));
            assert!(call.gamma > 0.0);
            assert!(call.vega > 0.0);
            assert!(call.theta < 0.0);

            let put = greeks(OptionKind::Put, 100.0, strike, sigma, expiry);
            assert!((-1.0..=0.0).contains(&put.delta));
            assert!(put.gamma > 0.0);
            assert!(put.vega > 0.0);
        }
    }

    #[test]
    fn test_call_and_put_share_gamma_and_vega() {
        let call = greeks(OptionKind::Call, 100.0, 105.0, 0.3, 0.5);
        let put = greeks(OptionKind::Put, 100.0, 105.0, 0.3, 0.5);
        assert!((call.gamma - put.gamma).abs() < 1e-12);
        assert!((call.vega - put.vega).abs() < 1e-12);
    }

    #[test]
    fn test_zero_volatility_is_floored_to_finite_results() {
        let call = price(OptionKind::Call, 100.0, 100.0, 0.0, 0.5);
        assert!(call.is_finite());

        let g = greeks(OptionKind::Call, 100.0, 100.0, 0.0, 0.5);
        assert!(g.delta.is_finite());
        assert!(g.gamma.is_finite());
    }

    #[test]
    fn test_normal_cdf_basics() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!(normal_cdf(5.0) > 0.999_999);
        assert!(normal_cdf(-5.0) < 1e-6);
    }
}
