//! Strike selection for synthesized options
//!
//! Draws a moneyness band (mostly out-of-the-money, occasionally in- or
//! at-the-money), picks a strike inside a window around spot, and snaps it
//! to the standard increment for the price range.

use rand::Rng;

use types::instrument::OptionKind;

/// Share of 1-100 rolls landing in each band: 1-25 ITM, 26-95 OTM, rest ATM.
const ITM_ROLL_CEILING: u32 = 25;
const OTM_ROLL_CEILING: u32 = 95;

/// Strike increments snap near 1% of spot.
const BAND_PCT_OF_SPOT: f64 = 0.01;

/// Standard strike increment for a spot price.
///
/// Below a dime the increment floors at $0.10; up to $0.50 it rounds to the
/// nearest dime; beyond that to the nearest half dollar.
pub fn band_increment(spot: f64) -> f64 {
    let exact = BAND_PCT_OF_SPOT * spot;

    if exact < 0.1 {
        0.1
    } else if exact <= 0.5 {
        (exact / 0.1).round() * 0.1
    } else {
        (exact / 0.5).round() * 0.5
    }
}

/// Moneyness window around spot as (low, high) multipliers.
fn moneyness_window(kind: OptionKind, roll: u32) -> (f64, f64) {
    let below = (0.85, 0.99);
    let above = (1.01, 1.15);
    let at = (0.995, 1.005);

    match kind {
        // A call is in the money when the strike sits below spot.
        OptionKind::Call => {
            if roll <= ITM_ROLL_CEILING {
                below
            } else if roll <= OTM_ROLL_CEILING {
                above
            } else {
                at
            }
        }
        OptionKind::Put => {
            if roll <= ITM_ROLL_CEILING {
                above
            } else if roll <= OTM_ROLL_CEILING {
                below
            } else {
                at
            }
        }
    }
}

/// Pick a strike for a synthesized option on an underlying at `spot`.
pub fn select_strike<R: Rng>(rng: &mut R, kind: OptionKind, spot: f64) -> f64 {
    let roll = rng.gen_range(1..=100u32);
    let (low, high) = moneyness_window(kind, roll);

    let raw = rng.gen_range(spot * low..=spot * high);
    let increment = band_increment(spot);
    let snapped = (raw / increment).round() * increment;

    snapped.max(increment)
}
