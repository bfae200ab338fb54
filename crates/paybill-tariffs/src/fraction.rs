//! Psychological price rounding ("fraction")
//!
//! Each price group carries a fraction code selecting how a raw computed price
//! is turned into a shelf price. The fractional part is aligned to cents
//! (half-to-even) before any policy is applied; ledger and reporting code
//! depend on the exact cent values produced here.
//!
//! | code   | policy                                        | 12.34 → |
//! |--------|-----------------------------------------------|---------|
//! | `0.05` | cents rounded up to a multiple of 0.05        | 12.35   |
//! | `0.5`  | cents rounded up to a multiple of 0.5         | 12.5    |
//! | `0.95` | always ends in .95 (next unit above .95)      | 12.95   |
//! | `0.09` | keeps tenths, ends in 9 cents                 | 12.39   |
//! | `0`    | whole units, rounded up                       | 13      |
//! | other  | integer part                                  | 12      |

use paybill_common::PRICE_SCALE;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::str::FromStr;

/// Rounding policy selected by a fraction code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionPolicy {
    /// Cents rounded up to the next multiple of the step
    StepUp(Decimal),
    /// Price ends in .95
    NinetyFive,
    /// Tenths kept, price ends in 9 cents
    NineCents,
    /// Whole units, rounded up
    WholeUp,
    /// Integer part only
    Truncate,
}

impl FractionPolicy {
    /// Map a fraction code to its policy. Codes compare by value, so `0.50`
    /// and `0.5` select the same policy.
    pub fn from_code(code: Decimal) -> Self {
        if code == dec!(0.05) || code == dec!(0.5) {
            FractionPolicy::StepUp(code)
        } else if code == dec!(0.95) {
            FractionPolicy::NinetyFive
        } else if code == dec!(0.09) {
            FractionPolicy::NineCents
        } else if code.is_zero() {
            FractionPolicy::WholeUp
        } else {
            FractionPolicy::Truncate
        }
    }

    /// Apply the policy to a raw price
    pub fn apply(&self, price: Decimal) -> Decimal {
        let whole = price.trunc();
        let cents = round_cents(price - whole);

        match *self {
            FractionPolicy::StepUp(step) => {
                let steps = (cents / step).ceil();
                round_cents(whole + round_cents(steps * step))
            }
            FractionPolicy::NinetyFive => {
                let whole = if cents > dec!(0.95) { whole + Decimal::ONE } else { whole };
                whole + dec!(0.95)
            }
            FractionPolicy::NineCents => {
                let tenths = (cents * Decimal::TEN).trunc();
                round_cents(whole + tenths / Decimal::TEN + dec!(0.09))
            }
            FractionPolicy::WholeUp => price.ceil(),
            FractionPolicy::Truncate => whole,
        }
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Round `price` according to the fraction code of its price group
pub fn round_price(fraction: Decimal, price: Decimal) -> Decimal {
    FractionPolicy::from_code(fraction).apply(price)
}

/// Float boundary for [`round_price`].
///
/// Inputs are read through their shortest decimal representation, so `12.1`
/// is treated as exactly 12.10. Non-finite prices are returned unchanged.
pub fn round_price_f64(fraction: f64, price: f64) -> f64 {
    let (Some(fraction), Some(amount)) = (float_to_decimal(fraction), float_to_decimal(price)) else {
        return price;
    };

    // Every Decimal lies inside f64 range
    round_price(fraction, amount).to_f64().unwrap_or(f64::NAN)
}

fn float_to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}
