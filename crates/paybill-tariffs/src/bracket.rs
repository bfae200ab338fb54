//! Bracket selection over sorted threshold tiers
//!
//! Tiers partition the number line into half-open brackets
//! `[threshold_i, threshold_{i+1})`, the last one unbounded above. Selection is
//! a step function: the tier with the greatest threshold not above the query.

use paybill_common::CostRule;
use rust_decimal::Decimal;

/// Anything carrying a bracket lower bound
pub trait Tier {
    fn threshold(&self) -> Decimal;
}

impl<P> Tier for (Decimal, P) {
    fn threshold(&self) -> Decimal {
        self.0
    }
}

impl<R: CostRule> Tier for &R {
    fn threshold(&self) -> Decimal {
        CostRule::threshold(*self)
    }
}

/// Select the last tier whose threshold is `<= query`.
///
/// `tiers` must already be sorted ascending by threshold; this function does
/// not sort. Returns `None` for an empty slice or a query below the first
/// threshold. Equal thresholds resolve to the later tier.
pub fn select<T: Tier>(tiers: &[T], query: Decimal) -> Option<&T> {
    let idx = tiers.partition_point(|tier| tier.threshold() <= query);
    idx.checked_sub(1).map(|i| &tiers[i])
}

/// Payload-returning form of [`select`] for `(threshold, payload)` pairs
pub fn select_payload<P>(tiers: &[(Decimal, P)], query: Decimal) -> Option<&P> {
    select(tiers, query).map(|(_, payload)| payload)
}
