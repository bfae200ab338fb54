//! Price groups, price tables and recommended prices
//!
//! A price group describes one pricing region: its currency and the
//! psychological rounding ("fraction") applied to prices shown there.
//! A price table is the region's ladder of contiguous amount ranges; equal
//! positions in two tables are treated as equal buying power.

use crate::error::TariffError;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pricing region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceGroup {
    pub id: Uuid,
    /// Region name; the partition key, one group per region
    pub region: String,
    /// ISO 4217 currency prices are shown in
    pub currency: String,
    pub inflation_rate: Decimal,
    /// Rounding policy code (0, 0.05, 0.09, 0.5, 0.95)
    pub fraction: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceGroup {
    pub fn new(region: impl Into<String>, currency: impl Into<String>, fraction: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            region: region.into(),
            currency: currency.into(),
            inflation_rate: Decimal::ZERO,
            fraction,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set inflation rate
    pub fn with_inflation_rate(mut self, rate: Decimal) -> Self {
        self.inflation_rate = rate;
        self
    }

    /// Soft-disable the group
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// One bracket of a price table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTableRange {
    /// Exclusive lower bound
    pub from: Decimal,
    /// Inclusive upper bound
    pub to: Decimal,
    /// 0-based index in the table; may exceed the table for extrapolated ranges
    pub position: u32,
}

impl PriceTableRange {
    pub fn new(from: Decimal, to: Decimal, position: u32) -> Self {
        Self { from, to, position }
    }

    /// `to - from`; `None` when the bounds are too far apart to represent
    pub fn width(&self) -> Option<Decimal> {
        self.to.checked_sub(self.from)
    }

    /// `from < amount <= to`
    pub fn contains(&self, amount: Decimal) -> bool {
        self.from < amount && amount <= self.to
    }
}

/// A region's price ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub id: Uuid,
    /// Region (or reference currency) the table belongs to
    pub region: String,
    /// Ordered ascending by position
    pub ranges: Vec<PriceTableRange>,
}

impl PriceTable {
    pub fn new(region: impl Into<String>, ranges: Vec<PriceTableRange>) -> Self {
        Self {
            id: Uuid::new_v4(),
            region: region.into(),
            ranges,
        }
    }

    /// Build a table from consecutive bounds: `[b0, b1, b2]` gives
    /// `(b0, b1]@0, (b1, b2]@1`
    pub fn from_bounds(region: impl Into<String>, bounds: &[Decimal]) -> Self {
        let ranges = bounds
            .windows(2)
            .enumerate()
            .map(|(i, pair)| PriceTableRange::new(pair[0], pair[1], i as u32))
            .collect();
        Self::new(region, ranges)
    }

    pub fn last_range(&self) -> Option<&PriceTableRange> {
        self.ranges.last()
    }

    /// Check structural invariants: at least one range, positive widths,
    /// contiguous bounds, positions matching indices
    pub fn validate(&self) -> Result<(), TariffError> {
        if self.ranges.is_empty() {
            return Err(TariffError::invalid_table(&self.region, "table has no ranges"));
        }

        for (index, range) in self.ranges.iter().enumerate() {
            if range.from >= range.to {
                return Err(TariffError::invalid_table(
                    &self.region,
                    format!("range {} is empty or inverted: {} .. {}", index, range.from, range.to),
                ));
            }
            if range.width().is_none() {
                return Err(TariffError::invalid_table(
                    &self.region,
                    format!("range {} is too wide: {} .. {}", index, range.from, range.to),
                ));
            }
            if range.position as usize != index {
                return Err(TariffError::invalid_table(
                    &self.region,
                    format!("range {} has position {}", index, range.position),
                ));
            }
        }

        for (index, pair) in self.ranges.windows(2).enumerate() {
            if pair[0].to != pair[1].from {
                return Err(TariffError::invalid_table(
                    &self.region,
                    format!(
                        "ranges {} and {} are not contiguous: {} != {}",
                        index,
                        index + 1,
                        pair[0].to,
                        pair[1].from
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Recommended consumer price for one region; computed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedPrice {
    pub region: String,
    pub currency: String,
    pub amount: Decimal,
}

impl RecommendedPrice {
    /// Amount as a float, for boundaries that require one
    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or_default()
    }
}

/// Link between a country and the price group it is priced in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryPriceGroup {
    /// ISO 3166-1 alpha-2 code
    pub iso_code_a2: String,
    pub price_group_id: Uuid,
}
