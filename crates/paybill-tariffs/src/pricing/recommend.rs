//! Recommended prices per region
//!
//! Two strategies turn a source amount into one consumer price per active
//! price group:
//!
//! - **Table**: locate the amount in the source currency's price table, take
//!   the range at the same position in each region's table, interpolate, then
//!   round with the region's fraction.
//! - **Conversion**: convert the amount into each region's currency, then
//!   round with the region's fraction.

use super::table::{interpolate, locate, map_position};
use crate::fraction::round_price;
use crate::repository::CurrencyConverter;
use futures::future::try_join_all;
use paybill_common::{PriceGroup, PriceTable, RecommendedPrice, TariffError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How recommended prices are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    /// Position-equivalent interpolation across price tables
    #[default]
    Table,
    /// Exchange-rate conversion
    Conversion,
}

impl RecommendationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStrategy::Table => "table",
            RecommendationStrategy::Conversion => "conversion",
        }
    }
}

impl fmt::Display for RecommendationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a table-based run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRecommendation {
    /// One price per active group that has a table, in group order
    pub prices: Vec<RecommendedPrice>,
    /// Regions left out because they have no price table
    pub skipped_regions: Vec<String>,
}

/// Table-based recommendation over fetched snapshots.
///
/// `tables` maps region to price table. Inactive groups are ignored; active
/// groups without a table are reported in `skipped_regions`. Any malformed
/// table fails the whole run.
pub fn recommend_by_table(
    source_table: &PriceTable,
    groups: &[PriceGroup],
    tables: &HashMap<String, PriceTable>,
    amount: Decimal,
) -> Result<TableRecommendation, TariffError> {
    let source_range = locate(source_table, amount)?;
    let mut outcome = TableRecommendation::default();

    for group in groups.iter().filter(|g| g.is_active) {
        let Some(table) = tables.get(&group.region) else {
            outcome.skipped_regions.push(group.region.clone());
            continue;
        };

        let target_range = map_position(table, source_range.position)?;
        let raw = interpolate(&source_range, &target_range, amount)?;

        outcome.prices.push(RecommendedPrice {
            region: group.region.clone(),
            currency: group.currency.clone(),
            amount: round_price(group.fraction, raw),
        });
    }

    Ok(outcome)
}

/// Conversion-based recommendation.
///
/// Conversions for all active groups run concurrently; the first failure
/// fails the run with `ConversionFailed`.
pub async fn recommend_by_conversion(
    converter: &dyn CurrencyConverter,
    groups: &[PriceGroup],
    amount: Decimal,
    currency: &str,
) -> Result<Vec<RecommendedPrice>, TariffError> {
    let conversions = groups.iter().filter(|g| g.is_active).map(|group| async move {
        let converted = converter
            .convert(amount, currency, &group.currency)
            .await
            .map_err(|e| TariffError::ConversionFailed {
                from: currency.to_string(),
                to: group.currency.clone(),
                reason: e.to_string(),
            })?;

        Ok::<_, TariffError>(RecommendedPrice {
            region: group.region.clone(),
            currency: group.currency.clone(),
            amount: round_price(group.fraction, converted),
        })
    });

    try_join_all(conversions).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockCurrencyConverter;
    use rust_decimal_macros::dec;

    fn groups() -> Vec<PriceGroup> {
        vec![
            PriceGroup::new("USD", "USD", dec!(0.95)),
            PriceGroup::new("europe", "EUR", dec!(0.09)),
            PriceGroup::new("japan", "JPY", dec!(0)),
            PriceGroup::new("dormant", "GBP", dec!(0)).deactivated(),
        ]
    }

    fn tables() -> HashMap<String, PriceTable> {
        [
            PriceTable::from_bounds("USD", &[dec!(0), dec!(10), dec!(20)]),
            PriceTable::from_bounds("europe", &[dec!(0), dec!(9), dec!(19)]),
            PriceTable::from_bounds("dormant", &[dec!(0), dec!(8), dec!(16)]),
        ]
        .into_iter()
        .map(|t| (t.region.clone(), t))
        .collect()
    }

    #[test]
    fn test_by_table() {
        let tables = tables();
        let outcome = recommend_by_table(&tables["USD"], &groups(), &tables, dec!(12)).unwrap();

        assert_eq!(outcome.skipped_regions, vec!["japan".to_string()]);
        assert_eq!(outcome.prices.len(), 2);

        // USD (10,20]: ratio 0.8 -> 18 -> .95 policy
        assert_eq!(outcome.prices[0].region, "USD");
        assert_eq!(outcome.prices[0].amount, dec!(18.95));
        // EUR (9,19]: 9 + 10 * 0.8 = 17 -> .09 policy
        assert_eq!(outcome.prices[1].currency, "EUR");
        assert_eq!(outcome.prices[1].amount, dec!(17.09));
    }

    #[test]
    fn test_by_table_extrapolated_position() {
        let tables = tables();
        // USD (20,30]@2 virtual, EUR (19,29]@2 virtual, ratio 0.5
        let outcome = recommend_by_table(&tables["USD"], &groups(), &tables, dec!(25)).unwrap();
        assert_eq!(outcome.prices[1].amount, dec!(24.09));
    }

    #[test]
    fn test_by_table_invalid_region_table_fails() {
        let mut tables = tables();
        tables.insert("europe".to_string(), PriceTable::new("europe", vec![]));

        let err = recommend_by_table(&tables["USD"], &groups(), &tables, dec!(12)).unwrap_err();
        assert!(matches!(err, TariffError::InvalidTable { .. }));
    }

    #[tokio::test]
    async fn test_by_conversion() {
        let mut converter = MockCurrencyConverter::new();
        converter.expect_convert().returning(|amount, _from, to| match to {
            "EUR" => Ok(amount * dec!(0.9)),
            "JPY" => Ok(amount * dec!(150)),
            _ => Ok(amount),
        });

        let prices = recommend_by_conversion(&converter, &groups(), dec!(10), "USD")
            .await
            .unwrap();

        assert_eq!(prices.len(), 3);
        assert_eq!(prices[0].amount, dec!(10.95));
        assert_eq!(prices[1].amount, dec!(9.09));
        assert_eq!(prices[2].amount, dec!(1500));
    }

    #[tokio::test]
    async fn test_by_conversion_failure() {
        let mut converter = MockCurrencyConverter::new();
        converter.expect_convert().returning(|amount, _from, to| {
            if to == "JPY" {
                Err(anyhow::anyhow!("no rate for {}", to))
            } else {
                Ok(amount)
            }
        });

        let err = recommend_by_conversion(&converter, &groups(), dec!(10), "USD")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TariffError::ConversionFailed {
                from: "USD".to_string(),
                to: "JPY".to_string(),
                reason: "no rate for JPY".to_string(),
            }
        );
    }
}
