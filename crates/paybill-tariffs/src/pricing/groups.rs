//! Price group lookups over snapshots

use paybill_common::{CountryPriceGroup, PriceGroup, TariffError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Active groups, in input order
pub fn active_groups(groups: &[PriceGroup]) -> impl Iterator<Item = &PriceGroup> {
    groups.iter().filter(|g| g.is_active)
}

/// Active group of a region
pub fn by_region<'a>(groups: &'a [PriceGroup], region: &str) -> Option<&'a PriceGroup> {
    active_groups(groups).find(|g| g.region == region)
}

/// Resolve the active price group a country is priced in
pub fn price_group_for_country<'a>(
    groups: &'a [PriceGroup],
    countries: &[CountryPriceGroup],
    iso_code: &str,
) -> Result<&'a PriceGroup, TariffError> {
    let link = countries
        .iter()
        .find(|c| c.iso_code_a2.eq_ignore_ascii_case(iso_code.trim()))
        .ok_or_else(|| TariffError::not_found("country", iso_code))?;

    active_groups(groups)
        .find(|g| g.id == link.price_group_id)
        .ok_or_else(|| TariffError::not_found("price group", format!("country {}", iso_code)))
}

/// A region and the countries priced in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCountries {
    pub region: String,
    /// ISO 3166-1 alpha-2 codes, sorted
    pub countries: Vec<String>,
}

/// Regions sharing a currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRegions {
    pub currency: String,
    pub regions: Vec<RegionCountries>,
}

/// Group active price groups by currency, listing each region's countries.
///
/// The region named after `reference_currency` is the pricing reference, not a
/// market, and is left out. Output is sorted by currency then region.
pub fn currency_regions(
    groups: &[PriceGroup],
    countries: &[CountryPriceGroup],
    reference_currency: &str,
) -> Vec<CurrencyRegions> {
    let mut by_currency: BTreeMap<&str, BTreeMap<&str, Vec<String>>> = BTreeMap::new();

    for group in active_groups(groups).filter(|g| g.region != reference_currency) {
        let mut codes: Vec<String> = countries
            .iter()
            .filter(|c| c.price_group_id == group.id)
            .map(|c| c.iso_code_a2.clone())
            .collect();
        codes.sort();

        by_currency
            .entry(group.currency.as_str())
            .or_default()
            .insert(group.region.as_str(), codes);
    }

    by_currency
        .into_iter()
        .map(|(currency, regions)| CurrencyRegions {
            currency: currency.to_string(),
            regions: regions
                .into_iter()
                .map(|(region, countries)| RegionCountries {
                    region: region.to_string(),
                    countries,
                })
                .collect(),
        })
        .collect()
}
