//! Recommended pricing
//!
//! Provides:
//! - Price table lookup with extrapolation past the last range
//! - Position-equivalent interpolation between regional tables
//! - Table-based and conversion-based recommendations
//! - Price group and country lookups

pub mod groups;
pub mod recommend;
pub mod table;

pub use groups::{currency_regions, price_group_for_country, CurrencyRegions, RegionCountries};
pub use recommend::{
    recommend_by_conversion, recommend_by_table, RecommendationStrategy, TableRecommendation,
};
pub use table::{interpolate, locate, map_position};
