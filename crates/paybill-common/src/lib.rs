//! # Paybill Common
//!
//! Shared types and errors for the Paybill tariff engine.
//!
//! ## Core Types
//!
//! - [`CostRule`]: common view over the four cost rule families
//!   ([`RefundCostMerchant`], [`RefundCostSystem`], [`ChannelCostMerchant`],
//!   [`ChannelCostSystem`])
//! - [`Country`]: specific ISO country or the wildcard
//! - [`PriceGroup`]/[`PriceTable`]: pricing regions and their price ladders
//! - [`RecommendedPrice`]: computed per-region consumer price

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{BillingError, Result, TariffError};
pub use types::{
    cost_rule::{
        ChannelCostMerchant, ChannelCostSystem, ChannelMerchantScope, ChannelSystemScope,
        CostRule, CostRuleKind, RefundCostMerchant, RefundCostSystem, RefundMerchantScope,
        RefundSystemScope, ScopeKey,
    },
    country::Country,
    price_group::{CountryPriceGroup, PriceGroup, PriceTable, PriceTableRange, RecommendedPrice},
};

/// Paybill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Currency recommended prices are quoted from by default
pub const DEFAULT_RECOMMENDED_CURRENCY: &str = "USD";

/// Decimal places prices are aligned to
pub const PRICE_SCALE: u32 = 2;
