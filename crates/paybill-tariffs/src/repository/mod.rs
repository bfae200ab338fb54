//! Storage seams
//!
//! The engine never owns persistence. Rule sets, price tables and exchange
//! rates come from external collaborators behind these traits; resolution
//! and interpolation then run over the fetched snapshots.

pub mod cache;
pub mod memory;

pub use cache::{CacheStats, CachedRuleRepository};
pub use memory::{InMemoryPriceTableStore, InMemoryRuleRepository};

use async_trait::async_trait;
use paybill_common::{CostRule, PriceGroup, PriceTable, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Source of cost rules for one rule family
#[async_trait]
pub trait RuleRepository<R: CostRule>: Send + Sync {
    /// Active rules whose scope equals `scope`, in any order
    async fn fetch_rules(&self, scope: &R::Scope) -> Result<Vec<R>>;

    /// All active rules owned by a merchant
    async fn fetch_rules_for_merchant(&self, merchant_id: Uuid) -> Result<Vec<R>>;
}

/// Source of price groups and price tables
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceTableStore: Send + Sync {
    /// Price table of a region, `None` if the region has none
    async fn fetch_table(&self, region: &str) -> Result<Option<PriceTable>>;

    async fn fetch_all_price_groups(&self) -> Result<Vec<PriceGroup>>;
}

/// Exchange-rate lookup used by conversion-based recommendations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Convert `amount` from one ISO 4217 currency to another
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> anyhow::Result<Decimal>;
}
