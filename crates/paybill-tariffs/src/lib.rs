//! # Paybill Tariffs
//!
//! Tariff resolution and recommended pricing for the Paybill billing core.
//!
//! ## Cost resolution
//!
//! Four rule families (merchant/system refund costs, merchant/system payment
//! channel costs) share one resolver:
//!
//! ```text
//! rules(scope) -> country group or wildcard group -> bracket by threshold
//! ```
//!
//! Refund rules are bracketed by days since the payment, channel rules by the
//! payment amount.
//!
//! ## Recommended prices
//!
//! ```text
//! table:      locate(source) -> map_position(region) -> interpolate -> fraction
//! conversion: convert(amount, region currency)                      -> fraction
//! ```

pub mod bracket;
pub mod config;
pub mod fraction;
pub mod metrics;
pub mod pricing;
pub mod repository;
pub mod resolver;
pub mod telemetry;

pub use config::TariffEngineConfig;
pub use fraction::{round_price, round_price_f64, FractionPolicy};
pub use metrics::TariffMetrics;
pub use pricing::RecommendationStrategy;
pub use repository::{
    CachedRuleRepository, CurrencyConverter, InMemoryPriceTableStore, InMemoryRuleRepository,
    PriceTableStore, RuleRepository,
};
pub use resolver::{select_rule, CostResolver, CountryFallback};

use futures::future::try_join_all;
use paybill_common::{
    BillingError, ChannelCostMerchant, ChannelCostSystem, ChannelMerchantScope,
    ChannelSystemScope, CostRule, PriceGroup, PriceTable, RecommendedPrice, RefundCostMerchant,
    RefundCostSystem, RefundMerchantScope, RefundSystemScope, Result, TariffError,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Tariff engine facade
pub struct TariffEngine {
    config: TariffEngineConfig,
    merchant_refund: Option<RuleFamily<RefundCostMerchant>>,
    system_refund: Option<RuleFamily<RefundCostSystem>>,
    merchant_channel: Option<RuleFamily<ChannelCostMerchant>>,
    system_channel: Option<RuleFamily<ChannelCostSystem>>,
    price_store: Option<Arc<dyn PriceTableStore>>,
    converter: Option<Arc<dyn CurrencyConverter>>,
    metrics: Arc<TariffMetrics>,
}

/// Resolver of one rule family and the cache in front of its repository
struct RuleFamily<R: CostRule> {
    resolver: CostResolver<R>,
    cache: Option<Arc<CachedRuleRepository<R>>>,
}

impl<R: CostRule> RuleFamily<R> {
    fn new(repo: Arc<dyn RuleRepository<R>>, config: &TariffEngineConfig, metrics: &Arc<TariffMetrics>) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(CachedRuleRepository::new(repo.clone(), config.cache.max_entries)));
        let source: Arc<dyn RuleRepository<R>> = match &cache {
            Some(cache) => cache.clone(),
            None => repo,
        };

        Self {
            resolver: CostResolver::new(source)
                .with_fallback(config.resolver.country_fallback)
                .with_metrics(metrics.clone()),
            cache,
        }
    }

    fn invalidate(&self, scope: &R::Scope) -> bool {
        self.cache.as_ref().map_or(false, |cache| cache.invalidate(scope))
    }

    fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

impl TariffEngine {
    pub fn builder() -> TariffEngineBuilder {
        TariffEngineBuilder::default()
    }

    pub fn config(&self) -> &TariffEngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<TariffMetrics> {
        &self.metrics
    }

    /// Refund cost charged to a merchant, `days` after the payment
    pub async fn resolve_merchant_refund_cost(
        &self,
        scope: &RefundMerchantScope,
        country: Option<&str>,
        days: u32,
    ) -> Result<RefundCostMerchant> {
        family(&self.merchant_refund)?
            .resolver
            .resolve(scope, country, Decimal::from(days))
            .await
    }

    /// Refund cost the platform pays, `days` after the payment
    pub async fn resolve_system_refund_cost(
        &self,
        scope: &RefundSystemScope,
        country: Option<&str>,
        days: u32,
    ) -> Result<RefundCostSystem> {
        family(&self.system_refund)?
            .resolver
            .resolve(scope, country, Decimal::from(days))
            .await
    }

    /// Channel commission charged to a merchant for a payment of `amount`
    pub async fn resolve_merchant_channel_cost(
        &self,
        scope: &ChannelMerchantScope,
        country: Option<&str>,
        amount: Decimal,
    ) -> Result<ChannelCostMerchant> {
        family(&self.merchant_channel)?
            .resolver
            .resolve(scope, country, amount)
            .await
    }

    /// Channel commission the platform pays for a payment of `amount`
    pub async fn resolve_system_channel_cost(
        &self,
        scope: &ChannelSystemScope,
        country: Option<&str>,
        amount: Decimal,
    ) -> Result<ChannelCostSystem> {
        family(&self.system_channel)?
            .resolver
            .resolve(scope, country, amount)
            .await
    }

    /// Drop cached merchant refund rules of a scope after a write
    pub fn invalidate_merchant_refund_rules(&self, scope: &RefundMerchantScope) -> bool {
        self.merchant_refund.as_ref().map_or(false, |f| f.invalidate(scope))
    }

    pub fn invalidate_system_refund_rules(&self, scope: &RefundSystemScope) -> bool {
        self.system_refund.as_ref().map_or(false, |f| f.invalidate(scope))
    }

    pub fn invalidate_merchant_channel_rules(&self, scope: &ChannelMerchantScope) -> bool {
        self.merchant_channel.as_ref().map_or(false, |f| f.invalidate(scope))
    }

    pub fn invalidate_system_channel_rules(&self, scope: &ChannelSystemScope) -> bool {
        self.system_channel.as_ref().map_or(false, |f| f.invalidate(scope))
    }

    /// Drop every cached rule set
    pub fn clear_rule_caches(&self) {
        self.merchant_refund.iter().for_each(RuleFamily::clear);
        self.system_refund.iter().for_each(RuleFamily::clear);
        self.merchant_channel.iter().for_each(RuleFamily::clear);
        self.system_channel.iter().for_each(RuleFamily::clear);
    }

    /// Recommended prices for an amount in the configured reference
    /// currency, using the configured default strategy
    pub async fn recommend_prices_default(&self, amount: Decimal) -> Result<Vec<RecommendedPrice>> {
        let settings = &self.config.recommendation;
        self.recommend_prices(amount, &settings.default_currency, settings.default_strategy)
            .await
    }

    /// One recommended price per active price group.
    ///
    /// With the table strategy, regions lacking a price table are left out
    /// and logged; the source currency's table must exist.
    #[instrument(skip(self))]
    pub async fn recommend_prices(
        &self,
        amount: Decimal,
        currency: &str,
        strategy: RecommendationStrategy,
    ) -> Result<Vec<RecommendedPrice>> {
        let _timer = self
            .metrics
            .recommendation_duration_seconds
            .with_label_values(&[strategy.as_str()])
            .start_timer();

        let outcome = self.compute_recommendations(amount, currency, strategy).await;
        let label = if outcome.is_ok() { "ok" } else { "error" };
        self.metrics.record_recommendation(strategy.as_str(), label);
        outcome
    }

    async fn compute_recommendations(
        &self,
        amount: Decimal,
        currency: &str,
        strategy: RecommendationStrategy,
    ) -> Result<Vec<RecommendedPrice>> {
        let store = self.price_store()?;
        let exclude_home = self.config.recommendation.exclude_home_region;
        let groups: Vec<PriceGroup> = store
            .fetch_all_price_groups()
            .await?
            .into_iter()
            .filter(|g| g.is_active && !(exclude_home && g.currency == currency))
            .collect();

        match strategy {
            RecommendationStrategy::Table => {
                let source = store
                    .fetch_table(currency)
                    .await?
                    .ok_or_else(|| TariffError::not_found("price table", currency))?;
                let tables = self.fetch_region_tables(store.as_ref(), &groups).await?;

                let outcome = pricing::recommend_by_table(&source, &groups, &tables, amount)?;
                for region in &outcome.skipped_regions {
                    warn!(region = %region, "No price table for region, skipping");
                    self.metrics.skipped_regions_total.inc();
                }
                Ok(outcome.prices)
            }
            RecommendationStrategy::Conversion => {
                let converter = self.converter.as_ref().ok_or_else(|| missing("currency converter"))?;
                Ok(pricing::recommend_by_conversion(converter.as_ref(), &groups, amount, currency).await?)
            }
        }
    }

    async fn fetch_region_tables(
        &self,
        store: &dyn PriceTableStore,
        groups: &[PriceGroup],
    ) -> Result<HashMap<String, PriceTable>> {
        let fetches = groups.iter().map(|group| async move {
            store
                .fetch_table(&group.region)
                .await
                .map(|table| table.map(|t| (group.region.clone(), t)))
        });

        Ok(try_join_all(fetches).await?.into_iter().flatten().collect())
    }

    fn price_store(&self) -> Result<&Arc<dyn PriceTableStore>> {
        self.price_store.as_ref().ok_or_else(|| missing("price table store"))
    }

    /// Round a raw price with a price group's fraction code
    pub fn round_price(fraction: Decimal, price: Decimal) -> Decimal {
        crate::fraction::round_price(fraction, price)
    }
}

fn family<R: CostRule>(family: &Option<RuleFamily<R>>) -> Result<&RuleFamily<R>> {
    family
        .as_ref()
        .ok_or_else(|| missing(&format!("{} repository", R::KIND)))
}

fn missing(what: &str) -> BillingError {
    BillingError::Config(format!("No {} configured", what))
}

/// Builder for [`TariffEngine`]
#[derive(Default)]
pub struct TariffEngineBuilder {
    config: TariffEngineConfig,
    merchant_refund: Option<Arc<dyn RuleRepository<RefundCostMerchant>>>,
    system_refund: Option<Arc<dyn RuleRepository<RefundCostSystem>>>,
    merchant_channel: Option<Arc<dyn RuleRepository<ChannelCostMerchant>>>,
    system_channel: Option<Arc<dyn RuleRepository<ChannelCostSystem>>>,
    price_store: Option<Arc<dyn PriceTableStore>>,
    converter: Option<Arc<dyn CurrencyConverter>>,
    metrics: Option<Arc<TariffMetrics>>,
}

impl TariffEngineBuilder {
    pub fn config(mut self, config: TariffEngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn merchant_refund_rules(mut self, repo: Arc<dyn RuleRepository<RefundCostMerchant>>) -> Self {
        self.merchant_refund = Some(repo);
        self
    }

    pub fn system_refund_rules(mut self, repo: Arc<dyn RuleRepository<RefundCostSystem>>) -> Self {
        self.system_refund = Some(repo);
        self
    }

    pub fn merchant_channel_rules(mut self, repo: Arc<dyn RuleRepository<ChannelCostMerchant>>) -> Self {
        self.merchant_channel = Some(repo);
        self
    }

    pub fn system_channel_rules(mut self, repo: Arc<dyn RuleRepository<ChannelCostSystem>>) -> Self {
        self.system_channel = Some(repo);
        self
    }

    pub fn price_store(mut self, store: Arc<dyn PriceTableStore>) -> Self {
        self.price_store = Some(store);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn CurrencyConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Share metrics with other components; a private unregistered set is
    /// created otherwise
    pub fn metrics(mut self, metrics: Arc<TariffMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<TariffEngine> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(
                TariffMetrics::new().map_err(|e| BillingError::Internal(format!("Failed to create metrics: {}", e)))?,
            ),
        };

        let config = self.config;
        let engine = TariffEngine {
            merchant_refund: self.merchant_refund.map(|repo| RuleFamily::new(repo, &config, &metrics)),
            system_refund: self.system_refund.map(|repo| RuleFamily::new(repo, &config, &metrics)),
            merchant_channel: self.merchant_channel.map(|repo| RuleFamily::new(repo, &config, &metrics)),
            system_channel: self.system_channel.map(|repo| RuleFamily::new(repo, &config, &metrics)),
            price_store: self.price_store,
            converter: self.converter,
            metrics,
            config,
        };

        info!(
            fallback = ?engine.config.resolver.country_fallback,
            strategy = %engine.config.recommendation.default_strategy,
            cache = engine.config.cache.enabled,
            "Tariff engine ready"
        );
        Ok(engine)
    }
}
