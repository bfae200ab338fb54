//! Integration tests for the tariff engine
//!
//! Exercises the engine facade end to end over in-memory stores:
//! - cost resolution for all four rule families
//! - rule cache invalidation on writes
//! - table-based and conversion-based recommended prices

use async_trait::async_trait;
use paybill_common::{
    ChannelCostMerchant, ChannelCostSystem, ChannelMerchantScope, ChannelSystemScope, Country,
    PriceGroup, PriceTable, RefundCostMerchant, RefundCostSystem, RefundMerchantScope,
    RefundSystemScope, TariffError,
};
use paybill_tariffs::{
    CountryFallback, CurrencyConverter, InMemoryPriceTableStore, InMemoryRuleRepository,
    RecommendationStrategy, TariffEngine, TariffEngineConfig,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Fixed-rate converter quoting everything against USD
pub struct StaticRates {
    usd_rates: HashMap<String, Decimal>,
}

impl StaticRates {
    pub fn new(rates: &[(&str, Decimal)]) -> Self {
        Self {
            usd_rates: rates.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
        }
    }
}

#[async_trait]
impl CurrencyConverter for StaticRates {
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> anyhow::Result<Decimal> {
        let rate = |currency: &str| {
            self.usd_rates
                .get(currency)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no rate for {}", currency))
        };
        Ok(amount / rate(from)? * rate(to)?)
    }
}

/// Engine wired to in-memory stores
pub struct TestHarness {
    pub merchant_refunds: Arc<InMemoryRuleRepository<RefundCostMerchant>>,
    pub system_refunds: Arc<InMemoryRuleRepository<RefundCostSystem>>,
    pub merchant_channels: Arc<InMemoryRuleRepository<ChannelCostMerchant>>,
    pub system_channels: Arc<InMemoryRuleRepository<ChannelCostSystem>>,
    pub prices: Arc<InMemoryPriceTableStore>,
    pub merchant_id: Uuid,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            merchant_refunds: Arc::new(InMemoryRuleRepository::new()),
            system_refunds: Arc::new(InMemoryRuleRepository::new()),
            merchant_channels: Arc::new(InMemoryRuleRepository::new()),
            system_channels: Arc::new(InMemoryRuleRepository::new()),
            prices: Arc::new(InMemoryPriceTableStore::new()),
            merchant_id: Uuid::new_v4(),
        }
    }

    pub fn engine(&self, config: TariffEngineConfig) -> TariffEngine {
        TariffEngine::builder()
            .config(config)
            .merchant_refund_rules(self.merchant_refunds.clone())
            .system_refund_rules(self.system_refunds.clone())
            .merchant_channel_rules(self.merchant_channels.clone())
            .system_channel_rules(self.system_channels.clone())
            .price_store(self.prices.clone())
            .converter(Arc::new(StaticRates::new(&[
                ("USD", dec!(1)),
                ("EUR", dec!(0.9)),
                ("JPY", dec!(150)),
            ])))
            .build()
            .unwrap()
    }

    pub fn refund_scope(&self) -> RefundMerchantScope {
        RefundMerchantScope {
            merchant_id: self.merchant_id,
            name: "VISA".to_string(),
            payout_currency: "USD".to_string(),
            undo_reason: "chargeback".to_string(),
            region: "russia_and_cis".to_string(),
            mcc_code: "5816".to_string(),
            payment_stage: 1,
        }
    }

    pub fn channel_scope(&self) -> ChannelMerchantScope {
        ChannelMerchantScope {
            merchant_id: self.merchant_id,
            name: "VISA".to_string(),
            payout_currency: "USD".to_string(),
            region: "europe".to_string(),
            mcc_code: "5816".to_string(),
        }
    }

    /// AZ {0 -> 5, 30 -> 15}, wildcard {0 -> 3}
    pub fn seed_refunds(&self) {
        let scope = self.refund_scope();
        for (country, days, fix) in [
            (Country::specific("AZ"), 0, dec!(5)),
            (Country::specific("AZ"), 30, dec!(15)),
            (Country::Wildcard, 0, dec!(3)),
        ] {
            self.merchant_refunds.upsert(
                RefundCostMerchant::new(scope.clone(), country, days).with_fee(dec!(0), fix, "USD"),
            );
        }
    }

    /// USD and EUR tables, groups for USD, europe and japan (no table)
    pub fn seed_prices(&self) {
        self.prices.upsert_group(PriceGroup::new("USD", "USD", dec!(0.95)));
        self.prices.upsert_group(PriceGroup::new("europe", "EUR", dec!(0.09)));
        self.prices.upsert_group(PriceGroup::new("japan", "JPY", dec!(0)));
        self.prices
            .upsert_table(PriceTable::from_bounds("USD", &[dec!(0), dec!(10), dec!(20)]));
        self.prices
            .upsert_table(PriceTable::from_bounds("europe", &[dec!(0), dec!(9), dec!(19)]));
    }
}

mod cost_resolution {
    use super::*;

    #[tokio::test]
    async fn test_merchant_refund_country_specificity() {
        let harness = TestHarness::new();
        harness.seed_refunds();
        let engine = harness.engine(TariffEngineConfig::default());
        let scope = harness.refund_scope();

        let at = |country: Option<&'static str>, days| {
            let engine = &engine;
            let scope = scope.clone();
            async move {
                engine
                    .resolve_merchant_refund_cost(&scope, country, days)
                    .await
                    .map(|rule| rule.fix_amount)
            }
        };

        assert_eq!(at(Some("AZ"), 10).await.unwrap(), dec!(5));
        assert_eq!(at(Some("AZ"), 45).await.unwrap(), dec!(15));
        assert_eq!(at(None, 5).await.unwrap(), dec!(3));
        assert_eq!(at(Some(""), 5).await.unwrap(), dec!(3));
        assert_eq!(at(Some("DE"), 5).await.unwrap(), dec!(3));
    }

    #[tokio::test]
    async fn test_empty_scope_is_not_found() {
        let harness = TestHarness::new();
        let engine = harness.engine(TariffEngineConfig::default());

        let err = engine
            .resolve_merchant_refund_cost(&harness.refund_scope(), None, 0)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_system_refund_and_channel_families() {
        let harness = TestHarness::new();
        let engine = harness.engine(TariffEngineConfig::default());

        let refund_scope = RefundSystemScope {
            name: "VISA".to_string(),
            payout_currency: "USD".to_string(),
            undo_reason: "reversal".to_string(),
            region: "europe".to_string(),
            mcc_code: "5816".to_string(),
            operating_company_id: "opco-1".to_string(),
            payment_stage: 1,
        };
        harness.system_refunds.upsert(
            RefundCostSystem::new(refund_scope.clone(), Country::Wildcard, 0)
                .with_fee(dec!(1), dec!(0.5), "EUR"),
        );

        let channel_scope = ChannelSystemScope {
            name: "VISA".to_string(),
            region: "europe".to_string(),
            mcc_code: "5816".to_string(),
            operating_company_id: "opco-1".to_string(),
        };
        harness.system_channels.upsert(
            ChannelCostSystem::new(channel_scope.clone(), "DE", dec!(0))
                .with_fee(dec!(2.1), dec!(0.1), "EUR"),
        );

        let refund = engine
            .resolve_system_refund_cost(&refund_scope, Some("FR"), 3)
            .await
            .unwrap();
        assert_eq!(refund.fix_amount, dec!(0.5));

        let channel = engine
            .resolve_system_channel_cost(&channel_scope, Some("de"), dec!(100))
            .await
            .unwrap();
        assert_eq!(channel.percent, dec!(2.1));

        assert!(engine
            .resolve_system_channel_cost(&channel_scope, Some("FR"), dec!(100))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_merchant_channel_min_amount() {
        let harness = TestHarness::new();
        let scope = harness.channel_scope();
        harness.merchant_channels.upsert(
            ChannelCostMerchant::new(scope.clone(), Country::Wildcard, dec!(0.75))
                .with_method_fee(dec!(2.5), dec!(0.3), "USD")
                .with_ps_fee(dec!(1.2), dec!(0.1), "USD"),
        );
        harness.merchant_channels.upsert(
            ChannelCostMerchant::new(scope.clone(), Country::Wildcard, dec!(5))
                .with_method_fee(dec!(1.5), dec!(0.2), "USD"),
        );
        let engine = harness.engine(TariffEngineConfig::default());

        assert!(engine
            .resolve_merchant_channel_cost(&scope, None, dec!(0.5))
            .await
            .is_err());
        let small = engine
            .resolve_merchant_channel_cost(&scope, None, dec!(1))
            .await
            .unwrap();
        assert_eq!(small.method_percent, dec!(2.5));
        assert_eq!(small.ps_percent, dec!(1.2));
        let large = engine
            .resolve_merchant_channel_cost(&scope, None, dec!(5))
            .await
            .unwrap();
        assert_eq!(large.method_percent, dec!(1.5));
    }

    #[tokio::test]
    async fn test_wildcard_fallback_policy() {
        let harness = TestHarness::new();
        let scope = harness.refund_scope();
        harness.merchant_refunds.upsert(
            RefundCostMerchant::new(scope.clone(), "AZ", 10).with_fee(dec!(0), dec!(5), "USD"),
        );
        harness.merchant_refunds.upsert(
            RefundCostMerchant::new(scope.clone(), Country::Wildcard, 0)
                .with_fee(dec!(0), dec!(3), "USD"),
        );

        let strict = harness.engine(TariffEngineConfig::default());
        assert!(strict
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 2)
            .await
            .unwrap_err()
            .is_not_found());

        let mut config = TariffEngineConfig::default();
        config.resolver.country_fallback = CountryFallback::Wildcard;
        let relaxed = harness.engine(config);
        let rule = relaxed
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 2)
            .await
            .unwrap();
        assert_eq!(rule.fix_amount, dec!(3));
    }

    #[tokio::test]
    async fn test_missing_repository_is_config_error() {
        let engine = TariffEngine::builder().build().unwrap();
        let harness = TestHarness::new();

        let err = engine
            .resolve_merchant_refund_cost(&harness.refund_scope(), None, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, paybill_common::BillingError::Config(_)));
    }
}

mod rule_cache {
    use super::*;

    #[tokio::test]
    async fn test_writes_visible_after_invalidation() {
        let harness = TestHarness::new();
        harness.seed_refunds();
        let engine = harness.engine(TariffEngineConfig::default());
        let scope = harness.refund_scope();

        let before = engine
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 45)
            .await
            .unwrap();
        assert_eq!(before.fix_amount, dec!(15));

        let raised = before.clone().with_fee(dec!(0), dec!(20), "USD");
        harness.merchant_refunds.upsert(raised);

        // Still served from cache
        let cached = engine
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 45)
            .await
            .unwrap();
        assert_eq!(cached.fix_amount, dec!(15));

        assert!(engine.invalidate_merchant_refund_rules(&scope));
        let after = engine
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 45)
            .await
            .unwrap();
        assert_eq!(after.fix_amount, dec!(20));
    }

    #[tokio::test]
    async fn test_cache_disabled_reads_through() {
        let harness = TestHarness::new();
        harness.seed_refunds();
        let mut config = TariffEngineConfig::default();
        config.cache.enabled = false;
        let engine = harness.engine(config);
        let scope = harness.refund_scope();

        let rule = engine
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 45)
            .await
            .unwrap();
        harness.merchant_refunds.deactivate(rule.id);

        // AZ@0 still covers day 45 once AZ@30 is gone
        let fallback = engine
            .resolve_merchant_refund_cost(&scope, Some("AZ"), 45)
            .await
            .unwrap();
        assert_eq!(fallback.fix_amount, dec!(5));
        assert!(!engine.invalidate_merchant_refund_rules(&scope));
    }
}

mod recommended_prices {
    use super::*;

    #[tokio::test]
    async fn test_table_strategy_skips_regions_without_table() {
        let harness = TestHarness::new();
        harness.seed_prices();
        let engine = harness.engine(TariffEngineConfig::default());

        let prices = engine
            .recommend_prices(dec!(12), "USD", RecommendationStrategy::Table)
            .await
            .unwrap();

        let by_region: HashMap<_, _> = prices.iter().map(|p| (p.region.as_str(), p.amount)).collect();
        assert_eq!(by_region.len(), 2);
        assert_eq!(by_region["USD"], dec!(18.95));
        assert_eq!(by_region["europe"], dec!(17.09));
        assert!(!by_region.contains_key("japan"));
        assert_eq!(engine.metrics().skipped_regions_total.get(), 1);
    }

    #[tokio::test]
    async fn test_table_strategy_requires_source_table() {
        let harness = TestHarness::new();
        harness.seed_prices();
        let engine = harness.engine(TariffEngineConfig::default());

        let err = engine
            .recommend_prices(dec!(12), "GBP", RecommendationStrategy::Table)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_table_strategy_rejects_malformed_table() {
        let harness = TestHarness::new();
        harness.seed_prices();
        harness.prices.upsert_table(PriceTable::new("europe", vec![]));
        let engine = harness.engine(TariffEngineConfig::default());

        let err = engine
            .recommend_prices(dec!(12), "USD", RecommendationStrategy::Table)
            .await
            .unwrap_err();
        assert!(matches!(err.as_tariff(), Some(TariffError::InvalidTable { .. })));
    }

    #[tokio::test]
    async fn test_conversion_strategy() {
        let harness = TestHarness::new();
        harness.seed_prices();
        let engine = harness.engine(TariffEngineConfig::default());

        let prices = engine
            .recommend_prices(dec!(10), "USD", RecommendationStrategy::Conversion)
            .await
            .unwrap();

        let by_region: HashMap<_, _> = prices.iter().map(|p| (p.region.as_str(), p.amount)).collect();
        assert_eq!(by_region.len(), 3);
        assert_eq!(by_region["USD"], dec!(10.95));
        assert_eq!(by_region["europe"], dec!(9.09));
        assert_eq!(by_region["japan"], dec!(1500));
    }

    #[tokio::test]
    async fn test_conversion_failure_fails_run() {
        let harness = TestHarness::new();
        harness.seed_prices();
        harness.prices.upsert_group(PriceGroup::new("uk", "GBP", dec!(0)));
        let engine = harness.engine(TariffEngineConfig::default());

        let err = engine
            .recommend_prices(dec!(10), "USD", RecommendationStrategy::Conversion)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_tariff(),
            Some(TariffError::ConversionFailed { to, .. }) if to == "GBP"
        ));
    }

    #[tokio::test]
    async fn test_default_strategy_and_home_region_exclusion() {
        let harness = TestHarness::new();
        harness.seed_prices();
        let mut config = TariffEngineConfig::default();
        config.recommendation.default_strategy = RecommendationStrategy::Conversion;
        config.recommendation.exclude_home_region = true;
        let engine = harness.engine(config);

        let prices = engine.recommend_prices_default(dec!(10)).await.unwrap();

        assert_eq!(prices.len(), 2);
        assert!(prices.iter().all(|p| p.currency != "USD"));
    }

    #[tokio::test]
    async fn test_default_prices_use_configured_currency() {
        let harness = TestHarness::new();
        harness.seed_prices();
        harness
            .prices
            .upsert_table(PriceTable::from_bounds("EUR", &[dec!(0), dec!(9), dec!(19)]));
        let mut config = TariffEngineConfig::default();
        config.recommendation.default_currency = "EUR".to_string();
        config.recommendation.exclude_home_region = true;
        let engine = harness.engine(config);

        // 12 EUR sits 30% into (9, 19]; the flipped ratio lands at 17 in (10, 20]
        let prices = engine.recommend_prices_default(dec!(12)).await.unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].region, "USD");
        assert_eq!(prices[0].amount, dec!(17.95));
    }

    #[test]
    fn test_round_price_facade() {
        assert_eq!(TariffEngine::round_price(dec!(0.95), dec!(12.10)), dec!(12.95));
        assert_eq!(paybill_tariffs::round_price_f64(0.0, 12.01), 13.0);
    }
}
