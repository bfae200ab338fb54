//! Cost rule resolution
//!
//! Given a rule set for one scope, a request country and a query value (days
//! since payment or payment amount), pick the single rule that applies:
//!
//! 1. Keep active rules whose scope equals the requested scope.
//! 2. Split them into rules for the requested country and wildcard rules.
//! 3. Use the country group when it is non-empty, the wildcard group otherwise.
//! 4. Bracket-select within the chosen group by threshold.
//!
//! Only one group is consulted under [`CountryFallback::Strict`]; a country
//! group that exists but has no bracket covering the query is `NotFound`.

use crate::bracket;
use crate::metrics::TariffMetrics;
use crate::repository::RuleRepository;
use paybill_common::{CostRule, Country, Result, TariffError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// What to do when the country group has rules but none covers the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryFallback {
    /// Report `NotFound`
    #[default]
    Strict,
    /// Retry the selection against the wildcard group
    Wildcard,
}

/// Select the applicable rule from an already-fetched candidate set
pub fn select_rule<R: CostRule>(
    candidates: &[R],
    scope: &R::Scope,
    country: &Country,
    query: Decimal,
    fallback: CountryFallback,
) -> std::result::Result<R, TariffError> {
    let mut specific: Vec<&R> = Vec::new();
    let mut wildcard: Vec<&R> = Vec::new();

    for rule in candidates.iter().filter(|r| r.is_active() && r.scope() == scope) {
        match rule.country() {
            Country::Wildcard => wildcard.push(rule),
            code if !country.is_wildcard() && code == country => specific.push(rule),
            _ => {}
        }
    }

    // Stable: equal thresholds keep storage order, the later one wins
    specific.sort_by_key(|r| r.threshold());
    wildcard.sort_by_key(|r| r.threshold());

    let not_found = || {
        TariffError::not_found(
            R::KIND.as_str(),
            format!("country {} {} {}", country, R::KIND.query_name(), query),
        )
    };

    if !specific.is_empty() {
        if let Some(rule) = bracket::select(&specific, query) {
            return Ok((*rule).clone());
        }
        if fallback == CountryFallback::Strict {
            return Err(not_found());
        }
    }

    bracket::select(&wildcard, query)
        .map(|rule| (*rule).clone())
        .ok_or_else(not_found)
}

/// Resolver for one rule family over a repository
pub struct CostResolver<R: CostRule> {
    repository: Arc<dyn RuleRepository<R>>,
    fallback: CountryFallback,
    metrics: Option<Arc<TariffMetrics>>,
}

impl<R: CostRule> CostResolver<R> {
    pub fn new(repository: Arc<dyn RuleRepository<R>>) -> Self {
        Self {
            repository,
            fallback: CountryFallback::Strict,
            metrics: None,
        }
    }

    pub fn with_fallback(mut self, fallback: CountryFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<TariffMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn fallback(&self) -> CountryFallback {
        self.fallback
    }

    /// Fetch the scope's rules and select the one applying to `country`/`query`.
    ///
    /// A missing or blank country selects among wildcard rules only.
    #[instrument(skip(self), fields(kind = R::KIND.as_str()))]
    pub async fn resolve(&self, scope: &R::Scope, country: Option<&str>, query: Decimal) -> Result<R> {
        let candidates = match self.repository.fetch_rules(scope).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.record("error");
                return Err(e);
            }
        };

        let country = Country::from_request(country);
        match select_rule(&candidates, scope, &country, query, self.fallback) {
            Ok(rule) => {
                debug!(
                    rule_id = %rule.id(),
                    threshold = %rule.threshold(),
                    country = %rule.country(),
                    "Resolved cost rule"
                );
                self.record("found");
                Ok(rule)
            }
            Err(e) => {
                debug!(candidates = candidates.len(), "No cost rule applies");
                self.record("not_found");
                Err(e.into())
            }
        }
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_resolution(R::KIND.as_str(), outcome);
        }
    }
}
