//! In-memory stores backed by `DashMap`

use super::{PriceTableStore, RuleRepository};
use async_trait::async_trait;
use dashmap::DashMap;
use paybill_common::{CostRule, PriceGroup, PriceTable, Result, ScopeKey};
use uuid::Uuid;

/// Rule store indexed by scope
pub struct InMemoryRuleRepository<R: CostRule> {
    by_scope: DashMap<R::Scope, Vec<R>>,
    scope_of: DashMap<Uuid, R::Scope>,
}

impl<R: CostRule> InMemoryRuleRepository<R> {
    pub fn new() -> Self {
        Self {
            by_scope: DashMap::new(),
            scope_of: DashMap::new(),
        }
    }

    /// Seed a repository from a list of rules
    pub fn with_rules(rules: impl IntoIterator<Item = R>) -> Self {
        let repo = Self::new();
        for rule in rules {
            repo.upsert(rule);
        }
        repo
    }

    /// Insert a rule or replace the rule with the same id.
    ///
    /// Returns the scope the rule was previously stored under when it moved,
    /// so callers holding a cache can invalidate both scopes.
    pub fn upsert(&self, rule: R) -> Option<R::Scope> {
        let id = rule.id();
        let scope = rule.scope().clone();

        let previous = self.scope_of.insert(id, scope.clone());
        let moved = previous.filter(|old| *old != scope);
        if let Some(old) = &moved {
            if let Some(mut rules) = self.by_scope.get_mut(old) {
                rules.retain(|r| r.id() != id);
            }
        }

        let mut rules = self.by_scope.entry(scope).or_default();
        match rules.iter().position(|r| r.id() == id) {
            Some(index) => rules[index] = rule,
            None => rules.push(rule),
        }
        moved
    }

    /// Soft-disable a rule. Returns its scope if the rule exists.
    pub fn deactivate(&self, id: Uuid) -> Option<R::Scope> {
        let scope = self.scope_of.get(&id).map(|s| s.value().clone())?;
        let mut rules = self.by_scope.get_mut(&scope)?;
        let rule = rules.iter_mut().find(|r| r.id() == id)?;
        rule.set_active(false);
        Some(scope)
    }

    /// Number of stored rules, active or not
    pub fn len(&self) -> usize {
        self.scope_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope_of.is_empty()
    }
}

impl<R: CostRule> Default for InMemoryRuleRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: CostRule> RuleRepository<R> for InMemoryRuleRepository<R> {
    async fn fetch_rules(&self, scope: &R::Scope) -> Result<Vec<R>> {
        Ok(self
            .by_scope
            .get(scope)
            .map(|rules| rules.iter().filter(|r| r.is_active()).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_rules_for_merchant(&self, merchant_id: Uuid) -> Result<Vec<R>> {
        Ok(self
            .by_scope
            .iter()
            .filter(|entry| entry.key().merchant_id() == Some(merchant_id))
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|r| r.is_active())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect())
    }
}

/// Price group and price table store
#[derive(Default)]
pub struct InMemoryPriceTableStore {
    groups: DashMap<String, PriceGroup>,
    tables: DashMap<String, PriceTable>,
}

impl InMemoryPriceTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the group for its region
    pub fn upsert_group(&self, group: PriceGroup) {
        self.groups.insert(group.region.clone(), group);
    }

    /// Insert or replace the table for its region
    pub fn upsert_table(&self, table: PriceTable) {
        self.tables.insert(table.region.clone(), table);
    }

    pub fn remove_table(&self, region: &str) -> Option<PriceTable> {
        self.tables.remove(region).map(|(_, table)| table)
    }
}

#[async_trait]
impl PriceTableStore for InMemoryPriceTableStore {
    async fn fetch_table(&self, region: &str) -> Result<Option<PriceTable>> {
        Ok(self.tables.get(region).map(|t| t.value().clone()))
    }

    async fn fetch_all_price_groups(&self) -> Result<Vec<PriceGroup>> {
        let mut groups: Vec<PriceGroup> = self
            .groups
            .iter()
            .filter(|g| g.is_active)
            .map(|g| g.value().clone())
            .collect();
        groups.sort_by(|a, b| a.region.cmp(&b.region));
        Ok(groups)
    }
}
