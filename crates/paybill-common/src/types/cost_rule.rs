//! Cost rules - refund and payment-channel tariffs
//!
//! Four rule families share one shape:
//! - scope key: the attributes a lookup must match exactly
//! - country: a specific ISO code or the wildcard
//! - threshold: inclusive lower bound of the rule's bracket
//!   (`days_from` for refunds, `min_amount` for channel costs)
//! - fee fields, copied verbatim to the caller
//!
//! Rules are soft-disabled through `is_active`; inactive rules never take
//! part in resolution.

use super::country::Country;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;
use uuid::Uuid;

/// Rule family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostRuleKind {
    /// Refund/chargeback cost charged to a merchant
    MerchantRefund,
    /// Refund/chargeback cost the platform pays its provider
    SystemRefund,
    /// Payment channel commission charged to a merchant
    MerchantChannel,
    /// Payment channel commission the platform pays its provider
    SystemChannel,
}

impl CostRuleKind {
    pub const ALL: [CostRuleKind; 4] = [
        CostRuleKind::MerchantRefund,
        CostRuleKind::SystemRefund,
        CostRuleKind::MerchantChannel,
        CostRuleKind::SystemChannel,
    ];

    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            CostRuleKind::MerchantRefund => "merchant_refund",
            CostRuleKind::SystemRefund => "system_refund",
            CostRuleKind::MerchantChannel => "merchant_channel",
            CostRuleKind::SystemChannel => "system_channel",
        }
    }

    /// Name of the value the bracket threshold is compared against
    pub fn query_name(&self) -> &'static str {
        match self {
            CostRuleKind::MerchantRefund | CostRuleKind::SystemRefund => "days",
            CostRuleKind::MerchantChannel | CostRuleKind::SystemChannel => "amount",
        }
    }
}

impl fmt::Display for CostRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes narrowing a rule lookup before country and bracket selection
pub trait ScopeKey: Clone + Eq + Hash + Debug + Serialize + Send + Sync + 'static {
    /// Merchant owning the rule, for merchant-scoped families
    fn merchant_id(&self) -> Option<Uuid> {
        None
    }
}

/// Common view over the four rule families
pub trait CostRule: Clone + Debug + Send + Sync + 'static {
    type Scope: ScopeKey;

    const KIND: CostRuleKind;

    fn id(&self) -> Uuid;

    fn scope(&self) -> &Self::Scope;

    fn country(&self) -> &Country;

    /// Inclusive lower bound of this rule's bracket
    fn threshold(&self) -> Decimal;

    fn is_active(&self) -> bool;

    /// Soft-enable or soft-disable the rule
    fn set_active(&mut self, active: bool);
}

// ============ Scope keys ============

/// Scope of a merchant refund cost rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefundMerchantScope {
    pub merchant_id: Uuid,
    /// Payment method name (e.g. "VISA")
    pub name: String,
    pub payout_currency: String,
    /// Refund reason (e.g. "chargeback", "reversal")
    pub undo_reason: String,
    /// Tariff region
    pub region: String,
    pub mcc_code: String,
    pub payment_stage: i32,
}

impl ScopeKey for RefundMerchantScope {
    fn merchant_id(&self) -> Option<Uuid> {
        Some(self.merchant_id)
    }
}

/// Scope of a system refund cost rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefundSystemScope {
    pub name: String,
    pub payout_currency: String,
    pub undo_reason: String,
    pub region: String,
    pub mcc_code: String,
    pub operating_company_id: String,
    pub payment_stage: i32,
}

impl ScopeKey for RefundSystemScope {}

/// Scope of a merchant payment channel cost rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMerchantScope {
    pub merchant_id: Uuid,
    pub name: String,
    pub payout_currency: String,
    pub region: String,
    pub mcc_code: String,
}

impl ScopeKey for ChannelMerchantScope {
    fn merchant_id(&self) -> Option<Uuid> {
        Some(self.merchant_id)
    }
}

/// Scope of a system payment channel cost rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelSystemScope {
    pub name: String,
    pub region: String,
    pub mcc_code: String,
    pub operating_company_id: String,
}

impl ScopeKey for ChannelSystemScope {}

// ============ Refund cost rules ============

/// Refund cost charged to a merchant, bracketed by days since the payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundCostMerchant {
    pub id: Uuid,
    #[serde(flatten)]
    pub scope: RefundMerchantScope,
    pub country: Country,
    /// Days since payment from which this rule applies
    pub days_from: u32,
    pub percent: Decimal,
    pub fix_amount: Decimal,
    pub fix_amount_currency: String,
    pub is_paid_by_merchant: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundCostMerchant {
    pub fn new(scope: RefundMerchantScope, country: impl Into<Country>, days_from: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            country: country.into(),
            days_from,
            percent: Decimal::ZERO,
            fix_amount: Decimal::ZERO,
            fix_amount_currency: String::new(),
            is_paid_by_merchant: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set percent and fixed fee
    pub fn with_fee(mut self, percent: Decimal, fix_amount: Decimal, currency: &str) -> Self {
        self.percent = percent;
        self.fix_amount = fix_amount;
        self.fix_amount_currency = currency.to_string();
        self
    }

    pub fn paid_by_merchant(mut self, paid: bool) -> Self {
        self.is_paid_by_merchant = paid;
        self
    }
}

impl CostRule for RefundCostMerchant {
    type Scope = RefundMerchantScope;

    const KIND: CostRuleKind = CostRuleKind::MerchantRefund;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> &RefundMerchantScope {
        &self.scope
    }

    fn country(&self) -> &Country {
        &self.country
    }

    fn threshold(&self) -> Decimal {
        Decimal::from(self.days_from)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }
}

/// Refund cost the platform pays, bracketed by days since the payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundCostSystem {
    pub id: Uuid,
    #[serde(flatten)]
    pub scope: RefundSystemScope,
    pub country: Country,
    pub days_from: u32,
    pub percent: Decimal,
    pub fix_amount: Decimal,
    pub fix_amount_currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundCostSystem {
    pub fn new(scope: RefundSystemScope, country: impl Into<Country>, days_from: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            country: country.into(),
            days_from,
            percent: Decimal::ZERO,
            fix_amount: Decimal::ZERO,
            fix_amount_currency: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_fee(mut self, percent: Decimal, fix_amount: Decimal, currency: &str) -> Self {
        self.percent = percent;
        self.fix_amount = fix_amount;
        self.fix_amount_currency = currency.to_string();
        self
    }
}

impl CostRule for RefundCostSystem {
    type Scope = RefundSystemScope;

    const KIND: CostRuleKind = CostRuleKind::SystemRefund;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> &RefundSystemScope {
        &self.scope
    }

    fn country(&self) -> &Country {
        &self.country
    }

    fn threshold(&self) -> Decimal {
        Decimal::from(self.days_from)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }
}

// ============ Payment channel cost rules ============

/// Payment channel commission charged to a merchant, bracketed by amount
///
/// Carries both the payment-method side fee and the platform side fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCostMerchant {
    pub id: Uuid,
    #[serde(flatten)]
    pub scope: ChannelMerchantScope,
    pub country: Country,
    /// Transaction amount from which this rule applies
    pub min_amount: Decimal,
    pub method_percent: Decimal,
    pub method_fix_amount: Decimal,
    pub method_fix_amount_currency: String,
    pub ps_percent: Decimal,
    pub ps_fixed_fee: Decimal,
    pub ps_fixed_fee_currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChannelCostMerchant {
    pub fn new(scope: ChannelMerchantScope, country: impl Into<Country>, min_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            country: country.into(),
            min_amount,
            method_percent: Decimal::ZERO,
            method_fix_amount: Decimal::ZERO,
            method_fix_amount_currency: String::new(),
            ps_percent: Decimal::ZERO,
            ps_fixed_fee: Decimal::ZERO,
            ps_fixed_fee_currency: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the payment-method side fee
    pub fn with_method_fee(mut self, percent: Decimal, fix_amount: Decimal, currency: &str) -> Self {
        self.method_percent = percent;
        self.method_fix_amount = fix_amount;
        self.method_fix_amount_currency = currency.to_string();
        self
    }

    /// Set the platform side fee
    pub fn with_ps_fee(mut self, percent: Decimal, fixed_fee: Decimal, currency: &str) -> Self {
        self.ps_percent = percent;
        self.ps_fixed_fee = fixed_fee;
        self.ps_fixed_fee_currency = currency.to_string();
        self
    }
}

impl CostRule for ChannelCostMerchant {
    type Scope = ChannelMerchantScope;

    const KIND: CostRuleKind = CostRuleKind::MerchantChannel;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> &ChannelMerchantScope {
        &self.scope
    }

    fn country(&self) -> &Country {
        &self.country
    }

    fn threshold(&self) -> Decimal {
        self.min_amount
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }
}

/// Payment channel commission the platform pays its provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCostSystem {
    pub id: Uuid,
    #[serde(flatten)]
    pub scope: ChannelSystemScope,
    pub country: Country,
    pub min_amount: Decimal,
    pub percent: Decimal,
    pub fix_amount: Decimal,
    pub fix_amount_currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChannelCostSystem {
    pub fn new(scope: ChannelSystemScope, country: impl Into<Country>, min_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            country: country.into(),
            min_amount,
            percent: Decimal::ZERO,
            fix_amount: Decimal::ZERO,
            fix_amount_currency: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_fee(mut self, percent: Decimal, fix_amount: Decimal, currency: &str) -> Self {
        self.percent = percent;
        self.fix_amount = fix_amount;
        self.fix_amount_currency = currency.to_string();
        self
    }
}

impl CostRule for ChannelCostSystem {
    type Scope = ChannelSystemScope;

    const KIND: CostRuleKind = CostRuleKind::SystemChannel;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> &ChannelSystemScope {
        &self.scope
    }

    fn country(&self) -> &Country {
        &self.country
    }

    fn threshold(&self) -> Decimal {
        self.min_amount
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }
}
