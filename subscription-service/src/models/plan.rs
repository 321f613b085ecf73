//! Plan attribute models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billing interval for recurring profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Daily => "daily",
            BillingInterval::Weekly => "weekly",
            BillingInterval::Monthly => "monthly",
            BillingInterval::Quarterly => "quarterly",
            BillingInterval::Annually => "annually",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "daily" => BillingInterval::Daily,
            "weekly" => BillingInterval::Weekly,
            "quarterly" => BillingInterval::Quarterly,
            "annually" => BillingInterval::Annually,
            _ => BillingInterval::Monthly,
        }
    }
}

/// User-settable plan attributes carried by a subscription.
///
/// This is the payload copied onto a successor record when a plan changes;
/// everything lifecycle-related (state, profile id, successor link, dates)
/// lives on the subscription itself and is never copied forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAttributes {
    pub plan_code: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub billing_interval: BillingInterval,
    pub interval_count: i32,
    pub metadata: Option<serde_json::Value>,
}

/// Partial overlay applied to a subscription's attributes when its plan
/// changes. `None` fields keep the current value.
#[derive(Debug, Clone, Default)]
pub struct PlanChange {
    pub plan_code: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub billing_interval: Option<BillingInterval>,
    pub interval_count: Option<i32>,
    pub metadata: Option<serde_json::Value>,
    /// One-time charge for the successor's first billing (caller-computed
    /// proration). Forwarded verbatim, never derived here.
    pub initial_amount: Option<Decimal>,
    /// Fresh payer authorization for gateways that cannot reuse the
    /// standing billing agreement when creating the replacement profile.
    pub token: Option<String>,
}

impl PlanChange {
    /// Merge this change over an existing set of plan attributes.
    pub fn apply(&self, base: &PlanAttributes) -> PlanAttributes {
        PlanAttributes {
            plan_code: self
                .plan_code
                .clone()
                .unwrap_or_else(|| base.plan_code.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| base.description.clone()),
            amount: self.amount.unwrap_or(base.amount),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| base.currency.clone()),
            billing_interval: self.billing_interval.unwrap_or(base.billing_interval),
            interval_count: self.interval_count.unwrap_or(base.interval_count),
            metadata: self.metadata.clone().or_else(|| base.metadata.clone()),
        }
    }
}

/// Linear day-fraction proration for a mid-cycle upgrade.
///
/// Charges the price difference for the remainder of the paid period.
/// Downgrades and exhausted periods prorate to zero; refunds are the calling
/// application's concern.
pub fn prorated_upgrade_amount(
    current_amount: Decimal,
    new_amount: Decimal,
    days_remaining: i64,
    days_in_period: i64,
) -> Decimal {
    if days_in_period <= 0 || days_remaining <= 0 {
        return Decimal::ZERO;
    }
    let fraction =
        Decimal::from(days_remaining.min(days_in_period)) / Decimal::from(days_in_period);
    ((new_amount - current_amount) * fraction)
        .round_dp(2)
        .max(Decimal::ZERO)
}
