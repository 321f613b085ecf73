//! Caller-supplied callback ports: entitlement hooks and the plan catalog.

use async_trait::async_trait;

use crate::error::SubscriptionError;
use crate::models::{PlanAttributes, ProfileOptions, Subscription};

/// Side effects fired when service delivery starts or stops for a record:
/// granting access after activation, revoking it after deactivation.
///
/// The engine guarantees each hook fires at most once per record lifetime
/// and never skips one once the remote financial state has changed. Hooks
/// are infallible by contract; whatever they need to survive (queues,
/// retries) is the caller's concern, the engine does not catch or retry.
#[async_trait]
pub trait SubscriptionHooks: Send + Sync {
    async fn on_activate(&self, _subscription: &Subscription) {}
    async fn on_deactivate(&self, _subscription: &Subscription) {}
}

/// Hooks for callers without entitlement side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

#[async_trait]
impl SubscriptionHooks for NoHooks {}

/// Maps a subscription's plan attributes to the gateway options for that
/// plan.
///
/// The engine overlays `start_date` and `initial_amount` on the returned
/// options itself; the catalog only resolves the plan side (price,
/// description, billing cadence). A plan code the catalog cannot resolve is
/// a configuration error, not a record-level failure.
pub trait PlanCatalog: Send + Sync {
    fn profile_options(&self, plan: &PlanAttributes) -> Result<ProfileOptions, SubscriptionError>;
}

/// Catalog that bills plans exactly as their attributes describe them.
///
/// Enough for callers whose subscription records already carry authoritative
/// pricing; callers with a separate price book implement [`PlanCatalog`]
/// against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeCatalog;

impl PlanCatalog for AttributeCatalog {
    fn profile_options(&self, plan: &PlanAttributes) -> Result<ProfileOptions, SubscriptionError> {
        Ok(ProfileOptions {
            description: plan.description.clone(),
            amount: plan.amount,
            currency: plan.currency.clone(),
            billing_interval: plan.billing_interval,
            interval_count: plan.interval_count,
            start_date: chrono::Utc::now(),
            initial_amount: None,
        })
    }
}
