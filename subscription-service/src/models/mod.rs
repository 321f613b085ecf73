//! Domain models for subscription-service.

mod plan;
mod profile;
mod subscription;

pub use plan::{prorated_upgrade_amount, BillingInterval, PlanAttributes, PlanChange};
pub use profile::{ProfileDetails, ProfileOptions, ProfileStatus};
pub use subscription::{Subscription, SubscriptionDraft, SubscriptionState, Timeframe};
