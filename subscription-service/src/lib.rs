//! Recurring-billing subscription lifecycle management.
//!
//! The canonical state of a subscription lives in a third-party payment
//! gateway. This crate keeps a local subscription record consistent with
//! its remote billing profile across create, modify (upgrade/downgrade)
//! and cancel, including deferred plan changes that hand off to a
//! successor record at renewal without losing track of which record is
//! authoritative.
//!
//! The core is [`services::SubscriptionLifecycle`], generic over four
//! ports: [`gateway::BillingGateway`] (remote profile operations),
//! [`repository::SubscriptionStore`] (durability),
//! [`services::PlanCatalog`] (plan-to-gateway-options mapping) and
//! [`services::SubscriptionHooks`] (entitlement side effects on
//! activation and deactivation).

pub mod error;
pub mod gateway;
pub mod models;
pub mod repository;
pub mod services;

pub use error::SubscriptionError;
