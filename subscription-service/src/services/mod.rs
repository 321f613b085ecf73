//! Services module for subscription-service.

pub mod hooks;
pub mod lifecycle;

pub use hooks::{AttributeCatalog, NoHooks, PlanCatalog, SubscriptionHooks};
pub use lifecycle::SubscriptionLifecycle;
