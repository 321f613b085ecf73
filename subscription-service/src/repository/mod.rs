//! Subscription persistence port.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Subscription;

mod memory;

pub use memory::InMemoryStore;

/// Durability boundary for subscription records.
///
/// The lifecycle engine treats a transition as committed only once the
/// store call returns `Ok`. Records are never deleted through this port;
/// retention is the owning application's policy, and disposal must run
/// through the engine's forced deactivation first.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert(&self, subscription: &Subscription) -> Result<()>;
    async fn update(&self, subscription: &Subscription) -> Result<()>;
    async fn find(&self, subscription_id: Uuid) -> Result<Option<Subscription>>;
}
