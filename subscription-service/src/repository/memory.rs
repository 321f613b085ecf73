//! In-memory subscription store.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SubscriptionStore;
use crate::models::Subscription;

/// HashMap-backed store for tests and single-process callers. Production
/// deployments put a database behind [`SubscriptionStore`] instead.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<Uuid, Subscription>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of every stored record, in no particular order.
    pub async fn records(&self) -> Vec<Subscription> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn insert(&self, subscription: &Subscription) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&subscription.subscription_id) {
            return Err(anyhow!(
                "subscription {} already exists",
                subscription.subscription_id
            ));
        }
        records.insert(subscription.subscription_id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(&subscription.subscription_id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(anyhow!(
                "subscription {} is not persisted",
                subscription.subscription_id
            )),
        }
    }

    async fn find(&self, subscription_id: Uuid) -> Result<Option<Subscription>> {
        Ok(self.records.read().await.get(&subscription_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BillingInterval, PlanAttributes, SubscriptionDraft, SubscriptionState,
    };
    use rust_decimal::Decimal;

    fn record() -> Subscription {
        Subscription::from_draft(&SubscriptionDraft::active(
            PlanAttributes {
                plan_code: "basic".to_string(),
                description: "Basic plan".to_string(),
                amount: Decimal::new(1000, 2),
                currency: "USD".to_string(),
                billing_interval: BillingInterval::Monthly,
                interval_count: 1,
                metadata: None,
            },
            "tok",
        ))
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = InMemoryStore::new();
        let sub = record();
        store.insert(&sub).await.unwrap();

        let found = store.find(sub.subscription_id).await.unwrap().unwrap();
        assert_eq!(found.subscription_id, sub.subscription_id);
        assert_eq!(found.state, SubscriptionState::Active);
    }

    #[tokio::test]
    async fn double_insert_is_rejected() {
        let store = InMemoryStore::new();
        let sub = record();
        store.insert(&sub).await.unwrap();
        assert!(store.insert(&sub).await.is_err());
    }

    #[tokio::test]
    async fn update_requires_an_existing_record() {
        let store = InMemoryStore::new();
        let mut sub = record();
        assert!(store.update(&sub).await.is_err());

        store.insert(&sub).await.unwrap();
        sub.state = SubscriptionState::Inactive;
        store.update(&sub).await.unwrap();

        let found = store.find(sub.subscription_id).await.unwrap().unwrap();
        assert_eq!(found.state, SubscriptionState::Inactive);
    }
}
