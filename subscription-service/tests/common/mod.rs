//! Test helper module for subscription-service integration tests.
//!
//! Provides a scriptable in-memory gateway, recording hooks and a bundled
//! harness so each test drives the lifecycle engine through its public API
//! only.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Months, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use subscription_service::gateway::{BillingGateway, GatewayError};
use subscription_service::models::{
    BillingInterval, PlanAttributes, ProfileDetails, ProfileOptions, ProfileStatus, Subscription,
};
use subscription_service::repository::{InMemoryStore, SubscriptionStore};
use subscription_service::services::{AttributeCatalog, SubscriptionHooks, SubscriptionLifecycle};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// A deterministic start date so billing-date assertions are exact.
pub fn start_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

pub fn monthly_plan(code: &str, amount: &str) -> PlanAttributes {
    PlanAttributes {
        plan_code: code.to_string(),
        description: format!("{code} plan"),
        amount: dec(amount),
        currency: "USD".to_string(),
        billing_interval: BillingInterval::Monthly,
        interval_count: 1,
        metadata: None,
    }
}

#[derive(Default)]
struct StubGatewayInner {
    profiles: HashMap<String, ProfileDetails>,
    created: Vec<(Option<String>, ProfileOptions)>,
    cancelled: Vec<String>,
    next_id: u32,
    decline_create: Option<String>,
    decline_cancel: Option<String>,
}

/// In-memory gateway mirroring a real recurring-billing backend: profile
/// creation stores a live profile whose next billing date is one month
/// after its start, cancellation flips it to cancelled and stops reporting
/// a billing date. Failures are scriptable per operation.
#[derive(Clone, Default)]
pub struct StubGateway {
    inner: Arc<Mutex<StubGatewayInner>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every create_profile call fail with `message` until cleared.
    pub fn decline_create(&self, message: &str) {
        self.inner.lock().unwrap().decline_create = Some(message.to_string());
    }

    /// Make every cancel_profile call fail with `message` until cleared.
    pub fn decline_cancel(&self, message: &str) {
        self.inner.lock().unwrap().decline_cancel = Some(message.to_string());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.decline_create = None;
        inner.decline_cancel = None;
    }

    /// Flip a profile to Expired without going through cancel, as when the
    /// gateway side lapses a profile on its own.
    pub fn expire_profile(&self, profile_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner.profiles.get_mut(profile_id).unwrap();
        profile.status = ProfileStatus::Expired;
        profile.next_billing_date = None;
    }

    /// Every (token, options) pair create_profile was called with.
    pub fn created(&self) -> Vec<(Option<String>, ProfileOptions)> {
        self.inner.lock().unwrap().created.clone()
    }

    /// Profile ids cancel_profile was called with.
    pub fn cancelled(&self) -> Vec<String> {
        self.inner.lock().unwrap().cancelled.clone()
    }

    pub fn profile(&self, profile_id: &str) -> Option<ProfileDetails> {
        self.inner.lock().unwrap().profiles.get(profile_id).cloned()
    }
}

#[async_trait]
impl BillingGateway for StubGateway {
    async fn setup_agreement(
        &self,
        _description: &str,
        return_url: &str,
        _cancel_url: &str,
    ) -> Result<String, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        Ok(format!(
            "https://gateway.test/authorize?token=T-{}&return={return_url}",
            inner.next_id
        ))
    }

    async fn create_profile(
        &self,
        token: Option<&str>,
        options: &ProfileOptions,
    ) -> Result<String, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .created
            .push((token.map(str::to_string), options.clone()));
        if let Some(message) = &inner.decline_create {
            return Err(GatewayError::Declined(message.clone()));
        }

        inner.next_id += 1;
        let profile_id = format!("P-{:04}", inner.next_id);
        inner.profiles.insert(
            profile_id.clone(),
            ProfileDetails {
                profile_id: profile_id.clone(),
                status: ProfileStatus::Active,
                next_billing_date: Some(options.start_date + Months::new(1)),
                extra: serde_json::Value::Null,
            },
        );
        Ok(profile_id)
    }

    async fn cancel_profile(&self, profile_id: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.cancelled.push(profile_id.to_string());
        if let Some(message) = &inner.decline_cancel {
            return Err(GatewayError::Declined(message.clone()));
        }

        match inner.profiles.get_mut(profile_id) {
            Some(profile) => {
                profile.status = ProfileStatus::Cancelled;
                profile.next_billing_date = None;
                Ok(())
            }
            None => Err(GatewayError::Declined(format!(
                "no profile {profile_id}"
            ))),
        }
    }

    async fn profile_details(&self, profile_id: &str) -> Result<ProfileDetails, GatewayError> {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .get(profile_id)
            .cloned()
            .ok_or_else(|| GatewayError::Declined(format!("no profile {profile_id}")))
    }
}

/// Hooks that record which records were activated and deactivated.
#[derive(Clone, Default)]
pub struct RecordingHooks {
    activated: Arc<Mutex<Vec<Uuid>>>,
    deactivated: Arc<Mutex<Vec<Uuid>>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activations(&self) -> Vec<Uuid> {
        self.activated.lock().unwrap().clone()
    }

    pub fn deactivations(&self) -> Vec<Uuid> {
        self.deactivated.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionHooks for RecordingHooks {
    async fn on_activate(&self, subscription: &Subscription) {
        self.activated
            .lock()
            .unwrap()
            .push(subscription.subscription_id);
    }

    async fn on_deactivate(&self, subscription: &Subscription) {
        self.deactivated
            .lock()
            .unwrap()
            .push(subscription.subscription_id);
    }
}

/// Store wrapper whose updates can be made to fail, for exercising the
/// consistency-alarm path.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_updates: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.inner
    }
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn insert(&self, subscription: &Subscription) -> anyhow::Result<()> {
        self.inner.insert(subscription).await
    }

    async fn update(&self, subscription: &Subscription) -> anyhow::Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("update rejected"));
        }
        self.inner.update(subscription).await
    }

    async fn find(&self, subscription_id: Uuid) -> anyhow::Result<Option<Subscription>> {
        self.inner.find(subscription_id).await
    }
}

pub type TestEngine =
    SubscriptionLifecycle<StubGateway, InMemoryStore, AttributeCatalog, RecordingHooks>;

/// Engine plus handles on its collaborators for post-hoc inspection.
pub struct TestHarness {
    pub gateway: StubGateway,
    pub store: InMemoryStore,
    pub hooks: RecordingHooks,
    pub engine: TestEngine,
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        let gateway = StubGateway::new();
        let store = InMemoryStore::new();
        let hooks = RecordingHooks::new();
        let engine = SubscriptionLifecycle::new(
            gateway.clone(),
            store.clone(),
            AttributeCatalog,
            hooks.clone(),
        );
        Self {
            gateway,
            store,
            hooks,
            engine,
        }
    }
}
