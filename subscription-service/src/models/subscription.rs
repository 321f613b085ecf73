//! Subscription entity and lifecycle states.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::PlanAttributes;

/// Lifecycle state of a subscription record.
///
/// - `Active`: the remote profile is live and the holder receives service.
/// - `Cancelled`: the remote profile is cancelled but service continues
///   until `modify_on` (the renewal that would have charged next).
/// - `Inactive`: the profile is cancelled and service has stopped.
/// - `Changed`: the holder switched plans effective at renewal; the current
///   profile is already cancelled and a successor record waits in `Pending`.
/// - `Pending`: a deferred successor with no remote profile of its own yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Cancelled,
    Inactive,
    Changed,
    Pending,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::Active => "active",
            SubscriptionState::Cancelled => "cancelled",
            SubscriptionState::Inactive => "inactive",
            SubscriptionState::Changed => "changed",
            SubscriptionState::Pending => "pending",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "cancelled" => SubscriptionState::Cancelled,
            "inactive" => SubscriptionState::Inactive,
            "changed" => SubscriptionState::Changed,
            "pending" => SubscriptionState::Pending,
            _ => SubscriptionState::Active,
        }
    }
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a cancel or modify takes effect immediately or at the next
/// renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Now,
    Renewal,
}

/// A subscription record.
///
/// The canonical billing state lives in the gateway; this record tracks
/// which remote profile it corresponds to and where it stands in the local
/// state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub state: SubscriptionState,
    /// Remote billing profile id. Set iff a profile create has ever
    /// succeeded for this record.
    pub profile_id: Option<String>,
    /// Successor record taking over at renewal. Set iff state is `Changed`.
    pub successor_id: Option<Uuid>,
    /// When a `Changed` or `Cancelled` disposition takes effect.
    pub modify_on: Option<DateTime<Utc>>,
    /// Billing start override; profile creation defaults to "now" when
    /// absent. A `Pending` successor carries its activation date here.
    pub start_date: Option<DateTime<Utc>>,
    /// One-time charge applied at profile creation, e.g. caller-computed
    /// proration.
    pub initial_amount: Option<Decimal>,
    pub plan: PlanAttributes,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Subscription {
    /// Build an unpersisted record from a draft. The draft's one-time token
    /// is consumed by profile creation and never carried onto the record.
    pub(crate) fn from_draft(draft: &SubscriptionDraft) -> Self {
        let now = Utc::now();
        Self {
            subscription_id: Uuid::new_v4(),
            state: draft.state,
            profile_id: None,
            successor_id: None,
            modify_on: None,
            start_date: draft.start_date,
            initial_amount: draft.initial_amount,
            plan: draft.plan.clone(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// True while the holder should still receive service: the profile is
    /// live, or cancelled/changed but the paid period has not run out.
    pub fn is_live(&self) -> bool {
        matches!(
            self.state,
            SubscriptionState::Active | SubscriptionState::Cancelled | SubscriptionState::Changed
        )
    }

    /// True when cancelled and waiting for the paid period to run out.
    pub fn is_cancelled(&self) -> bool {
        self.state == SubscriptionState::Cancelled
    }

    pub(crate) fn touch(&mut self) {
        self.updated_utc = Utc::now();
    }
}

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionDraft {
    pub plan: PlanAttributes,
    /// One-time payer authorization token, consumed at profile creation.
    /// `None` for gateways that bill against a standing agreement.
    pub token: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub initial_amount: Option<Decimal>,
    /// `Active` for a regular subscription, `Pending` for a deferred
    /// successor. Other states cannot be created directly.
    pub state: SubscriptionState,
}

impl SubscriptionDraft {
    /// Draft for a new active subscription.
    pub fn active(plan: PlanAttributes, token: impl Into<String>) -> Self {
        Self {
            plan,
            token: Some(token.into()),
            start_date: None,
            initial_amount: None,
            state: SubscriptionState::Active,
        }
    }

    /// Draft for a deferred successor that starts billing at `start_date`.
    pub fn pending(plan: PlanAttributes, start_date: DateTime<Utc>) -> Self {
        Self {
            plan,
            token: None,
            start_date: Some(start_date),
            initial_amount: None,
            state: SubscriptionState::Pending,
        }
    }
}
