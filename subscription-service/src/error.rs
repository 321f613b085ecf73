//! Error types for subscription-service.

use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::models::SubscriptionState;

/// Failures surfaced by lifecycle operations.
///
/// Business rejections (`GatewayDeclined`, `GatewayUnavailable`) abort the
/// operation with no local state change and no partial persistence; callers
/// may retry the whole operation. `ConsistencyAlarm` is the one case where
/// remote and local state have diverged and needs operator attention rather
/// than a retry.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The gateway rejected a profile create or cancel.
    #[error("Gateway declined: {0}")]
    GatewayDeclined(String),

    /// The gateway could not be reached or timed out. Handled exactly like
    /// a decline here: abort, no state change, no automatic retry.
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// A remote gateway call succeeded but the local record could not be
    /// persisted afterwards. Never silently rolled back.
    #[error("Consistency alarm for subscription {subscription_id}: {detail}")]
    ConsistencyAlarm {
        subscription_id: Uuid,
        detail: String,
    },

    #[error("Subscription {0} not found")]
    NotFound(Uuid),

    /// Store failure before any remote effect took place.
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    /// Caller contract violation (e.g. the plan catalog has no options for a
    /// plan code). Fails fast instead of becoming a record-level error.
    #[error("Configuration error: {0}")]
    Configuration(anyhow::Error),

    #[error("Cannot {operation} a subscription in state {from}")]
    InvalidTransition {
        from: SubscriptionState,
        operation: &'static str,
    },
}

impl From<GatewayError> for SubscriptionError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Declined(message) => SubscriptionError::GatewayDeclined(message),
            GatewayError::Unavailable(message) => SubscriptionError::GatewayUnavailable(message),
        }
    }
}

impl SubscriptionError {
    /// Whether this error left remote and local state out of sync.
    pub fn is_consistency_alarm(&self) -> bool {
        matches!(self, SubscriptionError::ConsistencyAlarm { .. })
    }
}
