//! Billing gateway port.
//!
//! The abstract capability the lifecycle engine drives for remote effects:
//! agreement setup, profile creation, cancellation and detail lookup. Real
//! gateway clients implement this behind their own transport and
//! credentials; the engine only sees the port.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ProfileDetails, ProfileOptions};

/// Gateway-side failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway processed the request and rejected it. Carries the
    /// gateway's own message, which is surfaced on the record.
    #[error("{0}")]
    Declined(String),

    /// Transport failure or timeout. The engine treats this like a decline
    /// (abort, no local mutation); implementations should bound every call
    /// with a timeout and map it here.
    #[error("{0}")]
    Unavailable(String),
}

/// Remote recurring-billing capability.
///
/// All operations are synchronous from the engine's point of view; the
/// engine never runs two gateway calls concurrently for one subscription.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Set up a billing agreement and return the payer-facing redirect URL
    /// that yields the one-time authorization token.
    async fn setup_agreement(
        &self,
        description: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<String, GatewayError>;

    /// Create a recurring billing profile and return its gateway id.
    /// `token` is the payer's one-time authorization; `None` bills against
    /// the payer's standing agreement.
    async fn create_profile(
        &self,
        token: Option<&str>,
        options: &ProfileOptions,
    ) -> Result<String, GatewayError>;

    /// Cancel an existing billing profile.
    async fn cancel_profile(&self, profile_id: &str) -> Result<(), GatewayError>;

    /// Fetch the gateway's current view of a profile.
    async fn profile_details(&self, profile_id: &str) -> Result<ProfileDetails, GatewayError>;
}
