//! Remote billing profile DTOs exchanged with the gateway.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::plan::BillingInterval;

/// Status reported by the gateway for a billing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Active,
    Pending,
    Cancelled,
    Suspended,
    Expired,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Pending => "pending",
            ProfileStatus::Cancelled => "cancelled",
            ProfileStatus::Suspended => "suspended",
            ProfileStatus::Expired => "expired",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "active" => ProfileStatus::Active,
            "pending" => ProfileStatus::Pending,
            "suspended" => ProfileStatus::Suspended,
            "expired" => ProfileStatus::Expired,
            _ => ProfileStatus::Cancelled,
        }
    }

    /// Whether a cancel call to the gateway is worth issuing. Profiles that
    /// are already Cancelled or Expired (or never started) are skipped so a
    /// redundant cancel cannot error the whole operation.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, ProfileStatus::Active | ProfileStatus::Suspended)
    }
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options sent to the gateway when creating a recurring profile.
///
/// The plan catalog produces the plan-derived fields; the lifecycle engine
/// overlays `start_date` and `initial_amount` before the call goes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileOptions {
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub billing_interval: BillingInterval,
    pub interval_count: i32,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<Decimal>,
}

/// Details held by the gateway for a profile.
///
/// The shape varies with the profile's state: cancelled profiles stop
/// reporting a next billing date. `extra` carries whatever else the gateway
/// returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub profile_id: String,
    pub status: ProfileStatus,
    pub next_billing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extra: serde_json::Value,
}
