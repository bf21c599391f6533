//! Subscription domain model.
//!
//! One subscription per organization. Activation happens only as a side
//! effect of a verified subscription payment, inside the same atomic unit
//! that records the payment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "Inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub organization_id: Uuid,
    /// Plan code from the billing catalog.
    pub plan: String,
    pub status: SubscriptionStatus,
    /// Paid-up-to date; extended on each verified subscription payment.
    pub renews_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
