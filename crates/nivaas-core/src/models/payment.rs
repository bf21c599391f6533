//! Payment domain models.
//!
//! A [`PaymentIntent`] is a pending order handed to the external gateway; a
//! [`PaymentRecord`] is a completed, verified payment. Records are keyed by
//! the gateway's payment id — that id is the idempotency key, enforced by a
//! unique index, so at most one record can ever exist per gateway payment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the payment is for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentPurpose {
    /// Organization subscription purchase (owner-initiated).
    Subscription,
    /// Rent payment (resident-initiated).
    Rent,
}

impl PaymentPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscription => "Subscription",
            Self::Rent => "Rent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Subscription" => Some(Self::Subscription),
            "Rent" => Some(Self::Rent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentIntentStatus {
    Created,
    Verified,
    Failed,
}

impl PaymentIntentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Verified => "Verified",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(Self::Created),
            "Verified" => Some(Self::Verified),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A pending externally-facing payment order.
///
/// The amount is computed server-side from the resolved plan or rent record
/// and is authoritative; client-supplied amounts are never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Server-generated unique order id (`ord_<uuid>`), handed to the gateway.
    pub order_id: String,
    pub organization_id: Uuid,
    /// Set for rent payments; `None` for subscription purchases.
    pub tenant_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    /// Plan code for subscription purchases.
    pub plan: Option<String>,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Pending => "Pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Success" => Some(Self::Success),
            "Failed" => Some(Self::Failed),
            "Pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// A completed, verified payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    /// External gateway payment id — unique; the idempotency key.
    pub gateway_payment_id: String,
    pub order_id: String,
    pub organization_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    pub amount: i64,
    /// Payment mode as reported by the gateway (card, upi, ...).
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub transaction_date: DateTime<Utc>,
}

/// Fields required to create a new payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntent {
    pub organization_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    pub plan: Option<String>,
    pub amount: i64,
    pub currency: String,
}
