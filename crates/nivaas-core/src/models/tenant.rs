//! Tenant domain model.
//!
//! A tenant is a resident of an organization's property. The embedded
//! exit-request sub-structure is the single source of truth for the exit
//! workflow; the coarse [`TenantStatus`] is written only in the same
//! conditional update that moves the sub-state, so the two cannot disagree.
//! Nothing outside `nivaas-workflow` mutates either field.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse lifecycle status of a tenant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TenantStatus {
    Active,
    /// Exit approved; resident is serving the notice period.
    OnNotice,
    Exited,
}

impl TenantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::OnNotice => "OnNotice",
            Self::Exited => "Exited",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "OnNotice" => Some(Self::OnNotice),
            "Exited" => Some(Self::Exited),
            _ => None,
        }
    }
}

/// Status of the embedded exit request.
///
/// `Rejected` is transient: rejection clears the sub-state back to `None`
/// and the tenant returns to `Active`, so it never rests in storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitRequestStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

impl ExitRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "None" => Some(Self::None),
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Exit-request sub-state embedded in the tenant document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRequest {
    pub status: ExitRequestStatus,
    pub reason: Option<String>,
    pub requested_date: Option<NaiveDate>,
    pub admin_comment: Option<String>,
}

impl ExitRequest {
    /// The cleared sub-state: no request on file.
    pub fn cleared() -> Self {
        Self {
            status: ExitRequestStatus::None,
            reason: None,
            requested_date: None,
            admin_comment: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// The organization (property) this tenant resides in.
    pub organization_id: Uuid,
    /// Identity reference — the user account of the resident.
    pub user_id: Uuid,
    /// Current room assignment; cleared when an exit is finalized.
    pub room_id: Option<Uuid>,
    /// Monthly rent in minor currency units.
    pub rent_amount: i64,
    /// Whether rent is currently outstanding.
    pub rent_due: bool,
    pub status: TenantStatus,
    pub exit_request: ExitRequest,
    /// Agreed departure date; set on exit approval.
    pub exit_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub room_id: Option<Uuid>,
    pub rent_amount: i64,
}
