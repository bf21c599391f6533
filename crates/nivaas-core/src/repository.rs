//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Exit-state mutations are
//! compare-and-set: they return `Ok(None)` when the tenant was not in the
//! expected state (either it never was, or a concurrent caller won the
//! race), and the workflow layer maps that to a conflict error. The
//! verified-payment insert is the one multi-entity atomic unit; its
//! idempotency rests on the gateway-payment-id uniqueness constraint, not
//! on external locking.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::NivaasResult;
use crate::models::{
    audit::{AuditLogEntry, CreateAuditLogEntry},
    organization::{CreateOrganization, Organization},
    payment::{CreatePaymentIntent, PaymentIntent, PaymentPurpose, PaymentRecord},
    room::{CreateRoom, Room},
    subscription::Subscription,
    tenant::{CreateTenant, Tenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Organization & Room (global scope)
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = NivaasResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = NivaasResult<Organization>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = NivaasResult<Organization>> + Send;
}

pub trait RoomRepository: Send + Sync {
    fn create(&self, input: CreateRoom) -> impl Future<Output = NivaasResult<Room>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = NivaasResult<Room>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant (organization scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = NivaasResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = NivaasResult<Tenant>> + Send;

    /// CAS: record a pending exit request iff the tenant is `Active` with no
    /// pending request. `Ok(None)` = guard failed.
    fn mark_exit_pending(
        &self,
        id: Uuid,
        reason: String,
        requested_date: NaiveDate,
    ) -> impl Future<Output = NivaasResult<Option<Tenant>>> + Send;

    /// CAS: approve the pending request, moving the tenant on notice with
    /// the given exit date. `Ok(None)` = no pending request (lost race or
    /// wrong state).
    fn mark_exit_approved(
        &self,
        id: Uuid,
        admin_comment: Option<String>,
        exit_date: NaiveDate,
    ) -> impl Future<Output = NivaasResult<Option<Tenant>>> + Send;

    /// CAS: reject the pending request, clearing the sub-state and restoring
    /// `Active`. `Ok(None)` = no pending request. Rejection leaves no resting
    /// sub-state, so the reviewer's comment is not persisted on the tenant;
    /// it travels via the audit trail instead.
    fn mark_exit_rejected(
        &self,
        id: Uuid,
    ) -> impl Future<Output = NivaasResult<Option<Tenant>>> + Send;

    /// CAS: finalize an approved exit whose exit date has been reached —
    /// marks the tenant `Exited` and releases the room/bed assignment in the
    /// same unit of work. `Ok(None)` = not on notice or date not reached.
    fn mark_exited(
        &self,
        id: Uuid,
        today: NaiveDate,
    ) -> impl Future<Output = NivaasResult<Option<Tenant>>> + Send;

    /// On-notice tenants whose exit date is on or before `today`.
    fn list_exits_due(
        &self,
        organization_id: Uuid,
        today: NaiveDate,
    ) -> impl Future<Output = NivaasResult<Vec<Tenant>>> + Send;
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Business effect applied inside the verified-payment unit of work.
#[derive(Debug, Clone)]
pub enum PaymentEffect {
    /// Activate (or extend) the organization's subscription.
    ActivateSubscription {
        plan: String,
        renews_at: DateTime<Utc>,
    },
    /// Clear the tenant's outstanding rent.
    ClearRentDue { tenant_id: Uuid },
}

/// Input to [`PaymentRepository::record_verified`].
#[derive(Debug, Clone)]
pub struct RecordVerifiedPayment {
    pub order_id: String,
    pub gateway_payment_id: String,
    pub organization_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub purpose: PaymentPurpose,
    pub amount: i64,
    pub method: Option<String>,
    pub effect: PaymentEffect,
}

/// Outcome of the idempotent record step.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// This call inserted the record and applied the effect.
    Recorded(PaymentRecord),
    /// A record for this gateway payment id already existed; no side
    /// effects were applied by this call.
    Duplicate(PaymentRecord),
}

impl RecordOutcome {
    pub fn into_record(self) -> PaymentRecord {
        match self {
            Self::Recorded(r) | Self::Duplicate(r) => r,
        }
    }
}

pub trait PaymentRepository: Send + Sync {
    fn create_intent(
        &self,
        input: CreatePaymentIntent,
    ) -> impl Future<Output = NivaasResult<PaymentIntent>> + Send;
    fn get_intent(&self, order_id: &str)
    -> impl Future<Output = NivaasResult<PaymentIntent>> + Send;
    /// Terminal: mark the intent failed (signature mismatch).
    fn mark_intent_failed(
        &self,
        order_id: &str,
    ) -> impl Future<Output = NivaasResult<()>> + Send;
    fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> impl Future<Output = NivaasResult<Option<PaymentRecord>>> + Send;
    /// Atomic unit: insert the payment record (unique gateway id), mark the
    /// intent verified, and apply the business effect. A concurrent
    /// duplicate loses on the uniqueness constraint and resolves to
    /// [`RecordOutcome::Duplicate`] with the winner's record.
    fn record_verified(
        &self,
        input: RecordVerifiedPayment,
    ) -> impl Future<Output = NivaasResult<RecordOutcome>> + Send;
}

pub trait SubscriptionRepository: Send + Sync {
    fn get_by_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = NivaasResult<Option<Subscription>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only, organization scope)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = NivaasResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        organization_id: Uuid,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = NivaasResult<PaginatedResult<AuditLogEntry>>> + Send;
}
