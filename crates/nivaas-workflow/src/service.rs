//! Exit workflow service — request, resolve, finalize.

use chrono::NaiveDate;
use nivaas_core::error::NivaasResult;
use nivaas_core::models::actor::{Actor, ActorRole};
use nivaas_core::models::tenant::{ExitRequestStatus, Tenant, TenantStatus};
use nivaas_core::repository::{AuditLogRepository, TenantRepository};
use nivaas_audit::AuditTrail;
use tracing::info;
use uuid::Uuid;

use crate::error::WorkflowError;

/// Decision on a pending exit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Approved,
    Rejected,
}

/// Input for the request-exit flow.
#[derive(Debug)]
pub struct RequestExitInput {
    pub tenant_id: Uuid,
    pub reason: String,
    pub requested_date: NaiveDate,
    pub actor: Actor,
}

/// Input for the resolve-exit flow.
#[derive(Debug)]
pub struct ResolveExitInput {
    pub tenant_id: Uuid,
    pub decision: ExitDecision,
    pub comment: Option<String>,
    /// Departure date for approvals; defaults to the requested date.
    pub exit_date: Option<NaiveDate>,
    pub actor: Actor,
}

/// Exit workflow service.
///
/// Generic over repository implementations so that the workflow layer has
/// no dependency on the database crate.
pub struct ExitWorkflow<T: TenantRepository, A: AuditLogRepository> {
    tenant_repo: T,
    audit: AuditTrail<A>,
}

impl<T: TenantRepository, A: AuditLogRepository> ExitWorkflow<T, A> {
    pub fn new(tenant_repo: T, audit: AuditTrail<A>) -> Self {
        Self { tenant_repo, audit }
    }

    /// `Active → ExitPending`: open an exit request.
    ///
    /// Residents may request for their own record; owners and admins on a
    /// resident's behalf. Conflicts if a request is already pending or the
    /// tenant is not active.
    pub async fn request_exit(&self, input: RequestExitInput) -> NivaasResult<Tenant> {
        // 1. Read and authorize.
        let tenant = self.tenant_repo.get_by_id(input.tenant_id).await?;
        let allowed = match input.actor.role {
            ActorRole::Owner | ActorRole::Admin => {
                tenant.organization_id == input.actor.organization_id
            }
            ActorRole::Resident => {
                tenant.user_id == input.actor.id
                    && tenant.organization_id == input.actor.organization_id
            }
            ActorRole::System => false,
        };
        if !allowed {
            return Err(WorkflowError::Unauthorized.into());
        }

        // 2. Precise state validation for the caller.
        if tenant.exit_request.status == ExitRequestStatus::Pending {
            return Err(WorkflowError::ExitAlreadyPending.into());
        }
        if tenant.status != TenantStatus::Active {
            return Err(WorkflowError::TenantNotActive.into());
        }

        // 3. Conditional write; a concurrent winner leaves nothing to match.
        let updated = self
            .tenant_repo
            .mark_exit_pending(input.tenant_id, input.reason.clone(), input.requested_date)
            .await?
            .ok_or(WorkflowError::ExitAlreadyPending)?;

        info!(tenant_id = %input.tenant_id, "exit requested");
        self.audit
            .record(
                &input.actor,
                "exit.requested",
                "tenant",
                Some(input.tenant_id.to_string()),
                serde_json::json!({
                    "reason": input.reason,
                    "requested_date": input.requested_date.to_string(),
                }),
            )
            .await;

        Ok(updated)
    }

    /// `ExitPending → OnNotice` (approved) or `ExitPending → Active`
    /// (rejected, sub-state cleared).
    ///
    /// Of two concurrent resolutions exactly one succeeds; the loser gets a
    /// conflict and the tenant reflects only the winner.
    pub async fn resolve_exit(&self, input: ResolveExitInput) -> NivaasResult<Tenant> {
        // 1. Read and authorize — resolution is an owner/admin action.
        let tenant = self.tenant_repo.get_by_id(input.tenant_id).await?;
        let allowed = matches!(input.actor.role, ActorRole::Owner | ActorRole::Admin)
            && tenant.organization_id == input.actor.organization_id;
        if !allowed {
            return Err(WorkflowError::Unauthorized.into());
        }

        // 2. Precise state validation.
        if tenant.exit_request.status != ExitRequestStatus::Pending {
            return Err(WorkflowError::NoPendingRequest.into());
        }

        // 3. Conditional write per decision.
        let updated = match input.decision {
            ExitDecision::Approved => {
                let exit_date = input
                    .exit_date
                    .or(tenant.exit_request.requested_date)
                    .ok_or(WorkflowError::ExitDateRequired)?;
                self.tenant_repo
                    .mark_exit_approved(input.tenant_id, input.comment.clone(), exit_date)
                    .await?
            }
            ExitDecision::Rejected => {
                self.tenant_repo.mark_exit_rejected(input.tenant_id).await?
            }
        }
        .ok_or(WorkflowError::NoPendingRequest)?;

        let action = match input.decision {
            ExitDecision::Approved => "exit.approved",
            ExitDecision::Rejected => "exit.rejected",
        };
        info!(tenant_id = %input.tenant_id, action, "exit request resolved");
        self.audit
            .record(
                &input.actor,
                action,
                "tenant",
                Some(input.tenant_id.to_string()),
                serde_json::json!({
                    "comment": input.comment,
                    "exit_date": updated.exit_date.map(|d| d.to_string()),
                }),
            )
            .await;

        Ok(updated)
    }

    /// `OnNotice → Exited`: finalize once the exit date is reached.
    ///
    /// Releases the room/bed assignment in the same unit of work. Triggered
    /// by an administrative action or the scheduled sweep.
    pub async fn finalize_exit(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
        actor: &Actor,
    ) -> NivaasResult<Tenant> {
        // 1. Read and authorize.
        let tenant = self.tenant_repo.get_by_id(tenant_id).await?;
        let allowed = matches!(
            actor.role,
            ActorRole::Owner | ActorRole::Admin | ActorRole::System
        ) && tenant.organization_id == actor.organization_id;
        if !allowed {
            return Err(WorkflowError::Unauthorized.into());
        }

        // 2. Precise state validation.
        if tenant.status != TenantStatus::OnNotice {
            return Err(WorkflowError::NotOnNotice.into());
        }
        match tenant.exit_date {
            Some(date) if date <= today => {}
            Some(_) => return Err(WorkflowError::ExitDateNotReached.into()),
            None => return Err(WorkflowError::NotOnNotice.into()),
        }

        // 3. Conditional write.
        let updated = self
            .tenant_repo
            .mark_exited(tenant_id, today)
            .await?
            .ok_or(WorkflowError::NotOnNotice)?;

        info!(tenant_id = %tenant_id, "exit finalized");
        self.audit
            .record(
                actor,
                "exit.finalized",
                "tenant",
                Some(tenant_id.to_string()),
                serde_json::json!({
                    "exit_date": tenant.exit_date.map(|d| d.to_string()),
                    "released_room": tenant.room_id.map(|r| r.to_string()),
                }),
            )
            .await;

        Ok(updated)
    }

    /// Finalize every on-notice tenant of the organization whose exit date
    /// has been reached. Entry point for the scheduled sweep.
    ///
    /// Tenants finalized concurrently by another caller are skipped.
    pub async fn sweep_due_exits(
        &self,
        organization_id: Uuid,
        today: NaiveDate,
        actor: &Actor,
    ) -> NivaasResult<Vec<Tenant>> {
        let due = self
            .tenant_repo
            .list_exits_due(organization_id, today)
            .await?;

        let mut finalized = Vec::with_capacity(due.len());
        for tenant in due {
            match self.finalize_exit(tenant.id, today, actor).await {
                Ok(updated) => finalized.push(updated),
                // Lost to a concurrent finalize; nothing to do.
                Err(nivaas_core::error::NivaasError::Conflict { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        info!(
            organization_id = %organization_id,
            count = finalized.len(),
            "exit sweep complete"
        );
        Ok(finalized)
    }
}
