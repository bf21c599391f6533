//! Nivaas Audit — best-effort recorder for the append-only audit trail.
//!
//! The trail is a secondary effect: it is written after the primary payment
//! or workflow unit has committed, and a failed append must never roll back
//! or fail an already-committed effect. Failures are logged locally and
//! swallowed.

use nivaas_core::models::actor::Actor;
use nivaas_core::models::audit::CreateAuditLogEntry;
use nivaas_core::repository::AuditLogRepository;
use tracing::warn;

/// Append-only recorder of privileged actions.
#[derive(Clone)]
pub struct AuditTrail<R: AuditLogRepository> {
    repo: R,
}

impl<R: AuditLogRepository> AuditTrail<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Record a privileged action after its primary effect has committed.
    ///
    /// Best-effort: an append failure is logged at `warn` and never
    /// propagated to the caller.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        resource_type: &str,
        resource_id: Option<String>,
        details: serde_json::Value,
    ) {
        let input = CreateAuditLogEntry {
            organization_id: actor.organization_id,
            actor_id: actor.id,
            actor_role: actor.role,
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id,
            details,
        };

        if let Err(err) = self.repo.append(input).await {
            warn!(
                action,
                resource_type,
                error = %err,
                "audit append failed; primary effect is already committed and stands"
            );
        }
    }
}
