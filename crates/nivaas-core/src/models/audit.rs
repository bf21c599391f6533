//! Audit log domain model.
//!
//! Entries are append-only: the repository trait exposes no update or delete,
//! and no normal application path mutates a written entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::ActorRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    /// Action code, e.g. `exit.approved`, `payment.verified`.
    pub action: String,
    /// Target resource type, e.g. `tenant`, `payment`.
    pub resource_type: String,
    pub resource_id: Option<String>,
    /// Free-form context for the action.
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Fields required to append a new audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    pub organization_id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: serde_json::Value,
}
