//! Actor — the authenticated caller identity.
//!
//! Produced by the (excluded) controller layer after authentication and
//! passed into every privileged operation for authorization checks and
//! audit attribution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActorRole {
    /// Organization owner — may purchase subscriptions and resolve exits.
    Owner,
    /// Property staff with administrative access.
    Admin,
    /// A resident acting on their own records.
    Resident,
    /// Internal automation (scheduled sweeps).
    System,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Admin => "Admin",
            Self::Resident => "Resident",
            Self::System => "System",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Owner" => Some(Self::Owner),
            "Admin" => Some(Self::Admin),
            "Resident" => Some(Self::Resident),
            "System" => Some(Self::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Actor {
    /// User id of the caller.
    pub id: Uuid,
    pub role: ActorRole,
    pub organization_id: Uuid,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole, organization_id: Uuid) -> Self {
        Self {
            id,
            role,
            organization_id,
        }
    }
}
