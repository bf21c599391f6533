//! Room domain model.
//!
//! Only the occupancy-bearing subset lives here: exit finalization releases
//! a bed, so the workflow needs rooms with a bed count. General room CRUD is
//! handled elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Display number, e.g. `203-B`.
    pub number: String,
    /// Total beds in the room.
    pub capacity: u32,
    /// Currently assigned beds; decremented when an exit is finalized.
    pub occupied_beds: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a new room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoom {
    pub organization_id: Uuid,
    pub number: String,
    pub capacity: u32,
    pub occupied_beds: u32,
}
