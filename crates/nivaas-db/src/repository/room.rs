//! SurrealDB implementation of [`RoomRepository`].

use chrono::{DateTime, Utc};
use nivaas_core::error::NivaasResult;
use nivaas_core::models::room::{CreateRoom, Room};
use nivaas_core::repository::RoomRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoomRow {
    organization_id: String,
    number: String,
    capacity: i64,
    occupied_beds: i64,
    created_at: DateTime<Utc>,
}

impl RoomRow {
    fn into_room(self, id: Uuid) -> Result<Room, DbError> {
        let org_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Decode(format!("invalid org UUID: {e}")))?;
        Ok(Room {
            id,
            organization_id: org_id,
            number: self.number,
            capacity: self.capacity as u32,
            occupied_beds: self.occupied_beds as u32,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Room repository.
#[derive(Clone)]
pub struct SurrealRoomRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoomRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoomRepository for SurrealRoomRepository<C> {
    async fn create(&self, input: CreateRoom) -> NivaasResult<Room> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('room', $id) SET \
                 organization_id = $org_id, \
                 number = $number, \
                 capacity = $capacity, \
                 occupied_beds = $occupied_beds",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("number", input.number))
            .bind(("capacity", input.capacity as i64))
            .bind(("occupied_beds", input.occupied_beds as i64))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<RoomRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "room".into(),
            id: id_str,
        })?;

        Ok(row.into_room(id)?)
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> NivaasResult<Room> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('room', $id) \
                 WHERE organization_id = $org_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoomRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "room".into(),
            id: id_str,
        })?;

        Ok(row.into_room(id)?)
    }
}
