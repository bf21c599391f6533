//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! Append-only: no update or delete path exists here or in the trait.

use chrono::{DateTime, Utc};
use nivaas_core::error::NivaasResult;
use nivaas_core::models::actor::ActorRole;
use nivaas_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use nivaas_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Constrains a query-building closure so its input and output borrow the
/// same lifetime (a higher-ranked bound the compiler cannot infer for a
/// bare closure).
fn constrain_query_fn<C, F>(f: F) -> F
where
    C: Connection,
    F: for<'a> Fn(surrealdb::method::Query<'a, C>) -> surrealdb::method::Query<'a, C>,
{
    f
}

#[derive(Debug, SurrealValue)]
struct AuditRow {
    organization_id: String,
    actor_id: String,
    actor_role: String,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    details: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self, id: Uuid) -> Result<AuditLogEntry, DbError> {
        Ok(AuditLogEntry {
            id,
            organization_id: parse_uuid(&self.organization_id, "org")?,
            actor_id: parse_uuid(&self.actor_id, "actor")?,
            actor_role: ActorRole::parse(&self.actor_role)
                .ok_or_else(|| DbError::Decode(format!("unknown role: {}", self.actor_role)))?,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    organization_id: String,
    actor_id: String,
    actor_role: String,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    details: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let id = parse_uuid(&self.record_id, "audit")?;
        AuditRow {
            organization_id: self.organization_id,
            actor_id: self.actor_id,
            actor_role: self.actor_role,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            timestamp: self.timestamp,
        }
        .into_entry(id)
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> NivaasResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 organization_id = $org_id, \
                 actor_id = $actor_id, \
                 actor_role = $actor_role, \
                 action = $action, \
                 resource_type = $resource_type, \
                 resource_id = $resource_id, \
                 details = $details",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("actor_id", input.actor_id.to_string()))
            .bind(("actor_role", input.actor_role.as_str().to_string()))
            .bind(("action", input.action))
            .bind(("resource_type", input.resource_type))
            .bind(("resource_id", input.resource_id))
            .bind(("details", input.details))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row.into_entry(id)?)
    }

    async fn list(
        &self,
        organization_id: Uuid,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> NivaasResult<PaginatedResult<AuditLogEntry>> {
        let mut clauses = vec!["organization_id = $org_id".to_string()];
        if filter.actor_id.is_some() {
            clauses.push("actor_id = $actor_id".into());
        }
        if filter.action.is_some() {
            clauses.push("action = $action".into());
        }
        if filter.from.is_some() {
            clauses.push("timestamp >= $from".into());
        }
        if filter.to.is_some() {
            clauses.push("timestamp <= $to".into());
        }
        let where_clause = clauses.join(" AND ");

        let count_query = format!(
            "SELECT count() AS total FROM audit_log WHERE {where_clause} GROUP ALL"
        );
        let page_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log \
             WHERE {where_clause} \
             ORDER BY timestamp DESC \
             LIMIT $limit START $offset"
        );

        let bind_filters = constrain_query_fn(|mut builder| {
            builder = builder.bind(("org_id", organization_id.to_string()));
            if let Some(actor_id) = filter.actor_id {
                builder = builder.bind(("actor_id", actor_id.to_string()));
            }
            if let Some(action) = filter.action.clone() {
                builder = builder.bind(("action", action));
            }
            if let Some(from) = filter.from {
                builder = builder.bind(("from", from));
            }
            if let Some(to) = filter.to {
                builder = builder.bind(("to", to));
            }
            builder
        });

        let mut count_result = bind_filters(self.db.query(count_query))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = bind_filters(self.db.query(page_query))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
