//! SurrealDB implementation of [`TenantRepository`].
//!
//! Exit-state mutations are conditional updates: the `WHERE` clause carries
//! the expected state, so of two concurrent transitions on the same tenant
//! exactly one matches and the other observes an empty result set. All
//! mutations run through the [`TxnCoordinator`]; finalization is a
//! two-statement unit (release the bed, flip the tenant).

use chrono::{DateTime, NaiveDate, Utc};
use nivaas_core::error::NivaasResult;
use nivaas_core::models::tenant::{
    CreateTenant, ExitRequest, ExitRequestStatus, Tenant, TenantStatus,
};
use nivaas_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::txn::{BindValue, SurrealRunner, TxnCoordinator, UnitOfWork};

#[derive(Debug, SurrealValue)]
struct ExitRequestRow {
    status: String,
    reason: Option<String>,
    requested_date: Option<String>,
    admin_comment: Option<String>,
}

impl ExitRequestRow {
    fn try_into_exit_request(self) -> Result<ExitRequest, DbError> {
        let status = ExitRequestStatus::parse(&self.status).ok_or_else(|| {
            DbError::Decode(format!("unknown exit request status: {}", self.status))
        })?;
        Ok(ExitRequest {
            status,
            reason: self.reason,
            requested_date: self.requested_date.map(|d| parse_date(&d)).transpose()?,
            admin_comment: self.admin_comment,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TenantRow {
    organization_id: String,
    user_id: String,
    room_id: Option<String>,
    rent_amount: i64,
    rent_due: bool,
    status: String,
    exit_request: ExitRequestRow,
    exit_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        let organization_id = parse_uuid(&self.organization_id, "org")?;
        let user_id = parse_uuid(&self.user_id, "user")?;
        let room_id = self
            .room_id
            .as_deref()
            .map(|r| parse_uuid(r, "room"))
            .transpose()?;
        let status = TenantStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown tenant status: {}", self.status)))?;
        Ok(Tenant {
            id,
            organization_id,
            user_id,
            room_id,
            rent_amount: self.rent_amount,
            rent_due: self.rent_due,
            status,
            exit_request: self.exit_request.try_into_exit_request()?,
            exit_date: self.exit_date.map(|d| parse_date(&d)).transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    organization_id: String,
    user_id: String,
    room_id: Option<String>,
    rent_amount: i64,
    rent_due: bool,
    status: String,
    exit_request: ExitRequestRow,
    exit_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = parse_uuid(&self.record_id, "tenant")?;
        TenantRow {
            organization_id: self.organization_id,
            user_id: self.user_id,
            room_id: self.room_id,
            rent_amount: self.rent_amount,
            rent_due: self.rent_due,
            status: self.status,
            exit_request: self.exit_request,
            exit_date: self.exit_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_tenant(id)
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DbError::Decode(format!("invalid date '{value}': {e}")))
}

fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
    txn: TxnCoordinator<SurrealRunner<C>>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        let txn = TxnCoordinator::new(SurrealRunner::new(db.clone()));
        Self { db, txn }
    }

    /// Run a conditional-update unit and decode the tenant row produced at
    /// `index`, or `None` when the guard matched nothing.
    async fn run_transition(
        &self,
        id: Uuid,
        unit: UnitOfWork,
        index: usize,
    ) -> NivaasResult<Option<Tenant>> {
        let mut response = self.txn.execute_atomic(&unit).await?;
        let rows: Vec<TenantRow> = response.take(index).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_tenant(id)?)),
            None => Ok(None),
        }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> NivaasResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 organization_id = $org_id, \
                 user_id = $user_id, \
                 room_id = $room_id, \
                 rent_amount = $rent_amount, \
                 rent_due = true, \
                 status = 'Active', \
                 exit_request = { status: 'None' }",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("room_id", input.room_id.map(|r| r.to_string())))
            .bind(("rent_amount", input.rent_amount))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> NivaasResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id)?)
    }

    async fn mark_exit_pending(
        &self,
        id: Uuid,
        reason: String,
        requested_date: NaiveDate,
    ) -> NivaasResult<Option<Tenant>> {
        let unit = UnitOfWork::new()
            .statement(
                "UPDATE type::record('tenant', $id) SET \
                 exit_request.status = 'Pending', \
                 exit_request.reason = $reason, \
                 exit_request.requested_date = $requested_date, \
                 exit_request.admin_comment = NONE, \
                 updated_at = time::now() \
                 WHERE status = 'Active' AND exit_request.status != 'Pending'",
            )
            .bind("id", BindValue::Str(id.to_string()))
            .bind("reason", BindValue::Str(reason))
            .bind(
                "requested_date",
                BindValue::Str(date_str(requested_date)),
            );

        self.run_transition(id, unit, 0).await
    }

    async fn mark_exit_approved(
        &self,
        id: Uuid,
        admin_comment: Option<String>,
        exit_date: NaiveDate,
    ) -> NivaasResult<Option<Tenant>> {
        let unit = UnitOfWork::new()
            .statement(
                "UPDATE type::record('tenant', $id) SET \
                 status = 'OnNotice', \
                 exit_request.status = 'Approved', \
                 exit_request.admin_comment = $admin_comment, \
                 exit_date = $exit_date, \
                 updated_at = time::now() \
                 WHERE status = 'Active' AND exit_request.status = 'Pending'",
            )
            .bind("id", BindValue::Str(id.to_string()))
            .bind("admin_comment", BindValue::OptStr(admin_comment))
            .bind("exit_date", BindValue::Str(date_str(exit_date)));

        self.run_transition(id, unit, 0).await
    }

    async fn mark_exit_rejected(&self, id: Uuid) -> NivaasResult<Option<Tenant>> {
        // Rejection clears the sub-state entirely; any reviewer comment
        // survives only in the audit trail.
        let unit = UnitOfWork::new()
            .statement(
                "UPDATE type::record('tenant', $id) SET \
                 status = 'Active', \
                 exit_request.status = 'None', \
                 exit_request.reason = NONE, \
                 exit_request.requested_date = NONE, \
                 exit_request.admin_comment = NONE, \
                 exit_date = NONE, \
                 updated_at = time::now() \
                 WHERE status = 'Active' AND exit_request.status = 'Pending'",
            )
            .bind("id", BindValue::Str(id.to_string()));

        self.run_transition(id, unit, 0).await
    }

    async fn mark_exited(&self, id: Uuid, today: NaiveDate) -> NivaasResult<Option<Tenant>> {
        // Bed release first, guarded by a subquery on the tenant still being
        // eligible; then the tenant flips. One transaction when the backend
        // supports it.
        let unit = UnitOfWork::new()
            .statement(
                "UPDATE room SET occupied_beds -= 1 \
                 WHERE occupied_beds > 0 AND meta::id(id) IN ( \
                     SELECT VALUE room_id FROM type::record('tenant', $id) \
                     WHERE status = 'OnNotice' \
                       AND exit_date != NONE AND exit_date <= $today \
                 )",
            )
            .statement(
                "UPDATE type::record('tenant', $id) SET \
                 status = 'Exited', \
                 room_id = NONE, \
                 updated_at = time::now() \
                 WHERE status = 'OnNotice' \
                   AND exit_date != NONE AND exit_date <= $today",
            )
            .bind("id", BindValue::Str(id.to_string()))
            .bind("today", BindValue::Str(date_str(today)));

        self.run_transition(id, unit, 1).await
    }

    async fn list_exits_due(
        &self,
        organization_id: Uuid,
        today: NaiveDate,
    ) -> NivaasResult<Vec<Tenant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE organization_id = $org_id \
                   AND status = 'OnNotice' \
                   AND exit_date != NONE AND exit_date <= $today \
                 ORDER BY exit_date ASC",
            )
            .bind(("org_id", organization_id.to_string()))
            .bind(("today", date_str(today)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let tenants = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(tenants)
    }
}
