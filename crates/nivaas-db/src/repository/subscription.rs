//! SurrealDB implementation of [`SubscriptionRepository`].
//!
//! Subscriptions are written only inside the verified-payment unit of work
//! (see the payment repository); this repository is read-only.

use chrono::{DateTime, Utc};
use nivaas_core::error::NivaasResult;
use nivaas_core::models::subscription::{Subscription, SubscriptionStatus};
use nivaas_core::repository::SubscriptionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SubscriptionRow {
    organization_id: String,
    plan: String,
    status: String,
    renews_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn try_into_subscription(self) -> Result<Subscription, DbError> {
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Decode(format!("invalid org UUID: {e}")))?;
        let status = SubscriptionStatus::parse(&self.status).ok_or_else(|| {
            DbError::Decode(format!("unknown subscription status: {}", self.status))
        })?;
        Ok(Subscription {
            organization_id,
            plan: self.plan,
            status,
            renews_at: self.renews_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Subscription repository.
#[derive(Clone)]
pub struct SurrealSubscriptionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSubscriptionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SubscriptionRepository for SurrealSubscriptionRepository<C> {
    async fn get_by_organization(
        &self,
        organization_id: Uuid,
    ) -> NivaasResult<Option<Subscription>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('subscription', $org_id)")
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SubscriptionRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_subscription()?)),
            None => Ok(None),
        }
    }
}
