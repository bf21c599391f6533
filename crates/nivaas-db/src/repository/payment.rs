//! SurrealDB implementation of [`PaymentRepository`].
//!
//! `record_verified` is the one multi-entity atomic unit in the system:
//! insert the payment record, mark the intent verified, and apply the
//! business effect. Idempotency rests on the UNIQUE index over
//! `payment.gateway_payment_id` — a concurrent duplicate cancels the whole
//! unit and is resolved by re-reading the winner's record.

use chrono::{DateTime, Utc};
use nivaas_core::error::{NivaasError, NivaasResult};
use nivaas_core::models::payment::{
    CreatePaymentIntent, PaymentIntent, PaymentIntentStatus, PaymentPurpose, PaymentRecord,
    PaymentStatus,
};
use nivaas_core::repository::{PaymentEffect, PaymentRepository, RecordOutcome, RecordVerifiedPayment};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::txn::{BindValue, SurrealRunner, TxnCoordinator, UnitOfWork};

#[derive(Debug, SurrealValue)]
struct IntentRow {
    organization_id: String,
    tenant_id: Option<String>,
    purpose: String,
    plan: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl IntentRow {
    fn into_intent(self, order_id: String) -> Result<PaymentIntent, DbError> {
        Ok(PaymentIntent {
            order_id,
            organization_id: parse_uuid(&self.organization_id, "org")?,
            tenant_id: self
                .tenant_id
                .as_deref()
                .map(|t| parse_uuid(t, "tenant"))
                .transpose()?,
            purpose: PaymentPurpose::parse(&self.purpose)
                .ok_or_else(|| DbError::Decode(format!("unknown purpose: {}", self.purpose)))?,
            plan: self.plan,
            amount: self.amount,
            currency: self.currency,
            status: PaymentIntentStatus::parse(&self.status).ok_or_else(|| {
                DbError::Decode(format!("unknown intent status: {}", self.status))
            })?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PaymentRow {
    gateway_payment_id: String,
    order_id: String,
    organization_id: String,
    tenant_id: Option<String>,
    purpose: String,
    amount: i64,
    method: Option<String>,
    status: String,
    transaction_date: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self, id: Uuid) -> Result<PaymentRecord, DbError> {
        Ok(PaymentRecord {
            id,
            gateway_payment_id: self.gateway_payment_id,
            order_id: self.order_id,
            organization_id: parse_uuid(&self.organization_id, "org")?,
            tenant_id: self
                .tenant_id
                .as_deref()
                .map(|t| parse_uuid(t, "tenant"))
                .transpose()?,
            purpose: PaymentPurpose::parse(&self.purpose)
                .ok_or_else(|| DbError::Decode(format!("unknown purpose: {}", self.purpose)))?,
            amount: self.amount,
            method: self.method,
            status: PaymentStatus::parse(&self.status).ok_or_else(|| {
                DbError::Decode(format!("unknown payment status: {}", self.status))
            })?,
            transaction_date: self.transaction_date,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PaymentRowWithId {
    record_id: String,
    gateway_payment_id: String,
    order_id: String,
    organization_id: String,
    tenant_id: Option<String>,
    purpose: String,
    amount: i64,
    method: Option<String>,
    status: String,
    transaction_date: DateTime<Utc>,
}

impl PaymentRowWithId {
    fn try_into_record(self) -> Result<PaymentRecord, DbError> {
        let id = parse_uuid(&self.record_id, "payment")?;
        PaymentRow {
            gateway_payment_id: self.gateway_payment_id,
            order_id: self.order_id,
            organization_id: self.organization_id,
            tenant_id: self.tenant_id,
            purpose: self.purpose,
            amount: self.amount,
            method: self.method,
            status: self.status,
            transaction_date: self.transaction_date,
        }
        .into_record(id)
    }
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

/// SurrealDB implementation of the Payment repository.
#[derive(Clone)]
pub struct SurrealPaymentRepository<C: Connection> {
    db: Surreal<C>,
    txn: TxnCoordinator<SurrealRunner<C>>,
}

impl<C: Connection> SurrealPaymentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        let txn = TxnCoordinator::new(SurrealRunner::new(db.clone()));
        Self { db, txn }
    }
}

impl<C: Connection> PaymentRepository for SurrealPaymentRepository<C> {
    async fn create_intent(&self, input: CreatePaymentIntent) -> NivaasResult<PaymentIntent> {
        let order_id = format!("ord_{}", Uuid::new_v4().simple());

        let result = self
            .db
            .query(
                "CREATE type::record('payment_intent', $order_id) SET \
                 organization_id = $org_id, \
                 tenant_id = $tenant_id, \
                 purpose = $purpose, \
                 plan = $plan, \
                 amount = $amount, \
                 currency = $currency, \
                 status = 'Created'",
            )
            .bind(("order_id", order_id.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("purpose", input.purpose.as_str().to_string()))
            .bind(("plan", input.plan))
            .bind(("amount", input.amount))
            .bind(("currency", input.currency))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<IntentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "payment_intent".into(),
            id: order_id.clone(),
        })?;

        Ok(row.into_intent(order_id)?)
    }

    async fn get_intent(&self, order_id: &str) -> NivaasResult<PaymentIntent> {
        let order_id_owned = order_id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('payment_intent', $order_id)")
            .bind(("order_id", order_id_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IntentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "payment_intent".into(),
            id: order_id_owned.clone(),
        })?;

        Ok(row.into_intent(order_id_owned)?)
    }

    async fn mark_intent_failed(&self, order_id: &str) -> NivaasResult<()> {
        // A verified intent is terminal; never downgrade it.
        self.db
            .query(
                "UPDATE type::record('payment_intent', $order_id) \
                 SET status = 'Failed' WHERE status != 'Verified'",
            )
            .bind(("order_id", order_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn find_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> NivaasResult<Option<PaymentRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM payment \
                 WHERE gateway_payment_id = $gateway_payment_id",
            )
            .bind(("gateway_payment_id", gateway_payment_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PaymentRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_record()?)),
            None => Ok(None),
        }
    }

    async fn record_verified(&self, input: RecordVerifiedPayment) -> NivaasResult<RecordOutcome> {
        let payment_id = Uuid::new_v4();

        let mut unit = UnitOfWork::new()
            .statement(
                "CREATE type::record('payment', $payment_id) SET \
                 gateway_payment_id = $gateway_payment_id, \
                 order_id = $order_id, \
                 organization_id = $org_id, \
                 tenant_id = $payer_tenant_id, \
                 purpose = $purpose, \
                 amount = $amount, \
                 method = $method, \
                 status = 'Success'",
            )
            .statement(
                "UPDATE type::record('payment_intent', $order_id) \
                 SET status = 'Verified'",
            )
            .bind("payment_id", BindValue::Str(payment_id.to_string()))
            .bind(
                "gateway_payment_id",
                BindValue::Str(input.gateway_payment_id.clone()),
            )
            .bind("order_id", BindValue::Str(input.order_id.clone()))
            .bind("org_id", BindValue::Str(input.organization_id.to_string()))
            .bind(
                "payer_tenant_id",
                BindValue::OptStr(input.tenant_id.map(|t| t.to_string())),
            )
            .bind("purpose", BindValue::Str(input.purpose.as_str().into()))
            .bind("amount", BindValue::Int(input.amount))
            .bind("method", BindValue::OptStr(input.method.clone()));

        match &input.effect {
            PaymentEffect::ActivateSubscription { plan, renews_at } => {
                unit = unit
                    .statement(
                        "UPSERT type::record('subscription', $org_id) SET \
                         organization_id = $org_id, \
                         plan = $sub_plan, \
                         status = 'Active', \
                         renews_at = $renews_at, \
                         updated_at = time::now()",
                    )
                    .bind("sub_plan", BindValue::Str(plan.clone()))
                    .bind("renews_at", BindValue::DateTime(*renews_at));
            }
            PaymentEffect::ClearRentDue { tenant_id } => {
                unit = unit
                    .statement(
                        "UPDATE type::record('tenant', $rent_tenant_id) SET \
                         rent_due = false, updated_at = time::now()",
                    )
                    .bind("rent_tenant_id", BindValue::Str(tenant_id.to_string()));
            }
        }

        match self.txn.execute_atomic(&unit).await {
            Ok(mut response) => {
                let rows: Vec<PaymentRow> = response.take(0).map_err(DbError::from)?;
                let row = rows.into_iter().next().ok_or_else(|| {
                    DbError::NotFound {
                        entity: "payment".into(),
                        id: payment_id.to_string(),
                    }
                })?;
                Ok(RecordOutcome::Recorded(row.into_record(payment_id)?))
            }
            // Lost the uniqueness race: another call already recorded this
            // gateway payment. Return the winner's record unchanged.
            Err(DbError::Duplicate(_)) => {
                match self.find_by_gateway_id(&input.gateway_payment_id).await? {
                    Some(existing) => Ok(RecordOutcome::Duplicate(existing)),
                    None => Err(NivaasError::Database(
                        "duplicate payment signalled but record not found".into(),
                    )),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
