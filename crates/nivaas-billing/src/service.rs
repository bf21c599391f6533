//! Payment ledger — order creation and idempotent payment verification.

use chrono::{Duration, Utc};
use nivaas_core::error::{NivaasError, NivaasResult};
use nivaas_core::models::actor::{Actor, ActorRole};
use nivaas_core::models::payment::{
    CreatePaymentIntent, PaymentIntentStatus, PaymentPurpose, PaymentRecord,
};
use nivaas_core::models::subscription::SubscriptionStatus;
use nivaas_core::repository::{
    AuditLogRepository, PaymentEffect, PaymentRepository, RecordOutcome, RecordVerifiedPayment,
    SubscriptionRepository, TenantRepository,
};
use nivaas_audit::AuditTrail;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::signature;

/// Input for order creation.
#[derive(Debug)]
pub struct CreateOrderInput {
    pub purpose: PaymentPurpose,
    /// Plan code for subscription purchases.
    pub plan: Option<String>,
    /// Tenant whose rent is being paid (rent purpose).
    pub tenant_id: Option<Uuid>,
    /// The amount the client displayed (e.g. after a coupon). Advisory
    /// only — echoed back for display, never used for pricing.
    pub advisory_amount: Option<i64>,
    pub actor: Actor,
}

/// Gateway-facing fields for the client checkout step.
#[derive(Debug, Clone)]
pub struct CheckoutOrder {
    pub order_id: String,
    /// Server-computed, authoritative amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Public gateway key id for the checkout widget.
    pub gateway_key_id: String,
    /// Echo of the client-displayed amount, for UI reconciliation.
    pub advisory_amount: Option<i64>,
}

/// Input for payment verification, from the gateway callback or a
/// client-relayed payload.
#[derive(Debug)]
pub struct VerifyPaymentInput {
    pub order_id: String,
    pub gateway_payment_id: String,
    /// Hex HMAC-SHA256 signature over `"{order_id}|{gateway_payment_id}"`.
    pub signature: String,
    /// Payment mode as reported by the gateway.
    pub method: Option<String>,
}

/// Payment ledger service.
///
/// Generic over repository implementations so that the billing layer has
/// no dependency on the database crate.
pub struct PaymentLedger<P, S, T, A>
where
    P: PaymentRepository,
    S: SubscriptionRepository,
    T: TenantRepository,
    A: AuditLogRepository,
{
    payment_repo: P,
    subscription_repo: S,
    tenant_repo: T,
    audit: AuditTrail<A>,
    config: BillingConfig,
}

impl<P, S, T, A> PaymentLedger<P, S, T, A>
where
    P: PaymentRepository,
    S: SubscriptionRepository,
    T: TenantRepository,
    A: AuditLogRepository,
{
    pub fn new(
        payment_repo: P,
        subscription_repo: S,
        tenant_repo: T,
        audit: AuditTrail<A>,
        config: BillingConfig,
    ) -> Self {
        Self {
            payment_repo,
            subscription_repo,
            tenant_repo,
            audit,
            config,
        }
    }

    /// Create a payment order intent with a server-computed amount.
    ///
    /// Subscription purchases require an owner-role actor; rent payments
    /// require the resident acting on their own record.
    pub async fn create_order(&self, input: CreateOrderInput) -> NivaasResult<CheckoutOrder> {
        // 1. Authorize and price the order server-side.
        let (amount, plan, tenant_id) = match input.purpose {
            PaymentPurpose::Subscription => {
                if input.actor.role != ActorRole::Owner {
                    return Err(BillingError::Unauthorized.into());
                }
                let code = input.plan.ok_or(BillingError::PlanRequired)?;
                let spec = self
                    .config
                    .plan(&code)
                    .ok_or_else(|| BillingError::UnknownPlan(code.clone()))?;
                (spec.amount, Some(code), None)
            }
            PaymentPurpose::Rent => {
                let tenant_id = input.tenant_id.ok_or(BillingError::TenantRequired)?;
                let tenant = self.tenant_repo.get_by_id(tenant_id).await?;
                let own_record = input.actor.role == ActorRole::Resident
                    && tenant.user_id == input.actor.id
                    && tenant.organization_id == input.actor.organization_id;
                if !own_record {
                    return Err(BillingError::Unauthorized.into());
                }
                if !tenant.rent_due {
                    return Err(BillingError::NoRentDue.into());
                }
                (tenant.rent_amount, None, Some(tenant_id))
            }
        };

        if let Some(displayed) = input.advisory_amount {
            if displayed != amount {
                debug!(
                    displayed,
                    amount, "client-displayed amount differs from server amount; using server amount"
                );
            }
        }

        // 2. Persist the intent.
        let intent = self
            .payment_repo
            .create_intent(CreatePaymentIntent {
                organization_id: input.actor.organization_id,
                tenant_id,
                purpose: input.purpose,
                plan,
                amount,
                currency: self.config.currency.clone(),
            })
            .await?;

        Ok(CheckoutOrder {
            order_id: intent.order_id,
            amount: intent.amount,
            currency: intent.currency,
            gateway_key_id: self.config.gateway_key_id.clone(),
            advisory_amount: input.advisory_amount,
        })
    }

    /// Verify a gateway payment callback and record it exactly once.
    ///
    /// On signature mismatch the intent is marked failed and no record is
    /// created. On match, the record insert, intent update, and business
    /// effect (subscription activation or rent clearing) run as one atomic
    /// unit keyed on the gateway payment id.
    pub async fn verify_and_record(
        &self,
        input: VerifyPaymentInput,
    ) -> NivaasResult<PaymentRecord> {
        // 1. Resolve the intent.
        let intent = self.payment_repo.get_intent(&input.order_id).await?;

        // 2. Verify the signature (constant-time), unless mock verification
        //    is explicitly enabled with the sentinel key.
        if self.config.mock_gateway_active() {
            warn!(
                order_id = %input.order_id,
                "mock gateway verification active; bypassing signature check"
            );
        } else if !signature::verify(
            &input.order_id,
            &input.gateway_payment_id,
            &self.config.gateway_key_secret,
            &input.signature,
        ) {
            self.payment_repo.mark_intent_failed(&input.order_id).await?;
            warn!(order_id = %input.order_id, "gateway signature mismatch; intent marked failed");
            return Err(BillingError::SignatureMismatch.into());
        }

        // 3. Idempotency short-circuit: a record for this gateway payment
        //    already exists — return it unchanged, no duplicate effects.
        if let Some(existing) = self
            .payment_repo
            .find_by_gateway_id(&input.gateway_payment_id)
            .await?
        {
            return Ok(existing);
        }

        // A verified intent with a *different* gateway payment id is a
        // conflict, not a retry.
        if intent.status == PaymentIntentStatus::Verified {
            return Err(BillingError::OrderAlreadyVerified.into());
        }

        // 4. Work out the business effect.
        let effect = match intent.purpose {
            PaymentPurpose::Subscription => {
                let plan_code = intent.plan.clone().ok_or_else(|| {
                    NivaasError::Internal("subscription intent without plan".into())
                })?;
                let spec = self
                    .config
                    .plan(&plan_code)
                    .ok_or_else(|| BillingError::UnknownPlan(plan_code.clone()))?;

                // Extend from the current paid-up date when still active,
                // otherwise from now.
                let now = Utc::now();
                let current = self
                    .subscription_repo
                    .get_by_organization(intent.organization_id)
                    .await?;
                let base = match &current {
                    Some(sub) if sub.status == SubscriptionStatus::Active && sub.renews_at > now => {
                        sub.renews_at
                    }
                    _ => now,
                };
                PaymentEffect::ActivateSubscription {
                    plan: plan_code,
                    renews_at: base + Duration::days(spec.period_days),
                }
            }
            PaymentPurpose::Rent => {
                let tenant_id = intent.tenant_id.ok_or_else(|| {
                    NivaasError::Internal("rent intent without tenant".into())
                })?;
                PaymentEffect::ClearRentDue { tenant_id }
            }
        };

        // 5. Record and apply atomically; a concurrent duplicate resolves
        //    to the winner's record.
        let outcome = self
            .payment_repo
            .record_verified(RecordVerifiedPayment {
                order_id: intent.order_id.clone(),
                gateway_payment_id: input.gateway_payment_id.clone(),
                organization_id: intent.organization_id,
                tenant_id: intent.tenant_id,
                purpose: intent.purpose,
                amount: intent.amount,
                method: input.method.clone(),
                effect,
            })
            .await?;

        // 6. Best-effort audit, only when this call applied the effects.
        match outcome {
            RecordOutcome::Recorded(record) => {
                let actor = Actor::new(Uuid::nil(), ActorRole::System, intent.organization_id);
                self.audit
                    .record(
                        &actor,
                        "payment.verified",
                        "payment",
                        Some(record.id.to_string()),
                        serde_json::json!({
                            "order_id": record.order_id,
                            "gateway_payment_id": record.gateway_payment_id,
                            "purpose": record.purpose.as_str(),
                            "amount": record.amount,
                        }),
                    )
                    .await;
                Ok(record)
            }
            RecordOutcome::Duplicate(record) => Ok(record),
        }
    }
}
