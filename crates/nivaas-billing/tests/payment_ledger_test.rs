//! Integration tests for the payment ledger.

use nivaas_audit::AuditTrail;
use nivaas_billing::config::MOCK_GATEWAY_KEY_ID;
use nivaas_billing::{
    BillingConfig, CreateOrderInput, PaymentLedger, VerifyPaymentInput, signature,
};
use nivaas_core::error::NivaasError;
use nivaas_core::models::actor::{Actor, ActorRole};
use nivaas_core::models::organization::CreateOrganization;
use nivaas_core::models::payment::{PaymentIntentStatus, PaymentPurpose};
use nivaas_core::models::subscription::SubscriptionStatus;
use nivaas_core::models::tenant::CreateTenant;
use nivaas_core::repository::{
    AuditLogFilter, AuditLogRepository, OrganizationRepository, PaymentRepository, Pagination,
    SubscriptionRepository, TenantRepository,
};
use nivaas_db::repository::{
    SurrealAuditLogRepository, SurrealOrganizationRepository, SurrealPaymentRepository,
    SurrealSubscriptionRepository, SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

const TEST_SECRET: &str = "test-gateway-secret";

type TestLedger = PaymentLedger<
    SurrealPaymentRepository<Db>,
    SurrealSubscriptionRepository<Db>,
    SurrealTenantRepository<Db>,
    SurrealAuditLogRepository<Db>,
>;

struct Fixture {
    ledger: TestLedger,
    payment_repo: SurrealPaymentRepository<Db>,
    subscription_repo: SurrealSubscriptionRepository<Db>,
    tenant_repo: SurrealTenantRepository<Db>,
    audit_repo: SurrealAuditLogRepository<Db>,
    org_id: Uuid,
    owner: Actor,
    resident_user: Uuid,
    tenant_id: Uuid,
    db: Surreal<Db>,
}

async fn setup_with(config_for: impl FnOnce(BillingConfig) -> BillingConfig) -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    nivaas_db::run_migrations(&db).await.unwrap();

    let org_repo = SurrealOrganizationRepository::new(db.clone());
    let org = org_repo
        .create(CreateOrganization {
            name: "Sunrise Residency".into(),
            slug: "sunrise".into(),
        })
        .await
        .unwrap();

    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let resident_user = Uuid::new_v4();
    let tenant = tenant_repo
        .create(CreateTenant {
            organization_id: org.id,
            user_id: resident_user,
            room_id: None,
            rent_amount: 12_000_00,
        })
        .await
        .unwrap();

    let config = config_for(BillingConfig {
        gateway_key_id: "gw_live_sunrise".into(),
        gateway_key_secret: TEST_SECRET.into(),
        ..BillingConfig::default()
    });

    let payment_repo = SurrealPaymentRepository::new(db.clone());
    let subscription_repo = SurrealSubscriptionRepository::new(db.clone());
    let audit_repo = SurrealAuditLogRepository::new(db.clone());
    let ledger = PaymentLedger::new(
        payment_repo.clone(),
        subscription_repo.clone(),
        tenant_repo.clone(),
        AuditTrail::new(audit_repo.clone()),
        config,
    );

    Fixture {
        ledger,
        payment_repo,
        subscription_repo,
        tenant_repo,
        audit_repo,
        org_id: org.id,
        owner: Actor::new(Uuid::new_v4(), ActorRole::Owner, org.id),
        resident_user,
        tenant_id: tenant.id,
        db,
    }
}

async fn setup() -> Fixture {
    setup_with(|c| c).await
}

async fn payment_count(db: &Surreal<Db>) -> i64 {
    let mut result = db
        .query("SELECT VALUE count() FROM payment GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<i64> = result.take(0).unwrap();
    rows.first().copied().unwrap_or(0)
}

#[tokio::test]
async fn subscription_order_uses_catalog_price() {
    let fx = setup().await;

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            tenant_id: None,
            // A displayed "discounted" amount is advisory only.
            advisory_amount: Some(99_000),
            actor: fx.owner,
        })
        .await
        .unwrap();

    assert_eq!(order.amount, 149_900);
    assert_eq!(order.currency, "INR");
    assert_eq!(order.gateway_key_id, "gw_live_sunrise");
    assert_eq!(order.advisory_amount, Some(99_000));
    assert!(order.order_id.starts_with("ord_"));
}

#[tokio::test]
async fn subscription_order_requires_owner() {
    let fx = setup().await;
    let resident = Actor::new(fx.resident_user, ActorRole::Resident, fx.org_id);

    let err = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: resident,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, NivaasError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn unknown_plan_is_rejected() {
    let fx = setup().await;

    let err = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Platinum".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, NivaasError::Validation { .. }));
}

#[tokio::test]
async fn rent_order_requires_the_resident_themself() {
    let fx = setup().await;

    // The resident's own record prices from the rent amount.
    let resident = Actor::new(fx.resident_user, ActorRole::Resident, fx.org_id);
    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Rent,
            plan: None,
            tenant_id: Some(fx.tenant_id),
            advisory_amount: None,
            actor: resident,
        })
        .await
        .unwrap();
    assert_eq!(order.amount, 12_000_00);

    // Another resident is denied.
    let stranger = Actor::new(Uuid::new_v4(), ActorRole::Resident, fx.org_id);
    let err = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Rent,
            plan: None,
            tenant_id: Some(fx.tenant_id),
            advisory_amount: None,
            actor: stranger,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NivaasError::AuthorizationDenied { .. }));

    // So is the owner — rent is paid by the tenant themself.
    let err = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Rent,
            plan: None,
            tenant_id: Some(fx.tenant_id),
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NivaasError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn bad_signature_fails_the_intent_and_records_nothing() {
    let fx = setup().await;

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap();

    let err = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id.clone(),
            gateway_payment_id: "pay_100".into(),
            signature: "deadbeef".into(),
            method: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, NivaasError::SignatureMismatch));
    assert_eq!(payment_count(&fx.db).await, 0);
    let intent = fx.payment_repo.get_intent(&order.order_id).await.unwrap();
    assert_eq!(intent.status, PaymentIntentStatus::Failed);
    assert!(
        fx.subscription_repo
            .get_by_organization(fx.org_id)
            .await
            .unwrap()
            .is_none(),
        "no activation before signature verification succeeds"
    );

    // A correct signature afterwards still completes the payment.
    let good = signature::sign(&order.order_id, "pay_100", TEST_SECRET);
    let record = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id.clone(),
            gateway_payment_id: "pay_100".into(),
            signature: good,
            method: Some("card".into()),
        })
        .await
        .unwrap();

    assert_eq!(record.amount, 149_900);
    assert_eq!(payment_count(&fx.db).await, 1);
    let sub = fx
        .subscription_repo
        .get_by_organization(fx.org_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn repeated_verification_is_idempotent() {
    let fx = setup().await;

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap();

    let sig = signature::sign(&order.order_id, "pay_200", TEST_SECRET);
    let first = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id.clone(),
            gateway_payment_id: "pay_200".into(),
            signature: sig.clone(),
            method: Some("card".into()),
        })
        .await
        .unwrap();

    let renews_before = fx
        .subscription_repo
        .get_by_organization(fx.org_id)
        .await
        .unwrap()
        .unwrap()
        .renews_at;

    let second = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id.clone(),
            gateway_payment_id: "pay_200".into(),
            signature: sig,
            method: Some("card".into()),
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(payment_count(&fx.db).await, 1);

    // Exactly one activation: the paid-up date did not move again.
    let renews_after = fx
        .subscription_repo
        .get_by_organization(fx.org_id)
        .await
        .unwrap()
        .unwrap()
        .renews_at;
    assert_eq!(renews_before, renews_after);
}

#[tokio::test]
async fn concurrent_verification_records_exactly_once() {
    let fx = setup().await;

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap();

    let sig = signature::sign(&order.order_id, "pay_300", TEST_SECRET);
    let input = |s: &str| VerifyPaymentInput {
        order_id: order.order_id.clone(),
        gateway_payment_id: "pay_300".into(),
        signature: s.to_string(),
        method: None,
    };

    let (a, b) = tokio::join!(
        fx.ledger.verify_and_record(input(&sig)),
        fx.ledger.verify_and_record(input(&sig)),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(payment_count(&fx.db).await, 1);
}

#[tokio::test]
async fn rent_verification_clears_rent_due_and_audits() {
    let fx = setup().await;
    let resident = Actor::new(fx.resident_user, ActorRole::Resident, fx.org_id);

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Rent,
            plan: None,
            tenant_id: Some(fx.tenant_id),
            advisory_amount: None,
            actor: resident,
        })
        .await
        .unwrap();

    let sig = signature::sign(&order.order_id, "pay_400", TEST_SECRET);
    fx.ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id.clone(),
            gateway_payment_id: "pay_400".into(),
            signature: sig,
            method: Some("upi".into()),
        })
        .await
        .unwrap();

    let tenant = fx.tenant_repo.get_by_id(fx.tenant_id).await.unwrap();
    assert!(!tenant.rent_due);

    // A second rent order now conflicts: nothing is due.
    let resident = Actor::new(fx.resident_user, ActorRole::Resident, fx.org_id);
    let err = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Rent,
            plan: None,
            tenant_id: Some(fx.tenant_id),
            advisory_amount: None,
            actor: resident,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NivaasError::Conflict { .. }));

    let entries = fx
        .audit_repo
        .list(
            fx.org_id,
            AuditLogFilter {
                action: Some("payment.verified".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(entries.total, 1);
}

#[tokio::test]
async fn mock_gateway_bypasses_signature_behind_explicit_flag() {
    let fx = setup_with(|mut config| {
        config.gateway_key_id = MOCK_GATEWAY_KEY_ID.into();
        config.allow_mock_gateway = true;
        config
    })
    .await;

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Basic".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap();

    // Garbage signature, but the idempotent record path still runs.
    let record = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id.clone(),
            gateway_payment_id: "pay_500".into(),
            signature: "not-a-signature".into(),
            method: None,
        })
        .await
        .unwrap();
    assert_eq!(record.amount, 49_900);
    assert_eq!(payment_count(&fx.db).await, 1);

    // And stays idempotent.
    let again = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id,
            gateway_payment_id: "pay_500".into(),
            signature: "different-garbage".into(),
            method: None,
        })
        .await
        .unwrap();
    assert_eq!(again.id, record.id);
    assert_eq!(payment_count(&fx.db).await, 1);
}

#[tokio::test]
async fn sentinel_key_alone_does_not_enable_mock_mode() {
    let fx = setup_with(|mut config| {
        config.gateway_key_id = MOCK_GATEWAY_KEY_ID.into();
        config.allow_mock_gateway = false;
        config
    })
    .await;

    let order = fx
        .ledger
        .create_order(CreateOrderInput {
            purpose: PaymentPurpose::Subscription,
            plan: Some("Basic".into()),
            tenant_id: None,
            advisory_amount: None,
            actor: fx.owner,
        })
        .await
        .unwrap();

    let err = fx
        .ledger
        .verify_and_record(VerifyPaymentInput {
            order_id: order.order_id,
            gateway_payment_id: "pay_600".into(),
            signature: "not-a-signature".into(),
            method: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NivaasError::SignatureMismatch));
    assert_eq!(payment_count(&fx.db).await, 0);
}
