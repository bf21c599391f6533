//! Integration tests for the payment repository's idempotent record step.

use chrono::{Duration, Utc};
use nivaas_core::models::organization::CreateOrganization;
use nivaas_core::models::payment::{CreatePaymentIntent, PaymentIntentStatus, PaymentPurpose};
use nivaas_core::models::subscription::SubscriptionStatus;
use nivaas_core::models::tenant::CreateTenant;
use nivaas_core::repository::{
    OrganizationRepository, PaymentEffect, PaymentRepository, RecordOutcome,
    RecordVerifiedPayment, SubscriptionRepository, TenantRepository,
};
use nivaas_db::repository::{
    SurrealOrganizationRepository, SurrealPaymentRepository, SurrealSubscriptionRepository,
    SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (
    SurrealPaymentRepository<Db>,
    SurrealSubscriptionRepository<Db>,
    SurrealTenantRepository<Db>,
    Uuid, // org_id
    Surreal<Db>,
) {
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

    (
        SurrealPaymentRepository::new(db.clone()),
        SurrealSubscriptionRepository::new(db.clone()),
        SurrealTenantRepository::new(db.clone()),
        org.id,
        db,
    )
}

async fn payment_count(db: &Surreal<Db>) -> i64 {
    let mut result = db
        .query("SELECT VALUE count() FROM payment GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<i64> = result.take(0).unwrap();
    rows.first().copied().unwrap_or(0)
}

fn subscription_record(
    order_id: &str,
    gateway_payment_id: &str,
    org_id: Uuid,
) -> RecordVerifiedPayment {
    RecordVerifiedPayment {
        order_id: order_id.to_string(),
        gateway_payment_id: gateway_payment_id.to_string(),
        organization_id: org_id,
        tenant_id: None,
        purpose: PaymentPurpose::Subscription,
        amount: 149_900,
        method: Some("card".into()),
        effect: PaymentEffect::ActivateSubscription {
            plan: "Pro".into(),
            renews_at: Utc::now() + Duration::days(30),
        },
    }
}

#[tokio::test]
async fn intent_round_trip() {
    let (payment_repo, _, _, org_id, _db) = setup().await;

    let intent = payment_repo
        .create_intent(CreatePaymentIntent {
            organization_id: org_id,
            tenant_id: None,
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            amount: 149_900,
            currency: "INR".into(),
        })
        .await
        .unwrap();

    assert!(intent.order_id.starts_with("ord_"));
    assert_eq!(intent.status, PaymentIntentStatus::Created);

    let fetched = payment_repo.get_intent(&intent.order_id).await.unwrap();
    assert_eq!(fetched.amount, 149_900);
    assert_eq!(fetched.plan.as_deref(), Some("Pro"));
}

#[tokio::test]
async fn record_verified_applies_all_effects_atomically() {
    let (payment_repo, sub_repo, _, org_id, db) = setup().await;

    let intent = payment_repo
        .create_intent(CreatePaymentIntent {
            organization_id: org_id,
            tenant_id: None,
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            amount: 149_900,
            currency: "INR".into(),
        })
        .await
        .unwrap();

    let outcome = payment_repo
        .record_verified(subscription_record(&intent.order_id, "pay_001", org_id))
        .await
        .unwrap();

    let record = match outcome {
        RecordOutcome::Recorded(r) => r,
        RecordOutcome::Duplicate(_) => panic!("first record must not be a duplicate"),
    };
    assert_eq!(record.gateway_payment_id, "pay_001");
    assert_eq!(record.amount, 149_900);

    let fetched = payment_repo.get_intent(&intent.order_id).await.unwrap();
    assert_eq!(fetched.status, PaymentIntentStatus::Verified);

    let sub = sub_repo.get_by_organization(org_id).await.unwrap().unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.plan, "Pro");

    assert_eq!(payment_count(&db).await, 1);
}

#[tokio::test]
async fn duplicate_gateway_id_yields_existing_record() {
    let (payment_repo, sub_repo, _, org_id, db) = setup().await;

    let intent = payment_repo
        .create_intent(CreatePaymentIntent {
            organization_id: org_id,
            tenant_id: None,
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            amount: 149_900,
            currency: "INR".into(),
        })
        .await
        .unwrap();

    let first = payment_repo
        .record_verified(subscription_record(&intent.order_id, "pay_002", org_id))
        .await
        .unwrap()
        .into_record();

    let renews_before = sub_repo
        .get_by_organization(org_id)
        .await
        .unwrap()
        .unwrap()
        .renews_at;

    // Same gateway payment id: the unit cancels on the unique index and the
    // winner's record comes back untouched.
    let second = payment_repo
        .record_verified(subscription_record(&intent.order_id, "pay_002", org_id))
        .await
        .unwrap();

    match second {
        RecordOutcome::Duplicate(r) => assert_eq!(r.id, first.id),
        RecordOutcome::Recorded(_) => panic!("second record must resolve as a duplicate"),
    }

    assert_eq!(payment_count(&db).await, 1);

    // The effect was not re-applied.
    let renews_after = sub_repo
        .get_by_organization(org_id)
        .await
        .unwrap()
        .unwrap()
        .renews_at;
    assert_eq!(renews_before, renews_after);
}

#[tokio::test]
async fn concurrent_duplicates_record_exactly_once() {
    let (payment_repo, _, _, org_id, db) = setup().await;

    let intent = payment_repo
        .create_intent(CreatePaymentIntent {
            organization_id: org_id,
            tenant_id: None,
            purpose: PaymentPurpose::Subscription,
            plan: Some("Pro".into()),
            amount: 149_900,
            currency: "INR".into(),
        })
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        payment_repo.record_verified(subscription_record(&intent.order_id, "pay_003", org_id)),
        payment_repo.record_verified(subscription_record(&intent.order_id, "pay_003", org_id)),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    let recorded = [&a, &b]
        .iter()
        .filter(|o| matches!(o, RecordOutcome::Recorded(_)))
        .count();
    assert_eq!(recorded, 1, "exactly one call inserts the record");
    assert_eq!(a.into_record().id, b.into_record().id);
    assert_eq!(payment_count(&db).await, 1);
}

#[tokio::test]
async fn rent_effect_clears_rent_due() {
    let (payment_repo, _, tenant_repo, org_id, _db) = setup().await;

    let tenant = tenant_repo
        .create(CreateTenant {
            organization_id: org_id,
            user_id: Uuid::new_v4(),
            room_id: None,
            rent_amount: 12_000_00,
        })
        .await
        .unwrap();
    assert!(tenant.rent_due);

    let intent = payment_repo
        .create_intent(CreatePaymentIntent {
            organization_id: org_id,
            tenant_id: Some(tenant.id),
            purpose: PaymentPurpose::Rent,
            plan: None,
            amount: tenant.rent_amount,
            currency: "INR".into(),
        })
        .await
        .unwrap();

    payment_repo
        .record_verified(RecordVerifiedPayment {
            order_id: intent.order_id.clone(),
            gateway_payment_id: "pay_rent_001".into(),
            organization_id: org_id,
            tenant_id: Some(tenant.id),
            purpose: PaymentPurpose::Rent,
            amount: tenant.rent_amount,
            method: Some("upi".into()),
            effect: PaymentEffect::ClearRentDue {
                tenant_id: tenant.id,
            },
        })
        .await
        .unwrap();

    let tenant = tenant_repo.get_by_id(tenant.id).await.unwrap();
    assert!(!tenant.rent_due);
}

#[tokio::test]
async fn find_by_gateway_id_round_trip() {
    let (payment_repo, _, _, org_id, _db) = setup().await;

    assert!(
        payment_repo
            .find_by_gateway_id("pay_missing")
            .await
            .unwrap()
            .is_none()
    );

    let intent = payment_repo
        .create_intent(CreatePaymentIntent {
            organization_id: org_id,
            tenant_id: None,
            purpose: PaymentPurpose::Subscription,
            plan: Some("Basic".into()),
            amount: 49_900,
            currency: "INR".into(),
        })
        .await
        .unwrap();

    let record = payment_repo
        .record_verified(RecordVerifiedPayment {
            order_id: intent.order_id,
            gateway_payment_id: "pay_004".into(),
            organization_id: org_id,
            tenant_id: None,
            purpose: PaymentPurpose::Subscription,
            amount: 49_900,
            method: None,
            effect: PaymentEffect::ActivateSubscription {
                plan: "Basic".into(),
                renews_at: Utc::now() + Duration::days(30),
            },
        })
        .await
        .unwrap()
        .into_record();

    let found = payment_repo
        .find_by_gateway_id("pay_004")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, record.id);
    assert_eq!(found.order_id, record.order_id);
}
