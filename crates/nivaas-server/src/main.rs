//! Nivaas Server — application entry point.
//!
//! Wires the transactional core: database connection and migrations,
//! feature gates, the payment ledger, and the exit workflow. The HTTP
//! transport is mounted on top of these components elsewhere.

use nivaas_audit::AuditTrail;
use nivaas_billing::{BillingConfig, PaymentLedger};
use nivaas_db::repository::{
    SurrealAuditLogRepository, SurrealPaymentRepository, SurrealSubscriptionRepository,
    SurrealTenantRepository,
};
use nivaas_db::{DbConfig, DbManager};
use nivaas_flags::{FeatureGate, JsonFileSource};
use nivaas_workflow::ExitWorkflow;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("nivaas=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Nivaas server...");

    let db_config = DbConfig::from_env();
    let manager = match DbManager::connect(&db_config).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = nivaas_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "migrations failed");
        std::process::exit(1);
    }

    let flags_path =
        std::env::var("NIVAAS_FLAGS_PATH").unwrap_or_else(|_| "config/flags.json".into());
    let _flags = match FeatureGate::load(JsonFileSource::new(&flags_path)) {
        Ok(gate) => gate,
        Err(e) => {
            tracing::error!(error = %e, path = %flags_path, "failed to load feature flags");
            std::process::exit(1);
        }
    };

    let db = manager.client().clone();
    let audit = AuditTrail::new(SurrealAuditLogRepository::new(db.clone()));

    let billing_config = BillingConfig {
        gateway_key_id: std::env::var("NIVAAS_GATEWAY_KEY_ID").unwrap_or_default(),
        gateway_key_secret: std::env::var("NIVAAS_GATEWAY_KEY_SECRET").unwrap_or_default(),
        ..BillingConfig::default()
    };

    let _ledger = PaymentLedger::new(
        SurrealPaymentRepository::new(db.clone()),
        SurrealSubscriptionRepository::new(db.clone()),
        SurrealTenantRepository::new(db.clone()),
        audit.clone(),
        billing_config,
    );

    let _workflow = ExitWorkflow::new(SurrealTenantRepository::new(db.clone()), audit);

    tracing::info!("Nivaas core components ready");

    // Transport layers attach here; keep the core alive until shutdown.
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }

    tracing::info!("Nivaas server stopped.");
}
