//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs and calendar dates are stored as strings (ISO-8601 dates compare
//! correctly as strings). Enums are stored as strings with ASSERT
//! constraints for validation. The UNIQUE index on
//! `payment.gateway_payment_id` is the idempotency guarantee for payment
//! verification.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (global scope)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Rooms (organization scope)
-- =======================================================================
DEFINE TABLE room SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE room TYPE string;
DEFINE FIELD number ON TABLE room TYPE string;
DEFINE FIELD capacity ON TABLE room TYPE int ASSERT $value >= 0;
DEFINE FIELD occupied_beds ON TABLE room TYPE int ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE room TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_room_org_number ON TABLE room \
    COLUMNS organization_id, number UNIQUE;

-- =======================================================================
-- Tenants (organization scope) with embedded exit-request sub-state
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE tenant TYPE string;
DEFINE FIELD user_id ON TABLE tenant TYPE string;
DEFINE FIELD room_id ON TABLE tenant TYPE option<string>;
DEFINE FIELD rent_amount ON TABLE tenant TYPE int ASSERT $value >= 0;
DEFINE FIELD rent_due ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['Active', 'OnNotice', 'Exited'];
DEFINE FIELD exit_request ON TABLE tenant TYPE object DEFAULT {};
DEFINE FIELD exit_request.status ON TABLE tenant TYPE string \
    DEFAULT 'None' \
    ASSERT $value IN ['None', 'Pending', 'Approved', 'Rejected'];
DEFINE FIELD exit_request.reason ON TABLE tenant TYPE option<string>;
DEFINE FIELD exit_request.requested_date ON TABLE tenant \
    TYPE option<string>;
DEFINE FIELD exit_request.admin_comment ON TABLE tenant \
    TYPE option<string>;
DEFINE FIELD exit_date ON TABLE tenant TYPE option<string>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_org ON TABLE tenant COLUMNS organization_id;

-- =======================================================================
-- Payment intents (keyed by server-generated order id)
-- =======================================================================
DEFINE TABLE payment_intent SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE payment_intent TYPE string;
DEFINE FIELD tenant_id ON TABLE payment_intent TYPE option<string>;
DEFINE FIELD purpose ON TABLE payment_intent TYPE string \
    ASSERT $value IN ['Subscription', 'Rent'];
DEFINE FIELD plan ON TABLE payment_intent TYPE option<string>;
DEFINE FIELD amount ON TABLE payment_intent TYPE int ASSERT $value > 0;
DEFINE FIELD currency ON TABLE payment_intent TYPE string;
DEFINE FIELD status ON TABLE payment_intent TYPE string \
    ASSERT $value IN ['Created', 'Verified', 'Failed'];
DEFINE FIELD created_at ON TABLE payment_intent TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Payments (verified; unique per gateway payment id)
-- =======================================================================
DEFINE TABLE payment SCHEMAFULL;
DEFINE FIELD gateway_payment_id ON TABLE payment TYPE string;
DEFINE FIELD order_id ON TABLE payment TYPE string;
DEFINE FIELD organization_id ON TABLE payment TYPE string;
DEFINE FIELD tenant_id ON TABLE payment TYPE option<string>;
DEFINE FIELD purpose ON TABLE payment TYPE string \
    ASSERT $value IN ['Subscription', 'Rent'];
DEFINE FIELD amount ON TABLE payment TYPE int ASSERT $value > 0;
DEFINE FIELD method ON TABLE payment TYPE option<string>;
DEFINE FIELD status ON TABLE payment TYPE string \
    ASSERT $value IN ['Success', 'Failed', 'Pending'];
DEFINE FIELD transaction_date ON TABLE payment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_payment_gateway_id ON TABLE payment \
    COLUMNS gateway_payment_id UNIQUE;

-- =======================================================================
-- Subscriptions (one per organization; record id = organization id)
-- =======================================================================
DEFINE TABLE subscription SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE subscription TYPE string;
DEFINE FIELD plan ON TABLE subscription TYPE string;
DEFINE FIELD status ON TABLE subscription TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD renews_at ON TABLE subscription TYPE datetime;
DEFINE FIELD updated_at ON TABLE subscription TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Audit log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE audit_log TYPE string;
DEFINE FIELD actor_id ON TABLE audit_log TYPE string;
DEFINE FIELD actor_role ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Owner', 'Admin', 'Resident', 'System'];
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD resource_type ON TABLE audit_log TYPE string;
DEFINE FIELD resource_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD details ON TABLE audit_log TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_org_time ON TABLE audit_log \
    COLUMNS organization_id, timestamp;
";

// -----------------------------------------------------------------------
// Runner
// -----------------------------------------------------------------------

/// Apply all pending migrations.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version, name FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let applied: Vec<MigrationRecord> = result.take(0)?;
    let current = applied.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        db.query(migration.sql)
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("migration {} failed: {e}", migration.version))
            })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
    }

    Ok(())
}
