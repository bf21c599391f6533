//! Database-specific error types and conversions.

use nivaas_core::error::NivaasError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Row decode failed: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Unique-index violation. The payment repository consumes this to
    /// resolve concurrent duplicate verifications.
    #[error("Unique constraint violated: {0}")]
    Duplicate(String),

    /// The storage backend cannot run multi-statement transactions.
    /// Internal signal only — the transaction coordinator catches it and
    /// degrades; it is never surfaced to callers.
    #[error("storage backend does not support transactions")]
    TxnUnsupported,
}

impl DbError {
    /// Classify a backend error into the internal signals the coordinator
    /// and repositories act on.
    pub(crate) fn classify(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("transaction") && lower.contains("not supported") {
            return DbError::TxnUnsupported;
        }
        if msg.contains("already contains") {
            return DbError::Duplicate(msg);
        }
        DbError::Surreal(err)
    }
}

impl From<DbError> for NivaasError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => NivaasError::NotFound { entity, id },
            DbError::Duplicate(_) => NivaasError::Conflict {
                reason: "record already exists".into(),
            },
            other => NivaasError::Database(other.to_string()),
        }
    }
}
