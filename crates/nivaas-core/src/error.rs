//! Error types for the Nivaas system.
//!
//! Business-rule failures (state conflicts, authorization, bad input) are
//! ordinary typed results. Only genuinely exceptional infrastructure
//! conditions surface as `Database`/`Internal`, and those stay opaque to
//! callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NivaasError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The target is not in the state the operation requires (e.g. resolving
    /// an exit request that is not pending, or a lost concurrent update).
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    /// Gateway signature did not verify. Deliberately carries no detail —
    /// neither the expected signature nor the shared secret is ever exposed.
    #[error("Payment verification failed")]
    SignatureMismatch,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NivaasResult<T> = Result<T, NivaasError>;
