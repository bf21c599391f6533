//! Billing error types.

use nivaas_core::error::NivaasError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("actor is not authorized for this operation")]
    Unauthorized,

    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    #[error("a plan code is required for subscription orders")]
    PlanRequired,

    #[error("a tenant id is required for rent orders")]
    TenantRequired,

    #[error("no rent is currently due")]
    NoRentDue,

    #[error("order is already verified")]
    OrderAlreadyVerified,

    /// Generic by design: the expected signature and the shared secret are
    /// never part of any error.
    #[error("payment verification failed")]
    SignatureMismatch,
}

impl From<BillingError> for NivaasError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Unauthorized => NivaasError::AuthorizationDenied {
                reason: err.to_string(),
            },
            BillingError::UnknownPlan(_)
            | BillingError::PlanRequired
            | BillingError::TenantRequired => NivaasError::Validation {
                message: err.to_string(),
            },
            BillingError::NoRentDue | BillingError::OrderAlreadyVerified => {
                NivaasError::Conflict {
                    reason: err.to_string(),
                }
            }
            BillingError::SignatureMismatch => NivaasError::SignatureMismatch,
        }
    }
}
