//! Workflow error types.

use nivaas_core::error::NivaasError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("tenant is not active")]
    TenantNotActive,

    #[error("an exit request is already pending")]
    ExitAlreadyPending,

    #[error("no pending exit request to resolve")]
    NoPendingRequest,

    #[error("tenant is not on notice")]
    NotOnNotice,

    #[error("exit date has not been reached")]
    ExitDateNotReached,

    #[error("an exit date is required")]
    ExitDateRequired,

    #[error("actor is not authorized for this operation")]
    Unauthorized,
}

impl From<WorkflowError> for NivaasError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Unauthorized => NivaasError::AuthorizationDenied {
                reason: err.to_string(),
            },
            WorkflowError::ExitDateRequired => NivaasError::Validation {
                message: err.to_string(),
            },
            other => NivaasError::Conflict {
                reason: other.to_string(),
            },
        }
    }
}
