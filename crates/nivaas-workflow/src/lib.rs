//! Nivaas Workflow — the tenant-exit lifecycle state machine.
//!
//! The resting states are `Active`, `ExitPending` (an active tenant with a
//! pending request), `OnNotice`, and `Exited`. Rejection is not a resting
//! state: it clears the request and returns the tenant to `Active`. The
//! service methods here are the sole mutators of the exit sub-state; each
//! does a read for precise error reporting and then a conditional write, so
//! concurrent losers receive a conflict instead of silently overwriting the
//! winner.

pub mod error;
pub mod service;

pub use error::WorkflowError;
pub use service::{ExitDecision, ExitWorkflow, RequestExitInput, ResolveExitInput};
