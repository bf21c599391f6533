//! Nivaas Billing — the payment ledger.
//!
//! Creates gateway-facing payment order intents with server-authoritative
//! amounts, verifies gateway callback signatures, and records verified
//! payments exactly once per external payment id.

pub mod config;
pub mod error;
pub mod service;
pub mod signature;

pub use config::{BillingConfig, PlanSpec};
pub use error::BillingError;
pub use service::{CheckoutOrder, CreateOrderInput, PaymentLedger, VerifyPaymentInput};
