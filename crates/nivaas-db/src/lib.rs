//! Nivaas Database — SurrealDB connection management, schema migrations,
//! the transaction coordinator, and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The transaction coordinator ([`TxnCoordinator`], [`UnitOfWork`])
//! - Error types ([`DbError`])
//! - Implementations of the `nivaas-core` repository traits

mod connection;
mod error;
mod schema;
mod txn;

pub mod repository;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::run_migrations;
pub use txn::{BindValue, ScriptRunner, SurrealRunner, TxnCoordinator, UnitOfWork};
