//! Transaction coordinator.
//!
//! A [`UnitOfWork`] is an ordered list of SurrealQL statements plus named
//! bindings, executed in a single round trip. [`TxnCoordinator`] wraps the
//! unit in `BEGIN TRANSACTION ... COMMIT TRANSACTION` so every write commits
//! together or not at all. When the storage backend reports that it cannot
//! run multi-statement transactions (non-replicated or transaction-less
//! deployments), the coordinator logs a warning and re-runs the unit once
//! without the wrapper.
//!
//! Degraded-mode caveat: without the wrapper, statements execute
//! sequentially and a mid-unit failure leaves earlier writes in place.
//! Callers performing multi-entity writes get cross-write atomicity only
//! when the backend supports it.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, IndexedResults as Response, Surreal};
use tracing::warn;

use crate::error::DbError;

/// A value bound into a unit-of-work script.
#[derive(Debug, Clone)]
pub enum BindValue {
    Str(String),
    OptStr(Option<String>),
    Int(i64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

/// An ordered list of statements executed as one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    statements: Vec<String>,
    binds: Vec<(String, BindValue)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement to the unit.
    pub fn statement(mut self, stmt: impl Into<String>) -> Self {
        self.statements.push(stmt.into());
        self
    }

    /// Bind a named parameter available to every statement in the unit.
    pub fn bind(mut self, name: impl Into<String>, value: BindValue) -> Self {
        self.binds.push((name.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render the unit as a script. `BEGIN`/`COMMIT` produce no result rows,
    /// so statement indices in the response are identical in both modes.
    fn script(&self, atomic: bool) -> String {
        let body = self.statements.join(";\n");
        if atomic {
            format!("BEGIN TRANSACTION;\n{body};\nCOMMIT TRANSACTION;")
        } else {
            format!("{body};")
        }
    }

    fn binds(&self) -> Vec<(String, BindValue)> {
        self.binds.clone()
    }
}

/// Minimal seam over the database handle.
///
/// Production uses [`SurrealRunner`]; tests substitute a runner that
/// injects backend faults (e.g. the transactions-unsupported signal).
pub trait ScriptRunner: Send + Sync {
    /// Run a script in one round trip, surfacing per-statement errors
    /// classified into [`DbError`] signals.
    fn run(
        &self,
        script: String,
        binds: Vec<(String, BindValue)>,
    ) -> impl Future<Output = Result<Response, DbError>> + Send;
}

/// [`ScriptRunner`] backed by a SurrealDB handle.
#[derive(Clone)]
pub struct SurrealRunner<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRunner<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ScriptRunner for SurrealRunner<C> {
    async fn run(
        &self,
        script: String,
        binds: Vec<(String, BindValue)>,
    ) -> Result<Response, DbError> {
        let mut query = self.db.query(script);
        for (name, value) in binds {
            query = match value {
                BindValue::Str(v) => query.bind((name, v)),
                BindValue::OptStr(v) => query.bind((name, v)),
                BindValue::Int(v) => query.bind((name, v)),
                BindValue::Bool(v) => query.bind((name, v)),
                BindValue::DateTime(v) => query.bind((name, v)),
                BindValue::Json(v) => query.bind((name, v)),
            };
        }

        let response = query.await.map_err(DbError::classify)?;
        response.check().map_err(DbError::classify)
    }
}

/// Executes units of work atomically when the backend supports it,
/// degrading to best-effort sequential execution when it does not.
#[derive(Clone)]
pub struct TxnCoordinator<R: ScriptRunner> {
    runner: R,
}

impl<R: ScriptRunner> TxnCoordinator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run `unit` inside an atomic multi-write context.
    ///
    /// If the backend signals that transactions are unsupported, retries the
    /// unit exactly once without the atomic wrapper, after logging a warning.
    /// Any other error has already aborted the atomic context backend-side
    /// and propagates unchanged.
    pub async fn execute_atomic(&self, unit: &UnitOfWork) -> Result<Response, DbError> {
        match self.runner.run(unit.script(true), unit.binds()).await {
            Err(DbError::TxnUnsupported) => {
                warn!(
                    statements = unit.statements.len(),
                    "storage backend does not support multi-statement transactions; \
                     executing unit of work without atomicity guarantees"
                );
                self.runner.run(unit.script(false), unit.binds()).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_script_is_wrapped() {
        let unit = UnitOfWork::new()
            .statement("CREATE thing SET a = 1")
            .statement("CREATE thing SET a = 2");

        let script = unit.script(true);
        assert!(script.starts_with("BEGIN TRANSACTION;"));
        assert!(script.ends_with("COMMIT TRANSACTION;"));
        assert!(script.contains("a = 1;\nCREATE thing SET a = 2"));
    }

    #[test]
    fn degraded_script_has_no_wrapper() {
        let unit = UnitOfWork::new().statement("CREATE thing SET a = 1");

        let script = unit.script(false);
        assert!(!script.contains("BEGIN TRANSACTION"));
        assert!(!script.contains("COMMIT TRANSACTION"));
        assert_eq!(script, "CREATE thing SET a = 1;");
    }

    #[test]
    fn empty_unit_is_empty() {
        assert!(UnitOfWork::new().is_empty());
    }
}
