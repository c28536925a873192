//! # sqlite-pg-migrate
//!
//! Batched, idempotent SQLite to PostgreSQL migration library.
//!
//! This library moves the rows of a fixed set of tables from a SQLite file
//! into a PostgreSQL schema with:
//!
//! - **Shard partitioning** by the last character of each row identifier
//! - **Batched multi-row inserts** with `ON CONFLICT DO NOTHING`
//! - **Safe re-runs**: rows already in the target are skipped
//! - **Reconciliation** of target growth against source counts per table
//! - **Per-table isolation** with an aggregate, JSON-serializable report
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlite_pg_migrate::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let report = orchestrator.run(CancellationToken::new()).await?;
//!     println!("Inserted {} rows", report.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use crate::core::registry::{all_tables, spec_for};
pub use crate::core::schema::{FieldType, ShardKey, TableSpec};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    Connections, MigrationReport, Orchestrator, RunStatus, TableReport, TableStatus,
    ValidationReport,
};
