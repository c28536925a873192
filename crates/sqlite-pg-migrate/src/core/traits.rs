//! Core traits for the extract and load sides of a migration.
//!
//! - [`SourceReader`]: counts and reads shard-filtered rows from the source
//! - [`TargetWriter`]: counts rows in and writes batches to the target
//!
//! The orchestrator only sees these traits, so tests drive it with
//! in-memory implementations.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{ShardKey, TableSpec};
use super::value::{Batch, Record};

/// Options for reading one page of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardQuery {
    /// Shard to read.
    pub shard: ShardKey,
    /// Maximum rows to return. `None` returns the whole shard.
    pub limit: Option<usize>,
    /// Rows of the shard to skip (stable order by identifier).
    pub offset: usize,
}

impl ShardQuery {
    /// Read an entire shard in one call.
    pub fn whole(shard: ShardKey) -> Self {
        Self {
            shard,
            limit: None,
            offset: 0,
        }
    }

    /// Read one page of a shard.
    pub fn page(shard: ShardKey, limit: usize, offset: usize) -> Self {
        Self {
            shard,
            limit: Some(limit),
            offset,
        }
    }
}

/// Rows returned by [`SourceReader::extract_data`].
#[derive(Debug, Default)]
pub struct Extracted {
    /// Rows that matched the table spec.
    pub records: Vec<Record>,
    /// Raw rows produced by the query, including skipped ones.
    pub rows_read: usize,
    /// Rows dropped because their shape did not match the table definition.
    pub skipped: usize,
}

impl Extracted {
    /// Whether the page was cut by the query limit, so a next page may exist.
    pub fn is_full(&self, limit: Option<usize>) -> bool {
        matches!(limit, Some(limit) if self.rows_read >= limit)
    }
}

/// Read data from the source database.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Get the row count for a table.
    async fn count_rows(&self, spec: &TableSpec) -> Result<i64>;

    /// Read the rows of one shard, mapped into records of `spec`.
    ///
    /// Rows whose shape does not match the table definition are skipped and logged.
    /// A failure to run the query is an `Extraction` error.
    async fn extract_data(&self, spec: &'static TableSpec, query: ShardQuery)
        -> Result<Extracted>;

    /// Test the connection.
    async fn health_check(&self) -> Result<()>;

    /// Get the database type identifier (e.g., "sqlite").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// Write data to the target database.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Get the row count for a table.
    async fn count_rows(&self, spec: &TableSpec) -> Result<i64>;

    /// Insert a batch, skipping rows whose conflict key already exists.
    ///
    /// The batch lands as a whole or not at all. Returns the number of rows
    /// actually inserted.
    async fn save(&self, spec: &TableSpec, batch: Batch<'_>) -> Result<u64>;

    /// Test the connection.
    async fn health_check(&self) -> Result<()>;

    /// Get the database type identifier (e.g., "postgres").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}
