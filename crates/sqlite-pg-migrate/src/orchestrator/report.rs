//! Per-table and per-run migration reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, EXIT_PARTIAL_FAILURE};

/// Lifecycle of one table within a run.
///
/// `Pending`, `CountingSource`, `ShardLoop` and `Reconciling` are transient;
/// a finished report always holds one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Pending,
    CountingSource,
    ShardLoop,
    Reconciling,
    /// Count delta matched the source count and every batch landed.
    Done,
    /// Count delta mismatch or at least one failed batch.
    Degraded,
    /// Counting or extraction failed; the table was abandoned.
    Failed,
    /// The run was cancelled before or while this table was processed.
    Cancelled,
    /// Dry run: counted, nothing written.
    Planned,
}

impl TableStatus {
    /// Whether the table finished processing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TableStatus::Done
                | TableStatus::Degraded
                | TableStatus::Failed
                | TableStatus::Cancelled
                | TableStatus::Planned
        )
    }

    /// Whether the table needs no attention.
    pub fn is_success(self) -> bool {
        matches!(self, TableStatus::Done | TableStatus::Planned)
    }
}

/// Outcome of migrating one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    /// Table name.
    pub table: String,

    /// Final status.
    pub status: TableStatus,

    /// Source row count.
    pub count_source: Option<i64>,

    /// Target row count before loading.
    pub count_before: Option<i64>,

    /// Target row count after loading.
    pub count_after: Option<i64>,

    /// Records extracted from all shards.
    pub rows_extracted: u64,

    /// Rows the target actually inserted.
    pub rows_inserted: u64,

    /// Source rows skipped for shape mismatches.
    pub rows_skipped: u64,

    /// Batches sent to the target.
    pub batches: u64,

    /// Batches the target rejected.
    pub batches_failed: u64,

    /// Error that failed the table, if any.
    pub error: Option<String>,

    /// Time spent on this table in seconds.
    pub duration_seconds: f64,
}

impl TableReport {
    /// Empty report for a table that has not started.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            status: TableStatus::Pending,
            count_source: None,
            count_before: None,
            count_after: None,
            rows_extracted: 0,
            rows_inserted: 0,
            rows_skipped: 0,
            batches: 0,
            batches_failed: 0,
            error: None,
            duration_seconds: 0.0,
        }
    }

    /// Target growth over the run, once both counts are known.
    pub fn count_delta(&self) -> Option<i64> {
        Some(self.count_after? - self.count_before?)
    }
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every table is `Done` (or `Planned` on a dry run).
    Completed,
    /// At least one table is `Degraded` or `Failed`.
    Partial,
    /// The run was cancelled.
    Cancelled,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub tables_total: usize,
    pub tables_done: usize,
    pub tables_degraded: usize,
    pub tables_failed: usize,
    pub tables_cancelled: usize,

    /// Rows inserted across all tables.
    pub rows_inserted: u64,

    /// Rows skipped across all tables.
    pub rows_skipped: u64,

    /// Per-table reports in registry order.
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    /// Aggregate table reports into a run report.
    pub fn from_tables(
        run_id: String,
        dry_run: bool,
        started_at: DateTime<Utc>,
        tables: Vec<TableReport>,
    ) -> Self {
        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let count = |status: TableStatus| tables.iter().filter(|t| t.status == status).count();

        let tables_cancelled = count(TableStatus::Cancelled);
        let tables_degraded = count(TableStatus::Degraded);
        let tables_failed = count(TableStatus::Failed);

        let status = if tables_cancelled > 0 {
            RunStatus::Cancelled
        } else if tables_degraded + tables_failed > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };

        Self {
            run_id,
            status,
            dry_run,
            started_at,
            completed_at,
            duration_seconds,
            tables_total: tables.len(),
            tables_done: count(TableStatus::Done),
            tables_degraded,
            tables_failed,
            tables_cancelled,
            rows_inserted: tables.iter().map(|t| t.rows_inserted).sum(),
            rows_skipped: tables.iter().map(|t| t.rows_skipped).sum(),
            tables,
        }
    }

    /// Report for one table by name.
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Whether every table succeeded.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Process exit code: 0 on success, partial failure otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            EXIT_PARTIAL_FAILURE
        }
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Source and target row counts for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCounts {
    pub table: String,
    pub source: i64,
    pub target: i64,
    pub matches: bool,
}

/// Result of a `validate` pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub tables: Vec<TableCounts>,
}

impl ValidationReport {
    /// Whether every table has matching counts.
    pub fn all_match(&self) -> bool {
        self.tables.iter().all(|t| t.matches)
    }

    /// Process exit code: 0 when all counts match, partial failure otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.all_match() {
            0
        } else {
            EXIT_PARTIAL_FAILURE
        }
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
