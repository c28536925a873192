//! Migration orchestrator - main workflow coordinator.
//!
//! For each selected table the orchestrator counts source and target rows,
//! walks the 36 shards in fixed order, saves every shard in batches and
//! reconciles the target's growth against the source count. Tables are
//! isolated: a failure in one is reported and the run moves on.

mod connections;
mod report;

pub use connections::Connections;
pub use report::{
    MigrationReport, RunStatus, TableCounts, TableReport, TableStatus, ValidationReport,
};

use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::registry;
use crate::core::schema::{ShardKey, TableSpec};
use crate::core::traits::ShardQuery;
use crate::core::value::Batch;
use crate::error::{MigrateError, Result};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    tables: Vec<&'static TableSpec>,
    connections: Connections,
}

impl Orchestrator {
    /// Resolve the selected tables, then open both connections.
    pub async fn new(config: Config) -> Result<Self> {
        let tables = registry::resolve(&config.migration.tables)?;
        let connections = Connections::open(&config).await?;
        Ok(Self {
            config,
            tables,
            connections,
        })
    }

    /// Build an orchestrator over already open connections.
    pub fn with_connections(config: Config, connections: Connections) -> Result<Self> {
        let tables = registry::resolve(&config.migration.tables)?;
        Ok(Self {
            config,
            tables,
            connections,
        })
    }

    /// Tables this orchestrator migrates, in registry order.
    pub fn tables(&self) -> &[&'static TableSpec] {
        &self.tables
    }

    /// Run the migration.
    ///
    /// Per-table failures are recorded in the report; only setup problems
    /// surface as `Err`.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let workers = self.config.migration.workers.max(1);

        info!(
            "Starting migration run {} (config {}): {} tables, batch size {}, {} workers",
            run_id,
            self.config.hash(),
            self.tables.len(),
            self.config.migration.batch_size,
            workers
        );

        let reports: Vec<TableReport> = futures::stream::iter(self.tables.iter().copied())
            .map(|spec| self.migrate_table(spec, &cancel))
            .buffered(workers)
            .collect()
            .await;

        let report = MigrationReport::from_tables(run_id, false, started_at, reports);

        info!(
            "Migration {:?}: {} done, {} degraded, {} failed, {} cancelled; {} rows inserted in {:.1}s",
            report.status,
            report.tables_done,
            report.tables_degraded,
            report.tables_failed,
            report.tables_cancelled,
            report.rows_inserted,
            report.duration_seconds
        );

        Ok(report)
    }

    /// Count every selected table without writing anything.
    pub async fn dry_run(&self) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let batch_size = self.config.migration.batch_size.max(1) as i64;

        let mut reports = Vec::with_capacity(self.tables.len());
        for &spec in &self.tables {
            let started = Instant::now();
            let mut report = TableReport::new(spec.name);
            match self.count_table(spec, &mut report).await {
                Ok(()) => {
                    report.status = TableStatus::Planned;
                    let source = report.count_source.unwrap_or(0);
                    info!(
                        "{}: {} source rows, {} target rows, ~{} batches (dry run)",
                        spec.name,
                        source,
                        report.count_before.unwrap_or(0),
                        (source + batch_size - 1) / batch_size
                    );
                }
                Err(e) => {
                    error!("{}: {}", spec.name, e);
                    report.status = TableStatus::Failed;
                    report.error = Some(e.to_string());
                }
            }
            report.duration_seconds = started.elapsed().as_secs_f64();
            reports.push(report);
        }

        Ok(MigrationReport::from_tables(run_id, true, started_at, reports))
    }

    /// Compare source and target row counts per table.
    pub async fn validate(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        for &spec in &self.tables {
            let source = self.connections.source.count_rows(spec).await?;
            let target = self.connections.target.count_rows(spec).await?;
            let matches = source == target;

            if matches {
                info!("{}: {} rows (match)", spec.name, source);
            } else {
                warn!(
                    "{}: source={} target={} (MISMATCH)",
                    spec.name, source, target
                );
            }

            report.tables.push(TableCounts {
                table: spec.name.to_string(),
                source,
                target,
                matches,
            });
        }

        Ok(report)
    }

    /// Test both connections.
    pub async fn health_check(&self) -> Result<()> {
        self.connections.health_check().await
    }

    /// Close both connections.
    pub async fn close(&self) {
        self.connections.close().await;
    }

    /// Migrate one table, turning any error into the table's report.
    async fn migrate_table(
        &self,
        spec: &'static TableSpec,
        cancel: &CancellationToken,
    ) -> TableReport {
        let started = Instant::now();
        let mut report = TableReport::new(spec.name);

        if cancel.is_cancelled() {
            report.status = TableStatus::Cancelled;
            return report;
        }

        match self.transfer_table(spec, cancel, &mut report).await {
            Ok(status) => report.status = status,
            Err(MigrateError::Cancelled) => {
                info!("{}: cancelled after {} rows", spec.name, report.rows_inserted);
                report.status = TableStatus::Cancelled;
            }
            Err(e) => {
                error!("{}: migration failed: {}", spec.name, e);
                report.status = TableStatus::Failed;
                report.error = Some(e.to_string());
            }
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        report
    }

    async fn count_table(&self, spec: &TableSpec, report: &mut TableReport) -> Result<()> {
        report.count_before = Some(self.connections.target.count_rows(spec).await?);
        report.count_source = Some(self.connections.source.count_rows(spec).await?);
        Ok(())
    }

    async fn transfer_table(
        &self,
        spec: &'static TableSpec,
        cancel: &CancellationToken,
        report: &mut TableReport,
    ) -> Result<TableStatus> {
        enter(report, TableStatus::CountingSource);
        self.count_table(spec, report).await?;
        let count_source = report.count_source.unwrap_or(0);

        enter(report, TableStatus::ShardLoop);
        for shard in ShardKey::all() {
            self.transfer_shard(spec, shard, cancel, report).await?;
        }

        enter(report, TableStatus::Reconciling);
        report.count_after = Some(self.connections.target.count_rows(spec).await?);

        if (report.rows_extracted as i64) < count_source {
            warn!(
                "{}: extracted {} of {} source rows ({} skipped)",
                spec.name, report.rows_extracted, count_source, report.rows_skipped
            );
        }

        let delta = report.count_delta().unwrap_or(0);
        if delta != count_source || report.batches_failed > 0 {
            warn!(
                "{}: Degraded: target grew by {} rows for {} source rows ({} of {} batches failed)",
                spec.name, delta, count_source, report.batches_failed, report.batches
            );
            Ok(TableStatus::Degraded)
        } else {
            info!(
                "{}: Done: {} rows inserted in {} batches",
                spec.name, report.rows_inserted, report.batches
            );
            Ok(TableStatus::Done)
        }
    }

    /// Page through one shard and save it batch by batch. Each page is dropped
    /// before the next is read.
    async fn transfer_shard(
        &self,
        spec: &'static TableSpec,
        shard: ShardKey,
        cancel: &CancellationToken,
        report: &mut TableReport,
    ) -> Result<()> {
        let batch_size = self.config.migration.batch_size;
        let read_limit = self.config.migration.read_limit;
        let mut offset = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }

            let query = match read_limit {
                Some(limit) => ShardQuery::page(shard, limit, offset),
                None => ShardQuery::whole(shard),
            };
            let page = self
                .connections
                .source
                .extract_data(spec, query)
                .await?;

            report.rows_extracted += page.records.len() as u64;
            report.rows_skipped += page.skipped as u64;

            for batch in Batch::split(&page.records, batch_size) {
                if cancel.is_cancelled() {
                    return Err(MigrateError::Cancelled);
                }
                report.batches += 1;
                match self.connections.target.save(spec, batch).await {
                    Ok(inserted) => report.rows_inserted += inserted,
                    Err(e) => {
                        report.batches_failed += 1;
                        error!(
                            "{}: batch of {} rows in shard '{}' failed: {}",
                            spec.name,
                            batch.len(),
                            shard,
                            e
                        );
                    }
                }
            }

            if !page.is_full(query.limit) {
                return Ok(());
            }
            offset += page.rows_read;
        }
    }
}

fn enter(report: &mut TableReport, status: TableStatus) {
    debug!("{}: {:?} -> {:?}", report.table, report.status, status);
    report.status = status;
}
