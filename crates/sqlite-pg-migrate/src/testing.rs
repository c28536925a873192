//! In-memory source and target used by orchestrator tests.
//!
//! The target keeps one row per conflict key, like
//! `INSERT .. ON CONFLICT DO NOTHING` against a unique constraint.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::schema::{ShardKey, TableSpec};
use crate::core::traits::{Extracted, ShardQuery, SourceReader, TargetWriter};
use crate::core::value::{Batch, Record, SqlValue};
use crate::error::{MigrateError, Result};

fn key_text(value: &SqlValue) -> String {
    value
        .as_key_text()
        .unwrap_or_else(|| format!("{:?}", value))
}

fn id_of(spec: &TableSpec, record: &Record) -> String {
    spec.id_position()
        .and_then(|idx| record.get(idx))
        .map(key_text)
        .unwrap_or_default()
}

fn conflict_key_of(spec: &TableSpec, record: &Record) -> Vec<String> {
    spec.conflict_key
        .iter()
        .map(|column| {
            spec.position(column)
                .and_then(|idx| record.get(idx))
                .map(key_text)
                .unwrap_or_default()
        })
        .collect()
}

/// Source holding rows per table.
#[derive(Default)]
pub(crate) struct MemorySource {
    tables: HashMap<&'static str, Vec<Record>>,
    failing: HashSet<&'static str>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, spec: &'static TableSpec, rows: Vec<Record>) -> Self {
        self.tables.entry(spec.name).or_default().extend(rows);
        self
    }

    /// Every query on `table` fails.
    pub fn failing(mut self, table: &'static str) -> Self {
        self.failing.insert(table);
        self
    }

    fn check(&self, spec: &TableSpec) -> Result<()> {
        if self.failing.contains(spec.name) {
            Err(MigrateError::extraction(spec.name, "no such table"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn count_rows(&self, spec: &TableSpec) -> Result<i64> {
        self.check(spec)?;
        Ok(self.tables.get(spec.name).map_or(0, |rows| rows.len() as i64))
    }

    async fn extract_data(
        &self,
        spec: &'static TableSpec,
        query: ShardQuery,
    ) -> Result<Extracted> {
        self.check(spec)?;
        let mut rows: Vec<&Record> = self
            .tables
            .get(spec.name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| ShardKey::of(&id_of(spec, r)) == Some(query.shard))
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|r| id_of(spec, r));

        let records: Vec<Record> = rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(Extracted {
            rows_read: records.len(),
            records,
            skipped: 0,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

/// Target deduplicating on each table's conflict key.
#[derive(Default)]
pub(crate) struct MemoryTarget {
    rows: Mutex<HashMap<&'static str, Vec<Record>>>,
    saves: Mutex<Vec<(&'static str, usize)>>,
    failing_saves: Mutex<HashMap<&'static str, HashSet<usize>>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rows without recording a save.
    pub fn preload(&self, spec: &'static TableSpec, rows: Vec<Record>) {
        self.rows
            .lock()
            .unwrap()
            .entry(spec.name)
            .or_default()
            .extend(rows);
    }

    /// Reject the `nth` save (0-based) on `table`.
    pub fn fail_save(&self, table: &'static str, nth: usize) {
        self.failing_saves
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .insert(nth);
    }

    /// Stored rows of a table.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Sizes of every attempted save on a table, in call order.
    pub fn save_sizes(&self, table: &str) -> Vec<usize> {
        self.saves
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, len)| *len)
            .collect()
    }
}

#[async_trait]
impl TargetWriter for MemoryTarget {
    async fn count_rows(&self, spec: &TableSpec) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(spec.name)
            .map_or(0, |rows| rows.len() as i64))
    }

    async fn save(&self, spec: &TableSpec, batch: Batch<'_>) -> Result<u64> {
        let nth = {
            let mut saves = self.saves.lock().unwrap();
            let nth = saves.iter().filter(|(t, _)| *t == spec.name).count();
            saves.push((spec.name, batch.len()));
            nth
        };
        let fails = self
            .failing_saves
            .lock()
            .unwrap()
            .get(spec.name)
            .is_some_and(|set| set.contains(&nth));
        if fails {
            return Err(MigrateError::load(spec.name, "injected batch failure"));
        }

        let mut tables = self.rows.lock().unwrap();
        let stored = tables.entry(spec.name).or_default();
        let mut keys: HashSet<Vec<String>> =
            stored.iter().map(|r| conflict_key_of(spec, r)).collect();

        let mut inserted = 0;
        for record in batch.records() {
            if keys.insert(conflict_key_of(spec, record)) {
                stored.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}
