//! SQLite source reader implementation.
//!
//! Implements the `SourceReader` trait for reading shard-filtered rows from a
//! SQLite database file. Uses SQLx for connection pooling and async queries.
//! The source is always opened read-only.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tracing::{debug, error, info};

use super::dialect::SqliteDialect;
use crate::config::SourceConfig;
use crate::core::schema::{Field, FieldType, TableSpec};
use crate::core::traits::{Extracted, ShardQuery, SourceReader};
use crate::core::value::{Record, ShapeError, SqlValue};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// A cell as stored by SQLite, before it is matched to a field type.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    fn storage_class(&self) -> &'static str {
        match self {
            Cell::Null => "NULL",
            Cell::Integer(_) => "INTEGER",
            Cell::Real(_) => "REAL",
            Cell::Text(_) => "TEXT",
            Cell::Blob(_) => "BLOB",
        }
    }
}

/// Pool size for a run: concurrent tables never queue on one connection.
fn pool_size(config: &SourceConfig, workers: usize) -> u32 {
    config
        .max_connections
        .max(u32::try_from(workers).unwrap_or(u32::MAX))
}

/// SQLite source reader implementation.
pub struct SqliteReader {
    pool: SqlitePool,
}

impl SqliteReader {
    /// Open a read-only pool on the configured database file, with at least
    /// one connection per table worker.
    pub async fn new(config: &SourceConfig, workers: usize) -> Result<Self> {
        if !config.path.is_file() {
            return Err(MigrateError::connection(
                format!("{} does not exist or is not a file", config.path.display()),
                "opening SQLite source",
            ));
        }

        let options = SqliteConnectOptions::from_str(&config.connection_string())
            .map_err(|e| MigrateError::connection(e, "parsing SQLite source path"))?
            .filename(&config.path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size(config, workers))
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::connection(e, "creating SQLite source pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::connection(e, "testing SQLite source connection"))?;

        info!("Connected to SQLite source: {}", config.path.display());

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read one cell by its runtime storage class.
    fn read_cell(row: &SqliteRow, idx: usize) -> std::result::Result<Cell, sqlx::Error> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Cell::Null);
        }
        let class = raw.type_info().name().to_ascii_uppercase();

        match class.as_str() {
            "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
                row.try_get_unchecked::<i64, _>(idx).map(Cell::Integer)
            }
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                row.try_get_unchecked::<f64, _>(idx).map(Cell::Real)
            }
            "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(idx).map(Cell::Blob),
            _ => row.try_get_unchecked::<String, _>(idx).map(Cell::Text),
        }
    }

    /// Map a source row onto the table spec.
    fn decode_row(spec: &TableSpec, row: &SqliteRow) -> std::result::Result<Record, ShapeError> {
        if row.len() != spec.arity() {
            return Err(ShapeError::Arity {
                expected: spec.arity(),
                actual: row.len(),
            });
        }

        let mut values = Vec::with_capacity(spec.arity());
        for (idx, field) in spec.fields.iter().enumerate() {
            let cell = Self::read_cell(row, idx).map_err(|e| ShapeError::Undecodable {
                field: field.name,
                message: e.to_string(),
            })?;
            values.push(coerce(field, cell)?);
        }
        Record::new(spec, values)
    }

    /// Identifier of a raw row for log lines, if it can be read as text.
    fn row_id(spec: &TableSpec, row: &SqliteRow) -> String {
        spec.id_position()
            .and_then(|idx| Self::read_cell(row, idx).ok())
            .map(|cell| match cell {
                Cell::Text(s) => s,
                Cell::Integer(i) => i.to_string(),
                other => format!("<{}>", other.storage_class()),
            })
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

/// Match a stored cell to the field's logical type.
///
/// NULLs carry the field type so the loader can bind them; nullability itself
/// is checked by [`Record::new`].
fn coerce(field: &Field, cell: Cell) -> std::result::Result<SqlValue, ShapeError> {
    let wrong_type = || ShapeError::WrongType {
        field: field.name,
        expected: field.field_type,
    };

    match (field.field_type, cell) {
        (field_type, Cell::Null) => Ok(SqlValue::Null(field_type)),
        (FieldType::Uuid | FieldType::Text, Cell::Text(s)) => Ok(SqlValue::Text(s)),
        (FieldType::Float, Cell::Real(f)) => Ok(SqlValue::Float(f)),
        (FieldType::Float, Cell::Integer(i)) => Ok(SqlValue::Float(i as f64)),
        (FieldType::Date, Cell::Text(s)) => {
            parse_date(&s)
                .map(SqlValue::Date)
                .ok_or_else(|| ShapeError::Undecodable {
                    field: field.name,
                    message: format!("'{}' is not a YYYY-MM-DD date", s),
                })
        }
        _ => Err(wrong_type()),
    }
}

/// Parse `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date = s.get(..10).unwrap_or(s);
    let rest = s.get(10..).unwrap_or("");
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('T')) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[async_trait]
impl SourceReader for SqliteReader {
    async fn count_rows(&self, spec: &TableSpec) -> Result<i64> {
        let row = sqlx::query(&SqliteDialect::count_query(spec))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::extraction(spec.name, e))?;
        row.try_get::<i64, _>(0)
            .map_err(|e| MigrateError::extraction(spec.name, e))
    }

    async fn extract_data(
        &self,
        spec: &'static TableSpec,
        query: ShardQuery,
    ) -> Result<Extracted> {
        let sql = SqliteDialect::shard_query(spec);
        let offset = i64::try_from(query.offset)
            .map_err(|e| MigrateError::extraction(spec.name, e))?;

        debug!(
            "Reading {} shard '{}' (limit {:?}, offset {})",
            spec.name, query.shard, query.limit, query.offset
        );

        let mut rows = sqlx::query(&sql)
            .bind(query.shard.to_string())
            .bind(SqliteDialect::limit_param(query.limit))
            .bind(offset)
            .fetch(&self.pool);

        let mut extracted = Extracted::default();
        while let Some(item) = rows.next().await {
            let row = match item {
                Ok(row) => row,
                Err(e) if extracted.rows_read == 0 => {
                    return Err(MigrateError::extraction(spec.name, e));
                }
                Err(e) => {
                    error!(
                        "Read of {} shard '{}' stopped after {} rows: {}",
                        spec.name, query.shard, extracted.rows_read, e
                    );
                    break;
                }
            };
            extracted.rows_read += 1;

            match Self::decode_row(spec, &row) {
                Ok(record) => extracted.records.push(record),
                Err(e) => {
                    extracted.skipped += 1;
                    error!(
                        "Skipping {} row {} in shard '{}': {}",
                        spec.name,
                        Self::row_id(spec, &row),
                        query.shard,
                        e
                    );
                }
            }
        }

        Ok(extracted)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::connection(e, "checking SQLite source"))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{FILM_WORK, GENRE, PERSON};
    use crate::core::schema::ShardKey;
    use std::collections::HashSet;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn reader_with(statements: &[&str]) -> SqliteReader {
        let pool = memory_pool().await;
        for statement in statements {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        SqliteReader::from_pool(pool)
    }

    const CREATE_GENRE: &str =
        "CREATE TABLE genre (id TEXT PRIMARY KEY, name TEXT NOT NULL, description TEXT)";
    const CREATE_FILM_WORK: &str = "CREATE TABLE film_work (id TEXT PRIMARY KEY, title TEXT, \
         description TEXT, creation_date DATE, type TEXT, rating FLOAT)";

    fn shard(c: char) -> ShardKey {
        ShardKey::new(c).unwrap()
    }

    #[test]
    fn test_coerce_matches_storage_to_field() {
        let rating = Field::optional("rating", FieldType::Float);
        assert_eq!(coerce(&rating, Cell::Integer(8)), Ok(SqlValue::Float(8.0)));
        assert_eq!(
            coerce(&rating, Cell::Null),
            Ok(SqlValue::Null(FieldType::Float))
        );
        assert_eq!(
            coerce(&rating, Cell::Text("8.6".into())),
            Err(ShapeError::WrongType {
                field: "rating",
                expected: FieldType::Float
            })
        );

        let id = Field::required("id", FieldType::Uuid);
        assert_eq!(
            coerce(&id, Cell::Text("g1".into())),
            Ok(SqlValue::Text("g1".into()))
        );
        assert!(coerce(&id, Cell::Blob(vec![0; 16])).is_err());
    }

    #[test]
    fn test_parse_date_accepts_date_and_timestamp_text() {
        let expected = NaiveDate::from_ymd_opt(2021, 6, 16);
        assert_eq!(parse_date("2021-06-16"), expected);
        assert_eq!(parse_date("2021-06-16 20:14:09.222016+00"), expected);
        assert_eq!(parse_date("2021-06-16T20:14:09"), expected);
        assert_eq!(parse_date("16/06/2021"), None);
        assert_eq!(parse_date("2021-06-1600"), None);
    }

    #[tokio::test]
    async fn test_count_rows() {
        let reader = reader_with(&[
            CREATE_GENRE,
            "INSERT INTO genre VALUES ('g1', 'Drama', ''), ('g2', 'Comedy', NULL)",
        ])
        .await;
        assert_eq!(reader.count_rows(&GENRE).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_rows_missing_table_is_extraction_error() {
        let reader = reader_with(&[]).await;
        let err = reader.count_rows(&PERSON).await.unwrap_err();
        assert!(matches!(err, MigrateError::Extraction { table, .. } if table == "person"));
    }

    #[tokio::test]
    async fn test_extract_genre_round_trip_values() {
        let reader = reader_with(&[
            CREATE_GENRE,
            "INSERT INTO genre VALUES ('g1', 'Drama', ''), ('g2', 'Comedy', NULL)",
        ])
        .await;

        let extracted = reader
            .extract_data(&GENRE, ShardQuery::whole(shard('1')))
            .await
            .unwrap();
        assert_eq!(extracted.rows_read, 1);
        assert_eq!(extracted.skipped, 0);
        assert_eq!(
            extracted.records[0].values(),
            &[
                SqlValue::Text("g1".into()),
                SqlValue::Text("Drama".into()),
                SqlValue::Text(String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_shards_partition_the_table() {
        let mut statements = vec![CREATE_GENRE.to_string()];
        for i in 0..300u32 {
            let id = format!("{:08x}-0000-4000-8000-{:012x}", i, i.wrapping_mul(7919));
            statements.push(format!(
                "INSERT INTO genre VALUES ('{}', 'Genre {}', NULL)",
                id, i
            ));
        }
        // Upper-case final character lands in the lower-case shard.
        statements.push("INSERT INTO genre VALUES ('UPPER-B', 'Upper', NULL)".to_string());
        let refs: Vec<&str> = statements.iter().map(String::as_str).collect();
        let reader = reader_with(&refs).await;

        let mut seen = HashSet::new();
        for key in ShardKey::all() {
            let extracted = reader
                .extract_data(&GENRE, ShardQuery::whole(key))
                .await
                .unwrap();
            for record in extracted.records {
                let id = record.values()[0].as_key_text().unwrap();
                assert_eq!(ShardKey::of(&id), Some(key));
                assert!(seen.insert(id), "row returned by two shards");
            }
        }
        assert_eq!(seen.len(), 301);
    }

    #[tokio::test]
    async fn test_extract_pages_are_stable() {
        let reader = reader_with(&[
            CREATE_GENRE,
            "INSERT INTO genre VALUES ('a1', 'A', NULL), ('b1', 'B', NULL), \
             ('c1', 'C', NULL), ('d1', 'D', NULL), ('e1', 'E', NULL)",
        ])
        .await;

        let first = reader
            .extract_data(&GENRE, ShardQuery::page(shard('1'), 3, 0))
            .await
            .unwrap();
        let second = reader
            .extract_data(&GENRE, ShardQuery::page(shard('1'), 3, 3))
            .await
            .unwrap();

        assert_eq!(first.records.len(), 3);
        assert!(first.is_full(Some(3)));
        assert_eq!(second.records.len(), 2);
        assert!(!second.is_full(Some(3)));
        assert_eq!(
            second.records[0].values()[0],
            SqlValue::Text("d1".into())
        );
    }

    #[tokio::test]
    async fn test_extract_skips_malformed_rows() {
        let reader = reader_with(&[
            CREATE_FILM_WORK,
            "INSERT INTO film_work VALUES \
             ('a1', 'Good', NULL, '2021-06-16', 'movie', 8.5), \
             ('b1', 'Bad rating', NULL, NULL, 'movie', 'high'), \
             ('c1', NULL, NULL, NULL, 'movie', NULL), \
             ('d1', 'Bad date', NULL, 'soon', 'movie', 7)",
        ])
        .await;

        let extracted = reader
            .extract_data(&FILM_WORK, ShardQuery::whole(shard('1')))
            .await
            .unwrap();
        assert_eq!(extracted.rows_read, 4);
        assert_eq!(extracted.skipped, 3);
        assert_eq!(extracted.records.len(), 1);
        assert_eq!(
            extracted.records[0].values()[1],
            SqlValue::Text("Good".into())
        );
    }

    #[tokio::test]
    async fn test_extract_decodes_film_work_types() {
        let reader = reader_with(&[
            CREATE_FILM_WORK,
            "INSERT INTO film_work VALUES ('f1', 'Good', NULL, '2021-06-16', 'movie', 8.5)",
        ])
        .await;

        let extracted = reader
            .extract_data(&FILM_WORK, ShardQuery::whole(shard('1')))
            .await
            .unwrap();
        assert_eq!(extracted.records.len(), 1);
        let values = extracted.records[0].values();
        assert_eq!(values[2], SqlValue::Null(FieldType::Text));
        assert_eq!(
            values[3],
            SqlValue::Date(NaiveDate::from_ymd_opt(2021, 6, 16).unwrap())
        );
        assert_eq!(values[5], SqlValue::Float(8.5));
    }

    #[tokio::test]
    async fn test_extract_missing_table_is_extraction_error() {
        let reader = reader_with(&[]).await;
        let err = reader
            .extract_data(&GENRE, ShardQuery::whole(shard('a')))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Extraction { table, .. } if table == "genre"));
    }

    #[tokio::test]
    async fn test_new_rejects_missing_file() {
        let config = SourceConfig {
            path: "/nonexistent/db.sqlite".into(),
            max_connections: 1,
        };
        let err = SqliteReader::new(&config, 1).await.err().unwrap();
        assert!(matches!(err, MigrateError::Connection { .. }));
    }

    #[test]
    fn test_pool_size_covers_workers() {
        let mut config = SourceConfig {
            path: "db.sqlite".into(),
            max_connections: 1,
        };
        assert_eq!(pool_size(&config, 1), 1);
        assert_eq!(pool_size(&config, 4), 4);

        config.max_connections = 8;
        assert_eq!(pool_size(&config, 4), 8);
    }
}
