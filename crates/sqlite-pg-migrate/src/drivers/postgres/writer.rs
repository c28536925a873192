//! PostgreSQL target writer implementation.
//!
//! Implements the `TargetWriter` trait for writing batches to PostgreSQL.
//! Uses deadpool-postgres for connection pooling. Each batch is one
//! multi-row `INSERT .. ON CONFLICT DO NOTHING` inside its own transaction.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::types::ToSql;
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dialect::PostgresDialect;
use crate::config::TargetConfig;
use crate::core::schema::{FieldType, TableSpec};
use crate::core::traits::TargetWriter;
use crate::core::value::{Batch, SqlValue};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

type Param = Box<dyn ToSql + Sync + Send>;

/// PostgreSQL target writer implementation.
pub struct PostgresWriter {
    pool: Pool,
    dialect: PostgresDialect,
}

impl PostgresWriter {
    /// Create a new PostgreSQL writer from configuration.
    pub async fn new(config: &TargetConfig, max_conns: usize) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.application_name(&config.application_name);

        // Connection options for reliability
        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(30));
        pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| MigrateError::connection(e, "creating PostgreSQL target pool"))?
            }
            other => {
                return Err(MigrateError::Config(format!(
                    "Invalid ssl_mode '{}'. Valid options: disable",
                    other
                )));
            }
        };

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::connection(e, "testing PostgreSQL target connection"))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| MigrateError::connection(e, "testing PostgreSQL target connection"))?;

        info!(
            "Connected to PostgreSQL target: {}:{}/{} (schema {})",
            config.host, config.port, config.database, config.schema
        );

        Ok(Self {
            pool,
            dialect: PostgresDialect::new(config.schema.clone()),
        })
    }
}

/// Convert a batch into typed bind parameters, row-major in field order.
///
/// Text in a UUID field is parsed here; an unparseable identifier fails the
/// whole batch.
fn bind_params(spec: &TableSpec, batch: Batch<'_>) -> std::result::Result<Vec<Param>, String> {
    let mut params: Vec<Param> = Vec::with_capacity(batch.len() * spec.arity());

    for record in batch.records() {
        for (field, value) in spec.fields.iter().zip(record.values()) {
            let param: Param = match (field.field_type, value) {
                (_, SqlValue::Null(FieldType::Uuid)) => Box::new(None::<Uuid>),
                (_, SqlValue::Null(FieldType::Text)) => Box::new(None::<String>),
                (_, SqlValue::Null(FieldType::Float)) => Box::new(None::<f64>),
                (_, SqlValue::Null(FieldType::Date)) => Box::new(None::<NaiveDate>),
                (FieldType::Uuid, SqlValue::Text(s)) => {
                    let id = Uuid::parse_str(s)
                        .map_err(|e| format!("{} '{}' is not a UUID: {}", field.name, s, e))?;
                    Box::new(id)
                }
                (FieldType::Uuid, SqlValue::Uuid(u)) => Box::new(*u),
                (FieldType::Text, SqlValue::Text(s)) => Box::new(s.clone()),
                (FieldType::Float, SqlValue::Float(f)) => Box::new(*f),
                (FieldType::Date, SqlValue::Date(d)) => Box::new(*d),
                (expected, other) => {
                    return Err(format!(
                        "{} holds {:?}, expected {}",
                        field.name, other, expected
                    ));
                }
            };
            params.push(param);
        }
    }

    Ok(params)
}

#[async_trait]
impl TargetWriter for PostgresWriter {
    async fn count_rows(&self, spec: &TableSpec) -> Result<i64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::connection(e, "getting PostgreSQL connection"))?;

        let row = client
            .query_one(self.dialect.count_query(spec).as_str(), &[])
            .await?;
        Ok(row.get::<_, i64>(0))
    }

    async fn save(&self, spec: &TableSpec, batch: Batch<'_>) -> Result<u64> {
        let sql = self.dialect.insert_statement(spec, batch.len());
        let params = bind_params(spec, batch).map_err(|e| MigrateError::load(spec.name, e))?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::connection(e, "getting PostgreSQL connection"))?;

        let tx = client
            .transaction()
            .await
            .map_err(|e| MigrateError::load(spec.name, e))?;
        let inserted = tx
            .execute(sql.as_str(), &param_refs)
            .await
            .map_err(|e| MigrateError::load(spec.name, e))?;
        tx.commit()
            .await
            .map_err(|e| MigrateError::load(spec.name, e))?;

        debug!(
            "Saved batch into {}.{}: {} of {} rows inserted",
            self.dialect.schema(),
            spec.name,
            inserted,
            batch.len()
        );

        Ok(inserted)
    }

    async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::connection(e, "checking PostgreSQL target"))?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}
